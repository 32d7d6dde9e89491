pub mod error;
pub mod handlers;
pub mod jobs;
pub mod router;
pub mod server;
pub mod state;

pub use error::{ApiError, Result};
pub use jobs::start_refresh_jobs;
pub use router::create_router;
pub use server::{init_tracing, run_server};
pub use state::AppState;
