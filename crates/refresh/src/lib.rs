//! Background refresh plumbing: a signal bus, a last-write-wins result store
//! and a scheduler that owns the polling tasks.

pub mod bus;
pub mod scheduler;
pub mod store;

pub use bus::{RefreshBus, RefreshReason, RefreshSignal};
pub use scheduler::RefreshScheduler;
pub use store::{SequencedStore, Snapshot, StoreStatus, Versioned};
