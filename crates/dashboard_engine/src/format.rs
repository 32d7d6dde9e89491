//! Display strings for the figures the engine produces (CLP conventions).

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if value < 0 {
        format!("-{out}")
    } else {
        out
    }
}

/// `$1.2M`, `$880K`, `$950`; zero and non-finite values print as `$0`.
/// The unit is picked on the magnitude after rounding, so `999_950` is `$1.0M`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "$0".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    if abs >= 999_500.0 {
        format!("${sign}{:.1}M", abs / 1_000_000.0)
    } else if abs >= 999.5 {
        format!("${sign}{:.0}K", abs / 1_000.0)
    } else {
        format!("${}", group_thousands(value.round() as i64))
    }
}

/// Full amount with `.` thousands separators, e.g. `$12.500`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "$0".to_string();
    }
    format!("${}", group_thousands(value.round() as i64))
}

pub fn format_percentage(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("{value:.decimals$}%")
}

/// Signed change for a KPI badge, e.g. `+25.0%` or `-12.5%`.
pub fn format_change(percent_change: f64) -> String {
    let pct = if percent_change.is_finite() { percent_change } else { 0.0 };
    let sign = if pct < 0.0 { '-' } else { '+' };
    format!("{sign}{}", format_percentage(pct.abs(), 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(f64::NAN), "$0");
        assert_eq!(format_currency(1_234_567.0), "$1.2M");
        assert_eq!(format_currency(880_000.0), "$880K");
        assert_eq!(format_currency(950.0), "$950");
    }

    #[test]
    fn test_format_currency_rounds_into_next_unit() {
        assert_eq!(format_currency(999_950.0), "$1.0M");
        assert_eq!(format_currency(999_499.0), "$999K");
        assert_eq!(format_currency(999.6), "$1K");
        assert_eq!(format_currency(999.4), "$999");
    }

    #[test]
    fn test_format_currency_compacts_negatives() {
        assert_eq!(format_currency(-1_500_000.0), "$-1.5M");
        assert_eq!(format_currency(-880_000.0), "$-880K");
        assert_eq!(format_currency(-950.0), "$-950");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(12_500.0), "$12.500");
        assert_eq!(format_amount(1_000_000.0), "$1.000.000");
        assert_eq!(format_amount(-4_200.0), "$-4.200");
        assert_eq!(format_amount(999.0), "$999");
    }

    #[test]
    fn test_format_percentage_and_change() {
        assert_eq!(format_percentage(27.94, 1), "27.9%");
        assert_eq!(format_percentage(f64::INFINITY, 2), "0.00%");
        assert_eq!(format_change(25.0), "+25.0%");
        assert_eq!(format_change(-12.5), "-12.5%");
        assert_eq!(format_change(0.0), "+0.0%");
    }
}
