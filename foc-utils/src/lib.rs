//! Shared utility functions for FOC crates.

/// Identifier generation for templates, filter combinations and assignments.
pub mod ids {
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Generate a unique id of the form `{prefix}-{unix_millis}-{n}`.
    ///
    /// The millisecond timestamp matches the id shape the dashboard has
    /// always written; the process-local counter keeps ids unique when
    /// several are minted within the same millisecond.
    pub fn next_id(prefix: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{millis}-{n}")
    }

}

/// Money helpers for cost display.
pub mod money {
    /// Round to 2 decimal places (cost cells are displayed in pounds/pence).
    pub fn round2(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }

    /// Format a cost as `£1,234.56` with thousands separators.
    pub fn format_gbp(value: f64) -> String {
        let rounded = round2(value.abs());
        let whole = rounded.trunc() as i64;
        let pence = ((rounded - rounded.trunc()) * 100.0).round() as i64;

        let digits = whole.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        let sign = if value < 0.0 { "-" } else { "" };
        format!("{sign}£{grouped}.{pence:02}")
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn round2_truncates_to_pence() {
            assert!((round2(380.288) - 380.29).abs() < 1e-9);
            assert!((round2(50.0) - 50.0).abs() < 1e-9);
            assert!((round2(0.005) - 0.01).abs() < 1e-9);
        }

        #[test]
        fn format_gbp_groups_thousands() {
            assert_eq!(format_gbp(120000.0), "£120,000.00");
            assert_eq!(format_gbp(380.29), "£380.29");
            assert_eq!(format_gbp(1234567.5), "£1,234,567.50");
            assert_eq!(format_gbp(0.0), "£0.00");
        }

        #[test]
        fn format_gbp_handles_negative_values() {
            assert_eq!(format_gbp(-42.5), "-£42.50");
        }
    }
}
