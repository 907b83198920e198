//! Human-readable formatting for counters shown on badges

const SI_UNITS: [&str; 6] = ["k", "M", "G", "T", "P", "E"];

/// Formats a count with an SI suffix, truncating rather than rounding
///
/// `999 → "999"`, `1234 → "1k"`, `1023555 → "1M"`.
pub fn format_metric(value: i64) -> String {
    for (index, unit) in SI_UNITS.iter().enumerate().rev() {
        let power = 1000_i64.pow(index as u32 + 1);
        if value >= power {
            return format!("{}{}", value / power, unit);
        }
    }

    value.to_string()
}
