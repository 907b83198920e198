//! Named badge colors.

/// Resolve a palette name to its hex value (without `#`)
///
/// Unknown names are returned unchanged so callers can pass literal hex
/// values such as `4c1` or `ffee16`.
pub fn resolve_color(color: &str) -> &str {
    match color {
        "brightgreen" => "4c1",
        "green" => "97CA00",
        "yellow" => "dfb317",
        "yellowgreen" => "a4a61d",
        "orange" => "fe7d37",
        "red" => "e05d44",
        "blue" => "007ec6",
        "grey" | "gray" => "555",
        "lightgrey" | "lightgray" => "9f9f9f",
        other => other,
    }
}
