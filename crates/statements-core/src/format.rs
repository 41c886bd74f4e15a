//! Number formatting for computed metric values.

/// Formats a number with comma thousands separators and a fixed number of decimals.
///
/// ```
/// use statements_core::format::format_grouped;
///
/// assert_eq!(format_grouped(1234567.0, 0), "1,234,567");
/// assert_eq!(format_grouped(-1234.567, 2), "-1,234.57");
/// ```
#[must_use]
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let mut text = format!("{:.*}", decimals, value.abs());
    let negative = value < 0.0 && text.bytes().any(|b| b.is_ascii_digit() && b != b'0');

    let fraction = text.find('.').map(|dot| text.split_off(dot));
    let digits = text.as_bytes();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(char::from(*digit));
    }

    let mut out = String::with_capacity(grouped.len() + 8);
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(fraction) = fraction {
        out.push_str(&fraction);
    }
    out
}

/// Formats a ratio with two decimals.
#[must_use]
pub fn format_ratio(value: f64) -> String {
    format_grouped(value, 2)
}

/// Formats a percentage (already scaled by 100) with two decimals and a `%` suffix.
#[must_use]
pub fn format_percentage(value: f64) -> String {
    format!("{}%", format_grouped(value, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping() {
        assert_eq!(format_grouped(0.0, 0), "0");
        assert_eq!(format_grouped(999.0, 0), "999");
        assert_eq!(format_grouped(1000.0, 0), "1,000");
        assert_eq!(format_grouped(123456.4, 0), "123,456");
        assert_eq!(format_grouped(-9876543.0, 0), "-9,876,543");
    }

    #[test]
    fn test_negative_zero_has_no_sign() {
        assert_eq!(format_grouped(-0.2, 0), "0");
        assert_eq!(format_grouped(-0.001, 2), "0.00");
    }

    #[test]
    fn test_ratio_and_percentage() {
        assert_eq!(format_ratio(2.0), "2.00");
        assert_eq!(format_ratio(1234.5), "1,234.50");
        assert_eq!(format_percentage(37.5), "37.50%");
        assert_eq!(format_percentage(-4.126), "-4.13%");
    }
}
