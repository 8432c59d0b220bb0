/// Currency utility functions.
///
/// All monetary values in the database are stored in minor units
/// (1 major unit = 100 minor units) to avoid floating-point precision
/// issues.

/// Convert major units to minor units (multiply by 100)
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Convert minor units to major units (divide by 100)
pub fn to_major_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Format minor units as a display amount with 2 decimal places
pub fn format_amount(minor: i64, currency: &str) -> String {
    format!("{:.2} {}", to_major_units(minor), currency.to_uppercase())
}

/// Validate and parse an amount string to minor units
pub fn parse_amount_to_minor(amount_str: &str) -> Result<i64, String> {
    amount_str
        .parse::<f64>()
        .map_err(|_| "Invalid amount format".to_string())
        .and_then(|amount| {
            if amount < 0.0 {
                Err("Amount cannot be negative".to_string())
            } else {
                Ok(to_minor_units(amount))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(100.0), 10000);
        assert_eq!(to_minor_units(0.50), 50);
        assert_eq!(to_minor_units(123.45), 12345);
    }

    #[test]
    fn test_to_major_units() {
        assert_eq!(to_major_units(10000), 100.0);
        assert_eq!(to_major_units(50), 0.50);
        assert_eq!(to_major_units(12345), 123.45);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(10000, "usd"), "100.00 USD");
        assert_eq!(format_amount(50, "eur"), "0.50 EUR");
    }

    #[test]
    fn test_parse_amount_to_minor() {
        assert_eq!(parse_amount_to_minor("100.00"), Ok(10000));
        assert_eq!(parse_amount_to_minor("0.50"), Ok(50));
        assert_eq!(
            parse_amount_to_minor("-100"),
            Err("Amount cannot be negative".to_string())
        );
        assert_eq!(
            parse_amount_to_minor("abc"),
            Err("Invalid amount format".to_string())
        );
    }
}
