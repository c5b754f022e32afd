//! Input validation for location names and dates.

use crate::error::ValidationError;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Letters (any script), spaces, hyphens, apostrophes and periods; at least 2 chars.
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s\-'.]{2,}$").expect("name pattern is valid"));

/// Check a country or city name
pub fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if NAME_PATTERN.is_match(trimmed) && trimmed.chars().any(char::is_alphabetic) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

/// Validate both halves of a location key
pub fn validate_location(country: &str, city: &str) -> Result<(), ValidationError> {
    validate_name("country", country)?;
    validate_name("city", city)
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Parse an inclusive date range, rejecting inverted bounds
pub fn parse_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), ValidationError> {
    let start_date = parse_date(start)?;
    let end_date = parse_date(end)?;
    if start_date > end_date {
        return Err(ValidationError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok((start_date, end_date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_place_names() {
        for name in ["France", "USA", "New York", "Saint-Malo", "L'Aber-Wrac'h", "St. Ives", "Île-de-Bréhat"] {
            assert!(validate_name("city", name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_rejects_malformed_names() {
        for name in ["123", "!!", "A", "", "   ", "Brest1", "--", "Paris/../etc"] {
            assert!(validate_name("city", name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn test_validate_location_reports_field() {
        let err = validate_location("France", "!!").unwrap_err();
        match err {
            ValidationError::InvalidName { field, .. } => assert_eq!(field, "city"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert!(parse_date("01/06/2024").is_err());
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn test_parse_range_rejects_inverted_bounds() {
        assert!(parse_range("2024-06-01", "2024-06-03").is_ok());
        assert!(matches!(
            parse_range("2024-06-03", "2024-06-01"),
            Err(ValidationError::InvalidRange { .. })
        ));
    }
}
