//! Card number validation
//!
//! Runs before any outbound gateway call so an obviously bad card never
//! consumes row locks or a gateway round trip.

use crate::errors::{AppError, AppResult};

/// Normalize and validate a card number.
///
/// Strips whitespace and hyphens, then requires 13-19 digits and a Luhn
/// checksum congruent to 0 mod 10. Returns the normalized digit string.
pub fn validate_card_no(raw: &str) -> AppResult<String> {
    let normalized: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::bad_request("card number must contain only digits"));
    }
    if normalized.len() < 13 || normalized.len() > 19 {
        return Err(AppError::bad_request(format!(
            "card number must be 13-19 digits, got {}",
            normalized.len()
        )));
    }
    if !luhn_valid(&normalized) {
        return Err(AppError::bad_request("card number failed checksum"));
    }

    Ok(normalized)
}

fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .rev()
        .enumerate()
        .map(|(i, c)| {
            let d = c.to_digit(10).unwrap_or(0);
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cards() {
        // Classic test numbers with valid Luhn checksums.
        assert_eq!(
            validate_card_no("4111111111111111").unwrap(),
            "4111111111111111"
        );
        assert_eq!(
            validate_card_no("4111-1111-1111-1111").unwrap(),
            "4111111111111111"
        );
        assert_eq!(
            validate_card_no("4111 1111 1111 1111").unwrap(),
            "4111111111111111"
        );
    }

    #[test]
    fn test_luhn_failure() {
        assert!(validate_card_no("4111111111111112").is_err());
    }

    #[test]
    fn test_length_bounds() {
        // 12 digits: too short even if checksum were right.
        assert!(validate_card_no("411111111111").is_err());
        // 20 digits: too long.
        assert!(validate_card_no("41111111111111111111").is_err());
    }

    #[test]
    fn test_non_digit_rejected() {
        assert!(validate_card_no("4111x11111111111").is_err());
        assert!(validate_card_no("").is_err());
    }
}
