//! User entity
//!
//! Only the fields the purchasing core consumes: identity and point balance.
//! The balance is mutated exclusively under a row-exclusive hold.

use chrono::NaiveDate;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    /// Unique short token the API identifies callers by.
    pub external_id: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    /// Point balance in minor units. Never negative.
    pub point: i64,
}

impl User {
    /// Deduct points from the balance.
    ///
    /// Fails when the amount is not positive or exceeds the balance.
    pub fn deduct_point(&mut self, amount: i64) -> AppResult<()> {
        if amount <= 0 {
            return Err(AppError::bad_request("point amount must be positive"));
        }
        if amount > self.point {
            return Err(AppError::bad_request(format!(
                "insufficient point: have {}, need {}",
                self.point, amount
            )));
        }
        self.point -= amount;
        Ok(())
    }

    /// Credit points back to the balance (cancellation refund path).
    pub fn receive_point(&mut self, amount: i64) -> AppResult<()> {
        if amount < 0 {
            return Err(AppError::bad_request("refund amount must not be negative"));
        }
        self.point += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(point: i64) -> User {
        User {
            id: 1,
            external_id: "u-1".to_string(),
            email: "u1@example.com".to_string(),
            birth_date: None,
            gender: None,
            point,
        }
    }

    #[test]
    fn test_deduct_point() {
        let mut u = user(50_000);
        u.deduct_point(10_000).unwrap();
        assert_eq!(u.point, 40_000);
    }

    #[test]
    fn test_deduct_more_than_balance_fails() {
        let mut u = user(5_000);
        let err = u.deduct_point(10_000).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(u.point, 5_000);
    }

    #[test]
    fn test_deduct_zero_fails() {
        let mut u = user(5_000);
        assert!(u.deduct_point(0).is_err());
    }

    #[test]
    fn test_receive_point() {
        let mut u = user(0);
        u.receive_point(3_000).unwrap();
        assert_eq!(u.point, 3_000);
        // Zero refund is a legal no-op (fully point-free payments).
        u.receive_point(0).unwrap();
        assert_eq!(u.point, 3_000);
    }
}
