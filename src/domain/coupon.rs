//! Coupon template and per-user redemption record
//!
//! A coupon template is shared and read-mostly. The `UserCoupon` binds a
//! template to one user and flips `used` false→true exactly once globally;
//! the version column backs the optimistic compare-and-swap in the store.

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Discount strategy carried by a coupon template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountType {
    /// Flat amount off, capped at the subtotal.
    Fixed,
    /// Percentage of the subtotal, rounded half-up.
    Percentage,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Fixed => "FIXED",
            DiscountType::Percentage => "PERCENTAGE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FIXED" => Some(DiscountType::Fixed),
            "PERCENTAGE" => Some(DiscountType::Percentage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    pub code: String,
    pub discount_type: DiscountType,
    /// Amount in minor units for `Fixed`, whole percent for `Percentage`.
    pub value: i64,
}

impl Coupon {
    /// Discount this coupon yields against `subtotal`.
    ///
    /// Fixed coupons never discount more than the subtotal; percentage
    /// coupons round half-up on the computed fraction.
    pub fn discount_for(&self, subtotal: i64) -> AppResult<i64> {
        if subtotal < 0 {
            return Err(AppError::bad_request("subtotal must not be negative"));
        }
        let discount = match self.discount_type {
            DiscountType::Fixed => self.value.min(subtotal),
            DiscountType::Percentage => (subtotal * self.value + 50) / 100,
        };
        Ok(discount)
    }
}

/// One user's claim on a coupon template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCoupon {
    pub user_id: i64,
    pub coupon_code: String,
    pub used: bool,
    /// Monotonic version for the optimistic save.
    pub version: i64,
}

impl UserCoupon {
    /// Mark the coupon used. Rejects a second use up front; the racing
    /// case is caught by the store's version compare-and-swap.
    pub fn mark_used(&mut self) -> AppResult<()> {
        if self.used {
            return Err(AppError::conflict(format!(
                "coupon already used: {}",
                self.coupon_code
            )));
        }
        self.used = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_discount_caps_at_subtotal() {
        let c = Coupon {
            code: "WELCOME".to_string(),
            discount_type: DiscountType::Fixed,
            value: 5_000,
        };
        assert_eq!(c.discount_for(10_000).unwrap(), 5_000);
        assert_eq!(c.discount_for(3_000).unwrap(), 3_000);
        assert_eq!(c.discount_for(0).unwrap(), 0);
    }

    #[test]
    fn test_percentage_discount_rounds_half_up() {
        let c = Coupon {
            code: "TEN".to_string(),
            discount_type: DiscountType::Percentage,
            value: 10,
        };
        assert_eq!(c.discount_for(10_000).unwrap(), 1_000);
        // 10% of 15 = 1.5 -> 2
        assert_eq!(c.discount_for(15).unwrap(), 2);
        // 10% of 14 = 1.4 -> 1
        assert_eq!(c.discount_for(14).unwrap(), 1);
    }

    #[test]
    fn test_negative_subtotal_rejected() {
        let c = Coupon {
            code: "TEN".to_string(),
            discount_type: DiscountType::Percentage,
            value: 10,
        };
        assert!(c.discount_for(-1).is_err());
    }

    #[test]
    fn test_mark_used_once() {
        let mut uc = UserCoupon {
            user_id: 1,
            coupon_code: "WELCOME".to_string(),
            used: false,
            version: 0,
        };
        uc.mark_used().unwrap();
        let err = uc.mark_used().unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
