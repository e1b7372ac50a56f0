//! Domain model
//!
//! Entities, value objects and domain events for the purchasing core.
//! Invariants live on the types themselves; persistence stays in `store`.

pub mod coupon;
pub mod events;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;

pub use coupon::{Coupon, DiscountType, UserCoupon};
pub use events::DomainEvent;
pub use order::{Order, OrderItem, OrderStatus};
pub use payment::{Applied, Payment, PaymentStatus};
pub use product::Product;
pub use user::User;
