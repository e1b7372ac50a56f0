//! Order service
//!
//! Owns the purchase and cancellation use cases. Transactions stay short:
//! T1 covers reservation + PENDING persistence + outbox staging, terminal
//! convergence happens in fresh transactions driven by the gateway answer,
//! a callback, or the reconciliation sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use crate::db::Database;
use crate::domain::{
    Applied, DomainEvent, Order, OrderItem, OrderStatus, Payment, PaymentStatus,
};
use crate::errors::{AppError, AppResult};
use crate::outbox::bridge;
use crate::paygate::retry::{RetryPolicy, retry_with_backoff};
use crate::paygate::{self, PaymentGateway, PgCallResult, PgCommand, PgPaymentStatus, card};
use crate::redemption;
use crate::reservation;
use crate::store::{orders, payments, users};

use super::failure::{FailureKind, classify};
use super::post_commit::{Intent, PostCommitQueue};

/// One line of an incoming order request.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub external_user_id: String,
    pub items: Vec<OrderLine>,
    pub used_point: i64,
    pub card_type: Option<String>,
    pub card_no: Option<String>,
}

/// Gateway-initiated status push.
#[derive(Debug, Clone)]
pub struct CallbackCommand {
    pub transaction_key: Option<String>,
    /// Padded order id as the gateway carries it on the wire.
    pub order_id: String,
    pub status: PgPaymentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub payment: Payment,
}

pub struct OrderService {
    db: Arc<Database>,
    gateway: Arc<dyn PaymentGateway>,
    callback_base_url: String,
    recovery_delay: Duration,
    status_retry: RetryPolicy,
}

impl OrderService {
    pub fn new(
        db: Arc<Database>,
        gateway: Arc<dyn PaymentGateway>,
        callback_base_url: impl Into<String>,
        recovery_delay: Duration,
        status_retry: RetryPolicy,
    ) -> Self {
        let callback_base_url: String = callback_base_url.into();
        Self {
            db,
            gateway,
            callback_base_url: callback_base_url.trim_end_matches('/').to_string(),
            recovery_delay,
            status_retry,
        }
    }

    fn pool(&self) -> &PgPool {
        self.db.pool()
    }

    /// Create an order: reserve stock/point and persist PENDING state in
    /// one transaction, then drive the gateway after commit. Returns the
    /// order and payment as they stand once the post-commit work settled.
    pub async fn create_order(self: Arc<Self>, cmd: CreateOrderCommand) -> AppResult<OrderDetail> {
        validate_command(&cmd)?;

        // Card format is checked before any lock is taken; an obviously
        // bad card must not consume stock holds or a gateway round trip.
        let normalized_card = match (&cmd.card_type, &cmd.card_no) {
            (Some(card_type), Some(card_no)) => {
                Some((card_type.clone(), card::validate_card_no(card_no)?))
            }
            (None, None) => None,
            _ => {
                return Err(AppError::bad_request(
                    "card type and card number must be provided together",
                ));
            }
        };

        let mut post_commit = PostCommitQueue::new();
        let order_id = self
            .create_order_tx(&cmd, normalized_card, &mut post_commit)
            .await?;

        // T1 is committed and the locks are gone; only now may external
        // I/O run. A failure here never unwinds the committed order.
        for intent in post_commit.drain() {
            match intent {
                Intent::RequestPayment { order_id } => {
                    self.clone().execute_payment(order_id).await;
                }
            }
        }

        let order = orders::find_by_id(self.pool(), order_id).await?;
        let payment = payments::find_by_order_id(self.pool(), order_id).await?;
        Ok(OrderDetail { order, payment })
    }

    /// T1: everything that must be atomic, nothing that leaves the process.
    async fn create_order_tx(
        &self,
        cmd: &CreateOrderCommand,
        normalized_card: Option<(String, String)>,
        post_commit: &mut PostCommitQueue,
    ) -> AppResult<i64> {
        let product_ids: Vec<i64> = cmd.items.iter().map(|l| l.product_id).collect();
        let coupon_code = single_coupon_code(&cmd.items)?;

        let mut tx = self.pool().begin().await?;

        // Lock ordering: user first, then products ascending by id. Every
        // writer that touches both must take locks in this sequence.
        let mut user = reservation::lock_user_exclusive(&mut tx, &cmd.external_user_id).await?;
        let mut locked_products =
            reservation::lock_products_exclusive(&mut tx, &product_ids).await?;

        // Item snapshots from the locked rows.
        let mut items = Vec::with_capacity(cmd.items.len());
        for line in &cmd.items {
            let product = locked_products
                .get(&line.product_id)
                .ok_or_else(|| AppError::internal("locked product missing"))?;
            items.push(OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                price: product.price,
                quantity: line.quantity,
            });
        }
        let subtotal: i64 = items.iter().map(OrderItem::line_total).sum();

        let discount_amount = match &coupon_code {
            Some(code) => redemption::redeem(&mut tx, user.id, code, subtotal).await?,
            None => 0,
        };

        let total_amount = Order::checked_total(&items, discount_amount)?;
        if cmd.used_point > total_amount {
            return Err(AppError::bad_request("used point exceeds order total"));
        }
        let paid_amount = total_amount - cmd.used_point;

        let card = if paid_amount > 0 {
            Some(normalized_card.ok_or_else(|| {
                AppError::bad_request("card is required when paid amount is positive")
            })?)
        } else {
            None
        };

        let order = orders::insert(
            &mut tx,
            orders::NewOrder {
                user_id: user.id,
                total_amount,
                items: &items,
                coupon_code: coupon_code.as_deref(),
                discount_amount,
            },
        )
        .await?;

        for line in &cmd.items {
            let product = locked_products
                .get_mut(&line.product_id)
                .ok_or_else(|| AppError::internal("locked product missing"))?;
            reservation::decrease_stock(&mut tx, product, line.quantity).await?;
        }
        if cmd.used_point > 0 {
            reservation::deduct_point(&mut tx, &mut user, cmd.used_point).await?;
        }

        // A fully covered payment never talks to the gateway: it is born
        // SUCCESS and the order completes in the same transaction.
        let payment_status = if paid_amount == 0 {
            PaymentStatus::Success
        } else {
            PaymentStatus::Pending
        };
        let payment = payments::insert(
            &mut tx,
            payments::NewPayment {
                order_id: order.id,
                user_id: user.id,
                total_amount,
                used_point: cmd.used_point,
                paid_amount,
                status: payment_status,
                card_type: card.as_ref().map(|(t, _)| t.as_str()),
                card_no: card.as_ref().map(|(_, n)| n.as_str()),
            },
        )
        .await?;

        let mut events = vec![
            DomainEvent::OrderCreated {
                order_id: order.id,
                user_id: user.id,
                total_amount,
            },
            DomainEvent::PaymentCreated {
                payment_id: payment.id,
                order_id: order.id,
                paid_amount,
            },
        ];

        if paid_amount == 0 {
            orders::update_status_cas(&mut tx, order.id, OrderStatus::Pending, OrderStatus::Completed)
                .await?;
            events.push(DomainEvent::PaymentCompleted {
                payment_id: payment.id,
                order_id: order.id,
                transaction_key: None,
            });
            events.push(DomainEvent::OrderCompleted {
                order_id: order.id,
                user_id: user.id,
            });
        } else {
            post_commit.push(Intent::RequestPayment { order_id: order.id });
        }

        bridge::stage_events(&mut tx, &events).await;

        tx.commit().await?;
        tracing::info!(
            order_id = order.id,
            user_id = user.id,
            total_amount,
            paid_amount,
            "order created"
        );
        Ok(order.id)
    }

    /// Post-commit gateway call for a PENDING payment. Errors are logged,
    /// never propagated: the committed order must survive anything that
    /// happens here.
    pub async fn execute_payment(self: Arc<Self>, order_id: i64) {
        if let Err(err) = self.clone().run_payment(order_id).await {
            tracing::error!(order_id, error = %err, "payment execution failed");
        }
    }

    async fn run_payment(self: Arc<Self>, order_id: i64) -> AppResult<()> {
        let payment = payments::find_by_order_id(self.pool(), order_id).await?;
        if payment.status != PaymentStatus::Pending || payment.paid_amount == 0 {
            return Ok(());
        }

        let external_user_id = users::external_id_of(self.pool(), payment.user_id).await?;
        let (card_type, card_no) = match (&payment.card_type, &payment.card_no) {
            (Some(t), Some(n)) => (t.clone(), n.clone()),
            _ => {
                return Err(AppError::internal(format!(
                    "payment {} has positive paid amount but no card",
                    payment.id
                )));
            }
        };

        let cmd = PgCommand {
            external_user_id,
            order_id,
            card_type,
            card_no,
            amount: payment.paid_amount,
            callback_url: format!(
                "{}/api/v1/orders/{order_id}/callback",
                self.callback_base_url
            ),
        };

        match self.gateway.request_payment(&cmd).await {
            PgCallResult::Approved { transaction_key } => {
                tracing::info!(order_id, %transaction_key, "gateway approved payment");
                self.complete_order(order_id, Some(&transaction_key)).await
            }
            PgCallResult::Declined(failure) => match classify(&failure) {
                FailureKind::Business => {
                    tracing::warn!(
                        order_id,
                        error_code = %failure.error_code,
                        "business decline; canceling order"
                    );
                    self.cancel_order(order_id, &failure.error_code).await
                }
                FailureKind::ExternalSystem => {
                    tracing::warn!(
                        order_id,
                        error_code = %failure.error_code,
                        is_timeout = failure.is_timeout,
                        "external-system failure; order stays PENDING for reconciliation"
                    );
                    if failure.is_timeout {
                        self.clone().schedule_recovery(order_id);
                    }
                    Ok(())
                }
            },
        }
    }

    /// Deferred status lookup after a request timeout; gives the gateway
    /// time to settle before the first ledger question.
    fn schedule_recovery(self: Arc<Self>, order_id: i64) {
        let delay = self.recovery_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = self.recover_after_timeout(order_id).await {
                tracing::error!(order_id, error = %err, "timeout recovery failed");
            }
        });
    }

    /// Resolve a PENDING payment against the gateway ledger. Shared by the
    /// timeout-recovery path and the reconciliation sweep.
    pub async fn recover_after_timeout(&self, order_id: i64) -> AppResult<()> {
        let payment = payments::find_by_order_id(self.pool(), order_id).await?;
        if payment.status != PaymentStatus::Pending {
            return Ok(());
        }

        let external_user_id = users::external_id_of(self.pool(), payment.user_id).await?;
        let padded = paygate::pad_order_id(order_id);

        let status = retry_with_backoff(&self.status_retry, || {
            self.gateway.status_by_order(&external_user_id, &padded)
        })
        .await?;

        match status {
            PgPaymentStatus::Success => {
                tracing::info!(order_id, "ledger reports SUCCESS; completing");
                self.complete_order(order_id, None).await
            }
            PgPaymentStatus::Failed => {
                tracing::info!(order_id, "ledger reports FAILED; canceling");
                self.cancel_order(order_id, "gateway ledger reported FAILED").await
            }
            PgPaymentStatus::Pending | PgPaymentStatus::NotFound => {
                // No authoritative evidence yet; the next sweep will ask again.
                tracing::debug!(order_id, ?status, "ledger inconclusive; staying PENDING");
                Ok(())
            }
        }
    }

    /// Converge payment and order onto SUCCESS/COMPLETED. Idempotent: a
    /// replay of the same terminal is a silent no-op.
    pub async fn complete_order(
        &self,
        order_id: i64,
        transaction_key: Option<&str>,
    ) -> AppResult<()> {
        let mut tx = self.pool().begin().await?;

        let mut payment = payments::find_by_order_id_in_tx(&mut tx, order_id).await?;
        let now = Utc::now();
        // Domain check first: SUCCESS replays return AlreadyTerminal,
        // FAILED->SUCCESS is rejected and rolls the transaction back.
        match payment.to_success(transaction_key.map(String::from), now)? {
            Applied::AlreadyTerminal => {
                tx.commit().await?;
                return Ok(());
            }
            Applied::Transitioned => {}
        }

        let moved =
            payments::transition_cas(&mut tx, payment.id, PaymentStatus::Success, transaction_key, None, now)
                .await?;
        if !moved {
            // A racing writer already settled this payment.
            tx.commit().await?;
            return Ok(());
        }

        let order_moved =
            orders::update_status_cas(&mut tx, order_id, OrderStatus::Pending, OrderStatus::Completed)
                .await?;
        if !order_moved {
            let order = orders::find_by_id_in_tx(&mut tx, order_id).await?;
            if order.status == OrderStatus::Canceled {
                // Dropping the transaction rolls the payment change back.
                return Err(AppError::bad_request(format!(
                    "order {order_id} is CANCELED and cannot complete"
                )));
            }
        }

        let events = [
            DomainEvent::PaymentCompleted {
                payment_id: payment.id,
                order_id,
                transaction_key: transaction_key.map(String::from),
            },
            DomainEvent::OrderCompleted {
                order_id,
                user_id: payment.user_id,
            },
        ];
        bridge::stage_events(&mut tx, &events).await;

        tx.commit().await?;
        tracing::info!(order_id, "order completed");
        Ok(())
    }

    /// Cancel a PENDING order: restore stock, refund the point actually
    /// spent (the payment's `used_point`, never the order total), fail the
    /// payment, stage OrderCanceled. Canceling an already-CANCELED order
    /// is a no-op; canceling a COMPLETED order is rejected.
    pub async fn cancel_order(&self, order_id: i64, reason: &str) -> AppResult<()> {
        let mut tx = self.pool().begin().await?;

        let order = orders::find_by_id_in_tx(&mut tx, order_id).await?;
        match order.status {
            OrderStatus::Canceled => {
                tx.commit().await?;
                return Ok(());
            }
            OrderStatus::Completed => {
                return Err(AppError::bad_request(format!(
                    "order {order_id} is COMPLETED and cannot be canceled"
                )));
            }
            OrderStatus::Pending => {}
        }

        // Lock ordering: user first, then products ascending by id. Same
        // sequence as creation; cancellation must never invert it.
        let mut user = users::lock_by_id(&mut tx, order.user_id).await?;
        let product_ids: Vec<i64> = order.items.iter().map(|i| i.product_id).collect();
        let mut locked_products =
            reservation::lock_products_exclusive(&mut tx, &product_ids).await?;

        // Claim the transition before touching balances so a racing
        // completer cannot leave us with restored stock on a live order.
        let moved =
            orders::update_status_cas(&mut tx, order_id, OrderStatus::Pending, OrderStatus::Canceled)
                .await?;
        if !moved {
            let current = orders::find_by_id_in_tx(&mut tx, order_id).await?;
            return if current.status == OrderStatus::Canceled {
                tx.commit().await?;
                Ok(())
            } else {
                Err(AppError::bad_request(format!(
                    "order {order_id} is COMPLETED and cannot be canceled"
                )))
            };
        }

        let mut payment = payments::find_by_order_id_in_tx(&mut tx, order_id).await?;

        for item in &order.items {
            let product = locked_products
                .get_mut(&item.product_id)
                .ok_or_else(|| AppError::internal("locked product missing"))?;
            reservation::restore_stock(&mut tx, product, item.quantity).await?;
        }
        reservation::receive_point(&mut tx, &mut user, payment.used_point).await?;

        let mut events = vec![DomainEvent::OrderCanceled {
            order_id,
            user_id: order.user_id,
            reason: reason.to_string(),
        }];

        if payment.status == PaymentStatus::Pending {
            let now = Utc::now();
            payment.to_failed(reason, now)?;
            payments::transition_cas(
                &mut tx,
                payment.id,
                PaymentStatus::Failed,
                None,
                Some(reason),
                now,
            )
            .await?;
            events.push(DomainEvent::PaymentFailed {
                payment_id: payment.id,
                order_id,
                reason: reason.to_string(),
            });
        }

        bridge::stage_events(&mut tx, &events).await;

        tx.commit().await?;
        tracing::info!(order_id, reason, "order canceled");
        Ok(())
    }

    /// Apply a gateway callback. The callback is a hint; the gateway
    /// ledger is consulted and wins on disagreement.
    pub async fn handle_callback(&self, order_id: i64, cb: CallbackCommand) -> AppResult<()> {
        let claimed_id: i64 = cb
            .order_id
            .trim()
            .parse()
            .map_err(|_| AppError::bad_request("malformed callback order id"))?;
        if claimed_id != order_id {
            return Err(AppError::bad_request("callback order id mismatch"));
        }

        let order = orders::find_by_id(self.pool(), order_id).await?;
        let external_user_id = users::external_id_of(self.pool(), order.user_id).await?;
        let padded = paygate::pad_order_id(order_id);

        let ledger_status = match self.gateway.status_by_order(&external_user_id, &padded).await {
            Ok(status) => status,
            Err(err) => {
                // Without the ledger there is no authority; leave the
                // order for the reconciliation sweep.
                tracing::warn!(order_id, error = %err, "ledger unreachable during callback");
                return Ok(());
            }
        };

        if ledger_status != cb.status {
            tracing::warn!(
                order_id,
                callback_status = ?cb.status,
                ?ledger_status,
                "callback disagrees with ledger; ledger wins"
            );
        }

        // Detail lookup for the failure reason when the callback carries a
        // transaction key; best-effort only.
        let ledger_reason = match (&cb.transaction_key, ledger_status) {
            (Some(key), PgPaymentStatus::Failed) => self
                .gateway
                .status_by_transaction(&external_user_id, key)
                .await
                .ok()
                .and_then(|tx_detail| tx_detail.reason),
            _ => None,
        };

        match ledger_status {
            PgPaymentStatus::Success => {
                self.complete_order(order_id, cb.transaction_key.as_deref()).await
            }
            PgPaymentStatus::Failed => {
                let reason = ledger_reason
                    .or(cb.reason)
                    .unwrap_or_else(|| "gateway reported FAILED".to_string());
                self.cancel_order(order_id, &reason).await
            }
            PgPaymentStatus::Pending | PgPaymentStatus::NotFound => Ok(()),
        }
    }

    /// Read one order owned by the caller.
    pub async fn get_order(&self, external_user_id: &str, order_id: i64) -> AppResult<OrderDetail> {
        let user = users::find_by_external_id(self.pool(), external_user_id).await?;
        let order = orders::find_by_id(self.pool(), order_id).await?;
        if order.user_id != user.id {
            return Err(AppError::not_found(format!("order not found: {order_id}")));
        }
        let payment = payments::find_by_order_id(self.pool(), order_id).await?;
        Ok(OrderDetail { order, payment })
    }

    /// List the caller's orders, newest first.
    pub async fn get_orders(&self, external_user_id: &str) -> AppResult<Vec<Order>> {
        let user = users::find_by_external_id(self.pool(), external_user_id).await?;
        orders::list_by_user(self.pool(), user.id).await
    }
}

fn validate_command(cmd: &CreateOrderCommand) -> AppResult<()> {
    if cmd.external_user_id.trim().is_empty() {
        return Err(AppError::bad_request("user id must not be blank"));
    }
    if cmd.items.is_empty() {
        return Err(AppError::bad_request("order must contain at least one item"));
    }
    if cmd.items.iter().any(|l| l.quantity < 1) {
        return Err(AppError::bad_request("item quantity must be at least 1"));
    }
    if cmd.used_point < 0 {
        return Err(AppError::bad_request("used point must not be negative"));
    }
    Ok(())
}

/// At most one coupon per order; distinct codes on different lines are a
/// client error.
fn single_coupon_code(items: &[OrderLine]) -> AppResult<Option<String>> {
    let mut found: Option<String> = None;
    for line in items {
        if let Some(code) = &line.coupon_code {
            match &found {
                Some(existing) if existing != code => {
                    return Err(AppError::bad_request(
                        "only one coupon may be applied per order",
                    ));
                }
                _ => found = Some(code.clone()),
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, quantity: i64, coupon: Option<&str>) -> OrderLine {
        OrderLine {
            product_id,
            quantity,
            coupon_code: coupon.map(str::to_string),
        }
    }

    fn command(items: Vec<OrderLine>) -> CreateOrderCommand {
        CreateOrderCommand {
            external_user_id: "u-1".to_string(),
            items,
            used_point: 0,
            card_type: None,
            card_no: None,
        }
    }

    #[test]
    fn test_validate_rejects_blank_user() {
        let mut cmd = command(vec![line(1, 1, None)]);
        cmd.external_user_id = "  ".to_string();
        assert!(validate_command(&cmd).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_items_and_bad_quantity() {
        assert!(validate_command(&command(vec![])).is_err());
        assert!(validate_command(&command(vec![line(1, 0, None)])).is_err());
        assert!(validate_command(&command(vec![line(1, 1, None)])).is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_point() {
        let mut cmd = command(vec![line(1, 1, None)]);
        cmd.used_point = -1;
        assert!(validate_command(&cmd).is_err());
    }

    #[test]
    fn test_single_coupon_code() {
        let none = single_coupon_code(&[line(1, 1, None), line(2, 1, None)]).unwrap();
        assert_eq!(none, None);

        let one =
            single_coupon_code(&[line(1, 1, Some("TEN")), line(2, 1, None)]).unwrap();
        assert_eq!(one.as_deref(), Some("TEN"));

        // The same code on two lines still counts as one coupon.
        let same =
            single_coupon_code(&[line(1, 1, Some("TEN")), line(2, 1, Some("TEN"))]).unwrap();
        assert_eq!(same.as_deref(), Some("TEN"));

        assert!(single_coupon_code(&[line(1, 1, Some("TEN")), line(2, 1, Some("FIVE"))]).is_err());
    }
}
