//! # Webhook Reconciler
//!
//! Applies verified provider events to stored orders:
//!
//! 1. **Verify** the signature over the raw body (nothing is parsed before this)
//! 2. **Classify** the event; only checkout completion/expiry are acted on
//! 3. **Resolve** the order from the echoed metadata
//! 4. **Apply** the idempotent transition
//!
//! Duplicate deliveries land on an order that is no longer `placed` and are
//! absorbed as no-ops.

use crate::error::{CheckoutError, CheckoutResult};
use crate::event::{WebhookEvent, WebhookEventKind};
use crate::gateway::SharedPaymentGateway;
use crate::order::{OrderId, OrderStatus};
use crate::store::SharedOrderStore;
use tracing::{debug, info, instrument, warn};

/// What the reconciler did with a verified event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Order moved to `paid`
    Paid { order_id: OrderId, amount: i64 },
    /// Order moved to `cancelled`
    Cancelled { order_id: OrderId },
    /// Order was already past `placed`; nothing changed
    Unchanged {
        order_id: OrderId,
        status: OrderStatus,
    },
    /// Event kind is not one we act on
    Ignored { event_type: String },
}

#[derive(Clone)]
pub struct WebhookReconciler {
    gateway: SharedPaymentGateway,
    orders: SharedOrderStore,
}

impl WebhookReconciler {
    pub fn new(gateway: SharedPaymentGateway, orders: SharedOrderStore) -> Self {
        Self { gateway, orders }
    }

    /// Header the gateway expects the signature in
    pub fn signature_header(&self) -> &'static str {
        self.gateway.signature_header()
    }

    /// Verify and apply a raw webhook delivery.
    #[instrument(skip(self, payload, signature), fields(provider = self.gateway.provider_name()))]
    pub async fn handle(&self, payload: &[u8], signature: &str) -> CheckoutResult<ReconcileOutcome> {
        let event = self.gateway.verify_webhook(payload, signature).await?;

        info!(
            "Received webhook: kind={}, id={}, order={}",
            event.kind_name(),
            event.event_id,
            event.order_id().unwrap_or("-")
        );

        self.apply(event).await
    }

    /// Apply an already verified event.
    pub async fn apply(&self, event: WebhookEvent) -> CheckoutResult<ReconcileOutcome> {
        match event.kind {
            WebhookEventKind::CheckoutCompleted(completed) => {
                let order_id = resolve_order_id(&completed.metadata.order_id)?;
                let change = self
                    .orders
                    .mark_paid(order_id, completed.amount_total)
                    .await
                    .map_err(|e| log_unresolved(e, &event.event_id))?;

                if change.applied {
                    info!(
                        "Order paid: order={}, amount={}, session={}",
                        order_id, completed.amount_total, completed.session_id
                    );
                    return Ok(ReconcileOutcome::Paid {
                        order_id,
                        amount: completed.amount_total,
                    });
                }

                if change.order.status == OrderStatus::Cancelled {
                    warn!(
                        "Payment completed for cancelled order: order={}, session={}",
                        order_id, completed.session_id
                    );
                } else {
                    debug!("Duplicate completion ignored: order={}", order_id);
                }
                Ok(ReconcileOutcome::Unchanged {
                    order_id,
                    status: change.order.status,
                })
            }
            WebhookEventKind::CheckoutExpired(expired) => {
                let order_id = resolve_order_id(&expired.metadata.order_id)?;
                let change = self
                    .orders
                    .mark_cancelled(order_id)
                    .await
                    .map_err(|e| log_unresolved(e, &event.event_id))?;

                if change.applied {
                    info!(
                        "Order cancelled: order={}, session={}",
                        order_id, expired.session_id
                    );
                    Ok(ReconcileOutcome::Cancelled { order_id })
                } else {
                    Ok(ReconcileOutcome::Unchanged {
                        order_id,
                        status: change.order.status,
                    })
                }
            }
            WebhookEventKind::Ignored { event_type } => {
                debug!("Unhandled webhook event: {}", event_type);
                Ok(ReconcileOutcome::Ignored { event_type })
            }
        }
    }
}

/// A malformed id can never resolve, so it is reported as not found.
fn resolve_order_id(raw: &str) -> CheckoutResult<OrderId> {
    raw.parse().map_err(|_| {
        warn!("Webhook metadata carries unparseable order id: {:?}", raw);
        CheckoutError::OrderNotFound {
            order_id: raw.to_string(),
        }
    })
}

fn log_unresolved(err: CheckoutError, event_id: &str) -> CheckoutError {
    if let CheckoutError::OrderNotFound { order_id } = &err {
        warn!(
            "Verified webhook references unknown order: order={}, event={}",
            order_id, event_id
        );
    }
    err
}
