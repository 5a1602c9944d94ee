use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewWebhookEvent, PaymentTransaction, TransactionStatus},
    engine_api::{DepositTerms, EventOutcome, GatewayEvent, ReconciliationError, WebhookDisposition},
    events::{EventProducers, PaymentSettledEvent},
    helpers::{payment_failed, payment_succeeded, payment_under_review},
    traits::{ChargeOutcome, DepositDatabase, PaymentProvider, SettlementResult},
};

/// `ReconciliationApi` applies charge outcomes reported by the payment gateway.
///
/// Outcomes arrive either as webhooks ([`Self::process_event`]) or from an explicit verification call
/// ([`Self::verify_transaction`]). Both go through the same idempotent path, so a charge is applied at most once no
/// matter how many times, or by which route, it is reported.
pub struct ReconciliationApi<B> {
    db: B,
    terms: DepositTerms,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, terms: DepositTerms, producers: EventProducers) -> Self {
        Self { db, terms, producers }
    }
}

impl<B> ReconciliationApi<B>
where B: DepositDatabase
{
    /// Handles an authenticated webhook delivery.
    ///
    /// The event is written to the audit log first. Events that do not settle a charge are acknowledged and ignored.
    /// An error means the state transition did not commit and the gateway should re-deliver. Charge events that cannot
    /// be read are errors too, and the reason is recorded against the audit entry.
    pub async fn process_event(&self, event: GatewayEvent) -> Result<WebhookDisposition, ReconciliationError> {
        let audit = NewWebhookEvent {
            event_type: event.event_type.clone(),
            reference: event.reference.clone(),
            payload: event.payload,
        };
        let audit_id = match self.db.log_webhook_event(audit).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("🪝️ Could not write webhook audit entry: {e}");
                None
            },
        };
        let result = match event.outcome {
            EventOutcome::NoCharge => {
                debug!("🪝️ Ignoring {} event", event.event_type);
                Ok(WebhookDisposition::Ignored(event.event_type))
            },
            EventOutcome::Unreadable(reason) => {
                error!("🪝️ Cannot apply {} event. {reason}", event.event_type);
                Err(ReconciliationError::UnreadableEvent(reason))
            },
            EventOutcome::Charge(outcome) => self.process_charge(outcome).await,
        };
        if let Some(id) = audit_id {
            let error = result.as_ref().err().map(|e| e.to_string());
            if let Err(e) = self.db.finish_webhook_event(id, error).await {
                warn!("🪝️ Could not close webhook audit entry #{id}: {e}");
            }
        }
        result
    }

    /// Applies a single charge outcome.
    ///
    /// * Unknown references and already-settled transactions are not errors. Nothing is changed.
    /// * When the outcome is applied, the payer is notified and a [`PaymentSettledEvent`] is published. Both are
    ///   best-effort.
    /// * The transaction's webhook flags are set whether or not the outcome applied.
    pub async fn process_charge(&self, outcome: ChargeOutcome) -> Result<WebhookDisposition, ReconciliationError> {
        let reference = outcome.reference.clone();
        let paid_expires_at = Utc::now() + self.terms.paid_hold;
        let result = match self.db.apply_charge_outcome(outcome, paid_expires_at).await {
            Ok(r) => r,
            Err(e) => {
                error!("🔄️ Could not apply charge outcome for {reference}: {e}");
                self.mark_processed(&reference).await;
                return Err(e.into());
            },
        };
        let disposition = match result {
            SettlementResult::Applied { transaction, effect } => {
                info!("🔄️ Transaction {reference} is now {}", transaction.status);
                self.notify_payer(&transaction).await;
                self.mark_processed(&reference).await;
                let event = PaymentSettledEvent::new(transaction.clone(), effect);
                self.producers.publish_payment_settled(event).await;
                WebhookDisposition::Applied(transaction)
            },
            SettlementResult::AlreadySettled(transaction) => {
                debug!("🔄️ Transaction {reference} was already {}", transaction.status);
                self.mark_processed(&reference).await;
                WebhookDisposition::AlreadySettled(transaction)
            },
            SettlementResult::UnknownReference(r) => {
                warn!("🔄️ No transaction matches reference {r}. Acknowledging anyway");
                WebhookDisposition::UnknownReference(r)
            },
        };
        Ok(disposition)
    }

    /// Looks up the caller's transaction and, if it is still pending, asks the gateway for its state and applies the
    /// result.
    ///
    /// Transactions belonging to someone else are reported as not found.
    pub async fn verify_transaction<P: PaymentProvider>(
        &self,
        user_id: &str,
        reference: &str,
        provider: &P,
    ) -> Result<PaymentTransaction, ReconciliationError> {
        let tx = self
            .db
            .fetch_transaction(reference)
            .await?
            .filter(|tx| tx.user_id == user_id)
            .ok_or_else(|| ReconciliationError::TransactionNotFound(reference.to_string()))?;
        if tx.status.is_terminal() {
            trace!("🔄️ Transaction {reference} already {}. Skipping gateway check", tx.status);
            return Ok(tx);
        }
        let charge = provider.verify_charge(reference).await?;
        let Some(outcome) = charge.outcome() else {
            debug!("🔄️ Gateway has no verdict for {reference} yet");
            return Ok(tx);
        };
        match self.process_charge(outcome).await? {
            WebhookDisposition::Applied(tx) | WebhookDisposition::AlreadySettled(tx) => Ok(tx),
            _ => self
                .db
                .fetch_transaction(reference)
                .await?
                .ok_or_else(|| ReconciliationError::TransactionNotFound(reference.to_string())),
        }
    }

    async fn notify_payer(&self, tx: &PaymentTransaction) {
        let notification = match (tx.status, tx.review_reason.as_deref()) {
            (_, Some(reason)) => payment_under_review(tx, reason),
            (TransactionStatus::Success, None) => payment_succeeded(tx),
            _ => payment_failed(tx),
        };
        if let Err(e) = self.db.insert_notification(notification).await {
            warn!("🔄️ Could not notify {} about {}: {e}", tx.user_id, tx.reference);
        }
    }

    async fn mark_processed(&self, reference: &str) {
        if let Err(e) = self.db.mark_webhook_processed(reference).await {
            warn!("🔄️ Could not flag {reference} as processed: {e}");
        }
    }
}
