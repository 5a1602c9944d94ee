use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    db_types::{DepositRequest, PaymentPurpose, DEPOSIT_CURRENCY},
    engine_api::{DepositCheckout, DepositFlowError, DepositTerms},
    traits::{CheckoutRequest, DepositDatabase, PaymentProvider},
};

/// `DepositFlowApi` turns a buyer's reservation request into a pending deposit and a hosted checkout session.
pub struct DepositFlowApi<B, P> {
    db: B,
    provider: P,
    terms: DepositTerms,
}

impl<B, P> Debug for DepositFlowApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DepositFlowApi ({:?})", self.terms)
    }
}

impl<B, P> DepositFlowApi<B, P> {
    pub fn new(db: B, provider: P, terms: DepositTerms) -> Self {
        Self { db, provider, terms }
    }

    pub fn terms(&self) -> &DepositTerms {
        &self.terms
    }
}

impl<B, P> DepositFlowApi<B, P>
where
    B: DepositDatabase,
    P: PaymentProvider,
{
    /// Reserves inventory for the buyer and opens a gateway transaction for the deposit.
    ///
    /// `caller_id` is the authenticated user. Buyers may only place deposits for themselves.
    ///
    /// The reservation is committed before the gateway is called. If the gateway then refuses, the reservation is
    /// released again. Should that release fail too, the pending hold's expiry lets the sweeper reclaim it later.
    pub async fn initialize_deposit(
        &self,
        caller_id: &str,
        request: DepositRequest,
    ) -> Result<DepositCheckout, DepositFlowError> {
        if request.listing_id.trim().is_empty() || request.buyer_id.trim().is_empty() {
            return Err(DepositFlowError::Validation("Missing required fields: listing_id, buyer_id".into()));
        }
        if request.reserved_quantity < 1 {
            return Err(DepositFlowError::Validation("Reserved quantity must be at least 1".into()));
        }
        if caller_id != request.buyer_id {
            warn!("🔄️ {caller_id} tried to place a deposit on behalf of {}", request.buyer_id);
            return Err(DepositFlowError::Forbidden);
        }
        let listing_id = request.listing_id.clone();
        let buyer_id = request.buyer_id.clone();
        let qty = request.reserved_quantity;
        let hold_expires_at = Utc::now() + self.terms.pending_hold;
        let deposit = self.db.initialize_deposit(request, self.terms.amount_per_unit, hold_expires_at).await?;
        debug!("🔄️ Deposit #{} [{}] reserved. Opening checkout", deposit.deposit_id, deposit.reference);
        let checkout = CheckoutRequest {
            reference: deposit.reference.clone(),
            email: deposit.email.clone(),
            amount: deposit.amount,
            currency: DEPOSIT_CURRENCY.to_string(),
            purpose: PaymentPurpose::Deposit,
            metadata: json!({
                "listing_id": listing_id,
                "buyer_id": buyer_id,
                "reserved_quantity": qty,
                "listing_title": deposit.listing_title,
                "payment_type": "deposit",
            }),
        };
        let session = match self.provider.start_checkout(checkout).await {
            Ok(session) => session,
            Err(e) => {
                warn!("🔄️ Gateway refused checkout for [{}]: {e}. Releasing the reservation", deposit.reference);
                let reason = format!("Gateway initialization failed: {e}");
                match self.db.release_pending_deposit(&deposit.reference, &reason).await {
                    Ok(_) => debug!("🔄️ Reservation [{}] released", deposit.reference),
                    Err(re) => error!(
                        "🔄️ Could not release reservation [{}]: {re}. It will lapse at {}",
                        deposit.reference, deposit.expires_at
                    ),
                }
                return Err(e.into());
            },
        };
        info!("🔄️ Checkout for deposit [{}] ready. Amount {}", deposit.reference, deposit.amount);
        Ok(DepositCheckout {
            reference: deposit.reference,
            amount: deposit.amount,
            authorization_url: session.authorization_url,
            access_code: session.access_code,
        })
    }
}
