use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    events::{EventProducers, ReservationExpiredEvent},
    traits::{DepositDatabase, DepositGatewayError, RecoveryResult, TrialExpiryResult},
};

/// Scheduled housekeeping: reclaiming lapsed reservations and ending expired trials.
///
/// Every method is safe to run concurrently with itself, and to re-run after a failure.
pub struct SweeperApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SweeperApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SweeperApi")
    }
}

impl<B> SweeperApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> SweeperApi<B>
where B: DepositDatabase
{
    /// Expires every live deposit whose hold lapsed at or before `now` and returns its quantity to the listing.
    ///
    /// Notifying the buyer and seller happens afterwards. A notification failure is logged and does not affect the
    /// recovery, which has already been committed.
    pub async fn recover_expired_reservations(&self, now: DateTime<Utc>) -> Result<RecoveryResult, DepositGatewayError> {
        let recovered = self.db.auto_recover_expired_reservations(now).await?;
        for deposit in &recovered {
            debug!(
                "🕰️ Deposit #{} expired. {} unit(s) of listing {} released",
                deposit.id, deposit.reserved_quantity, deposit.listing_id
            );
            self.producers.publish_reservation_expired(ReservationExpiredEvent::new(deposit.clone())).await;
        }
        let notified = match self.db.notify_expired_reservations().await {
            Ok(n) => n,
            Err(e) => {
                error!("🕰️ Could not send reservation-expired notifications: {e}");
                0
            },
        };
        info!("🕰️ Recovery sweep complete. {} recovered, {notified} notified", recovered.len());
        Ok(RecoveryResult { recovered, notified })
    }

    /// Moves trials that ended at or before `now` to `expired`.
    pub async fn expire_trials(&self, now: DateTime<Utc>) -> Result<TrialExpiryResult, DepositGatewayError> {
        let expired = self.db.expire_trials(now).await?;
        info!("🕰️ Trial sweep complete. {} trials expired", expired.len());
        Ok(TrialExpiryResult { expired })
    }
}
