use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde_json::json;

use crate::{
    db_types::ReminderTier,
    helpers::{deposit_reminder, reminder_copy},
    traits::{DepositDatabase, DepositGatewayError, PushMessage, PushNotifier, ReminderCandidate, ReminderReport},
};

/// The Android notification channel that deposit pushes are posted to.
pub const DEPOSIT_PUSH_CHANNEL: &str = "deposits";

/// Sends countdown reminders for paid deposits.
///
/// Each of the three reminder tiers goes out at most once per deposit, however often the dispatcher runs.
pub struct ReminderApi<B, N> {
    db: B,
    push: N,
}

impl<B, N> Debug for ReminderApi<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReminderApi")
    }
}

impl<B, N> ReminderApi<B, N> {
    pub fn new(db: B, push: N) -> Self {
        Self { db, push }
    }
}

impl<B, N> ReminderApi<B, N>
where
    B: DepositDatabase,
    N: PushNotifier,
{
    /// Checks every paid deposit against the reminder windows, as of `now`.
    ///
    /// Failures for one deposit are logged and never stop the others. Only loading the candidates can fail the run.
    pub async fn send_deposit_reminders(&self, now: DateTime<Utc>) -> Result<ReminderReport, DepositGatewayError> {
        let candidates = self.db.fetch_reminder_candidates().await?;
        let mut report = ReminderReport { processed: candidates.len(), ..Default::default() };
        for candidate in candidates {
            let hours = candidate.hours_until_expiry(now);
            let Some(tier) = ReminderTier::for_hours_remaining(hours) else {
                continue;
            };
            if candidate.already_sent(tier) {
                trace!("🔔️ Deposit #{} already had its {tier} reminder", candidate.deposit_id);
                continue;
            }
            match self.remind(&candidate, tier, hours).await {
                Ok(true) => report.record(tier),
                Ok(false) => {},
                Err(e) => warn!("🔔️ Could not send {tier} reminder for deposit #{}: {e}", candidate.deposit_id),
            }
        }
        info!("🔔️ Reminder run complete. {} deposits checked, {} reminders sent", report.processed, report.total());
        Ok(report)
    }

    /// Returns `false` if another run claimed this tier first.
    async fn remind(&self, c: &ReminderCandidate, tier: ReminderTier, hours: f64) -> Result<bool, DepositGatewayError> {
        let (title, body) = reminder_copy(tier, &c.listing_title, c.seller_name.as_deref(), hours);
        let notification =
            deposit_reminder(&c.buyer_id, c.deposit_id, &c.listing_id, tier, c.expires_at, title.clone(), body.clone());
        if self.db.record_reminder(c.deposit_id, tier, notification).await?.is_none() {
            return Ok(false);
        }
        debug!("🔔️ {tier} reminder recorded for deposit #{}", c.deposit_id);
        self.push_to_devices(c, title, body).await;
        Ok(true)
    }

    async fn push_to_devices(&self, c: &ReminderCandidate, title: String, body: String) {
        let tokens = match self.db.fetch_active_push_tokens(&c.buyer_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("🔔️ Could not load push tokens for {}: {e}", c.buyer_id);
                return;
            },
        };
        if tokens.is_empty() {
            trace!("🔔️ {} has no registered devices", c.buyer_id);
            return;
        }
        let data = json!({
            "type": "deposit_reminder",
            "depositId": c.deposit_id,
            "listingId": c.listing_id,
            "screen": "deposit-confirmation",
            "params": { "id": c.deposit_id },
        });
        let messages = tokens
            .into_iter()
            .map(|t| PushMessage {
                to: t.token,
                title: title.clone(),
                body: body.clone(),
                data: data.clone(),
                channel_id: Some(DEPOSIT_PUSH_CHANNEL.to_string()),
            })
            .collect::<Vec<_>>();
        let n = messages.len();
        match self.push.send(messages).await {
            Ok(accepted) => debug!("🔔️ {accepted}/{n} pushes accepted for deposit #{}", c.deposit_id),
            Err(e) => warn!("🔔️ Push delivery for deposit #{} failed: {e}", c.deposit_id),
        }
    }
}
