use chrono::Duration;

use crate::db_types::Pesewas;

pub const DEFAULT_AMOUNT_PER_UNIT: i64 = 2_000;
pub const DEFAULT_PENDING_HOLD_MINUTES: i64 = 30;
pub const DEFAULT_PAID_HOLD_HOURS: i64 = 72;

/// The commercial terms of a deposit: how much it costs and how long each kind of hold lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositTerms {
    /// Charged per reserved unit
    pub amount_per_unit: Pesewas,
    /// How long an unpaid reservation holds inventory before the sweeper reclaims it
    pub pending_hold: Duration,
    /// How long the buyer has to confirm the meetup once the deposit is paid
    pub paid_hold: Duration,
}

impl Default for DepositTerms {
    fn default() -> Self {
        Self {
            amount_per_unit: Pesewas::from(DEFAULT_AMOUNT_PER_UNIT),
            pending_hold: Duration::minutes(DEFAULT_PENDING_HOLD_MINUTES),
            paid_hold: Duration::hours(DEFAULT_PAID_HOLD_HOURS),
        }
    }
}
