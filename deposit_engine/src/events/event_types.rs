use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Deposit, PaymentTransaction},
    traits::PurposeEffect,
};

/// Emitted once per transaction, when a charge outcome moves it out of `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub transaction: PaymentTransaction,
    pub effect: PurposeEffect,
}

impl PaymentSettledEvent {
    pub fn new(transaction: PaymentTransaction, effect: PurposeEffect) -> Self {
        Self { transaction, effect }
    }
}

/// Emitted by the sweeper for every deposit whose hold lapsed and whose inventory was returned to the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationExpiredEvent {
    pub deposit: Deposit,
}

impl ReservationExpiredEvent {
    pub fn new(deposit: Deposit) -> Self {
        Self { deposit }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    PaymentSettled(PaymentSettledEvent),
    ReservationExpired(ReservationExpiredEvent),
}
