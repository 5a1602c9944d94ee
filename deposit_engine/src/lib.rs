//! Deposit Engine
//!
//! The deposit engine holds the core logic of the deposit gateway: buyers place a refundable deposit against a
//! marketplace listing, which reserves inventory until the parties meet up. The engine is provider-agnostic. The
//! payment gateway and push service are reached through the traits in [`traits`].
//!
//! The library is divided into three main sections:
//! 1. The backend contracts ([`traits`]) and their SQLite implementation ([`SqliteDatabase`]). Every backend method is
//!    an atomic procedure, and the backend is the only place where concurrent requests are arbitrated. The data types
//!    stored in the database live in [`db_types`].
//! 2. The public API ([`engine_api`]): deposit initialization, charge reconciliation, the expiry sweeper and the
//!    reminder dispatcher.
//! 3. Events that can be subscribed to. [`events::PaymentSettledEvent`] is emitted when a charge moves a transaction
//!    out of `pending`, and [`events::ReservationExpiredEvent`] when the sweeper reclaims a hold.
pub mod db_types;
pub mod engine_api;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(feature = "sqlite", any(feature = "test_utils", test)))]
pub mod test_utils;

pub use engine_api::{
    DepositCheckout,
    DepositFlowApi,
    DepositFlowError,
    DepositTerms,
    EventOutcome,
    GatewayEvent,
    ReconciliationApi,
    ReconciliationError,
    ReminderApi,
    SweeperApi,
    WebhookDisposition,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{DepositDatabase, DepositGatewayError, NotificationManagement};
