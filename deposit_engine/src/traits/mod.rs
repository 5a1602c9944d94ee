//! # Backend and collaborator contracts
//!
//! This module defines the interfaces the deposit engine needs from the outside world.
//!
//! ## Backends
//! * [`DepositDatabase`] is the data store. Each of its methods is an atomic procedure: it either commits all of its
//!   effects or none of them. Concurrency safety for inventory and transaction rows lives here and nowhere else.
//! * [`NotificationManagement`] stores user-facing notifications and exposes the push-token registry.
//!
//! ## Collaborators
//! * [`PaymentProvider`] is the hosted payment gateway (transaction initialisation and verification).
//! * [`PushNotifier`] delivers push notifications to devices. [`NoopPushNotifier`] is used when push is not configured.
mod data_objects;
mod deposit_database;
mod notification_management;
mod payment_provider;
mod push_notifier;

pub use data_objects::{
    ChargeOutcome,
    ChargeStatus,
    PurposeEffect,
    RecoveryResult,
    ReminderCandidate,
    ReminderReport,
    SettlementResult,
    TrialExpiryResult,
};
pub use deposit_database::{DepositDatabase, DepositGatewayError};
pub use notification_management::NotificationManagement;
pub use payment_provider::{CheckoutRequest, CheckoutSession, PaymentProvider, PaymentProviderError, VerifiedCharge};
pub use push_notifier::{NoopPushNotifier, PushError, PushMessage, PushNotifier};
