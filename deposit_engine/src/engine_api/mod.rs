//! # Deposit engine public API
//!
//! The `engine_api` module exposes the programmatic API of the deposit engine. Each API struct is created by supplying
//! a backend that implements the traits it needs, plus any collaborators (payment gateway, push service).
//!
//! * [`DepositFlowApi`] reserves inventory and opens a gateway checkout for a buyer's deposit.
//! * [`ReconciliationApi`] applies gateway charge outcomes, from webhooks or explicit verification.
//! * [`SweeperApi`] reclaims lapsed holds and ends expired trials.
//! * [`ReminderApi`] sends the countdown reminders for paid deposits.
//!
//! ```rust,ignore
//! use deposit_engine::{DepositFlowApi, DepositTerms, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = DepositFlowApi::new(db, paystack, DepositTerms::default());
//! let checkout = api.initialize_deposit(&caller_id, request).await?;
//! ```
mod deposit_flow_api;
mod errors;
mod flow_objects;
mod reconciliation_api;
mod reminder_api;
mod sweeper_api;
mod terms;

pub use deposit_flow_api::DepositFlowApi;
pub use errors::{DepositFlowError, ReconciliationError};
pub use flow_objects::{DepositCheckout, EventOutcome, GatewayEvent, WebhookDisposition};
pub use reconciliation_api::ReconciliationApi;
pub use reminder_api::{ReminderApi, DEPOSIT_PUSH_CHANNEL};
pub use sweeper_api::SweeperApi;
pub use terms::DepositTerms;
