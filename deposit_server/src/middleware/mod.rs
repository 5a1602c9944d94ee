//! Request guards. Each reads its settings from the [`crate::config::GuardConfig`] app data, so they can be attached
//! to individual routes with the `route!` macro.
mod cron;
mod signature;
mod whitelist;

pub use cron::{CronMiddlewareFactory, CronMiddlewareService, CRON_SECRET_HEADER};
pub use signature::{SignatureMiddlewareFactory, SignatureMiddlewareService};
pub use whitelist::{WhitelistMiddlewareFactory, WhitelistMiddlewareService};
