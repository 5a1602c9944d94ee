//! # Deposit gateway server
//! This crate hosts the HTTP server for the deposit gateway. It is responsible for:
//! * Opening deposit checkouts for signed-in buyers.
//! * Receiving and authenticating Paystack webhooks, and handing the charge outcomes to the engine.
//! * Exposing the scheduled housekeeping jobs (reservation recovery, reminders, trial expiry) to an external cron, or
//!   running them itself.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [routes](routes/index.html) for the full list. `/health` returns a 200 OK response.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod scheduler;
pub mod server;
