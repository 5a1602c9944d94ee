//! A small, typed client for the Paystack endpoints the deposit gateway relies on: transaction initialization and
//! verification. It also knows how to check the signature Paystack attaches to webhook deliveries.
mod api;
mod config;
mod data_objects;
mod error;
mod helpers;

pub use api::PaystackApi;
pub use config::PaystackConfig;
pub use data_objects::{
    ChargeData,
    InitializeData,
    InitializeTransaction,
    PaystackCustomer,
    PaystackResponse,
    PaystackWebhook,
    VerifyData,
    CHARGE_FAILED,
    CHARGE_SUCCESS,
};
pub use error::PaystackApiError;
pub use helpers::{calculate_signature, verify_signature, PAYSTACK_SIGNATURE_HEADER};
