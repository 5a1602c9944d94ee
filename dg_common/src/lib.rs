mod helpers;
mod pesewas;

pub mod op;
mod secret;

pub use helpers::{parse_boolean_flag, parse_comma_separated};
pub use pesewas::{Pesewas, PesewasConversionError, GHS_CURRENCY_CODE, PESEWAS_PER_CEDI};
pub use secret::Secret;
