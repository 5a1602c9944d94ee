mod notices;
mod reference;

pub use notices::*;
pub use reference::{is_deposit_reference, new_deposit_reference, DEPOSIT_REFERENCE_PREFIX};
