pub mod expo;
pub mod paystack;
