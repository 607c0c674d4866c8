//! Request bodies for the two structurally complex endpoints.
//!
//! Builders are consumed by value: every `with_*` step returns a new
//! builder, and `to_payload` is a pure function of the current fields.

pub mod contact;
pub mod order;

pub use contact::Contact;
pub use order::{Order, OrderType};
