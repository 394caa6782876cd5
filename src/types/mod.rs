//! Type definitions for the invoice API.

pub mod invoice;

pub use invoice::Invoice;
