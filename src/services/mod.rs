//! Service implementations for the invoice API.

mod invoices;

pub use invoices::{InvoiceOperation, InvoiceService, INVOICES_PATH};
