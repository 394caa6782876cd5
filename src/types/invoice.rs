//! Invoice resource type.

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::errors::{InvoiceError, InvoiceResult};

/// An invoice as exchanged with the downstream service.
///
/// Serialized as `{"id": 1 | null, "issued": "YYYY-MM-DD", "total": 1000.0}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Identifier, `None` until the server assigns one.
    #[serde(default)]
    pub id: Option<i64>,

    /// Issue date.
    pub issued: NaiveDate,

    /// Total amount.
    #[serde(
        serialize_with = "serialize_decimal",
        deserialize_with = "deserialize_decimal"
    )]
    pub total: BigDecimal,
}

impl Invoice {
    /// Creates an invoice that has not been assigned an id yet.
    pub fn new(issued: NaiveDate, total: BigDecimal) -> Self {
        Self {
            id: None,
            issued,
            total,
        }
    }

    /// Creates an invoice with a known id.
    pub fn with_id(id: i64, issued: NaiveDate, total: BigDecimal) -> Self {
        Self {
            id: Some(id),
            issued,
            total,
        }
    }

    /// Validates the invoice against the local calendar date.
    pub fn validate(&self) -> InvoiceResult<()> {
        self.validate_on(chrono::Local::now().date_naive())
    }

    /// Validates the invoice as of `today`.
    ///
    /// The issue date must not be after `today` and the total must be
    /// strictly positive. Violations are reported as a 400 client error.
    pub fn validate_on(&self, today: NaiveDate) -> InvoiceResult<()> {
        if self.issued > today {
            return Err(InvoiceError::client(
                format!("Invoice issue date {} is in the future", self.issued),
                400,
            ));
        }

        if self.total <= BigDecimal::zero() {
            return Err(InvoiceError::client(
                format!("Invoice total must be positive, got {}", self.total),
                400,
            ));
        }

        Ok(())
    }
}

fn serialize_decimal<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    let number = serde_json::Number::from_str(&value.to_string())
        .map_err(serde::ser::Error::custom)?;
    number.serialize(serializer)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DecimalRepr {
    Number(serde_json::Number),
    Text(String),
}

fn deserialize_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
    let text = match DecimalRepr::deserialize(deserializer)? {
        DecimalRepr::Number(number) => number.to_string(),
        DecimalRepr::Text(text) => text,
    };
    BigDecimal::from_str(text.trim()).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn amount(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_invoice_wire_shape() {
        let invoice = Invoice::with_id(1, date("2021-02-01"), amount("1000"));

        let json = serde_json::to_value(&invoice).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"id": 1, "issued": "2021-02-01", "total": 1000})
        );
    }

    #[test]
    fn test_unassigned_id_serializes_as_null() {
        let invoice = Invoice::new(date("2021-02-01"), amount("12.5"));

        let json = serde_json::to_value(&invoice).unwrap();

        assert!(json["id"].is_null());
        assert_eq!(json["total"], serde_json::json!(12.5));
    }

    #[test]
    fn test_total_accepts_number_and_string() {
        let from_number: Invoice =
            serde_json::from_str(r#"{"id":2,"issued":"2021-02-02","total":2000.0}"#).unwrap();
        let from_text: Invoice =
            serde_json::from_str(r#"{"id":2,"issued":"2021-02-02","total":"2000.00"}"#).unwrap();

        assert_eq!(from_number.total, amount("2000"));
        assert_eq!(from_text.total, amount("2000"));
        assert_eq!(from_number, from_text);
    }

    #[test]
    fn test_missing_id_defaults_to_none() {
        let invoice: Invoice =
            serde_json::from_str(r#"{"issued":"2021-02-03","total":3000}"#).unwrap();

        assert_eq!(invoice.id, None);
    }

    #[test]
    fn test_validate_rejects_future_issue_date() {
        let invoice = Invoice::new(date("2021-02-02"), amount("10"));

        let error = invoice.validate_on(date("2021-02-01")).unwrap_err();

        assert_eq!(error.status_code(), Some(400));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_validate_rejects_non_positive_total() {
        let today = date("2021-03-01");

        assert!(Invoice::new(date("2021-02-01"), amount("0")).validate_on(today).is_err());
        assert!(Invoice::new(date("2021-02-01"), amount("-1.5")).validate_on(today).is_err());
        assert!(Invoice::new(today, amount("0.01")).validate_on(today).is_ok());
    }
}
