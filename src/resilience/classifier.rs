//! Response classification.
//!
//! Maps the result of one transport attempt onto either a decoded value or
//! a classified [`InvoiceError`]:
//!
//! | Outcome                         | Result                  |
//! |---------------------------------|-------------------------|
//! | 2xx and the body decodes        | `Ok(value)`             |
//! | 2xx and the body does not decode| `Serialization` error   |
//! | 4xx                             | `Client` error          |
//! | 5xx                             | `Server` error          |
//! | 1xx, 3xx or out-of-range status | `Server` error          |
//! | transport failure               | `Server` error, status 0 |

use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::errors::{InvoiceError, InvoiceResult, NO_RESPONSE_STATUS};
use crate::transport::{HttpResponse, TransportError};

/// Message carried by errors built from a 4xx status.
pub const CLIENT_ERROR_MESSAGE: &str = "Client error";

/// Message carried by errors built from a 5xx status.
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Coarse class of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200-299.
    Success,
    /// 400-499.
    ClientError,
    /// 500-599.
    ServerError,
    /// Anything else, including redirects.
    Unexpected,
}

impl StatusClass {
    /// Classifies a raw status code.
    pub fn of(status: u16) -> Self {
        match StatusCode::from_u16(status) {
            Ok(code) if code.is_success() => StatusClass::Success,
            Ok(code) if code.is_client_error() => StatusClass::ClientError,
            Ok(code) if code.is_server_error() => StatusClass::ServerError,
            _ => StatusClass::Unexpected,
        }
    }
}

/// Classifies the result of a single transport attempt.
///
/// `decode` is only invoked for 2xx responses.
pub fn classify<T, D>(outcome: Result<HttpResponse, TransportError>, decode: D) -> InvoiceResult<T>
where
    D: FnOnce(&HttpResponse) -> InvoiceResult<T>,
{
    let response = match outcome {
        Ok(response) => response,
        Err(err) => return Err(InvoiceError::server(err.to_string(), NO_RESPONSE_STATUS)),
    };

    match StatusClass::of(response.status) {
        StatusClass::Success => decode(&response),
        StatusClass::ClientError => {
            Err(InvoiceError::client(CLIENT_ERROR_MESSAGE, response.status))
        }
        StatusClass::ServerError => {
            Err(InvoiceError::server(SERVER_ERROR_MESSAGE, response.status))
        }
        StatusClass::Unexpected => Err(InvoiceError::server(
            format!("Unexpected HTTP status {}", response.status),
            response.status,
        )),
    }
}

/// Media type of newline-delimited JSON bodies.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Decodes a JSON success body.
pub fn json_body<T: DeserializeOwned>(response: &HttpResponse) -> InvoiceResult<T> {
    response.json().map_err(parse_error)
}

/// Decodes a collection body.
///
/// An `application/x-ndjson` body holds one JSON value per line and blank
/// lines are skipped. Any other body must be a JSON array.
pub fn json_list_body<T: DeserializeOwned>(response: &HttpResponse) -> InvoiceResult<Vec<T>> {
    if response.content_type() != Some(NDJSON_CONTENT_TYPE) {
        return json_body(response);
    }

    response
        .body
        .split(|byte| *byte == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .map(|line| serde_json::from_slice(line).map_err(parse_error))
        .collect()
}

fn parse_error(err: serde_json::Error) -> InvoiceError {
    InvoiceError::Serialization {
        message: format!("Failed to parse response: {}", err),
    }
}

/// Accepts any success body and discards it.
pub fn empty_body(_response: &HttpResponse) -> InvoiceResult<()> {
    Ok(())
}
