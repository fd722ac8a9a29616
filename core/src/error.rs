//! Error types for REST client operations.
//!
//! # Design
//! Every variant carries the endpoint name and the resolved URL because
//! callers log and re-raise these errors far from the call site, where that
//! context is otherwise gone. [`RestError::Io`] and [`RestError::Parse`]
//! wrap their underlying cause as a `source`; [`RestError::Http`] carries
//! the status line itself, with any error body preserved as plain detail
//! text.

use thiserror::Error;

/// Boxed cause wrapped by [`RestError::Io`] and [`RestError::Parse`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by `RestClient` operations.
#[derive(Error, Debug)]
pub enum RestError {
    /// The network exchange could not be established or completed.
    #[error("{source}")]
    Io {
        endpoint: String,
        url: String,
        #[source]
        source: BoxError,
    },

    /// The server answered with a status code of 400 or above.
    #[error("{status} {reason}")]
    Http {
        endpoint: String,
        url: String,
        status: u16,
        reason: String,
        /// Error response body, when it could be read.
        detail: Option<String>,
    },

    /// A body arrived but the transformer could not produce a value.
    #[error("{source}")]
    Parse {
        endpoint: String,
        url: String,
        #[source]
        source: BoxError,
    },
}

impl RestError {
    /// Name of the endpoint the failing request targeted.
    pub fn endpoint_name(&self) -> &str {
        match self {
            RestError::Io { endpoint, .. }
            | RestError::Http { endpoint, .. }
            | RestError::Parse { endpoint, .. } => endpoint,
        }
    }

    /// Fully resolved URL of the failing request.
    pub fn url(&self) -> &str {
        match self {
            RestError::Io { url, .. }
            | RestError::Http { url, .. }
            | RestError::Parse { url, .. } => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn refused() -> RestError {
        RestError::Io {
            endpoint: "orders".to_string(),
            url: "http://localhost:4000/orders".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )),
        }
    }

    fn not_found() -> RestError {
        RestError::Http {
            endpoint: "orders".to_string(),
            url: "http://localhost:4000/orders/7".to_string(),
            status: 404,
            reason: "Not Found".to_string(),
            detail: Some("no such order".to_string()),
        }
    }

    #[test]
    fn io_displays_the_cause_description() {
        assert_eq!(refused().to_string(), "connection refused");
    }

    #[test]
    fn http_displays_status_and_reason() {
        assert_eq!(not_found().to_string(), "404 Not Found");
    }

    #[test]
    fn parse_displays_the_cause_description() {
        let err = RestError::Parse {
            endpoint: "orders".to_string(),
            url: "http://localhost:4000/orders".to_string(),
            source: "unexpected token".into(),
        };
        assert_eq!(err.to_string(), "unexpected token");
    }

    #[test]
    fn every_variant_exposes_endpoint_and_url() {
        assert_eq!(refused().endpoint_name(), "orders");
        assert_eq!(refused().url(), "http://localhost:4000/orders");
        assert_eq!(not_found().endpoint_name(), "orders");
        assert_eq!(not_found().url(), "http://localhost:4000/orders/7");
    }

    #[test]
    fn wrapped_causes_are_chained_as_sources() {
        assert!(refused().source().is_some());
        assert!(not_found().source().is_none());
    }
}
