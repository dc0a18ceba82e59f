use crate::error::AppError;
use crate::polyline::PolylineError;
use crate::resilience::connectivity::ConnectionQuality;
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Low-level failure of an outbound call, before classification.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportFailure {
    #[error("host resolution failed: {0}")]
    Dns(String),

    #[error("connection refused or unreachable: {0}")]
    ConnectionRefused(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("TLS handshake failed: {0}")]
    Tls(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("malformed provider response: {0}")]
    Parse(String),

    #[error("invalid route geometry: {0}")]
    Decode(#[from] PolylineError),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        let detail = err.to_string();
        if err.is_timeout() {
            return TransportFailure::Timeout(detail);
        }

        if let Some(io_err) = find_io_error(&err) {
            match io_err.kind() {
                io::ErrorKind::TimedOut => return TransportFailure::Timeout(detail),
                io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::AddrNotAvailable => {
                    return TransportFailure::ConnectionRefused(detail)
                }
                _ => {}
            }
        }

        let chain = error_chain_text(&err);
        if chain.contains("dns error")
            || chain.contains("failed to lookup address")
            || chain.contains("name or service not known")
            || chain.contains("no such host")
        {
            return TransportFailure::Dns(detail);
        }
        if chain.contains("unreachable") || chain.contains("connection refused") {
            return TransportFailure::ConnectionRefused(detail);
        }
        if chain.contains("certificate") || chain.contains("tls") || chain.contains("ssl") {
            return TransportFailure::Tls(detail);
        }
        if err.is_decode() {
            return TransportFailure::Parse(detail);
        }
        if err.is_connect() || err.is_request() || err.is_body() {
            return TransportFailure::Io(detail);
        }
        if let Some(status) = err.status() {
            return TransportFailure::Http {
                status: status.as_u16(),
                body: detail,
            };
        }

        TransportFailure::Other(detail)
    }
}

fn find_io_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        source = inner.source();
    }
    None
}

fn error_chain_text(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text.to_lowercase()
}

/// Map a transport failure to the user-facing taxonomy, given the quality
/// observed when the failure happened. First matching rule wins.
pub fn classify(failure: &TransportFailure, quality: ConnectionQuality) -> AppError {
    let reachable = quality.is_reachable();

    match failure {
        TransportFailure::Dns(_) if reachable => AppError::ServerError(0),
        TransportFailure::Dns(_) => AppError::NoInternet,
        TransportFailure::ConnectionRefused(_) => AppError::NoInternet,
        TransportFailure::Timeout(_) => match quality {
            ConnectionQuality::None => AppError::NoInternet,
            ConnectionQuality::Poor | ConnectionQuality::CellularPoor => AppError::SlowConnection,
            ConnectionQuality::CellularGood | ConnectionQuality::Wifi => AppError::ServerTimeout,
        },
        TransportFailure::Tls(_) => AppError::ServerError(0),
        TransportFailure::Http { status, .. } => classify_status(*status),
        TransportFailure::Io(_) if reachable => AppError::SlowConnection,
        TransportFailure::Io(_) => AppError::NoInternet,
        other => AppError::Unknown(other.to_string()),
    }
}

fn classify_status(status: u16) -> AppError {
    match status {
        400 => AppError::LocationNotFound,
        401 | 403 => AppError::ApiKeyInvalid,
        429 => AppError::RateLimitExceeded,
        code => AppError::ServerError(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> TransportFailure {
        TransportFailure::Http {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_dns_depends_on_reachability() {
        let dns = TransportFailure::Dns("lookup failed".into());
        assert_eq!(classify(&dns, ConnectionQuality::Wifi), AppError::ServerError(0));
        assert_eq!(classify(&dns, ConnectionQuality::Poor), AppError::ServerError(0));
        assert_eq!(classify(&dns, ConnectionQuality::None), AppError::NoInternet);
    }

    #[test]
    fn test_refused_is_no_internet() {
        let refused = TransportFailure::ConnectionRefused("refused".into());
        assert_eq!(classify(&refused, ConnectionQuality::Wifi), AppError::NoInternet);
    }

    #[test]
    fn test_timeout_branches_on_quality() {
        let timeout = TransportFailure::Timeout("read".into());
        assert_eq!(classify(&timeout, ConnectionQuality::None), AppError::NoInternet);
        assert_eq!(classify(&timeout, ConnectionQuality::Poor), AppError::SlowConnection);
        assert_eq!(
            classify(&timeout, ConnectionQuality::CellularPoor),
            AppError::SlowConnection
        );
        assert_eq!(
            classify(&timeout, ConnectionQuality::CellularGood),
            AppError::ServerTimeout
        );
        assert_eq!(classify(&timeout, ConnectionQuality::Wifi), AppError::ServerTimeout);
    }

    #[test]
    fn test_tls_is_server_error_zero() {
        let tls = TransportFailure::Tls("bad certificate".into());
        let error = classify(&tls, ConnectionQuality::Wifi);
        assert_eq!(error, AppError::ServerError(0));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_http_status_mapping() {
        let q = ConnectionQuality::Wifi;
        assert_eq!(classify(&http(400), q), AppError::LocationNotFound);
        assert_eq!(classify(&http(401), q), AppError::ApiKeyInvalid);
        assert_eq!(classify(&http(403), q), AppError::ApiKeyInvalid);
        assert_eq!(classify(&http(429), q), AppError::RateLimitExceeded);
        assert_eq!(classify(&http(500), q), AppError::ServerError(500));
        assert_eq!(classify(&http(503), q), AppError::ServerError(503));
        assert_eq!(classify(&http(404), q), AppError::ServerError(404));
    }

    #[test]
    fn test_generic_io_depends_on_reachability() {
        let io = TransportFailure::Io("connection closed".into());
        assert_eq!(classify(&io, ConnectionQuality::CellularGood), AppError::SlowConnection);
        assert_eq!(classify(&io, ConnectionQuality::None), AppError::NoInternet);
    }

    #[test]
    fn test_unmatched_is_unknown_with_cause() {
        let parse = TransportFailure::Parse("expected value at line 1".into());
        match classify(&parse, ConnectionQuality::Wifi) {
            AppError::Unknown(cause) => assert!(cause.contains("expected value")),
            other => panic!("expected Unknown, got {:?}", other),
        }

        let decode = TransportFailure::from(PolylineError::Truncated { position: 3 });
        assert!(matches!(
            classify(&decode, ConnectionQuality::Wifi),
            AppError::Unknown(_)
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_from_reqwest() {
        // Bind then drop to get a local port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();

        assert!(matches!(
            TransportFailure::from(err),
            TransportFailure::ConnectionRefused(_)
        ));
    }
}
