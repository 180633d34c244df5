//! Error classification logic
//!
//! Two total functions over [`Error`]:
//! - [`is_retryable`]: the default retry predicate used around the API call.
//! - [`classify`]: the terminal mapping into an [`AppError`] for display.

use std::error::Error as StdError;
use std::io;

use crate::app_error::AppError;
use crate::transport::TransportError;
use crate::Error;

const MSG_SOCKET_TIMEOUT: &str =
    "接続がタイムアウトしました。インターネット接続を確認してください。";
const MSG_CONNECT_TIMEOUT: &str =
    "サーバーに接続できませんでした。インターネット接続を確認してください。";
const MSG_BAD_REQUEST: &str = "リクエストが無効です。";
const MSG_INVALID_KEY: &str = "APIキーが無効です。設定を確認してください。";
const MSG_FORBIDDEN: &str = "APIキーの権限が不足しています。";
const MSG_NOT_FOUND: &str = "APIエンドポイントが見つかりません。";
const MSG_RATE_LIMITED: &str = "リクエストが多すぎます。しばらく待ってからお試しください。";
const MSG_INTERNAL: &str = "サーバー内部エラーが発生しました。しばらく待ってからお試しください。";
const MSG_BAD_GATEWAY: &str = "サーバーが利用できません。しばらく待ってからお試しください。";
const MSG_UNAVAILABLE: &str =
    "サービスが一時的に利用できません。しばらく待ってからお試しください。";
const MSG_SERIALIZATION: &str = "データの解析に失敗しました。";
const MSG_UNEXPECTED: &str = "予期しないエラーが発生しました";

/// Default retry predicate.
///
/// - connect / socket timeouts and refused connections: retry
/// - HTTP 429 and 5xx: retry
/// - any other 4xx: never
/// - serialization and configuration problems: never
/// - anything else: only when a cause in its `source()` chain is a dropped
///   connection, or mentions the network or a connection
pub fn is_retryable(err: &Error) -> bool {
    match err {
        Error::Transport(
            TransportError::ConnectTimeout(_)
            | TransportError::SocketTimeout(_)
            | TransportError::Connect(_),
        ) => true,
        Error::Remote { status, .. } => *status == 429 || (500..=599).contains(status),
        Error::Serialization(_) | Error::Configuration { .. } | Error::Storage { .. } => false,
        Error::Transport(t) => transient_cause(t),
        Error::Io(e) => transient_cause(e),
        Error::Unknown { .. } => transient_cause(err),
    }
}

/// `err` followed by every error in its `source()` chain.
fn causes<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

fn transient_cause(err: &(dyn StdError + 'static)) -> bool {
    causes(err).any(|c| is_dropped_connection(c) || mentions_network(&c.to_string()))
}

fn is_dropped_connection(err: &(dyn StdError + 'static)) -> bool {
    err.downcast_ref::<io::Error>().is_some_and(|e| {
        matches!(
            e.kind(),
            io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::ConnectionRefused
                | io::ErrorKind::NotConnected
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
        )
    })
}

fn mentions_network(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("network") || m.contains("connection")
}

/// Display of `err` with each cause appended, skipping causes whose text the
/// previous message already contains.
fn chain_message(err: &Error) -> String {
    let mut out = String::new();
    let mut last = String::new();
    for cause in causes(err as &(dyn StdError + 'static)) {
        let text = cause.to_string();
        if text.trim().is_empty() || last.contains(&text) {
            continue;
        }
        if !out.is_empty() {
            out.push_str(": ");
        }
        out.push_str(&text);
        last = text;
    }
    out
}

/// Map an HTTP error status to its user-facing error.
///
/// Returns `None` for statuses outside 4xx/5xx.
pub fn classify_status(status: u16) -> Option<AppError> {
    let err = match status {
        400 => AppError::network(MSG_BAD_REQUEST),
        401 => AppError::authentication(MSG_INVALID_KEY),
        403 => AppError::authentication(MSG_FORBIDDEN),
        404 => AppError::network(MSG_NOT_FOUND),
        429 => AppError::network(MSG_RATE_LIMITED),
        500 => AppError::network(MSG_INTERNAL),
        502 => AppError::network(MSG_BAD_GATEWAY),
        503 => AppError::network(MSG_UNAVAILABLE),
        400..=599 => AppError::network(format!("サーバーエラーが発生しました ({})", status)),
        _ => return None,
    };
    Some(err)
}

/// Classify a raw failure into exactly one terminal [`AppError`].
pub fn classify(err: &Error) -> AppError {
    match err {
        Error::Transport(TransportError::SocketTimeout(_)) => AppError::network(MSG_SOCKET_TIMEOUT),
        Error::Transport(TransportError::ConnectTimeout(_)) => {
            AppError::network(MSG_CONNECT_TIMEOUT)
        }
        Error::Remote { status, .. } => {
            classify_status(*status).unwrap_or_else(|| unknown(err))
        }
        Error::Serialization(_) => AppError::serialization(MSG_SERIALIZATION),
        _ => unknown(err),
    }
}

fn unknown(err: &Error) -> AppError {
    let message = chain_message(err);
    if message.trim().is_empty() {
        AppError::unknown(MSG_UNEXPECTED)
    } else {
        AppError::unknown(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_error::AppErrorKind;

    fn remote(status: u16) -> Error {
        Error::Remote {
            status,
            message: "boom".into(),
        }
    }

    #[test]
    fn retryable_statuses() {
        for status in [429u16, 500, 502, 503, 504, 529] {
            assert!(is_retryable(&remote(status)), "{} should retry", status);
        }
        for status in [400u16, 401, 403, 404, 409, 413] {
            assert!(!is_retryable(&remote(status)), "{} should not retry", status);
        }
    }

    #[test]
    fn serialization_is_never_retried() {
        let err = Error::from(serde_json::from_str::<u32>("x").unwrap_err());
        assert!(!is_retryable(&err));
        assert_eq!(classify(&err).kind(), AppErrorKind::Serialization);
    }

    #[test]
    fn network_wording_makes_other_failures_retryable() {
        let err = Error::Transport(TransportError::Other("Network is unreachable".into()));
        assert!(is_retryable(&err));
        let err = Error::Transport(TransportError::Other("certificate rejected".into()));
        assert!(!is_retryable(&err));
    }

    #[test]
    fn dropped_connection_in_source_chain_is_retryable() {
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer (os error 104)");
        let err = Error::Transport(TransportError::Http(Box::new(reset)));
        assert!(is_retryable(&err));

        let err = Error::Io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(is_retryable(&err));

        let err = Error::Transport(TransportError::Http(Box::new(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid chunk size",
        ))));
        assert!(!is_retryable(&err));
    }

    #[test]
    fn unknown_message_keeps_the_cause() {
        let err = Error::Transport(TransportError::Http(Box::new(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "Connection reset by peer (os error 104)",
        ))));
        let app = classify(&err);
        assert_eq!(app.kind(), AppErrorKind::Unknown);
        assert_eq!(
            app.user_message(),
            "Network transport error: HTTP error: Connection reset by peer (os error 104)"
        );
    }

    #[test]
    fn timeouts_map_to_network_messages_and_retry() {
        let timed_out = || -> crate::transport::BoxError {
            Box::new(io::Error::from(io::ErrorKind::TimedOut))
        };

        let err = Error::Transport(TransportError::from_flags(true, true, timed_out()));
        assert!(is_retryable(&err));
        let app = classify(&err);
        assert_eq!(app.kind(), AppErrorKind::Network);
        assert_eq!(app.user_message(), MSG_CONNECT_TIMEOUT);

        let err = Error::Transport(TransportError::from_flags(true, false, timed_out()));
        assert!(is_retryable(&err));
        let app = classify(&err);
        assert_eq!(app.kind(), AppErrorKind::Network);
        assert_eq!(app.user_message(), MSG_SOCKET_TIMEOUT);
    }

    #[test]
    fn status_table() {
        let cases: &[(u16, AppErrorKind, &str)] = &[
            (400, AppErrorKind::Network, MSG_BAD_REQUEST),
            (401, AppErrorKind::Authentication, MSG_INVALID_KEY),
            (403, AppErrorKind::Authentication, MSG_FORBIDDEN),
            (404, AppErrorKind::Network, MSG_NOT_FOUND),
            (429, AppErrorKind::Network, MSG_RATE_LIMITED),
            (500, AppErrorKind::Network, MSG_INTERNAL),
            (502, AppErrorKind::Network, MSG_BAD_GATEWAY),
            (503, AppErrorKind::Network, MSG_UNAVAILABLE),
        ];
        for (status, kind, message) in cases {
            let err = classify(&remote(*status));
            assert_eq!(err.kind(), *kind, "status {}", status);
            assert_eq!(err.user_message(), *message, "status {}", status);
        }
    }

    #[test]
    fn unlisted_statuses_use_generic_message() {
        let err = classify(&remote(418));
        assert_eq!(err.kind(), AppErrorKind::Network);
        assert_eq!(err.user_message(), "サーバーエラーが発生しました (418)");

        let err = classify(&remote(504));
        assert_eq!(err.user_message(), "サーバーエラーが発生しました (504)");
    }

    #[test]
    fn everything_else_is_unknown_with_verbatim_message() {
        let err = Error::unknown_with_context("disk on fire", Default::default());
        let app = classify(&err);
        assert_eq!(app.kind(), AppErrorKind::Unknown);
        assert_eq!(app.user_message(), "Unknown error: disk on fire");

        assert_eq!(classify(&remote(302)).kind(), AppErrorKind::Unknown);
    }
}
