//! Serenity error classification.
//!
//! Turns serenity errors into the `PlatformError` values the purge engine
//! folds into its counts, and gives handlers a `log_error` that picks the
//! log level from the classification.

use ping_purge::PlatformError;
use ping_types::{DiscordErrorCode, ErrorCategory};
use serenity::http::HttpError;
use tracing::{debug, error, warn};

/// How much a failure matters for the call that hit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Retrying the same call will fail the same way.
    Permanent,
    /// Worth retrying after a delay.
    Retryable,
    /// Neither; log and move on.
    Transient,
}

impl Severity {
    pub fn of(code: DiscordErrorCode) -> Self {
        if code.is_permanent() {
            Self::Permanent
        } else if code.is_retryable() {
            Self::Retryable
        } else {
            Self::Transient
        }
    }
}

/// Resolve the Discord error code of an unsuccessful response. The JSON
/// code wins when it is known; otherwise the HTTP status decides.
pub fn resolve_code(status: u16, raw_code: u32) -> DiscordErrorCode {
    match DiscordErrorCode::from_raw(raw_code) {
        DiscordErrorCode::Unknown => DiscordErrorCode::from_status(status),
        known => known,
    }
}

fn classify(context: &str, err: &serenity::Error) -> (Severity, PlatformError) {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) => {
            let status = resp.status_code.as_u16();
            let raw_code = resp.error.code as u32;
            let code = resolve_code(status, raw_code);
            let severity = Severity::of(code);
            match severity {
                Severity::Permanent => warn!(
                    "Permanent Discord error on '{}' (HTTP {} / code {}): {}",
                    context, status, raw_code, resp.error.message
                ),
                Severity::Retryable => warn!(
                    "Retryable Discord error on '{}' (HTTP {} / code {}): {}",
                    context, status, raw_code, resp.error.message
                ),
                Severity::Transient => debug!(
                    "Transient Discord error on '{}' (HTTP {} / code {}): {}",
                    context, status, raw_code, resp.error.message
                ),
            }
            (severity, to_platform(code, &resp.error.message))
        }
        _ => {
            debug!("Non-API serenity error on '{}': {}", context, err);
            (
                Severity::of(DiscordErrorCode::NetworkError),
                PlatformError::Transient(err.to_string()),
            )
        }
    }
}

/// Classify a serenity `Error` raised by the call described in `context`.
pub fn to_platform_error(context: &str, err: &serenity::Error) -> PlatformError {
    classify(context, err).1
}

/// Map an unsuccessful HTTP response onto the engine's error taxonomy.
///
/// The retry-after hint is not exposed by serenity's error type, so rate
/// limits carry none.
pub fn classify_response(status: u16, raw_code: u32, message: &str) -> PlatformError {
    to_platform(resolve_code(status, raw_code), message)
}

fn to_platform(code: DiscordErrorCode, message: &str) -> PlatformError {
    match code.category() {
        ErrorCategory::NotFound => PlatformError::NotFound(message.to_string()),
        ErrorCategory::PermissionDenied => PlatformError::PermissionDenied(message.to_string()),
        ErrorCategory::RateLimit => PlatformError::RateLimited { retry_after: None },
        _ => PlatformError::Transient(format!("{:?}: {}", code, message)),
    }
}

/// Log a serenity error at the level its severity calls for.
///
/// - Permanent errors → `error!`
/// - Rate limits and transient errors → `warn!`
pub fn log_error(context: &str, err: &serenity::Error) {
    match classify(context, err) {
        (Severity::Permanent, e) => error!("{}: {}", context, e),
        (_, e) => warn!("{}: {}", context, e),
    }
}
