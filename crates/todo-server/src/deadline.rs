//! Request deadlines
//!
//! Every RPC runs under `min(request_timeout, grpc-timeout)`. The client's
//! `grpc-timeout` header is optional; when it is missing or malformed the
//! server-side timeout applies alone. A handler that runs out of time
//! returns `DEADLINE_EXCEEDED` and drops whatever it was doing, so a
//! half-finished cache write is simply a miss on the next read.

use std::future::Future;
use std::time::Duration;
use tonic::metadata::MetadataMap;
use tonic::{Request, Status};
use tracing::warn;

const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Remaining time the client is willing to wait, if it said so.
pub fn extract_deadline<T>(request: &Request<T>) -> Option<Duration> {
    extract_deadline_from_metadata(request.metadata())
}

pub fn extract_deadline_from_metadata(metadata: &MetadataMap) -> Option<Duration> {
    let value = metadata.get(GRPC_TIMEOUT_HEADER)?.to_str().ok()?;
    parse_grpc_timeout(value)
}

pub fn effective_timeout(request_timeout: Duration, grpc_deadline: Option<Duration>) -> Duration {
    match grpc_deadline {
        Some(deadline) => request_timeout.min(deadline),
        None => request_timeout,
    }
}

/// Runs `call`, failing with `DEADLINE_EXCEEDED` once `timeout` elapses.
pub async fn run_with_deadline<F, T>(method: &'static str, timeout: Duration, call: F) -> Result<T, Status>
where
    F: Future<Output = Result<T, Status>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(method, timeout_ms = timeout.as_millis() as u64, "Request deadline exceeded");
            Err(Status::deadline_exceeded(format!(
                "{} did not complete within {}ms",
                method,
                timeout.as_millis()
            )))
        }
    }
}

/// `{value}{unit}` with at most 8 digits; units H, M, S, m, u, n.
fn parse_grpc_timeout(s: &str) -> Option<Duration> {
    if s.len() < 2 || !s.is_ascii() {
        return None;
    }

    let (digits, unit) = s.split_at(s.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(value * 3600)),
        "M" => Some(Duration::from_secs(value * 60)),
        "S" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_millis(value)),
        "u" => Some(Duration::from_micros(value)),
        "n" => Some(Duration::from_nanos(value)),
        _ => None,
    }
}
