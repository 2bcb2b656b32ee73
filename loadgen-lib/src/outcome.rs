use std::{
    fmt,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

/// The only HTTP status code counted as a successful order creation.
pub const STATUS_CREATED: u16 = 201;

/// Status code recorded when no HTTP response was received at all.
pub const STATUS_TRANSPORT_FAILURE: u16 = 0;

/// Maximum amount of characters kept from an error message or error body.
pub const MAX_ERROR_CHARS: usize = 200;

/// The recorded result of a single dispatched order request.
///
/// Exactly one outcome exists per dispatched request,
/// failures included: a transport failure is encoded with
/// [`STATUS_TRANSPORT_FAILURE`] and the (truncated) error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    #[serde(with = "rfc3339")]
    pub timestamp: SystemTime,
    pub status_code: u16,
    pub response_time_ms: f64,
    pub success: bool,
    pub customer_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestOutcome {
    /// Outcome for a request which received an HTTP response.
    ///
    /// `success` is derived from the status code.
    pub fn responded(
        customer_id: u32,
        status_code: u16,
        latency: Duration,
        order_number: Option<String>,
        error: Option<&str>,
    ) -> Self {
        Self {
            timestamp: SystemTime::now(),
            status_code,
            response_time_ms: duration_as_millis_f64(latency),
            success: status_code == STATUS_CREATED,
            customer_id,
            order_number,
            error: error.map(truncate_error),
        }
    }

    /// Outcome for a request which failed before any response was received.
    pub fn transport_failure(customer_id: u32, latency: Duration, err: impl fmt::Display) -> Self {
        Self {
            timestamp: SystemTime::now(),
            status_code: STATUS_TRANSPORT_FAILURE,
            response_time_ms: duration_as_millis_f64(latency),
            success: false,
            customer_id,
            order_number: None,
            error: Some(truncate_error(&err.to_string())),
        }
    }
}

/// Keep at most [`MAX_ERROR_CHARS`] characters of an error string.
pub fn truncate_error(s: &str) -> String {
    match s.char_indices().nth(MAX_ERROR_CHARS) {
        Some((idx, _)) => s[..idx].to_owned(),
        None => s.to_owned(),
    }
}

#[inline(always)]
fn duration_as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.
}

mod rfc3339 {
    use std::time::SystemTime;

    use serde::{Deserialize as _, Deserializer, Serializer, de::Error as _};

    pub(super) fn serialize<S: Serializer>(ts: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_rfc3339_micros(*ts))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let s = String::deserialize(d)?;
        humantime::parse_rfc3339(&s).map_err(D::Error::custom)
    }
}
