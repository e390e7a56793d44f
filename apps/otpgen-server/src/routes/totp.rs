use std::fmt;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use otpgen::{ErrorKind, OtpError, OtpHashAlgorithm, Totp, TotpEngine};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tracing::{info, warn};

use super::ApiError;
use crate::state::AppState;

const DEFAULT_DIGITS: i64 = 6;
const DEFAULT_INTERVAL: i64 = 30;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/totp", post(generate_totp))
}

// Numbers are kept loose so out-of-range values map to the matching error kind
#[derive(Deserialize)]
struct TotpPayload {
    secret: Option<String>,
    digits: Option<Number>,
    interval: Option<Number>,
    debug_counter: Option<Number>,
    algorithm: Option<String>,
}

impl fmt::Debug for TotpPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TotpPayload")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("digits", &self.digits)
            .field("interval", &self.interval)
            .field("debug_counter", &self.debug_counter)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct TotpResponse {
    code: String,
    counter: u64,
}

async fn generate_totp(
    State(state): State<AppState>,
    payload: Result<Json<TotpPayload>, JsonRejection>,
) -> Result<Json<TotpResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        let err = ApiError::from(rejection);
        warn!(outcome = err.kind, status = %err.status, "totp request rejected");
        err
    })?;

    let digits = field_text(payload.digits.as_ref(), DEFAULT_DIGITS);
    let interval = field_text(payload.interval.as_ref(), DEFAULT_INTERVAL);
    let overridden = payload.debug_counter.is_some();

    match generate(&state.engine, payload) {
        Ok(response) => {
            info!(
                %digits,
                %interval,
                counter = response.counter,
                overridden,
                outcome = "ok",
                "totp generated"
            );
            Ok(Json(response))
        }
        Err(err) => {
            warn!(%digits, %interval, overridden, outcome = err.kind, "totp request rejected");
            Err(err)
        }
    }
}

fn field_text(value: Option<&Number>, default: i64) -> String {
    value.map_or_else(|| default.to_string(), Number::to_string)
}

fn integer_field(
    value: Option<&Number>,
    default: i64,
    name: &str,
    kind: ErrorKind,
) -> Result<i64, ApiError> {
    match value {
        None => Ok(default),
        Some(number) => number.as_i64().ok_or_else(|| {
            ApiError::bad_request(
                kind.as_str(),
                format!("Invalid {name}, found {number}. Expected an integer"),
            )
        }),
    }
}

fn generate(engine: &TotpEngine, payload: TotpPayload) -> Result<TotpResponse, ApiError> {
    let secret = payload
        .secret
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(ApiError::missing_secret)?;

    let digits = integer_field(
        payload.digits.as_ref(),
        DEFAULT_DIGITS,
        "digits",
        ErrorKind::InvalidDigits,
    )?;
    let digits = u32::try_from(digits).map_err(|_| OtpError::InvalidDigits(digits))?;
    let interval = integer_field(
        payload.interval.as_ref(),
        DEFAULT_INTERVAL,
        "interval",
        ErrorKind::InvalidInterval,
    )?;
    let counter = payload
        .debug_counter
        .as_ref()
        .map(|n| {
            n.as_u64().ok_or_else(|| {
                ApiError::bad_request(
                    "invalid_counter",
                    format!("Invalid debug_counter, found {n}. Expected a non-negative integer"),
                )
            })
        })
        .transpose()?;

    let mut totp = Totp::new(secret);
    totp.with_digits(digits).with_period(interval);
    if let Some(algorithm) = payload.algorithm.as_deref() {
        totp.with_algorithm(algorithm.parse::<OtpHashAlgorithm>()?);
    }

    let result = engine.generate(&totp, counter)?;

    Ok(TotpResponse {
        code: result.code.to_string(),
        counter: result.counter,
    })
}
