use serde_json::Value;

use crate::error::{KeepAliveError, Result};

/// The `{code, data}` wrapper every endpoint of the service returns
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub code: i64,
    pub data: Value,
}

impl Envelope {
    pub const SUCCESS: i64 = 0;
    pub const LOGOUT: i64 = 403;

    /// Validate a decoded response body
    ///
    /// Rejects empty bodies, bodies without a whole-number `code` and any
    /// negative code. `0.0` counts as `0`. Non-negative codes other than 0 are left for the
    /// caller to interpret.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(KeepAliveError::InvalidResponse(
                "response is not a JSON object".into(),
            ));
        };

        if map.is_empty() {
            return Err(KeepAliveError::InvalidResponse("empty envelope".into()));
        }

        let code = match map.get("code") {
            Some(code) => whole_number(code).ok_or_else(|| {
                KeepAliveError::InvalidResponse(format!("non-integer code: {}", code))
            })?,
            None => {
                return Err(KeepAliveError::InvalidResponse(
                    "envelope has no code".into(),
                ))
            }
        };

        if code < 0 {
            return Err(KeepAliveError::InvalidResponse(format!(
                "negative code {}",
                code
            )));
        }

        let data = map.remove("data").unwrap_or(Value::Null);
        Ok(Self { code, data })
    }

    pub fn is_success(&self) -> bool {
        self.code == Self::SUCCESS
    }

    pub fn is_logout(&self) -> bool {
        self.code == Self::LOGOUT
    }
}

fn whole_number(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
