//! Gateway error taxonomy.
//!
//! Four failure classes cross the API boundary: bad input, authentication
//! failures, upstream transport failures, and upstream non-success statuses.
//! Normalization and LLM-output parsing never error; those paths recover
//! with defaulted values instead.

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// Upstream transport failure: the FHIR server or the LLM endpoint
    /// could not be reached at all.
    #[error("upstream service unavailable: {0}")]
    Unavailable(String),

    /// Upstream replied with a non-success status; `status` is propagated
    /// to the caller.
    #[error("upstream error (HTTP {status}): {detail}")]
    Upstream { status: u16, detail: String },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_carries_status_and_detail() {
        let err = GatewayError::Upstream {
            status: 404,
            detail: "Patient not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "upstream error (HTTP 404): Patient not found"
        );
    }
}
