use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use super::checksum::Checksum;
use crate::config::BrokerConfig;
use crate::data::{DataError, DataResult};

/// Purpose tag the token endpoint expects for key/secret approval
pub const KEY_TYPE_APPROVAL: &str = "approval";

/// Access token issued by the Groww token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    /// Issuer-defined expiry, kept verbatim; epoch numbers are stored as text
    #[serde(deserialize_with = "expiry_as_text")]
    pub expiry: String,
    pub active: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiryValue {
    Text(String),
    Number(serde_json::Number),
}

fn expiry_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ExpiryValue::deserialize(deserializer)? {
        ExpiryValue::Text(text) => text,
        ExpiryValue::Number(number) => number.to_string(),
    })
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    key_type: &'a str,
    checksum: &'a str,
    timestamp: String,
}

pub struct TokenExchangeClient {
    client: reqwest::Client,
    token_url: String,
    api_key: String,
    api_secret: String,
    timeout_seconds: u64,
}

impl TokenExchangeClient {
    pub fn new(config: &BrokerConfig) -> DataResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .user_agent("breakout-levels/0.1.0")
            .build()?;

        Ok(Self {
            client,
            token_url: config.token_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Exchange the key/secret pair for an access token, stamped now
    pub async fn request_token(&self) -> DataResult<AccessToken> {
        self.request_token_at(Utc::now().timestamp()).await
    }

    /// Exchange using an explicit epoch-seconds timestamp. One POST, no retries.
    pub async fn request_token_at(&self, timestamp: i64) -> DataResult<AccessToken> {
        let checksum = Checksum::at(&self.api_secret, timestamp);
        let payload = TokenRequest {
            key_type: KEY_TYPE_APPROVAL,
            checksum: &checksum.digest,
            timestamp: checksum.timestamp.to_string(),
        };

        tracing::info!(timestamp, "Requesting access token");
        tracing::debug!(url = %self.token_url, checksum = %checksum.digest, "Token request");

        let response = self
            .client
            .post(&self.token_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DataError::from_transport(e, self.timeout_seconds))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DataError::from_transport(e, self.timeout_seconds))?;

        if status != reqwest::StatusCode::OK {
            return Err(DataError::api_error(status.as_u16(), body));
        }

        let token = parse_token_response(&body)?;
        if !token.active {
            tracing::warn!(expiry = %token.expiry, "Token endpoint issued an inactive token");
        }
        Ok(token)
    }
}

/// Parse a success body. Missing `token`, `expiry` or `active` is a parse error.
pub fn parse_token_response(body: &str) -> DataResult<AccessToken> {
    serde_json::from_str(body)
        .map_err(|e| DataError::parse_error(format!("token response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_response() {
        let token =
            parse_token_response(r#"{"token":"T","expiry":"E","active":true,"extra":1}"#).unwrap();
        assert_eq!(
            token,
            AccessToken {
                token: "T".to_string(),
                expiry: "E".to_string(),
                active: true,
            }
        );
    }

    #[test]
    fn test_parse_token_response_missing_field() {
        let err = parse_token_response(r#"{"token":"T","active":true}"#).unwrap_err();
        match err {
            DataError::Parse { message } => assert!(message.contains("expiry")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_token_response_numeric_expiry() {
        let token =
            parse_token_response(r#"{"token":"T","expiry":1760680800000,"active":true}"#).unwrap();
        assert_eq!(token.expiry, "1760680800000");
    }

    #[test]
    fn test_parse_token_response_rejects_non_scalar_expiry() {
        let err = parse_token_response(r#"{"token":"T","expiry":{"at":1},"active":true}"#)
            .unwrap_err();
        assert!(matches!(err, DataError::Parse { .. }));
    }

    #[test]
    fn test_request_payload_shape() {
        let payload = TokenRequest {
            key_type: KEY_TYPE_APPROVAL,
            checksum: "abc",
            timestamp: 1_700_000_000.to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"key_type": "approval", "checksum": "abc", "timestamp": "1700000000"})
        );
    }
}
