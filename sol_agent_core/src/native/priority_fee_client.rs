// Helius getPriorityFeeEstimate client

use crate::error::CoreError;
use crate::models::FeeTier;
use crate::priority_fee::{FeeResult, PriorityFeeService};
use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};
use std::time::Duration;

pub struct HeliusPriorityFeeClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HeliusPriorityFeeClient {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> FeeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Estimation(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn url(&self) -> String {
        let separator = if self.endpoint.contains('?') { "&" } else { "?" };
        format!("{}{}api-key={}", self.endpoint, separator, self.api_key)
    }
}

fn request_body(transaction_base58: &str, tier: FeeTier) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": "1",
        "method": "getPriorityFeeEstimate",
        "params": [{
            "transaction": transaction_base58,
            "options": { "priorityLevel": tier.priority_level() }
        }]
    })
}

/// Pull `result.priorityFeeEstimate` out of a response, rounded up.
fn parse_estimate(response: &Value) -> FeeResult<u64> {
    if let Some(err) = response.get("error") {
        return Err(CoreError::Estimation(format!("Priority fee service error: {}", err)));
    }
    let estimate = response
        .get("result")
        .and_then(|r| r.get("priorityFeeEstimate"))
        .and_then(Value::as_f64)
        .ok_or_else(|| CoreError::Estimation("Priority fee response has no numeric estimate".to_string()))?;

    if !estimate.is_finite() || estimate < 0.0 {
        return Err(CoreError::Estimation(format!("Priority fee estimate out of range: {}", estimate)));
    }
    Ok(estimate.ceil().min(u64::MAX as f64) as u64)
}

#[async_trait]
impl PriorityFeeService for HeliusPriorityFeeClient {
    async fn estimate(&self, transaction_base58: &str, tier: FeeTier) -> FeeResult<u64> {
        debug!("Requesting {} priority fee estimate from {}", tier, self.endpoint);

        let response = self
            .client
            .post(self.url())
            .json(&request_body(transaction_base58, tier))
            .send()
            .await
            .map_err(|e| CoreError::Estimation(format!("Priority fee request failed: {}", e)))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| CoreError::Estimation(format!("Invalid priority fee response: {}", e)))?;

        let fee = parse_estimate(&body)?;
        debug!("Priority fee estimate ({}): {} micro-lamports", tier, fee);
        Ok(fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn estimate_is_rounded_up() {
        let v = json!({"jsonrpc": "2.0", "id": "1", "result": {"priorityFeeEstimate": 1200.2}});
        assert_eq!(parse_estimate(&v).unwrap(), 1201);
        let whole = json!({"result": {"priorityFeeEstimate": 50000}});
        assert_eq!(parse_estimate(&whole).unwrap(), 50_000);
    }

    #[test]
    fn malformed_responses_are_estimation_errors() {
        for v in [
            json!({"error": {"code": -32602, "message": "bad tx"}}),
            json!({"result": {}}),
            json!({"result": {"priorityFeeEstimate": "high"}}),
            json!({"result": {"priorityFeeEstimate": -1.0}}),
        ] {
            assert!(matches!(parse_estimate(&v), Err(CoreError::Estimation(_))), "{v}");
        }
    }

    #[tokio::test]
    async fn posts_estimate_request_with_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_query(Matcher::UrlEncoded("api-key".into(), "secret".into()))
            .match_body(Matcher::PartialJson(json!({
                "method": "getPriorityFeeEstimate",
                "params": [{"transaction": "3xYz", "options": {"priorityLevel": "High"}}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":"1","result":{"priorityFeeEstimate":987.5}}"#)
            .create_async()
            .await;

        let client = HeliusPriorityFeeClient::new(&server.url(), "secret", Duration::from_secs(5)).unwrap();
        let fee = client.estimate("3xYz", FeeTier::Max).await.unwrap();

        assert_eq!(fee, 988);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn service_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32600,"message":"invalid"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = HeliusPriorityFeeClient::new(&server.url(), "k", Duration::from_secs(5)).unwrap();
        let err = client.estimate("abc", FeeTier::Mid).await.unwrap_err();

        assert!(matches!(err, CoreError::Estimation(ref m) if m.contains("invalid")));
        mock.assert_async().await;
    }
}
