//! Chain RPC client speaking the toncenter v3 JSON API.

use super::{ChainError, ChainRpc, SignedMessage, SubmitAck};
use crate::domain::Address;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TonCenterRpc {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TonCenterRpc {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }

    /// Idempotent read with exponential backoff on transient failures.
    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, ChainError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(20)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .authorize(self.client.get(&url).query(query))
                .send()
                .await
                .map_err(|e| backoff::Error::transient(ChainError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(ChainError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(ChainError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ChainError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(ChainError::Parse(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl ChainRpc for TonCenterRpc {
    async fn get_sequence_number(&self, account: &Address) -> Result<u64, ChainError> {
        let response = self
            .get(
                "/walletInformation",
                &[
                    ("address", account.to_string()),
                    ("use_v2", "false".to_string()),
                ],
            )
            .await?;
        parse_seqno(&response)
    }

    async fn submit(&self, message: &SignedMessage) -> Result<SubmitAck, ChainError> {
        let url = format!("{}/message", self.base_url);
        let boc = message.to_wire()?;
        debug!("Submitting message seqno={} to {}", message.body.seqno, url);

        // Single attempt: a lost response leaves the outcome unknown.
        let response = self
            .authorize(self.client.post(&url).json(&serde_json::json!({ "boc": boc })))
            .send()
            .await
            .map_err(|e| ChainError::Network(e.to_string()))?;

        let status = response.status();
        if status == 429 {
            warn!("Message submission rate limited");
            return Err(ChainError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChainError::Rejected(format!("{} {}", status.as_u16(), text)));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ChainError::Parse(e.to_string()))?;
        let message_hash = match body.get("message_hash").and_then(|v| v.as_str()) {
            Some(hash) => hash.to_string(),
            None => message.hash()?,
        };
        Ok(SubmitAck { message_hash })
    }

    async fn jetton_wallet_address(
        &self,
        minter: &Address,
        owner: &Address,
    ) -> Result<Address, ChainError> {
        let response = self
            .get(
                "/jetton/wallets",
                &[
                    ("owner_address", owner.to_string()),
                    ("jetton_address", minter.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        parse_jetton_wallet(&response)
    }
}

fn parse_seqno(json: &serde_json::Value) -> Result<u64, ChainError> {
    match json.get("seqno") {
        // Undeployed wallets report no seqno yet.
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(v) => v
            .as_u64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| ChainError::Parse(format!("Invalid seqno: {}", v))),
    }
}

fn parse_jetton_wallet(json: &serde_json::Value) -> Result<Address, ChainError> {
    json.get("jetton_wallets")
        .and_then(|v| v.as_array())
        .and_then(|wallets| wallets.first())
        .and_then(|w| w.get("address"))
        .and_then(|a| a.as_str())
        .map(|a| Address::new(a.to_string()))
        .ok_or_else(|| ChainError::Parse("No jetton wallet in response".to_string()))
}
