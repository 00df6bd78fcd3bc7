//! Etherscan-compatible REST client

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::types::{ExplorerEnvelope, RawTx};

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("explorer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("explorer returned HTTP {0}")]
    Status(u16),
    #[error("explorer error: {0}")]
    Api(String),
    #[error("malformed explorer response: {0}")]
    Decode(String),
}

/// Block-explorer operations the fetcher depends on
#[async_trait]
pub trait ExplorerApi: Send + Sync {
    /// False when no usable API key is configured
    fn has_credential(&self) -> bool;

    /// Normal transactions for an address, newest first
    async fn txlist(&self, address: &str) -> Result<Vec<RawTx>, ExplorerError>;

    /// Human-readable name for a contract or tagged address
    async fn name_tag(&self, address: &str) -> Result<Option<String>, ExplorerError>;

    /// Current balance in wei
    async fn balance(&self, address: &str) -> Result<String, ExplorerError>;
}

pub struct EtherscanClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl EtherscanClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ExplorerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get(&self, query: &[(&str, &str)]) -> Result<ExplorerEnvelope, ExplorerError> {
        let url = format!("{}/api", self.base_url);
        debug!(%url, ?query, "explorer request");

        let mut params: Vec<(&str, &str)> = query.to_vec();
        if let Some(key) = self.api_key.as_deref() {
            params.push(("apikey", key));
        }

        // The query carries the key; keep it out of error messages
        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|err| ExplorerError::Http(err.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExplorerError::Status(status.as_u16()));
        }
        let envelope: ExplorerEnvelope = response
            .json()
            .await
            .map_err(|err| ExplorerError::Decode(err.to_string()))?;
        debug!(status = %envelope.status, message = %envelope.message, "explorer response");
        Ok(envelope)
    }
}

#[async_trait]
impl ExplorerApi for EtherscanClient {
    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn txlist(&self, address: &str) -> Result<Vec<RawTx>, ExplorerError> {
        let envelope = self
            .get(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "desc"),
            ])
            .await?;
        parse_txlist(envelope)
    }

    async fn name_tag(&self, address: &str) -> Result<Option<String>, ExplorerError> {
        let source = self
            .get(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address),
            ])
            .await?;
        expect_answer(&source)?;
        if let Some(name) = contract_name(&source) {
            return Ok(Some(name));
        }

        // Tagged EOAs: the explorer mentions the tag in the message of an
        // otherwise empty internal-tx query
        let internal = self
            .get(&[
                ("module", "account"),
                ("action", "txlistinternal"),
                ("address", address),
                ("page", "1"),
                ("offset", "1"),
            ])
            .await?;
        expect_answer(&internal)?;
        Ok(known_as(&internal.message))
    }

    async fn balance(&self, address: &str) -> Result<String, ExplorerError> {
        let envelope = self
            .get(&[
                ("module", "account"),
                ("action", "balance"),
                ("address", address),
                ("tag", "latest"),
            ])
            .await?;
        if !envelope.is_ok() {
            return Err(ExplorerError::Api(envelope.error_text()));
        }
        envelope
            .result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ExplorerError::Decode("balance is not a string".into()))
    }
}

pub(crate) fn parse_txlist(envelope: ExplorerEnvelope) -> Result<Vec<RawTx>, ExplorerError> {
    if !envelope.is_ok() {
        // An address without history is reported as status 0
        if envelope.message.contains("No transactions found") {
            return Ok(Vec::new());
        }
        return Err(ExplorerError::Api(envelope.error_text()));
    }
    if !envelope.result.is_array() {
        return Err(ExplorerError::Decode("result is not an array".into()));
    }
    serde_json::from_value(envelope.result).map_err(|err| ExplorerError::Decode(err.to_string()))
}

/// Status 0 only counts as an answer when the explorer says there is nothing
/// to find; anything else (rate limits, bad key) is an error.
fn expect_answer(envelope: &ExplorerEnvelope) -> Result<(), ExplorerError> {
    if envelope.is_ok()
        || envelope.message.contains("No transactions found")
        || envelope.message.contains("known as [")
    {
        return Ok(());
    }
    Err(ExplorerError::Api(envelope.error_text()))
}

fn contract_name(envelope: &ExplorerEnvelope) -> Option<String> {
    if !envelope.is_ok() {
        return None;
    }
    envelope
        .result
        .get(0)?
        .get("ContractName")?
        .as_str()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn known_as(message: &str) -> Option<String> {
    let start = message.find("known as [")? + "known as [".len();
    let rest = &message[start..];
    let end = rest.find(']')?;
    let name = rest[..end].trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> ExplorerEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_txlist_ok() {
        let env = envelope(r#"{"status":"1","message":"OK","result":[{"hash":"0x1"},{"hash":"0x2"}]}"#);
        let txs = parse_txlist(env).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].hash, "0x2");
    }

    #[test]
    fn test_parse_txlist_empty_history() {
        let env = envelope(r#"{"status":"0","message":"No transactions found","result":[]}"#);
        assert!(parse_txlist(env).unwrap().is_empty());
    }

    #[test]
    fn test_parse_txlist_error_status() {
        let env = envelope(r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#);
        match parse_txlist(env) {
            Err(ExplorerError::Api(msg)) => assert!(msg.contains("Max rate limit")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_txlist_non_array() {
        let env = envelope(r#"{"status":"1","message":"OK","result":"oops"}"#);
        assert!(matches!(parse_txlist(env), Err(ExplorerError::Decode(_))));
    }

    #[test]
    fn test_contract_name() {
        let env = envelope(r#"{"status":"1","message":"OK","result":[{"ContractName":"UniswapV2Router02"}]}"#);
        assert_eq!(contract_name(&env).as_deref(), Some("UniswapV2Router02"));
        let env = envelope(r#"{"status":"1","message":"OK","result":[{"ContractName":""}]}"#);
        assert_eq!(contract_name(&env), None);
    }

    #[test]
    fn test_expect_answer() {
        let ok = envelope(r#"{"status":"1","message":"OK","result":[]}"#);
        assert!(expect_answer(&ok).is_ok());
        let empty = envelope(r#"{"status":"0","message":"No transactions found","result":[]}"#);
        assert!(expect_answer(&empty).is_ok());
        let tagged = envelope(
            r#"{"status":"0","message":"No transactions found, address known as [Binance 14]","result":[]}"#,
        );
        assert!(expect_answer(&tagged).is_ok());

        let throttled = envelope(r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#);
        match expect_answer(&throttled) {
            Err(ExplorerError::Api(msg)) => assert!(msg.contains("Max rate limit")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_known_as() {
        assert_eq!(
            known_as("No transactions found, address known as [Binance 14]").as_deref(),
            Some("Binance 14")
        );
        assert_eq!(known_as("No transactions found"), None);
        assert_eq!(known_as("known as []"), None);
    }
}
