//! Async worker - runs in Tokio runtime and handles explorer/completion calls

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::infrastructure::completion::OpenAiClient;
use crate::infrastructure::explorer::{
    parse_u256, wei_to_eth, EtherscanClient, ExplorerApi, TransactionFetcher,
};
use crate::infrastructure::runtime::bridge::{RuntimeCommand, RuntimeEvent, WorkerSettings};
use crate::modules::annotate::request_suggestions;

const IDLE_POLL: Duration = Duration::from_millis(50);

/// Run the async worker loop until `Shutdown` or the TUI hangs up
pub async fn run_async_worker(
    settings: WorkerSettings,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<()> {
    let explorer = EtherscanClient::new(&settings.explorer_url, settings.explorer_key.clone())
        .context("build explorer client")?;
    let completion = Arc::new(
        OpenAiClient::new(
            &settings.completion_url,
            settings.completion_key.clone(),
            &settings.model,
        )
        .context("build completion client")?,
    );
    // Owns the name cache for the whole session
    let mut fetcher = TransactionFetcher::new(explorer);

    info!("worker started");
    loop {
        let cmd = match cmd_rx.try_recv() {
            Ok(cmd) => cmd,
            Err(TryRecvError::Empty) => {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }
            Err(TryRecvError::Disconnected) => return Ok(()),
        };

        match cmd {
            RuntimeCommand::Shutdown => {
                info!("worker shutting down");
                return Ok(());
            }

            RuntimeCommand::Refresh {
                address,
                generation,
            } => {
                debug!(generation, %address, "refresh requested");
                let outcome = fetcher.fetch(&address).await;
                let _ = evt_tx.send(RuntimeEvent::Fetched {
                    address,
                    generation,
                    outcome,
                });
            }

            RuntimeCommand::Analyze {
                transactions,
                generation,
            } => {
                debug!(generation, count = transactions.len(), "analysis requested");
                // Batches can take a while; keep serving refreshes meanwhile
                let completion = Arc::clone(&completion);
                let options = settings.suggest.clone();
                let evt_tx = evt_tx.clone();
                tokio::spawn(async move {
                    let run = request_suggestions(completion.as_ref(), &transactions, &options).await;
                    let _ = evt_tx.send(RuntimeEvent::SuggestionsReady { generation, run });
                });
            }

            RuntimeCommand::CheckExplorer { address } => {
                let (reachable, detail) = check_explorer(fetcher.api(), &address).await;
                let _ = evt_tx.send(RuntimeEvent::ExplorerStatus { reachable, detail });
            }
        }
    }
}

/// Check the explorer with a balance query for `address`.
pub async fn check_explorer<E: ExplorerApi + ?Sized>(api: &E, address: &str) -> (bool, String) {
    if !api.has_credential() {
        return (false, "No explorer API key configured".to_string());
    }
    match api.balance(address).await {
        Ok(wei) => (true, format!("Connected; balance {} ETH", wei_to_eth(parse_u256(&wei)))),
        Err(err) => (false, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::explorer::{ExplorerError, RawTx};
    use async_trait::async_trait;

    struct BalanceOnly {
        credential: bool,
        balance: Result<String, u16>,
    }

    #[async_trait]
    impl ExplorerApi for BalanceOnly {
        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn txlist(&self, _address: &str) -> Result<Vec<RawTx>, ExplorerError> {
            Ok(Vec::new())
        }

        async fn name_tag(&self, _address: &str) -> Result<Option<String>, ExplorerError> {
            Ok(None)
        }

        async fn balance(&self, _address: &str) -> Result<String, ExplorerError> {
            self.balance.clone().map_err(ExplorerError::Status)
        }
    }

    #[tokio::test]
    async fn test_check_explorer() {
        let ok = BalanceOnly {
            credential: true,
            balance: Ok("1500000000000000000".into()),
        };
        assert_eq!(
            check_explorer(&ok, "0xaa").await,
            (true, "Connected; balance 1.5 ETH".to_string())
        );

        let down = BalanceOnly {
            credential: true,
            balance: Err(503),
        };
        let (reachable, detail) = check_explorer(&down, "0xaa").await;
        assert!(!reachable);
        assert!(detail.contains("503"));

        let keyless = BalanceOnly {
            credential: false,
            balance: Ok("0".into()),
        };
        assert!(!check_explorer(&keyless, "0xaa").await.0);
    }
}
