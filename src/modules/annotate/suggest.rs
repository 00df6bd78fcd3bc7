//! Batched completion requests for annotation suggestions

use std::collections::HashMap;
use std::ops::Range;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::heuristics;
use super::{Suggestion, TokenMatch};
use crate::config::CompletionConfig;
use crate::domain::tokens::reference_table;
use crate::domain::tokens::TokenType;
use crate::domain::{find_token_by_address, Transaction, TokenReference};
use crate::infrastructure::completion::{CompletionApi, CompletionError};

const SYSTEM_PROMPT: &str = "You are a specialized cryptocurrency transaction analyzer that \
provides detailed analysis of Ethereum transactions. You always include a label, description, \
and reasoning for each transaction.";

/// Call data beyond the selector and a couple of words adds nothing useful
const MAX_PROMPT_INPUT: usize = 138;

#[derive(Debug, Clone)]
pub struct SuggestOptions {
    pub batch_size: usize,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub batch_pause: Duration,
}

impl Default for SuggestOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            batch_pause: Duration::from_millis(500),
        }
    }
}

impl From<&CompletionConfig> for SuggestOptions {
    fn from(config: &CompletionConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
            batch_pause: config.batch_pause(),
        }
    }
}

/// A batch whose suggestions could not be obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBatch {
    pub batch: usize,
    pub range: Range<usize>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionRun {
    /// One suggestion per transaction, in list order
    pub suggestions: Vec<Suggestion>,
    pub failed_batches: Vec<FailedBatch>,
    pub batches: usize,
    /// True when the heuristics answered instead of the completion API
    pub offline: bool,
}

impl SuggestionRun {
    pub fn notice(&self) -> Option<String> {
        if self.offline {
            return Some("No completion API key; showing offline suggestions".into());
        }
        if self.failed_batches.is_empty() {
            return None;
        }
        let covered: usize = self.failed_batches.iter().map(|b| b.range.len()).sum();
        Some(format!(
            "{} of {} suggestion batches failed ({} transactions got generic suggestions)",
            self.failed_batches.len(),
            self.batches,
            covered
        ))
    }
}

/// What the model sees for one transaction
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptTx<'a> {
    hash: &'a str,
    date: &'a str,
    from: &'a str,
    to: &'a str,
    value: &'a str,
    status: &'a str,
    transaction_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    method_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method_id: Option<&'a str>,
    #[serde(skip_serializing_if = "str::is_empty")]
    from_name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    to_name: &'a str,
    gas_fees_eth: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    to_token: Option<TokenMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_token: Option<TokenMatch>,
    is_likely_contract_call: bool,
}

impl<'a> From<&'a Transaction> for PromptTx<'a> {
    fn from(tx: &'a Transaction) -> Self {
        let input = match tx.input.char_indices().nth(MAX_PROMPT_INPUT) {
            Some((cut, _)) => &tx.input[..cut],
            None => tx.input.as_str(),
        };
        let to_token = find_token_by_address(&tx.counterparty_to).map(TokenMatch::from);
        Self {
            hash: &tx.identifier,
            date: &tx.occurred_at,
            from: &tx.counterparty_from,
            to: &tx.counterparty_to,
            value: &tx.amount,
            status: tx.outcome.as_str(),
            transaction_type: tx.kind.as_str(),
            method_name: tx.invoked_method.as_deref(),
            method_id: tx.method_selector.as_deref(),
            from_name: &tx.counterparty_from_label,
            to_name: &tx.counterparty_to_label,
            gas_fees_eth: &tx.fee_paid,
            input,
            is_likely_contract_call: tx.kind.is_contract() || to_token.is_some() || tx.has_call_data(),
            to_token,
            from_token: find_token_by_address(&tx.counterparty_from).map(TokenMatch::from),
        }
    }
}

#[derive(Deserialize)]
struct RawSuggestion {
    index: i64,
    #[serde(default)]
    label: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    reason: String,
}

fn build_prompt(batch: &[Transaction]) -> Result<String, serde_json::Error> {
    let rows: Vec<PromptTx<'_>> = batch.iter().map(PromptTx::from).collect();
    let payload = serde_json::to_string_pretty(&rows)?;
    Ok(format!(
        "Analyze these Ethereum transactions and suggest appropriate labels and brief \
descriptions for categorization purposes. For each transaction, include a reason for your \
label suggestion.

Here is a list of common Ethereum token contracts for reference:
{tokens}

Transaction types:
- \"normal\": a regular ETH transfer with no contract interaction
- \"contractCall\": an interaction with an existing smart contract
- \"contractCreation\": a transaction that deploys a new contract

For contract interactions say so explicitly, use \"methodName\" to identify the function being \
called and \"fromName\"/\"toName\" for context about the parties. Consider gas fees \
(\"gasFeesEth\"), the status and the input data in your reasoning, and be explicit about the \
value of high-value transfers.

Transactions:
{payload}

For EVERY transaction respond with an object containing:
- index: the position of the transaction in this list (0 for the first)
- label: a suggested label such as \"Exchange Deposit\", \"NFT Purchase\" or \"Token Swap\"
- description: a brief description of the transaction
- reason: why you chose this label

Return ONLY a raw JSON array of these objects, with no markdown formatting or commentary.",
        tokens = reference_table(),
    ))
}

/// Remove a surrounding markdown code fence if the model added one
pub fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Parse a batch reply into batch-local index -> suggestion. Indexes outside
/// the batch are dropped; the first answer for an index wins.
fn parse_batch(content: &str, batch_len: usize) -> Result<HashMap<usize, RawSuggestion>, String> {
    let parsed: Vec<RawSuggestion> =
        serde_json::from_str(strip_fences(content)).map_err(|err| format!("invalid JSON: {err}"))?;

    let mut by_index = HashMap::new();
    for raw in parsed {
        match usize::try_from(raw.index) {
            Ok(local) if local < batch_len => {
                by_index.entry(local).or_insert(raw);
            }
            _ => warn!(index = raw.index, batch_len, "discarding suggestion outside batch"),
        }
    }
    Ok(by_index)
}

async fn complete_with_retry<C>(
    api: &C,
    prompt: &str,
    options: &SuggestOptions,
) -> Result<String, CompletionError>
where
    C: CompletionApi + ?Sized,
{
    let mut attempt: u32 = 0;
    loop {
        match api.complete(SYSTEM_PROMPT, prompt).await {
            Ok(content) => return Ok(content),
            Err(err) if err.is_retryable() && attempt < options.max_retries => {
                attempt += 1;
                let delay = options
                    .initial_backoff
                    .saturating_mul(2u32.saturating_pow(attempt - 1));
                warn!(attempt, max = options.max_retries, ?delay, "rate limited, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Generic suggestion for a transaction the model did not cover
pub fn placeholder(tx: &Transaction, index: usize) -> Suggestion {
    let token_match = token_match_for(tx);
    let (label, description, reason) = match token_side(tx) {
        Some((token, side)) => {
            let flavor = if token.kind == TokenType::Stablecoin {
                "Stablecoin"
            } else {
                "Token"
            };
            (
                format!("{} {flavor} Interaction", token.symbol),
                format!("Interaction with {} ({})", token.name, token.symbol),
                format!("The address {side} matches the {} contract", token.name),
            )
        }
        None => (
            "ETH Transfer".to_string(),
            format!("Transfer of {} ETH", tx.amount),
            "Basic ETH transfer with no additional context".to_string(),
        ),
    };
    Suggestion {
        index,
        label,
        description,
        reason,
        token_match,
    }
}

fn token_side(tx: &Transaction) -> Option<(&'static TokenReference, &'static str)> {
    find_token_by_address(&tx.counterparty_to)
        .map(|token| (token, "to"))
        .or_else(|| find_token_by_address(&tx.counterparty_from).map(|token| (token, "from")))
}

fn token_match_for(tx: &Transaction) -> Option<TokenMatch> {
    token_side(tx).map(|(token, _)| TokenMatch::from(token))
}

/// Ask for one suggestion per transaction.
///
/// Never fails as a whole: without a credential the offline heuristics
/// answer, and a batch that cannot be completed is recorded in
/// [`SuggestionRun::failed_batches`] while its transactions get generic
/// placeholders.
pub async fn request_suggestions<C>(
    api: &C,
    transactions: &[Transaction],
    options: &SuggestOptions,
) -> SuggestionRun
where
    C: CompletionApi + ?Sized,
{
    if transactions.is_empty() {
        return SuggestionRun::default();
    }
    if !api.has_credential() {
        warn!("no completion API key configured; using offline suggestions");
        let mut suggestions = heuristics::suggest_all(transactions);
        for (tx, suggestion) in transactions.iter().zip(suggestions.iter_mut()) {
            suggestion.token_match = token_match_for(tx);
        }
        return SuggestionRun {
            suggestions,
            failed_batches: Vec::new(),
            batches: 0,
            offline: true,
        };
    }

    let batch_size = options.batch_size.max(1);
    let batch_total = transactions.len().div_ceil(batch_size);
    info!(
        count = transactions.len(),
        batches = batch_total,
        batch_size,
        "requesting suggestions"
    );

    let mut answered: HashMap<usize, RawSuggestion> = HashMap::new();
    let mut failed_batches = Vec::new();

    for (batch_index, batch) in transactions.chunks(batch_size).enumerate() {
        if batch_index > 0 && !options.batch_pause.is_zero() {
            tokio::time::sleep(options.batch_pause).await;
        }
        let offset = batch_index * batch_size;
        let range = offset..offset + batch.len();

        let result = match build_prompt(batch) {
            Ok(prompt) => complete_with_retry(api, &prompt, options)
                .await
                .map_err(|err| err.to_string())
                .and_then(|content| parse_batch(&content, batch.len())),
            Err(err) => Err(format!("could not serialize batch: {err}")),
        };

        match result {
            Ok(local) => {
                info!(batch = batch_index + 1, of = batch_total, answered = local.len(), "batch done");
                for (local_index, raw) in local {
                    answered.insert(offset + local_index, raw);
                }
            }
            Err(reason) => {
                error!(batch = batch_index + 1, of = batch_total, "suggestion batch failed: {reason}");
                failed_batches.push(FailedBatch {
                    batch: batch_index,
                    range,
                    reason,
                });
            }
        }
    }

    let suggestions = transactions
        .iter()
        .enumerate()
        .map(|(index, tx)| match answered.remove(&index) {
            Some(raw) => Suggestion {
                index,
                label: raw.label,
                description: raw.description,
                reason: raw.reason,
                token_match: token_match_for(tx),
            },
            None => placeholder(tx, index),
        })
        .collect();

    SuggestionRun {
        suggestions,
        failed_batches,
        batches: batch_total,
        offline: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Outcome;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    /// Replays canned replies in order and records every prompt
    struct ScriptedCompletion {
        credential: bool,
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                credential: true,
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionApi for ScriptedCompletion {
        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn complete(&self, _system: &str, user: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(user.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("[]".into()))
        }
    }

    fn fast() -> SuggestOptions {
        SuggestOptions {
            batch_size: 10,
            max_retries: 3,
            initial_backoff: Duration::ZERO,
            batch_pause: Duration::ZERO,
        }
    }

    fn txs(n: usize) -> Vec<Transaction> {
        (0..n)
            .map(|i| Transaction {
                identifier: format!("0x{i:02x}"),
                counterparty_from: "0xaa".into(),
                counterparty_to: "0xbb".into(),
                amount: "1.0".into(),
                ..Default::default()
            })
            .collect()
    }

    fn reply(items: &[(i64, &str)]) -> Result<String, CompletionError> {
        let arr: Vec<_> = items
            .iter()
            .map(|(i, label)| {
                serde_json::json!({"index": i, "label": label, "description": "d", "reason": "r"})
            })
            .collect();
        Ok(serde_json::to_string(&arr).unwrap())
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_fences("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_fences("  [1] "), "[1]");
    }

    #[test]
    fn test_parse_batch_drops_out_of_range_and_duplicates() {
        let content = r#"[{"index":0,"label":"a"},{"index":0,"label":"b"},{"index":5,"label":"c"},{"index":-1,"label":"d"}]"#;
        let parsed = parse_batch(content, 3).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[&0].label, "a");
        assert!(parse_batch("not json", 3).is_err());
    }

    #[tokio::test]
    async fn test_batch_indexes_are_offset() {
        let api = ScriptedCompletion::new(vec![
            reply(&[(0, "first")]),
            reply(&[(3, "thirteen")]),
            reply(&[(4, "twenty-four")]),
        ]);
        let list = txs(25);
        let run = request_suggestions(&api, &list, &fast()).await;

        assert_eq!(api.calls(), 3);
        assert_eq!(run.suggestions.len(), 25);
        assert_eq!(run.suggestions[0].label, "first");
        assert_eq!(run.suggestions[13].label, "thirteen");
        assert_eq!(run.suggestions[24].label, "twenty-four");
        assert_eq!(run.suggestions[3].label, "ETH Transfer");
        assert!(run.failed_batches.is_empty());
        assert!(run.suggestions.iter().enumerate().all(|(i, s)| s.index == i));
    }

    #[tokio::test]
    async fn test_index_beyond_short_batch_is_discarded() {
        let api = ScriptedCompletion::new(vec![reply(&[(0, "a")]), reply(&[(7, "ghost")])]);
        let run = request_suggestions(&api, &txs(12), &fast()).await;
        // Second batch holds two transactions; local 7 would alias index 17
        assert_eq!(run.suggestions.len(), 12);
        assert!(run.suggestions.iter().all(|s| s.label != "ghost"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let api = ScriptedCompletion::new(vec![
            Err(CompletionError::RateLimited),
            Err(CompletionError::RateLimited),
            reply(&[(0, "after retry")]),
        ]);
        let run = request_suggestions(&api, &txs(1), &fast()).await;
        assert_eq!(api.calls(), 3);
        assert_eq!(run.suggestions[0].label, "after retry");
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let api = ScriptedCompletion::new(vec![
            Err(CompletionError::RateLimited),
            Err(CompletionError::RateLimited),
            Err(CompletionError::RateLimited),
            Err(CompletionError::RateLimited),
            reply(&[(0, "too late")]),
        ]);
        let run = request_suggestions(&api, &txs(1), &fast()).await;
        // One attempt plus three retries
        assert_eq!(api.calls(), 4);
        assert_eq!(run.failed_batches.len(), 1);
        assert_eq!(run.suggestions[0].label, "ETH Transfer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_between_retries() {
        let api = ScriptedCompletion::new(vec![
            Err(CompletionError::RateLimited),
            Err(CompletionError::RateLimited),
            Err(CompletionError::RateLimited),
            reply(&[(0, "finally")]),
        ]);
        let options = SuggestOptions {
            initial_backoff: Duration::from_secs(1),
            ..fast()
        };

        let start = tokio::time::Instant::now();
        let run = request_suggestions(&api, &txs(1), &options).await;
        let elapsed = start.elapsed();

        // 1s + 2s + 4s
        assert!(elapsed >= Duration::from_secs(7), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(7100), "{elapsed:?}");
        assert_eq!(api.calls(), 4);
        assert!(run.failed_batches.is_empty());
        assert_eq!(run.suggestions[0].label, "finally");
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_are_paced() {
        let api = ScriptedCompletion::new(Vec::new());
        let options = SuggestOptions {
            batch_pause: Duration::from_millis(500),
            ..fast()
        };

        let start = tokio::time::Instant::now();
        let run = request_suggestions(&api, &txs(25), &options).await;
        let elapsed = start.elapsed();

        // Three batches, a pause before the second and third
        assert_eq!(run.batches, 3);
        assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1100), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_batch() {
        let api = ScriptedCompletion::new(vec![
            Err(CompletionError::Status {
                status: 500,
                body: "boom".into(),
            }),
            reply(&[(0, "second ok")]),
            Ok("```json\n[{\"index\":1,\"label\":\"fenced\"}]\n```".into()),
        ]);
        let run = request_suggestions(&api, &txs(25), &fast()).await;
        // Non-429 errors are not retried
        assert_eq!(api.calls(), 3);
        assert_eq!(run.failed_batches.len(), 1);
        assert_eq!(run.failed_batches[0].range, 0..10);
        assert_eq!(run.suggestions[10].label, "second ok");
        assert_eq!(run.suggestions[21].label, "fenced");
        assert_eq!(run.batches, 3);
        assert!(run.notice().unwrap().starts_with("1 of 3"));
    }

    #[tokio::test]
    async fn test_offline_mode_is_deterministic() {
        let mut api = ScriptedCompletion::new(Vec::new());
        api.credential = false;
        let list = txs(5);
        let first = request_suggestions(&api, &list, &fast()).await;
        let second = request_suggestions(&api, &list, &fast()).await;
        assert!(first.offline);
        assert_eq!(api.calls(), 0);
        assert_eq!(first.suggestions, second.suggestions);
    }

    #[tokio::test]
    async fn test_token_match_and_placeholder() {
        let mut list = txs(2);
        list[1].counterparty_to = USDC.to_uppercase().replace("0X", "0x");
        let api = ScriptedCompletion::new(vec![reply(&[(0, "model")])]);
        let run = request_suggestions(&api, &list, &fast()).await;
        let usdc = &run.suggestions[1];
        assert_eq!(usdc.label, "USDC Stablecoin Interaction");
        assert_eq!(usdc.reason, "The address to matches the USD Coin contract");
        assert_eq!(usdc.token_match.as_ref().map(|t| t.symbol.as_str()), Some("USDC"));
        assert!(run.suggestions[0].token_match.is_none());
    }

    #[test]
    fn test_prompt_carries_batch_and_tokens() {
        let mut list = txs(1);
        list[0].input = format!("0x{}", "ab".repeat(200));
        let prompt = build_prompt(&list).unwrap();
        assert!(prompt.contains("\"hash\": \"0x00\""));
        assert!(prompt.contains("Tether (USDT)"));
        assert!(!prompt.contains(&"ab".repeat(100)));
    }

    #[test]
    fn test_options_from_config() {
        let config = CompletionConfig {
            batch_size: 0,
            ..Default::default()
        };
        let options = SuggestOptions::from(&config);
        assert_eq!(options.batch_size, 1);
        assert_eq!(options.initial_backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_outcome_label_in_prompt() {
        let mut list = txs(1);
        list[0].outcome = Outcome::Failed;
        assert!(build_prompt(&list).unwrap().contains("\"status\": \"Failed\""));
    }
}
