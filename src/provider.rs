//! Wallet provider capability.
//!
//! The injected-wallet surface of the original environment maps onto a small
//! trait: account enumeration and authorization, read calls, transaction
//! submission (account-signed and raw), confirmation waiting, and an
//! account-changed watch channel.  [`RpcWalletProvider`] implements it over
//! JSON-RPC against a node exposing wallet accounts; tests implement it
//! in-memory.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use serde::Deserialize;
use tokio::sync::watch;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type TxHash = B256;

/// EIP-1193 "user rejected request" error code.
const USER_REJECTED_CODE: i64 = 4001;
/// JSON-RPC "method not found" error code.
const METHOD_NOT_FOUND_CODE: i64 = -32601;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("no wallet provider is reachable: {0}")]
    Unavailable(String),
    #[error("wallet connection rejected by user")]
    UserRejected,
    /// Provider or node rejected the request; the message is passed through
    /// verbatim so revert reasons reach the user unchanged.
    #[error("{message}")]
    Provider { code: i64, message: String },
    #[error("RPC transport failed: {0}")]
    Transport(reqwest::Error),
    #[error("unexpected RPC response: {0}")]
    Response(String),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("timed out waiting for confirmation of {0}")]
    ConfirmationTimeout(TxHash),
}

/// The wallet capability every workflow runs against.
pub trait WalletProvider: Send + Sync + 'static {
    /// Already-authorized accounts, without prompting.
    fn accounts(&self) -> BoxFuture<'_, Result<Vec<Address>, WalletError>>;

    /// Prompt for authorization and return the granted accounts.
    fn request_accounts(&self) -> BoxFuture<'_, Result<Vec<Address>, WalletError>>;

    /// Read-only contract call.
    fn call(&self, to: Address, data: Vec<u8>) -> BoxFuture<'_, Result<Vec<u8>, WalletError>>;

    /// Submit a transaction signed by one of the wallet's accounts.
    fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> BoxFuture<'_, Result<TxHash, WalletError>>;

    /// Submit an externally signed raw transaction.
    fn send_raw_transaction(&self, raw: Vec<u8>) -> BoxFuture<'_, Result<TxHash, WalletError>>;

    /// Wait until the transaction is mined; errors if it reverted.
    fn await_confirmation(&self, tx: TxHash) -> BoxFuture<'_, Result<(), WalletError>>;

    fn chain_id(&self) -> BoxFuture<'_, Result<u64, WalletError>>;

    /// Pending-inclusive nonce for an address.
    fn transaction_count(&self, account: Address) -> BoxFuture<'_, Result<u64, WalletError>>;

    fn gas_price(&self) -> BoxFuture<'_, Result<U256, WalletError>>;

    /// Watch channel carrying the current account list; updated when the
    /// wallet's authorized accounts change.  Dropping the receiver is the
    /// deregistration.
    fn watch_accounts(&self) -> watch::Receiver<Vec<Address>>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`RpcWalletProvider`].
#[derive(Debug, Clone)]
pub struct RpcProviderConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,
    /// HTTP request timeout.
    pub http_timeout: Duration,
    /// How often to poll for account changes.
    pub account_poll_interval: Duration,
    /// How often to poll for a transaction receipt.
    pub confirmation_poll_interval: Duration,
    /// How many receipt polls before giving up.
    pub confirmation_attempts: u32,
}

impl RpcProviderConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_timeout: Duration::from_secs(10),
            account_poll_interval: Duration::from_secs(5),
            confirmation_poll_interval: Duration::from_secs(2),
            confirmation_attempts: 60,
        }
    }
}

// =============================================================================
// JSON-RPC plumbing
// =============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

struct RpcInner {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    confirmation_poll_interval: Duration,
    confirmation_attempts: u32,
}

impl RpcInner {
    async fn rpc(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(method, "rpc request");
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    WalletError::Unavailable(e.to_string())
                } else {
                    WalletError::Transport(e)
                }
            })?;
        let response: RpcResponse = response.json().await.map_err(WalletError::Transport)?;
        if let Some(err) = response.error {
            if err.code == USER_REJECTED_CODE {
                return Err(WalletError::UserRejected);
            }
            return Err(WalletError::Provider {
                code: err.code,
                message: err.message,
            });
        }
        // a null result is a valid answer (e.g. no receipt yet)
        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        let result = self.rpc("eth_accounts", serde_json::json!([])).await?;
        parse_address_list(&result)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        match self.rpc("eth_requestAccounts", serde_json::json!([])).await {
            Ok(result) => parse_address_list(&result),
            // Plain nodes don't know the wallet-extension method; their
            // unlocked accounts are already authorized.
            Err(WalletError::Provider { code, .. }) if code == METHOD_NOT_FOUND_CODE => {
                self.accounts().await
            }
            Err(e) => Err(e),
        }
    }

    async fn await_confirmation(&self, tx: TxHash) -> Result<(), WalletError> {
        for _ in 0..self.confirmation_attempts {
            let receipt = self
                .rpc(
                    "eth_getTransactionReceipt",
                    serde_json::json!([format!("{tx}")]),
                )
                .await?;
            if receipt.is_null() {
                tokio::time::sleep(self.confirmation_poll_interval).await;
                continue;
            }
            let status = receipt.get("status").and_then(|s| s.as_str());
            if status == Some("0x0") {
                return Err(WalletError::Reverted(tx));
            }
            return Ok(());
        }
        Err(WalletError::ConfirmationTimeout(tx))
    }
}

fn parse_address_list(value: &serde_json::Value) -> Result<Vec<Address>, WalletError> {
    let items = value
        .as_array()
        .ok_or_else(|| WalletError::Response("expected an account array".into()))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| WalletError::Response("account is not a string".into()))?
                .parse::<Address>()
                .map_err(|e| WalletError::Response(format!("bad account address: {e}")))
        })
        .collect()
}

fn parse_quantity_u64(value: &serde_json::Value) -> Result<u64, WalletError> {
    let text = value
        .as_str()
        .ok_or_else(|| WalletError::Response("expected a hex quantity".into()))?;
    u64::from_str_radix(text.trim_start_matches("0x"), 16)
        .map_err(|e| WalletError::Response(format!("bad hex quantity {text:?}: {e}")))
}

fn parse_quantity_u256(value: &serde_json::Value) -> Result<U256, WalletError> {
    let text = value
        .as_str()
        .ok_or_else(|| WalletError::Response("expected a hex quantity".into()))?;
    U256::from_str_radix(text.trim_start_matches("0x"), 16)
        .map_err(|e| WalletError::Response(format!("bad hex quantity {text:?}: {e}")))
}

fn parse_bytes(value: &serde_json::Value) -> Result<Vec<u8>, WalletError> {
    let text = value
        .as_str()
        .ok_or_else(|| WalletError::Response("expected hex data".into()))?;
    hex::decode(text.trim_start_matches("0x"))
        .map_err(|e| WalletError::Response(format!("bad hex data: {e}")))
}

fn parse_hash(value: &serde_json::Value) -> Result<TxHash, WalletError> {
    let bytes = parse_bytes(value)?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::Response("transaction hash is not 32 bytes".into()))?;
    Ok(B256::from(arr))
}

// =============================================================================
// RpcWalletProvider
// =============================================================================

/// JSON-RPC implementation of [`WalletProvider`].
///
/// Spawns a background task polling `eth_accounts` into a watch channel so
/// sessions observe account changes; the task is aborted when the provider
/// is dropped.
pub struct RpcWalletProvider {
    inner: Arc<RpcInner>,
    accounts_rx: watch::Receiver<Vec<Address>>,
    poller: tokio::task::JoinHandle<()>,
}

impl RpcWalletProvider {
    /// Must be called from within a tokio runtime (the account poller is
    /// spawned immediately).
    pub fn new(config: RpcProviderConfig) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(WalletError::Transport)?;
        let inner = Arc::new(RpcInner {
            client,
            url: config.url,
            next_id: AtomicU64::new(1),
            confirmation_poll_interval: config.confirmation_poll_interval,
            confirmation_attempts: config.confirmation_attempts,
        });
        let (accounts_tx, accounts_rx) = watch::channel(Vec::new());
        let poller = tokio::spawn(poll_accounts(
            inner.clone(),
            accounts_tx,
            config.account_poll_interval,
        ));
        Ok(Self {
            inner,
            accounts_rx,
            poller,
        })
    }
}

impl Drop for RpcWalletProvider {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

async fn poll_accounts(
    inner: Arc<RpcInner>,
    tx: watch::Sender<Vec<Address>>,
    interval: Duration,
) {
    // first poll after one full interval, not immediately
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match inner.accounts().await {
            Ok(accounts) => {
                tx.send_if_modified(|current| {
                    if *current != accounts {
                        tracing::debug!(count = accounts.len(), "wallet accounts changed");
                        *current = accounts;
                        true
                    } else {
                        false
                    }
                });
            }
            Err(e) => {
                tracing::debug!(error = %e, "account poll failed");
            }
        }
    }
}

impl WalletProvider for RpcWalletProvider {
    fn accounts(&self) -> BoxFuture<'_, Result<Vec<Address>, WalletError>> {
        Box::pin(async move { self.inner.accounts().await })
    }

    fn request_accounts(&self) -> BoxFuture<'_, Result<Vec<Address>, WalletError>> {
        Box::pin(async move { self.inner.request_accounts().await })
    }

    fn call(&self, to: Address, data: Vec<u8>) -> BoxFuture<'_, Result<Vec<u8>, WalletError>> {
        Box::pin(async move {
            let params = serde_json::json!([
                { "to": format!("{to}"), "data": format!("0x{}", hex::encode(&data)) },
                "latest",
            ]);
            let result = self.inner.rpc("eth_call", params).await?;
            parse_bytes(&result)
        })
    }

    fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> BoxFuture<'_, Result<TxHash, WalletError>> {
        Box::pin(async move {
            let params = serde_json::json!([{
                "from": format!("{from}"),
                "to": format!("{to}"),
                "data": format!("0x{}", hex::encode(&data)),
            }]);
            let result = self.inner.rpc("eth_sendTransaction", params).await?;
            parse_hash(&result)
        })
    }

    fn send_raw_transaction(&self, raw: Vec<u8>) -> BoxFuture<'_, Result<TxHash, WalletError>> {
        Box::pin(async move {
            let params = serde_json::json!([format!("0x{}", hex::encode(&raw))]);
            let result = self.inner.rpc("eth_sendRawTransaction", params).await?;
            parse_hash(&result)
        })
    }

    fn await_confirmation(&self, tx: TxHash) -> BoxFuture<'_, Result<(), WalletError>> {
        Box::pin(async move { self.inner.await_confirmation(tx).await })
    }

    fn chain_id(&self) -> BoxFuture<'_, Result<u64, WalletError>> {
        Box::pin(async move {
            let result = self.inner.rpc("eth_chainId", serde_json::json!([])).await?;
            parse_quantity_u64(&result)
        })
    }

    fn transaction_count(&self, account: Address) -> BoxFuture<'_, Result<u64, WalletError>> {
        Box::pin(async move {
            let params = serde_json::json!([format!("{account}"), "pending"]);
            let result = self.inner.rpc("eth_getTransactionCount", params).await?;
            parse_quantity_u64(&result)
        })
    }

    fn gas_price(&self) -> BoxFuture<'_, Result<U256, WalletError>> {
        Box::pin(async move {
            let result = self
                .inner
                .rpc("eth_gasPrice", serde_json::json!([]))
                .await?;
            parse_quantity_u256(&result)
        })
    }

    fn watch_accounts(&self) -> watch::Receiver<Vec<Address>> {
        self.accounts_rx.clone()
    }
}
