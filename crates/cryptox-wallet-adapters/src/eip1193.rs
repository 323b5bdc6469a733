use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::primitives::{keccak256, utils::parse_ether, Address, B256, U256};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use cryptox_wallet_core::{
    ports::{CODE_INTERNAL_ERROR, CODE_METHOD_NOT_FOUND, CODE_SERVER_ERROR},
    parse_chain_ref, ProviderEvent, ProviderEventKind, ProviderPort, WalletError,
};

use crate::WalletAdapterConfig;

/// EIP-1193 gateway with three modes, selected at construction:
///
/// - `Proxy`: forwards JSON-RPC calls to a provider bridge over HTTP.
/// - `Deterministic`: a self-contained in-memory chain for tests and demos,
///   with debug hooks to script account/chain events and failures.
/// - `Disabled`: the production profile with no proxy configured; every
///   operation reports the provider as unavailable.
#[derive(Clone)]
pub struct Eip1193Gateway {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
    subscribers: Arc<Mutex<HashMap<ProviderEventKind, UnboundedSender<ProviderEvent>>>>,
}

#[derive(Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    Proxy(ProxyRuntime),
}

#[derive(Clone)]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::Client,
}

struct ProviderState {
    accounts: Vec<Address>,
    chain_id: u64,
    balances: HashMap<Address, U256>,
    gas_price: U256,
    gas_estimate: U256,
    tx_seq: u64,
    receipts: HashMap<B256, bool>,
    revert_next: bool,
    fail_next: Option<(i64, String)>,
}

impl Default for ProviderState {
    fn default() -> Self {
        let account: Address = "0x1000000000000000000000000000000000000001"
            .parse()
            .expect("valid built-in deterministic account");
        let mut balances = HashMap::new();
        balances.insert(account, parse_ether("10").expect("valid seed balance"));
        Self {
            accounts: vec![account],
            chain_id: 1,
            balances,
            gas_price: U256::from(1_000_000_000u64),
            gas_estimate: U256::from(21_000u64),
            tx_seq: 0,
            receipts: HashMap::new(),
            revert_next: false,
            fail_next: None,
        }
    }
}

impl Default for Eip1193Gateway {
    fn default() -> Self {
        Self::with_config(WalletAdapterConfig::from_env())
    }
}

impl Eip1193Gateway {
    pub fn with_config(config: WalletAdapterConfig) -> Self {
        let mode = if let Some(ref base_url) = config.eip1193_proxy_url {
            let timeout = std::time::Duration::from_millis(config.provider_timeout_ms);
            match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => ProviderMode::Proxy(ProxyRuntime {
                    base_url: base_url.clone(),
                    client,
                }),
                Err(e) => {
                    if config.strict_runtime_required() {
                        ProviderMode::Disabled(format!(
                            "failed to initialize EIP-1193 proxy client in production profile: {e}"
                        ))
                    } else {
                        ProviderMode::Deterministic
                    }
                }
            }
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "EIP-1193 proxy URL not configured in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Deterministic
        };

        Self {
            mode,
            state: Arc::new(Mutex::new(ProviderState::default())),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn deterministic() -> Self {
        Self {
            mode: ProviderMode::Deterministic,
            state: Arc::new(Mutex::new(ProviderState::default())),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, ProviderState>, WalletError> {
        self.state
            .lock()
            .map_err(|e| WalletError::transport(format!("provider lock poisoned: {e}")))
    }

    fn emit(&self, event: ProviderEvent) {
        let Ok(subscribers) = self.subscribers.lock() else {
            return;
        };
        if let Some(sender) = subscribers.get(&event.kind()) {
            // A dropped receiver just means nobody is listening anymore.
            let _ = sender.send(event);
        }
    }

    pub fn debug_inject_accounts_changed(
        &self,
        accounts: Vec<Address>,
    ) -> Result<(), WalletError> {
        {
            let mut g = self.lock_state()?;
            g.accounts = accounts.clone();
        }
        self.emit(ProviderEvent::AccountsChanged(accounts));
        Ok(())
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) -> Result<(), WalletError> {
        {
            let mut g = self.lock_state()?;
            g.chain_id = chain_id;
        }
        self.emit(ProviderEvent::ChainChanged(format!("0x{chain_id:x}")));
        Ok(())
    }

    pub fn debug_set_balance(&self, address: Address, wei: U256) -> Result<(), WalletError> {
        let mut g = self.lock_state()?;
        g.balances.insert(address, wei);
        Ok(())
    }

    /// Next deterministic request fails with the given provider error.
    pub fn debug_fail_next(&self, code: i64, message: &str) -> Result<(), WalletError> {
        let mut g = self.lock_state()?;
        g.fail_next = Some((code, message.to_owned()));
        Ok(())
    }

    /// Next deterministic submission settles with a reverted receipt.
    pub fn debug_revert_next(&self) -> Result<(), WalletError> {
        let mut g = self.lock_state()?;
        g.revert_next = true;
        Ok(())
    }

    fn deterministic_request(&self, method: &str, params: &Value) -> Result<Value, WalletError> {
        let mut g = self.lock_state()?;
        if let Some((code, message)) = g.fail_next.take() {
            return Err(WalletError::from_provider_fault(code, message));
        }

        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(Value::Array(
                g.accounts
                    .iter()
                    .map(|a| Value::String(a.to_string()))
                    .collect(),
            )),
            "eth_chainId" => Ok(Value::String(format!("0x{:x}", g.chain_id))),
            "wallet_switchEthereumChain" => {
                let requested = params
                    .get(0)
                    .and_then(|p| p.get("chainId"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        WalletError::transport("wallet_switchEthereumChain: chainId expected")
                    })?;
                let chain_id = parse_chain_ref(requested)?;
                g.chain_id = chain_id;
                drop(g);
                self.emit(ProviderEvent::ChainChanged(format!("0x{chain_id:x}")));
                Ok(Value::Null)
            }
            "eth_gasPrice" => Ok(Value::String(format!("0x{:x}", g.gas_price))),
            "eth_estimateGas" => {
                let call = params
                    .get(0)
                    .ok_or_else(|| WalletError::transport("eth_estimateGas: call expected"))?;
                let from = address_field(call, "from")?;
                let value = quantity_field(call, "value")?;
                let balance = g.balances.get(&from).copied().unwrap_or(U256::ZERO);
                if value > balance {
                    return Err(WalletError::from_provider_fault(
                        CODE_SERVER_ERROR,
                        "insufficient funds for gas * price + value",
                    ));
                }
                Ok(Value::String(format!("0x{:x}", g.gas_estimate)))
            }
            "eth_sendTransaction" => {
                let tx = params
                    .get(0)
                    .ok_or_else(|| WalletError::transport("eth_sendTransaction: tx expected"))?;
                let from = address_field(tx, "from")?;
                let to = address_field(tx, "to")?;
                let value = quantity_field(tx, "value")?;
                let balance = g.balances.get(&from).copied().unwrap_or(U256::ZERO);
                if value > balance {
                    return Err(WalletError::from_provider_fault(
                        CODE_SERVER_ERROR,
                        "insufficient funds for gas * price + value",
                    ));
                }

                g.tx_seq += 1;
                let mut seed = serde_json::to_vec(tx)
                    .map_err(|e| WalletError::transport(format!("tx serialization failed: {e}")))?;
                seed.extend_from_slice(&g.tx_seq.to_be_bytes());
                let hash = keccak256(seed);

                let reverted = std::mem::take(&mut g.revert_next);
                if !reverted {
                    g.balances.insert(from, balance - value);
                    let credited = g.balances.get(&to).copied().unwrap_or(U256::ZERO) + value;
                    g.balances.insert(to, credited);
                }
                g.receipts.insert(hash, !reverted);
                Ok(Value::String(hash.to_string()))
            }
            "eth_getTransactionReceipt" => {
                let raw = params.get(0).and_then(Value::as_str).ok_or_else(|| {
                    WalletError::transport("eth_getTransactionReceipt: hash expected")
                })?;
                let hash: B256 = raw
                    .parse()
                    .map_err(|e| WalletError::transport(format!("invalid hash {raw}: {e}")))?;
                match g.receipts.get(&hash) {
                    Some(success) => Ok(serde_json::json!({
                        "transactionHash": hash.to_string(),
                        "status": if *success { "0x1" } else { "0x0" },
                    })),
                    None => Ok(Value::Null),
                }
            }
            "eth_getBalance" => {
                let raw = params
                    .get(0)
                    .and_then(Value::as_str)
                    .ok_or_else(|| WalletError::transport("eth_getBalance: address expected"))?;
                let address: Address = raw
                    .parse()
                    .map_err(|e| WalletError::transport(format!("invalid address {raw}: {e}")))?;
                let balance = g.balances.get(&address).copied().unwrap_or(U256::ZERO);
                Ok(Value::String(format!("0x{balance:x}")))
            }
            _ => Err(WalletError::Provider {
                code: CODE_METHOD_NOT_FOUND,
                message: format!("the method {method} does not exist/is not available"),
            }),
        }
    }

    async fn proxy_request(
        &self,
        runtime: &ProxyRuntime,
        method: &str,
        params: Value,
    ) -> Result<Value, WalletError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = runtime
            .client
            .post(&runtime.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WalletError::transport(format!("eip1193 proxy request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| WalletError::transport(format!("eip1193 proxy json decode failed: {e}")))?;
        if !status.is_success() {
            return Err(WalletError::transport(format!(
                "eip1193 proxy status {status}: {body}"
            )));
        }
        if let Some(err) = body.get("error") {
            let code = err
                .get("code")
                .and_then(Value::as_i64)
                .unwrap_or(CODE_INTERNAL_ERROR);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("provider error")
                .to_owned();
            return Err(WalletError::from_provider_fault(code, message));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| WalletError::transport("eip1193 proxy missing result"))
    }
}

#[async_trait]
impl ProviderPort for Eip1193Gateway {
    fn is_available(&self) -> bool {
        !matches!(self.mode, ProviderMode::Disabled(_))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        match &self.mode {
            ProviderMode::Disabled(reason) => {
                tracing::debug!(reason, method, "request against disabled provider");
                Err(WalletError::ProviderUnavailable)
            }
            ProviderMode::Deterministic => self.deterministic_request(method, &params),
            ProviderMode::Proxy(runtime) => self.proxy_request(runtime, method, params).await,
        }
    }

    fn subscribe(
        &self,
        kind: ProviderEventKind,
    ) -> Result<UnboundedReceiver<ProviderEvent>, WalletError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|e| WalletError::transport(format!("subscriber lock poisoned: {e}")))?;
        // Replacing the sender ends the previous subscriber's stream; one
        // authoritative consumer per kind.
        subscribers.insert(kind, tx);
        Ok(rx)
    }

    fn unsubscribe(&self, kind: ProviderEventKind) -> Result<(), WalletError> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|e| WalletError::transport(format!("subscriber lock poisoned: {e}")))?;
        subscribers.remove(&kind);
        Ok(())
    }
}

fn address_field(obj: &Value, field: &str) -> Result<Address, WalletError> {
    let raw = obj
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| WalletError::transport(format!("call missing {field} address")))?;
    raw.parse()
        .map_err(|e| WalletError::transport(format!("invalid {field} address {raw}: {e}")))
}

fn quantity_field(obj: &Value, field: &str) -> Result<U256, WalletError> {
    let raw = obj
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| WalletError::transport(format!("call missing {field} quantity")))?;
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    U256::from_str_radix(digits, 16)
        .map_err(|e| WalletError::transport(format!("invalid {field} quantity {raw}: {e}")))
}
