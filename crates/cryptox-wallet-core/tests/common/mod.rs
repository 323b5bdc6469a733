#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use cryptox_wallet_core::{
    BalanceAdjustment, ClockPort, LedgerPort, PricePort, ProviderEvent, ProviderEventKind,
    ProviderPort, TransactionRecord, WalletError,
};

pub const ACCOUNT_A: &str = "0x1000000000000000000000000000000000000001";
pub const ACCOUNT_B: &str = "0x2000000000000000000000000000000000000002";
pub const RECIPIENT: &str = "0x000000000000000000000000000000000000cafe";
/// EIP-55 test vector; passes the checksum.
pub const RECIPIENT_CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

pub fn account_a() -> Address {
    ACCOUNT_A.parse().expect("valid account a")
}

pub fn account_b() -> Address {
    ACCOUNT_B.parse().expect("valid account b")
}

#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicU64,
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, WalletError> {
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + 1_739_750_400_000)
    }
}

struct ScriptedState {
    accounts: Vec<String>,
    chain_hex: String,
    gas_price_hex: String,
    gas_estimate_hex: String,
    balance_hex: String,
    tx_hash: String,
    receipt_status: String,
    receipt_delay_polls: usize,
    failures: HashMap<String, (i64, String)>,
    subscribe_failures: HashSet<ProviderEventKind>,
    calls: Vec<(String, Value)>,
}

impl Default for ScriptedState {
    fn default() -> Self {
        Self {
            accounts: vec![ACCOUNT_A.to_owned()],
            chain_hex: "0x1".to_owned(),
            gas_price_hex: "0x3b9aca00".to_owned(),
            gas_estimate_hex: "0x5208".to_owned(),
            balance_hex: "0x14d1120d7b160000".to_owned(),
            tx_hash: "0x1111111111111111111111111111111111111111111111111111111111111111"
                .to_owned(),
            receipt_status: "0x1".to_owned(),
            receipt_delay_polls: 0,
            failures: HashMap::new(),
            subscribe_failures: HashSet::new(),
            calls: Vec::new(),
        }
    }
}

/// Scripted provider double. Every `request` is logged so tests can assert
/// exactly which methods were (not) reached.
pub struct ScriptedGateway {
    available: AtomicBool,
    state: Mutex<ScriptedState>,
    subscribers: Mutex<HashMap<ProviderEventKind, UnboundedSender<ProviderEvent>>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            state: Mutex::new(ScriptedState::default()),
            subscribers: Mutex::new(HashMap::new()),
        }
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_accounts(&self, accounts: &[&str]) {
        let mut g = self.state.lock().expect("state lock");
        g.accounts = accounts.iter().map(|a| (*a).to_owned()).collect();
    }

    pub fn set_chain_hex(&self, chain_hex: &str) {
        let mut g = self.state.lock().expect("state lock");
        g.chain_hex = chain_hex.to_owned();
    }

    pub fn set_gas_estimate_hex(&self, estimate_hex: &str) {
        let mut g = self.state.lock().expect("state lock");
        g.gas_estimate_hex = estimate_hex.to_owned();
    }

    pub fn set_receipt_status(&self, status: &str) {
        let mut g = self.state.lock().expect("state lock");
        g.receipt_status = status.to_owned();
    }

    pub fn set_receipt_delay_polls(&self, polls: usize) {
        let mut g = self.state.lock().expect("state lock");
        g.receipt_delay_polls = polls;
    }

    /// Every call to `method` fails with the given provider fault until the
    /// script is changed.
    pub fn fail_method(&self, method: &str, code: i64, message: &str) {
        let mut g = self.state.lock().expect("state lock");
        g.failures
            .insert(method.to_owned(), (code, message.to_owned()));
    }

    pub fn clear_failures(&self) {
        let mut g = self.state.lock().expect("state lock");
        g.failures.clear();
    }

    /// Every `subscribe` for `kind` fails until the script is changed.
    pub fn fail_subscribe(&self, kind: ProviderEventKind) {
        let mut g = self.state.lock().expect("state lock");
        g.subscribe_failures.insert(kind);
    }

    pub fn has_subscriber(&self, kind: ProviderEventKind) -> bool {
        self.subscribers
            .lock()
            .expect("subscriber lock")
            .contains_key(&kind)
    }

    pub fn calls(&self, method: &str) -> usize {
        let g = self.state.lock().expect("state lock");
        g.calls.iter().filter(|(m, _)| m == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().expect("state lock").calls.len()
    }

    pub fn last_params(&self, method: &str) -> Option<Value> {
        let g = self.state.lock().expect("state lock");
        g.calls
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
    }

    pub fn push_accounts_changed(&self, accounts: Vec<Address>) {
        self.emit(ProviderEvent::AccountsChanged(accounts));
    }

    pub fn push_chain_changed(&self, chain_ref: u64) {
        self.emit(ProviderEvent::ChainChanged(format!("0x{chain_ref:x}")));
    }

    pub fn push_chain_changed_raw(&self, raw: &str) {
        self.emit(ProviderEvent::ChainChanged(raw.to_owned()));
    }

    fn emit(&self, event: ProviderEvent) {
        let subscribers = self.subscribers.lock().expect("subscriber lock");
        let sender = subscribers
            .get(&event.kind())
            .expect("no subscriber registered for event kind");
        sender.send(event).expect("subscriber receiver dropped");
    }
}

#[async_trait]
impl ProviderPort for ScriptedGateway {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        if !self.is_available() {
            return Err(WalletError::ProviderUnavailable);
        }
        let mut g = self.state.lock().expect("state lock");
        g.calls.push((method.to_owned(), params));
        if let Some((code, message)) = g.failures.get(method) {
            return Err(WalletError::from_provider_fault(*code, message.clone()));
        }
        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(Value::Array(
                g.accounts.iter().cloned().map(Value::String).collect(),
            )),
            "eth_chainId" => Ok(Value::String(g.chain_hex.clone())),
            "eth_gasPrice" => Ok(Value::String(g.gas_price_hex.clone())),
            "eth_estimateGas" => Ok(Value::String(g.gas_estimate_hex.clone())),
            "eth_getBalance" => Ok(Value::String(g.balance_hex.clone())),
            "eth_sendTransaction" => Ok(Value::String(g.tx_hash.clone())),
            "eth_getTransactionReceipt" => {
                if g.receipt_delay_polls > 0 {
                    g.receipt_delay_polls -= 1;
                    Ok(Value::Null)
                } else {
                    Ok(serde_json::json!({
                        "transactionHash": g.tx_hash,
                        "status": g.receipt_status,
                    }))
                }
            }
            "wallet_switchEthereumChain" => Ok(Value::Null),
            other => Err(WalletError::Provider {
                code: -32601,
                message: format!("unscripted method {other}"),
            }),
        }
    }

    fn subscribe(
        &self,
        kind: ProviderEventKind,
    ) -> Result<UnboundedReceiver<ProviderEvent>, WalletError> {
        if self
            .state
            .lock()
            .expect("state lock")
            .subscribe_failures
            .contains(&kind)
        {
            return Err(WalletError::transport("subscription refused"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("subscriber lock")
            .insert(kind, tx);
        Ok(rx)
    }

    fn unsubscribe(&self, kind: ProviderEventKind) -> Result<(), WalletError> {
        self.subscribers
            .lock()
            .expect("subscriber lock")
            .remove(&kind);
        Ok(())
    }
}

/// Captures what the core reports to the application ledger.
#[derive(Default)]
pub struct RecordingLedger {
    transactions: Mutex<Vec<TransactionRecord>>,
    adjustments: Mutex<Vec<BalanceAdjustment>>,
}

impl RecordingLedger {
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.transactions.lock().expect("ledger lock").clone()
    }

    pub fn adjustments(&self) -> Vec<BalanceAdjustment> {
        self.adjustments.lock().expect("ledger lock").clone()
    }
}

impl LedgerPort for &RecordingLedger {
    fn record_transaction(&self, record: &TransactionRecord) -> Result<(), WalletError> {
        self.transactions
            .lock()
            .expect("ledger lock")
            .push(record.clone());
        Ok(())
    }

    fn adjust_balance(&self, adjustment: &BalanceAdjustment) -> Result<(), WalletError> {
        self.adjustments
            .lock()
            .expect("ledger lock")
            .push(adjustment.clone());
        Ok(())
    }
}

/// Flat quote: every asset is worth `usd_per_unit`.
pub struct FlatPrice {
    pub usd_per_unit: f64,
}

impl PricePort for FlatPrice {
    fn usd_value(&self, _currency: &str, amount: &str) -> Result<String, WalletError> {
        let units: f64 = amount
            .parse()
            .map_err(|_| WalletError::InvalidAmount(amount.to_owned()))?;
        Ok(format!("${:.2}", units * self.usd_per_unit))
    }
}
