use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cryptox_wallet_core::{
    BalanceAdjustment, LedgerPort, PricePort, TransactionRecord, WalletError,
};

/// In-memory stand-in for the application's transaction history and balance
/// store. Display-layer mock state, mirroring what the exchange UI persists;
/// amounts here are presentation values, not ledger-grade accounting.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<LedgerState>>,
}

#[derive(Default)]
struct LedgerState {
    transactions: Vec<TransactionRecord>,
    balances: HashMap<String, f64>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(self, currency: &str, amount: f64) -> Result<Self, WalletError> {
        {
            let mut g = self.lock()?;
            g.balances.insert(currency.to_owned(), amount);
        }
        Ok(self)
    }

    pub fn transactions(&self) -> Result<Vec<TransactionRecord>, WalletError> {
        Ok(self.lock()?.transactions.clone())
    }

    pub fn balance(&self, currency: &str) -> Result<Option<f64>, WalletError> {
        Ok(self.lock()?.balances.get(currency).copied())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>, WalletError> {
        self.inner
            .lock()
            .map_err(|e| WalletError::transport(format!("ledger lock poisoned: {e}")))
    }
}

impl LedgerPort for InMemoryLedger {
    fn record_transaction(&self, record: &TransactionRecord) -> Result<(), WalletError> {
        let mut g = self.lock()?;
        tracing::debug!(kind = ?record.kind, currency = %record.currency, "transaction recorded");
        g.transactions.push(record.clone());
        Ok(())
    }

    fn adjust_balance(&self, adjustment: &BalanceAdjustment) -> Result<(), WalletError> {
        let delta: f64 = adjustment.amount_delta.parse().map_err(|_| {
            WalletError::transport(format!(
                "unparseable balance delta: {}",
                adjustment.amount_delta
            ))
        })?;
        let mut g = self.lock()?;
        let entry = g.balances.entry(adjustment.currency.clone()).or_default();
        *entry += delta;
        Ok(())
    }
}

/// Fixed-table fiat quote source for the demo exchange. Real pricing is an
/// external service; the core only ever sees the formatted result.
#[derive(Clone)]
pub struct FixedPriceOracle {
    quotes: HashMap<String, f64>,
}

impl Default for FixedPriceOracle {
    fn default() -> Self {
        let mut quotes = HashMap::new();
        quotes.insert("ETH".to_owned(), 45_000.0);
        quotes.insert("BNB".to_owned(), 600.0);
        quotes.insert("MATIC".to_owned(), 0.72);
        Self { quotes }
    }
}

impl FixedPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, currency: &str, usd: f64) -> Self {
        self.quotes.insert(currency.to_owned(), usd);
        self
    }
}

impl PricePort for FixedPriceOracle {
    fn usd_value(&self, currency: &str, amount: &str) -> Result<String, WalletError> {
        let quote = self
            .quotes
            .get(currency)
            .copied()
            .ok_or_else(|| WalletError::transport(format!("no quote for {currency}")))?;
        let units: f64 = amount
            .parse()
            .map_err(|_| WalletError::InvalidAmount(amount.to_owned()))?;
        Ok(format!("${:.2}", units * quote))
    }
}
