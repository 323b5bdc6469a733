use std::sync::Arc;

use alloy::primitives::{B256, U256};
use serde_json::Value;
use tokio::time::{sleep, Duration, Instant};

use crate::domain::{
    parse_amount_wei, parse_recipient, ChainId, GasPlan, Session, TransferOutcome,
    TransferReceipt, TransferRequest,
};
use crate::network::NetworkGuard;
use crate::ports::{ProviderPort, WalletError};

/// Receipt-await policy. A timeout here is our policy, not a provider
/// capability; the in-flight request itself cannot be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    pub receipt_timeout_ms: u64,
    pub receipt_poll_interval_ms: u64,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            receipt_timeout_ms: 180_000,
            receipt_poll_interval_ms: 2_000,
        }
    }
}

/// Validates, prices, submits and confirms a single native-asset transfer.
pub struct TransferExecutor<P: ProviderPort> {
    gateway: Arc<P>,
    guard: NetworkGuard<P>,
    policy: TransferPolicy,
}

impl<P: ProviderPort> TransferExecutor<P> {
    pub fn new(gateway: Arc<P>, policy: TransferPolicy) -> Self {
        Self {
            guard: NetworkGuard::new(Arc::clone(&gateway)),
            gateway,
            policy,
        }
    }

    /// Submits a transfer and waits for inclusion.
    ///
    /// Validation failures surface before any gateway call. A mismatched
    /// network is reported, never silently switched - an unexpected chain
    /// switch mid-transfer is a safety hazard, so repairing the network is
    /// the caller's explicit decision. `Reverted` is a terminal outcome, not
    /// an error: the submission worked, settlement did not.
    pub async fn submit(
        &self,
        session: &Session,
        request: &TransferRequest,
        desired_chain: ChainId,
    ) -> Result<TransferReceipt, WalletError> {
        let recipient = parse_recipient(&request.recipient)?;
        let value = parse_amount_wei(&request.amount_eth)?;

        let active = self.guard.current_chain().await?;
        if active != desired_chain {
            return Err(WalletError::WrongNetwork {
                active,
                desired: desired_chain,
            });
        }

        let price_raw = self
            .gateway
            .request("eth_gasPrice", Value::Array(Vec::new()))
            .await
            .map_err(classify_node_fault)?;
        let price = quantity_from_value(&price_raw, "eth_gasPrice")?;

        let call = serde_json::json!({
            "from": session.address,
            "to": recipient,
            "value": format!("{value:#x}"),
        });
        let estimate_raw = self
            .gateway
            .request("eth_estimateGas", serde_json::json!([call]))
            .await
            .map_err(classify_node_fault)?;
        let estimated_limit = quantity_from_value(&estimate_raw, "eth_estimateGas")?;
        let plan = GasPlan::with_buffer(estimated_limit, price)?;
        tracing::debug!(
            estimated = %plan.estimated_limit,
            applied = %plan.applied_limit,
            price = %plan.price,
            "gas plan computed"
        );

        let tx = serde_json::json!({
            "from": session.address,
            "to": recipient,
            "value": format!("{value:#x}"),
            "gas": format!("{:#x}", plan.applied_limit),
            "gasPrice": format!("{:#x}", plan.price),
        });
        let hash_raw = self
            .gateway
            .request("eth_sendTransaction", serde_json::json!([tx]))
            .await
            .map_err(classify_node_fault)?;
        let tx_hash = hash_from_value(&hash_raw)?;
        tracing::info!(tx_hash = %tx_hash, to = %recipient, "transfer submitted");

        let receipt = self.await_inclusion(tx_hash).await?;
        tracing::info!(tx_hash = %tx_hash, outcome = ?receipt.outcome, "transfer settled");
        Ok(receipt)
    }

    async fn await_inclusion(&self, tx_hash: B256) -> Result<TransferReceipt, WalletError> {
        let deadline = Instant::now() + Duration::from_millis(self.policy.receipt_timeout_ms);
        loop {
            let receipt = self
                .gateway
                .request(
                    "eth_getTransactionReceipt",
                    serde_json::json!([format!("{tx_hash}")]),
                )
                .await?;
            if !receipt.is_null() {
                let outcome = if receipt_succeeded(&receipt)? {
                    TransferOutcome::Success
                } else {
                    TransferOutcome::Reverted
                };
                return Ok(TransferReceipt {
                    transaction_hash: tx_hash,
                    outcome,
                });
            }
            if Instant::now() >= deadline {
                return Err(WalletError::ConfirmationTimeout { tx_hash });
            }
            sleep(Duration::from_millis(self.policy.receipt_poll_interval_ms)).await;
        }
    }
}

/// Refines node-side faults on the estimation/submission path. The
/// insufficient-funds signature (carried on `-32000` by geth-style nodes) is
/// the one case the UI must distinguish from every other provider error.
fn classify_node_fault(err: WalletError) -> WalletError {
    match err {
        WalletError::Provider { code, ref message }
            if message.to_ascii_lowercase().contains("insufficient funds") =>
        {
            tracing::debug!(code, "node fault classified as insufficient funds");
            WalletError::InsufficientFunds
        }
        other => other,
    }
}

fn quantity_from_value(value: &Value, what: &str) -> Result<U256, WalletError> {
    let raw = value
        .as_str()
        .ok_or_else(|| WalletError::transport(format!("{what}: quantity string expected")))?;
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    U256::from_str_radix(digits, 16)
        .map_err(|e| WalletError::transport(format!("{what}: invalid quantity {raw}: {e}")))
}

fn hash_from_value(value: &Value) -> Result<B256, WalletError> {
    let raw = value
        .as_str()
        .ok_or_else(|| WalletError::transport("eth_sendTransaction: hash string expected"))?;
    raw.parse()
        .map_err(|e| WalletError::transport(format!("invalid transaction hash {raw}: {e}")))
}

fn receipt_succeeded(receipt: &Value) -> Result<bool, WalletError> {
    let status = receipt
        .get("status")
        .ok_or_else(|| WalletError::transport("receipt missing status field"))?;
    if let Some(raw) = status.as_str() {
        return Ok(raw == "0x1");
    }
    if let Some(n) = status.as_u64() {
        return Ok(n == 1);
    }
    Err(WalletError::transport(format!(
        "unrecognized receipt status: {status}"
    )))
}
