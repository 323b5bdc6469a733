use std::sync::Arc;

use alloy::primitives::{utils::format_ether, Address, U256};
use serde_json::Value;

use crate::domain::{
    parse_amount_wei, BalanceAdjustment, ChainId, Session, SettlementStatus, TransactionKind,
    TransactionRecord, TransferOutcome, TransferReceipt, TransferRequest,
};
use crate::network::NetworkGuard;
use crate::ports::{ClockPort, LedgerPort, PricePort, ProviderPort, WalletError};
use crate::session::AccountSession;
use crate::transfer::{TransferExecutor, TransferPolicy};

/// Compliance gate on the withdrawal path: unverified users may not move
/// more than `unverified_limit_wei` in one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawPolicy {
    pub kyc_verified: bool,
    pub unverified_limit_wei: U256,
}

impl WithdrawPolicy {
    pub fn allows(&self, amount_wei: U256) -> bool {
        self.kyc_verified || amount_wei <= self.unverified_limit_wei
    }
}

/// The inbound surface the rest of the application calls.
///
/// Composes one shared gateway across the session, the network guard and the
/// transfer executor - the gateway is the sole channel to the provider and
/// nothing duplicates its state. Every operation pumps pending provider
/// events first so a disconnect or account switch delivered while idle is
/// honored before new work starts.
pub struct WalletService<P, C, L, R>
where
    P: ProviderPort,
    C: ClockPort,
    L: LedgerPort,
    R: PricePort,
{
    gateway: Arc<P>,
    session: AccountSession<P, C>,
    guard: NetworkGuard<P>,
    executor: TransferExecutor<P>,
    ledger: L,
    price: R,
    withdraw_policy: Option<WithdrawPolicy>,
}

impl<P, C, L, R> WalletService<P, C, L, R>
where
    P: ProviderPort,
    C: ClockPort,
    L: LedgerPort,
    R: PricePort,
{
    pub fn new(gateway: Arc<P>, clock: C, ledger: L, price: R, policy: TransferPolicy) -> Self {
        Self {
            session: AccountSession::new(Arc::clone(&gateway), clock),
            guard: NetworkGuard::new(Arc::clone(&gateway)),
            executor: TransferExecutor::new(Arc::clone(&gateway), policy),
            gateway,
            ledger,
            price,
            withdraw_policy: None,
        }
    }

    pub fn with_withdraw_policy(mut self, policy: WithdrawPolicy) -> Self {
        self.withdraw_policy = Some(policy);
        self
    }

    pub fn set_kyc_verified(&mut self, verified: bool) {
        if let Some(policy) = self.withdraw_policy.as_mut() {
            policy.kyc_verified = verified;
        }
    }

    pub async fn connect(&mut self) -> Result<Session, WalletError> {
        self.session.process_events()?;
        self.session.connect().await
    }

    pub fn disconnect(&mut self) {
        self.session.disconnect();
    }

    pub fn current_session(&self) -> Result<&Session, WalletError> {
        self.session.current_session()
    }

    /// Applies any provider events that arrived since the last call.
    pub fn process_events(&mut self) -> Result<(), WalletError> {
        self.session.process_events()
    }

    pub async fn current_chain(&self) -> Result<ChainId, WalletError> {
        self.guard.current_chain().await
    }

    /// Requests a network switch. The provider may apply it asynchronously;
    /// the resulting `chainChanged` event refreshes the session on the next
    /// pump, and the transfer path re-validates regardless.
    pub async fn switch_to(&mut self, chain: ChainId) -> Result<(), WalletError> {
        self.session.process_events()?;
        self.guard.switch_to(chain).await
    }

    pub async fn get_balance(&self, address: Address) -> Result<String, WalletError> {
        let raw = self
            .gateway
            .request(
                "eth_getBalance",
                serde_json::json!([address, "latest"]),
            )
            .await?;
        let wei = balance_from_value(&raw)?;
        Ok(format_ether(wei))
    }

    /// Submits a withdrawal and reports the settlement to the application
    /// ledger. Requires a connected session on the desired chain.
    pub async fn submit_transfer(
        &mut self,
        recipient: &str,
        amount: &str,
        desired_chain: ChainId,
    ) -> Result<TransferReceipt, WalletError> {
        self.session.process_events()?;
        let session = self.session.current_session()?.clone();

        if let Some(policy) = self.withdraw_policy {
            let amount_wei = parse_amount_wei(amount)?;
            if !policy.allows(amount_wei) {
                return Err(WalletError::KycRequired);
            }
        }

        let request = TransferRequest {
            recipient: recipient.to_owned(),
            amount_eth: amount.to_owned(),
        };
        let receipt = self
            .executor
            .submit(&session, &request, desired_chain)
            .await?;
        self.report_settlement(desired_chain, amount, &receipt)?;
        Ok(receipt)
    }

    fn report_settlement(
        &self,
        chain: ChainId,
        amount: &str,
        receipt: &TransferReceipt,
    ) -> Result<(), WalletError> {
        let currency = chain.native_symbol().to_owned();
        let value_estimate = self.price.usd_value(&currency, amount)?;
        let status = match receipt.outcome {
            TransferOutcome::Success => SettlementStatus::Completed,
            TransferOutcome::Reverted => SettlementStatus::Failed,
        };
        self.ledger.record_transaction(&TransactionRecord {
            kind: TransactionKind::Withdraw,
            currency: currency.clone(),
            amount: amount.to_owned(),
            value_estimate: value_estimate.clone(),
            status,
        })?;
        if receipt.outcome == TransferOutcome::Success {
            self.ledger.adjust_balance(&BalanceAdjustment {
                currency,
                amount_delta: format!("-{amount}"),
                value_delta: value_estimate,
            })?;
        }
        Ok(())
    }
}

fn balance_from_value(value: &Value) -> Result<U256, WalletError> {
    let raw = value
        .as_str()
        .ok_or_else(|| WalletError::transport("eth_getBalance: quantity string expected"))?;
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    U256::from_str_radix(digits, 16)
        .map_err(|e| WalletError::transport(format!("eth_getBalance: invalid quantity {raw}: {e}")))
}
