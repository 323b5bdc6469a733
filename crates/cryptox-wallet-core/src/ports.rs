use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::{BalanceAdjustment, ChainId, TransactionRecord};

/// EIP-1193 user-rejection code.
pub const CODE_USER_REJECTED: i64 = 4001;
/// EIP-3326: requested chain has not been added to the wallet.
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;
/// JSON-RPC method not found; the provider lacks the capability.
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;
/// Generic node-side failure; paired with a message inspection for the
/// insufficient-funds classification.
pub const CODE_SERVER_ERROR: i64 = -32000;
/// JSON-RPC internal error, used for transport-level faults.
pub const CODE_INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("no wallet provider is available in this environment")]
    ProviderUnavailable,
    #[error("request rejected by user")]
    UserRejected,
    #[error("provider reported unsupported chain id {raw}")]
    UnknownChain { raw: String },
    #[error("network switch rejected by user")]
    SwitchRejected,
    #[error("provider cannot switch to the requested network")]
    SwitchUnsupported,
    #[error("wrong network: active {active}, required {desired}")]
    WrongNetwork { active: ChainId, desired: ChainId },
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("invalid transfer amount: {0}")]
    InvalidAmount(String),
    #[error("insufficient funds for transfer")]
    InsufficientFunds,
    #[error("wallet is not connected")]
    NotConnected,
    #[error("wallet is already connected")]
    AlreadyConnected,
    #[error("identity verification required for withdrawals of this size")]
    KycRequired,
    #[error("transaction {tx_hash} not confirmed before deadline")]
    ConfirmationTimeout { tx_hash: B256 },
    #[error("provider error {code}: {message}")]
    Provider { code: i64, message: String },
}

impl WalletError {
    /// Classifies a provider-reported fault. The user-rejection code is the
    /// one classification every adapter must honor; everything else stays a
    /// `Provider` fault until a caller with more context refines it.
    pub fn from_provider_fault(code: i64, message: impl Into<String>) -> Self {
        if code == CODE_USER_REJECTED {
            WalletError::UserRejected
        } else {
            WalletError::Provider {
                code,
                message: message.into(),
            }
        }
    }

    /// Transport-level fault (broken pipe, poisoned lock, malformed frame)
    /// carried on the JSON-RPC internal-error code.
    pub fn transport(message: impl Into<String>) -> Self {
        WalletError::Provider {
            code: CODE_INTERNAL_ERROR,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
}

/// Provider push notification, delivered in arrival order on a
/// single-consumer channel per kind. The chain payload stays the raw wire
/// string; mapping it onto the supported set is session policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(String),
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            ProviderEvent::AccountsChanged(_) => ProviderEventKind::AccountsChanged,
            ProviderEvent::ChainChanged(_) => ProviderEventKind::ChainChanged,
        }
    }
}

/// The sole channel to the injected wallet provider.
///
/// Availability is re-checked per call rather than cached - the provider can
/// be removed from the environment at runtime. `subscribe` installs the one
/// authoritative consumer for an event kind; a later `subscribe` for the same
/// kind replaces the previous channel, whose receiver then sees the stream
/// end. The gateway transports events verbatim: no dedup, no debounce, and no
/// session policy (an empty accounts payload is forwarded, not acted on).
#[async_trait]
pub trait ProviderPort: Send + Sync {
    fn is_available(&self) -> bool;

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;

    fn subscribe(
        &self,
        kind: ProviderEventKind,
    ) -> Result<UnboundedReceiver<ProviderEvent>, WalletError>;

    fn unsubscribe(&self, kind: ProviderEventKind) -> Result<(), WalletError>;
}

pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, WalletError>;
}

/// Outbound report sink: the surrounding application's transaction history
/// and balance store. The core writes, it never reads back.
pub trait LedgerPort {
    fn record_transaction(&self, record: &TransactionRecord) -> Result<(), WalletError>;
    fn adjust_balance(&self, adjustment: &BalanceAdjustment) -> Result<(), WalletError>;
}

/// Fiat valuation lookup. Pricing is an external concern; the core never
/// computes a quote itself.
pub trait PricePort {
    fn usd_value(&self, currency: &str, amount: &str) -> Result<String, WalletError>;
}
