use alloy::primitives::{utils::parse_ether, Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::ports::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

/// Networks the exchange supports for on-chain withdrawals.
///
/// Each variant maps to the canonical EIP-155 chain id and its `0x`-prefixed
/// hex encoding used on the provider wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainId {
    Ethereum,
    Bsc,
    Polygon,
}

impl ChainId {
    pub const ALL: [ChainId; 3] = [ChainId::Ethereum, ChainId::Bsc, ChainId::Polygon];

    pub const fn chain_ref(self) -> u64 {
        match self {
            ChainId::Ethereum => 1,
            ChainId::Bsc => 56,
            ChainId::Polygon => 137,
        }
    }

    pub const fn hex_id(self) -> &'static str {
        match self {
            ChainId::Ethereum => "0x1",
            ChainId::Bsc => "0x38",
            ChainId::Polygon => "0x89",
        }
    }

    /// Ticker of the chain's native asset, used for ledger reporting.
    pub const fn native_symbol(self) -> &'static str {
        match self {
            ChainId::Ethereum => "ETH",
            ChainId::Bsc => "BNB",
            ChainId::Polygon => "MATIC",
        }
    }

    pub fn from_chain_ref(raw: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.chain_ref() == raw)
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChainId::Ethereum => "ethereum",
            ChainId::Bsc => "bsc",
            ChainId::Polygon => "polygon",
        };
        f.write_str(name)
    }
}

/// Parses a chain id as delivered by the provider: `0x`-prefixed hex by
/// convention, decimal tolerated for lenient providers.
pub fn parse_chain_ref(raw: &str) -> Result<u64, WalletError> {
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|_| WalletError::UnknownChain {
            raw: raw.to_owned(),
        })
    } else {
        raw.parse().map_err(|_| WalletError::UnknownChain {
            raw: raw.to_owned(),
        })
    }
}

/// The authorized account the provider handed out, plus the chain it was on.
///
/// Owned exclusively by `AccountSession`; replaced wholesale whenever the
/// provider fires an account change, never patched by other components.
/// `chain` is `None` while the provider sits on a network outside the
/// supported set - the connection stays usable, transfers will fail network
/// validation until the user switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub address: Address,
    pub chain: Option<ChainId>,
    pub connected_at: TimestampMs,
}

/// A withdrawal as entered by the user, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub recipient: String,
    /// Amount in native units as a decimal string, e.g. "1.5".
    pub amount_eth: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    Success,
    Reverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transaction_hash: B256,
    pub outcome: TransferOutcome,
}

/// Fee parameters for a single submission.
///
/// `applied_limit` carries a fixed 20% buffer over the node's estimate to
/// absorb estimation drift between quote and inclusion. Integer arithmetic
/// only; the buffer floors, it never rounds up past `estimated * 12 / 10`.
/// An estimate too large to buffer is rejected, never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPlan {
    pub estimated_limit: U256,
    pub applied_limit: U256,
    pub price: U256,
}

impl GasPlan {
    pub fn with_buffer(estimated_limit: U256, price: U256) -> Result<Self, WalletError> {
        let applied_limit = estimated_limit
            .checked_mul(U256::from(12))
            .ok_or_else(|| {
                WalletError::transport(format!(
                    "gas estimate {estimated_limit} too large to buffer"
                ))
            })?
            / U256::from(10);
        Ok(Self {
            estimated_limit,
            applied_limit,
            price,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    Completed,
    Pending,
    Failed,
}

/// What the core reports to the application ledger after a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    pub currency: String,
    pub amount: String,
    pub value_estimate: String,
    pub status: SettlementStatus,
}

/// Signed balance delta reported alongside a settled withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAdjustment {
    pub currency: String,
    pub amount_delta: String,
    pub value_delta: String,
}

/// Validates a recipient address before anything touches the network.
///
/// Uniform-case hex is accepted as unchecksummed; mixed-case input must pass
/// the EIP-55 checksum, so a typo in a checksummed address is caught here
/// rather than burning gas on an unreachable recipient.
pub fn parse_recipient(raw: &str) -> Result<Address, WalletError> {
    let body = raw
        .strip_prefix("0x")
        .ok_or_else(|| WalletError::InvalidRecipient(format!("missing 0x prefix: {raw}")))?;
    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WalletError::InvalidRecipient(format!(
            "expected 40 hex characters: {raw}"
        )));
    }
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower {
        Address::parse_checksummed(raw, None)
            .map_err(|_| WalletError::InvalidRecipient(format!("checksum mismatch: {raw}")))
    } else {
        raw.parse()
            .map_err(|_| WalletError::InvalidRecipient(raw.to_owned()))
    }
}

/// Parses a positive decimal native-unit amount into wei.
pub fn parse_amount_wei(raw: &str) -> Result<U256, WalletError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WalletError::InvalidAmount("empty amount".to_owned()));
    }
    // parse_ether maps a signed input onto the unsigned wei range instead of
    // rejecting it; the sign must be caught here.
    if trimmed.starts_with('-') {
        return Err(WalletError::InvalidAmount(format!(
            "amount must be positive: {trimmed}"
        )));
    }
    let wei = parse_ether(trimmed)
        .map_err(|e| WalletError::InvalidAmount(format!("{trimmed}: {e}")))?;
    if wei.is_zero() {
        return Err(WalletError::InvalidAmount(format!(
            "amount must be positive: {trimmed}"
        )));
    }
    Ok(wei)
}
