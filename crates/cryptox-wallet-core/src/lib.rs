pub mod domain;
pub mod network;
pub mod ports;
pub mod service;
pub mod session;
pub mod transfer;

pub use domain::{
    parse_amount_wei, parse_chain_ref, parse_recipient, BalanceAdjustment, ChainId, GasPlan,
    Session, SettlementStatus, TimestampMs, TransactionKind, TransactionRecord, TransferOutcome,
    TransferReceipt, TransferRequest,
};
pub use network::NetworkGuard;
pub use ports::{
    ClockPort, LedgerPort, PricePort, ProviderEvent, ProviderEventKind, ProviderPort, WalletError,
};
pub use service::{WalletService, WithdrawPolicy};
pub use session::{AccountSession, SessionPhase};
pub use transfer::{TransferExecutor, TransferPolicy};
