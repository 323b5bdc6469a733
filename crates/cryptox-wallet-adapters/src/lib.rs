pub mod clock;
pub mod config;
pub mod eip1193;
pub mod ledger;

pub use clock::SystemClock;
pub use config::{RuntimeProfile, WalletAdapterConfig};
pub use eip1193::Eip1193Gateway;
pub use ledger::{FixedPriceOracle, InMemoryLedger};
