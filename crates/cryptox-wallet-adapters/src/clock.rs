use std::time::{SystemTime, UNIX_EPOCH};

use cryptox_wallet_core::{ClockPort, WalletError};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ms(&self) -> Result<u64, WalletError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| WalletError::transport(format!("system clock before epoch: {e}")))?;
        Ok(elapsed.as_millis() as u64)
    }
}
