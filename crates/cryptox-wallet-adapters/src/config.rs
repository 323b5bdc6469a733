use cryptox_wallet_core::{parse_amount_wei, TransferPolicy, WalletError, WithdrawPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeProfile {
    Dev,
    Production,
}

/// Environment-driven wiring for the adapter layer.
///
/// Under the `production` profile the deterministic fallback gateway is
/// disabled: a genuinely absent provider must surface as unavailable instead
/// of silently serving canned responses.
#[derive(Debug, Clone)]
pub struct WalletAdapterConfig {
    pub runtime_profile: RuntimeProfile,
    pub eip1193_proxy_url: Option<String>,
    pub provider_timeout_ms: u64,
    pub receipt_timeout_ms: u64,
    pub receipt_poll_interval_ms: u64,
    /// Per-transfer ceiling for users without completed identity
    /// verification, in native units.
    pub unverified_withdraw_limit: String,
}

impl Default for WalletAdapterConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Dev,
            eip1193_proxy_url: None,
            provider_timeout_ms: 15_000,
            receipt_timeout_ms: 180_000,
            receipt_poll_interval_ms: 2_000,
            unverified_withdraw_limit: "1".to_owned(),
        }
    }
}

impl WalletAdapterConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(profile) = std::env::var("CRYPTOX_RUNTIME_PROFILE") {
            if profile.eq_ignore_ascii_case("production") {
                config.runtime_profile = RuntimeProfile::Production;
            }
        }
        if let Ok(url) = std::env::var("CRYPTOX_EIP1193_PROXY_URL") {
            if !url.is_empty() {
                config.eip1193_proxy_url = Some(url);
            }
        }
        config.provider_timeout_ms =
            env_ms("CRYPTOX_PROVIDER_TIMEOUT_MS", config.provider_timeout_ms);
        config.receipt_timeout_ms = env_ms("CRYPTOX_RECEIPT_TIMEOUT_MS", config.receipt_timeout_ms);
        config.receipt_poll_interval_ms = env_ms(
            "CRYPTOX_RECEIPT_POLL_INTERVAL_MS",
            config.receipt_poll_interval_ms,
        );
        if let Ok(limit) = std::env::var("CRYPTOX_UNVERIFIED_WITHDRAW_LIMIT") {
            if !limit.is_empty() {
                config.unverified_withdraw_limit = limit;
            }
        }
        config
    }

    pub fn strict_runtime_required(&self) -> bool {
        matches!(self.runtime_profile, RuntimeProfile::Production)
    }

    pub fn transfer_policy(&self) -> TransferPolicy {
        TransferPolicy {
            receipt_timeout_ms: self.receipt_timeout_ms,
            receipt_poll_interval_ms: self.receipt_poll_interval_ms,
        }
    }

    pub fn withdraw_policy(&self) -> Result<WithdrawPolicy, WalletError> {
        Ok(WithdrawPolicy {
            kyc_verified: false,
            unverified_limit_wei: parse_amount_wei(&self.unverified_withdraw_limit)?,
        })
    }
}

fn env_ms(name: &str, fallback: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(fallback)
}
