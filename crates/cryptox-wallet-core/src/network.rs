use std::sync::Arc;

use serde_json::Value;

use crate::domain::{parse_chain_ref, ChainId};
use crate::ports::{
    ProviderPort, WalletError, CODE_METHOD_NOT_FOUND, CODE_UNRECOGNIZED_CHAIN,
};

/// Validates and repairs the provider's active chain.
///
/// Value-moving callers run this before every submission; a successful
/// `switch_to` is deliberately not re-verified here, since the provider may
/// apply the switch asynchronously and will fire its own `chainChanged`
/// event. Callers re-query `current_chain` when they need certainty.
pub struct NetworkGuard<P: ProviderPort> {
    gateway: Arc<P>,
}

impl<P: ProviderPort> NetworkGuard<P> {
    pub fn new(gateway: Arc<P>) -> Self {
        Self { gateway }
    }

    pub async fn current_chain(&self) -> Result<ChainId, WalletError> {
        let raw = self
            .gateway
            .request("eth_chainId", Value::Array(Vec::new()))
            .await?;
        let chain_ref = chain_ref_from_value(&raw)?;
        ChainId::from_chain_ref(chain_ref).ok_or(WalletError::UnknownChain {
            raw: format!("0x{chain_ref:x}"),
        })
    }

    pub async fn matches(&self, desired: ChainId) -> Result<bool, WalletError> {
        Ok(self.current_chain().await? == desired)
    }

    pub async fn switch_to(&self, desired: ChainId) -> Result<(), WalletError> {
        let params = serde_json::json!([{ "chainId": desired.hex_id() }]);
        match self
            .gateway
            .request("wallet_switchEthereumChain", params)
            .await
        {
            Ok(_) => {
                tracing::info!(network = %desired, "network switch requested");
                Ok(())
            }
            Err(WalletError::UserRejected) => Err(WalletError::SwitchRejected),
            Err(WalletError::Provider { code, .. })
                if code == CODE_METHOD_NOT_FOUND || code == CODE_UNRECOGNIZED_CHAIN =>
            {
                Err(WalletError::SwitchUnsupported)
            }
            Err(other) => Err(other),
        }
    }
}

fn chain_ref_from_value(value: &Value) -> Result<u64, WalletError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let raw = value.as_str().ok_or_else(|| WalletError::UnknownChain {
        raw: value.to_string(),
    })?;
    parse_chain_ref(raw)
}
