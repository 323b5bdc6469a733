use alloy::primitives::{Address, U256};
use serde_json::Value;

use cryptox_wallet_adapters::{Eip1193Gateway, RuntimeProfile, WalletAdapterConfig};
use cryptox_wallet_core::{ProviderEvent, ProviderEventKind, ProviderPort, WalletError};

fn other_account() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid account")
}

#[tokio::test]
async fn deterministic_gateway_serves_accounts_and_chain() {
    let gateway = Eip1193Gateway::deterministic();
    assert!(gateway.is_available());

    let accounts = gateway
        .request("eth_requestAccounts", Value::Array(Vec::new()))
        .await
        .expect("accounts");
    assert_eq!(accounts.as_array().expect("array").len(), 1);

    let chain = gateway
        .request("eth_chainId", Value::Array(Vec::new()))
        .await
        .expect("chain");
    assert_eq!(chain, "0x1");
}

#[tokio::test]
async fn switch_updates_chain_and_notifies_subscriber() {
    let gateway = Eip1193Gateway::deterministic();
    let mut rx = gateway
        .subscribe(ProviderEventKind::ChainChanged)
        .expect("subscribe");

    gateway
        .request(
            "wallet_switchEthereumChain",
            serde_json::json!([{ "chainId": "0x89" }]),
        )
        .await
        .expect("switch");

    let chain = gateway
        .request("eth_chainId", Value::Array(Vec::new()))
        .await
        .expect("chain");
    assert_eq!(chain, "0x89");
    assert_eq!(
        rx.try_recv().expect("event"),
        ProviderEvent::ChainChanged("0x89".to_owned())
    );
}

#[tokio::test]
async fn resubscribe_replaces_the_previous_consumer() {
    let gateway = Eip1193Gateway::deterministic();
    let mut first = gateway
        .subscribe(ProviderEventKind::AccountsChanged)
        .expect("subscribe");
    let mut second = gateway
        .subscribe(ProviderEventKind::AccountsChanged)
        .expect("resubscribe");

    gateway
        .debug_inject_accounts_changed(vec![other_account()])
        .expect("inject");

    assert!(first.try_recv().is_err(), "replaced consumer sees no event");
    assert_eq!(
        second.try_recv().expect("event"),
        ProviderEvent::AccountsChanged(vec![other_account()])
    );
}

#[tokio::test]
async fn estimation_rejects_unfunded_sender() {
    let gateway = Eip1193Gateway::deterministic();
    let broke = other_account();
    gateway.debug_set_balance(broke, U256::ZERO).expect("seed");

    let err = gateway
        .request(
            "eth_estimateGas",
            serde_json::json!([{
                "from": broke.to_string(),
                "to": "0x000000000000000000000000000000000000cafe",
                "value": "0xde0b6b3a7640000",
            }]),
        )
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        WalletError::Provider {
            code: -32000,
            message: "insufficient funds for gas * price + value".to_owned()
        }
    );
}

#[tokio::test]
async fn scripted_failure_applies_to_next_request_only() {
    let gateway = Eip1193Gateway::deterministic();
    gateway
        .debug_fail_next(4001, "User rejected the request.")
        .expect("script");

    let err = gateway
        .request("eth_requestAccounts", Value::Array(Vec::new()))
        .await
        .expect_err("must fail");
    assert_eq!(err, WalletError::UserRejected);

    gateway
        .request("eth_requestAccounts", Value::Array(Vec::new()))
        .await
        .expect("next request is back to normal");
}

#[tokio::test]
async fn unknown_method_reports_method_not_found() {
    let gateway = Eip1193Gateway::deterministic();
    let err = gateway
        .request("eth_signTypedData_v4", Value::Array(Vec::new()))
        .await
        .expect_err("must fail");
    assert!(matches!(err, WalletError::Provider { code: -32601, .. }));
}

#[tokio::test]
async fn production_profile_without_proxy_is_unavailable() {
    let config = WalletAdapterConfig {
        runtime_profile: RuntimeProfile::Production,
        ..WalletAdapterConfig::default()
    };
    let gateway = Eip1193Gateway::with_config(config);

    assert!(!gateway.is_available());
    let err = gateway
        .request("eth_requestAccounts", Value::Array(Vec::new()))
        .await
        .expect_err("must fail");
    assert_eq!(err, WalletError::ProviderUnavailable);
}

#[test]
fn config_defaults_map_onto_policies() {
    let config = WalletAdapterConfig::default();
    assert_eq!(config.runtime_profile, RuntimeProfile::Dev);
    assert!(!config.strict_runtime_required());

    let transfer = config.transfer_policy();
    assert_eq!(transfer.receipt_timeout_ms, 180_000);
    assert_eq!(transfer.receipt_poll_interval_ms, 2_000);

    let withdraw = config.withdraw_policy().expect("policy");
    assert!(!withdraw.kyc_verified);
    assert_eq!(
        withdraw.unverified_limit_wei,
        U256::from(10u64).pow(U256::from(18u64))
    );
}
