//! CryptoX wallet bridge: connect, verify the network, withdraw.
//!
//! Usage: cryptox-wallet <recipient> <amount> [network]
//!
//! Talks to a real provider when `CRYPTOX_EIP1193_PROXY_URL` is set,
//! otherwise drives the deterministic in-memory gateway.

use std::sync::Arc;

use eyre::{bail, eyre, WrapErr};

use cryptox_wallet_adapters::{
    Eip1193Gateway, FixedPriceOracle, InMemoryLedger, SystemClock, WalletAdapterConfig,
};
use cryptox_wallet_core::{ChainId, WalletError, WalletService};

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let recipient = args
        .next()
        .ok_or_else(|| eyre!("usage: cryptox-wallet <recipient> <amount> [network]"))?;
    let amount = args
        .next()
        .ok_or_else(|| eyre!("usage: cryptox-wallet <recipient> <amount> [network]"))?;
    let network = match args.next().as_deref() {
        None | Some("ethereum") => ChainId::Ethereum,
        Some("bsc") => ChainId::Bsc,
        Some("polygon") => ChainId::Polygon,
        Some(other) => bail!("unsupported network {other}; expected ethereum, bsc or polygon"),
    };

    let config = WalletAdapterConfig::from_env();
    let gateway = Arc::new(Eip1193Gateway::with_config(config.clone()));
    let ledger = InMemoryLedger::new();
    let mut service = WalletService::new(
        Arc::clone(&gateway),
        SystemClock,
        ledger.clone(),
        FixedPriceOracle::new(),
        config.transfer_policy(),
    )
    .with_withdraw_policy(config.withdraw_policy()?);
    // The CLI has no KYC flow; treat the operator as verified.
    service.set_kyc_verified(true);

    let session = service.connect().await.wrap_err("wallet connection failed")?;
    println!("connected: {} on {:?}", session.address, session.chain);

    let balance = service.get_balance(session.address).await?;
    println!("balance: {balance} native units");

    if session.chain != Some(network) {
        println!("switching provider to {network}");
        service.switch_to(network).await?;
        service.process_events()?;
        let active = service.current_chain().await?;
        if active != network {
            bail!("provider stayed on {active} after switch request");
        }
    }

    match service.submit_transfer(&recipient, &amount, network).await {
        Ok(receipt) => {
            println!(
                "transfer {}: {:?}",
                receipt.transaction_hash, receipt.outcome
            );
        }
        Err(WalletError::WrongNetwork { active, desired }) => {
            bail!("provider moved to {active} mid-flow; {desired} required, not retrying")
        }
        Err(e) => return Err(e).wrap_err("withdrawal failed"),
    }

    for record in ledger.transactions()? {
        println!(
            "ledger: {:?} {} {} ({}) {:?}",
            record.kind, record.amount, record.currency, record.value_estimate, record.status
        );
    }

    service.disconnect();
    Ok(())
}
