use std::sync::Arc;

use alloy::primitives::Address;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::{parse_chain_ref, ChainId, Session, TimestampMs};
use crate::ports::{ClockPort, ProviderEvent, ProviderEventKind, ProviderPort, WalletError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Connected,
}

enum SessionState {
    Disconnected,
    Connecting,
    Connected(Session),
}

/// Owns the connection lifecycle: `Disconnected -> Connecting -> Connected ->
/// Disconnected`.
///
/// The sole subscriber to provider events. A chain change is absorbed by
/// eagerly refreshing the session's chain in place rather than holding a
/// separate stale state; the transfer path re-validates the network against
/// the provider regardless, so a session is never trusted for chain
/// correctness at submission time.
pub struct AccountSession<P: ProviderPort, C: ClockPort> {
    gateway: Arc<P>,
    clock: C,
    state: SessionState,
    accounts_rx: Option<UnboundedReceiver<ProviderEvent>>,
    chain_rx: Option<UnboundedReceiver<ProviderEvent>>,
}

impl<P: ProviderPort, C: ClockPort> AccountSession<P, C> {
    pub fn new(gateway: Arc<P>, clock: C) -> Self {
        Self {
            gateway,
            clock,
            state: SessionState::Disconnected,
            accounts_rx: None,
            chain_rx: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Disconnected => SessionPhase::Disconnected,
            SessionState::Connecting => SessionPhase::Connecting,
            SessionState::Connected(_) => SessionPhase::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    pub fn current_session(&self) -> Result<&Session, WalletError> {
        match &self.state {
            SessionState::Connected(session) => Ok(session),
            _ => Err(WalletError::NotConnected),
        }
    }

    /// Requests account access from the provider and establishes a session.
    /// Valid only from `Disconnected`; any failure leaves the state
    /// `Disconnected` so the user can retry with fresh intent.
    pub async fn connect(&mut self) -> Result<Session, WalletError> {
        if !matches!(self.state, SessionState::Disconnected) {
            return Err(WalletError::AlreadyConnected);
        }
        if !self.gateway.is_available() {
            return Err(WalletError::ProviderUnavailable);
        }
        self.state = SessionState::Connecting;

        let session = match self.establish().await {
            Ok(session) => session,
            Err(e) => {
                // establish() may have registered one channel before failing;
                // teardown clears any partial registration along with state.
                self.teardown();
                return Err(e);
            }
        };

        tracing::info!(address = %session.address, chain = ?session.chain, "wallet connected");
        self.state = SessionState::Connected(session.clone());
        Ok(session)
    }

    async fn establish(&mut self) -> Result<Session, WalletError> {
        let accounts = self
            .gateway
            .request("eth_requestAccounts", Value::Array(Vec::new()))
            .await?;
        let address = first_account(&accounts)?;

        let chain_raw = self
            .gateway
            .request("eth_chainId", Value::Array(Vec::new()))
            .await?;
        let chain = supported_chain(&chain_raw);

        // One authoritative registration per kind; re-subscribing after a
        // reconnect replaces any previous channel instead of duplicating it.
        self.accounts_rx = Some(self.gateway.subscribe(ProviderEventKind::AccountsChanged)?);
        self.chain_rx = Some(self.gateway.subscribe(ProviderEventKind::ChainChanged)?);

        Ok(Session {
            address,
            chain,
            connected_at: TimestampMs(self.clock.now_ms()?),
        })
    }

    /// Drains pending provider events and applies them as state transitions,
    /// in arrival order per kind. Non-blocking; call before anything that
    /// relies on session freshness.
    pub fn process_events(&mut self) -> Result<(), WalletError> {
        loop {
            let event = match self.accounts_rx.as_mut() {
                Some(rx) => rx.try_recv().ok(),
                None => None,
            };
            match event {
                Some(ProviderEvent::AccountsChanged(accounts)) => {
                    self.apply_accounts_changed(accounts)?;
                }
                Some(_) => {}
                None => break,
            }
        }
        loop {
            let event = match self.chain_rx.as_mut() {
                Some(rx) => rx.try_recv().ok(),
                None => None,
            };
            match event {
                Some(ProviderEvent::ChainChanged(raw)) => self.apply_chain_changed(&raw),
                Some(_) => {}
                None => break,
            }
        }
        Ok(())
    }

    /// Tears down the session and both event registrations. Idempotent.
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            tracing::info!("wallet disconnected");
        }
        self.teardown();
    }

    fn apply_accounts_changed(&mut self, accounts: Vec<Address>) -> Result<(), WalletError> {
        let Some(address) = accounts.first().copied() else {
            // Empty set is the provider's disconnect signal; session policy
            // says tear down, the gateway only transports.
            tracing::info!("provider reported no accounts, tearing down session");
            self.teardown();
            return Ok(());
        };
        if let SessionState::Connected(session) = &self.state {
            if session.address != address {
                // Identity changed, not disconnected: replace the session in
                // place and stay Connected.
                let replaced = Session {
                    address,
                    chain: session.chain,
                    connected_at: TimestampMs(self.clock.now_ms()?),
                };
                tracing::info!(address = %address, "provider account changed, session replaced");
                self.state = SessionState::Connected(replaced);
            }
        }
        Ok(())
    }

    fn apply_chain_changed(&mut self, raw: &str) {
        if let SessionState::Connected(session) = &mut self.state {
            let chain = parse_chain_ref(raw).ok().and_then(ChainId::from_chain_ref);
            tracing::debug!(raw, chain = ?chain, "provider chain changed, session refreshed");
            session.chain = chain;
        }
    }

    fn teardown(&mut self) {
        let _ = self.gateway.unsubscribe(ProviderEventKind::AccountsChanged);
        let _ = self.gateway.unsubscribe(ProviderEventKind::ChainChanged);
        self.accounts_rx = None;
        self.chain_rx = None;
        self.state = SessionState::Disconnected;
    }
}

fn first_account(value: &Value) -> Result<Address, WalletError> {
    let arr = value
        .as_array()
        .ok_or_else(|| WalletError::transport("eth_requestAccounts: array expected"))?;
    let Some(first) = arr.first() else {
        // The prompt resolved without authorizing anything; treat like a
        // decline rather than inventing a half-connected state.
        return Err(WalletError::UserRejected);
    };
    let raw = first
        .as_str()
        .ok_or_else(|| WalletError::transport("eth_requestAccounts: string expected"))?;
    raw.parse()
        .map_err(|e| WalletError::transport(format!("invalid account address {raw}: {e}")))
}

fn supported_chain(value: &Value) -> Option<ChainId> {
    let chain_ref = match value.as_u64() {
        Some(n) => n,
        None => parse_chain_ref(value.as_str()?).ok()?,
    };
    ChainId::from_chain_ref(chain_ref)
}
