//! Connection state machine of the Wallet Standard adapter

use crate::adapter::AdapterEvent;
use crate::sdk_adapter::Pubkey;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Pubkey),
}

impl ConnectionState {
    pub fn public_key(&self) -> Option<Pubkey> {
        match self {
            Self::Connected(pubkey) => Some(*pubkey),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateInput {
    ConnectStarted,
    ConnectSucceeded(Pubkey),
    ConnectFailed,
    /// The wallet reported a new account list; `None` when none is usable
    AccountChanged(Option<Pubkey>),
    DisconnectRequested,
}

/// Next state and the notifications the step produces.
///
/// Inputs that do not apply to the current state leave it unchanged and
/// produce nothing.
pub fn transition(
    state: ConnectionState,
    input: StateInput,
) -> (ConnectionState, Vec<AdapterEvent>) {
    use ConnectionState::*;

    match (state, input) {
        (Disconnected, StateInput::ConnectStarted) => (Connecting, vec![]),
        (Connecting, StateInput::ConnectSucceeded(pubkey)) => {
            (Connected(pubkey), vec![AdapterEvent::Connect(pubkey)])
        }
        (Connecting, StateInput::ConnectFailed) => (Disconnected, vec![]),
        (Connecting, StateInput::DisconnectRequested) => (Disconnected, vec![]),
        (Connected(current), StateInput::AccountChanged(Some(next))) if current != next => {
            (Connected(next), vec![AdapterEvent::Connect(next)])
        }
        (Connected(_), StateInput::AccountChanged(None))
        | (Connected(_), StateInput::DisconnectRequested) => {
            (Disconnected, vec![AdapterEvent::Disconnect])
        }
        (state, _) => (state, vec![]),
    }
}
