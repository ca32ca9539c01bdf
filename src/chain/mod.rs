//! Chain RPC abstraction: sequence numbers, message submission, and token
//! wallet address resolution.

use crate::domain::Address;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod message;
pub mod mock;
pub mod toncenter;

pub use message::{ExternalMessage, OutboundMessage, SignedMessage};
pub use mock::MockChainRpc;
pub use toncenter::TonCenterRpc;

/// Chain RPC endpoint the signer, builder, and confirmation watcher depend on.
#[async_trait]
pub trait ChainRpc: Send + Sync + fmt::Debug {
    /// Current sequence number of `account` (0 for an undeployed wallet).
    async fn get_sequence_number(&self, account: &Address) -> Result<u64, ChainError>;

    /// Broadcast a signed external message. Never retried on unknown outcome.
    async fn submit(&self, message: &SignedMessage) -> Result<SubmitAck, ChainError>;

    /// Address of `owner`'s token wallet for the token minted by `minter`.
    async fn jetton_wallet_address(
        &self,
        minter: &Address,
        owner: &Address,
    ) -> Result<Address, ChainError>;
}

/// Acknowledgement returned by the RPC after accepting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAck {
    pub message_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Rate limited")]
    RateLimited,
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Message rejected: {0}")]
    Rejected(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_error_display() {
        assert_eq!(ChainError::RateLimited.to_string(), "Rate limited");
        assert_eq!(
            ChainError::Http {
                status: 500,
                message: "boom".into()
            }
            .to_string(),
            "HTTP error 500: boom"
        );
    }
}
