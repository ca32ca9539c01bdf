use super::{Address, Units};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// Unsigned transfer produced from a quote; consumed once by the signer.
#[derive(Debug, PartialEq, Eq)]
pub struct TransactionDescriptor {
    pub destination: Address,
    /// Native amount attached to the message (offer amount and/or gas).
    pub native_value: Units,
    /// Opaque message body for the destination contract.
    pub payload: Vec<u8>,
}

impl TransactionDescriptor {
    pub fn payload_base64(&self) -> Option<String> {
        if self.payload.is_empty() {
            None
        } else {
            Some(BASE64.encode(&self.payload))
        }
    }

    /// Message entry for an external wallet-connection provider.
    pub fn to_wallet_message(&self) -> WalletMessage {
        WalletMessage {
            address: self.destination.clone(),
            amount: self.native_value,
            payload: self.payload_base64(),
        }
    }
}

/// One message in a wallet-connection `sendTransaction` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMessage {
    pub address: Address,
    pub amount: Units,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Request handed to an external wallet for the user-confirmed swap path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConnectRequest {
    /// Unix seconds after which the wallet must refuse to sign.
    pub valid_until: i64,
    pub messages: Vec<WalletMessage>,
}

impl WalletConnectRequest {
    pub fn single(tx: &TransactionDescriptor, valid_until: i64) -> Self {
        Self {
            valid_until,
            messages: vec![tx.to_wallet_message()],
        }
    }
}
