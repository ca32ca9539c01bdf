//! Signed external messages carrying one outbound transfer.
//!
//! The wire form is a base64-encoded JSON envelope; the signature covers a
//! SHA-256 digest of a fixed binary layout of every field except itself.

use super::ChainError;
use crate::domain::{Address, TransactionDescriptor, Units};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Sender pays forward fees separately from the attached value.
pub const SEND_MODE_PAY_GAS_SEPARATELY: u8 = 1;

/// Seconds a signed message stays valid.
pub const MESSAGE_TTL_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub destination: Address,
    pub value: Units,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Unsigned external message addressed to the sender's wallet contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalMessage {
    pub wallet: Address,
    pub public_key: String,
    pub seqno: u64,
    pub valid_until: i64,
    pub send_mode: u8,
    pub messages: Vec<OutboundMessage>,
}

impl ExternalMessage {
    pub fn new(
        wallet: Address,
        public_key: &VerifyingKey,
        seqno: u64,
        valid_until: i64,
        tx: TransactionDescriptor,
    ) -> Self {
        let payload = tx.payload_base64();
        Self {
            wallet,
            public_key: hex::encode(public_key.as_bytes()),
            seqno,
            valid_until,
            send_mode: SEND_MODE_PAY_GAS_SEPARATELY,
            messages: vec![OutboundMessage {
                destination: tx.destination,
                value: tx.native_value,
                payload,
            }],
        }
    }

    fn signing_digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        put_str(&mut hasher, self.wallet.as_str());
        put_str(&mut hasher, &self.public_key);
        hasher.update(self.seqno.to_be_bytes());
        hasher.update(self.valid_until.to_be_bytes());
        hasher.update([self.send_mode]);
        hasher.update((self.messages.len() as u32).to_be_bytes());
        for msg in &self.messages {
            put_str(&mut hasher, msg.destination.as_str());
            hasher.update(msg.value.0.to_be_bytes());
            put_str(&mut hasher, msg.payload.as_deref().unwrap_or(""));
        }
        hasher.finalize().into()
    }

    pub fn sign(self, key: &SigningKey) -> SignedMessage {
        let signature = key.sign(&self.signing_digest());
        SignedMessage {
            body: self,
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

fn put_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u32).to_be_bytes());
    hasher.update(value.as_bytes());
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedMessage {
    #[serde(flatten)]
    pub body: ExternalMessage,
    pub signature: String,
}

impl SignedMessage {
    /// Serialized form handed to the RPC.
    pub fn to_wire(&self) -> Result<String, ChainError> {
        let json = serde_json::to_vec(self).map_err(|e| ChainError::Encoding(e.to_string()))?;
        Ok(BASE64.encode(json))
    }

    /// Hex SHA-256 of the wire bytes, used to track the message.
    pub fn hash(&self) -> Result<String, ChainError> {
        let wire = self.to_wire()?;
        Ok(hex::encode(Sha256::digest(wire.as_bytes())))
    }

    /// Check the signature against the embedded public key.
    pub fn verify(&self) -> bool {
        let Ok(key_bytes) = hex::decode(&self.body.public_key) else {
            return false;
        };
        let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(&self.signature) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&sig_bytes) else {
            return false;
        };
        key.verify(&self.body.signing_digest(), &signature).is_ok()
    }
}
