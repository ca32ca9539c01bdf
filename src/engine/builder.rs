//! Router swap transactions for the three supported directions.
//!
//! Payloads use a compact length-prefixed binary layout: a 32-bit op code,
//! then the op's fields, with nested bodies written as a length-prefixed
//! child. Amounts are written as a length byte followed by minimal big-endian
//! bytes.

use crate::chain::ChainRpc;
use crate::datasource::Referral;
use crate::domain::{Address, AssetKind, RouterDescriptor, SwapQuote, TransactionDescriptor, Units};
use crate::error::SwapError;
use std::sync::Arc;
use tracing::debug;

pub const JETTON_TRANSFER_OP: u32 = 0x0f8a_7ea5;
pub const SWAP_OP: u32 = 0x6664_de2a;
pub const PTON_TRANSFER_OP: u32 = 0x01f3_835d;

/// Native value attached to token-offer swaps to pay for the router chain.
pub const SWAP_GAS: Units = Units(300_000_000);
/// Part of [`SWAP_GAS`] forwarded with the token transfer notification.
pub const FORWARD_GAS: Units = Units(240_000_000);
/// Gas added on top of the offer amount for native-offer swaps.
pub const NATIVE_SWAP_FORWARD_GAS: Units = Units(300_000_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    NativeToToken,
    TokenToNative,
    TokenToToken,
}

impl SwapDirection {
    pub fn classify(offer: AssetKind, ask: AssetKind) -> Result<Self, SwapError> {
        match (offer, ask) {
            (AssetKind::Native, AssetKind::Native) => Err(SwapError::UnsupportedPair(
                "native to native swap is not supported".to_string(),
            )),
            (AssetKind::Native, AssetKind::Token) => Ok(SwapDirection::NativeToToken),
            (AssetKind::Token, AssetKind::Native) => Ok(SwapDirection::TokenToNative),
            (AssetKind::Token, AssetKind::Token) => Ok(SwapDirection::TokenToToken),
        }
    }
}

struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    fn new(op: u32) -> Self {
        Self {
            buf: op.to_be_bytes().to_vec(),
        }
    }

    fn query_id(mut self, id: u64) -> Self {
        self.buf.extend_from_slice(&id.to_be_bytes());
        self
    }

    fn coins(mut self, amount: Units) -> Self {
        let bytes = amount.0.to_be_bytes();
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        self.buf.push((bytes.len() - start) as u8);
        self.buf.extend_from_slice(&bytes[start..]);
        self
    }

    fn address(mut self, address: &Address) -> Self {
        let raw = address.as_str().as_bytes();
        self.buf.extend_from_slice(&(raw.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(raw);
        self
    }

    fn referral(mut self, referral: Option<&Referral>) -> Self {
        match referral {
            Some(r) => {
                self.buf.push(1);
                self = self.address(&r.address);
                self.buf.extend_from_slice(&r.fee_bps.to_be_bytes());
            }
            None => self.buf.push(0),
        }
        self
    }

    fn child(mut self, body: Vec<u8>) -> Self {
        self.buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(&body);
        self
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Builds unsigned swap transactions from quotes.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    chain: Arc<dyn ChainRpc>,
    referral: Option<Referral>,
}

impl TransactionBuilder {
    pub fn new(chain: Arc<dyn ChainRpc>, referral: Option<Referral>) -> Self {
        Self { chain, referral }
    }

    /// Consume `quote` and produce the transaction `sender` must sign.
    ///
    /// The only I/O is resolving token wallet addresses through the chain RPC.
    pub async fn build_transaction(
        &self,
        quote: SwapQuote,
        sender: &Address,
    ) -> Result<TransactionDescriptor, SwapError> {
        let direction = SwapDirection::classify(quote.offer.kind, quote.ask.kind)?;
        let router = &quote.router;

        let tx = match direction {
            SwapDirection::NativeToToken => {
                let proxy_wallet = self.router_proxy_wallet(router).await?;
                let ask_wallet = self
                    .chain
                    .jetton_wallet_address(&quote.ask.contract_address, &router.address)
                    .await?;
                let swap = self.swap_body(&ask_wallet, sender, quote.min_ask_units);
                let payload = PayloadWriter::new(PTON_TRANSFER_OP)
                    .query_id(0)
                    .coins(quote.offer_units)
                    .address(sender)
                    .child(swap)
                    .finish();
                let native_value = quote
                    .offer_units
                    .checked_add(NATIVE_SWAP_FORWARD_GAS)
                    .ok_or_else(|| {
                        SwapError::ValidationError("Offer amount too large".to_string())
                    })?;

                TransactionDescriptor {
                    destination: proxy_wallet,
                    native_value,
                    payload,
                }
            }
            SwapDirection::TokenToNative | SwapDirection::TokenToToken => {
                let offer_wallet = self
                    .chain
                    .jetton_wallet_address(&quote.offer.contract_address, sender)
                    .await?;
                let ask_wallet = if direction == SwapDirection::TokenToNative {
                    self.router_proxy_wallet(router).await?
                } else {
                    self.chain
                        .jetton_wallet_address(&quote.ask.contract_address, &router.address)
                        .await?
                };
                let swap = self.swap_body(&ask_wallet, sender, quote.min_ask_units);
                let payload = PayloadWriter::new(JETTON_TRANSFER_OP)
                    .query_id(0)
                    .coins(quote.offer_units)
                    .address(&router.address)
                    .address(sender)
                    .coins(FORWARD_GAS)
                    .child(swap)
                    .finish();

                TransactionDescriptor {
                    destination: offer_wallet,
                    native_value: SWAP_GAS,
                    payload,
                }
            }
        };

        debug!(
            "Built {:?} swap {} → {} to {} (value {})",
            direction,
            quote.offer.label(),
            quote.ask.label(),
            tx.destination,
            tx.native_value
        );
        Ok(tx)
    }

    fn swap_body(&self, ask_wallet: &Address, sender: &Address, min_out: Units) -> Vec<u8> {
        PayloadWriter::new(SWAP_OP)
            .address(ask_wallet)
            .address(sender)
            .coins(min_out)
            .address(sender)
            .referral(self.referral.as_ref())
            .finish()
    }

    /// Router-owned wallet of the native-asset proxy token.
    async fn router_proxy_wallet(&self, router: &RouterDescriptor) -> Result<Address, SwapError> {
        if let Some(wallet) = &router.pton_wallet_address {
            return Ok(wallet.clone());
        }
        let master = router.pton_master_address.as_ref().ok_or_else(|| {
            SwapError::QuoteUnavailable(format!(
                "Router {} has no native proxy contract",
                router.address
            ))
        })?;
        Ok(self
            .chain
            .jetton_wallet_address(master, &router.address)
            .await?)
    }
}
