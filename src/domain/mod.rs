//! Domain types for the swap service.
//!
//! This module provides:
//! - Lossless decimal amounts and fixed-point integer units
//! - Primitives: Address, AssetKind, LiquidityTag, Side
//! - Assets, quotes with slippage bounds, transaction descriptors
//! - Event log entries and the append-only event log

pub mod asset;
pub mod decimal;
pub mod log;
pub mod primitives;
pub mod quote;
pub mod transaction;
pub mod units;

pub use asset::Asset;
pub use decimal::Decimal;
pub use log::{EventLog, LogEntry, Severity, DEFAULT_EVENT_LOG_CAPACITY};
pub use primitives::{Address, AddressParseError, AssetKind, LiquidityTag, Side};
pub use quote::{RouterDescriptor, SlippageError, SlippageTolerance, SwapQuote};
pub use transaction::{TransactionDescriptor, WalletConnectRequest, WalletMessage};
pub use units::{format_units, from_units, to_units, Units, UnitsError};
