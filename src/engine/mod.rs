//! The swap pipeline: quote → build → sign → submit → confirm.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod builder;
pub mod confirmation;
pub mod executor;
pub mod quote;
pub mod retry;
pub mod signer;

pub use builder::{SwapDirection, TransactionBuilder};
pub use confirmation::{Confirmation, ConfirmationWatcher};
pub use executor::{LegResult, SwapExecutor};
pub use quote::QuoteAdapter;
pub use retry::{with_backoff, RetryPolicy};
pub use signer::{SubmissionReceipt, WalletSigner};

/// Shared cancellation flag, checked between suspension points.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
