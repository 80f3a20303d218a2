use crate::{Address, Block, Ledger, LedgerConfig, Result, Transaction};
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Cloneable handle to one [`Ledger`] for callers on several threads.
///
/// Every operation takes the same lock, so at most one mining-and-append runs
/// against the current tip and no two blocks can share a `prev_hash`.
#[derive(Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self::from_ledger(Ledger::new(config))
    }

    pub fn from_ledger(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn add_transaction(&self, tx: Transaction) -> Result<()> {
        self.inner.lock().add_transaction(tx)
    }

    /// Mines while holding the lock; returns a copy of the appended block.
    pub fn mine_pending_transactions(&self, reward_address: &Address) -> Result<Block> {
        self.inner
            .lock()
            .mine_pending_transactions(reward_address)
            .cloned()
    }

    pub fn mine_pending_transactions_cancellable(
        &self,
        reward_address: &Address,
        cancel: &AtomicBool,
    ) -> Result<Option<Block>> {
        Ok(self
            .inner
            .lock()
            .mine_pending_transactions_cancellable(reward_address, cancel)?
            .cloned())
    }

    pub fn latest_block(&self) -> Block {
        self.inner.lock().latest_block().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn balance_of(&self, address: &Address) -> i128 {
        self.inner.lock().balance_of(address)
    }

    pub fn validate(&self) -> Result<()> {
        self.inner.lock().validate()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.lock().is_valid()
    }

    /// Runs `f` against the ledger under the lock, for reads not covered above.
    pub fn with<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.inner.lock())
    }
}
