//! Fault injection for record stores.

use casha_model::{Domain, LocalId, Record};
use casha_store::{RecordStore, StoreError, StoreResult, Swap};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A hook run before a compare-and-swap, given the slot being written.
pub type SwapHook = Box<dyn Fn(LocalId) + Send + Sync>;

struct ArmedHook {
    hook: SwapHook,
    once: bool,
}

/// A record store wrapper that fails on demand.
///
/// Useful for checking that a store failure ends a sync run cleanly.
pub struct FaultyStore {
    inner: Arc<dyn RecordStore>,
    fail_reads: AtomicBool,
    writes_left: AtomicUsize,
    writes: AtomicUsize,
    swap_hook: Mutex<Option<ArmedHook>>,
}

impl FaultyStore {
    /// Wraps a store. No faults are armed.
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            writes_left: AtomicUsize::new(usize::MAX),
            writes: AtomicUsize::new(0),
            swap_hook: Mutex::new(None),
        }
    }

    /// Makes every read fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Lets `n` more writes succeed, then fails every write.
    pub fn fail_writes_after(&self, n: usize) {
        self.writes_left.store(n, Ordering::SeqCst);
    }

    /// Disarms every fault.
    pub fn heal(&self) {
        self.fail_reads(false);
        self.writes_left.store(usize::MAX, Ordering::SeqCst);
    }

    /// Returns how many writes were attempted.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Runs `hook` before the next compare-and-swap, to interleave a
    /// concurrent mutation with a write-back.
    pub fn on_compare_and_swap(&self, hook: impl Fn(LocalId) + Send + Sync + 'static) {
        self.arm(Box::new(hook), true);
    }

    /// Runs `hook` before every compare-and-swap until another hook is
    /// armed.
    ///
    /// The hook must not call back into this store.
    pub fn on_every_compare_and_swap(&self, hook: impl Fn(LocalId) + Send + Sync + 'static) {
        self.arm(Box::new(hook), false);
    }

    fn arm(&self, hook: SwapHook, once: bool) {
        *self.swap_hook.lock() = Some(ArmedHook { hook, once });
    }

    fn run_swap_hook(&self, local_id: LocalId) {
        let mut slot = self.swap_hook.lock();
        let once = match slot.as_ref() {
            Some(armed) => {
                (armed.hook)(local_id);
                armed.once
            }
            None => false,
        };
        if once {
            *slot = None;
        }
    }

    fn read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::backend("injected read failure"));
        }
        Ok(())
    }

    fn write(&self) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let allowed = self
            .writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(StoreError::backend("injected write failure"));
        }
        Ok(())
    }
}

impl RecordStore for FaultyStore {
    fn list_dirty(&self, domain: Domain) -> StoreResult<Vec<Record>> {
        self.read()?;
        self.inner.list_dirty(domain)
    }

    fn list_all(&self, domain: Domain) -> StoreResult<Vec<Record>> {
        self.read()?;
        self.inner.list_all(domain)
    }

    fn get(&self, local_id: LocalId) -> StoreResult<Option<Record>> {
        self.read()?;
        self.inner.get(local_id)
    }

    fn upsert(&self, record: Record) -> StoreResult<()> {
        self.write()?;
        self.inner.upsert(record)
    }

    fn delete(&self, local_id: LocalId) -> StoreResult<bool> {
        self.write()?;
        self.inner.delete(local_id)
    }

    fn compare_and_swap(
        &self,
        local_id: LocalId,
        expected: Option<&Record>,
        replacement: Option<Record>,
    ) -> StoreResult<Swap> {
        self.run_swap_hook(local_id);
        self.write()?;
        self.inner.compare_and_swap(local_id, expected, replacement)
    }
}
