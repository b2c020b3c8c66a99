use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, TrySendError, bounded};

use crate::mesh_cache::MeshCache;

/// Background thread running `MeshCache::run_cycle` on demand.
///
/// Signals coalesce: while a cycle is pending, further `check` calls are
/// dropped, so at most one cycle runs at a time and one more waits.
pub struct MeshScheduler {
    signal: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    cycles: Arc<AtomicU64>,
}

impl MeshScheduler {
    pub fn spawn(cache: Arc<MeshCache>) -> io::Result<Self> {
        let (tx, rx) = bounded::<()>(1);
        let cycles = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&cycles);
        let worker = thread::Builder::new()
            .name("cairn-mesh".into())
            .spawn(move || {
                while rx.recv().is_ok() {
                    cache.run_cycle();
                    counter.fetch_add(1, Ordering::Relaxed);
                }
                log::debug!(target: "mesh", "scheduler stopped");
            })?;
        Ok(Self {
            signal: Some(tx),
            worker: Some(worker),
            cycles,
        })
    }

    /// Requests a cycle; returns false if one was already pending.
    pub fn check(&self) -> bool {
        match &self.signal {
            Some(tx) => match tx.try_send(()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
            },
            None => false,
        }
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Lets a pending cycle finish, then joins the thread.
    pub fn shutdown(&mut self) {
        self.signal.take();
        if let Some(h) = self.worker.take() {
            if h.join().is_err() {
                log::error!(target: "mesh", "scheduler thread panicked");
            }
        }
    }
}

impl Drop for MeshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
