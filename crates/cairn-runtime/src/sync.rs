use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use cairn_geom::BlockPos;
use cairn_store::RemoteSync;
use cairn_world::WorldCache;
use crossbeam_channel::{Sender, unbounded};

struct Push {
    pos: BlockPos,
    block: String,
}

/// Forwards local edits to the remote off the main thread, in edit order.
///
/// Acks advance the chunk version; failures drop the pending mark so the next
/// fetch of that chunk can take the remote's state.
pub struct PushQueue {
    tx: Option<Sender<Push>>,
    worker: Option<JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
}

impl PushQueue {
    pub fn spawn(world: Arc<WorldCache>, remote: Arc<dyn RemoteSync>) -> io::Result<Self> {
        let (tx, rx) = unbounded::<Push>();
        let pending = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::clone(&pending);
        let worker = thread::Builder::new()
            .name("cairn-push".into())
            .spawn(move || {
                for job in rx.iter() {
                    let id = job.pos.chunk();
                    match remote.push_block_update(id, job.pos, &job.block) {
                        Ok(version) => {
                            if let Err(e) = world.ack_push(job.pos, version) {
                                log::warn!(target: "sync", "ack for {} failed: {e}", job.pos);
                            }
                        }
                        Err(e) => {
                            log::warn!(target: "sync", "push of {} to {id} failed: {e}", job.pos);
                            world.abandon_push(job.pos);
                        }
                    }
                    in_flight.fetch_sub(1, Ordering::AcqRel);
                }
            })?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            pending,
        })
    }

    pub fn enqueue(&self, pos: BlockPos, block: &str) {
        let Some(tx) = &self.tx else { return };
        self.pending.fetch_add(1, Ordering::AcqRel);
        if tx
            .send(Push {
                pos,
                block: block.to_string(),
            })
            .is_err()
        {
            self.pending.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Pushes queued or in flight.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Drains the queue, then joins the worker.
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(h) = self.worker.take() {
            if h.join().is_err() {
                log::error!(target: "sync", "push thread panicked");
            }
        }
    }
}

impl Drop for PushQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
