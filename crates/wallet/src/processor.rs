//! Background transaction intake queue.
//!
//! Incoming raw transactions are persisted first and processed on a
//! dedicated worker afterwards, so a crash between receipt and
//! processing loses nothing. Payloads that fail to process stay queued
//! and are retried when the wallet next opens; a handler failure never
//! takes the worker down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use spvkit_log::log_warn;
use spvkit_storage::{Column, KeyValueStore, StoreError};

/// Consumer of raw transaction payloads; the sync engine plugs in here.
pub trait TransactionHandler: Send + Sync {
    fn process(&self, payload: &[u8]) -> Result<(), String>;
}

struct Job {
    seq: u64,
    payload: Vec<u8>,
}

pub struct TransactionProcessor<S> {
    store: Arc<S>,
    sender: Option<Sender<Job>>,
    handle: Option<thread::JoinHandle<()>>,
    next_seq: AtomicU64,
}

impl<S: KeyValueStore + 'static> TransactionProcessor<S> {
    /// Starts the worker, re-queueing any payloads a previous session
    /// left unprocessed.
    pub fn start(
        store: Arc<S>,
        handler: Arc<dyn TransactionHandler>,
    ) -> Result<Self, StoreError> {
        let (sender, receiver) = unbounded();

        let backlog = store.scan_prefix(Column::TxQueue, &[])?;
        let mut next_seq = 0u64;
        for (key, payload) in backlog {
            let Ok(key) = <[u8; 8]>::try_from(key.as_slice()) else {
                log_warn!("skipping transaction queue entry with malformed key");
                continue;
            };
            let seq = u64::from_be_bytes(key);
            next_seq = next_seq.max(seq + 1);
            let _ = sender.send(Job { seq, payload });
        }

        let handle = {
            let store = Arc::clone(&store);
            thread::spawn(move || process_loop(store, handler, receiver))
        };

        Ok(Self {
            store,
            sender: Some(sender),
            handle: Some(handle),
            next_seq: AtomicU64::new(next_seq),
        })
    }

    /// Persists the payload, then hands it to the worker.
    pub fn submit(&self, payload: Vec<u8>) -> Result<(), StoreError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.store
            .put(Column::TxQueue, &sequence_key(seq), &payload)?;
        if let Some(sender) = &self.sender {
            let _ = sender.send(Job { seq, payload });
        }
        Ok(())
    }

    /// Number of payloads persisted but not yet processed.
    pub fn pending(&self) -> Result<usize, StoreError> {
        Ok(self.store.scan_prefix(Column::TxQueue, &[])?.len())
    }
}

impl<S> Drop for TransactionProcessor<S> {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and
        // exit.
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn process_loop<S: KeyValueStore>(
    store: Arc<S>,
    handler: Arc<dyn TransactionHandler>,
    receiver: Receiver<Job>,
) {
    while let Ok(job) = receiver.recv() {
        match handler.process(&job.payload) {
            Ok(()) => {
                if let Err(err) = store.delete(Column::TxQueue, &sequence_key(job.seq)) {
                    log_warn!("failed to drop processed transaction {}: {err}", job.seq);
                }
            }
            Err(err) => {
                log_warn!("transaction {} failed to process: {err}", job.seq);
            }
        }
    }
}

/// Big-endian so queue scans come back in submission order.
fn sequence_key(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}
