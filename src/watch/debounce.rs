// src/watch/debounce.rs

//! Event coalescing.
//!
//! The accumulator blocks until a first item arrives, then keeps collecting
//! while items keep arriving less than `window` apart. Every item resets
//! the wait, so a burst of writes from one editor save becomes one batch.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, trace};

/// Run the accumulator on the current thread until `rx` disconnects.
///
/// Items still buffered at disconnect are flushed before returning.
pub fn run_accumulator<T, F>(rx: Receiver<T>, window: Duration, mut flush: F)
where
    F: FnMut(Vec<T>),
{
    let mut batch: Vec<T> = Vec::new();

    loop {
        if batch.is_empty() {
            match rx.recv() {
                Ok(item) => batch.push(item),
                Err(_) => break,
            }
            continue;
        }

        match rx.recv_timeout(window) {
            Ok(item) => {
                batch.push(item);
                trace!(buffered = batch.len(), "coalescing event");
            }
            Err(RecvTimeoutError::Timeout) => {
                debug!(events = batch.len(), "debounce window elapsed; flushing batch");
                flush(std::mem::take(&mut batch));
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!(events = batch.len(), "event source closed; flushing last batch");
                flush(std::mem::take(&mut batch));
                break;
            }
        }
    }

    debug!("accumulator finished");
}

/// Start [`run_accumulator`] on a dedicated, named thread.
pub fn spawn_accumulator<T, F>(
    rx: Receiver<T>,
    window: Duration,
    flush: F,
) -> std::io::Result<JoinHandle<()>>
where
    T: Send + 'static,
    F: FnMut(Vec<T>) + Send + 'static,
{
    thread::Builder::new()
        .name("watch-debounce".to_string())
        .spawn(move || run_accumulator(rx, window, flush))
}
