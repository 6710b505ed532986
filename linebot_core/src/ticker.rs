//! Thread-backed periodic tick source.
//!
//! Each subscription gets its own thread that calls the sink on a fixed
//! deadline grid. Threads are shut down and joined when the `ThreadTicker`
//! is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use linebot_traits::clock::Clock;
use linebot_traits::{HwResult, TickSource};

pub struct ThreadTicker<C: Clock + Clone + Send + 'static> {
    clock: C,
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl<C: Clock + Clone + Send + 'static> ThreadTicker<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    /// Number of running tick threads.
    pub fn subscriptions(&self) -> usize {
        self.handles.len()
    }
}

impl<C: Clock + Clone + Send + 'static> TickSource for ThreadTicker<C> {
    fn subscribe(&mut self, period: Duration, mut sink: Box<dyn FnMut() + Send>) -> HwResult<()> {
        if period.is_zero() {
            return Err("tick period must be > 0".into());
        }
        let clock = self.clock.clone();
        let shutdown = self.shutdown.clone();

        let handle = std::thread::Builder::new()
            .name(format!("tick-{}us", period.as_micros()))
            .spawn(move || {
                let mut next = clock.now() + period;
                loop {
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    let now = clock.now();
                    if next > now {
                        clock.sleep(next - now);
                    } else if now - next > period {
                        // Fell more than a period behind; resync instead of bursting.
                        tracing::trace!(behind = ?(now - next), "tick thread resync");
                        next = now;
                    }
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    sink();
                    next += period;
                }
                tracing::trace!("tick thread exiting cleanly");
            })?;

        self.handles.push(handle);
        Ok(())
    }
}

impl<C: Clock + Clone + Send + 'static> Drop for ThreadTicker<C> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "tick thread panicked during shutdown");
            }
        }
    }
}
