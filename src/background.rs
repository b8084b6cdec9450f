//! Runs long steps off the calling thread.
//!
//! The caller blocks on a single completion message while the worker thread
//! does the work, logging a progress line at a fixed interval. A runner
//! accepts one job at a time; starting a second job while the first is in
//! flight fails instead of queueing.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};

const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct JobRunner {
    busy: Arc<AtomicBool>,
    progress_interval: Duration,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl JobRunner {
    pub fn new(progress_interval: Duration) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            progress_interval,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn run<T, F>(&self, label: &str, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            bail!("Cannot start '{label}' while another job is running");
        }
        let _guard = BusyGuard(Arc::clone(&self.busy));

        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("job: {label}"))
            .spawn(move || {
                let _ = sender.send(job());
            })
            .with_context(|| format!("Spawning worker for '{label}'"))?;

        let started = Instant::now();
        let outcome = loop {
            match receiver.recv_timeout(self.progress_interval) {
                Ok(outcome) => break outcome,
                Err(RecvTimeoutError::Timeout) => {
                    info!("{label}... ({}s)", started.elapsed().as_secs());
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let _ = handle.join();
                    return Err(anyhow!("'{label}' stopped without reporting a result"));
                }
            }
        };
        let _ = handle.join();
        debug!("'{label}' finished in {:?}", started.elapsed());
        outcome
    }
}
