//! Background syntax derivation.
//!
//! A [`SyntaxWorker`] is a fixed pool of threads sharing one job channel.
//! Each job carries a snapshot of a buffer's text and the generation it was
//! taken at; the result carries the same generation back so the buffer can
//! drop it if it has been edited since. Results are only ever drained by
//! the editor thread, so buffers are never touched off-thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, warn};

use crate::buffer::BufferId;
use crate::error::HostResult;
use crate::syntax::{SyntaxProvider, SyntaxSpan};

// ---------------------------------------------------------------------------
// Job / result
// ---------------------------------------------------------------------------

pub struct SyntaxJob {
    pub buffer: BufferId,
    pub generation: u64,
    pub text: String,
    pub provider: Arc<dyn SyntaxProvider>,
}

impl SyntaxJob {
    /// Derive spans on the current thread.
    #[must_use]
    pub fn run(self) -> SyntaxResult {
        let spans = self.provider.derive(&self.text);
        SyntaxResult {
            buffer: self.buffer,
            generation: self.generation,
            spans,
        }
    }
}

impl std::fmt::Debug for SyntaxJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxJob")
            .field("buffer", &self.buffer)
            .field("generation", &self.generation)
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxResult {
    pub buffer: BufferId,
    pub generation: u64,
    pub spans: Vec<SyntaxSpan>,
}

// ---------------------------------------------------------------------------
// SyntaxWorker
// ---------------------------------------------------------------------------

pub struct SyntaxWorker {
    jobs: Option<Sender<SyntaxJob>>,
    results: Receiver<SyntaxResult>,
    threads: Vec<JoinHandle<()>>,
}

impl SyntaxWorker {
    /// Start `threads` workers (at least one).
    ///
    /// # Errors
    ///
    /// `Io` if the OS refuses to spawn a thread.
    pub fn spawn(threads: usize) -> HostResult<Self> {
        let (job_tx, job_rx) = unbounded::<SyntaxJob>();
        let (result_tx, result_rx) = unbounded::<SyntaxResult>();

        let mut handles = Vec::new();
        for i in 0..threads.max(1) {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("kestrel-syntax-{i}"))
                .spawn(move || run_worker(&jobs, &results))?;
            handles.push(handle);
        }

        debug!(threads = handles.len(), "syntax worker started");
        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            threads: handles,
        })
    }

    /// Queue a job. Returns false if the pool has shut down.
    pub fn submit(&self, job: SyntaxJob) -> bool {
        match &self.jobs {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    /// Every result that has arrived so far, without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<SyntaxResult> {
        self.results.try_iter().collect()
    }

    /// Block up to `timeout` for the next result.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> Option<SyntaxResult> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }
}

impl Drop for SyntaxWorker {
    fn drop(&mut self) {
        // Closing the job channel ends every worker loop.
        self.jobs = None;
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("syntax worker thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for SyntaxWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxWorker")
            .field("threads", &self.threads.len())
            .finish_non_exhaustive()
    }
}

fn run_worker(jobs: &Receiver<SyntaxJob>, results: &Sender<SyntaxResult>) {
    while let Ok(job) = jobs.recv() {
        if results.send(job.run()).is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
