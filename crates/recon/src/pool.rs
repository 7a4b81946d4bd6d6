use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::ReconConfig;
use crate::engine::reconcile_with;
use crate::error::ReconError;
use crate::model::ReconciliationReport;
use crate::source::{Document, Extractor, LedgerReader};

/// Cooperative cancellation shared by every clone.
///
/// Checked before extraction and after each section; a cancelled run yields
/// [`ReconError::Cancelled`] and no report.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn checkpoint(&self) -> Result<(), ReconError> {
        if self.is_cancelled() {
            Err(ReconError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One document/ledger pair for [`ReconPool::run_batch`].
pub struct ReconJob {
    pub document: Document,
    pub extractor: Box<dyn Extractor>,
    pub ledger: Box<dyn LedgerReader>,
}

/// Bounded pool for reconciling many document pairs at once.
pub struct ReconPool {
    pool: ThreadPool,
}

impl ReconPool {
    /// `None` sizes the pool to the machine.
    pub fn new(workers: Option<usize>) -> Result<Self, ReconError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("gridrecon-{i}"));
        if let Some(n) = workers {
            builder = builder.num_threads(n);
        }
        let pool = builder.build().map_err(|e| ReconError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every job; results come back in submission order.
    pub fn run_batch(
        &self,
        jobs: &[ReconJob],
        config: &ReconConfig,
        cancel: &CancelToken,
    ) -> Vec<Result<ReconciliationReport, ReconError>> {
        log::info!("batch: {} job(s) on {} worker(s)", jobs.len(), self.workers());
        self.pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    reconcile_with(job.extractor.as_ref(), &job.document, job.ledger.as_ref(), config, cancel)
                })
                .collect()
        })
    }
}
