use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{DriftError, Result};
use crate::pipeline::config::DriftConfig;
use crate::pipeline::{NoOpReporter, ProgressReporter};

/// Everything a drift-correction run needs besides its input: validated
/// configuration, the worker pool all parallel stages run on, and the
/// progress sink.
#[derive(Clone)]
pub struct DriftContext {
    pub config: DriftConfig,
    pool: Arc<ThreadPool>,
    reporter: Arc<dyn ProgressReporter>,
}

impl DriftContext {
    /// Build a context with its own thread pool sized from `config.threads`.
    pub fn new(config: DriftConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("driftcorr-{i}"));
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| DriftError::InvalidConfig(format!("thread pool: {e}")))?;
        Ok(Self {
            config,
            pool: Arc::new(pool),
            reporter: Arc::new(NoOpReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn reporter(&self) -> &Arc<dyn ProgressReporter> {
        &self.reporter
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` with the context's pool as the rayon pool.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl std::fmt::Debug for DriftContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriftContext")
            .field("config", &self.config)
            .field("threads", &self.num_threads())
            .finish()
    }
}
