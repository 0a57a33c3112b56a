//! Explicit composition of the two pipeline stages.
//!
//! The surrounding automation chains stages by checking that the output
//! directory of the previous one exists; there is no task registry. This
//! module offers the scan and lookup stages as plain functions over the
//! shared [`PipelineConfig`], plus a `run` that sequences both.

use std::sync::Arc;

use tracing::info;

use reconpipe_common::config::PipelineConfig;
use reconpipe_common::error::PipelineError;
use reconpipe_common::portmap::TargetPortMap;

use crate::lookup::{self, LookupReport};
use crate::runner::CommandRunner;
use crate::scan::{self, DispatchReport, ProgressFn};

pub struct Pipeline {
    cfg: PipelineConfig,
    runner: Arc<dyn CommandRunner>,
}

impl Pipeline {
    pub fn new(cfg: PipelineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { cfg, runner }
    }

    /// Scan stage: load the upstream port map and fan out scan invocations.
    pub fn scan(&self, on_progress: Option<ProgressFn>) -> Result<DispatchReport, PipelineError> {
        let map = TargetPortMap::load(&self.cfg.portmap_path)?;

        scan::dispatch(
            &map,
            &self.cfg.web_ports,
            self.cfg.threads,
            &self.cfg.scan_results_dir(),
            Arc::clone(&self.runner),
            on_progress,
        )
    }

    /// Lookup stage: consume the scan artifacts produced by [`Self::scan`].
    pub fn lookup(&self) -> Result<LookupReport, PipelineError> {
        lookup::run_lookup(
            &self.cfg.scan_results_dir(),
            &self.cfg.lookup_results_dir(),
            Arc::clone(&self.runner),
        )
    }

    /// Both stages in order. The lookup only ever sees artifacts the scan
    /// stage finished writing, since the pool drains before scan returns.
    pub fn run(&self, on_progress: Option<ProgressFn>) -> Result<(), PipelineError> {
        let scan_report = self.scan(on_progress)?;
        info!(
            "scan stage complete: {} run, {} failed, {} web-only pairs skipped",
            scan_report.attempted, scan_report.failed, scan_report.skipped_pairs
        );

        self.lookup()?;
        Ok(())
    }
}
