use std::sync::Arc;

use tracing::info;

use reconpipe_core::pipeline::Pipeline;
use reconpipe_core::runner::ExecRunner;

use crate::commands::ScanArgs;
use crate::terminal::progress;

pub fn scan(args: ScanArgs) -> anyhow::Result<()> {
    let cfg = args.into_config()?;
    let pipeline = Pipeline::new(cfg, Arc::new(ExecRunner));

    let (bar, on_progress) = progress::scan_progress();
    let report = pipeline.scan(Some(on_progress))?;
    bar.finish_and_clear();

    info!(
        "scan stage complete: {} run, {} failed, {} web-only pairs skipped",
        report.attempted, report.failed, report.skipped_pairs
    );
    Ok(())
}
