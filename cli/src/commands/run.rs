use std::sync::Arc;

use tracing::info;

use reconpipe_core::pipeline::Pipeline;
use reconpipe_core::runner::ExecRunner;

use crate::commands::ScanArgs;
use crate::terminal::progress;

/// Full pipeline: scan fan-out, then exploit lookup over its artifacts.
pub fn run(args: ScanArgs) -> anyhow::Result<()> {
    let cfg = args.into_config()?;
    let pipeline = Pipeline::new(cfg, Arc::new(ExecRunner));

    let (bar, on_progress) = progress::scan_progress();
    pipeline.run(Some(on_progress))?;
    bar.finish_and_clear();

    info!("pipeline complete");
    Ok(())
}
