use std::sync::Arc;

use tracing::info;

use reconpipe_common::config;
use reconpipe_core::lookup::run_lookup;
use reconpipe_core::runner::ExecRunner;

use crate::commands::LookupArgs;

pub fn lookup(args: LookupArgs) -> anyhow::Result<()> {
    let scan_dir = config::scan_results_dir(&args.target_file);
    let dest_dir = config::lookup_results_dir(&args.target_file);

    let report = run_lookup(&scan_dir, &dest_dir, Arc::new(ExecRunner))?;

    info!(
        "lookup stage complete: {} artifacts examined, {} result files written",
        report.examined, report.written
    );
    Ok(())
}
