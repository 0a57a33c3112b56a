use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use reconpipe_core::scan::ProgressFn;

/// Spinner shown while the scan worker pool drains. The total invocation
/// count is only known inside dispatch, so this tracks completions rather
/// than a percentage.
pub fn scan_progress() -> (ProgressBar, ProgressFn) {
    let pb = ProgressBar::new_spinner();

    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("waiting for scans...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let pb_clone = pb.clone();
    let on_progress: ProgressFn = Box::new(move |done| {
        pb_clone.set_message(format!("{done} scans complete"));
    });

    (pb, on_progress)
}
