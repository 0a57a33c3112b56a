//! # Scan Dispatch
//!
//! Fans the target/port map out into one external scan invocation per
//! (host, protocol) pair and drains them through a bounded pool of OS worker
//! threads. Each worker blocks on one subprocess at a time; the scan tool
//! writes its own artifact triplet under the output directory, so this stage
//! never touches the result files itself.
//!
//! A scan command looks like:
//!
//! ```text
//! nmap --open -sT -sC -T 4 -sV -Pn -p 22,25,53 -oA {dir}/nmap.10.10.10.155-tcp 10.10.10.155
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, info, warn};

use reconpipe_common::error::PipelineError;
use reconpipe_common::portmap::{self, TargetPortMap};

use crate::runner::CommandRunner;

const SCAN_PROGRAM: &str = "nmap";

/// One fully-formed external scan command for a single (host, protocol)
/// pair. Transient: built during a dispatch pass and discarded with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanInvocation {
    pub host: String,
    pub protocol: String,
    pub program: String,
    pub args: Vec<String>,
    /// Path prefix the tool appends `.nmap`/`.gnmap`/`.xml` to.
    pub output_prefix: PathBuf,
}

impl ScanInvocation {
    fn build(host: &str, protocol: &str, ports: &[u16], results_dir: &Path) -> Self {
        // Anything that is not "tcp" falls into the UDP branch. Unrecognized
        // protocol values are warned about at the call site, not rejected.
        let scan_type = if protocol == "tcp" { "-sT" } else { "-sU" };

        let port_list = ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let output_prefix = results_dir.join(format!("nmap.{host}-{protocol}"));

        let args = vec![
            "--open".to_string(),
            scan_type.to_string(),
            "-sC".to_string(),
            "-T".to_string(),
            "4".to_string(),
            "-sV".to_string(),
            "-Pn".to_string(),
            "-p".to_string(),
            port_list,
            "-oA".to_string(),
            output_prefix.to_string_lossy().into_owned(),
            host.to_string(),
        ];

        Self {
            host: host.to_string(),
            protocol: protocol.to_string(),
            program: SCAN_PROGRAM.to_string(),
            args,
            output_prefix,
        }
    }
}

/// What happened to one invocation once a worker picked it up.
#[derive(Debug)]
pub struct InvocationOutcome {
    pub host: String,
    pub protocol: String,
    pub result: std::io::Result<crate::runner::ExitInfo>,
}

/// Tally returned by a completed dispatch pass.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// (host, protocol) pairs whose ports were entirely web ports.
    pub skipped_pairs: usize,
    pub attempted: usize,
    pub succeeded: usize,
    /// Non-zero exits plus spawn failures. Logged, never fatal.
    pub failed: usize,
}

/// Called with the running completed-invocation count as workers finish.
pub type ProgressFn = Box<dyn Fn(usize) + Send + Sync>;

/// Builds the invocation list for a dispatch pass.
///
/// Pairs whose port set is entirely within `web_ports` are skipped outright:
/// no invocation, no output files. Port lists are joined in ascending order
/// so a given map always produces identical argv.
pub fn build_invocations(
    map: &TargetPortMap,
    web_ports: &BTreeSet<u16>,
    results_dir: &Path,
) -> (Vec<ScanInvocation>, usize) {
    let mut invocations = Vec::new();
    let mut skipped = 0;

    for (host, protocol, ports) in map.entries() {
        let ports = portmap::non_web_ports(ports, web_ports);
        if ports.is_empty() {
            debug!("skipping {host}/{protocol}: all ports are web ports");
            skipped += 1;
            continue;
        }

        if protocol != "tcp" && protocol != "udp" {
            warn!("unrecognized protocol {protocol:?} for {host}, scanning as UDP");
        }

        invocations.push(ScanInvocation::build(host, protocol, &ports, results_dir));
    }

    (invocations, skipped)
}

/// Runs a full scan dispatch pass: ensures the results directory exists,
/// builds the invocation list and drains it through a pool of `threads`
/// workers. Returns once every invocation has run to completion.
///
/// Individual invocation failures do not fail the pass; they are logged and
/// tallied in the report. Only filesystem errors on the results directory
/// abort dispatch.
pub fn dispatch(
    map: &TargetPortMap,
    web_ports: &BTreeSet<u16>,
    threads: usize,
    results_dir: &Path,
    runner: Arc<dyn CommandRunner>,
    on_progress: Option<ProgressFn>,
) -> Result<DispatchReport, PipelineError> {
    std::fs::create_dir_all(results_dir).map_err(|source| PipelineError::CreateDir {
        path: results_dir.to_path_buf(),
        source,
    })?;

    let (invocations, skipped_pairs) = build_invocations(map, web_ports, results_dir);
    let attempted = invocations.len();

    info!(
        "dispatching {attempted} scan invocations ({skipped_pairs} web-only pairs skipped)"
    );

    let outcomes = run_pool(invocations, threads, runner, on_progress);

    let mut report = DispatchReport {
        skipped_pairs,
        attempted,
        ..Default::default()
    };

    for outcome in &outcomes {
        match &outcome.result {
            Ok(exit) if exit.success => report.succeeded += 1,
            Ok(exit) => {
                report.failed += 1;
                warn!(
                    "scan of {}/{} exited with status {:?}",
                    outcome.host, outcome.protocol, exit.code
                );
            }
            Err(e) => {
                report.failed += 1;
                warn!(
                    "failed to launch scan of {}/{}: {e}",
                    outcome.host, outcome.protocol
                );
            }
        }
    }

    Ok(report)
}

/// Drains the invocations through a fixed-size worker pool.
///
/// Workers share one queue behind a mutex and block on `recv`, so at most
/// `threads` subprocesses are in flight at any instant. The pool joins fully
/// before this returns; a hung subprocess holds its slot indefinitely since
/// no timeout mechanism exists at this layer.
fn run_pool(
    invocations: Vec<ScanInvocation>,
    threads: usize,
    runner: Arc<dyn CommandRunner>,
    on_progress: Option<ProgressFn>,
) -> Vec<InvocationOutcome> {
    if invocations.is_empty() {
        return Vec::new();
    }

    let workers = threads.clamp(1, invocations.len());

    let (job_tx, job_rx) = mpsc::channel::<ScanInvocation>();
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (done_tx, done_rx) = mpsc::channel::<InvocationOutcome>();

    for invocation in invocations {
        // receiver outlives this loop, send cannot fail here
        let _ = job_tx.send(invocation);
    }
    drop(job_tx);

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let job_rx = Arc::clone(&job_rx);
        let done_tx = done_tx.clone();
        let runner = Arc::clone(&runner);

        handles.push(thread::spawn(move || {
            loop {
                let job = match job_rx.lock() {
                    Ok(guard) => guard.recv(),
                    Err(_) => break,
                };
                let Ok(invocation) = job else { break };

                let result = runner.run_detached(&invocation.program, &invocation.args);
                let _ = done_tx.send(InvocationOutcome {
                    host: invocation.host,
                    protocol: invocation.protocol,
                    result,
                });
            }
        }));
    }
    drop(done_tx);

    let mut outcomes = Vec::new();
    for outcome in done_rx {
        outcomes.push(outcome);
        if let Some(cb) = &on_progress {
            cb(outcomes.len());
        }
    }

    for handle in handles {
        let _ = handle.join();
    }

    outcomes
}
