//! # Exploit Lookup
//!
//! Runs the exploit-database lookup tool over every scan artifact the
//! dispatch stage produced, and persists whatever the tool reports on
//! stderr. A lookup command looks like:
//!
//! ```text
//! searchsploit --nmap htb-targets-nmap-results/nmap.10.10.10.155-tcp.xml
//! ```
//!
//! Only stderr is kept: the tool prints its findings for `--nmap` input
//! there, and an empty stream means nothing to persist. Files are processed
//! strictly sequentially.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use reconpipe_common::error::PipelineError;

use crate::runner::CommandRunner;

const LOOKUP_PROGRAM: &str = "searchsploit";
const SCAN_ARTIFACT_PREFIX: &str = "nmap";
const SCAN_ARTIFACT_EXT: &str = "xml";

/// Tally returned by a completed lookup pass.
#[derive(Debug, Default)]
pub struct LookupReport {
    /// Scan artifacts fed to the lookup tool.
    pub examined: usize,
    /// Result files written (inputs whose lookup produced stderr output).
    pub written: usize,
}

/// Runs the lookup tool against every `nmap*.xml` file in `scan_dir`,
/// writing one `searchsploit.{target}-{proto}.txt` per non-empty stderr
/// stream into `dest_dir`.
///
/// The destination directory is created lazily, on the first non-empty
/// result: a pass that finds nothing leaves no directory behind, which the
/// surrounding pipeline reads as "stage produced no findings".
pub fn run_lookup(
    scan_dir: &Path,
    dest_dir: &Path,
    runner: Arc<dyn CommandRunner>,
) -> Result<LookupReport, PipelineError> {
    let mut report = LookupReport::default();

    for entry in scan_artifacts(scan_dir)? {
        report.examined += 1;

        let args = vec!["--nmap".to_string(), entry.to_string_lossy().into_owned()];
        let stderr = match runner.run_capture_stderr(LOOKUP_PROGRAM, &args) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to launch lookup for {}: {e}", entry.display());
                continue;
            }
        };

        if stderr.is_empty() {
            debug!("no findings for {}", entry.display());
            continue;
        }

        std::fs::create_dir_all(dest_dir).map_err(|source| PipelineError::CreateDir {
            path: dest_dir.to_path_buf(),
            source,
        })?;

        let out_path = dest_dir.join(result_file_name(&entry));
        std::fs::write(&out_path, &stderr).map_err(|source| PipelineError::WriteResult {
            path: out_path.clone(),
            source,
        })?;

        report.written += 1;
    }

    info!(
        "lookup examined {} scan artifacts, wrote {} result files",
        report.examined, report.written
    );

    Ok(report)
}

/// Lists `nmap*.xml` files in the scan results directory, one level deep,
/// sorted for a deterministic processing order.
fn scan_artifacts(scan_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = std::fs::read_dir(scan_dir).map_err(|source| PipelineError::ReadResultsDir {
        path: scan_dir.to_path_buf(),
        source,
    })?;

    let mut artifacts: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(SCAN_ARTIFACT_PREFIX))
                && p.extension().and_then(|x| x.to_str()) == Some(SCAN_ARTIFACT_EXT)
        })
        .collect();

    artifacts.sort();
    Ok(artifacts)
}

/// Derives `searchsploit.{target}-{proto}.txt` from a scan artifact path,
/// e.g. `nmap.10.10.10.155-tcp.xml` -> `searchsploit.10.10.10.155-tcp.txt`.
///
/// The protocol comes from the `-tcp`/`-udp` segment the dispatch stage put
/// in the filename. Stems without that segment keep their last three
/// characters as the suffix and are warned about; they can only come from
/// files this pipeline did not produce.
fn result_file_name(artifact: &Path) -> String {
    let stem = artifact
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let rest = stem.strip_prefix("nmap.").unwrap_or(stem);

    if let Some(target) = rest.strip_suffix("-tcp") {
        format!("searchsploit.{target}-tcp.txt")
    } else if let Some(target) = rest.strip_suffix("-udp") {
        format!("searchsploit.{target}-udp.txt")
    } else {
        let skip = stem.chars().count().saturating_sub(3);
        let suffix: String = stem.chars().skip(skip).collect();
        warn!("scan artifact {stem:?} has no protocol segment, using suffix {suffix:?}");
        format!("searchsploit.{rest}-{suffix}.txt")
    }
}
