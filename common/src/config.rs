//! # Pipeline Configuration
//!
//! The typed configuration object handed from the CLI into the pipeline
//! stages. It replaces the original task framework's loose parameter
//! passing: output directory names are derived here, once, and every stage
//! reads them from the same struct.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::PipelineError;

/// Web ports excluded from dispatch; a separate pipeline stage owns these.
pub const DEFAULT_WEB_PORTS: [u16; 4] = [80, 443, 8080, 8443];

/// Default width of the scan worker pool.
pub const DEFAULT_THREADS: &str = "10";

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Stem used to name the per-stage output directories.
    pub target_file: String,
    /// Worker pool width for scan dispatch.
    pub threads: usize,
    /// Ports handed off to the web-scanning stage instead of this one.
    pub web_ports: BTreeSet<u16>,
    /// Serialized target/port map produced by the upstream discovery stage.
    pub portmap_path: PathBuf,
}

impl PipelineConfig {
    /// Builds a validated config. `threads` arrives as the raw string from
    /// the pipeline surface so that a bad value is rejected here, before any
    /// work starts, rather than deep inside dispatch.
    pub fn new(
        target_file: impl Into<String>,
        threads: &str,
        web_ports: BTreeSet<u16>,
        portmap_path: impl Into<PathBuf>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            target_file: target_file.into(),
            threads: parse_threads(threads)?,
            web_ports,
            portmap_path: portmap_path.into(),
        })
    }

    /// Directory populated by the scan stage, one artifact triplet per
    /// invocation. Its existence signals stage completion downstream.
    pub fn scan_results_dir(&self) -> PathBuf {
        scan_results_dir(&self.target_file)
    }

    /// Terminal artifact directory written by the lookup stage.
    pub fn lookup_results_dir(&self) -> PathBuf {
        lookup_results_dir(&self.target_file)
    }
}

pub fn scan_results_dir(target_file: &str) -> PathBuf {
    PathBuf::from(format!("{target_file}-nmap-results"))
}

pub fn lookup_results_dir(target_file: &str) -> PathBuf {
    PathBuf::from(format!("{target_file}-searchsploit-results"))
}

/// Validates the worker count. Zero is clamped to one: a zero-width pool
/// would accept work and never drain it.
pub fn parse_threads(raw: &str) -> Result<usize, PipelineError> {
    let n: usize = raw
        .trim()
        .parse()
        .map_err(|_| PipelineError::InvalidThreads(raw.to_string()))?;
    Ok(n.max(1))
}

pub fn default_web_ports() -> BTreeSet<u16> {
    DEFAULT_WEB_PORTS.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_threads_accepts_integers() {
        assert_eq!(parse_threads("10").unwrap(), 10);
        assert_eq!(parse_threads(" 4 ").unwrap(), 4);
    }

    #[test]
    fn parse_threads_clamps_zero() {
        assert_eq!(parse_threads("0").unwrap(), 1);
    }

    #[test]
    fn parse_threads_rejects_garbage() {
        for bad in ["abc", "-3", "1.5", ""] {
            let err = parse_threads(bad).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidThreads(_)), "{bad}");
        }
    }

    #[test]
    fn results_dirs_follow_target_file() {
        let cfg = PipelineConfig::new("htb-targets", "10", default_web_ports(), "map.json")
            .unwrap();
        assert_eq!(
            cfg.scan_results_dir(),
            PathBuf::from("htb-targets-nmap-results")
        );
        assert_eq!(
            cfg.lookup_results_dir(),
            PathBuf::from("htb-targets-searchsploit-results")
        );
    }
}
