#![cfg(test)]
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use reconpipe_common::config::PipelineConfig;
use reconpipe_common::error::PipelineError;
use reconpipe_core::pipeline::Pipeline;
use reconpipe_core::runner::{CommandRunner, ExitInfo};

/// Stands in for both external tools.
///
/// `run_detached` plays nmap: it honors `-oA` by writing the three artifact
/// files itself, exactly like the real tool would. `run_capture_stderr`
/// plays searchsploit: hosts listed in `findings` produce stderr output,
/// everything else stays silent.
struct FakeTools {
    findings: Vec<(&'static str, &'static [u8])>,
    scan_argv: Mutex<Vec<Vec<String>>>,
}

impl FakeTools {
    fn new(findings: Vec<(&'static str, &'static [u8])>) -> Self {
        Self {
            findings,
            scan_argv: Mutex::new(Vec::new()),
        }
    }
}

impl CommandRunner for FakeTools {
    fn run_detached(&self, program: &str, args: &[String]) -> io::Result<ExitInfo> {
        assert_eq!(program, "nmap");
        self.scan_argv.lock().unwrap().push(args.to_vec());

        let oa = args.iter().position(|a| a == "-oA").expect("-oA missing");
        let prefix = &args[oa + 1];
        for ext in ["nmap", "gnmap", "xml"] {
            // -oA appends the extension to the prefix verbatim
            std::fs::write(format!("{prefix}.{ext}"), b"<nmaprun/>")?;
        }
        Ok(ExitInfo::ok())
    }

    fn run_capture_stderr(&self, program: &str, args: &[String]) -> io::Result<Vec<u8>> {
        assert_eq!(program, "searchsploit");
        assert_eq!(args[0], "--nmap");

        let stderr = self
            .findings
            .iter()
            .find(|(host, _)| args[1].contains(host))
            .map(|(_, bytes)| bytes.to_vec())
            .unwrap_or_default();
        Ok(stderr)
    }
}

fn write_portmap(dir: &Path, doc: serde_json::Value) -> PathBuf {
    let path = dir.join("portmap.json");
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
    path
}

fn config(dir: &Path, portmap: PathBuf, threads: &str) -> Result<PipelineConfig, PipelineError> {
    let stem = dir.join("htb-targets").to_string_lossy().into_owned();
    PipelineConfig::new(
        stem,
        threads,
        [80u16, 443].into_iter().collect(),
        portmap,
    )
}

#[test]
fn full_pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let portmap = write_portmap(
        dir.path(),
        serde_json::json!({
            "10.10.10.155": { "tcp": [22, 80, 443], "udp": [161] },
            "10.10.10.156": { "tcp": [80, 443] }
        }),
    );

    let cfg = config(dir.path(), portmap, "4").unwrap();
    let tools = Arc::new(FakeTools::new(vec![(
        "10.10.10.155-tcp",
        b"Exploit: OpenSSH 7.2p2 - Username Enumeration",
    )]));

    Pipeline::new(cfg.clone(), tools.clone()).run(None).unwrap();

    // one invocation per non-web pair: .155/tcp (port 22) and .155/udp;
    // .156 is web-only and produces nothing
    let argv = tools.scan_argv.lock().unwrap();
    assert_eq!(argv.len(), 2);
    let scan_dir = cfg.scan_results_dir();
    assert!(scan_dir.join("nmap.10.10.10.155-tcp.xml").is_file());
    assert!(scan_dir.join("nmap.10.10.10.155-udp.xml").is_file());
    assert!(!scan_dir.join("nmap.10.10.10.156-tcp.xml").exists());

    // lookup persisted only the host with findings
    let lookup_dir = cfg.lookup_results_dir();
    let written = lookup_dir.join("searchsploit.10.10.10.155-tcp.txt");
    assert!(written.is_file());
    assert_eq!(
        std::fs::read(&written).unwrap(),
        b"Exploit: OpenSSH 7.2p2 - Username Enumeration".to_vec()
    );
    assert!(!lookup_dir.join("searchsploit.10.10.10.155-udp.txt").exists());
    assert!(!lookup_dir.join("searchsploit.10.10.10.156-tcp.txt").exists());
}

#[test]
fn scan_argv_matches_tool_contract() {
    let dir = tempfile::tempdir().unwrap();
    let portmap = write_portmap(
        dir.path(),
        serde_json::json!({ "10.10.10.1": { "tcp": [22, 80, 443] } }),
    );

    let cfg = config(dir.path(), portmap, "1").unwrap();
    let tools = Arc::new(FakeTools::new(Vec::new()));
    Pipeline::new(cfg.clone(), tools.clone()).scan(None).unwrap();

    let argv = tools.scan_argv.lock().unwrap();
    assert_eq!(argv.len(), 1);
    let args = &argv[0];

    let prefix = cfg.scan_results_dir().join("nmap.10.10.10.1-tcp");
    let expected: Vec<String> = [
        "--open", "-sT", "-sC", "-T", "4", "-sV", "-Pn", "-p", "22", "-oA",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain([prefix.to_string_lossy().into_owned(), "10.10.10.1".into()])
    .collect();

    assert_eq!(*args, expected);
}

#[test]
fn web_only_map_leaves_empty_results_directory() {
    let dir = tempfile::tempdir().unwrap();
    let portmap = write_portmap(
        dir.path(),
        serde_json::json!({ "10.10.10.1": { "tcp": [80] } }),
    );

    let cfg = config(dir.path(), portmap, "2").unwrap();
    let tools = Arc::new(FakeTools::new(Vec::new()));
    Pipeline::new(cfg.clone(), tools.clone()).run(None).unwrap();

    assert!(tools.scan_argv.lock().unwrap().is_empty());
    // the scan stage still creates its directory (the completion marker)...
    assert!(cfg.scan_results_dir().is_dir());
    assert_eq!(
        std::fs::read_dir(cfg.scan_results_dir()).unwrap().count(),
        0
    );
    // ...but the lookup stage, with nothing to persist, creates nothing
    assert!(!cfg.lookup_results_dir().exists());
}

#[test]
fn invalid_thread_count_aborts_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let portmap = write_portmap(
        dir.path(),
        serde_json::json!({ "10.10.10.1": { "tcp": [22] } }),
    );

    let err = config(dir.path(), portmap, "abc").unwrap_err();
    assert!(matches!(err, PipelineError::InvalidThreads(_)));
}

#[test]
fn missing_portmap_fails_the_scan_stage() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), dir.path().join("nope.json"), "2").unwrap();

    let err = Pipeline::new(cfg, Arc::new(FakeTools::new(Vec::new())))
        .scan(None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::PortMapRead { .. }));
}
