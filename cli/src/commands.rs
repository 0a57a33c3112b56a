pub mod lookup;
pub mod run;
pub mod scan;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use reconpipe_common::config::{self, DEFAULT_THREADS, PipelineConfig};

#[derive(Parser)]
#[command(name = "reconpipe")]
#[command(about = "Targeted scan and exploit-lookup stages of a recon pipeline.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run targeted scans against the ports found by the discovery stage
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// Look up known exploits for every scan artifact
    #[command(alias = "l")]
    Lookup(LookupArgs),
    /// Run the scan and lookup stages back to back
    #[command(alias = "r")]
    Run(ScanArgs),
}

#[derive(Args)]
pub struct ScanArgs {
    /// Serialized host/protocol/port map from the discovery stage
    #[arg(long)]
    pub input: PathBuf,

    /// Target list stem; output directories are named after it
    #[arg(long)]
    pub target_file: String,

    /// Number of concurrent scan processes
    #[arg(long, default_value = DEFAULT_THREADS)]
    pub threads: String,

    /// Ports to leave to the web-scanning stage
    #[arg(long, value_delimiter = ',')]
    pub web_ports: Option<Vec<u16>>,
}

#[derive(Args)]
pub struct LookupArgs {
    /// Target list stem; locates the scan results directory
    #[arg(long)]
    pub target_file: String,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl ScanArgs {
    /// Validates the raw arguments into the stage config. A bad thread
    /// count is logged and aborts before any invocation runs.
    pub fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let web_ports = match self.web_ports {
            Some(ports) => ports.into_iter().collect(),
            None => config::default_web_ports(),
        };

        PipelineConfig::new(self.target_file, &self.threads, web_ports, self.input).map_err(
            |e| {
                error!("{e}");
                anyhow::anyhow!("invalid configuration")
            },
        )
    }
}
