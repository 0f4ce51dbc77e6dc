// src/main.rs
use clap::{Args, Parser, Subcommand};
use k8s_bootstrap_assets::{
    asset::{self, schema, Assets},
    cert::{verification::analyze_certificate, AltNames},
    cluster::{Cluster, ReadinessConfig, DEFAULT_ATTEMPTS, DEFAULT_DELAY},
    config::RenderConfigFile,
    utils::logging::{ConsoleLogger, FileLogger, Logger, MultiLogger},
};
use std::{io, path::PathBuf, time::Duration};

#[derive(Parser)]
#[command(name = "k8s-bootstrap-assets", version, about)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub debug: bool,
    /// Also append log lines to this file.
    #[arg(long, global = true)]
    pub log_file: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the bootstrap bundle into a new directory.
    Render(RenderArgs),
    /// Wait until the expected number of nodes report Ready.
    WaitReady(WaitReadyArgs),
}

#[derive(Args)]
pub struct RenderArgs {
    /// Output directory. Must not exist yet.
    #[arg(long)]
    pub asset_dir: PathBuf,
    /// JSON render config. Flags override its values.
    #[arg(short, long)]
    pub config: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub etcd_servers: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub api_servers: Vec<String>,
    #[arg(long)]
    pub ca_certificate_path: Option<String>,
    #[arg(long)]
    pub ca_private_key_path: Option<String>,
    #[arg(long)]
    pub bootstrap_auth_token: Option<String>,
    /// Comma separated `DNS=name` / `IP=addr` entries for the API server certificate.
    #[arg(long)]
    pub api_server_alt_names: Option<AltNames>,
    #[arg(long)]
    pub self_host_kubelet: bool,
    #[arg(long)]
    pub self_hosted_etcd: bool,
    #[arg(long)]
    pub cloud_provider: Option<String>,
}

#[derive(Args)]
pub struct WaitReadyArgs {
    #[arg(long)]
    pub kubeconfig: PathBuf,
    #[arg(long)]
    pub nodes: usize,
    #[arg(long, default_value_t = DEFAULT_ATTEMPTS)]
    pub attempts: u32,
    #[arg(long, default_value_t = DEFAULT_DELAY.as_secs())]
    pub delay_secs: u64,
}

impl RenderArgs {
    fn merge_into(self, mut file: RenderConfigFile) -> RenderConfigFile {
        if !self.etcd_servers.is_empty() {
            file.etcd_servers = self.etcd_servers;
        }
        if !self.api_servers.is_empty() {
            file.api_servers = self.api_servers;
        }
        if self.ca_certificate_path.is_some() {
            file.ca_certificate_path = self.ca_certificate_path;
        }
        if self.ca_private_key_path.is_some() {
            file.ca_private_key_path = self.ca_private_key_path;
        }
        if self.bootstrap_auth_token.is_some() {
            file.bootstrap_auth_token = self.bootstrap_auth_token;
        }
        if let Some(alt_names) = self.api_server_alt_names {
            file.alt_names = alt_names;
        }
        file.self_host_kubelet |= self.self_host_kubelet;
        file.self_hosted_etcd |= self.self_hosted_etcd;
        if self.cloud_provider.is_some() {
            file.cloud_provider = self.cloud_provider;
        }
        file
    }
}

fn build_logger(cli: &Cli) -> io::Result<Box<dyn Logger>> {
    let console: Box<dyn Logger> = Box::new(ConsoleLogger::new(cli.debug));
    match &cli.log_file {
        Some(path) => {
            let file = FileLogger::new(shellexpand::tilde(path).into_owned(), cli.debug)?;
            Ok(Box::new(MultiLogger::new().with(console).with(Box::new(file))))
        }
        None => Ok(console),
    }
}

fn log_certificate_summary(assets: &Assets, logger: &mut dyn Logger) {
    let certificates = schema::ASSET_SCHEMA
        .iter()
        .filter(|s| s.role == schema::AssetRole::Certificate);
    for spec in certificates {
        let Ok(asset) = assets.get(spec.path) else {
            continue;
        };
        match analyze_certificate(asset.data()) {
            Ok(info) => {
                logger.log(&format!(
                    "{}: subject={} expires={}",
                    spec.path,
                    info.subject,
                    info.not_after.format("%Y-%m-%d")
                ));
                logger.debug_log(&format!(
                    "{}: issuer={} serial={} sha256={} ca={} alt_names=[{}]",
                    spec.path, info.issuer, info.serial, info.fingerprint, info.is_ca, info.alt_names
                ));
            }
            Err(e) => logger.log(&format!("{}: unable to inspect certificate: {}", spec.path, e)),
        }
    }
}

fn render(args: RenderArgs, logger: &mut dyn Logger) -> io::Result<()> {
    let file = match &args.config {
        Some(path) => {
            logger.debug_log(&format!("Loading render config from {}", path));
            RenderConfigFile::load_from_file(path)?
        }
        None => RenderConfigFile::default(),
    };
    let asset_dir = args.asset_dir.clone();
    let config = args.merge_into(file).into_asset_config()?;

    let assets = asset::new_default_assets(&config, logger)?;
    assets.write_files(&asset_dir, logger)?;
    log_certificate_summary(&assets, logger);
    logger.log(&format!(
        "Wrote {} assets to {}",
        assets.len(),
        asset_dir.display()
    ));
    Ok(())
}

impl WaitReadyArgs {
    fn readiness_config(&self) -> ReadinessConfig {
        let kubeconfig = shellexpand::tilde(&self.kubeconfig.to_string_lossy()).into_owned();
        let mut config = ReadinessConfig::new(kubeconfig, self.nodes);
        config.attempts = self.attempts;
        config.delay = Duration::from_secs(self.delay_secs);
        config
    }
}

fn wait_ready(args: WaitReadyArgs, logger: &mut dyn Logger) -> io::Result<()> {
    let config = args.readiness_config();
    logger.log(&format!(
        "Waiting for {} nodes using {}",
        config.expected_nodes,
        config.kubeconfig.display()
    ));
    Cluster::new(config).ready(logger)?;
    Ok(())
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let mut logger = build_logger(&cli)?;

    let result = match cli.command {
        Commands::Render(args) => render(args, logger.as_mut()),
        Commands::WaitReady(args) => wait_ready(args, logger.as_mut()),
    };
    if let Err(e) = &result {
        logger.log(&format!("Error: {}", e));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_ready_args(argv: &[&str]) -> WaitReadyArgs {
        match Cli::parse_from(argv).command {
            Commands::WaitReady(args) => args,
            _ => panic!("expected wait-ready"),
        }
    }

    #[test]
    fn wait_ready_defaults_match_the_poller() {
        let args = wait_ready_args(&[
            "k8s-bootstrap-assets",
            "wait-ready",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--nodes",
            "3",
        ]);
        let config = args.readiness_config();
        assert_eq!(config.kubeconfig, PathBuf::from("/tmp/kubeconfig"));
        assert_eq!(config.expected_nodes, 3);
        assert_eq!(config.attempts, DEFAULT_ATTEMPTS);
        assert_eq!(config.delay, DEFAULT_DELAY);
    }

    #[test]
    fn wait_ready_flags_override_defaults() {
        let args = wait_ready_args(&[
            "k8s-bootstrap-assets",
            "wait-ready",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--nodes",
            "1",
            "--attempts",
            "2",
            "--delay-secs",
            "0",
        ]);
        let config = args.readiness_config();
        assert_eq!(config.attempts, 2);
        assert_eq!(config.delay, Duration::ZERO);
    }
}
