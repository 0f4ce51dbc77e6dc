// src/cluster/ready.rs
use super::retry::retry;
use crate::utils::logging::Logger;
use serde::Deserialize;
use std::{fmt, io, path::PathBuf, process::Command, time::Duration};

pub const DEFAULT_ATTEMPTS: u32 = 12;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum ClusterError {
    Command(String),
    Parse(String),
    NotReady(String),
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(s) => write!(f, "kubectl failed: {}", s),
            Self::Parse(s) => write!(f, "unexpected kubectl output: {}", s),
            Self::NotReady(s) => write!(f, "cluster not ready: {}", s),
        }
    }
}

impl std::error::Error for ClusterError {}

impl From<ClusterError> for io::Error {
    fn from(error: ClusterError) -> Self {
        let kind = match error {
            ClusterError::NotReady(_) => io::ErrorKind::TimedOut,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, error.to_string())
    }
}

/// Where to look and how long to wait. Built by the caller and passed in.
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    pub kubeconfig: PathBuf,
    pub expected_nodes: usize,
    pub attempts: u32,
    pub delay: Duration,
}

impl ReadinessConfig {
    pub fn new(kubeconfig: impl Into<PathBuf>, expected_nodes: usize) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
            expected_nodes,
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NodeList {
    #[serde(default)]
    pub items: Vec<Node>,
}

#[derive(Debug, Deserialize)]
pub struct Node {
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub status: NodeStatus,
}

#[derive(Debug, Deserialize)]
pub struct NodeMetadata {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
}

#[derive(Debug, Deserialize)]
pub struct NodeCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
}

impl Node {
    pub fn is_ready(&self) -> bool {
        self.status
            .conditions
            .iter()
            .any(|c| c.condition_type == "Ready" && c.status == "True")
    }
}

/// Parses `kubectl get nodes -o json` output.
pub fn parse_nodes(output: &[u8]) -> Result<NodeList, ClusterError> {
    serde_json::from_slice(output).map_err(|e| ClusterError::Parse(e.to_string()))
}

/// Ready when exactly `expected` nodes exist and all report `Ready=True`.
pub fn evaluate_nodes(nodes: &NodeList, expected: usize) -> Result<(), ClusterError> {
    if nodes.items.len() != expected {
        return Err(ClusterError::NotReady(format!(
            "expected {} nodes, found {}",
            expected,
            nodes.items.len()
        )));
    }
    let not_ready: Vec<&str> = nodes
        .items
        .iter()
        .filter(|n| !n.is_ready())
        .map(|n| n.metadata.name.as_str())
        .collect();
    if !not_ready.is_empty() {
        return Err(ClusterError::NotReady(format!(
            "nodes not ready: {}",
            not_ready.join(", ")
        )));
    }
    Ok(())
}

/// Thin kubectl wrapper used to confirm a freshly bootstrapped cluster came up.
pub struct Cluster {
    config: ReadinessConfig,
}

impl Cluster {
    pub fn new(config: ReadinessConfig) -> Self {
        Self { config }
    }

    pub fn list_nodes(&self) -> Result<NodeList, ClusterError> {
        let output = Command::new("kubectl")
            .arg("--kubeconfig")
            .arg(&self.config.kubeconfig)
            .args(["get", "nodes", "-o", "json"])
            .output()
            .map_err(|e| ClusterError::Command(e.to_string()))?;

        if !output.status.success() {
            return Err(ClusterError::Command(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        parse_nodes(&output.stdout)
    }

    /// Polls until the node set is ready or the attempt budget runs out.
    pub fn ready(&self, logger: &mut dyn Logger) -> Result<(), ClusterError> {
        retry(self.config.attempts, self.config.delay, |attempt| {
            let result = self
                .list_nodes()
                .and_then(|nodes| evaluate_nodes(&nodes, self.config.expected_nodes));
            match &result {
                Ok(()) => logger.log(&format!(
                    "All {} nodes ready",
                    self.config.expected_nodes
                )),
                Err(e) => logger.debug_log(&format!(
                    "Attempt {}/{}: {}",
                    attempt, self.config.attempts, e
                )),
            }
            result
        })
    }
}
