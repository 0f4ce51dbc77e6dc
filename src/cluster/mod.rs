mod ready;
mod retry;

pub use ready::{
    evaluate_nodes, parse_nodes, Cluster, ClusterError, Node, NodeList, ReadinessConfig,
    DEFAULT_ATTEMPTS, DEFAULT_DELAY,
};
pub use retry::retry;
