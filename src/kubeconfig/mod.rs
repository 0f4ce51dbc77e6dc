mod kube;
mod secret;

pub use kube::{
    ClusterConfig, ContextConfig, KubeConfig, KubeConfigGenerator, NamedCluster, NamedContext,
    NamedUser, UserConfig, CLUSTER_NAME,
};
pub use secret::{ObjectMeta, Secret};
