//! Output layout of the bootstrap bundle.
//!
//! Every path a downstream bootstrapper reads is listed once in
//! [`ASSET_SCHEMA`], together with its role, the pipeline stage that
//! produces it and the assets it is assembled from. The static and dynamic
//! manifest sets are rendered straight from this table and the derived
//! credentials take their inputs from the `requires` lists, so the file
//! layout and the dependency graph cannot drift apart.

pub const ASSET_PATH_CA_KEY: &str = "tls/ca.key";
pub const ASSET_PATH_CA_CERT: &str = "tls/ca.crt";
pub const ASSET_PATH_API_SERVER_KEY: &str = "tls/apiserver.key";
pub const ASSET_PATH_API_SERVER_CERT: &str = "tls/apiserver.crt";
pub const ASSET_PATH_SERVICE_ACCOUNT_PRIV_KEY: &str = "tls/service-account.key";
pub const ASSET_PATH_SERVICE_ACCOUNT_PUB_KEY: &str = "tls/service-account.pub";
pub const ASSET_PATH_ADMIN_KEY: &str = "tls/admin.key";
pub const ASSET_PATH_ADMIN_CERT: &str = "tls/admin.crt";
pub const ASSET_PATH_ADMIN_KUBECONFIG: &str = "auth/admin-kubeconfig";
pub const ASSET_PATH_BOOTSTRAP_KUBECONFIG: &str = "auth/bootstrap-kubeconfig";
pub const ASSET_PATH_BOOTSTRAP_AUTH_TOKEN: &str = "auth/bootstrap-auth-token";
pub const ASSET_PATH_MANIFESTS: &str = "manifests";
pub const ASSET_PATH_KUBELET: &str = "manifests/kubelet.yaml";
pub const ASSET_PATH_KUBELET_BOOTSTRAP_ROLE_BINDING: &str =
    "manifests/kubelet-bootstrap-role-binding.yaml";
pub const ASSET_PATH_KUBE_SYSTEM_SA_ROLE_BINDING: &str = "manifests/kube-sa-role-binding.yaml";
pub const ASSET_PATH_PROXY: &str = "manifests/kube-proxy.yaml";
pub const ASSET_PATH_KUBE_FLANNEL: &str = "manifests/kube-flannel.yaml";
pub const ASSET_PATH_KUBE_FLANNEL_CFG: &str = "manifests/kube-flannel-cfg.yaml";
pub const ASSET_PATH_API_SERVER_SECRET: &str = "manifests/kube-apiserver-secret.yaml";
pub const ASSET_PATH_API_SERVER: &str = "manifests/kube-apiserver.yaml";
pub const ASSET_PATH_CONTROLLER_MANAGER: &str = "manifests/kube-controller-manager.yaml";
pub const ASSET_PATH_CONTROLLER_MANAGER_SECRET: &str =
    "manifests/kube-controller-manager-secret.yaml";
pub const ASSET_PATH_CONTROLLER_MANAGER_DISRUPTION: &str =
    "manifests/kube-controller-manager-disruption.yaml";
pub const ASSET_PATH_SCHEDULER: &str = "manifests/kube-scheduler.yaml";
pub const ASSET_PATH_SCHEDULER_DISRUPTION: &str = "manifests/kube-scheduler-disruption.yaml";
pub const ASSET_PATH_KUBE_DNS_DEPLOYMENT: &str = "manifests/kube-dns-deployment.yaml";
pub const ASSET_PATH_KUBE_DNS_SVC: &str = "manifests/kube-dns-svc.yaml";
pub const ASSET_PATH_CHECKPOINTER: &str = "manifests/pod-checkpoint-installer.yaml";
pub const ASSET_PATH_ETCD_OPERATOR: &str = "manifests/etcd-operator.yaml";
pub const ASSET_PATH_ETCD_SVC: &str = "manifests/etcd-service.yaml";
pub const ASSET_PATH_ETCD_CLUSTER: &str = "manifests/etcd-cluster.yaml";
pub const ASSET_PATH_EXTRA_KUBELET_APPROVER: &str = "extra/kubelet-approver.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRole {
    PrivateKey,
    PublicKey,
    Certificate,
    Kubeconfig,
    Token,
    Manifest,
    Secret,
    ExtraManifest,
}

impl AssetRole {
    pub fn is_templated(&self) -> bool {
        matches!(self, AssetRole::Manifest | AssetRole::ExtraManifest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStage {
    Static,
    Dynamic,
    Tls,
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    SelfHostKubelet,
    SelfHostedEtcd,
}

impl Condition {
    pub fn holds(&self, self_host_kubelet: bool, self_hosted_etcd: bool) -> bool {
        match self {
            Condition::Always => true,
            Condition::SelfHostKubelet => self_host_kubelet,
            Condition::SelfHostedEtcd => self_hosted_etcd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetSpec {
    pub path: &'static str,
    pub role: AssetRole,
    pub stage: AssetStage,
    pub when: Condition,
    pub requires: &'static [&'static str],
}

const fn spec(
    path: &'static str,
    role: AssetRole,
    stage: AssetStage,
    when: Condition,
    requires: &'static [&'static str],
) -> AssetSpec {
    AssetSpec {
        path,
        role,
        stage,
        when,
        requires,
    }
}

use AssetRole::*;
use AssetStage::{Derived, Dynamic, Static, Tls};
use Condition::{Always, SelfHostKubelet, SelfHostedEtcd};

/// Production order within a stage follows table order.
pub const ASSET_SCHEMA: &[AssetSpec] = &[
    // static manifests
    spec(ASSET_PATH_KUBELET, Manifest, Static, SelfHostKubelet, &[]),
    spec(ASSET_PATH_KUBELET_BOOTSTRAP_ROLE_BINDING, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_KUBE_SYSTEM_SA_ROLE_BINDING, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_PROXY, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_KUBE_FLANNEL, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_KUBE_FLANNEL_CFG, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_KUBE_DNS_DEPLOYMENT, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_KUBE_DNS_SVC, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_CHECKPOINTER, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_ETCD_OPERATOR, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_ETCD_SVC, Manifest, Static, Always, &[]),
    spec(ASSET_PATH_ETCD_CLUSTER, Manifest, Static, SelfHostedEtcd, &[]),
    spec(ASSET_PATH_EXTRA_KUBELET_APPROVER, ExtraManifest, Static, Always, &[]),
    // dynamic manifests
    spec(ASSET_PATH_API_SERVER, Manifest, Dynamic, Always, &[]),
    spec(ASSET_PATH_CONTROLLER_MANAGER, Manifest, Dynamic, Always, &[]),
    spec(ASSET_PATH_CONTROLLER_MANAGER_DISRUPTION, Manifest, Dynamic, Always, &[]),
    spec(ASSET_PATH_SCHEDULER, Manifest, Dynamic, Always, &[]),
    spec(ASSET_PATH_SCHEDULER_DISRUPTION, Manifest, Dynamic, Always, &[]),
    spec(ASSET_PATH_BOOTSTRAP_AUTH_TOKEN, Token, Dynamic, Always, &[]),
    // PKI
    spec(ASSET_PATH_CA_KEY, PrivateKey, Tls, Always, &[]),
    spec(ASSET_PATH_CA_CERT, Certificate, Tls, Always, &[]),
    spec(ASSET_PATH_API_SERVER_KEY, PrivateKey, Tls, Always, &[]),
    spec(ASSET_PATH_API_SERVER_CERT, Certificate, Tls, Always, &[]),
    spec(ASSET_PATH_SERVICE_ACCOUNT_PRIV_KEY, PrivateKey, Tls, Always, &[]),
    spec(ASSET_PATH_SERVICE_ACCOUNT_PUB_KEY, PublicKey, Tls, Always, &[]),
    spec(ASSET_PATH_ADMIN_KEY, PrivateKey, Tls, Always, &[]),
    spec(ASSET_PATH_ADMIN_CERT, Certificate, Tls, Always, &[]),
    // credentials assembled from the PKI
    spec(
        ASSET_PATH_BOOTSTRAP_KUBECONFIG,
        Kubeconfig,
        Derived,
        Always,
        &[ASSET_PATH_CA_CERT],
    ),
    spec(
        ASSET_PATH_ADMIN_KUBECONFIG,
        Kubeconfig,
        Derived,
        Always,
        &[ASSET_PATH_CA_CERT, ASSET_PATH_ADMIN_CERT, ASSET_PATH_ADMIN_KEY],
    ),
    spec(
        ASSET_PATH_API_SERVER_SECRET,
        Secret,
        Derived,
        Always,
        &[
            ASSET_PATH_API_SERVER_KEY,
            ASSET_PATH_API_SERVER_CERT,
            ASSET_PATH_SERVICE_ACCOUNT_PRIV_KEY,
            ASSET_PATH_CA_CERT,
        ],
    ),
    spec(
        ASSET_PATH_CONTROLLER_MANAGER_SECRET,
        Secret,
        Derived,
        Always,
        &[ASSET_PATH_SERVICE_ACCOUNT_PRIV_KEY],
    ),
];

pub fn lookup(path: &str) -> Option<&'static AssetSpec> {
    ASSET_SCHEMA.iter().find(|s| s.path == path)
}

pub fn stage(stage: AssetStage) -> impl Iterator<Item = &'static AssetSpec> {
    ASSET_SCHEMA.iter().filter(move |s| s.stage == stage)
}

pub fn expected_paths(self_host_kubelet: bool, self_hosted_etcd: bool) -> Vec<&'static str> {
    [Static, Dynamic, Tls, Derived]
        .into_iter()
        .flat_map(stage)
        .filter(|s| s.when.holds(self_host_kubelet, self_hosted_etcd))
        .map(|s| s.path)
        .collect()
}
