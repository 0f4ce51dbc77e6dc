use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

pub const CLUSTER_NAME: &str = "local";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub clusters: Vec<NamedCluster>,
    pub users: Vec<NamedUser>,
    pub contexts: Vec<NamedContext>,
    pub current_context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterConfig {
    pub server: String,
    pub certificate_authority_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    pub user: UserConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub cluster: String,
    pub user: String,
}

/// Builds single-cluster kubeconfigs with all material embedded inline.
pub struct KubeConfigGenerator {
    server: String,
    ca_cert: Vec<u8>,
}

impl KubeConfigGenerator {
    pub fn new(server: String, ca_cert: &[u8]) -> Self {
        Self {
            server,
            ca_cert: ca_cert.to_vec(),
        }
    }

    pub fn with_token(&self, user_name: &str, token: &str) -> KubeConfig {
        self.generate_kubeconfig(
            user_name,
            UserConfig {
                token: Some(token.to_string()),
                ..Default::default()
            },
        )
    }

    pub fn with_client_certificate(&self, user_name: &str, cert: &[u8], key: &[u8]) -> KubeConfig {
        self.generate_kubeconfig(
            user_name,
            UserConfig {
                client_certificate_data: Some(general_purpose::STANDARD.encode(cert)),
                client_key_data: Some(general_purpose::STANDARD.encode(key)),
                ..Default::default()
            },
        )
    }

    fn generate_kubeconfig(&self, user_name: &str, user: UserConfig) -> KubeConfig {
        let context_name = format!("{}-context", user_name);
        KubeConfig {
            api_version: "v1".to_string(),
            kind: "Config".to_string(),
            clusters: vec![NamedCluster {
                name: CLUSTER_NAME.to_string(),
                cluster: ClusterConfig {
                    server: self.server.clone(),
                    certificate_authority_data: general_purpose::STANDARD.encode(&self.ca_cert),
                },
            }],
            users: vec![NamedUser {
                name: user_name.to_string(),
                user,
            }],
            contexts: vec![NamedContext {
                name: context_name.clone(),
                context: ContextConfig {
                    cluster: CLUSTER_NAME.to_string(),
                    user: user_name.to_string(),
                },
            }],
            current_context: context_name,
        }
    }
}

impl KubeConfig {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(data: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(data)
    }

    fn current(&self) -> Option<&ContextConfig> {
        self.contexts
            .iter()
            .find(|c| c.name == self.current_context)
            .map(|c| &c.context)
    }

    /// Server of the cluster the current context points at.
    pub fn current_server(&self) -> Option<&str> {
        let context = self.current()?;
        self.clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| c.cluster.server.as_str())
    }

    /// User entry of the current context.
    pub fn current_user(&self) -> Option<&UserConfig> {
        let context = self.current()?;
        self.users
            .iter()
            .find(|u| u.name == context.user)
            .map(|u| &u.user)
    }

    /// Decoded CA bundle of the current cluster.
    pub fn current_ca(&self) -> Option<Vec<u8>> {
        let context = self.current()?;
        let cluster = self.clusters.iter().find(|c| c.name == context.cluster)?;
        general_purpose::STANDARD
            .decode(&cluster.cluster.certificate_authority_data)
            .ok()
    }
}
