// config/types.rs
use crate::cert::{load_ca_cert, load_ca_key, AltNames};
use openssl::{
    pkey::{PKey, Private},
    x509::X509,
};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, io, path::PathBuf, str::FromStr};
use url::Url;

pub const DEFAULT_API_SERVER: &str = "https://127.0.0.1:443";
pub const DEFAULT_ETCD_SERVER: &str = "http://127.0.0.1:2379";

/// An API or etcd endpoint as the caller wrote it.
///
/// `Url` only validates. Rendering uses the original text, since `Url`
/// normalises away default ports and adds a trailing slash to empty paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUrl {
    url: Url,
    raw: String,
}

impl ServerUrl {
    pub fn parse(s: &str) -> Result<Self, url::ParseError> {
        let raw = s.trim();
        Ok(Self {
            url: Url::parse(raw)?,
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl FromStr for ServerUrl {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Everything the asset pipeline needs. Built once and never mutated afterwards.
#[derive(Clone)]
pub struct AssetConfig {
    pub etcd_servers: Vec<ServerUrl>,
    pub api_servers: Vec<ServerUrl>,
    pub ca_cert: Option<X509>,
    pub ca_key: Option<PKey<Private>>,
    pub bootstrap_auth_token: String,
    pub alt_names: AltNames,
    pub self_host_kubelet: bool,
    pub self_hosted_etcd: bool,
    pub cloud_provider: Option<String>,
}

impl AssetConfig {
    pub fn first_api_server(&self) -> Option<&ServerUrl> {
        self.api_servers.first()
    }
}

fn parse_urls(field: &str, values: &[String], default: &str) -> io::Result<Vec<ServerUrl>> {
    let values: Vec<&str> = if values.is_empty() {
        vec![default]
    } else {
        values.iter().map(String::as_str).collect()
    };
    values
        .into_iter()
        .map(|v| {
            ServerUrl::parse(v).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid {} URL {:?}: {}", field, v, e),
                )
            })
        })
        .collect()
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

pub fn generate_bootstrap_token() -> io::Result<String> {
    let mut buf = [0u8; 16];
    openssl::rand::rand_bytes(&mut buf).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(hex::encode(buf))
}

/// On-disk form of the render configuration. Every field is optional;
/// empty server lists fall back to the local defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfigFile {
    pub etcd_servers: Vec<String>,
    pub api_servers: Vec<String>,
    pub ca_certificate_path: Option<String>,
    pub ca_private_key_path: Option<String>,
    pub bootstrap_auth_token: Option<String>,
    pub alt_names: AltNames,
    pub self_host_kubelet: bool,
    pub self_hosted_etcd: bool,
    pub cloud_provider: Option<String>,
}

impl RenderConfigFile {
    pub fn load_from_file(path: &str) -> io::Result<Self> {
        let config_str = fs::read_to_string(expand_path(path))?;
        serde_json::from_str(&config_str).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save_to_file(&self, path: &str) -> io::Result<()> {
        let config_str = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(expand_path(path), config_str)
    }

    /// Resolves URLs, reads CA material from disk and fills in a bootstrap
    /// token when none was given. A lone CA certificate or key is passed
    /// through; the pipeline rejects it when it opens the CA.
    pub fn into_asset_config(self) -> io::Result<AssetConfig> {
        let etcd_servers = parse_urls("etcd server", &self.etcd_servers, DEFAULT_ETCD_SERVER)?;
        let api_servers = parse_urls("API server", &self.api_servers, DEFAULT_API_SERVER)?;

        let ca_cert = self
            .ca_certificate_path
            .as_deref()
            .map(|p| load_ca_cert(&expand_path(p)))
            .transpose()?;
        let ca_key = self
            .ca_private_key_path
            .as_deref()
            .map(|p| load_ca_key(&expand_path(p)))
            .transpose()?;

        let bootstrap_auth_token = match self.bootstrap_auth_token {
            Some(token) if !token.is_empty() => token,
            _ => generate_bootstrap_token()?,
        };

        Ok(AssetConfig {
            etcd_servers,
            api_servers,
            ca_cert,
            ca_key,
            bootstrap_auth_token,
            alt_names: self.alt_names,
            self_host_kubelet: self.self_host_kubelet,
            self_hosted_etcd: self.self_hosted_etcd,
            cloud_provider: self.cloud_provider.filter(|p| !p.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_fill_empty_file() {
        let conf = RenderConfigFile::default().into_asset_config().unwrap();
        assert_eq!(conf.api_servers.len(), 1);
        assert_eq!(conf.api_servers[0].as_str(), "https://127.0.0.1:443");
        assert_eq!(conf.etcd_servers[0].as_str(), DEFAULT_ETCD_SERVER);
        assert_eq!(conf.bootstrap_auth_token.len(), 32);
        assert!(conf.ca_cert.is_none() && conf.ca_key.is_none());
        assert!(conf.cloud_provider.is_none());
    }

    #[test]
    fn generated_tokens_differ() {
        assert_ne!(
            generate_bootstrap_token().unwrap(),
            generate_bootstrap_token().unwrap()
        );
    }

    #[test]
    fn server_urls_render_as_written() {
        for raw in [
            "https://10.0.0.1:443",
            "https://10.0.0.1:6443",
            "http://10.0.0.2:80",
            "https://lb.example.com",
            "https://lb.example.com/k8s/",
        ] {
            let server: ServerUrl = raw.parse().unwrap();
            assert_eq!(server.as_str(), raw);
            assert_eq!(server.to_string(), raw);
        }
        let server = ServerUrl::parse("https://10.0.0.1:443").unwrap();
        assert_eq!(server.url().port_or_known_default(), Some(443));
    }

    #[test]
    fn default_ports_survive_config_loading() {
        let file = RenderConfigFile {
            api_servers: vec!["https://10.0.0.1:443".to_string()],
            etcd_servers: vec!["http://10.0.0.2:80".to_string()],
            ..Default::default()
        };
        let conf = file.into_asset_config().unwrap();
        assert_eq!(conf.first_api_server().unwrap().as_str(), "https://10.0.0.1:443");
        assert_eq!(conf.etcd_servers[0].as_str(), "http://10.0.0.2:80");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let file = RenderConfigFile {
            api_servers: vec!["not a url".to_string()],
            ..Default::default()
        };
        let err = file.into_asset_config().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("render.json");
        let path = path.to_str().unwrap();

        let file = RenderConfigFile {
            etcd_servers: vec!["http://10.0.0.2:2379".to_string()],
            api_servers: vec!["https://10.0.0.1:6443".to_string()],
            bootstrap_auth_token: Some("abc123".to_string()),
            alt_names: "DNS=kubernetes,IP=10.0.0.1".parse().unwrap(),
            self_host_kubelet: true,
            cloud_provider: Some("aws".to_string()),
            ..Default::default()
        };
        file.save_to_file(path).unwrap();

        let loaded = RenderConfigFile::load_from_file(path).unwrap();
        assert_eq!(loaded, file);

        let conf = loaded.into_asset_config().unwrap();
        assert_eq!(conf.bootstrap_auth_token, "abc123");
        assert!(conf.self_host_kubelet);
        assert!(!conf.self_hosted_etcd);
        assert_eq!(conf.cloud_provider.as_deref(), Some("aws"));
    }

    #[test]
    fn missing_ca_file_is_reported() {
        let file = RenderConfigFile {
            ca_certificate_path: Some("/nonexistent/ca.crt".to_string()),
            ..Default::default()
        };
        assert!(file.into_asset_config().is_err());
    }
}
