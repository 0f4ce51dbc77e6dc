// src/asset/derived.rs
use super::{
    schema::{
        self, ASSET_PATH_ADMIN_CERT, ASSET_PATH_ADMIN_KEY, ASSET_PATH_ADMIN_KUBECONFIG,
        ASSET_PATH_API_SERVER_SECRET, ASSET_PATH_BOOTSTRAP_KUBECONFIG, ASSET_PATH_CA_CERT,
        ASSET_PATH_CONTROLLER_MANAGER_SECRET,
    },
    types::{Asset, AssetError, Assets},
};
use crate::config::AssetConfig;
use crate::kubeconfig::{KubeConfigGenerator, Secret};
use std::path::Path;

const SECRET_NAMESPACE: &str = "kube-system";
const API_SERVER_SECRET_NAME: &str = "kube-apiserver";
const CONTROLLER_MANAGER_SECRET_NAME: &str = "kube-controller-manager";
const BOOTSTRAP_USER: &str = "kubelet-bootstrap";
const ADMIN_USER: &str = "admin";

pub type BuildFn = fn(&Assets, &AssetConfig) -> Result<Asset, AssetError>;

/// An asset assembled from others already in the collection.
///
/// Inputs are declared in the bundle layout, not here, so the pipeline can
/// order and validate them before anything is built.
#[derive(Clone, Copy)]
pub struct DerivedAsset {
    pub path: &'static str,
    pub build: BuildFn,
}

impl DerivedAsset {
    pub fn requires(&self) -> Result<&'static [&'static str], AssetError> {
        schema::lookup(self.path)
            .map(|spec| spec.requires)
            .ok_or_else(|| AssetError::UnknownAsset(self.path.to_string()))
    }
}

pub const DERIVED_ASSETS: &[DerivedAsset] = &[
    DerivedAsset {
        path: ASSET_PATH_BOOTSTRAP_KUBECONFIG,
        build: new_bootstrap_kubeconfig_asset,
    },
    DerivedAsset {
        path: ASSET_PATH_ADMIN_KUBECONFIG,
        build: new_admin_kubeconfig_asset,
    },
    DerivedAsset {
        path: ASSET_PATH_API_SERVER_SECRET,
        build: new_api_server_secret_asset,
    },
    DerivedAsset {
        path: ASSET_PATH_CONTROLLER_MANAGER_SECRET,
        build: new_controller_manager_secret_asset,
    },
];

fn api_server(config: &AssetConfig) -> Result<String, AssetError> {
    config
        .first_api_server()
        .map(|server| server.as_str().to_string())
        .ok_or_else(|| AssetError::Config("no API servers configured".to_string()))
}

pub fn new_bootstrap_kubeconfig_asset(
    assets: &Assets,
    config: &AssetConfig,
) -> Result<Asset, AssetError> {
    let ca = assets.get(ASSET_PATH_CA_CERT)?;
    let kubeconfig = KubeConfigGenerator::new(api_server(config)?, ca.data())
        .with_token(BOOTSTRAP_USER, &config.bootstrap_auth_token);
    Ok(Asset::new(ASSET_PATH_BOOTSTRAP_KUBECONFIG, kubeconfig.to_yaml()?))
}

pub fn new_admin_kubeconfig_asset(
    assets: &Assets,
    config: &AssetConfig,
) -> Result<Asset, AssetError> {
    let ca = assets.get(ASSET_PATH_CA_CERT)?;
    let cert = assets.get(ASSET_PATH_ADMIN_CERT)?;
    let key = assets.get(ASSET_PATH_ADMIN_KEY)?;
    let kubeconfig = KubeConfigGenerator::new(api_server(config)?, ca.data())
        .with_client_certificate(ADMIN_USER, cert.data(), key.data());
    Ok(Asset::new(ASSET_PATH_ADMIN_KUBECONFIG, kubeconfig.to_yaml()?))
}

// Secret keys are the basenames of the files they wrap.
fn secret_asset(assets: &Assets, path: &'static str, name: &str) -> Result<Asset, AssetError> {
    let inputs = schema::lookup(path)
        .map(|spec| spec.requires)
        .ok_or_else(|| AssetError::UnknownAsset(path.to_string()))?;

    let mut secret = Secret::opaque(name, SECRET_NAMESPACE);
    for input in inputs {
        let asset = assets.get(input)?;
        let key = Path::new(input)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AssetError::Encoding(format!("no file name in {}", input)))?;
        secret.insert(key, asset.data());
    }
    Ok(Asset::new(path, secret.to_yaml()?))
}

pub fn new_api_server_secret_asset(
    assets: &Assets,
    _config: &AssetConfig,
) -> Result<Asset, AssetError> {
    secret_asset(assets, ASSET_PATH_API_SERVER_SECRET, API_SERVER_SECRET_NAME)
}

pub fn new_controller_manager_secret_asset(
    assets: &Assets,
    _config: &AssetConfig,
) -> Result<Asset, AssetError> {
    secret_asset(
        assets,
        ASSET_PATH_CONTROLLER_MANAGER_SECRET,
        CONTROLLER_MANAGER_SECRET_NAME,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::schema::*;
    use crate::asset::tls::new_tls_assets;
    use crate::cert::AltNames;
    use crate::kubeconfig::KubeConfig;
    use crate::utils::logging::BufferLogger;

    fn config() -> AssetConfig {
        AssetConfig {
            etcd_servers: vec!["http://10.0.0.2:2379".parse().unwrap()],
            api_servers: vec![
                "https://10.0.0.1:6443".parse().unwrap(),
                "https://10.0.0.9:6443".parse().unwrap(),
            ],
            ca_cert: None,
            ca_key: None,
            bootstrap_auth_token: "abc123".to_string(),
            alt_names: AltNames::default(),
            self_host_kubelet: false,
            self_hosted_etcd: false,
            cloud_provider: None,
        }
    }

    fn tls() -> Assets {
        new_tls_assets(None, None, &AltNames::default(), &mut BufferLogger::new()).unwrap()
    }

    #[test]
    fn every_derived_asset_is_in_the_layout() {
        for derived in DERIVED_ASSETS {
            let spec = lookup(derived.path).unwrap();
            assert_eq!(spec.stage, AssetStage::Derived);
            assert_eq!(derived.requires().unwrap(), spec.requires);
        }
        assert_eq!(DERIVED_ASSETS.len(), stage(AssetStage::Derived).count());
    }

    #[test]
    fn bootstrap_kubeconfig_needs_the_ca() {
        let mut assets = Assets::new();
        match new_bootstrap_kubeconfig_asset(&assets, &config()) {
            Err(AssetError::NotFound(name)) => assert_eq!(name, ASSET_PATH_CA_CERT),
            Err(other) => panic!("expected NotFound, got {:?}", other),
            Ok(_) => panic!("built a kubeconfig without a CA"),
        }

        assets.append(tls());
        let asset = new_bootstrap_kubeconfig_asset(&assets, &config()).unwrap();
        let kubeconfig = KubeConfig::from_yaml(asset.data()).unwrap();

        assert_eq!(
            kubeconfig.current_ca().unwrap(),
            assets.get(ASSET_PATH_CA_CERT).unwrap().data()
        );
        assert_eq!(kubeconfig.current_server(), Some("https://10.0.0.1:6443"));
        assert_eq!(
            kubeconfig.current_user().unwrap().token.as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn admin_kubeconfig_embeds_client_pair() {
        let assets = tls();
        let asset = new_admin_kubeconfig_asset(&assets, &config()).unwrap();
        let kubeconfig = KubeConfig::from_yaml(asset.data()).unwrap();
        let user = kubeconfig.current_user().unwrap();

        assert!(user.token.is_none());
        assert!(user.client_certificate_data.is_some());
        assert!(user.client_key_data.is_some());
        assert_eq!(kubeconfig.contexts[0].context.user, "admin");
    }

    #[test]
    fn kubeconfigs_need_an_api_server() {
        let mut cfg = config();
        cfg.api_servers.clear();
        assert!(matches!(
            new_bootstrap_kubeconfig_asset(&tls(), &cfg),
            Err(AssetError::Config(_))
        ));
    }

    #[test]
    fn secrets_wrap_their_inputs_by_basename() {
        let assets = tls();

        let api = Secret::from_yaml(
            new_api_server_secret_asset(&assets, &config())
                .unwrap()
                .data(),
        )
        .unwrap();
        assert_eq!(api.metadata.name, "kube-apiserver");
        assert_eq!(api.metadata.namespace, "kube-system");
        let keys: Vec<&str> = api.data.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["apiserver.crt", "apiserver.key", "ca.crt", "service-account.key"]
        );
        assert_eq!(
            api.decoded("apiserver.key").unwrap(),
            assets.get(ASSET_PATH_API_SERVER_KEY).unwrap().data()
        );

        let cm = Secret::from_yaml(
            new_controller_manager_secret_asset(&assets, &config())
                .unwrap()
                .data(),
        )
        .unwrap();
        assert_eq!(cm.metadata.name, "kube-controller-manager");
        assert_eq!(cm.data.len(), 1);
        assert_eq!(
            cm.decoded("service-account.key").unwrap(),
            assets.get(ASSET_PATH_SERVICE_ACCOUNT_PRIV_KEY).unwrap().data()
        );
    }
}
