// src/asset/manifests.rs
use super::{
    schema::{self, AssetStage, ASSET_PATH_BOOTSTRAP_AUTH_TOKEN},
    types::{Asset, AssetError, Assets},
};
use crate::config::AssetConfig;
use include_dir::{include_dir, Dir};
use minijinja::{context, Environment, UndefinedBehavior, Value};

static TEMPLATES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Renders the embedded manifest templates.
///
/// Every templated entry of the bundle layout is registered under its asset
/// path. Undefined variables are errors, so a template that drifts from the
/// context it is given fails instead of emitting an empty flag.
pub struct ManifestRenderer {
    env: Environment<'static>,
}

impl ManifestRenderer {
    pub fn new() -> Result<Self, AssetError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        for spec in schema::ASSET_SCHEMA.iter().filter(|s| s.role.is_templated()) {
            let source = TEMPLATES
                .get_file(spec.path)
                .and_then(|f| f.contents_utf8())
                .ok_or_else(|| {
                    AssetError::Template(format!("no embedded template for {}", spec.path))
                })?;
            env.add_template(spec.path, source)?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, path: &str, ctx: Value) -> Result<Asset, AssetError> {
        let body = self.env.get_template(path)?.render(ctx)?;
        Ok(Asset::new(path, body))
    }

    fn render_stage(
        &self,
        stage: AssetStage,
        self_host_kubelet: bool,
        self_hosted_etcd: bool,
        ctx: &Value,
    ) -> Result<Assets, AssetError> {
        schema::stage(stage)
            .filter(|s| s.role.is_templated())
            .filter(|s| s.when.holds(self_host_kubelet, self_hosted_etcd))
            .map(|s| self.render(s.path, ctx.clone()))
            .collect()
    }
}

pub fn new_static_assets(
    self_host_kubelet: bool,
    self_hosted_etcd: bool,
) -> Result<Assets, AssetError> {
    let ctx = context! {
        self_host_kubelet => self_host_kubelet,
        self_hosted_etcd => self_hosted_etcd,
    };
    ManifestRenderer::new()?.render_stage(AssetStage::Static, self_host_kubelet, self_hosted_etcd, &ctx)
}

/// Control-plane manifests parameterised by the configuration, followed by
/// the bootstrap token.
pub fn new_dynamic_assets(config: &AssetConfig) -> Result<Assets, AssetError> {
    if config.etcd_servers.is_empty() {
        return Err(AssetError::Config("no etcd servers configured".to_string()));
    }
    let etcd_servers: Vec<&str> = config.etcd_servers.iter().map(|s| s.as_str()).collect();
    let api_servers: Vec<&str> = config.api_servers.iter().map(|s| s.as_str()).collect();
    let ctx = context! {
        etcd_servers => etcd_servers.join(","),
        api_servers => api_servers,
        cloud_provider => config.cloud_provider.clone(),
        self_host_kubelet => config.self_host_kubelet,
        self_hosted_etcd => config.self_hosted_etcd,
    };

    let mut assets = ManifestRenderer::new()?.render_stage(
        AssetStage::Dynamic,
        config.self_host_kubelet,
        config.self_hosted_etcd,
        &ctx,
    )?;

    assets.push(Asset::new(
        ASSET_PATH_BOOTSTRAP_AUTH_TOKEN,
        config.bootstrap_auth_token.as_bytes(),
    ));
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::schema::*;
    use crate::cert::AltNames;

    fn config() -> AssetConfig {
        AssetConfig {
            etcd_servers: vec![
                "http://10.0.0.2:2379".parse().unwrap(),
                "http://10.0.0.3:2379".parse().unwrap(),
            ],
            api_servers: vec!["https://10.0.0.1:6443".parse().unwrap()],
            ca_cert: None,
            ca_key: None,
            bootstrap_auth_token: "abc123".to_string(),
            alt_names: AltNames::default(),
            self_host_kubelet: false,
            self_hosted_etcd: false,
            cloud_provider: None,
        }
    }

    fn text(assets: &Assets, path: &str) -> String {
        String::from_utf8(assets.get(path).unwrap().data().to_vec()).unwrap()
    }

    #[test]
    fn every_templated_entry_has_a_template() {
        assert!(ManifestRenderer::new().is_ok());
    }

    #[test]
    fn static_set_follows_flags() {
        let plain = new_static_assets(false, false).unwrap();
        assert!(!plain.contains(ASSET_PATH_KUBELET));
        assert!(!plain.contains(ASSET_PATH_ETCD_CLUSTER));
        assert!(plain.contains(ASSET_PATH_ETCD_OPERATOR));
        assert!(plain.contains(ASSET_PATH_ETCD_SVC));
        assert!(plain.contains(ASSET_PATH_EXTRA_KUBELET_APPROVER));

        let hosted = new_static_assets(true, true).unwrap();
        assert_eq!(hosted.len(), plain.len() + 2);
        assert_eq!(hosted.names()[0], ASSET_PATH_KUBELET);
    }

    #[test]
    fn static_render_is_deterministic() {
        assert_eq!(
            new_static_assets(true, false).unwrap(),
            new_static_assets(true, false).unwrap()
        );
    }

    #[test]
    fn dynamic_set_renders_configuration() {
        let assets = new_dynamic_assets(&config()).unwrap();
        assert_eq!(
            assets.names(),
            vec![
                ASSET_PATH_API_SERVER,
                ASSET_PATH_CONTROLLER_MANAGER,
                ASSET_PATH_CONTROLLER_MANAGER_DISRUPTION,
                ASSET_PATH_SCHEDULER,
                ASSET_PATH_SCHEDULER_DISRUPTION,
                ASSET_PATH_BOOTSTRAP_AUTH_TOKEN,
            ]
        );

        let api = text(&assets, ASSET_PATH_API_SERVER);
        assert!(api.contains("--etcd-servers=http://10.0.0.2:2379,http://10.0.0.3:2379\n"));
        assert!(!api.contains("--cloud-provider"));
        assert!(!api.contains("{%"));
        assert_eq!(assets.get(ASSET_PATH_BOOTSTRAP_AUTH_TOKEN).unwrap().data(), b"abc123");
    }

    #[test]
    fn cloud_provider_flag_is_optional() {
        let mut cfg = config();
        cfg.cloud_provider = Some("aws".to_string());
        let assets = new_dynamic_assets(&cfg).unwrap();
        assert!(text(&assets, ASSET_PATH_API_SERVER).contains("- --cloud-provider=aws\n"));
        assert!(text(&assets, ASSET_PATH_CONTROLLER_MANAGER).contains("- --cloud-provider=aws\n"));
    }

    #[test]
    fn dynamic_set_needs_etcd() {
        let mut cfg = config();
        cfg.etcd_servers.clear();
        assert!(matches!(new_dynamic_assets(&cfg), Err(AssetError::Config(_))));
    }
}
