// src/asset/pipeline.rs
use super::{
    derived::{DerivedAsset, DERIVED_ASSETS},
    manifests::{new_dynamic_assets, new_static_assets},
    tls::new_tls_assets,
    types::{AssetError, Assets},
};
use crate::config::AssetConfig;
use crate::utils::logging::Logger;

/// Builds the complete bootstrap bundle for `config`.
///
/// Static and dynamic manifests come first, then the PKI, then every derived
/// credential in dependency order. The first error aborts the run and no
/// assets are returned. Nothing is written to disk; hand the result to
/// [`Assets::write_files`].
pub fn new_default_assets(
    config: &AssetConfig,
    logger: &mut dyn Logger,
) -> Result<Assets, AssetError> {
    logger.log("Rendering static manifests");
    let mut assets = new_static_assets(config.self_host_kubelet, config.self_hosted_etcd)?;

    logger.log("Rendering dynamic manifests");
    assets.append(new_dynamic_assets(config)?);

    logger.log("Generating TLS assets");
    assets.append(new_tls_assets(
        config.ca_cert.as_ref(),
        config.ca_key.as_ref(),
        &config.alt_names,
        logger,
    )?);

    logger.log("Assembling kubeconfigs and secrets");
    materialize_derived(&mut assets, DERIVED_ASSETS, config, logger)?;

    assets.ensure_unique()?;
    logger.debug_log(&format!("Bundle holds {} assets", assets.len()));
    Ok(assets)
}

/// Appends every derived asset once all of its inputs are in `assets`.
///
/// Each declared input must either already be present or be produced by
/// another entry of `derived`; anything else is reported before a single
/// asset is built. Among ready entries the declaration order wins.
pub fn materialize_derived(
    assets: &mut Assets,
    derived: &[DerivedAsset],
    config: &AssetConfig,
    logger: &mut dyn Logger,
) -> Result<(), AssetError> {
    let pending = derived
        .iter()
        .map(|entry| entry.requires().map(|requires| (*entry, requires)))
        .collect::<Result<Vec<Pending>, AssetError>>()?;
    materialize_pending(assets, pending, config, logger)
}

type Pending = (DerivedAsset, &'static [&'static str]);

fn materialize_pending(
    assets: &mut Assets,
    mut pending: Vec<Pending>,
    config: &AssetConfig,
    logger: &mut dyn Logger,
) -> Result<(), AssetError> {
    for (entry, requires) in &pending {
        for input in requires.iter() {
            let produced = pending.iter().any(|(d, _)| d.path == *input);
            if !assets.contains(input) && !produced {
                return Err(AssetError::UnresolvedDependency {
                    asset: entry.path.to_string(),
                    missing: input.to_string(),
                });
            }
        }
    }

    while !pending.is_empty() {
        let ready = pending
            .iter()
            .position(|(_, requires)| requires.iter().all(|input| assets.contains(input)));
        let Some(index) = ready else {
            return Err(AssetError::DependencyCycle(
                pending.iter().map(|(d, _)| d.path.to_string()).collect(),
            ));
        };

        let (entry, _) = pending.remove(index);
        logger.debug_log(&format!("Building {}", entry.path));
        let asset = (entry.build)(assets, config)?;
        assets.push(asset);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::schema::*;
    use crate::asset::derived::new_bootstrap_kubeconfig_asset;
    use crate::asset::types::Asset;
    use crate::cert::AltNames;
    use crate::utils::logging::BufferLogger;

    fn config() -> AssetConfig {
        AssetConfig {
            etcd_servers: vec!["http://10.0.0.2:2379".parse().unwrap()],
            api_servers: vec!["https://10.0.0.1:6443".parse().unwrap()],
            ca_cert: None,
            ca_key: None,
            bootstrap_auth_token: "abc123".to_string(),
            alt_names: "IP=10.0.0.1".parse().unwrap(),
            self_host_kubelet: false,
            self_hosted_etcd: false,
            cloud_provider: None,
        }
    }

    #[test]
    fn bundle_matches_the_layout() {
        for (kubelet, etcd) in [(false, false), (true, true)] {
            let mut cfg = config();
            cfg.self_host_kubelet = kubelet;
            cfg.self_hosted_etcd = etcd;
            let assets = new_default_assets(&cfg, &mut BufferLogger::new()).unwrap();
            assert_eq!(assets.names(), expected_paths(kubelet, etcd));
        }
    }

    #[test]
    fn derived_assets_wait_for_their_inputs() {
        // declared ahead of the entry that produces its input
        let fake_ca = DerivedAsset {
            path: ASSET_PATH_CA_CERT,
            build: |_, _| Ok(Asset::new(ASSET_PATH_CA_CERT, b"ca".to_vec())),
        };
        let bootstrap = DerivedAsset {
            path: ASSET_PATH_BOOTSTRAP_KUBECONFIG,
            build: new_bootstrap_kubeconfig_asset,
        };
        let mut assets = Assets::new();
        materialize_derived(
            &mut assets,
            &[bootstrap, fake_ca],
            &config(),
            &mut BufferLogger::new(),
        )
        .unwrap();
        assert_eq!(
            assets.names(),
            vec![ASSET_PATH_CA_CERT, ASSET_PATH_BOOTSTRAP_KUBECONFIG]
        );
    }

    #[test]
    fn undeclared_input_is_reported_before_building() {
        let mut assets = Assets::new();
        let err = materialize_derived(
            &mut assets,
            DERIVED_ASSETS,
            &config(),
            &mut BufferLogger::new(),
        )
        .unwrap_err();
        match err {
            AssetError::UnresolvedDependency { asset, missing } => {
                assert_eq!(asset, ASSET_PATH_BOOTSTRAP_KUBECONFIG);
                assert_eq!(missing, ASSET_PATH_CA_CERT);
            }
            other => panic!("expected UnresolvedDependency, got {:?}", other),
        }
        assert!(assets.is_empty());
    }

    #[test]
    fn unknown_derived_asset_is_rejected() {
        let stray = DerivedAsset {
            path: "auth/stray",
            build: |_, _| Ok(Asset::new("auth/stray", Vec::new())),
        };
        let err = materialize_derived(
            &mut Assets::new(),
            &[stray],
            &config(),
            &mut BufferLogger::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AssetError::UnknownAsset(name) if name == "auth/stray"));
    }

    #[test]
    fn mutual_inputs_are_a_cycle() {
        let admin = DerivedAsset {
            path: ASSET_PATH_ADMIN_KUBECONFIG,
            build: |_, _| Ok(Asset::new(ASSET_PATH_ADMIN_KUBECONFIG, Vec::new())),
        };
        let bootstrap = DerivedAsset {
            path: ASSET_PATH_BOOTSTRAP_KUBECONFIG,
            build: |_, _| Ok(Asset::new(ASSET_PATH_BOOTSTRAP_KUBECONFIG, Vec::new())),
        };
        const NEEDS_BOOTSTRAP: &[&str] = &[ASSET_PATH_BOOTSTRAP_KUBECONFIG];
        const NEEDS_ADMIN: &[&str] = &[ASSET_PATH_ADMIN_KUBECONFIG];
        let pending = vec![(admin, NEEDS_BOOTSTRAP), (bootstrap, NEEDS_ADMIN)];

        let mut assets = Assets::new();
        let err = materialize_pending(&mut assets, pending, &config(), &mut BufferLogger::new())
            .unwrap_err();
        match err {
            AssetError::DependencyCycle(paths) => assert_eq!(
                paths,
                vec![ASSET_PATH_ADMIN_KUBECONFIG, ASSET_PATH_BOOTSTRAP_KUBECONFIG]
            ),
            other => panic!("expected DependencyCycle, got {:?}", other),
        }
        assert!(assets.is_empty());
    }

    #[test]
    fn build_failure_aborts_the_run() {
        let mut cfg = config();
        cfg.api_servers.clear();
        let err = new_default_assets(&cfg, &mut BufferLogger::new()).unwrap_err();
        assert!(matches!(err, AssetError::Config(_)));
    }

    #[test]
    fn logs_each_stage() {
        let mut logger = BufferLogger::new();
        new_default_assets(&config(), &mut logger).unwrap();
        assert!(logger.lines.iter().any(|l| l == "Generating TLS assets"));
        assert!(logger.lines.iter().any(|l| l == "Assembling kubeconfigs and secrets"));
    }

    #[test]
    fn supplied_alt_names_reach_the_certificate() {
        let assets = new_default_assets(&config(), &mut BufferLogger::new()).unwrap();
        let decoded = crate::cert::verification::decode_alt_names(
            assets.get(ASSET_PATH_API_SERVER_CERT).unwrap().data(),
        )
        .unwrap();
        assert_eq!(decoded, AltNames::new(vec![], vec!["10.0.0.1".parse().unwrap()]));
    }
}
