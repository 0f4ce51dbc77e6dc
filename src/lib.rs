//! Renders the one-time bootstrap bundle for a self-hosted Kubernetes
//! control plane: PKI, kubeconfigs, secrets and manifests, laid out the way
//! the bootstrapper expects them on disk.
//!
//! ```no_run
//! use k8s_bootstrap_assets::{asset, config::RenderConfigFile, utils::logging::ConsoleLogger};
//!
//! let config = RenderConfigFile::default().into_asset_config()?;
//! let mut logger = ConsoleLogger::new(false);
//! let assets = asset::new_default_assets(&config, &mut logger)?;
//! assets.write_files("assets", &mut logger)?;
//! # Ok::<(), std::io::Error>(())
//! ```
pub mod asset;
pub mod cert;
pub mod cluster;
pub mod config;
pub mod kubeconfig;
pub mod utils;
