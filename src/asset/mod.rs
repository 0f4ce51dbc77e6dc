// src/asset/mod.rs
pub mod derived;
pub mod manifests;
pub mod pipeline;
pub mod schema;
pub mod tls;
mod types;

pub use derived::{DerivedAsset, DERIVED_ASSETS};
pub use manifests::{new_dynamic_assets, new_static_assets, ManifestRenderer};
pub use pipeline::{materialize_derived, new_default_assets};
pub use tls::new_tls_assets;
pub use types::{Asset, AssetError, Assets};
