mod types;

pub use types::{
    generate_bootstrap_token, AssetConfig, RenderConfigFile, ServerUrl, DEFAULT_API_SERVER,
    DEFAULT_ETCD_SERVER,
};
