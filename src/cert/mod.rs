// src/cert/mod.rs
mod admin;
mod api_server;
mod ca;
mod openssl;
mod service_account;
mod types;
pub mod verification;

pub use admin::AdminCertGenerator;
pub use api_server::ApiServerCertGenerator;
pub use ca::{load_ca_cert, load_ca_key, root_ca_config, CertificateAuthority, KeyPair};
pub use self::openssl::CertError;
pub use service_account::{ServiceAccountGenerator, ServiceAccountKeys};
pub use types::{AltName, AltNames, CertificateConfig, CertificateType};
