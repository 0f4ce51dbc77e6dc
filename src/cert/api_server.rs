// src/cert/api_server.rs
use super::types::{AltNames, CertificateConfig};
use super::CertificateType;

pub struct ApiServerCertGenerator {
    alt_names: AltNames,
}

impl ApiServerCertGenerator {
    pub fn new(alt_names: AltNames) -> Self {
        Self { alt_names }
    }

    pub fn get_config(&self) -> CertificateConfig {
        CertificateConfig {
            cert_type: CertificateType::APIServer,
            common_name: "kube-apiserver".to_string(),
            organization: Some("kube-master".to_string()),
            validity_days: 365,
            key_size: 2048,
            alt_names: self.alt_names.to_alt_names(),
            key_usage: vec![
                "critical".to_string(),
                "digitalSignature".to_string(),
                "keyEncipherment".to_string(),
            ],
            extended_key_usage: vec!["serverAuth".to_string(), "clientAuth".to_string()],
        }
    }
}
