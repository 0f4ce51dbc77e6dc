use super::{CertificateConfig, CertificateType};

// src/cert/admin.rs
pub struct AdminCertGenerator;

impl AdminCertGenerator {
    pub fn get_config() -> CertificateConfig {
        CertificateConfig {
            cert_type: CertificateType::Admin,
            common_name: "kubelet".to_string(),
            organization: Some("system:masters".to_string()),
            validity_days: 365,
            key_size: 2048,
            alt_names: vec![],
            key_usage: vec![
                "critical".to_string(),
                "digitalSignature".to_string(),
                "keyEncipherment".to_string(),
            ],
            extended_key_usage: vec!["clientAuth".to_string()],
        }
    }
}
