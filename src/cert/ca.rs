use super::{
    openssl::{
        generate_private_key, private_key_to_pem, self_signed_ca, sign_certificate, CertError,
    },
    types::{CertificateConfig, CertificateType},
};
use crate::utils::logging::Logger;
use openssl::{
    pkey::{PKey, Private},
    x509::X509,
};
use std::{fs, path::Path};

pub fn load_ca_cert(path: &Path) -> Result<X509, CertError> {
    let pem = fs::read(path)
        .map_err(|e| CertError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    X509::from_pem(&pem).map_err(|e| CertError::Parse(format!("{}: {}", path.display(), e)))
}

pub fn load_ca_key(path: &Path) -> Result<PKey<Private>, CertError> {
    let pem = fs::read(path)
        .map_err(|e| CertError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    PKey::private_key_from_pem(&pem)
        .map_err(|e| CertError::Parse(format!("{}: {}", path.display(), e)))
}

pub fn root_ca_config() -> CertificateConfig {
    CertificateConfig {
        cert_type: CertificateType::KubernetesCA,
        common_name: "kube-ca".to_string(),
        organization: None,
        validity_days: 3650,
        key_size: 2048,
        alt_names: vec![],
        key_usage: vec![
            "critical".to_string(),
            "digitalSignature".to_string(),
            "keyEncipherment".to_string(),
            "keyCertSign".to_string(),
            "cRLSign".to_string(),
        ],
        extended_key_usage: vec![],
    }
}

#[derive(Clone)]
pub struct KeyPair {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl KeyPair {
    pub fn cert_pem(&self) -> Result<Vec<u8>, CertError> {
        Ok(self.cert.to_pem()?)
    }

    pub fn key_pem(&self) -> Result<Vec<u8>, CertError> {
        private_key_to_pem(&self.key)
    }
}

#[derive(Clone)]
pub struct CertificateAuthority {
    pair: KeyPair,
}

impl CertificateAuthority {
    pub fn generate(logger: &mut dyn Logger) -> Result<Self, CertError> {
        logger.log("Generating self-signed CA certificate...");
        let config = root_ca_config();
        let key = generate_private_key(config.key_size)?;
        let cert = self_signed_ca(&config, &key)?;
        logger.debug_log(&format!("Generated CA {}", config.common_name));
        Ok(Self {
            pair: KeyPair { cert, key },
        })
    }

    // The only check is that the key belongs to the certificate.
    pub fn from_pair(cert: X509, key: PKey<Private>) -> Result<Self, CertError> {
        let public = cert.public_key()?;
        if !public.public_eq(&key) {
            return Err(CertError::Config(
                "CA private key does not match the CA certificate".to_string(),
            ));
        }
        Ok(Self {
            pair: KeyPair { cert, key },
        })
    }

    pub fn from_parts(
        cert: Option<&X509>,
        key: Option<&PKey<Private>>,
        logger: &mut dyn Logger,
    ) -> Result<Self, CertError> {
        match (cert, key) {
            (Some(cert), Some(key)) => {
                logger.log("Using supplied CA certificate and key");
                Self::from_pair(cert.clone(), key.clone())
            }
            (None, None) => Self::generate(logger),
            (Some(_), None) => Err(CertError::Config(
                "CA certificate supplied without its private key".to_string(),
            )),
            (None, Some(_)) => Err(CertError::Config(
                "CA private key supplied without its certificate".to_string(),
            )),
        }
    }

    pub fn pair(&self) -> &KeyPair {
        &self.pair
    }

    pub fn issue(&self, config: &CertificateConfig, logger: &mut dyn Logger) -> Result<KeyPair, CertError> {
        logger.log(&format!("Issuing certificate for {}", config.common_name));
        let key = generate_private_key(config.key_size)?;
        let cert = sign_certificate(config, &key, &self.pair.cert, &self.pair.key)?;
        logger.debug_log(&format!(
            "Signed {:?} certificate with {} alt names",
            config.cert_type,
            config.alt_names.len()
        ));
        Ok(KeyPair { cert, key })
    }
}
