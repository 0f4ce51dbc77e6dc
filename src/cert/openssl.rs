// src/cert/openssl.rs
use super::types::{AltName, CertificateConfig, CertificateType};
use openssl::{
    asn1::Asn1Time,
    bn::{BigNum, MsbOption},
    error::ErrorStack,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, PKeyRef, Private},
    rsa::Rsa,
    x509::{
        extension::{
            AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
            SubjectAlternativeName, SubjectKeyIdentifier,
        },
        X509Builder, X509Name, X509NameBuilder, X509Ref, X509,
    },
};
use std::{fmt, io};

#[derive(Debug)]
pub enum CertError {
    // CA material missing half of the pair, or the key does not match the certificate.
    Config(String),
    Signing(String),
    Parse(String),
    OpenSsl(ErrorStack),
}

impl fmt::Display for CertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(s) => write!(f, "CA configuration error: {}", s),
            Self::Signing(s) => write!(f, "certificate signing error: {}", s),
            Self::Parse(s) => write!(f, "certificate parse error: {}", s),
            Self::OpenSsl(e) => write!(f, "OpenSSL error: {}", e),
        }
    }
}

impl std::error::Error for CertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::OpenSsl(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ErrorStack> for CertError {
    fn from(error: ErrorStack) -> Self {
        CertError::OpenSsl(error)
    }
}

impl From<CertError> for io::Error {
    fn from(error: CertError) -> Self {
        let kind = match error {
            CertError::Config(_) | CertError::Parse(_) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, error.to_string())
    }
}

pub fn generate_private_key(key_size: u32) -> Result<PKey<Private>, CertError> {
    let rsa = Rsa::generate(key_size)?;
    Ok(PKey::from_rsa(rsa)?)
}

// PKCS#1 (`RSA PRIVATE KEY`)
pub fn private_key_to_pem(key: &PKeyRef<Private>) -> Result<Vec<u8>, CertError> {
    Ok(key.rsa()?.private_key_to_pem()?)
}

// SubjectPublicKeyInfo (`PUBLIC KEY`)
pub fn public_key_to_pem(key: &PKeyRef<Private>) -> Result<Vec<u8>, CertError> {
    Ok(key.public_key_to_pem()?)
}

fn subject_name(config: &CertificateConfig) -> Result<X509Name, CertError> {
    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_nid(Nid::COMMONNAME, &config.common_name)?;
    if let Some(org) = &config.organization {
        name.append_entry_by_nid(Nid::ORGANIZATIONNAME, org)?;
    }
    Ok(name.build())
}

fn base_builder(config: &CertificateConfig, key: &PKeyRef<Private>) -> Result<X509Builder, CertError> {
    let name = subject_name(config)?;
    let mut serial = BigNum::new()?;
    serial.rand(128, MsbOption::MAYBE_ZERO, false)?;

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    let serial = serial.to_asn1_integer()?;
    builder.set_serial_number(&serial)?;
    builder.set_subject_name(&name)?;
    builder.set_pubkey(key)?;
    let not_before = Asn1Time::days_from_now(0)?;
    let not_after = Asn1Time::days_from_now(config.validity_days)?;
    builder.set_not_before(&not_before)?;
    builder.set_not_after(&not_after)?;
    Ok(builder)
}

fn key_usage_extension(config: &CertificateConfig) -> Result<Option<KeyUsage>, CertError> {
    if config.key_usage.is_empty() {
        return Ok(None);
    }
    let mut usage = KeyUsage::new();
    for entry in &config.key_usage {
        match entry.as_str() {
            "critical" => usage.critical(),
            "digitalSignature" => usage.digital_signature(),
            "keyEncipherment" => usage.key_encipherment(),
            "keyCertSign" => usage.key_cert_sign(),
            "cRLSign" => usage.crl_sign(),
            other => {
                return Err(CertError::Signing(format!(
                    "unsupported key usage {:?} for {}",
                    other, config.common_name
                )))
            }
        };
    }
    Ok(Some(usage))
}

fn extended_key_usage_extension(
    config: &CertificateConfig,
) -> Result<Option<ExtendedKeyUsage>, CertError> {
    if config.extended_key_usage.is_empty() {
        return Ok(None);
    }
    let mut usage = ExtendedKeyUsage::new();
    for entry in &config.extended_key_usage {
        match entry.as_str() {
            "serverAuth" => usage.server_auth(),
            "clientAuth" => usage.client_auth(),
            other => {
                return Err(CertError::Signing(format!(
                    "unsupported extended key usage {:?} for {}",
                    other, config.common_name
                )))
            }
        };
    }
    Ok(Some(usage))
}

pub fn self_signed_ca(config: &CertificateConfig, key: &PKeyRef<Private>) -> Result<X509, CertError> {
    if config.cert_type != CertificateType::KubernetesCA {
        return Err(CertError::Signing(format!(
            "{} is not a CA profile",
            config.common_name
        )));
    }

    let mut builder = base_builder(config, key)?;
    let issuer = subject_name(config)?;
    builder.set_issuer_name(&issuer)?;

    builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
    if let Some(usage) = key_usage_extension(config)? {
        builder.append_extension(usage.build()?)?;
    }
    let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
    builder.append_extension(ski)?;

    builder.sign(key, MessageDigest::sha256())?;
    Ok(builder.build())
}

// SAN holds exactly config.alt_names, nothing implied.
pub fn sign_certificate(
    config: &CertificateConfig,
    key: &PKeyRef<Private>,
    ca_cert: &X509Ref,
    ca_key: &PKeyRef<Private>,
) -> Result<X509, CertError> {
    let mut builder = base_builder(config, key)?;
    builder.set_issuer_name(ca_cert.subject_name())?;

    builder.append_extension(BasicConstraints::new().critical().build()?)?;
    if let Some(usage) = key_usage_extension(config)? {
        builder.append_extension(usage.build()?)?;
    }
    if let Some(usage) = extended_key_usage_extension(config)? {
        builder.append_extension(usage.build()?)?;
    }

    let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(Some(ca_cert), None))?;
    builder.append_extension(ski)?;
    let aki = AuthorityKeyIdentifier::new()
        .keyid(false)
        .issuer(false)
        .build(&builder.x509v3_context(Some(ca_cert), None))?;
    builder.append_extension(aki)?;

    if !config.alt_names.is_empty() {
        let mut san = SubjectAlternativeName::new();
        for name in &config.alt_names {
            match name {
                AltName::Dns(dns) => san.dns(dns),
                AltName::Ip(ip) => san.ip(&ip.to_string()),
            };
        }
        let san = san.build(&builder.x509v3_context(Some(ca_cert), None))?;
        builder.append_extension(san)?;
    }

    builder
        .sign(ca_key, MessageDigest::sha256())
        .map_err(|e| CertError::Signing(format!("{}: {}", config.common_name, e)))?;
    Ok(builder.build())
}
