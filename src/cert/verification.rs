// src/cert/verification.rs
use super::openssl::CertError;
use super::types::AltNames;
use chrono::{DateTime, TimeZone, Utc};
use openssl::{hash::MessageDigest, x509::X509};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::prelude::{FromDer, GeneralName, ParsedExtension, X509Certificate};

#[derive(Debug, Clone)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub not_after: DateTime<Utc>,
    pub serial: String,
    pub fingerprint: String,
    pub is_ca: bool,
    pub alt_names: AltNames,
}

fn pem_to_der(cert_pem: &[u8]) -> Result<Vec<u8>, CertError> {
    if !cert_pem.starts_with(b"-----BEGIN CERTIFICATE-----") {
        return Err(CertError::Parse("invalid certificate format".to_string()));
    }
    X509::from_pem(cert_pem)
        .and_then(|cert| cert.to_der())
        .map_err(|e| CertError::Parse(e.to_string()))
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(|b| IpAddr::V4(Ipv4Addr::from(b))),
        16 => <[u8; 16]>::try_from(bytes).ok().map(|b| IpAddr::V6(Ipv6Addr::from(b))),
        _ => None,
    }
}

pub fn analyze_certificate(cert_pem: &[u8]) -> Result<CertificateInfo, CertError> {
    let cert_der = pem_to_der(cert_pem)?;
    let (_remainder, cert) =
        X509Certificate::from_der(&cert_der).map_err(|e| CertError::Parse(e.to_string()))?;

    let not_after = Utc
        .timestamp_opt(cert.validity().not_after.timestamp(), 0)
        .single()
        .ok_or_else(|| CertError::Parse("invalid not_after timestamp".to_string()))?;

    let mut is_ca = false;
    let mut alt_names = AltNames::default();
    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => is_ca = bc.ca,
            ParsedExtension::SubjectAlternativeName(san) => {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => alt_names.dns_names.push(dns.to_string()),
                        GeneralName::IPAddress(bytes) => {
                            let ip = ip_from_bytes(bytes).ok_or_else(|| {
                                CertError::Parse(format!(
                                    "malformed IP alt name of {} bytes",
                                    bytes.len()
                                ))
                            })?;
                            alt_names.ips.push(ip);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    Ok(CertificateInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_after,
        serial: hex::encode(cert.raw_serial()),
        fingerprint: hex::encode(openssl::hash::hash(MessageDigest::sha256(), &cert_der)?),
        is_ca,
        alt_names,
    })
}

pub fn decode_alt_names(cert_pem: &[u8]) -> Result<AltNames, CertError> {
    Ok(analyze_certificate(cert_pem)?.alt_names)
}

pub fn verify_signed_by(cert_pem: &[u8], ca_pem: &[u8]) -> Result<bool, CertError> {
    let cert = X509::from_pem(cert_pem).map_err(|e| CertError::Parse(e.to_string()))?;
    let ca = X509::from_pem(ca_pem).map_err(|e| CertError::Parse(e.to_string()))?;
    let ca_key = ca.public_key()?;
    Ok(cert.verify(&ca_key)?)
}
