// cert/types.rs
use serde::{Deserialize, Serialize};
use std::{fmt, io, net::IpAddr, str::FromStr};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CertificateType {
    KubernetesCA,
    APIServer,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AltName {
    Dns(String),
    Ip(IpAddr),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AltNames {
    #[serde(default)]
    pub dns_names: Vec<String>,
    #[serde(default)]
    pub ips: Vec<IpAddr>,
}

impl AltNames {
    pub fn new(dns_names: Vec<String>, ips: Vec<IpAddr>) -> Self {
        Self { dns_names, ips }
    }

    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ips.is_empty()
    }

    // DNS entries first, then IPs, each in configured order.
    pub fn to_alt_names(&self) -> Vec<AltName> {
        self.dns_names
            .iter()
            .cloned()
            .map(AltName::Dns)
            .chain(self.ips.iter().copied().map(AltName::Ip))
            .collect()
    }
}

impl fmt::Display for AltNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .dns_names
            .iter()
            .map(|d| format!("DNS={}", d))
            .chain(self.ips.iter().map(|ip| format!("IP={}", ip)))
            .collect();
        write!(f, "{}", entries.join(","))
    }
}

// DNS=name,IP=addr,...
impl FromStr for AltNames {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut names = AltNames::default();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (kind, value) = entry.split_once('=').ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid alt name {:?}, expected DNS=<name> or IP=<addr>", entry),
                )
            })?;
            match kind {
                "DNS" => names.dns_names.push(value.to_string()),
                "IP" => {
                    let ip = value.parse::<IpAddr>().map_err(|e| {
                        io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("invalid IP alt name {:?}: {}", value, e),
                        )
                    })?;
                    names.ips.push(ip);
                }
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("unknown alt name type {:?}", other),
                    ))
                }
            }
        }
        Ok(names)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateConfig {
    pub cert_type: CertificateType,
    pub common_name: String,
    pub organization: Option<String>,
    pub validity_days: u32,
    pub key_size: u32,
    pub alt_names: Vec<AltName>,
    pub key_usage: Vec<String>,
    pub extended_key_usage: Vec<String>,
}
