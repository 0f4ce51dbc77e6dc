// src/asset/tls.rs
use super::{
    schema::{
        ASSET_PATH_ADMIN_CERT, ASSET_PATH_ADMIN_KEY, ASSET_PATH_API_SERVER_CERT,
        ASSET_PATH_API_SERVER_KEY, ASSET_PATH_CA_CERT, ASSET_PATH_CA_KEY,
        ASSET_PATH_SERVICE_ACCOUNT_PRIV_KEY, ASSET_PATH_SERVICE_ACCOUNT_PUB_KEY,
    },
    types::{Asset, AssetError, Assets},
};
use crate::cert::{
    AdminCertGenerator, AltNames, ApiServerCertGenerator, CertificateAuthority, KeyPair,
    ServiceAccountGenerator,
};
use crate::utils::logging::Logger;
use openssl::{
    pkey::{PKey, Private},
    x509::X509,
};

fn pair_assets(pair: &KeyPair, key_path: &str, cert_path: &str) -> Result<[Asset; 2], AssetError> {
    Ok([
        Asset::new(key_path, pair.key_pem()?),
        Asset::new(cert_path, pair.cert_pem()?),
    ])
}

/// Builds the PKI chain: CA, API server serving cert, service-account
/// signing keys and the admin client cert. Nothing is returned unless every
/// step succeeds.
pub fn new_tls_assets(
    ca_cert: Option<&X509>,
    ca_key: Option<&PKey<Private>>,
    alt_names: &AltNames,
    logger: &mut dyn Logger,
) -> Result<Assets, AssetError> {
    let ca = CertificateAuthority::from_parts(ca_cert, ca_key, logger)?;

    let api_server = ca.issue(&ApiServerCertGenerator::new(alt_names.clone()).get_config(), logger)?;
    let service_account = ServiceAccountGenerator::new(logger).generate_service_account_keys()?;
    let admin = ca.issue(&AdminCertGenerator::get_config(), logger)?;

    let mut assets = Assets::new();
    for asset in pair_assets(ca.pair(), ASSET_PATH_CA_KEY, ASSET_PATH_CA_CERT)? {
        assets.push(asset);
    }
    for asset in pair_assets(&api_server, ASSET_PATH_API_SERVER_KEY, ASSET_PATH_API_SERVER_CERT)? {
        assets.push(asset);
    }
    assets.push(Asset::new(
        ASSET_PATH_SERVICE_ACCOUNT_PRIV_KEY,
        service_account.private_pem,
    ));
    assets.push(Asset::new(
        ASSET_PATH_SERVICE_ACCOUNT_PUB_KEY,
        service_account.public_pem,
    ));
    for asset in pair_assets(&admin, ASSET_PATH_ADMIN_KEY, ASSET_PATH_ADMIN_CERT)? {
        assets.push(asset);
    }
    Ok(assets)
}
