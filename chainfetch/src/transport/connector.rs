//! Connector and TLS setup for the hyper transport.
//!
//! # Feature Flags
//!
//! HTTPS needs both a crypto provider and root certificates:
//!
//! - Crypto providers: `tls-ring` (default with `tls`) or `tls-aws-lc`
//! - Root certificates: `tls-native-roots` (default with `tls`) or
//!   `tls-webpki-roots`
//!
//! Without a provider feature, a process-wide provider installed with
//! `rustls::crypto::CryptoProvider::install_default()` is used. When no TLS
//! configuration can be built at all, the transport falls back to plain HTTP.

use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::{ClientConfig, ConfigBuilder, RootCertStore, WantsVerifier};

/// Returns true if both a crypto provider and root certificates are compiled in.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"))
        && cfg!(any(
            feature = "tls-native-roots",
            feature = "tls-webpki-roots"
        ))
}

#[cfg(feature = "tls-ring")]
fn provider_builder() -> Option<ConfigBuilder<ClientConfig, WantsVerifier>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .ok()
}

#[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
fn provider_builder() -> Option<ConfigBuilder<ClientConfig, WantsVerifier>> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .ok()
}

#[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
fn provider_builder() -> Option<ConfigBuilder<ClientConfig, WantsVerifier>> {
    let provider = rustls::crypto::CryptoProvider::get_default()?;
    ClientConfig::builder_with_provider(Arc::clone(provider))
        .with_safe_default_protocol_versions()
        .ok()
}

#[cfg(feature = "tls-native-roots")]
fn root_store() -> Option<RootCertStore> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    if !native.errors.is_empty() {
        // Some certificates may still have loaded.
        #[cfg(feature = "tracing")]
        tracing::debug!(errors = ?native.errors, "errors loading native certs");
    }
    roots.add_parsable_certificates(native.certs);
    Some(roots)
}

#[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
fn root_store() -> Option<RootCertStore> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Some(roots)
}

#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
fn root_store() -> Option<RootCertStore> {
    None
}

/// Build the default TLS configuration from the enabled features.
///
/// Returns `None` when no crypto provider or no root certificate source is
/// available.
pub fn default_tls_config() -> Option<ClientConfig> {
    let builder = provider_builder()?;
    let roots = root_store()?;
    Some(builder.with_root_certificates(roots).with_no_client_auth())
}

/// Build a TLS configuration that accepts any server certificate.
///
/// Only meant for development against self-signed servers. Returns `None`
/// when no crypto provider is available.
pub fn danger_accept_invalid_certs_config() -> Option<ClientConfig> {
    let builder = provider_builder()?;
    Some(
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
            .with_no_client_auth(),
    )
}

/// A plain HTTP connector that also accepts `https://` URIs so the HTTPS
/// layer can wrap it.
pub(crate) fn http_connector() -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.enforce_http(false);
    connector
}

/// An HTTPS connector that still serves `http://` URLs.
pub(crate) fn https_connector(config: ClientConfig) -> HttpsConnector<HttpConnector> {
    HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_all_versions()
        .wrap_connector(http_connector())
}

/// Certificate verifier that accepts everything.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        use rustls::SignatureScheme::*;
        vec![
            RSA_PKCS1_SHA256,
            RSA_PKCS1_SHA384,
            RSA_PKCS1_SHA512,
            ECDSA_NISTP256_SHA256,
            ECDSA_NISTP384_SHA384,
            ECDSA_NISTP521_SHA512,
            RSA_PSS_SHA256,
            RSA_PSS_SHA384,
            RSA_PSS_SHA512,
            ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_tls_support_matches_default_config() {
        if has_tls_support() {
            assert!(default_tls_config().is_some());
        }
    }

    #[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
    #[test]
    fn test_danger_config_builds_with_provider() {
        assert!(danger_accept_invalid_certs_config().is_some());
    }

    #[cfg(all(
        any(feature = "tls-ring", feature = "tls-aws-lc"),
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    #[test]
    fn test_https_connector_from_default_config() {
        let config = default_tls_config().unwrap();
        assert!(config.alpn_protocols.is_empty());
        let _ = https_connector(config);
    }
}
