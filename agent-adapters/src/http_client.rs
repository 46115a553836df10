use std::sync::Arc;

use hyper::client::HttpConnector;
use hyper::{Body, Client};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

fn web_pki_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));
    roots
}

/// Builds a pooled HTTPS client trusting the bundled web PKI roots.
pub(crate) fn build_https_client() -> AdapterResult<HyperClient> {
    let roots = web_pki_roots();
    if roots.is_empty() {
        return Err(AdapterError::configuration("no TLS trust anchors available"));
    }

    let tls = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let connector = HttpsConnector::from((http, Arc::new(tls)));
    Ok(Client::builder().build::<_, Body>(connector))
}
