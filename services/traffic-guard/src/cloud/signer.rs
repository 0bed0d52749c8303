use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::Credentials;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// Headers and query string of a signed RPC request.
#[derive(Debug, Clone)]
pub struct RequestSignature {
    pub canonical_query: String,
    /// Lower-case header names in signing order, `authorization` last.
    pub headers: Vec<(String, String)>,
}

/// Signs an empty-bodied RPC request.
///
/// The canonical query is returned so the caller sends exactly the encoding
/// that was signed.
#[allow(clippy::too_many_arguments)]
pub fn sign_request(
    credentials: &Credentials,
    method: &str,
    host: &str,
    action: &str,
    version: &str,
    query: &BTreeMap<String, String>,
    date: &str,
    nonce: &str,
) -> RequestSignature {
    let canonical_query = canonical_query(query);
    let payload_hash = hex::encode(Sha256::digest(b""));

    let mut headers: Vec<(String, String)> = vec![
        ("host".into(), host.to_string()),
        ("x-acs-action".into(), action.to_string()),
        ("x-acs-content-sha256".into(), payload_hash.clone()),
        ("x-acs-date".into(), date.to_string()),
        ("x-acs-signature-nonce".into(), nonce.to_string()),
        ("x-acs-version".into(), version.to_string()),
    ];
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = canonical_request(
        method,
        &canonical_query,
        &canonical_headers,
        &signed_headers,
        &payload_hash,
    );
    let string_to_sign = format!(
        "{}\n{}",
        SIGNATURE_ALGORITHM,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );
    let signature = hmac_hex(credentials.access_key_secret.as_bytes(), &string_to_sign);

    headers.push((
        "authorization".into(),
        format!(
            "{} Credential={},SignedHeaders={},Signature={}",
            SIGNATURE_ALGORITHM, credentials.access_key_id, signed_headers, signature
        ),
    ));

    RequestSignature {
        canonical_query,
        headers,
    }
}

fn canonical_request(
    method: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    format!(
        "{}\n/\n{}\n{}\n{}\n{}",
        method, canonical_query, canonical_headers, signed_headers, payload_hash
    )
}

/// RFC 3986 encoding of sorted parameters.
fn canonical_query(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac_hex(key: &[u8], data: &str) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
