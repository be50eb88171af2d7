//! Signature version 1.0 (HMAC-SHA1) of Alibaba Cloud RPC style requests.

use super::RpcRequest;
use aliyun_exporter_config::Credential;
use base64::prelude::{
    Engine as _,
    BASE64_STANDARD,
};
use chrono::{
    DateTime,
    Utc,
};
use ring::hmac;
use std::collections::BTreeMap;
use url::form_urlencoded::byte_serialize;
use uuid::Uuid;

/// Percent encodes everything but the RFC 3986 unreserved characters.
pub fn percent_encode(value: &str) -> String {
    byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

pub struct Signer {
    access_key_id: String,
    key: hmac::Key,
}

impl Signer {
    pub fn new(credential: &Credential) -> Self {
        let secret = format!("{}&", credential.access_key_secret);
        Self {
            access_key_id: credential.access_key_id.clone(),
            key: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret.as_bytes()),
        }
    }

    /// Query string carrying the request parameters, the common parameters and the signature.
    pub fn signed_query(&self, request: &RpcRequest) -> String {
        self.signed_query_at(request, Utc::now(), &Uuid::new_v4().to_string())
    }

    pub(crate) fn signed_query_at(&self, request: &RpcRequest, timestamp: DateTime<Utc>, nonce: &str) -> String {
        let mut params = request.params.clone();
        params.insert("Action".to_string(), request.action.to_string());
        params.insert("Version".to_string(), request.version.to_string());
        params.insert("Format".to_string(), "JSON".to_string());
        params.insert("AccessKeyId".to_string(), self.access_key_id.clone());
        params.insert("SignatureMethod".to_string(), "HMAC-SHA1".to_string());
        params.insert("SignatureVersion".to_string(), "1.0".to_string());
        params.insert("SignatureNonce".to_string(), nonce.to_string());
        params.insert(
            "Timestamp".to_string(),
            timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        if let Some(region_id) = &request.region_id {
            params.insert("RegionId".to_string(), region_id.clone());
        }

        let canonical = canonicalize(&params);
        let signature = self.sign(&canonical);
        format!("{canonical}&Signature={}", percent_encode(&signature))
    }

    fn sign(&self, canonical_query: &str) -> String {
        let string_to_sign = format!("GET&{}&{}", percent_encode("/"), percent_encode(canonical_query));
        let tag = hmac::sign(&self.key, string_to_sign.as_bytes());
        BASE64_STANDARD.encode(tag.as_ref())
    }
}

/// Sorted `key=value` pairs, both percent encoded, joined with `&`.
fn canonicalize(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
