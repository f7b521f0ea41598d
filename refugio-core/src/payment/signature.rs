//! Webhook signature verification.
//!
//! The provider sends `x-signature: ts=<timestamp>,v1=<hex hmac>` and signs the
//! manifest `id:<payment id>;request-id:<x-request-id>;ts:<timestamp>;` with the
//! shared secret using HMAC-SHA256. The request-id segment is left out when the
//! request carries no `x-request-id`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{RefugioError, RefugioResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub ts: String,
    pub v1: String,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> RefugioResult<Self> {
        let mut ts = None;
        let mut v1 = None;

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("ts", value)) => ts = Some(value.trim().to_string()),
                Some(("v1", value)) => v1 = Some(value.trim().to_string()),
                _ => {}
            }
        }

        match (ts, v1) {
            (Some(ts), Some(v1)) if !ts.is_empty() && !v1.is_empty() => Ok(SignatureHeader { ts, v1 }),
            _ => Err(RefugioError::Signature("malformed x-signature header".into())),
        }
    }
}

pub fn manifest(payment_id: &str, request_id: Option<&str>, ts: &str) -> String {
    match request_id.filter(|r| !r.is_empty()) {
        Some(request_id) => format!("id:{};request-id:{};ts:{};", payment_id, request_id, ts),
        None => format!("id:{};ts:{};", payment_id, ts),
    }
}

fn mac(secret: &str, manifest: &str) -> RefugioResult<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| RefugioError::Signature(e.to_string()))?;
    mac.update(manifest.as_bytes());
    Ok(mac)
}

/// Hex HMAC of the manifest, as the provider would send it.
pub fn sign(secret: &str, payment_id: &str, request_id: Option<&str>, ts: &str) -> RefugioResult<String> {
    let mac = mac(secret, &manifest(payment_id, request_id, ts))?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Byte comparison whose running time does not depend on where the inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Check the `x-signature` header against the payment id. Comparison is
/// constant-time.
pub fn verify(
    secret: &str,
    header: &str,
    request_id: Option<&str>,
    payment_id: &str,
) -> RefugioResult<()> {
    let header = SignatureHeader::parse(header)?;
    let expected = hex::decode(&header.v1)
        .map_err(|_| RefugioError::Signature("signature is not hex".into()))?;

    mac(secret, &manifest(payment_id, request_id, &header.ts))?
        .verify_slice(&expected)
        .map_err(|_| RefugioError::Signature("signature mismatch".into()))
}
