use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
/// S3 rejects presigned URLs valid for longer than a week.
const MAX_TTL_SECONDS: u64 = 7 * 24 * 3600;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// S3-compatible endpoint (e.g. MinIO); switches to path-style addressing.
    pub endpoint: Option<String>,
    /// Base used for links written to the spreadsheet instead of the bucket URL.
    pub public_base_url: Option<String>,
    pub presign_ttl_seconds: u64,
}

#[derive(Debug, Error)]
pub enum PresignError {
    #[error("invalid object storage endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("presign ttl must be between 1 and {MAX_TTL_SECONDS} seconds, got {0}")]
    InvalidTtl(u64),
    #[error("failed to initialise request signer")]
    Signer,
}

#[derive(Debug, Clone)]
struct Location {
    scheme: String,
    host: String,
    path_prefix: String,
}

/// AWS Signature V4 query-string signer for a single bucket.
#[derive(Debug, Clone)]
pub struct Presigner {
    cfg: S3Config,
    location: Location,
}

impl Presigner {
    pub fn new(cfg: S3Config) -> Result<Self, PresignError> {
        if cfg.presign_ttl_seconds == 0 || cfg.presign_ttl_seconds > MAX_TTL_SECONDS {
            return Err(PresignError::InvalidTtl(cfg.presign_ttl_seconds));
        }

        let location = match cfg.endpoint.as_deref().map(str::trim) {
            None | Some("") => Location {
                scheme: "https".into(),
                host: format!("{}.s3.{}.amazonaws.com", cfg.bucket, cfg.region),
                path_prefix: String::new(),
            },
            Some(endpoint) => {
                let parsed = Url::parse(endpoint).map_err(|e| PresignError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
                let host = parsed
                    .host_str()
                    .ok_or_else(|| PresignError::InvalidEndpoint {
                        endpoint: endpoint.to_string(),
                        reason: "missing host".into(),
                    })?;
                let host = match parsed.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };
                Location {
                    scheme: parsed.scheme().to_string(),
                    host,
                    path_prefix: format!("/{}", uri_encode(&cfg.bucket, true)),
                }
            }
        };

        Ok(Self { cfg, location })
    }

    pub fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> Result<String, PresignError> {
        self.presign("PUT", key, &[("content-type", content_type)], now)
    }

    pub fn presign_head(&self, key: &str, now: DateTime<Utc>) -> Result<String, PresignError> {
        self.presign("HEAD", key, &[], now)
    }

    pub fn public_url(&self, key: &str) -> String {
        let encoded = uri_encode(key, false);
        match self.cfg.public_base_url.as_deref() {
            Some(base) if !base.trim().is_empty() => {
                format!("{}/{encoded}", base.trim().trim_end_matches('/'))
            }
            _ => format!(
                "{}://{}{}/{encoded}",
                self.location.scheme, self.location.host, self.location.path_prefix
            ),
        }
    }

    fn presign(
        &self,
        method: &str,
        key: &str,
        headers: &[(&str, &str)],
        now: DateTime<Utc>,
    ) -> Result<String, PresignError> {
        let path = format!("{}/{}", self.location.path_prefix, uri_encode(key, false));
        let query = self.signed_query(method, &self.location.host, &path, headers, now)?;
        Ok(format!(
            "{}://{}{path}?{query}",
            self.location.scheme, self.location.host
        ))
    }

    fn signed_query(
        &self,
        method: &str,
        host: &str,
        canonical_path: &str,
        headers: &[(&str, &str)],
        now: DateTime<Utc>,
    ) -> Result<String, PresignError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/{SERVICE}/aws4_request", self.cfg.region);

        let mut signed: Vec<(String, String)> = headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        signed.push(("host".into(), host.to_string()));
        signed.sort();
        let signed_headers = signed
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = signed
            .iter()
            .map(|(name, value)| format!("{name}:{value}\n"))
            .collect();

        // Parameter names are already in canonical (byte-wise) order.
        let params = [
            ("X-Amz-Algorithm", ALGORITHM.to_string()),
            (
                "X-Amz-Credential",
                format!("{}/{scope}", self.cfg.access_key_id),
            ),
            ("X-Amz-Date", amz_date.clone()),
            ("X-Amz-Expires", self.cfg.presign_ttl_seconds.to_string()),
            ("X-Amz-SignedHeaders", signed_headers.clone()),
        ];
        let canonical_query = params
            .iter()
            .map(|(name, value)| format!("{}={}", uri_encode(name, true), uri_encode(value, true)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{method}\n{canonical_path}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{UNSIGNED_PAYLOAD}"
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let secret = format!("AWS4{}", self.cfg.secret_access_key);
        let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.cfg.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, SERVICE.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

        Ok(format!("{canonical_query}&X-Amz-Signature={signature}"))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, PresignError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| PresignError::Signer)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// RFC 3986 encoding as SigV4 expects it. `/` survives unless
/// `encode_slash` is set.
pub(crate) fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/presign_tests.rs"]
mod tests;
