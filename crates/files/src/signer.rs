//! Time-limited signed write URLs.
//!
//! A signed URL authorizes exactly one `PUT` of one object with one content type until its
//! expiry. The signature is HMAC-SHA256 over:
//!
//! ```text
//! PUT\n<storage key>\n<content type>\n<expires unix seconds>
//! ```
//!
//! and travels hex-encoded in the query string alongside `expires` and `contentType`:
//!
//! ```text
//! <base>/objects/<id>/<path segments...>?expires=1700000000&contentType=text%2Fhtml&signature=9f…
//! ```

use crate::constants::SIGNED_WRITE_ROUTE;
use crate::key::StorageKey;
use crate::{FilesError, FilesResult};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Shortest signing secret accepted, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Longest validity window accepted for issued URLs: seven days.
pub const MAX_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// A signed write URL and when it stops working.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedWrite {
    pub url: Url,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies signed write URLs.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    base_url: Url,
    ttl: Duration,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("secret", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl UrlSigner {
    /// Creates a signer.
    ///
    /// # Arguments
    ///
    /// * `secret` - HMAC key, at least [`MIN_SECRET_LEN`] bytes
    /// * `base_url` - public origin the server is reachable at
    /// * `ttl_secs` - validity window of issued URLs
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::SignerConfig`] for a short secret, a TTL of zero or above
    /// [`MAX_TTL_SECS`], or a base URL that cannot carry path segments.
    pub fn new(secret: Vec<u8>, base_url: &str, ttl_secs: u64) -> FilesResult<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(FilesError::SignerConfig(format!(
                "signing secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if ttl_secs == 0 {
            return Err(FilesError::SignerConfig(
                "signed URL TTL must be positive".into(),
            ));
        }
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .filter(|_| ttl_secs <= MAX_TTL_SECS)
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                FilesError::SignerConfig(format!(
                    "signed URL TTL must be at most {MAX_TTL_SECS} seconds"
                ))
            })?;

        let base_url = Url::parse(base_url)
            .map_err(|e| FilesError::SignerConfig(format!("invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FilesError::SignerConfig(format!(
                "base URL cannot carry paths: {base_url}"
            )));
        }

        Ok(Self {
            secret,
            base_url,
            ttl,
        })
    }

    /// Generates a random 32-byte secret for processes started without one.
    pub fn generate_secret() -> Vec<u8> {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        secret
    }

    /// Validity window of issued URLs.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a URL authorizing one write of `key` with `content_type`, valid from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::SignerConfig`] if the MAC cannot be keyed or `now` plus the TTL
    /// is not a representable time.
    pub fn sign_write(
        &self,
        key: &StorageKey,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> FilesResult<SignedWrite> {
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            FilesError::SignerConfig("signed URL expiry is out of range".into())
        })?;
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.mac(key, content_type, expires)?.finalize().into_bytes());

        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                FilesError::SignerConfig("base URL cannot carry paths".into())
            })?;
            segments
                .pop_if_empty()
                .push(SIGNED_WRITE_ROUTE)
                .push(key.id().as_str())
                .extend(key.path().segments());
        }
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("contentType", content_type)
            .append_pair("signature", &signature);

        Ok(SignedWrite { url, expires_at })
    }

    /// Checks a write presented against a signed URL.
    ///
    /// # Errors
    ///
    /// - [`FilesError::SignatureExpired`] once `now` is past `expires`
    /// - [`FilesError::SignatureMismatch`] if the signature is malformed or was issued for a
    ///   different key, content type or expiry
    pub fn verify_write(
        &self,
        key: &StorageKey,
        content_type: &str,
        expires: i64,
        signature_hex: &str,
        now: DateTime<Utc>,
    ) -> FilesResult<()> {
        let provided = hex::decode(signature_hex).map_err(|_| FilesError::SignatureMismatch)?;
        self.mac(key, content_type, expires)?
            .verify_slice(&provided)
            .map_err(|_| FilesError::SignatureMismatch)?;

        if now.timestamp() > expires {
            return Err(FilesError::SignatureExpired);
        }
        Ok(())
    }

    fn mac(&self, key: &StorageKey, content_type: &str, expires: i64) -> FilesResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| FilesError::SignerConfig(e.to_string()))?;
        mac.update(format!("PUT\n{key}\n{content_type}\n{expires}").as_bytes());
        Ok(mac)
    }
}
