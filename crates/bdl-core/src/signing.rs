//! Time-limited private download links.
//!
//! A link is signed against the bucket's canonical domain and then pointed at
//! the physical ingress (default IO host or a CDN domain). The canonical
//! domain survives as the request's virtual host.

use anyhow::{anyhow, Result};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::Account;

type HmacSha1 = Hmac<Sha1>;

/// Signs a public URL so it can fetch a private object until `deadline` (Unix seconds).
pub trait UrlSigner: Send + Sync {
    fn sign(&self, url: &str, deadline: i64) -> Result<String>;
}

/// `url?e=<deadline>&token=<access_key>:<urlsafe_b64(hmac_sha1(secret, url?e=<deadline>))>`.
#[derive(Debug, Clone)]
pub struct HmacSigner {
    account: Account,
}

impl HmacSigner {
    pub fn new(account: Account) -> Self {
        HmacSigner { account }
    }
}

impl UrlSigner for HmacSigner {
    fn sign(&self, url: &str, deadline: i64) -> Result<String> {
        let sep = if url.contains('?') { '&' } else { '?' };
        let with_deadline = format!("{}{}e={}", url, sep, deadline);
        let mut mac = HmacSha1::new_from_slice(self.account.secret_key.as_bytes())
            .map_err(|e| anyhow!("invalid signing key: {}", e))?;
        mac.update(with_deadline.as_bytes());
        let digest = mac.finalize().into_bytes();
        let sign = base64::engine::general_purpose::URL_SAFE.encode(digest);
        Ok(format!(
            "{}&token={}:{}",
            with_deadline, self.account.access_key, sign
        ))
    }
}

/// Unix deadline `ttl` from now.
pub fn deadline_from_now(ttl: Duration) -> i64 {
    (SystemTime::now() + ttl)
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Prefix `http://` when `host` carries no scheme.
pub fn with_scheme(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

fn bare_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    match host.split_once("://") {
        Some((_, rest)) => rest.to_string(),
        None => host.to_string(),
    }
}

/// Where signed links are sent.
#[derive(Debug, Clone, Copy)]
pub enum Ingress<'a> {
    /// Default IO host; requests keep the bucket domain as virtual host.
    Default(&'a str),
    /// CDN/custom domain, which is also the virtual host.
    Cdn(&'a str),
}

/// A fetchable URL plus the `Host` to send with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub url: String,
    pub virtual_host: String,
}

/// Build the signed, host-rewritten link for `key`.
pub fn make_download_link(
    signer: &dyn UrlSigner,
    bucket_domain: &str,
    ingress: Ingress<'_>,
    key: &str,
    deadline: i64,
) -> Result<DownloadLink> {
    let domain = bare_host(bucket_domain);
    let mut public = url::Url::parse(&format!("http://{}/", domain))
        .map_err(|e| anyhow!("invalid bucket domain `{}`: {}", bucket_domain, e))?;
    public.set_path(key);

    let origin_len = public[..url::Position::BeforePath].len();
    let signed = signer.sign(public.as_str(), deadline)?;
    let tail = &signed[origin_len..];

    let (base, virtual_host) = match ingress {
        Ingress::Default(io_host) => (with_scheme(io_host), domain),
        Ingress::Cdn(cdn) => (with_scheme(cdn), bare_host(cdn)),
    };
    Ok(DownloadLink {
        url: format!("{}{}", base, tail),
        virtual_host,
    })
}
