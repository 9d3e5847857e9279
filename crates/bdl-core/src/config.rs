//! Global settings (`~/.config/bdl/config.toml`), per-run job config, and account credentials.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Lower bound for the worker count.
pub const MIN_THREADS: usize = 1;
/// Upper bound for the worker count.
pub const MAX_THREADS: usize = 2000;

/// Default ingress host used when no CDN domain is configured.
pub const DEFAULT_IO_HOST: &str = "http://iovip.qbox.me";

/// Global configuration loaded from `~/.config/bdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BdlConfig {
    /// Worker count used when `--threads` is not given.
    pub default_threads: usize,
    /// Seconds allowed for establishing a connection.
    pub connect_timeout_secs: u64,
    /// Deadline for a whole request in seconds (0 = no deadline).
    pub request_timeout_secs: u64,
    /// Ingress host that signed URLs are rewritten to when no CDN domain is set.
    pub io_host: String,
    /// Lifetime of signed download URLs in seconds.
    pub signed_url_ttl_secs: u64,
    /// Accept an existing local file with the remote size when no resume entry exists.
    pub trust_size_match: bool,
    /// Root for per-job working directories (default: XDG state dir).
    pub state_dir: Option<PathBuf>,
}

impl Default for BdlConfig {
    fn default() -> Self {
        Self {
            default_threads: 5,
            connect_timeout_secs: 30,
            request_timeout_secs: 3600,
            io_host: DEFAULT_IO_HOST.to_string(),
            signed_url_ttl_secs: 30 * 24 * 3600,
            trust_size_match: true,
            state_dir: None,
        }
    }
}

impl BdlConfig {
    /// Root directory under which job working directories live.
    pub fn state_root(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("bdl")?;
        Ok(xdg_dirs.get_state_home())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// One bulk download: what to fetch and where to put it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub dest_dir: PathBuf,
    pub bucket: String,
    /// Canonical domain of the bucket (also the default virtual host).
    pub bucket_domain: String,
    /// Listing produced by the bucket lister, one object per line.
    pub list_file: PathBuf,
    #[serde(default)]
    pub prefix: Option<String>,
    /// Comma-separated key suffix allow-list, e.g. `".png,.jpg"`.
    #[serde(default)]
    pub suffixes: Option<String>,
    #[serde(default)]
    pub cdn_domain: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Days of rotated logs to keep.
    #[serde(default)]
    pub log_rotate: Option<u32>,
    #[serde(default)]
    pub log_stdout: bool,
}

impl DownloadConfig {
    /// Read a job config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read job config {}", path.display()))?;
        let cfg: DownloadConfig = toml::from_str(&data)
            .with_context(|| format!("parse job config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dest_dir.as_os_str().is_empty() {
            anyhow::bail!("dest_dir must not be empty");
        }
        if self.bucket.trim().is_empty() {
            anyhow::bail!("bucket must not be empty");
        }
        if self.bucket_domain.trim().is_empty() {
            anyhow::bail!("bucket_domain must not be empty");
        }
        Ok(())
    }

    /// Parsed suffix allow-list: split on `,`, trimmed, empties dropped.
    pub fn suffix_list(&self) -> Vec<String> {
        parse_suffixes(self.suffixes.as_deref().unwrap_or(""))
    }

    /// Non-empty CDN domain, if configured.
    pub fn cdn_domain(&self) -> Option<&str> {
        self.cdn_domain.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Non-empty proxy address, if configured.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

pub fn parse_suffixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check the worker count against `MIN_THREADS..=MAX_THREADS`.
pub fn validate_threads(threads: usize) -> Result<usize> {
    if !(MIN_THREADS..=MAX_THREADS).contains(&threads) {
        anyhow::bail!(
            "thread count {} out of range ({}..={})",
            threads,
            MIN_THREADS,
            MAX_THREADS
        );
    }
    Ok(threads)
}

/// Access key pair used to sign private download URLs.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Account {
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("bdl")?;
        Ok(xdg_dirs.get_config_home().join("account.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read account from {}", path.display()))?;
        let account: Account = toml::from_str(&data)
            .with_context(|| format!("parse account {}", path.display()))?;
        if account.access_key.is_empty() || account.secret_key.is_empty() {
            anyhow::bail!("account at {} has an empty key", path.display());
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = BdlConfig::default();
        assert_eq!(cfg.default_threads, 5);
        assert_eq!(cfg.request_timeout_secs, 3600);
        assert_eq!(cfg.io_host, DEFAULT_IO_HOST);
        assert!(cfg.trust_size_match);
        assert!(cfg.state_dir.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = BdlConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: BdlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.default_threads, cfg.default_threads);
        assert_eq!(parsed.signed_url_ttl_secs, cfg.signed_url_ttl_secs);
        assert_eq!(parsed.io_host, cfg.io_host);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let parsed: BdlConfig = toml::from_str("default_threads = 12\n").unwrap();
        assert_eq!(parsed.default_threads, 12);
        assert_eq!(parsed.connect_timeout_secs, 30);
        assert!(parsed.trust_size_match);
    }

    #[test]
    fn job_config_minimal_and_optional_fields() {
        let toml = r#"
            dest_dir = "/data/backup"
            bucket = "photos"
            bucket_domain = "photos.example.com"
            list_file = "/tmp/photos.list"
            suffixes = ".png, .jpg,,"
            proxy = "  "
        "#;
        let cfg: DownloadConfig = toml::from_str(toml).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.suffix_list(), vec![".png".to_string(), ".jpg".to_string()]);
        assert!(cfg.prefix.is_none());
        assert!(cfg.cdn_domain().is_none());
        assert!(cfg.proxy().is_none());
        assert!(!cfg.log_stdout);
    }

    #[test]
    fn job_config_rejects_empty_bucket() {
        let toml = r#"
            dest_dir = "/data"
            bucket = " "
            bucket_domain = "d.example.com"
            list_file = "l"
        "#;
        let cfg: DownloadConfig = toml::from_str(toml).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn thread_bounds() {
        assert!(validate_threads(0).is_err());
        assert_eq!(validate_threads(1).unwrap(), 1);
        assert_eq!(validate_threads(2000).unwrap(), 2000);
        assert!(validate_threads(2001).is_err());
    }

    #[test]
    fn account_debug_hides_secret() {
        let account = Account {
            access_key: "ak".to_string(),
            secret_key: "very-secret".to_string(),
        };
        let shown = format!("{:?}", account);
        assert!(shown.contains("ak"));
        assert!(!shown.contains("very-secret"));
    }

    #[test]
    fn account_load_rejects_empty_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.toml");
        fs::write(&path, "access_key = \"ak\"\nsecret_key = \"\"\n").unwrap();
        assert!(Account::load(&path).is_err());
    }
}
