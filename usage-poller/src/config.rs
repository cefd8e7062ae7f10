use serde::Deserialize;
use std::{fmt, fs, time::Duration};

fn default_poll_interval_secs() -> u64 {
    1800
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Deserialize)]
pub struct MeterConfig {
    pub access_token: String,
    pub data_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl MeterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Keeps the bearer token out of logs.
impl fmt::Debug for MeterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterConfig")
            .field("access_token", &"<redacted>")
            .field("data_url", &self.data_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub meter: MeterConfig,
    pub server: Option<ServerConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("USAGE_POLLER_CONFIG").unwrap_or_else(|_| "usage-poller.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config file '{path}': {e}"))?;
        let mut cfg = Self::from_toml_str(&contents)?;

        if let Ok(token) = env::var("NEA_ACCESS_TOKEN") {
            cfg.meter.access_token = token;
        }
        if let Ok(url) = env::var("NEA_DATA_URL") {
            cfg.meter.data_url = url;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let m = &self.meter;

        if m.access_token.trim().is_empty() {
            anyhow::bail!("meter.access_token must not be empty");
        }

        let url = reqwest::Url::parse(&m.data_url)
            .map_err(|e| anyhow::anyhow!("invalid meter.data_url '{}': {e}", m.data_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("meter.data_url must be http or https, got '{}'", url.scheme());
        }

        if m.poll_interval_secs == 0 {
            anyhow::bail!("meter.poll_interval_secs must be greater than zero");
        }
        if m.request_timeout_secs == 0 {
            anyhow::bail!("meter.request_timeout_secs must be greater than zero");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [meter]
        access_token = "tok"
        data_url = "https://api.example.com/usage"
    "#;

    #[test]
    fn defaults_apply_when_omitted() {
        let cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.meter.poll_interval(), Duration::from_secs(1800));
        assert_eq!(cfg.meter.request_timeout(), Duration::from_secs(30));
        assert!(cfg.server.is_none());
    }

    #[test]
    fn overrides_and_server_section_are_read() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [meter]
            access_token = "tok"
            data_url = "http://localhost:8080/usage"
            poll_interval_secs = 60
            request_timeout_secs = 5

            [server]
            bind_addr = "127.0.0.1:9102"
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.meter.poll_interval_secs, 60);
        assert_eq!(cfg.meter.request_timeout_secs, 5);
        assert_eq!(cfg.server.unwrap().bind_addr, "127.0.0.1:9102");
    }

    #[test]
    fn relative_or_non_http_urls_are_rejected() {
        let mut cfg = AppConfig::from_toml_str(MINIMAL).unwrap();

        cfg.meter.data_url = "/usage".to_string();
        assert!(cfg.validate().is_err());

        cfg.meter.data_url = "ftp://api.example.com/usage".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_token_and_zero_interval_are_rejected() {
        let mut cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        cfg.meter.access_token = "  ".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        cfg.meter.poll_interval_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_token() {
        let cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        let dbg = format!("{:?}", cfg.meter);
        assert!(!dbg.contains("\"tok\""));
        assert!(dbg.contains("<redacted>"));
    }
}
