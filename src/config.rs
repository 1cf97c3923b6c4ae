use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Configuration file read from the working directory when `--config` is
/// not given.
pub const DEFAULT_CONFIG_FILE: &str = "kong-docker-daemon.toml";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Base URL of the Kong admin API.
    pub kong_admin_url: String,
    /// Default log filter, used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Container label holding the upstream name.
    pub upstream_label: String,
    /// Weight given to every registered target.
    pub target_weight: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kong_admin_url: "http://localhost:8001".into(),
            log_level: "warn".into(),
            upstream_label: "kong.upstream".into(),
            target_weight: 100,
        }
    }
}

impl Config {
    /// Layer defaults, the TOML file, `KONG_ADMIN_URL`/`APP_LOG_LEVEL` and
    /// `KDD_*` environment variables, in increasing precedence.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        Self::figment(path)
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
    }

    fn figment(path: Option<&str>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.unwrap_or(DEFAULT_CONFIG_FILE)))
            .merge(Env::raw().only(&["KONG_ADMIN_URL"]))
            .merge(Env::raw().only(&["APP_LOG_LEVEL"]).map(|_| "log_level".into()))
            .merge(Env::prefixed("KDD_"))
    }

    /// Log filter after applying the `--debug`/`--verbose` flags.
    pub fn log_filter(&self, verbose: bool, debug: bool) -> &str {
        if debug {
            "debug"
        } else if verbose {
            "info"
        } else {
            &self.log_level
        }
    }
}
