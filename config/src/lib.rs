#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod credential;
mod metric_spec;
mod resource;

pub use app_config::{
    get_config_dir,
    CONFIG_DIR_ENV,
    DEFAULT_CONFIG_FILE,
};
pub use args::Args;
pub use credential::{
    Credential,
    ACCESS_ID_ENV,
    ACCESS_SECRET_ENV,
    REGION_ENV,
};
use eyre::{
    bail,
    Context as _,
};
pub use metric_spec::{
    Measure,
    MetricSpec,
};
pub use resource::ResourceKind;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    net::SocketAddr,
    path::Path,
    time::Duration,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_seconds: u64,
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_seconds)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NameCacheConfig {
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl NameCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub listen: SocketAddr,
    #[serde(default)]
    pub credential: Credential,
    pub rate_limit: u32,
    /// Metric catalog keyed by CloudMonitor namespace.
    #[serde(default)]
    pub metrics: BTreeMap<String, Vec<MetricSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_metrics: Option<Vec<ResourceKind>>,
    /// Regions inventory and per-instance collection is repeated over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_info_region: Option<Vec<String>>,
    pub retry: RetryConfig,
    pub name_cache: NameCacheConfig,
    pub http: HttpConfig,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Config {
    /// Loads the configuration from the embedded defaults, the user config directory, the config file given by
    /// `args` (or `aliyun-exporter.yml` when present), the command line and finally the credential environment
    /// variables.
    pub fn new(args: Args) -> eyre::Result<Self> {
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
            .add_source(
                config::File::from(config_dir.join("config.yaml"))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );

        builder = match &args.config {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                builder.add_source(
                    config::File::from(path.as_path())
                        .format(config::FileFormat::Yaml)
                        .required(true),
                )
            }
            None => builder.add_source(
                config::File::from(Path::new(DEFAULT_CONFIG_FILE))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            ),
        };

        builder = builder.add_source(args);

        Self::finish(builder, |key| std::env::var(key).ok())
    }

    /// Loads the configuration from a yaml document layered over the embedded defaults.
    pub fn from_yaml(content: &str, env: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        Self::from_sources(content, Args::default(), env)
    }

    /// Like [`Config::from_yaml`] with `args` layered over the document.
    pub fn from_sources(content: &str, args: Args, env: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
            .add_source(config::File::from_str(content, config::FileFormat::Yaml))
            .add_source(args);

        Self::finish(builder, env)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        env: impl Fn(&str) -> Option<String>,
    ) -> eyre::Result<Self> {
        let non_empty = |key: &str| env(key).filter(|value| !value.is_empty());

        let cfg: Self = builder
            .set_override_option("credential.access_key_id", non_empty(ACCESS_ID_ENV))?
            .set_override_option("credential.access_key_secret", non_empty(ACCESS_SECRET_ENV))?
            .set_override_option("credential.region_id", non_empty(REGION_ENV))?
            .build()?
            .try_deserialize()
            .context("Failed to parse exporter configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        self.credential.validate()?;

        if self.rate_limit == 0 {
            bail!("rate_limit must be greater than zero");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be greater than zero");
        }
        for (namespace, specs) in &self.metrics {
            if let Some(spec) = specs.iter().find(|spec| spec.name.trim().is_empty()) {
                bail!("name must be set in every metric item of {namespace} (got {spec:?})");
            }
        }
        Ok(())
    }

    /// Regions to replicate inventory and per-instance collection over.
    pub fn info_regions(&self) -> Vec<String> {
        match &self.do_info_region {
            Some(regions) if !regions.is_empty() => regions.clone(),
            _ => vec![self.credential.region_id.clone()],
        }
    }
}
