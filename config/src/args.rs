use clap::Parser;
use std::{
    net::SocketAddr,
    path::PathBuf,
};

/// Prometheus exporter for Alibaba Cloud CloudMonitor
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Path to the exporter configuration file (yaml).
    ///
    /// Defaults to `aliyun-exporter.yml` in the working directory when present.
    #[clap(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the metrics endpoint listens on.
    #[clap(long, env = "ALIYUN_EXPORTER_LISTEN", value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Maximum number of upstream API calls per second.
    #[clap(long, value_name = "N")]
    pub rate_limit: Option<u32>,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(listen) = &self.listen {
                cache.insert("listen".to_string(), listen.to_string().into());
            }
            if let Some(rate_limit) = self.rate_limit {
                cache.insert("rate_limit".to_string(), (rate_limit as u64).into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "\
{version}
Authors: {author}

Config directory: {config_dir_path}",
        version = env!("CARGO_PKG_VERSION"),
    )
}
