use directories::ProjectDirs;
use std::{
    env,
    path::PathBuf,
};

/// Environment variable pointing at a directory that holds `config.yaml`.
pub const CONFIG_DIR_ENV: &str = "ALIYUN_EXPORTER_CONFIG";

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "aliyun-exporter.yml";

pub fn get_config_dir() -> PathBuf {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV) {
        PathBuf::from(dir)
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "aliyun", env!("CARGO_PKG_NAME"))
}
