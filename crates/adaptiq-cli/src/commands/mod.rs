pub mod init;
pub mod inspect;
pub mod quiz;
pub mod simulate;
pub mod stats;
pub mod validate;

use std::path::PathBuf;

use adaptiq_providers::AdaptiqConfig;

/// User records live in this subdirectory of the data directory.
pub(crate) const USERS_DIR: &str = "users";

/// The data directory from the command line, falling back to the config.
pub(crate) fn resolve_data_dir(flag: Option<PathBuf>, config: &AdaptiqConfig) -> PathBuf {
    flag.unwrap_or_else(|| config.data_dir.clone())
}
