//! Config serialization to TOML
//!
//! Single source of truth for the config file format.

use super::Config;

impl Config {
    /// Serialize the config to the TOML template written by
    /// `ensure_config_exists` and `config --reset`.
    pub fn to_toml(&self) -> String {
        format!(
            r#"# Repligate configuration
# Values here are overridden by REPLIGATE_* environment variables.

# Address the proxy listens on (env: REPLIGATE_BIND)
bind_addr = "{bind_addr}"

# Every X-Target-URL value must start with this prefix (env: REPLIGATE_UPSTREAM)
upstream_prefix = "{upstream_prefix}"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "{level}"
# Write JSON logs to rotating files in addition to stdout
file_enabled = {file_enabled}
file_dir = "{file_dir}"
# Rotation: hourly, daily, never
file_rotation = "{file_rotation}"
file_prefix = "{file_prefix}"
"#,
            bind_addr = self.bind_addr,
            upstream_prefix = self.upstream_prefix,
            level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display(),
            file_rotation = self.logging.file_rotation.as_str(),
            file_prefix = self.logging.file_prefix,
        )
    }
}
