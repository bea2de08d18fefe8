//! Host configuration

use serde::Deserialize;

/// Host configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Binary that grants an elevated shell
    #[serde(default = "default_su_path")]
    pub su_path: String,

    /// Run elevated shells in the global mount namespace
    #[serde(default = "default_mount_master")]
    pub mount_master: bool,

    /// Root directory holding installed modules
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// List and serve modules that carry a disable marker
    #[serde(default)]
    pub show_disabled: bool,
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_su_path() -> String {
    "su".to_string()
}

fn default_mount_master() -> bool {
    true
}

fn default_modules_dir() -> String {
    "/data/adb/modules".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Start from defaults and override with whatever `lookup` finds
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Config::default();

        if let Some(val) = lookup("WEBUI_HTTP_HOST") {
            config.http_host = val;
        }
        if let Some(val) = lookup("WEBUI_HTTP_PORT") {
            config.http_port = val
                .parse()
                .map_err(|_| anyhow::anyhow!("WEBUI_HTTP_PORT is not a port: {}", val))?;
        }
        if let Some(val) = lookup("WEBUI_SU_PATH") {
            config.su_path = val;
        }
        if let Some(val) = lookup("WEBUI_MOUNT_MASTER") {
            if let Some(flag) = parse_flag(&val) {
                config.mount_master = flag;
            }
        }
        if let Some(val) = lookup("WEBUI_MODULES_DIR") {
            config.modules_dir = val;
        }
        if let Some(val) = lookup("WEBUI_SHOW_DISABLED") {
            if let Some(flag) = parse_flag(&val) {
                config.show_disabled = flag;
            }
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            su_path: default_su_path(),
            mount_master: default_mount_master(),
            modules_dir: default_modules_dir(),
            show_disabled: false,
        }
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.http_host, "127.0.0.1");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.su_path, "su");
        assert!(config.mount_master);
        assert_eq!(config.modules_dir, "/data/adb/modules");
        assert!(!config.show_disabled);
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("WEBUI_HTTP_PORT", "9000"),
            ("WEBUI_SU_PATH", "/system/bin/su"),
            ("WEBUI_MOUNT_MASTER", "off"),
            ("WEBUI_SHOW_DISABLED", "1"),
            ("WEBUI_MODULES_DIR", "/tmp/modules"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.su_path, "/system/bin/su");
        assert!(!config.mount_master);
        assert!(config.show_disabled);
        assert_eq!(config.modules_dir, "/tmp/modules");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        assert!(load(&[("WEBUI_HTTP_PORT", "http")]).is_err());
    }

    #[test]
    fn test_unknown_flag_keeps_default() {
        let config = load(&[("WEBUI_MOUNT_MASTER", "maybe")]).unwrap();
        assert!(config.mount_master);
    }
}
