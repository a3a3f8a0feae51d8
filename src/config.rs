use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Hours behind UTC the stored epoch timestamps are rendered in.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_db_path() -> String {
    "monitor.db".to_string()
}

fn default_utc_offset_hours() -> i64 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            utc_offset_hours: default_utc_offset_hours(),
            log_level: default_log_level(),
        }
    }
}

impl MonitorConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn utc_offset_secs(&self) -> i64 {
        self.utc_offset_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.db_path, "monitor.db");
        assert_eq!(config.utc_offset_secs(), 4 * 3600);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: MonitorConfig = toml::from_str("db_path = \"/var/lib/monitor.db\"").unwrap();
        assert_eq!(config.db_path, "/var/lib/monitor.db");
        assert_eq!(config.utc_offset_hours, 4);
    }
}
