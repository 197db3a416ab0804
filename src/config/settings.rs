use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Durable snapshot of tracked alerts. Empty disables persistence.
    pub alerts_state: String,
    /// Durable snapshot of the asset directory. Empty disables persistence.
    pub assets_state: String,
    /// Debug-level logging.
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from: String,
    /// SMTP auth user; empty means no authentication.
    pub user: String,
    pub password: String,
    pub starttls: bool,
    /// Bounded submission timeout; the engine blocks on dispatch, so this
    /// must stay finite.
    pub timeout_secs: u64,
    /// SMS gateway address template with `#` digit placeholders, e.g.
    /// "0#####@sms.example.com". Empty disables the SMS channel.
    pub sms_gateway: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            from: "alertmail@localhost".to_string(),
            user: String::new(),
            password: String::new(),
            starttls: false,
            timeout_secs: 30,
            sms_gateway: String::new(),
        }
    }
}

impl Config {
    /// Load from `path` if given, otherwise from the default location,
    /// creating a commented default file there on first run.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !config_path.exists() {
            if path.is_some() {
                anyhow::bail!("config file not found: {}", config_path.display());
            }
            let config = Self::default();
            config.save(None)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config file: {}", config_path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(&config_path, self.to_commented_toml())
            .with_context(|| format!("failed to write config file: {}", config_path.display()))?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("failed to determine home directory")?;
        Ok(home.join(".config").join("alertmail").join("config.toml"))
    }

    /// Generate the TOML configuration with comments explaining each option.
    pub fn to_commented_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# alertmail configuration\n");
        output.push('\n');
        output.push_str("[server]\n");
        output.push_str("# State files for crash-safe snapshots of the two registries.\n");
        output.push_str("# Leave empty to run without persistence.\n");
        output.push_str(&format!("alerts_state = \"{}\"\n", self.server.alerts_state));
        output.push_str(&format!("assets_state = \"{}\"\n", self.server.assets_state));
        output.push_str("# Debug-level logging (same as --verbose)\n");
        output.push_str(&format!("verbose = {}\n", self.server.verbose));
        output.push('\n');
        output.push_str("[smtp]\n");
        output.push_str("# Mail relay used for notification submission\n");
        output.push_str(&format!("host = \"{}\"\n", self.smtp.host));
        output.push_str(&format!("port = {}\n", self.smtp.port));
        output.push_str(&format!("from = \"{}\"\n", self.smtp.from));
        output.push_str("# Credentials; leave user empty for an open relay\n");
        output.push_str(&format!("user = \"{}\"\n", self.smtp.user));
        output.push_str(&format!("password = \"{}\"\n", self.smtp.password));
        output.push_str(&format!("starttls = {}\n", self.smtp.starttls));
        output.push_str("# Submission timeout in seconds; dispatch blocks the event loop,\n");
        output.push_str("# so this must stay finite\n");
        output.push_str(&format!("timeout_secs = {}\n", self.smtp.timeout_secs));
        output.push_str("# SMS gateway address template, '#' placeholders are filled with\n");
        output.push_str("# the trailing digits of the contact phone number.\n");
        output.push_str("# Example: \"0#####@sms.example.com\". Empty disables SMS.\n");
        output.push_str(&format!("sms_gateway = \"{}\"\n", self.smtp.sms_gateway));

        output
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server.alerts_state" => self.server.alerts_state = value.to_string(),
            "server.assets_state" => self.server.assets_state = value.to_string(),
            "server.verbose" => {
                self.server.verbose = value
                    .parse()
                    .with_context(|| format!("invalid boolean value: {value}"))?;
            }
            "smtp.host" => self.smtp.host = value.to_string(),
            "smtp.port" => {
                self.smtp.port = value
                    .parse()
                    .with_context(|| format!("invalid port value: {value}"))?;
            }
            "smtp.from" => self.smtp.from = value.to_string(),
            "smtp.user" => self.smtp.user = value.to_string(),
            "smtp.password" => self.smtp.password = value.to_string(),
            "smtp.starttls" => {
                self.smtp.starttls = value
                    .parse()
                    .with_context(|| format!("invalid boolean value: {value}"))?;
            }
            "smtp.timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("invalid timeout value: {value}"))?;
                if secs == 0 {
                    anyhow::bail!("timeout_secs must be at least 1");
                }
                self.smtp.timeout_secs = secs;
            }
            "smtp.sms_gateway" => self.smtp.sms_gateway = value.to_string(),
            _ => anyhow::bail!("unknown configuration key: {key}"),
        }
        Ok(())
    }

    pub fn alerts_state_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.server.alerts_state)
    }

    pub fn assets_state_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.server.assets_state)
    }

    pub fn sms_gateway(&self) -> Option<String> {
        if self.smtp.sms_gateway.is_empty() {
            None
        } else {
            Some(self.smtp.sms_gateway.clone())
        }
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_commented_toml() {
        let config = Config::default();
        let parsed: Config = toml::from_str(&config.to_commented_toml()).unwrap();
        assert_eq!(parsed.smtp.host, config.smtp.host);
        assert_eq!(parsed.smtp.timeout_secs, config.smtp.timeout_secs);
        assert_eq!(parsed.server.alerts_state, "");
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();
        config.set_value("smtp.sms_gateway", "0####@gw.example.com").unwrap();
        config.set_value("smtp.port", "587").unwrap();
        config.set_value("server.verbose", "true").unwrap();

        assert_eq!(config.sms_gateway().as_deref(), Some("0####@gw.example.com"));
        assert_eq!(config.smtp.port, 587);
        assert!(config.server.verbose);

        assert!(config.set_value("smtp.port", "not-a-port").is_err());
        assert!(config.set_value("smtp.timeout_secs", "0").is_err());
        assert!(config.set_value("nope.nope", "x").is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[smtp]\nhost = \"mail.example.com\"\n").unwrap();
        assert_eq!(config.smtp.host, "mail.example.com");
        assert_eq!(config.smtp.port, 25);
        assert!(config.alerts_state_path().is_none());
    }

    #[test]
    fn test_state_path_helpers() {
        let mut config = Config::default();
        assert!(config.alerts_state_path().is_none());
        config.server.alerts_state = "/var/lib/alertmail/alerts.json".to_string();
        assert_eq!(
            config.alerts_state_path().unwrap(),
            PathBuf::from("/var/lib/alertmail/alerts.json")
        );
    }
}
