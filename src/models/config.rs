use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::poller::PollSettings;

/// Longest accepted reminder lookback window.
pub const MAX_LOOKBACK_SECS: u64 = 86_400;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub reminders: Reminders,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,
}

fn default_user_id() -> String {
    "local".to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Reminders {
    /// Trailing window a pending dose stays eligible for notification.
    pub lookback_secs: u64,
    /// Budget for one user's scan before the rest is left for the next poll.
    pub scan_timeout_secs: u64,
    pub snooze_minutes: u32,
    /// How long past its time a dose may stay open before `dose sweep` marks it missed.
    pub sweep_grace_minutes: u32,
}

impl Default for Reminders {
    fn default() -> Self {
        Self {
            lookback_secs: 60,
            scan_timeout_secs: 30,
            snooze_minutes: 10,
            sweep_grace_minutes: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    #[default]
    Log,
    Webhook,
    Command,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,
    /// Gateway endpoint for `webhook`.
    pub url: Option<String>,
    /// Executable for `command`; receives token, title, body and dose id as arguments.
    pub program: Option<String>,
    #[serde(default = "default_notifier_timeout")]
    pub timeout_secs: u64,
}

fn default_notifier_timeout() -> u64 {
    10
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Log,
            url: None,
            program: None,
            timeout_secs: default_notifier_timeout(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
        }
    }
}

fn check_lookback(secs: u64) -> anyhow::Result<()> {
    if secs == 0 {
        anyhow::bail!("reminders.lookback_secs must be at least 1");
    }
    if secs > MAX_LOOKBACK_SECS {
        anyhow::bail!("reminders.lookback_secs must be at most {MAX_LOOKBACK_SECS}");
    }
    Ok(())
}

impl Config {
    /// Load config from the standard path, or return defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the standard path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        let contents = toml::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            use std::fs::{self, OpenOptions};
            use std::io::Write;
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true).mode(0o600);
            let mut file = options.open(&path)?;

            file.write_all(contents.as_bytes())?;

            // The file may predate this save with wider permissions.
            let mut perms = file.metadata()?.permissions();
            if perms.mode() & 0o777 != 0o600 {
                perms.set_mode(0o600);
                fs::set_permissions(&path, perms)?;
            }
        }
        #[cfg(not(unix))]
        {
            std::fs::write(&path, contents)?;
        }

        Ok(())
    }

    /// Apply a `section.key = value` assignment from the CLI.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "user" | "user.id" => {
                if value.trim().is_empty() {
                    anyhow::bail!("user id must not be empty");
                }
                self.user.id = value.to_string();
            }
            "reminders.lookback_secs" => {
                let secs: u64 = value.parse()?;
                check_lookback(secs)?;
                self.reminders.lookback_secs = secs;
            }
            "reminders.scan_timeout_secs" => self.reminders.scan_timeout_secs = value.parse()?,
            "reminders.snooze_minutes" => {
                let mins: u32 = value.parse()?;
                if mins == 0 {
                    anyhow::bail!("reminders.snooze_minutes must be at least 1");
                }
                self.reminders.snooze_minutes = mins;
            }
            "reminders.sweep_grace_minutes" => self.reminders.sweep_grace_minutes = value.parse()?,
            "notifier.kind" => {
                self.notifier.kind = match value {
                    "log" => NotifierKind::Log,
                    "webhook" => NotifierKind::Webhook,
                    "command" => NotifierKind::Command,
                    _ => anyhow::bail!("notifier.kind must be 'log', 'webhook' or 'command'"),
                }
            }
            "notifier.url" => self.notifier.url = Some(value.to_string()),
            "notifier.program" => self.notifier.program = Some(value.to_string()),
            "notifier.timeout_secs" => self.notifier.timeout_secs = value.parse()?,
            "store.busy_timeout_ms" => self.store.busy_timeout_ms = value.parse()?,
            _ => anyhow::bail!("unknown config key: {}", key),
        }
        Ok(())
    }

    /// Reject values that parse but cannot drive a poll.
    pub fn validate(&self) -> anyhow::Result<()> {
        check_lookback(self.reminders.lookback_secs)
    }

    pub fn poll_settings(&self) -> anyhow::Result<PollSettings> {
        check_lookback(self.reminders.lookback_secs)?;
        let lookback = i64::try_from(self.reminders.lookback_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .ok_or_else(|| anyhow::anyhow!("reminders.lookback_secs is out of range"))?;
        Ok(PollSettings {
            lookback,
            scan_timeout: Duration::from_secs(self.reminders.scan_timeout_secs),
        })
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.store.busy_timeout_ms)
    }

    pub fn data_dir() -> PathBuf {
        if let Ok(home) = std::env::var("DOSEKEEPER_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dosekeeper")
    }

    pub fn path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    pub fn db_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_one_minute_lookback() {
        let c = Config::default();
        assert_eq!(c.reminders.lookback_secs, 60);
        assert_eq!(c.user.id, "local");
        assert_eq!(c.notifier.kind, NotifierKind::Log);
        assert_eq!(c.poll_settings().unwrap().lookback, chrono::Duration::seconds(60));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str("[user]\nid = \"alice\"\n").unwrap();
        assert_eq!(c.user.id, "alice");
        assert_eq!(c.reminders.snooze_minutes, 10);
        assert_eq!(c.store.busy_timeout_ms, 5000);
    }

    #[test]
    fn set_known_and_unknown_keys() {
        let mut c = Config::default();
        c.set("reminders.lookback_secs", "90").unwrap();
        c.set("notifier.kind", "webhook").unwrap();
        c.set("notifier.url", "http://localhost:9000/push").unwrap();
        assert_eq!(c.reminders.lookback_secs, 90);
        assert_eq!(c.notifier.kind, NotifierKind::Webhook);
        c.set("notifier.kind", "command").unwrap();
        c.set("notifier.program", "/usr/local/bin/push").unwrap();
        assert_eq!(c.notifier.program.as_deref(), Some("/usr/local/bin/push"));
        assert!(c.set("reminders.lookback_secs", "0").is_err());
        assert!(c.set("notifier.kind", "carrier-pigeon").is_err());
        assert!(c.set("nope", "1").is_err());
    }

    #[test]
    fn oversized_lookback_is_rejected_not_panicking() {
        let mut c = Config::default();
        assert!(c.set("reminders.lookback_secs", "10000000000000000").is_err());
        assert_eq!(c.reminders.lookback_secs, 60);
        c.set("reminders.lookback_secs", "86400").unwrap();
        assert_eq!(c.poll_settings().unwrap().lookback, chrono::Duration::days(1));

        // a hand-edited file can still carry the value
        c.reminders.lookback_secs = 10_000_000_000_000_000;
        assert!(c.validate().is_err());
        assert!(c.poll_settings().is_err());

        let parsed: Config = toml::from_str("[reminders]\nlookback_secs = 10000000000000000\n").unwrap();
        assert!(parsed.validate().is_err());
    }
}
