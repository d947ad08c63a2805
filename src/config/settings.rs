//! Runtime settings loaded from environment variables.
//!
//! `BOT_TOKEN` is read separately in `main`, right before use, so it never ends
//! up in a struct that might be logged.

use crate::errors::{Error, Result};
use chrono_tz::Tz;
use std::{path::PathBuf, str::FromStr, time::Duration};

/// Application settings shared by the bot and the backup scheduler.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Telegram user IDs allowed to use admin commands (`ADMIN_ID`, comma separated)
    pub admin_ids: Vec<i64>,
    /// `SeaORM` connection string (`DATABASE_URL`)
    pub database_url: String,
    /// Shop timezone used for the backup schedule and timestamps (`TIMEZONE`)
    pub timezone: Tz,
    /// Local backup directory (`BACKUP_DIR`)
    pub backup_dir: PathBuf,
    /// Second directory receiving a copy of every backup (`BACKUP_MIRROR_DIR`)
    pub backup_mirror_dir: Option<PathBuf>,
    /// Hour of day (0-23) at which the daily backup runs (`BACKUP_HOUR`)
    pub backup_hour: u32,
    /// Backups older than this many days are deleted (`BACKUP_RETENTION_DAYS`)
    pub backup_retention_days: i64,
    /// Products with fewer than this many measurement steps in stock count as low (`LOW_STOCK_STEPS`)
    pub low_stock_steps: i64,
    /// Optional catalog seed file (`CATALOG_PATH`)
    pub catalog_path: PathBuf,
    /// Idle dialogues are dropped after this long (`DIALOGUE_TTL_MINUTES`)
    pub dialogue_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admin_ids: Vec::new(),
            database_url: super::database::DEFAULT_DATABASE_URL.to_string(),
            timezone: Tz::UTC,
            backup_dir: PathBuf::from("backups"),
            backup_mirror_dir: None,
            backup_hour: 4,
            backup_retention_days: 7,
            low_stock_steps: 3,
            catalog_path: PathBuf::from("catalog.toml"),
            dialogue_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Used by `from_env` and by tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let admin_ids = get("ADMIN_ID")
            .map(|raw| parse_admin_ids(&raw))
            .transpose()?
            .unwrap_or_default();

        let timezone = match get("TIMEZONE") {
            Some(name) => Tz::from_str(&name).map_err(|e| Error::Config {
                message: format!("Invalid TIMEZONE '{name}': {e}"),
            })?,
            None => defaults.timezone,
        };

        let backup_hour = parse_or(get("BACKUP_HOUR"), "BACKUP_HOUR", defaults.backup_hour)?;
        if backup_hour > 23 {
            return Err(Error::Config {
                message: format!("BACKUP_HOUR must be between 0 and 23, got {backup_hour}"),
            });
        }

        let backup_retention_days = parse_or(
            get("BACKUP_RETENTION_DAYS"),
            "BACKUP_RETENTION_DAYS",
            defaults.backup_retention_days,
        )?;
        if backup_retention_days < 1 {
            return Err(Error::Config {
                message: "BACKUP_RETENTION_DAYS must be at least 1".to_string(),
            });
        }

        let ttl_minutes: u64 = parse_or(get("DIALOGUE_TTL_MINUTES"), "DIALOGUE_TTL_MINUTES", 30)?;

        Ok(Self {
            admin_ids,
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            timezone,
            backup_dir: get("BACKUP_DIR").map_or(defaults.backup_dir, PathBuf::from),
            backup_mirror_dir: get("BACKUP_MIRROR_DIR").map(PathBuf::from),
            backup_hour,
            backup_retention_days,
            low_stock_steps: parse_or(
                get("LOW_STOCK_STEPS"),
                "LOW_STOCK_STEPS",
                defaults.low_stock_steps,
            )?,
            catalog_path: get("CATALOG_PATH").map_or(defaults.catalog_path, PathBuf::from),
            dialogue_ttl: Duration::from_secs(ttl_minutes * 60),
        })
    }

    /// Whether the given Telegram user is a shop administrator.
    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|e| Error::Config {
                message: format!("Invalid ADMIN_ID entry '{part}': {e}"),
            })
        })
        .collect()
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |raw| {
        raw.parse::<T>().map_err(|e| Error::Config {
            message: format!("Invalid {key} '{raw}': {e}"),
        })
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert!(settings.admin_ids.is_empty());
        assert_eq!(settings.database_url, crate::config::database::DEFAULT_DATABASE_URL);
        assert_eq!(settings.backup_hour, 4);
        assert_eq!(settings.backup_retention_days, 7);
        assert_eq!(settings.timezone, Tz::UTC);
        assert_eq!(settings.backup_dir, PathBuf::from("backups"));
        assert!(settings.backup_mirror_dir.is_none());
    }

    #[test]
    fn test_parses_all_values() {
        let settings = Settings::from_lookup(lookup(&[
            ("ADMIN_ID", "123, 456"),
            ("DATABASE_URL", "sqlite://shop.db?mode=rwc"),
            ("TIMEZONE", "Europe/Moscow"),
            ("BACKUP_HOUR", "3"),
            ("BACKUP_RETENTION_DAYS", "14"),
            ("BACKUP_MIRROR_DIR", "/mnt/remote"),
            ("DIALOGUE_TTL_MINUTES", "5"),
        ]))
        .unwrap();

        assert_eq!(settings.admin_ids, vec![123, 456]);
        assert!(settings.is_admin(456));
        assert!(!settings.is_admin(789));
        assert_eq!(settings.database_url, "sqlite://shop.db?mode=rwc");
        assert_eq!(settings.timezone, chrono_tz::Europe::Moscow);
        assert_eq!(settings.backup_hour, 3);
        assert_eq!(settings.backup_retention_days, 14);
        assert_eq!(settings.backup_mirror_dir, Some(PathBuf::from("/mnt/remote")));
        assert_eq!(settings.dialogue_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            Settings::from_lookup(lookup(&[("ADMIN_ID", "abc")])),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[("TIMEZONE", "Mars/Olympus")])),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[("BACKUP_HOUR", "24")])),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[("BACKUP_RETENTION_DAYS", "0")])),
            Err(Error::Config { .. })
        ));
    }
}
