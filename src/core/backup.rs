//! Backup service - Timestamped copies of the SQLite file.
//!
//! A backup is a plain file copy named `<stem>_<YYYYmmdd_HHMMSS>.db`. Each copy
//! also goes to an optional mirror directory (a mounted remote drive, for
//! example). Old copies in the local directory are pruned by the timestamp in
//! their name; files whose name does not parse are never touched.
//!
//! [`BackupScheduler`] runs the job once a day at a fixed local hour until its
//! cancellation token fires.

use crate::{
    config::{Settings, database::sqlite_file_path},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const BACKUP_EXTENSION: &str = "db";

/// Where and when backups are made.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// The live SQLite file
    pub source: PathBuf,
    /// Local directory that keeps the copies
    pub backup_dir: PathBuf,
    /// Optional second destination
    pub mirror_dir: Option<PathBuf>,
    /// Copies older than this many days are deleted
    pub retention_days: i64,
    /// Local hour of the daily run
    pub hour: u32,
    /// Timezone used for the schedule and file names
    pub timezone: Tz,
}

impl BackupConfig {
    /// Builds the backup configuration from application settings.
    ///
    /// # Errors
    /// Returns `Config` if the database URL does not point at a SQLite file.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let source = sqlite_file_path(&settings.database_url).ok_or_else(|| Error::Config {
            message: format!(
                "Cannot back up '{}': not a file-based SQLite database",
                settings.database_url
            ),
        })?;

        Ok(Self {
            source,
            backup_dir: settings.backup_dir.clone(),
            mirror_dir: settings.backup_mirror_dir.clone(),
            retention_days: settings.backup_retention_days,
            hour: settings.backup_hour,
            timezone: settings.timezone,
        })
    }

    /// Current wall-clock time in the configured timezone.
    #[must_use]
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }
}

/// Outcome of one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    /// The new local copy
    pub path: PathBuf,
    /// The mirror copy, if a mirror is configured and the copy succeeded
    pub mirrored: Option<PathBuf>,
    /// Number of expired copies deleted
    pub removed: usize,
}

/// A backup file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    /// Full path
    pub path: PathBuf,
    /// Timestamp parsed from the file name
    pub created: NaiveDateTime,
}

/// File name for a backup of `source` taken at `now`.
#[must_use]
pub fn backup_file_name(source: &Path, now: NaiveDateTime) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("database");
    format!(
        "{}_{}.{}",
        stem,
        now.format(TIMESTAMP_FORMAT),
        BACKUP_EXTENSION
    )
}

/// Extracts the timestamp from a backup file name, if it has one.
#[must_use]
pub fn parse_backup_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name.strip_suffix(&format!(".{BACKUP_EXTENSION}"))?;
    let mut parts = stem.rsplitn(3, '_');
    let time = parts.next()?;
    let date = parts.next()?;
    parts.next()?;
    NaiveDateTime::parse_from_str(&format!("{date}_{time}"), TIMESTAMP_FORMAT).ok()
}

/// Copies the database into the backup directory (and the mirror), then prunes
/// expired copies.
///
/// Blocking; the scheduler calls it from `spawn_blocking`.
///
/// # Errors
/// Returns `Backup` if the source file is missing or the local copy fails.
/// A failing mirror copy is logged and reported as `mirrored: None`.
pub fn create_backup(config: &BackupConfig, now: NaiveDateTime) -> Result<BackupReport> {
    if !config.source.is_file() {
        return Err(Error::Backup {
            message: format!("Database file {} not found", config.source.display()),
        });
    }

    let file_name = backup_file_name(&config.source, now);
    let path = copy_into(&config.source, &config.backup_dir, &file_name).map_err(|e| {
        Error::Backup {
            message: format!(
                "Copy to {} failed: {}",
                config.backup_dir.display(),
                e
            ),
        }
    })?;
    info!("Created backup {}", path.display());

    let mirrored = config.mirror_dir.as_ref().and_then(|mirror| {
        match copy_into(&config.source, mirror, &file_name) {
            Ok(copy) => {
                info!("Mirrored backup to {}", copy.display());
                Some(copy)
            }
            Err(e) => {
                error!("Mirror copy to {} failed: {}", mirror.display(), e);
                None
            }
        }
    });

    let removed = cleanup_old_backups(&config.backup_dir, config.retention_days, now)?;

    Ok(BackupReport {
        path,
        mirrored,
        removed,
    })
}

fn copy_into(source: &Path, dir: &Path, file_name: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let target = dir.join(file_name);
    fs::copy(source, &target)?;
    Ok(target)
}

/// Deletes backups whose embedded timestamp is older than `retention_days`.
///
/// Returns the number of files removed. Failing to remove one file is logged
/// and does not stop the cleanup.
pub fn cleanup_old_backups(dir: &Path, retention_days: i64, now: NaiveDateTime) -> Result<usize> {
    let cutoff = now - chrono::Duration::days(retention_days);
    let mut removed = 0;

    for backup in list_backups(dir)? {
        if backup.created >= cutoff {
            continue;
        }
        match fs::remove_file(&backup.path) {
            Ok(()) => {
                info!("Removed expired backup {}", backup.path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove {}: {}", backup.path.display(), e),
        }
    }

    Ok(removed)
}

/// Backups in `dir`, newest first. A missing directory has no backups.
pub fn list_backups(dir: &Path) -> Result<Vec<BackupFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let created = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_backup_timestamp);
        if let Some(created) = created {
            backups.push(BackupFile { path, created });
        }
    }

    backups.sort_by(|a, b| b.created.cmp(&a.created));
    Ok(backups)
}

/// Runs [`create_backup`] on a blocking thread.
pub async fn run_backup(config: BackupConfig) -> Result<BackupReport> {
    let now = config.local_now();
    tokio::task::spawn_blocking(move || create_backup(&config, now))
        .await
        .map_err(|e| Error::Backup {
            message: format!("Backup task failed: {e}"),
        })?
}

/// Time from `now` until the next `hour:00` in `tz`.
#[must_use]
pub fn duration_until_next_run(hour: u32, tz: Tz, now: DateTime<Utc>) -> Duration {
    let fallback = Duration::from_secs(60);
    let run_time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let local_now = now.with_timezone(&tz);
    let today = local_now.date_naive();

    let target_date = if local_now.time() >= run_time {
        today + chrono::Duration::days(1)
    } else {
        today
    };

    // A run time that falls into a DST gap resolves to one hour later
    let target = target_date
        .and_time(run_time)
        .and_local_timezone(tz)
        .earliest()
        .or_else(|| {
            (target_date.and_time(run_time) + chrono::Duration::hours(1))
                .and_local_timezone(tz)
                .earliest()
        });

    let Some(target) = target else {
        error!("Cannot resolve local backup time, retrying in a minute");
        return fallback;
    };

    target
        .signed_duration_since(local_now)
        .to_std()
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or(fallback)
}

/// Daily backup loop.
pub struct BackupScheduler {
    config: BackupConfig,
    shutdown: CancellationToken,
}

impl BackupScheduler {
    /// Creates a scheduler that stops when `shutdown` is cancelled.
    #[must_use]
    pub const fn new(config: BackupConfig, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    /// Main loop: sleep until the next run, back up, repeat.
    pub async fn run(self) {
        info!(
            "Backup scheduler started (daily at {:02}:00 {})",
            self.config.hour, self.config.timezone
        );

        loop {
            let sleep_duration =
                duration_until_next_run(self.config.hour, self.config.timezone, Utc::now());
            info!(
                "Next backup in {} minutes",
                sleep_duration.as_secs() / 60
            );

            tokio::select! {
                () = tokio::time::sleep(sleep_duration) => {}
                () = self.shutdown.cancelled() => {
                    info!("Backup scheduler received shutdown signal");
                    break;
                }
            }

            match run_backup(self.config.clone()).await {
                Ok(report) => info!(
                    "Scheduled backup done: {} ({} expired removed)",
                    report.path.display(),
                    report.removed
                ),
                Err(e) => error!("Scheduled backup failed: {}", e),
            }
        }

        info!("Backup scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn config_in(tmp: &TempDir, mirror: Option<PathBuf>) -> BackupConfig {
        let source = tmp.path().join("treat_shop.sqlite");
        fs::write(&source, b"sqlite bytes").unwrap();
        BackupConfig {
            source,
            backup_dir: tmp.path().join("backups"),
            mirror_dir: mirror,
            retention_days: 7,
            hour: 4,
            timezone: chrono_tz::UTC,
        }
    }

    #[test]
    fn test_backup_file_name_and_parse() {
        let now = at(2026, 3, 9, 4, 0, 5);
        let name = backup_file_name(Path::new("data/treat_shop.sqlite"), now);
        assert_eq!(name, "treat_shop_20260309_040005.db");
        assert_eq!(parse_backup_timestamp(&name), Some(now));

        assert_eq!(parse_backup_timestamp("notes.txt"), None);
        assert_eq!(parse_backup_timestamp("treat_shop_latest.db"), None);
        assert_eq!(parse_backup_timestamp("20260309_040005.db"), None);
    }

    #[test]
    fn test_create_backup_copies_and_mirrors() {
        let tmp = TempDir::new().unwrap();
        let mirror = tmp.path().join("mirror");
        let config = config_in(&tmp, Some(mirror.clone()));
        let now = at(2026, 3, 9, 4, 0, 0);

        let report = create_backup(&config, now).unwrap();

        assert_eq!(
            report.path,
            config.backup_dir.join("treat_shop_20260309_040000.db")
        );
        assert_eq!(fs::read(&report.path).unwrap(), b"sqlite bytes");
        assert_eq!(
            report.mirrored,
            Some(mirror.join("treat_shop_20260309_040000.db"))
        );
        assert_eq!(report.removed, 0);
    }

    #[test]
    fn test_create_backup_missing_source() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(&tmp, None);
        config.source = tmp.path().join("missing.sqlite");

        let result = create_backup(&config, at(2026, 3, 9, 4, 0, 0));
        assert!(matches!(result.unwrap_err(), Error::Backup { .. }));
    }

    #[test]
    fn test_cleanup_respects_retention() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let now = at(2026, 3, 20, 4, 0, 0);

        let old = dir.join(backup_file_name(Path::new("shop.sqlite"), at(2026, 3, 12, 4, 0, 0)));
        let recent = dir.join(backup_file_name(Path::new("shop.sqlite"), at(2026, 3, 14, 4, 0, 0)));
        let today = dir.join(backup_file_name(Path::new("shop.sqlite"), now));
        let unrelated = dir.join("readme.db");
        for path in [&old, &recent, &today, &unrelated] {
            fs::write(path, b"x").unwrap();
        }

        let removed = cleanup_old_backups(dir, 7, now).unwrap();

        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(recent.exists());
        assert!(today.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_list_backups_newest_first() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        for day in [3, 9, 5] {
            let name = backup_file_name(Path::new("shop.sqlite"), at(2026, 3, day, 4, 0, 0));
            fs::write(dir.join(name), b"x").unwrap();
        }

        let days: Vec<u32> = list_backups(dir)
            .unwrap()
            .iter()
            .map(|b| chrono::Datelike::day(&b.created))
            .collect();
        assert_eq!(days, vec![9, 5, 3]);

        assert!(list_backups(&dir.join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_duration_until_next_run() {
        let utc = chrono_tz::UTC;

        let before = Utc.with_ymd_and_hms(2026, 1, 1, 3, 0, 0).unwrap();
        assert_eq!(
            duration_until_next_run(4, utc, before),
            Duration::from_secs(3600)
        );

        let after = Utc.with_ymd_and_hms(2026, 1, 1, 5, 0, 0).unwrap();
        assert_eq!(
            duration_until_next_run(4, utc, after),
            Duration::from_secs(23 * 3600)
        );

        // 00:00 UTC is 03:00 in Moscow (UTC+3 all year)
        let midnight = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            duration_until_next_run(4, chrono_tz::Europe::Moscow, midnight),
            Duration::from_secs(3600)
        );
    }

    #[tokio::test]
    async fn test_run_backup_on_blocking_thread() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, None);

        let report = run_backup(config.clone()).await.unwrap();
        assert!(report.path.starts_with(&config.backup_dir));
        assert_eq!(list_backups(&config.backup_dir).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_cancel() {
        let tmp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let scheduler = BackupScheduler::new(config_in(&tmp, None), token.clone());

        let handle = tokio::spawn(scheduler.run());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
