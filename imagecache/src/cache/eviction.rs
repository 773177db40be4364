//! Maintenance pass: TTL expiry followed by LRU size enforcement.
//!
//! Runs synchronously after every write. Nothing is scanned in the
//! background; the disk budget is only enforced lazily here.
//!
//! 1. **Expire**: delete every file whose last-touched time is older than the
//!    TTL.
//! 2. **Size**: if the remaining files exceed the budget, delete them oldest
//!    last-touched first until the total fits.
//!
//! Expiring first means the budget is enforced against the smallest possible
//! working set, and expiry still happens when the directory is already
//! under budget.

use std::fmt;
use std::time::{Duration, Instant, SystemTime};

use crate::cache::disk::{is_expired, DiskEntry, DiskTier};
use crate::cache::events::{CacheEvent, CacheObserver};

/// Limits applied by a maintenance pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Maximum age since last touch.
    pub time_to_live: Duration,
    /// Disk budget in bytes.
    pub max_disk_bytes: u64,
}

/// Result of a maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Files deleted for outliving the TTL.
    pub expired: usize,
    /// Files deleted to get under the budget.
    pub evicted: usize,
    /// Bytes freed by both passes.
    pub bytes_freed: u64,
    /// Total size of the directory after the pass.
    pub remaining_bytes: u64,
    /// Deletions that failed.
    pub failures: usize,
    /// Duration of the pass in milliseconds.
    pub duration_ms: u64,
}

impl fmt::Display for EvictionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Maintenance: expired {} files, evicted {} files, freed {} bytes ({} bytes remain) in {}ms",
            self.expired, self.evicted, self.bytes_freed, self.remaining_bytes, self.duration_ms
        )
    }
}

/// Sort entries oldest last-touched first.
///
/// Ties are broken by file name so the order is deterministic within a run.
pub fn sort_oldest_first(entries: &mut [DiskEntry]) {
    entries.sort_by(|a, b| {
        a.last_touched
            .cmp(&b.last_touched)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Run the expire pass and then the size pass against `disk`.
///
/// Enumeration failures abort the pass with a `MaintenanceFailed` event;
/// individual deletion failures are reported and skipped.
pub async fn run_maintenance(
    disk: &DiskTier,
    policy: EvictionPolicy,
    observer: &dyn CacheObserver,
) -> EvictionReport {
    let start = Instant::now();
    let mut report = EvictionReport::default();

    if let Err(error) = expire_pass(disk, policy.time_to_live, observer, &mut report).await {
        observer.on_event(&CacheEvent::MaintenanceFailed { error });
    } else if let Err(error) = size_pass(disk, policy.max_disk_bytes, observer, &mut report).await {
        observer.on_event(&CacheEvent::MaintenanceFailed { error });
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    report
}

async fn expire_pass(
    disk: &DiskTier,
    ttl: Duration,
    observer: &dyn CacheObserver,
    report: &mut EvictionReport,
) -> std::io::Result<()> {
    let now = SystemTime::now();

    for entry in disk.list().await? {
        if !is_expired(entry.last_touched, now, ttl) {
            continue;
        }
        match disk.delete(&entry.name).await {
            Ok(_) => {
                report.expired += 1;
                report.bytes_freed += entry.size;
                observer.on_event(&CacheEvent::Expired {
                    file: entry.name,
                    bytes: entry.size,
                });
            }
            Err(error) => {
                report.failures += 1;
                observer.on_event(&CacheEvent::DeleteFailed {
                    file: entry.name,
                    error,
                });
            }
        }
    }

    Ok(())
}

async fn size_pass(
    disk: &DiskTier,
    max_bytes: u64,
    observer: &dyn CacheObserver,
    report: &mut EvictionReport,
) -> std::io::Result<()> {
    let mut total = disk.total_size().await?;
    if total <= max_bytes {
        report.remaining_bytes = total;
        return Ok(());
    }

    let mut entries = disk.list().await?;
    sort_oldest_first(&mut entries);

    for entry in entries {
        if total <= max_bytes {
            break;
        }
        match disk.delete(&entry.name).await {
            Ok(_) => {
                total = total.saturating_sub(entry.size);
                report.evicted += 1;
                report.bytes_freed += entry.size;
                observer.on_event(&CacheEvent::Evicted {
                    file: entry.name,
                    bytes: entry.size,
                });
            }
            Err(error) => {
                report.failures += 1;
                observer.on_event(&CacheEvent::DeleteFailed {
                    file: entry.name,
                    error,
                });
            }
        }
    }

    report.remaining_bytes = total;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::events::TracingObserver;
    use filetime::FileTime;
    use tempfile::TempDir;

    async fn write_aged(tier: &DiskTier, name: &str, size: usize, age_secs: u64) {
        tier.write(name, &vec![0u8; size]).await.unwrap();
        let time = SystemTime::now() - Duration::from_secs(age_secs);
        filetime::set_file_mtime(tier.path_for(name), FileTime::from_system_time(time)).unwrap();
    }

    fn names(entries: &[DiskEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn policy(ttl_secs: u64, max_disk_bytes: u64) -> EvictionPolicy {
        EvictionPolicy {
            time_to_live: Duration::from_secs(ttl_secs),
            max_disk_bytes,
        }
    }

    #[test]
    fn test_sort_oldest_first_with_tie_break() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let entry = |name: &str, secs: u64| DiskEntry {
            name: name.to_string(),
            size: 1,
            last_touched: t0 + Duration::from_secs(secs),
        };
        let mut entries = vec![entry("c", 5), entry("b", 1), entry("a", 5), entry("d", 0)];

        sort_oldest_first(&mut entries);

        assert_eq!(names(&entries), vec!["d", "b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_expire_pass_runs_under_budget() {
        let temp = TempDir::new().unwrap();
        let tier = DiskTier::new(temp.path());
        write_aged(&tier, "old.img", 10, 3_600).await;
        write_aged(&tier, "new.img", 10, 0).await;

        let report = run_maintenance(&tier, policy(60, 1_000_000), &TracingObserver).await;

        assert_eq!(report.expired, 1);
        assert_eq!(report.evicted, 0);
        assert_eq!(report.remaining_bytes, 10);
        assert_eq!(names(&tier.list().await.unwrap()), vec!["new.img"]);
    }

    #[tokio::test]
    async fn test_size_pass_evicts_oldest_first() {
        let temp = TempDir::new().unwrap();
        let tier = DiskTier::new(temp.path());
        write_aged(&tier, "a.img", 400, 40).await;
        write_aged(&tier, "b.img", 400, 30).await;
        write_aged(&tier, "c.img", 400, 20).await;
        write_aged(&tier, "d.img", 400, 10).await;

        let report = run_maintenance(&tier, policy(3_600, 1_000), &TracingObserver).await;

        assert_eq!(report.evicted, 2);
        assert_eq!(report.bytes_freed, 800);
        assert_eq!(report.remaining_bytes, 800);
        let mut remaining = tier.list().await.unwrap();
        sort_oldest_first(&mut remaining);
        assert_eq!(names(&remaining), vec!["c.img", "d.img"]);
    }

    #[tokio::test]
    async fn test_expire_then_size() {
        let temp = TempDir::new().unwrap();
        let tier = DiskTier::new(temp.path());
        write_aged(&tier, "expired.img", 600, 7_200).await;
        write_aged(&tier, "older.img", 300, 50).await;
        write_aged(&tier, "newer.img", 300, 5).await;

        // Expiry alone brings the directory to 600 bytes, within budget.
        let report = run_maintenance(&tier, policy(3_600, 700), &TracingObserver).await;

        assert_eq!(report.expired, 1);
        assert_eq!(report.evicted, 0);
        let mut remaining = tier.list().await.unwrap();
        sort_oldest_first(&mut remaining);
        assert_eq!(names(&remaining), vec!["older.img", "newer.img"]);
    }

    #[tokio::test]
    async fn test_zero_budget_empties_directory() {
        let temp = TempDir::new().unwrap();
        let tier = DiskTier::new(temp.path());
        write_aged(&tier, "a.img", 10, 2).await;
        write_aged(&tier, "b.img", 10, 1).await;

        let report = run_maintenance(&tier, policy(3_600, 0), &TracingObserver).await;

        assert_eq!(report.evicted, 2);
        assert_eq!(report.remaining_bytes, 0);
        assert!(tier.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_maintenance_on_missing_directory() {
        let temp = TempDir::new().unwrap();
        let tier = DiskTier::new(temp.path().join("absent"));

        let report = run_maintenance(&tier, policy(60, 0), &TracingObserver).await;

        assert_eq!(report, EvictionReport {
            duration_ms: report.duration_ms,
            ..EvictionReport::default()
        });
    }

    #[test]
    fn test_report_display() {
        let report = EvictionReport {
            expired: 3,
            evicted: 2,
            bytes_freed: 1024,
            remaining_bytes: 2048,
            failures: 0,
            duration_ms: 7,
        };
        let display = report.to_string();
        assert!(display.contains("expired 3"));
        assert!(display.contains("evicted 2"));
        assert!(display.contains("1024"));
        assert!(display.contains("7ms"));
    }
}
