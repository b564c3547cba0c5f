use crate::config;
use crate::csv_processor;
use crate::index;
use crate::persistence;

/// Configures a custom Rayon thread pool with specified size.
///
/// # Arguments
/// * `num_threads` - Desired number of threads for the pool.
///
/// # Returns
/// * `Result<ThreadPool>` - Created thread pool or an error if creation fails.
pub fn configure_thread_pool(num_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
}

/// Resolves the requested thread count against the machine.
///
/// Requests above the number of logical CPUs are capped; `None` means the
/// global rayon pool size.
pub fn effective_threads(requested: Option<usize>) -> anyhow::Result<usize> {
    match requested {
        Some(0) => Err(anyhow::anyhow!("Number of threads must be a positive integer")),
        Some(n) => {
            let max_threads = num_cpus::get();
            if n > max_threads {
                log::warn!("Limiting thread count to {} (max available)", max_threads);
                Ok(max_threads)
            } else {
                Ok(n)
            }
        }
        None => Ok(rayon::current_num_threads()),
    }
}

/// Returns true when `path` names a binary snapshot rather than delimited text.
pub fn is_snapshot_path<P: AsRef<std::path::Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("bin"))
}

/// Builds an index from either a snapshot (`.bin`) or CSV/TXT input
/// (a file or a directory of files).
pub fn load_data<P: AsRef<std::path::Path>>(
    path: P,
    settings: &config::Settings,
) -> anyhow::Result<index::TimeIndex> {
    let path = path.as_ref();
    if is_snapshot_path(path) {
        return persistence::load_snapshot(path);
    }
    let mut index = index::TimeIndex::new();
    let report = csv_processor::load_csv(path, settings, &mut index)?;
    log::info!("Loading finished. Valid: {}, invalid: {}", report.valid, report.invalid);
    anyhow::Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        assert!(effective_threads(Some(0)).is_err());
        assert_eq!(effective_threads(Some(1)).unwrap(), 1);
        assert!(effective_threads(Some(usize::MAX)).unwrap() <= num_cpus::get());
    }

    #[test]
    fn picks_loader_by_extension() {
        assert!(is_snapshot_path("tree.bin"));
        assert!(is_snapshot_path("TREE.BIN"));
        assert!(!is_snapshot_path("ChartExport.csv"));
        assert!(!is_snapshot_path("data"));
    }

    #[test]
    fn loads_csv_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("in.csv");
        std::fs::write(&csv, "2023-01-01,12:30,100,50,30,120,80\n").unwrap();
        let settings = config::Settings {
            valid_log: None,
            error_log: None,
            ..config::Settings::default()
        };
        let from_csv = load_data(&csv, &settings).unwrap();
        assert_eq!(from_csv.len(), 1);

        let bin = dir.path().join("tree.bin");
        persistence::save_snapshot(&from_csv, &bin).unwrap();
        assert_eq!(load_data(&bin, &settings).unwrap(), from_csv);
    }
}
