use crate::index;
use crate::record;

/// File signature of a snapshot.
const MAGIC: [u8; 4] = *b"ETRI";

/// Bumped whenever the on-disk layout of `Snapshot` changes.
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Snapshot {
    magic: [u8; 4],
    version: u32,
    records: Vec<record::Record>,
}

/// Serializes the whole index to a binary snapshot with `bincode`.
///
/// Records are written in structural order (year, month, day, quarter,
/// insertion order), so reloading reproduces the same tree.
///
/// # Arguments
/// * `index` - Index to save.
/// * `path` - Destination file; parent directories are created when missing.
///
/// # Returns
/// * `anyhow::Result<()>` - Success or an error if serialization or writing fails.
pub fn save_snapshot<P: AsRef<std::path::Path>>(index: &index::TimeIndex, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let snapshot = Snapshot {
        magic: MAGIC,
        version: FORMAT_VERSION,
        records: index.records().cloned().collect(),
    };
    let data = bincode::serialize(&snapshot)?;
    std::fs::write(path, data)
        .map_err(|e| anyhow::anyhow!("Failed to write snapshot {}: {}", path.display(), e))?;
    log::info!("Saved {} records to {}", snapshot.records.len(), path.display());

    anyhow::Ok(())
}

/// Loads a snapshot written by `save_snapshot` and rebuilds the index.
///
/// The file is memory-mapped and decoded with `bincode`; records are then
/// reinserted with `add_record`.
///
/// # Errors
/// * If the file is missing or empty.
/// * If the signature or format version does not match.
/// * If decoding fails.
pub fn load_snapshot<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<index::TimeIndex> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("Cannot open snapshot {}: {}", path.display(), e))?;
    if file.metadata()?.len() == 0 {
        return Err(anyhow::anyhow!("Snapshot {} is empty", path.display()));
    }
    let mmap = unsafe { memmap2::Mmap::map(&file)? };

    let snapshot: Snapshot = bincode::deserialize(&mmap)
        .map_err(|e| anyhow::anyhow!("Failed to decode snapshot {}: {}", path.display(), e))?;
    if snapshot.magic != MAGIC {
        return Err(anyhow::anyhow!("{} is not a snapshot file", path.display()));
    }
    if snapshot.version != FORMAT_VERSION {
        return Err(anyhow::anyhow!(
            "Unsupported snapshot version {} in {} (expected {})",
            snapshot.version,
            path.display(),
            FORMAT_VERSION
        ));
    }

    let index: index::TimeIndex = snapshot.records.into_iter().collect();
    log::info!("Loaded {} records from {}", index.len(), path.display());
    anyhow::Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> index::TimeIndex {
        vec![
            record::Record::parse("2023-01-01", "12:30", [100.0, 50.0, 30.0, 120.0, 80.0]).unwrap(),
            record::Record::parse("2023-01-01", "13:30", [110.0, 55.0, 35.0, 130.0, 85.0]).unwrap(),
            record::Record::parse("2022-07-04", "05:59", [1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(),
            record::Record::parse("2023-01-01", "12:05", [7.0, 7.0, 7.0, 7.0, 7.0]).unwrap(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn snapshot_restores_identical_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tree.bin");
        let index = sample();
        save_snapshot(&index, &path).unwrap();
        let restored = load_snapshot(&path).unwrap();
        assert_eq!(restored, index);
        assert_eq!(restored.len(), 4);
    }

    #[test]
    fn empty_index_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        save_snapshot(&index::TimeIndex::new(), &path).unwrap();
        assert!(load_snapshot(&path).unwrap().is_empty());
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.bin");
        std::fs::write(&empty, b"").unwrap();
        assert!(load_snapshot(&empty).is_err());

        let garbage = dir.path().join("garbage.bin");
        std::fs::write(&garbage, b"XXXX\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00").unwrap();
        assert!(load_snapshot(&garbage).is_err());

        assert!(load_snapshot(dir.path().join("missing.bin")).is_err());
    }
}
