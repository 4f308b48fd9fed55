//! Merges split part archives back into one archive per range.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::ExportResult;
use crate::sink::archive::{ARCHIVE_EXTENSION, read_csv_archive, write_csv_archive};
use crate::types::TableSchema;

const PART_MARKER: &str = "_part";

/// Groups the part archives in `directory` by the stem they were split from.
///
/// Parts are sorted by file name within each group.
pub fn find_part_groups(directory: &Path) -> ExportResult<BTreeMap<String, Vec<PathBuf>>> {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    if !directory.is_dir() {
        return Ok(groups);
    }

    let suffix = format!(".{ARCHIVE_EXTENSION}");
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(stem) = file_name.strip_suffix(&suffix) else {
            continue;
        };
        let Some((base, _)) = stem.rsplit_once(PART_MARKER) else {
            continue;
        };

        groups.entry(base.to_string()).or_default().push(path.clone());
    }

    for parts in groups.values_mut() {
        parts.sort();
    }

    Ok(groups)
}

/// Combines every part group of one table directory into `<base>.csv.gz`.
///
/// Parts are read back with `schema`, the output schema of the table, and kept
/// on disk. Waits `delay` between groups. Returns the combined archive paths.
pub async fn combine_parts(
    directory: &Path,
    schema: &TableSchema,
    delay: Duration,
) -> ExportResult<Vec<PathBuf>> {
    let groups = {
        let directory = directory.to_path_buf();
        tokio::task::spawn_blocking(move || find_part_groups(&directory)).await??
    };

    let mut combined = Vec::with_capacity(groups.len());
    let arrow_schema = schema.arrow_schema();

    for (index, (base, parts)) in groups.into_iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        debug!(table = schema.name(), base = %base, parts = parts.len(), "combining parts");

        let directory = directory.to_path_buf();
        let arrow_schema = arrow_schema.clone();
        let part_count = parts.len();
        let (archive, rows) = tokio::task::spawn_blocking(move || {
            let mut batches = Vec::new();
            for part in &parts {
                batches.extend(read_csv_archive(part, arrow_schema.clone())?);
            }

            let rows = batches.iter().map(|batch| batch.num_rows()).sum::<usize>();
            let archive = write_csv_archive(&directory, &base, &batches)?;

            ExportResult::Ok((archive, rows))
        })
        .await??;

        info!(
            table = schema.name(),
            archive = %archive.display(),
            parts = part_count,
            rows,
            "combined part archives"
        );

        combined.push(archive);
    }

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_are_grouped_by_base_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "visit_2025-01-18_to_2025-01-18_part2.csv.gz",
            "visit_2025-01-18_to_2025-01-18_part1.csv.gz",
            "visit_2025-01-19_to_2025-01-19.csv.gz",
            "visit_2025-01-20_to_2025-01-20_part1.csv",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let groups = find_part_groups(dir.path()).unwrap();

        assert_eq!(groups.len(), 1);
        let parts = &groups["visit_2025-01-18_to_2025-01-18"];
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("visit_2025-01-18_to_2025-01-18_part1.csv.gz"));
    }

    #[test]
    fn missing_directory_has_no_groups() {
        let dir = tempfile::tempdir().unwrap();

        assert!(find_part_groups(&dir.path().join("nope")).unwrap().is_empty());
    }
}
