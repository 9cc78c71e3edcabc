//! Re-run the evaluator on a handful of examples and fold the fresh results
//! into the existing results file.
//!
//! The dataset file is narrowed in place to the requested examples for the
//! duration of the evaluator run and moved back from its backup afterwards,
//! whether or not the evaluator managed to produce anything.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde_json::Value;

use crate::{
    backup::{backup_path, copy_to_backup, restore_from_backup},
    evaluator::{Evaluator, ModelMode},
    jsonl::{read_keyed_records, write_records},
};

/// The two files a run works on. The evaluator is expected to read the
/// dataset and write the results file at these same locations.
#[derive(Debug, Clone)]
pub struct RerunPaths {
    pub dataset: PathBuf,
    pub results: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RerunRequest {
    pub ids: Vec<i64>,
    pub model: String,
    pub mode: ModelMode,
    /// Move a leftover `<dataset>.backup`, or a `<results>.backup` whose
    /// results file is gone, back into place instead of refusing to run.
    pub restore_stale_backup: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RerunOutcome {
    Merged(MergeSummary),
    /// The evaluator left no results file behind.
    NoNewResults { results_backup: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    pub existing: usize,
    pub new: usize,
    pub merged: usize,
    /// Ids the evaluator wrote, in the order it wrote them.
    pub new_ids: Vec<i64>,
    pub results_file: PathBuf,
    pub results_backup: Option<PathBuf>,
}

impl MergeSummary {
    pub fn print(&self) {
        println!("\n{}", "=".repeat(70));
        println!("SUMMARY");
        println!("{}", "=".repeat(70));
        println!("Total results: {}", self.merged);
        println!("Newly added IDs: {:?}", self.new_ids);
        match &self.results_backup {
            Some(b) => println!("Backup saved at: {}", b.display()),
            None => println!("Backup saved at: (none - no earlier results existed)"),
        }
    }
}

/// Dataset records picked for a run, plus the requested ids that were not found.
#[derive(Debug, Default)]
pub struct Selection {
    pub records: Vec<Value>,
    pub missing: Vec<i64>,
}

/// Keep dataset records whose id was requested, in dataset order.
pub fn select_records(dataset: Vec<(i64, Value)>, ids: &[i64]) -> Selection {
    let wanted: HashSet<i64> = ids.iter().copied().collect();
    let mut found = HashSet::new();

    let records: Vec<Value> = dataset
        .into_iter()
        .filter(|(id, _)| wanted.contains(id))
        .map(|(id, record)| {
            found.insert(id);
            record
        })
        .collect();

    let missing = ids.iter().copied().filter(|id| !found.contains(id)).collect();
    Selection { records, missing }
}

/// Index records by id; a later record with the same id replaces the earlier
/// one. Also returns the ids in first-seen order.
pub fn index_by_id(records: Vec<(i64, Value)>) -> (BTreeMap<i64, Value>, Vec<i64>) {
    let mut map = BTreeMap::new();
    let mut order = Vec::new();
    for (id, record) in records {
        if map.insert(id, record).is_none() {
            order.push(id);
        }
    }
    (map, order)
}

/// New results overwrite old ones with the same id; every other old id survives.
pub fn merge_results(
    mut existing: BTreeMap<i64, Value>,
    new: BTreeMap<i64, Value>,
) -> BTreeMap<i64, Value> {
    existing.extend(new);
    existing
}

/// Run the whole select / evaluate / restore / merge procedure.
pub fn run_and_merge(
    paths: &RerunPaths,
    request: &RerunRequest,
    evaluator: &dyn Evaluator,
) -> Result<RerunOutcome> {
    println!("Running evaluation on examples: {:?}", request.ids);
    info!(
        "rerun ids={:?} model={} mode={} dataset={} results={}",
        request.ids,
        request.model,
        request.mode,
        paths.dataset.display(),
        paths.results.display()
    );

    check_stale_dataset_backup(&paths.dataset, request.restore_stale_backup)?;
    check_orphaned_results_backup(&paths.results, request.restore_stale_backup)?;

    // Step 1: existing results (+ backup)
    let (existing, results_backup) = if paths.results.exists() {
        println!("\nLoading existing results from {}", paths.results.display());
        let (existing, _) = index_by_id(read_keyed_records(&paths.results)?);
        println!("✓ Found {} existing results", existing.len());

        let backup = copy_to_backup(&paths.results)?;
        println!("✓ Backed up to {}", backup.display());
        info!("results backed up to {}", backup.display());
        (existing, Some(backup))
    } else {
        println!("\nNo existing results found - will create new file");
        (BTreeMap::new(), None)
    };

    // Step 2: pick the requested examples
    let selection = select_records(read_keyed_records(&paths.dataset)?, &request.ids);
    println!("\n✓ Selected {} examples from dataset", selection.records.len());
    if !selection.missing.is_empty() {
        warn!("ids not found in dataset: {:?}", selection.missing);
        println!("⚠ Warning: Could not find IDs: {:?}", selection.missing);
    }

    // Steps 3-5 run against a narrowed dataset; step 6 always puts it back
    copy_to_backup(&paths.dataset)?;
    let narrowed = evaluate_narrowed(paths, &selection, request, evaluator);

    println!("\n{}", "=".repeat(70));
    println!("Cleaning up...");
    println!("{}", "=".repeat(70));
    if let Err(restore_err) = restore_from_backup(&paths.dataset) {
        return Err(match narrowed {
            Err(eval_err) => {
                restore_err.context(format!("evaluator step failed first: {eval_err:#}"))
            }
            Ok(()) => restore_err,
        });
    }
    println!("✓ Original dataset restored");
    info!("dataset restored: {}", paths.dataset.display());
    narrowed?;

    // Step 7: whatever the evaluator produced
    if !paths.results.exists() {
        warn!("evaluator produced no {}", paths.results.display());
        println!("✗ No new results generated");
        return Ok(RerunOutcome::NoNewResults { results_backup });
    }
    let (new, new_ids) = index_by_id(read_keyed_records(&paths.results)?);
    println!("✓ Generated {} new results", new.len());

    // Step 8: merge and write sorted by id
    println!("\n{}", "=".repeat(70));
    println!("Merging results...");
    println!("{}", "=".repeat(70));

    let existing_count = existing.len();
    let new_count = new.len();
    let merged = merge_results(existing, new);

    println!("Existing results: {existing_count}");
    println!("New results: {new_count}");
    println!("Total merged: {}", merged.len());

    write_records(&paths.results, merged.values())?;
    println!("\n✓ Merged results written to {}", paths.results.display());
    info!(
        "merged existing={existing_count} new={new_count} total={} -> {}",
        merged.len(),
        paths.results.display()
    );

    Ok(RerunOutcome::Merged(MergeSummary {
        existing: existing_count,
        new: new_count,
        merged: merged.len(),
        new_ids,
        results_file: paths.results.clone(),
        results_backup,
    }))
}

// A leftover backup means an earlier run never restored the dataset; the
// file at the dataset path may still be a narrowed subset.
fn check_stale_dataset_backup(dataset: &Path, restore: bool) -> Result<()> {
    let stale = backup_path(dataset);
    if !stale.exists() {
        return Ok(());
    }
    if !restore {
        bail!(
            "stale dataset backup {} found; {} may still be a narrowed copy from an \
             interrupted run. Restore it by hand or pass --restore-stale-backup",
            stale.display(),
            dataset.display()
        );
    }
    warn!(
        "restoring {} from stale backup {}",
        dataset.display(),
        stale.display()
    );
    println!("⚠ Restoring dataset from stale backup {}", stale.display());
    restore_from_backup(dataset)
}

// A results backup with no results file next to it is what a failed run
// leaves behind; starting from an empty map would drop every old id.
fn check_orphaned_results_backup(results: &Path, restore: bool) -> Result<()> {
    let orphan = backup_path(results);
    if results.exists() || !orphan.exists() {
        return Ok(());
    }
    if !restore {
        bail!(
            "{} is missing but its backup {} exists; an earlier run produced no new \
             results. Restore it by hand or pass --restore-stale-backup",
            results.display(),
            orphan.display()
        );
    }
    warn!(
        "restoring {} from orphaned backup {}",
        results.display(),
        orphan.display()
    );
    println!("⚠ Restoring results from backup {}", orphan.display());
    restore_from_backup(results)
}

fn evaluate_narrowed(
    paths: &RerunPaths,
    selection: &Selection,
    request: &RerunRequest,
    evaluator: &dyn Evaluator,
) -> Result<()> {
    write_records(&paths.dataset, &selection.records)?;
    println!(
        "✓ Created temporary dataset with {} examples",
        selection.records.len()
    );

    // Step 4: evaluator starts from an empty results file
    if paths.results.exists() {
        fs::remove_file(&paths.results)
            .with_context(|| format!("removing {}", paths.results.display()))?;
    }

    println!("\n{}", "=".repeat(70));
    println!("Running evaluator...");
    println!("{}\n", "=".repeat(70));
    evaluator.evaluate(&paths.dataset, &request.model, request.mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keyed(ids: &[i64]) -> Vec<(i64, Value)> {
        ids.iter().map(|&id| (id, json!({"id": id}))).collect()
    }

    #[test]
    fn selection_keeps_dataset_order_and_reports_missing() {
        let selection = select_records(keyed(&[1, 2, 4]), &[1, 2, 3]);
        let ids: Vec<i64> = selection
            .records
            .iter()
            .filter_map(crate::jsonl::record_id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(selection.missing, vec![3]);

        let reordered = select_records(keyed(&[9, 4, 7]), &[7, 9]);
        assert_eq!(reordered.records, vec![json!({"id": 9}), json!({"id": 7})]);
    }

    #[test]
    fn merge_counts_and_overlap_precedence() {
        let (existing, _) = index_by_id(vec![
            (1, json!({"id": 1, "v": "old"})),
            (2, json!({"id": 2, "v": "old"})),
            (3, json!({"id": 3, "v": "old"})),
        ]);
        let (new, _) = index_by_id(vec![
            (3, json!({"id": 3, "v": "new"})),
            (4, json!({"id": 4, "v": "new"})),
        ]);

        let merged = merge_results(existing, new);
        // N + M - K = 3 + 2 - 1
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[&3]["v"], "new");
        assert_eq!(merged[&1]["v"], "old");
        assert_eq!(merged.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn index_by_id_last_wins_first_order() {
        let (map, order) = index_by_id(vec![
            (5, json!({"id": 5, "n": 1})),
            (2, json!({"id": 2})),
            (5, json!({"id": 5, "n": 2})),
        ]);
        assert_eq!(order, vec![5, 2]);
        assert_eq!(map[&5]["n"], 2);
    }

    #[test]
    fn stale_backup_blocks_unless_restore_requested() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.jsonl");
        fs::write(&dataset, "{\"id\":1}\n").unwrap();
        fs::write(backup_path(&dataset), "{\"id\":1}\n{\"id\":2}\n").unwrap();

        assert!(check_stale_dataset_backup(&dataset, false).is_err());
        assert!(backup_path(&dataset).exists());

        check_stale_dataset_backup(&dataset, true).unwrap();
        assert!(!backup_path(&dataset).exists());
        assert_eq!(
            fs::read_to_string(&dataset).unwrap(),
            "{\"id\":1}\n{\"id\":2}\n"
        );
    }

    #[test]
    fn orphaned_results_backup_blocks_unless_restore_requested() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results.jsonl");
        fs::write(backup_path(&results), "{\"id\":7}\n").unwrap();

        assert!(check_orphaned_results_backup(&results, false).is_err());
        assert!(!results.exists());

        check_orphaned_results_backup(&results, true).unwrap();
        assert_eq!(fs::read_to_string(&results).unwrap(), "{\"id\":7}\n");
        assert!(!backup_path(&results).exists());
    }

    #[test]
    fn results_backup_beside_results_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results.jsonl");
        fs::write(&results, "{\"id\":1}\n").unwrap();
        fs::write(backup_path(&results), "{\"id\":7}\n").unwrap();

        check_orphaned_results_backup(&results, false).unwrap();
        assert!(backup_path(&results).exists());
    }
}
