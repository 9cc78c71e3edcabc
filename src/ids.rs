//! Which example ids a run should cover.

use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;

// An ids file is either a plain array of ids or an issues list like
// ["id 17: missing", "id 42: missing eval key x"].
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdEntry {
    Number(i64),
    Issue(String),
}

/// Load ids from an ids/issues JSON file, in file order.
pub fn read_ids_file(path: &Path) -> Result<Vec<i64>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let entries: Vec<IdEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {} as a JSON array of ids", path.display()))?;

    let id_re = Regex::new(r"id (-?\d+):")?;
    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            IdEntry::Number(n) => ids.push(n),
            IdEntry::Issue(line) => ids.extend(
                id_re
                    .captures_iter(&line)
                    .filter_map(|c| c.get(1))
                    .filter_map(|m| m.as_str().parse::<i64>().ok()),
            ),
        }
    }
    Ok(ids)
}

/// Merge id sources, dropping repeats but keeping first-seen order.
pub fn combine_ids<I>(sources: I) -> Result<Vec<i64>>
where
    I: IntoIterator<Item = i64>,
{
    let mut seen = HashSet::new();
    let ids: Vec<i64> = sources.into_iter().filter(|id| seen.insert(*id)).collect();
    if ids.is_empty() {
        bail!("no example ids given - nothing to re-run");
    }
    Ok(ids)
}

/// Ids for a run: `--ids` plus whatever `--ids-file` holds. `defaults` only
/// apply when neither source was given; an ids file that turns out empty is
/// an error, not a cue to fall back.
pub fn resolve_ids(
    cli_ids: &[i64],
    ids_file: Option<&Path>,
    defaults: &[i64],
) -> Result<Vec<i64>> {
    if cli_ids.is_empty() && ids_file.is_none() {
        return combine_ids(defaults.iter().copied());
    }
    let mut ids = cli_ids.to_vec();
    if let Some(path) = ids_file {
        ids.extend(read_ids_file(path)?);
    }
    combine_ids(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_id_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.json");
        fs::write(&path, "[5, 3, 9]").unwrap();
        assert_eq!(read_ids_file(&path).unwrap(), vec![5, 3, 9]);
    }

    #[test]
    fn reads_issue_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice_issues.json");
        fs::write(
            &path,
            r#"["id 17: missing", "id 42: missing eval key instruct_tone", "no id here"]"#,
        )
        .unwrap();
        assert_eq!(read_ids_file(&path).unwrap(), vec![17, 42]);
    }

    #[test]
    fn combine_dedupes_in_first_seen_order() {
        let ids = combine_ids(vec![198, 197, 198, 199, 197]).unwrap();
        assert_eq!(ids, vec![198, 197, 199]);
    }

    #[test]
    fn combine_rejects_empty() {
        assert!(combine_ids(Vec::new()).is_err());
    }

    const DEFAULTS: [i64; 3] = [197, 198, 199];

    #[test]
    fn defaults_only_without_any_source() {
        assert_eq!(resolve_ids(&[], None, &DEFAULTS).unwrap(), vec![197, 198, 199]);
        assert_eq!(resolve_ids(&[5, 5, 2], None, &DEFAULTS).unwrap(), vec![5, 2]);
    }

    #[test]
    fn ids_and_ids_file_combine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice_issues.json");
        fs::write(&path, r#"["id 3: missing", "id 5: missing"]"#).unwrap();

        assert_eq!(
            resolve_ids(&[5, 1], Some(path.as_path()), &DEFAULTS).unwrap(),
            vec![5, 1, 3]
        );
    }

    #[test]
    fn empty_ids_file_does_not_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean_issues.json");
        fs::write(&path, "[]").unwrap();

        let err = resolve_ids(&[], Some(path.as_path()), &DEFAULTS).unwrap_err();
        assert!(err.to_string().contains("no example ids"));
    }
}
