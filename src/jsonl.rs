//! Line-delimited JSON record files.
//!
//! Every line holds one JSON object carrying an `id`. Records are kept as
//! plain `serde_json::Value`s so evaluator fields we know nothing about are
//! written back exactly as they were read.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Extract the integer id of a record (`"id": 7` or `"id": "7"`).
pub fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(|v| {
        if let Some(s) = v.as_str() {
            s.trim().parse::<i64>().ok()
        } else {
            v.as_i64()
        }
    })
}

/// Read all records of a JSONL file, in file order.
pub fn read_records(path: &Path) -> Result<Vec<Value>> {
    let file = File::open(path).with_context(|| format!("reading {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Value = serde_json::from_str(&line)
            .with_context(|| format!("parsing {} line {}", path.display(), idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Read records and pair each with its id. A record without a usable id is an error.
pub fn read_keyed_records(path: &Path) -> Result<Vec<(i64, Value)>> {
    read_records(path)?
        .into_iter()
        .enumerate()
        .map(|(idx, record)| match record_id(&record) {
            Some(id) => Ok((id, record)),
            None => bail!(
                "{} record #{} has no integer `id` field",
                path.display(),
                idx + 1
            ),
        })
        .collect()
}

/// Read only the first record of a file.
pub fn read_first_record(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("reading {}", path.display()))?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .with_context(|| format!("reading {}", path.display()))?;

    if first.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    serde_json::from_str(&first).with_context(|| format!("parsing {} line 1", path.display()))
}

/// Write records one per line, creating or truncating the file.
pub fn write_records<'a, I>(path: &Path, records: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a Value>,
{
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let mut written = 0usize;
    for record in records {
        serde_json::to_writer(&mut out, record)
            .with_context(|| format!("writing {}", path.display()))?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush().with_context(|| format!("writing {}", path.display()))?;
    Ok(written)
}
