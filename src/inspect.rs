//! Check whether the first record of a results file carries a given field.

use std::{io::Write, path::Path};

use anyhow::{bail, Result};
use serde_json::Value;

use crate::jsonl::read_first_record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReport {
    pub field: String,
    /// Every field name of the record, in record order.
    pub fields: Vec<String>,
    /// First characters of the field's value, `None` when the field is absent.
    pub preview: Option<String>,
}

impl FieldReport {
    pub fn from_record(record: &Value, field: &str, preview_chars: usize) -> Result<Self> {
        let Some(obj) = record.as_object() else {
            bail!("first record is not a JSON object");
        };
        let preview = obj.get(field).map(|v| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text.chars().take(preview_chars).collect()
        });
        Ok(Self {
            field: field.to_string(),
            fields: obj.keys().cloned().collect(),
            preview,
        })
    }

    pub fn is_present(&self) -> bool {
        self.preview.is_some()
    }

    pub fn render<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "Fields in results:")?;
        for name in &self.fields {
            writeln!(out, "  - {name}")?;
        }
        match &self.preview {
            Some(sample) => {
                writeln!(out, "\n✓ {} EXISTS!", self.field)?;
                writeln!(out, "Sample: {sample}")?;
            }
            None => writeln!(out, "\n✗ {} MISSING - needs to be re-run", self.field)?,
        }
        Ok(())
    }
}

/// Read line one of `path` and report on `field`.
pub fn inspect_first_record(path: &Path, field: &str, preview_chars: usize) -> Result<FieldReport> {
    let record = read_first_record(path)?;
    FieldReport::from_record(&record, field, preview_chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    const COT: &str = "generated_text_true_statement_cot";

    fn rendered(report: &FieldReport) -> String {
        let mut buf = Vec::new();
        report.render(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn missing_field_lists_all_names() {
        let record = json!({"id": 1, "generated_text_true_statement": "yes", "score": 0.5});
        let report = FieldReport::from_record(&record, COT, 100).unwrap();

        assert!(!report.is_present());
        assert_eq!(report.fields, vec!["id", "generated_text_true_statement", "score"]);
        let text = rendered(&report);
        assert!(text.contains("  - score\n"));
        assert!(text.contains("MISSING"));
    }

    #[test]
    fn present_field_previews_first_chars() {
        let long = "é".repeat(150);
        let record = json!({"id": 1, COT: long});
        let report = FieldReport::from_record(&record, COT, 100).unwrap();

        let preview = report.preview.clone().unwrap();
        assert_eq!(preview.chars().count(), 100);
        assert!(rendered(&report).contains(&format!("Sample: {preview}\n")));
    }

    #[test]
    fn non_string_values_preview_as_json() {
        let record = json!({"id": 1, COT: ["a", 2]});
        let report = FieldReport::from_record(&record, COT, 100).unwrap();
        assert_eq!(report.preview.as_deref(), Some("[\"a\",2]"));
    }

    #[test]
    fn non_object_record_is_rejected() {
        assert!(FieldReport::from_record(&json!([1, 2]), COT, 100).is_err());
    }

    #[test]
    fn inspecting_twice_gives_identical_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        fs::write(
            &path,
            format!("{{\"id\":1,\"{COT}\":\"Let us think step by step\"}}\n{{\"id\":2}}\n"),
        )
        .unwrap();

        let first = rendered(&inspect_first_record(&path, COT, 100).unwrap());
        let second = rendered(&inspect_first_record(&path, COT, 100).unwrap());
        assert_eq!(first, second);
        assert!(first.contains("EXISTS"));
    }
}
