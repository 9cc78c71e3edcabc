/*
cargo run --bin check_fields

cargo run --bin check_fields -- \
    --results-file evaluation_results/Llama-3.1-8B-Instruct_validation_outputs.jsonl \
    --field generated_text_true_statement_cot
*/

use std::{io, path::PathBuf};

use anyhow::Result;
use clap::Parser;

use d_rerun::inspect::inspect_first_record;

/// List the fields of the first result and check that one of them is there.
#[derive(Parser, Debug)]
#[command(version, about = "Show the fields of the first record in a results file")]
struct Args {
    /// Results JSONL file; only the first line is read
    #[arg(
        long = "results-file",
        default_value = "evaluation_results/Llama-3.1-8B-Instruct_validation_outputs.jsonl"
    )]
    results_file: PathBuf,

    /// Field that must be present
    #[arg(long, default_value = "generated_text_true_statement_cot")]
    field: String,

    /// How much of the field's value to print
    #[arg(long = "preview-chars", default_value_t = 100)]
    preview_chars: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let report = inspect_first_record(&args.results_file, &args.field, args.preview_chars)?;
    report.render(&mut io::stdout().lock())?;
    Ok(())
}
