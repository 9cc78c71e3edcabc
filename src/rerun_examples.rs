/*
cargo run --bin rerun_examples -- --ids 197 198 199

cargo run --bin rerun_examples -- \
    --ids-file c_assess_inf/output/gpt-5/validation_issues.json \
    --dataset-file i_am_a_strange_dataset.jsonl \
    --results-file gpt-5_validation_outputs.jsonl \
    --model gpt-5 \
    -- python -u evaluate.py
*/

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use d_rerun::{
    ids::resolve_ids,
    logging::init_file_logger,
    run_and_merge, ModelMode, ProcessEvaluator, RerunOutcome, RerunPaths, RerunRequest,
};

// used when neither --ids nor --ids-file is given
const DEFAULT_IDS: [i64; 3] = [197, 198, 199];

/// Re-evaluate a few examples and merge the new results into the results file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Example ids to re-run:  --ids 197 198 199
    #[arg(long, num_args = 1..)]
    ids: Vec<i64>,

    /// JSON array of ids, or an *_issues.json list of "id N: ..." lines
    #[arg(long = "ids-file", value_name = "PATH")]
    ids_file: Option<PathBuf>,

    /// Dataset the evaluator reads (narrowed temporarily, then restored)
    #[arg(long = "dataset-file", value_name = "PATH", default_value = "i_am_a_strange_dataset.jsonl")]
    dataset_file: PathBuf,

    /// Results file the evaluator writes and we merge into
    #[arg(long = "results-file", value_name = "PATH", default_value = "gpt-5_validation_outputs.jsonl")]
    results_file: PathBuf,

    #[arg(long, default_value = "gpt-5")]
    model: String,

    /// Run the model locally instead of through its API
    #[arg(long = "local-model")]
    local_model: bool,

    /// Evaluator program and its leading arguments, after `--`:
    ///     -- python -u evaluate.py
    #[arg(
        last = true,
        num_args = 1..,
        value_name = "EVALUATOR",
        default_values = ["python", "evaluate.py"]
    )]
    evaluator: Vec<String>,

    /// Move a leftover <dataset>.backup, or a <results>.backup whose results
    /// file is gone, back into place before starting
    #[arg(long = "restore-stale-backup")]
    restore_stale_backup: bool,

    #[arg(long = "log-dir", default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_file_logger(&cli.log_dir, "rerun_examples")?;
    info!("Started - {cli:?}");

    let request = RerunRequest {
        ids: resolve_ids(&cli.ids, cli.ids_file.as_deref(), &DEFAULT_IDS)?,
        model: cli.model.clone(),
        mode: if cli.local_model { ModelMode::Local } else { ModelMode::Api },
        restore_stale_backup: cli.restore_stale_backup,
    };
    let paths = RerunPaths {
        dataset: cli.dataset_file.clone(),
        results: cli.results_file.clone(),
    };
    let evaluator = ProcessEvaluator::new(&cli.evaluator)?;

    match run_and_merge(&paths, &request, &evaluator)? {
        RerunOutcome::Merged(summary) => {
            summary.print();
            println!("\n✓ Evaluation and merge completed successfully!");
            println!("Your original results are preserved and new ones are added.");
            info!("Finished ✅ - log at {}", log_path.display());
            Ok(())
        }
        RerunOutcome::NoNewResults { results_backup } => {
            println!("\n✗ Evaluation failed");
            match results_backup {
                Some(b) => println!("Your original results are backed up at {}", b.display()),
                None => println!("There were no earlier results to back up."),
            }
            info!("Finished without new results - log at {}", log_path.display());
            std::process::exit(1);
        }
    }
}
