//! Re-run selected benchmark examples and merge their fresh results, plus a
//! quick field check over results files.

pub mod backup;
pub mod evaluator;
pub mod ids;
pub mod inspect;
pub mod jsonl;
pub mod logging;
pub mod rerun;

pub use evaluator::{Evaluator, ModelMode, ProcessEvaluator};
pub use rerun::{run_and_merge, MergeSummary, RerunOutcome, RerunPaths, RerunRequest};
