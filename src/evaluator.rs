//! The external evaluation pass, behind a trait so tests can stub it.

use std::{fmt, path::Path, process::Command};

use anyhow::{bail, Context, Result};
use log::{info, warn};

/// Whether the evaluator should call a hosted API or load the model locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMode {
    Api,
    Local,
}

impl fmt::Display for ModelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelMode::Api => f.write_str("api"),
            ModelMode::Local => f.write_str("local"),
        }
    }
}

/// One evaluation pass: read `dataset`, write the results file.
pub trait Evaluator {
    fn evaluate(&self, dataset: &Path, model: &str, mode: ModelMode) -> Result<()>;
}

/// Runs the evaluator as a child process and waits for it, however long it takes.
///
/// The child inherits stdout/stderr so its own progress output stays visible.
/// It is expected to find the dataset and results files on its own; the
/// dataset path is only logged.
#[derive(Debug, Clone)]
pub struct ProcessEvaluator {
    program: String,
    leading_args: Vec<String>,
}

impl ProcessEvaluator {
    /// `command` is the program followed by its fixed leading arguments,
    /// e.g. `["python", "evaluate.py"]`.
    pub fn new(command: &[String]) -> Result<Self> {
        let Some((program, leading_args)) = command.split_first() else {
            bail!("evaluator command is empty");
        };
        Ok(Self {
            program: program.clone(),
            leading_args: leading_args.to_vec(),
        })
    }

    /// Full argument list after the program name.
    pub fn args(&self, model: &str, mode: ModelMode) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push("--model".to_string());
        args.push(model.to_string());
        if mode == ModelMode::Api {
            args.push("--api_model".to_string());
        }
        args
    }
}

impl Evaluator for ProcessEvaluator {
    fn evaluate(&self, dataset: &Path, model: &str, mode: ModelMode) -> Result<()> {
        let args = self.args(model, mode);
        info!(
            "launching evaluator: {} {} (dataset {})",
            self.program,
            args.join(" "),
            dataset.display()
        );

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .with_context(|| format!("launching evaluator `{}`", self.program))?;

        // exit status does not decide success; the results file does
        if status.success() {
            info!("evaluator exited with {status}");
        } else {
            warn!("evaluator exited with {status}");
            println!("⚠ Evaluator exited with {status}");
        }
        Ok(())
    }
}
