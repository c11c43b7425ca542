use std::fmt;

use salesdash_config::ConfigError;
use salesdash_io::ReadError;

use crate::schema::InputKind;

/// Pipeline stage at which an error or warning was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Read,
    Normalize,
    Coerce,
    Match,
    Aggregate,
    Plan,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Read => write!(f, "read"),
            Self::Normalize => write!(f, "normalize"),
            Self::Coerce => write!(f, "coerce"),
            Self::Match => write!(f, "match"),
            Self::Aggregate => write!(f, "aggregate"),
            Self::Plan => write!(f, "plan"),
        }
    }
}

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Every reader backend failed on one input.
    ReadFailure { file: String, error: ReadError },
    /// The analysis needs an input kind that was not supplied.
    MissingInput(InputKind),
    /// A column the analysis cannot run without is absent.
    MissingRequiredColumn { kind: InputKind, column: String },
    /// Settings could not be loaded or failed validation.
    ConfigInvalid(ConfigError),
}

/// A fatal pipeline error: which stage failed, why, and on what inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineError {
    pub stage: Stage,
    pub kind: ErrorKind,
    /// One-line summary of the inputs, e.g. `contract: jan.xlsx (5120 bytes)`.
    pub inputs: String,
}

impl PipelineError {
    pub fn new(stage: Stage, kind: ErrorKind, inputs: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            inputs: inputs.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailure { file, error } => write!(f, "{file}: {error}"),
            Self::MissingInput(kind) => write!(f, "no {kind} file was supplied"),
            Self::MissingRequiredColumn { kind, column } => {
                write!(f, "{kind} file is missing required column '{column}'")
            }
            Self::ConfigInvalid(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.kind)?;
        if !self.inputs.is_empty() {
            write!(f, " [inputs: {}]", self.inputs)?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Non-fatal problems, reported alongside the results.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A column the analysis can do without is absent; its values read as zero.
    MissingOptionalColumn { kind: InputKind, column: String },
    /// Filtering left no rows; tables are empty but well-formed.
    EmptyAfterFiltering { what: String },
    /// Call-time rows whose agent matched nobody on the roster.
    AgentMatchMiss { count: usize },
    /// Cells that could not be coerced and were replaced by null or zero.
    MalformedValue { kind: InputKind, column: String, count: usize },
    /// A configuration file was unusable and defaults were used instead.
    ConfigFallback { message: String },
}

impl Warning {
    pub fn stage(&self) -> Stage {
        match self {
            Self::MissingOptionalColumn { .. } => Stage::Normalize,
            Self::EmptyAfterFiltering { .. } => Stage::Aggregate,
            Self::AgentMatchMiss { .. } => Stage::Match,
            Self::MalformedValue { .. } => Stage::Coerce,
            Self::ConfigFallback { .. } => Stage::Config,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOptionalColumn { kind, column } => {
                write!(f, "{kind} file has no '{column}' column; treated as zero")
            }
            Self::EmptyAfterFiltering { what } => write!(f, "no rows left after filtering {what}"),
            Self::AgentMatchMiss { count } => {
                write!(f, "{count} call-time row(s) did not match any rostered agent")
            }
            Self::MalformedValue { kind, column, count } => {
                write!(f, "{count} malformed value(s) in {kind} column '{column}'")
            }
            Self::ConfigFallback { message } => write!(f, "using defaults: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_stage_and_inputs() {
        let err = PipelineError::new(
            Stage::Normalize,
            ErrorKind::MissingRequiredColumn {
                kind: InputKind::Contract,
                column: "product_category".into(),
            },
            "contract: jan.xlsx (10 bytes)",
        );
        let msg = err.to_string();
        assert!(msg.starts_with("normalize stage failed"));
        assert!(msg.contains("'product_category'"));
        assert!(msg.contains("jan.xlsx"));
    }
}
