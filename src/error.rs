//! Error taxonomy for the wrapper.

use std::{fmt, io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Which part of the encode → run → decode sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Encode,
    Run,
    Decode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Encode => write!(f, "encode"),
            Stage::Run => write!(f, "run"),
            Stage::Decode => write!(f, "decode"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WrapError {
    /// A value or name that cannot be represented in the data file.
    #[error("[encode] cannot serialize '{name}': {reason}")]
    Serialization { name: String, reason: String },

    #[error("[{stage}] {context}: {source}")]
    Io {
        stage: Stage,
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("[encode] invalid template: {0}")]
    Template(String),

    #[error("[run] '{program}' did not finish within {}s", timeout.as_secs_f64())]
    ProcessTimeout { program: String, timeout: Duration },

    #[error("[run] '{program}' exited with {}:\n{stderr}", exit_description(*code))]
    ProcessFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("[run] model check failed for {}:\n{stderr}", path.display())]
    InvalidModel { path: PathBuf, stderr: String },

    #[error("[decode] line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("[run] invalid {key}: {reason}")]
    Config { key: String, reason: String },

    /// `base + replicates - 1` does not fit in a seed.
    #[error("[run] seed {base} cannot be advanced over {replicates} replicates")]
    SeedOverflow { base: u64, replicates: usize },
}

impl WrapError {
    pub fn stage(&self) -> Stage {
        match self {
            WrapError::Serialization { .. } | WrapError::Template(_) => Stage::Encode,
            WrapError::Io { stage, .. } => *stage,
            WrapError::ProcessTimeout { .. }
            | WrapError::ProcessFailed { .. }
            | WrapError::InvalidModel { .. }
            | WrapError::Config { .. }
            | WrapError::SeedOverflow { .. } => Stage::Run,
            WrapError::Parse { .. } => Stage::Decode,
        }
    }

    pub(crate) fn io(stage: Stage, context: impl Into<String>, source: io::Error) -> Self {
        WrapError::Io {
            stage,
            context: context.into(),
            source,
        }
    }

    pub(crate) fn serialization(name: impl Into<String>, reason: impl Into<String>) -> Self {
        WrapError::Serialization {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        WrapError::Parse {
            line,
            reason: reason.into(),
        }
    }
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "a signal".into(),
    }
}

pub type Result<T> = std::result::Result<T, WrapError>;
