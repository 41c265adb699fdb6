use std::fmt;
use thiserror::Error;

/// Pipeline stage that raised a data error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Aggregate,
    Score,
    Segment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load      => "load",
            Stage::Aggregate => "aggregate",
            Stage::Score     => "score",
            Stage::Segment   => "segment",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum RfmaError {
    #[error("Data error in {stage} stage: {detail}")]
    Data { stage: Stage, detail: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RfmaError {
    pub fn data(stage: Stage, detail: impl Into<String>) -> Self {
        RfmaError::Data { stage, detail: detail.into() }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        RfmaError::Config(detail.into())
    }

    pub fn is_data_error(&self) -> bool {
        matches!(self, RfmaError::Data { .. })
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, RfmaError::Config(_))
    }

    /// Stage that raised the error, for data errors only.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RfmaError::Data { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type RfmaResult<T> = Result<T, RfmaError>;
