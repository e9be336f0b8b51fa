use thiserror::Error;

#[derive(Debug, Error)]
pub enum KinsweepError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load model '{path}': {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Model has no value addressed by '{0}'")]
    UnknownTarget(String),

    #[error("Run {sequence} failed: {reason}")]
    RunFailure { sequence: usize, reason: String },

    #[error("Failed to parse report '{path}': {reason}")]
    ReportParse { path: String, reason: String },

    #[error("Report column '{column}' not found in header [{header}]")]
    ReportFormat { column: String, header: String },

    #[error("A simulation model must be provided before the sweep can be built")]
    ModelNotProvided,

    #[error("Sweep grid is missing")]
    GridNotDefined,

    #[error("Time course definition is missing")]
    TimeCourseNotDefined,

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to process table file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),
}
