//! Describes a parameter sweep: which model values are varied, over which grid,
//! how each time course is run and how the collected rows are labelled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A model value a sweep can write to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    InitialConcentration { species: String },
    ReactionParameter { reaction: String, parameter: String },
}

impl Target {
    pub fn species(id: impl Into<String>) -> Self {
        Target::InitialConcentration { species: id.into() }
    }

    pub fn parameter(reaction: impl Into<String>, parameter: impl Into<String>) -> Self {
        Target::ReactionParameter {
            reaction: reaction.into(),
            parameter: parameter.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::InitialConcentration { species } => write!(f, "{}", species),
            Target::ReactionParameter {
                reaction,
                parameter,
            } => write!(f, "{}.{}", reaction, parameter),
        }
    }
}

/// Parses `species` or `reaction.parameter`.
impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("target identifier is empty".to_string());
        }
        match s.split_once('.') {
            Some((reaction, parameter)) if !reaction.is_empty() && !parameter.is_empty() => {
                Ok(Target::parameter(reaction, parameter))
            }
            Some(_) => Err(format!("malformed reaction parameter '{}'", s)),
            None => Ok(Target::species(s)),
        }
    }
}

/// A value written to the model once, before the first grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: Target,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeCourse {
    /// Simulated time in seconds.
    pub duration: f64,
    /// Number of output intervals. Defaults to one per second of `duration`.
    #[serde(default)]
    pub steps: Option<usize>,
    #[serde(default = "default_absolute_tolerance")]
    pub absolute_tolerance: f64,
    #[serde(default = "default_relative_tolerance")]
    pub relative_tolerance: f64,
}

fn default_absolute_tolerance() -> f64 {
    1.0e-12
}

fn default_relative_tolerance() -> f64 {
    1.0e-6
}

impl TimeCourse {
    /// One step per second, with the default solver tolerances.
    pub fn per_second(duration: usize) -> Self {
        Self {
            duration: duration as f64,
            steps: Some(duration),
            absolute_tolerance: default_absolute_tolerance(),
            relative_tolerance: default_relative_tolerance(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.unwrap_or_else(|| self.duration.round().max(0.0) as usize)
    }

    /// Rows a complete run records: every step plus the initial state.
    pub fn expected_rows(&self) -> usize {
        self.step_count() + 1
    }
}

/// How the three levels of one ternary axis are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AxisLevels {
    /// Levels `min`, `min + step / ratio` and `min + step`, where `step` grows with the coarse step.
    Swept { min: f64, max: f64 },
    /// The same value at every level.
    Fixed { value: f64 },
    /// The partner axis's level multiplied by `factor`.
    Scaled { factor: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TernaryAxis {
    pub target: Target,
    /// Prefix used in grid tags, e.g. `A` in `A1B2`.
    pub label: String,
    pub levels: AxisLevels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridSpec {
    Linear {
        target: Target,
        min: f64,
        max: f64,
        iterations: usize,
    },
    Ternary {
        iterations: usize,
        #[serde(default = "default_ternary_ratio")]
        ratio: f64,
        axis_a: TernaryAxis,
        axis_b: TernaryAxis,
    },
}

fn default_ternary_ratio() -> f64 {
    2.0
}

/// What the first field of every table row holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadColumn {
    /// The 1-based sequence index of the grid point.
    #[default]
    Index,
    /// The value written to the first swept target.
    Value,
}

/// What happens to the sweep when one grid point cannot produce a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Skip,
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(FailurePolicy::Skip),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

/// A complete sweep as read from a request file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    pub name: String,
    /// Path of the reaction-network model, relative to the request file.
    pub model: String,
    pub time_course: TimeCourse,
    pub grid: GridSpec,
    #[serde(default)]
    pub presets: Vec<Assignment>,
    /// Report columns to keep, by header name. All columns when absent.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub lead_column: LeadColumn,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    #[serde(default)]
    pub output_dir: Option<String>,
}
