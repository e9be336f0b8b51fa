//! A scripted stand-in for a simulation engine.

use super::model::{EngineRun, SimulationModel};
use crate::error::KinsweepError;
use kinsweep_schemas::sweep::{Target, TimeCourse};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub enum Scripted {
    /// Writes a full report: `time, X, Y` with X the last value set and Y = 2X.
    Complete,
    /// Reports failure with a message in the queue.
    Fail(&'static str),
    /// Returns an engine error.
    Raise(&'static str),
    /// Writes one row fewer than requested and says so.
    Truncate,
    /// Writes a final row that does not parse.
    Garbage,
}

#[derive(Debug, Default)]
pub struct ScriptedModel {
    script: VecDeque<Scripted>,
    pub assignments: Vec<(Target, f64)>,
    pub compiles: usize,
    last_value: f64,
    messages: Vec<String>,
    dirty: bool,
}

impl ScriptedModel {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }
}

impl SimulationModel for ScriptedModel {
    fn set_value(&mut self, target: &Target, value: f64) -> Result<(), KinsweepError> {
        if let Target::InitialConcentration { species } = target {
            if species == "missing" {
                return Err(KinsweepError::UnknownTarget(species.clone()));
            }
        }
        self.assignments.push((target.clone(), value));
        self.last_value = value;
        self.dirty = true;
        Ok(())
    }

    fn compile_if_necessary(&mut self) -> Result<(), KinsweepError> {
        if self.dirty {
            self.compiles += 1;
            self.dirty = false;
        }
        Ok(())
    }

    fn run_time_course(
        &mut self,
        course: &TimeCourse,
        report_path: &Path,
    ) -> Result<EngineRun, KinsweepError> {
        let step = self.script.pop_front().unwrap_or(Scripted::Complete);
        let rows = match step {
            Scripted::Fail(message) => {
                self.messages.push(message.to_string());
                return Ok(EngineRun::Failed);
            }
            Scripted::Raise(message) => {
                return Err(KinsweepError::RunFailure {
                    sequence: 0,
                    reason: message.to_string(),
                })
            }
            Scripted::Truncate => course.step_count(),
            Scripted::Complete | Scripted::Garbage => course.expected_rows(),
        };

        let x = self.last_value;
        let mut report = String::from("time, X, Y\n");
        for i in 0..rows {
            if i + 1 == rows && matches!(step, Scripted::Garbage) {
                report.push_str("nan, -, -\n");
            } else {
                report.push_str(&format!("{}, {}, {}\n", i, x, 2.0 * x));
            }
        }
        fs::write(report_path, report)
            .map_err(|e| KinsweepError::FileIO(report_path.display().to_string(), e))?;
        Ok(EngineRun::Completed {
            recorded_steps: rows,
        })
    }

    fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}
