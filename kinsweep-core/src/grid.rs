//! Enumerates the parameter assignments of a sweep.
//!
//! A [`Grid`] is validated once and then yields its [`GridPoint`]s lazily and in a
//! stable order. Calling [`Grid::points`] again restarts the enumeration from the
//! first point.

use crate::error::KinsweepError;
use kinsweep_schemas::sweep::{AxisLevels, GridSpec, Target, TernaryAxis};

/// Combinations produced by one coarse step of a ternary grid.
pub const TERNARY_COMBINATIONS: usize = 9;

/// One configuration of the swept model values.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPoint {
    sequence: usize,
    assignments: Vec<(Target, f64)>,
    tag: Option<String>,
}

impl GridPoint {
    /// The 1-based index written at the start of this point's table row.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn assignments(&self) -> &[(Target, f64)] {
        &self.assignments
    }

    /// Discretized input levels, e.g. `A1B2`. Only ternary grids tag their points.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The value assigned to the first swept target.
    pub fn lead_value(&self) -> f64 {
        self.assignments.first().map_or(0.0, |(_, v)| *v)
    }

    /// A short human-readable description used in log messages.
    pub fn describe(&self) -> String {
        let values = self
            .assignments
            .iter()
            .map(|(target, value)| format!("{}={}", target, value))
            .collect::<Vec<_>>()
            .join(", ");
        match &self.tag {
            Some(tag) => format!("#{} {} ({})", self.sequence, tag, values),
            None => format!("#{} ({})", self.sequence, values),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Grid {
    Linear {
        target: Target,
        min: f64,
        max: f64,
        iterations: usize,
    },
    Ternary {
        iterations: usize,
        ratio: f64,
        axis_a: TernaryAxis,
        axis_b: TernaryAxis,
    },
}

impl Grid {
    /// `iterations` evenly spaced values from `min` to `max` inclusive.
    pub fn linear(
        target: Target,
        min: f64,
        max: f64,
        iterations: usize,
    ) -> Result<Self, KinsweepError> {
        ensure_finite("min", min)?;
        ensure_finite("max", max)?;
        if iterations < 2 {
            return Err(KinsweepError::Configuration(format!(
                "a linear sweep needs at least 2 iterations, got {}",
                iterations
            )));
        }
        Ok(Grid::Linear {
            target,
            min,
            max,
            iterations,
        })
    }

    /// Three levels per axis for each of `iterations` coarse steps, crossed into nine points.
    pub fn ternary(
        iterations: usize,
        ratio: f64,
        axis_a: TernaryAxis,
        axis_b: TernaryAxis,
    ) -> Result<Self, KinsweepError> {
        if iterations < 1 {
            return Err(KinsweepError::Configuration(
                "a ternary sweep needs at least 1 iteration".to_string(),
            ));
        }
        ensure_finite("ratio", ratio)?;
        if ratio == 0.0 {
            return Err(KinsweepError::Configuration(
                "ternary ratio must be non-zero".to_string(),
            ));
        }
        if matches!(axis_a.levels, AxisLevels::Scaled { .. }) {
            return Err(KinsweepError::Configuration(
                "axis A cannot be scaled; only axis B may follow its partner".to_string(),
            ));
        }
        if axis_a.target == axis_b.target {
            return Err(KinsweepError::Configuration(format!(
                "both ternary axes address '{}'",
                axis_a.target
            )));
        }
        for axis in [&axis_a, &axis_b] {
            match axis.levels {
                AxisLevels::Swept { min, max } => {
                    ensure_finite("min", min)?;
                    ensure_finite("max", max)?;
                }
                AxisLevels::Fixed { value } => ensure_finite("value", value)?,
                AxisLevels::Scaled { factor } => ensure_finite("factor", factor)?,
            }
        }
        Ok(Grid::Ternary {
            iterations,
            ratio,
            axis_a,
            axis_b,
        })
    }

    pub fn from_spec(spec: &GridSpec) -> Result<Self, KinsweepError> {
        match spec {
            GridSpec::Linear {
                target,
                min,
                max,
                iterations,
            } => Grid::linear(target.clone(), *min, *max, *iterations),
            GridSpec::Ternary {
                iterations,
                ratio,
                axis_a,
                axis_b,
            } => Grid::ternary(*iterations, *ratio, axis_a.clone(), axis_b.clone()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Grid::Linear { iterations, .. } => *iterations,
            Grid::Ternary { iterations, .. } => iterations * TERNARY_COMBINATIONS,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every target the grid writes to, in assignment order.
    pub fn targets(&self) -> Vec<&Target> {
        match self {
            Grid::Linear { target, .. } => vec![target],
            Grid::Ternary { axis_a, axis_b, .. } => vec![&axis_a.target, &axis_b.target],
        }
    }

    /// The point at `position` in enumeration order.
    pub fn point(&self, position: usize) -> Option<GridPoint> {
        if position >= self.len() {
            return None;
        }
        let point = match self {
            Grid::Linear {
                target,
                min,
                max,
                iterations,
            } => {
                let value = if position == iterations - 1 {
                    *max
                } else {
                    min + (position as f64 / (iterations - 1) as f64) * (max - min)
                };
                GridPoint {
                    sequence: position + 1,
                    assignments: vec![(target.clone(), value)],
                    tag: None,
                }
            }
            Grid::Ternary {
                iterations,
                ratio,
                axis_a,
                axis_b,
            } => {
                let coarse = position / TERNARY_COMBINATIONS;
                let combination = position % TERNARY_COMBINATIONS;
                let (level_a, level_b) = (combination / 3, combination % 3);

                let a = axis_levels(&axis_a.levels, coarse, *iterations, *ratio, None);
                let b = axis_levels(&axis_b.levels, coarse, *iterations, *ratio, Some(a));

                GridPoint {
                    sequence: coarse + 1,
                    assignments: vec![
                        (axis_a.target.clone(), a[level_a]),
                        (axis_b.target.clone(), b[level_b]),
                    ],
                    tag: Some(format!(
                        "{}{}{}{}",
                        axis_a.label, level_a, axis_b.label, level_b
                    )),
                }
            }
        };
        Some(point)
    }

    /// A fresh enumeration starting at the first point.
    pub fn points(&self) -> GridPoints {
        GridPoints {
            grid: self.clone(),
            next: 0,
        }
    }
}

fn ensure_finite(name: &str, value: f64) -> Result<(), KinsweepError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(KinsweepError::Configuration(format!(
            "sweep bound '{}' must be a finite number, got {}",
            name, value
        )))
    }
}

/// Low, middle and high level of one axis at coarse step `coarse` (0-based).
fn axis_levels(
    levels: &AxisLevels,
    coarse: usize,
    iterations: usize,
    ratio: f64,
    partner: Option<[f64; 3]>,
) -> [f64; 3] {
    match levels {
        AxisLevels::Swept { min, max } => {
            let step = ((coarse + 1) as f64 / iterations as f64) * (max - min);
            [*min, min + step / ratio, min + step]
        }
        AxisLevels::Fixed { value } => [*value; 3],
        AxisLevels::Scaled { factor } => {
            let base = partner.unwrap_or([0.0; 3]);
            [base[0] * factor, base[1] * factor, base[2] * factor]
        }
    }
}

/// Lazy iterator over the points of a [`Grid`].
#[derive(Debug, Clone)]
pub struct GridPoints {
    grid: Grid,
    next: usize,
}

impl Iterator for GridPoints {
    type Item = GridPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.grid.point(self.next)?;
        self.next += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridPoints {}
