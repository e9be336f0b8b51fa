//! A reaction-network model integrated with a Dormand-Prince solver.
//!
//! This is the built-in engine behind [`SimulationModel`]. It reads a network file,
//! accepts value changes between runs and writes one report line per recorded step.

use super::model::{EngineRun, SimulationModel};
use crate::error::KinsweepError;
use kinsweep_schemas::{
    file_formats::NetworkFile,
    network::{Kinetics, ReactionNetwork},
    sweep::{Target, TimeCourse},
};
use ode_solvers::dopri5::*;
use ode_solvers::*;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

type Concentrations = DVector<f64>;

#[derive(Debug, Clone)]
enum RateLaw {
    MassAction { k: f64 },
    MichaelisMenten { substrate: usize, vmax: f64, km: f64 },
    HillActivation { activator: usize, vmax: f64, k: f64, n: f64 },
}

#[derive(Debug, Clone)]
struct CompiledReaction {
    reactants: Vec<(usize, f64)>,
    products: Vec<(usize, f64)>,
    rate: RateLaw,
}

impl CompiledReaction {
    fn velocity(&self, y: &Concentrations) -> f64 {
        match self.rate {
            RateLaw::MassAction { k } => self.reactants.iter().fold(k, |v, &(i, s)| {
                let c = y[i].max(0.0);
                if s == 1.0 {
                    v * c
                } else {
                    v * c.powf(s)
                }
            }),
            RateLaw::MichaelisMenten { substrate, vmax, km } => {
                let s = y[substrate].max(0.0);
                if km + s == 0.0 {
                    0.0
                } else {
                    vmax * s / (km + s)
                }
            }
            RateLaw::HillActivation {
                activator,
                vmax,
                k,
                n,
            } => {
                let a = y[activator].max(0.0).powf(n);
                let denominator = k.powf(n) + a;
                if denominator == 0.0 {
                    0.0
                } else {
                    vmax * a / denominator
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledNetwork {
    initial: Concentrations,
    fixed: Vec<bool>,
    reactions: Vec<CompiledReaction>,
}

struct RateEquations<'a> {
    network: &'a CompiledNetwork,
}

impl System<f64, Concentrations> for RateEquations<'_> {
    fn system(&self, _t: f64, y: &Concentrations, dy: &mut Concentrations) {
        dy.fill(0.0);
        for reaction in &self.network.reactions {
            let v = reaction.velocity(y);
            for &(i, s) in &reaction.reactants {
                dy[i] -= s * v;
            }
            for &(i, s) in &reaction.products {
                dy[i] += s * v;
            }
        }
        for (i, fixed) in self.network.fixed.iter().enumerate() {
            if *fixed {
                dy[i] = 0.0;
            }
        }
    }
}

pub struct NetworkModel {
    network: ReactionNetwork,
    species_index: HashMap<String, usize>,
    compiled: Option<CompiledNetwork>,
    messages: Vec<String>,
}

impl NetworkModel {
    /// Loads a network from a `.yaml`, `.yml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`KinsweepError::ModelLoad`] if the file cannot be read or parsed, or if the
    /// network refers to species or parameters it does not define.
    pub fn load(path: &Path) -> Result<Self, KinsweepError> {
        let load_error = |reason: String| KinsweepError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let file: NetworkFile = match extension.as_deref() {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| load_error(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))?,
            _ => {
                return Err(load_error(
                    "unsupported model format; expected .yaml, .yml or .json".to_string(),
                ))
            }
        };
        Self::validate(&file.network).map_err(load_error)?;
        Ok(Self::from_validated(file.network))
    }

    /// Wraps an in-memory network.
    pub fn from_network(network: ReactionNetwork) -> Result<Self, KinsweepError> {
        Self::validate(&network).map_err(|reason| KinsweepError::ModelLoad {
            path: network.name.clone(),
            reason,
        })?;
        Ok(Self::from_validated(network))
    }

    fn from_validated(network: ReactionNetwork) -> Self {
        let species_index = network
            .species
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self {
            network,
            species_index,
            compiled: None,
            messages: Vec::new(),
        }
    }

    fn validate(network: &ReactionNetwork) -> Result<(), String> {
        if network.species.is_empty() {
            return Err("the network defines no species".to_string());
        }
        let mut species = HashSet::new();
        for s in &network.species {
            if s.id.trim().is_empty() {
                return Err("species with an empty id".to_string());
            }
            if !species.insert(s.id.as_str()) {
                return Err(format!("species '{}' is defined twice", s.id));
            }
            if !s.initial_concentration.is_finite() {
                return Err(format!("species '{}' has a non-finite concentration", s.id));
            }
        }
        let mut reactions = HashSet::new();
        for r in &network.reactions {
            if !reactions.insert(r.id.as_str()) {
                return Err(format!("reaction '{}' is defined twice", r.id));
            }
            if let Some(missing) = r.referenced_species().into_iter().find(|id| !species.contains(id)) {
                return Err(format!(
                    "reaction '{}' refers to unknown species '{}'",
                    r.id, missing
                ));
            }
            if let Some(missing) = r
                .required_parameters()
                .into_iter()
                .find(|p| !r.parameters.contains_key(*p))
            {
                return Err(format!(
                    "reaction '{}' has no value for parameter '{}'",
                    r.id, missing
                ));
            }
        }
        Ok(())
    }

    pub fn network(&self) -> &ReactionNetwork {
        &self.network
    }

    /// Report column names: `time` followed by every species id.
    pub fn report_columns(&self) -> Vec<String> {
        std::iter::once("time".to_string())
            .chain(self.network.species.iter().map(|s| s.id.clone()))
            .collect()
    }

    fn compile(&self) -> Result<CompiledNetwork, KinsweepError> {
        let index = |id: &str| {
            self.species_index
                .get(id)
                .copied()
                .ok_or_else(|| KinsweepError::UnknownTarget(id.to_string()))
        };
        let mut reactions = Vec::with_capacity(self.network.reactions.len());
        for r in &self.network.reactions {
            let param = |name: &str| {
                r.parameters
                    .get(name)
                    .copied()
                    .ok_or_else(|| KinsweepError::UnknownTarget(format!("{}.{}", r.id, name)))
            };
            let rate = match &r.kinetics {
                Kinetics::MassAction { rate_constant } => RateLaw::MassAction {
                    k: param(rate_constant)?,
                },
                Kinetics::MichaelisMenten { substrate, vmax, km } => RateLaw::MichaelisMenten {
                    substrate: index(substrate)?,
                    vmax: param(vmax)?,
                    km: param(km)?,
                },
                Kinetics::HillActivation {
                    activator,
                    vmax,
                    k,
                    n,
                } => RateLaw::HillActivation {
                    activator: index(activator)?,
                    vmax: param(vmax)?,
                    k: param(k)?,
                    n: param(n)?,
                },
            };
            reactions.push(CompiledReaction {
                reactants: r
                    .reactants
                    .iter()
                    .map(|s| Ok((index(&s.species)?, s.stoichiometry)))
                    .collect::<Result<_, KinsweepError>>()?,
                products: r
                    .products
                    .iter()
                    .map(|s| Ok((index(&s.species)?, s.stoichiometry)))
                    .collect::<Result<_, KinsweepError>>()?,
                rate,
            });
        }
        Ok(CompiledNetwork {
            initial: Concentrations::from_iterator(
                self.network.species.len(),
                self.network.species.iter().map(|s| s.initial_concentration),
            ),
            fixed: self.network.species.iter().map(|s| s.fixed).collect(),
            reactions,
        })
    }
}

fn check_time_course(course: &TimeCourse) -> Result<(), KinsweepError> {
    if !(course.duration.is_finite() && course.duration > 0.0) {
        return Err(KinsweepError::Configuration(format!(
            "time course duration must be positive, got {}",
            course.duration
        )));
    }
    if course.step_count() == 0 {
        return Err(KinsweepError::Configuration(
            "time course needs at least one step".to_string(),
        ));
    }
    if !(course.absolute_tolerance > 0.0 && course.relative_tolerance > 0.0) {
        return Err(KinsweepError::Configuration(
            "solver tolerances must be positive".to_string(),
        ));
    }
    Ok(())
}

fn write_row(out: &mut impl Write, t: f64, y: &Concentrations) -> std::io::Result<()> {
    write!(out, "{}", t)?;
    for value in y.iter() {
        write!(out, ", {}", value)?;
    }
    writeln!(out)
}

impl SimulationModel for NetworkModel {
    fn set_value(&mut self, target: &Target, value: f64) -> Result<(), KinsweepError> {
        match target {
            Target::InitialConcentration { species } => {
                let i = *self
                    .species_index
                    .get(species)
                    .ok_or_else(|| KinsweepError::UnknownTarget(target.to_string()))?;
                self.network.species[i].initial_concentration = value;
            }
            Target::ReactionParameter {
                reaction,
                parameter,
            } => {
                let slot = self
                    .network
                    .reactions
                    .iter_mut()
                    .find(|r| &r.id == reaction)
                    .and_then(|r| r.parameters.get_mut(parameter))
                    .ok_or_else(|| KinsweepError::UnknownTarget(target.to_string()))?;
                *slot = value;
            }
        }
        self.compiled = None;
        Ok(())
    }

    fn compile_if_necessary(&mut self) -> Result<(), KinsweepError> {
        if self.compiled.is_none() {
            self.compiled = Some(self.compile()?);
        }
        Ok(())
    }

    fn run_time_course(
        &mut self,
        course: &TimeCourse,
        report_path: &Path,
    ) -> Result<EngineRun, KinsweepError> {
        check_time_course(course)?;
        self.compile_if_necessary()?;

        let io_error = |e: std::io::Error| KinsweepError::FileIO(report_path.display().to_string(), e);
        let file = File::create(report_path).map_err(io_error)?;
        let mut out = BufWriter::new(file);
        writeln!(out, "{}", self.report_columns().join(", ")).map_err(io_error)?;

        let network = match self.compiled.as_ref() {
            Some(network) => network,
            None => return Ok(EngineRun::Failed),
        };
        let steps = course.step_count();
        let dt = course.duration / steps as f64;
        let mut y = network.initial.clone();
        write_row(&mut out, 0.0, &y).map_err(io_error)?;
        let mut recorded = 1;

        for k in 1..=steps {
            let t0 = (k - 1) as f64 * dt;
            let t1 = if k == steps { course.duration } else { k as f64 * dt };
            let mut stepper = Dopri5::new(
                RateEquations { network },
                t0,
                t1,
                t1 - t0,
                y.clone(),
                course.relative_tolerance,
                course.absolute_tolerance,
            );
            // accepted steps only; the last one ends exactly at t1
            stepper.set_output(OutputType::Sparse);
            if let Err(e) = stepper.integrate() {
                self.messages
                    .push(format!("integration failed between t = {} and t = {}: {}", t0, t1, e));
                out.flush().map_err(io_error)?;
                return Ok(EngineRun::Failed);
            }
            match stepper.y_out().last() {
                Some(next) if next.iter().all(|v| v.is_finite()) => y = next.clone(),
                Some(_) => {
                    self.messages
                        .push(format!("state became non-finite at t = {}", t1));
                    out.flush().map_err(io_error)?;
                    return Ok(EngineRun::Failed);
                }
                None => {
                    self.messages
                        .push(format!("solver produced no output at t = {}", t1));
                    out.flush().map_err(io_error)?;
                    return Ok(EngineRun::Failed);
                }
            }
            write_row(&mut out, t1, &y).map_err(io_error)?;
            recorded += 1;
        }

        out.flush().map_err(io_error)?;
        tracing::debug!(
            model = %self.network.name,
            recorded,
            report = %report_path.display(),
            "time course complete"
        );
        Ok(EngineRun::Completed {
            recorded_steps: recorded,
        })
    }

    fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}
