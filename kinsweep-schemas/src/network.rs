//! Defines the data structures for a reaction-network model: the species whose
//! concentrations are tracked and the reactions that convert between them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A chemical species tracked by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    /// The identifier used in reports and when addressing the species from a sweep.
    pub id: String,
    /// An optional human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Initial concentration in mmol/ml.
    pub initial_concentration: f64,
    /// A fixed species keeps its initial concentration for the whole time course.
    #[serde(default)]
    pub fixed: bool,
}

/// A reference from a reaction to one of its participating species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesReference {
    pub species: String,
    #[serde(default = "default_stoichiometry")]
    pub stoichiometry: f64,
}

fn default_stoichiometry() -> f64 {
    1.0
}

/// The rate law of a reaction. Every field names an entry of the reaction's
/// `parameters`, except `substrate` and `activator`, which name species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kinetics {
    MassAction {
        rate_constant: String,
    },
    MichaelisMenten {
        substrate: String,
        vmax: String,
        km: String,
    },
    HillActivation {
        activator: String,
        vmax: String,
        k: String,
        n: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    #[serde(default)]
    pub reactants: Vec<SpeciesReference>,
    #[serde(default)]
    pub products: Vec<SpeciesReference>,
    /// Local kinetic parameters, addressed as `<reaction>.<parameter>`.
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    pub kinetics: Kinetics,
}

/// A complete reaction network. Species declaration order is the column order of reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionNetwork {
    pub name: String,
    pub species: Vec<Species>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Reaction {
    /// Names of every parameter the rate law refers to.
    pub fn required_parameters(&self) -> Vec<&str> {
        match &self.kinetics {
            Kinetics::MassAction { rate_constant } => vec![rate_constant.as_str()],
            Kinetics::MichaelisMenten { vmax, km, .. } => vec![vmax.as_str(), km.as_str()],
            Kinetics::HillActivation { vmax, k, n, .. } => {
                vec![vmax.as_str(), k.as_str(), n.as_str()]
            }
        }
    }

    /// Names of every species the reaction touches, including modifiers of the rate law.
    pub fn referenced_species(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .reactants
            .iter()
            .chain(self.products.iter())
            .map(|r| r.species.as_str())
            .collect();
        match &self.kinetics {
            Kinetics::MichaelisMenten { substrate, .. } => ids.push(substrate),
            Kinetics::HillActivation { activator, .. } => ids.push(activator),
            Kinetics::MassAction { .. } => {}
        }
        ids
    }
}
