use crate::{network::ReactionNetwork, sweep::SweepRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkFile {
    pub schema_version: String,
    pub network: ReactionNetwork,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFile {
    pub schema_version: String,
    pub sweep: SweepRequest,
}
