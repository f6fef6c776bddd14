//! Translation from the core model to the inference engine contract.
//!
//! The core never inherits engine types; this adapter converts each
//! variable's tensor into the long-format/prior inputs the engine
//! consumes, then finalizes the engine.

use log::debug;

use super::engine::InferenceEngine;
use crate::model::error::Result;
use crate::model::network::Network;

/// Loads every variable of `network` into `engine` in construction order
/// and finalizes it.
pub fn compile_network(network: &Network, engine: &mut dyn InferenceEngine) -> Result<()> {
    for variable in network.variables() {
        if variable.is_prior() {
            let distribution: Vec<(String, f64)> = variable
                .states()
                .iter()
                .cloned()
                .zip(variable.table().to_flat())
                .collect();
            engine.load_prior(variable.id(), &distribution)?;
        } else {
            let parent_states: Vec<Vec<String>> = variable
                .parents()
                .iter()
                .map(|p| p.states.clone())
                .collect();
            let rows = variable.table().to_long_format(variable.states(), &parent_states)?;
            engine.load_conditional(
                variable.id(),
                variable.states(),
                &variable.parent_ids(),
                &rows,
            )?;
        }
    }
    engine.finalize()?;
    debug!(
        "compiled {} variables of network '{}' into the inference engine",
        network.len(),
        network.id()
    );
    Ok(())
}
