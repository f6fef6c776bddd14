//! Canonical native JSON codec; a thin wrapper over the record contracts
//! of [`Network`] and [`Variable`](crate::model::variable::Variable).

use log::info;

use crate::model::error::{BnError, Result};
use crate::model::network::{Network, NetworkRecord};

pub(crate) fn decode_str(text: &str, force_summation: bool) -> Result<Network> {
    let record: NetworkRecord = serde_json::from_str(text)
        .map_err(|e| BnError::Format(format!("malformed model document: {e}")))?;
    let network = Network::from_record(&record, force_summation)?;
    info!(
        "decoded native model '{}' with {} variables",
        network.id(),
        network.len()
    );
    Ok(network)
}

pub(crate) fn encode_string(network: &Network) -> Result<String> {
    Ok(serde_json::to_string_pretty(&network.to_record())?)
}
