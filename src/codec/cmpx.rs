//! Interchange ("cmpx") codec.
//!
//! The decoder reconstructs a network from an unordered node list plus a
//! `parent -> child` link list: it levels the nodes so every parent is
//! constructed before its children, then reshapes each node's flat
//! probability list against the already-known parent cardinalities. The
//! encoder emits the inverse, one table row list per variable in the
//! network's stored order.

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};

use super::CmpxReadOptions;
use crate::model::error::{BnError, Result};
use crate::model::network::Network;
use crate::model::table;
use crate::model::variable::{ParentRef, TableSpec, Variable};

#[derive(Debug, Serialize, Deserialize)]
struct CmpxDocument {
    model: CmpxModel,
}

#[derive(Debug, Serialize, Deserialize)]
struct CmpxModel {
    /// Engine settings carried by the external format; opaque to this
    /// crate and replaced with fixed constants on encode.
    #[serde(default)]
    settings: Value,
    networks: Vec<CmpxNetwork>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CmpxNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    nodes: Vec<CmpxNode>,
    links: Vec<CmpxLink>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CmpxNode {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    configuration: CmpxConfiguration,
}

#[derive(Debug, Serialize, Deserialize)]
struct CmpxConfiguration {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    node_type: Option<String>,
    states: Vec<String>,
    table: CmpxTable,
}

#[derive(Debug, Serialize, Deserialize)]
struct CmpxTable {
    #[serde(rename = "nptCompiled", default, skip_serializing_if = "Option::is_none")]
    npt_compiled: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    table_type: Option<String>,
    probabilities: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct CmpxLink {
    parent: String,
    child: String,
}

/// Placeholder descriptions the external tool writes for untouched nodes.
const PLACEHOLDER_DESCRIPTIONS: [&str; 2] = ["New Node", "New node"];

pub(crate) fn decode_str(text: &str, options: &CmpxReadOptions) -> Result<Network> {
    let document: CmpxDocument = serde_json::from_str(text)
        .map_err(|e| BnError::Format(format!("malformed cmpx document: {e}")))?;
    decode_document(&document, options)
}

pub(crate) fn encode_string(network: &Network) -> Result<String> {
    Ok(serde_json::to_string_pretty(&encode_document(network)?)?)
}

fn decode_document(document: &CmpxDocument, options: &CmpxReadOptions) -> Result<Network> {
    let networks = &document.model.networks;
    let data = networks.get(options.network_index).ok_or_else(|| {
        BnError::Format(format!(
            "cmpx document holds {} network(s), index {} is out of range",
            networks.len(),
            options.network_index
        ))
    })?;

    let nodes = collect_nodes(data, options.remove_disconnected_variables)?;
    let ordered = level_nodes(nodes)?;
    info!(
        "decoding cmpx network '{}': {} nodes, {} links",
        data.name,
        ordered.len(),
        data.links.len()
    );

    let mut variables: Vec<Variable> = Vec::with_capacity(ordered.len());
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(ordered.len());
    for worknode in &ordered {
        let node = worknode.node;
        let states = node.configuration.states.clone();
        let flat = table::flatten_nested_json(&node.configuration.table.probabilities, &node.name)?;

        let parents = worknode
            .parents
            .iter()
            .map(|parent_id| {
                // Leveling guarantees the parent was constructed already.
                let &at = position.get(parent_id.as_str()).ok_or_else(|| {
                    BnError::Structural(format!(
                        "variable '{}' references undefined parent '{parent_id}'",
                        node.id
                    ))
                })?;
                Ok(ParentRef {
                    id: variables[at].id().to_string(),
                    states: variables[at].states().to_vec(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut variable = Variable::from_parts(
            &node.name,
            states,
            parents,
            TableSpec::Flat(flat),
            options.force_summation,
        )?
        .with_id(&node.id)?;

        if let Some(description) = &node.description {
            if !description.is_empty() && !PLACEHOLDER_DESCRIPTIONS.contains(&description.as_str()) {
                variable = variable.with_description(description);
            }
        }

        position.insert(node.id.as_str(), variables.len());
        variables.push(variable);
    }

    let mut network = Network::new(&data.name, variables)?;
    if let Some(id) = &data.id {
        network = network.with_id(id)?;
    }
    if let Some(description) = &data.description {
        if !description.is_empty() {
            network = network.with_description(description);
        }
    }
    Ok(network)
}

/// A node together with its parent and child id lists collected from the
/// link list. Parent order is the order links name them, which fixes the
/// CPT axis order for reshaping.
struct WorkNode<'a> {
    node: &'a CmpxNode,
    parents: Vec<String>,
    children: Vec<String>,
    level: usize,
}

fn collect_nodes<'a>(data: &'a CmpxNetwork, remove_disconnected: bool) -> Result<Vec<WorkNode<'a>>> {
    let known: HashSet<&str> = data.nodes.iter().map(|n| n.id.as_str()).collect();
    if known.len() != data.nodes.len() {
        return Err(BnError::Structural(format!(
            "cmpx network '{}' declares duplicate node ids",
            data.name
        )));
    }
    for link in &data.links {
        if !known.contains(link.parent.as_str()) {
            return Err(BnError::Structural(format!(
                "link references undefined parent '{}'",
                link.parent
            )));
        }
        if !known.contains(link.child.as_str()) {
            return Err(BnError::Structural(format!(
                "link references undefined child '{}'",
                link.child
            )));
        }
    }

    let mut nodes: Vec<WorkNode<'a>> = data
        .nodes
        .iter()
        .map(|node| {
            let parents = data
                .links
                .iter()
                .filter(|l| l.child == node.id)
                .map(|l| l.parent.clone())
                .collect();
            let children = data
                .links
                .iter()
                .filter(|l| l.parent == node.id)
                .map(|l| l.child.clone())
                .collect();
            WorkNode {
                node,
                parents,
                children,
                level: 0,
            }
        })
        .collect();

    if remove_disconnected {
        nodes.retain(|n| !(n.parents.is_empty() && n.children.is_empty()));
    }
    Ok(nodes)
}

/// Assigns topological levels in passes: parentless nodes get level 1, and
/// each subsequent pass assigns the current pass number to every node whose
/// parents were all levelled in earlier passes. A pass that resolves
/// nothing means a cycle (or an unresolvable reference) and fails instead
/// of looping.
fn level_nodes(mut nodes: Vec<WorkNode<'_>>) -> Result<Vec<WorkNode<'_>>> {
    let mut level_of: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for node in &mut nodes {
        if node.parents.is_empty() {
            node.level = 1;
            level_of.insert(node.node.id.as_str(), 1);
        }
    }

    let mut current = 1;
    while level_of.len() < nodes.len() {
        current += 1;
        // Resolve against the previous pass's snapshot so every node
        // assigned in one pass shares the same level.
        let newly: Vec<&str> = nodes
            .iter()
            .filter(|n| !level_of.contains_key(n.node.id.as_str()))
            .filter(|n| {
                n.parents
                    .iter()
                    .all(|p| level_of.get(p.as_str()).copied().unwrap_or(0) > 0)
            })
            .map(|n| n.node.id.as_str())
            .collect();

        if newly.is_empty() {
            let stuck: Vec<&str> = nodes
                .iter()
                .filter(|n| !level_of.contains_key(n.node.id.as_str()))
                .map(|n| n.node.id.as_str())
                .collect();
            return Err(BnError::Structural(format!(
                "cannot order variables {stuck:?}: dependency cycle or unresolved parent reference"
            )));
        }
        for id in newly {
            level_of.insert(id, current);
        }
    }

    for node in &mut nodes {
        node.level = level_of[node.node.id.as_str()];
    }
    // Stable by level, so document order breaks ties deterministically.
    nodes.sort_by_key(|n| n.level);
    Ok(nodes)
}

fn encode_document(network: &Network) -> Result<CmpxDocument> {
    let nodes = network
        .variables()
        .iter()
        .map(|variable| {
            let tabular = variable.table().to_tabular()?;
            let probabilities: Vec<Vec<f64>> =
                tabular.rows().into_iter().map(|row| row.to_vec()).collect();
            let node_type = if variable.state_count() == 2 {
                "Boolean"
            } else {
                "Labelled"
            };
            Ok(CmpxNode {
                id: variable.id().to_string(),
                name: variable.name().to_string(),
                description: Some(
                    variable
                        .description()
                        .unwrap_or(PLACEHOLDER_DESCRIPTIONS[1])
                        .to_string(),
                ),
                configuration: CmpxConfiguration {
                    node_type: Some(node_type.to_string()),
                    states: variable.states().to_vec(),
                    table: CmpxTable {
                        npt_compiled: Some(true),
                        table_type: Some("Manual".to_string()),
                        probabilities: json!(probabilities),
                    },
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let links = network
        .edges()
        .into_iter()
        .map(|(parent, child)| CmpxLink { parent, child })
        .collect();

    Ok(CmpxDocument {
        model: CmpxModel {
            settings: default_settings(),
            networks: vec![CmpxNetwork {
                id: Some(network.id().to_string()),
                name: network.name().to_string(),
                description: network.description().map(str::to_string),
                nodes,
                links,
            }],
        },
    })
}

/// Fixed settings block required by the external format's schema;
/// passthrough constants, not interpreted by this crate.
fn default_settings() -> Value {
    json!({
        "parameterLearningLogging": false,
        "discreteTails": false,
        "sampleSizeRanked": 5,
        "convergence": 0.001,
        "simulationLogging": false,
        "sampleSize": 2,
        "iterations": 50,
        "tolerance": 1
    })
}
