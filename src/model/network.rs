//! Ordered DAG container of variables.
//!
//! The network owns the single variable arena; insertion order is the
//! topological construction order and is preserved through serialization.
//! Edges are always derived from each variable's parent list, never stored.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::error::{BnError, Result};
use super::identifier;
use super::variable::{ParentRef, TableSpec, Variable, VariableRecord};
use crate::inference::adapter;
use crate::inference::engine::InferenceEngine;
use crate::inference::enumeration::EnumerationEngine;

/// Purely descriptive variable grouping; no effect on inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial assignment of observed states; entries with a `None` value are
/// dropped before delegation to the inference engine.
pub type Evidence = HashMap<String, Option<String>>;

/// Per-variable distributions keyed by variable id, each vector in the
/// variable's declared state order.
pub type Marginals = HashMap<String, Vec<f64>>;

/// A rectangular table of state labels with named columns, used for sample
/// output and fit input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        DataTable { columns, rows }
    }

    /// Appends the columns of `other` to `self`, row by row.
    pub fn concat_columns(&self, other: &DataTable) -> Result<DataTable> {
        if self.rows.len() != other.rows.len() {
            return Err(BnError::Shape(format!(
                "cannot concatenate tables with {} and {} rows",
                self.rows.len(),
                other.rows.len()
            )));
        }
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(left, right)| {
                let mut row = left.clone();
                row.extend(right.iter().cloned());
                row
            })
            .collect();
        Ok(DataTable { columns, rows })
    }
}

/// A discrete Bayesian network: an ordered arena of variables plus derived
/// edges and a lazily-compiled inference engine slot.
#[derive(Debug)]
pub struct Network {
    id: String,
    name: String,
    description: Option<String>,
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    input_groups: Vec<Group>,
    output_groups: Vec<Group>,
    engine: Option<Box<dyn InferenceEngine>>,
}

impl Network {
    /// Stores the variables in the given order and validates the structure:
    /// ids must be unique, and every parent must appear earlier in the list
    /// with a state list matching the child's snapshot.
    pub fn new(name: &str, variables: Vec<Variable>) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(BnError::Validation("network name must not be empty".to_string()));
        }
        let id = identifier::id_from_name(name)?;

        let mut index: HashMap<String, usize> = HashMap::with_capacity(variables.len());
        for (position, variable) in variables.iter().enumerate() {
            if index.contains_key(variable.id()) {
                return Err(BnError::Structural(format!(
                    "duplicate variable id '{}' in network '{name}'",
                    variable.id()
                )));
            }
            for parent in variable.parents() {
                match index.get(parent.id.as_str()) {
                    None => {
                        return Err(BnError::Structural(format!(
                            "variable '{}' references parent '{}' which is not constructed before it",
                            variable.id(),
                            parent.id
                        )));
                    }
                    Some(&parent_position) => {
                        if variables[parent_position].states() != parent.states.as_slice() {
                            return Err(BnError::Structural(format!(
                                "variable '{}' snapshots states {:?} for parent '{}', which declares {:?}",
                                variable.id(),
                                parent.states,
                                parent.id,
                                variables[parent_position].states()
                            )));
                        }
                    }
                }
            }
            index.insert(variable.id().to_string(), position);
        }

        info!("constructed network '{id}' with {} variables", variables.len());
        Ok(Network {
            id,
            name: name.to_string(),
            description: None,
            variables,
            index,
            input_groups: Vec::new(),
            output_groups: Vec::new(),
            engine: None,
        })
    }

    pub fn with_id(mut self, id: &str) -> Result<Self> {
        identifier::validate_id(id)?;
        self.id = id.to_string();
        Ok(self)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_input_groups(mut self, groups: Vec<Group>) -> Result<Self> {
        self.input_groups = groups;
        self.validate_groups()?;
        Ok(self)
    }

    pub fn with_output_groups(mut self, groups: Vec<Group>) -> Result<Self> {
        self.output_groups = groups;
        self.validate_groups()?;
        Ok(self)
    }

    fn validate_groups(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for group in self.input_groups.iter().chain(&self.output_groups) {
            if !seen.insert(group.id.as_str()) {
                return Err(BnError::Structural(format!(
                    "duplicate group id '{}' in network '{}'",
                    group.id, self.id
                )));
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable_ids(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.id().to_string()).collect()
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn input_groups(&self) -> &[Group] {
        &self.input_groups
    }

    pub fn output_groups(&self) -> &[Group] {
        &self.output_groups
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn lookup(&self, id: &str) -> Result<&Variable> {
        match self.index.get(id) {
            Some(&position) => Ok(&self.variables[position]),
            None => Err(BnError::Lookup(format!(
                "network '{}' has no variable with id '{id}'",
                self.id
            ))),
        }
    }

    /// One `(parent_id, child_id)` pair per variable per declared parent,
    /// recomputed from the variable list.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.variables
            .iter()
            .flat_map(|child| {
                child
                    .parents()
                    .iter()
                    .map(|parent| (parent.id.clone(), child.id().to_string()))
            })
            .collect()
    }

    /// Installs a caller-supplied inference engine, compiling the network
    /// into it immediately.
    pub fn set_engine(&mut self, mut engine: Box<dyn InferenceEngine>) -> Result<()> {
        adapter::compile_network(self, engine.as_mut())?;
        self.engine = Some(engine);
        Ok(())
    }

    /// Compiles the default engine lazily; idempotent per network instance.
    fn compiled_engine(&mut self) -> Result<&mut dyn InferenceEngine> {
        if self.engine.is_none() {
            debug!("compiling inference engine for network '{}'", self.id);
            let mut engine: Box<dyn InferenceEngine> = Box::new(EnumerationEngine::new());
            adapter::compile_network(self, engine.as_mut())?;
            self.engine = Some(engine);
        }
        match self.engine.as_mut() {
            Some(engine) => Ok(engine.as_mut()),
            None => Err(BnError::Structural(format!(
                "inference engine for network '{}' failed to compile",
                self.id
            ))),
        }
    }

    /// Queries marginal distributions for every non-evidence variable.
    ///
    /// Every evidence key must be a known variable id and every value one
    /// of that variable's declared states; `None` values are dropped before
    /// delegation. Results are keyed by variable id with each vector in
    /// declared state order.
    pub fn query(&mut self, evidence: &Evidence) -> Result<Marginals> {
        let resolved = self.resolve_evidence(evidence)?;
        let engine = self.compiled_engine()?;
        let marginals = engine.query(&resolved)?;
        Ok(marginals.into_iter().collect())
    }

    /// Batch form of [`Network::query`]: applies each evidence row
    /// independently and returns one result per input row, in input order.
    pub fn query_batch(&mut self, rows: &[Evidence]) -> Result<Vec<Marginals>> {
        rows.iter().map(|row| self.query(row)).collect()
    }

    fn resolve_evidence(&self, evidence: &Evidence) -> Result<Vec<(String, String)>> {
        let mut resolved = Vec::with_capacity(evidence.len());
        for (id, value) in evidence {
            let variable = self.lookup(id)?;
            let Some(state) = value else {
                continue;
            };
            if !variable.states().iter().any(|s| s == state) {
                return Err(BnError::Lookup(format!(
                    "'{state}' is not a state of variable '{id}'"
                )));
            }
            resolved.push((id.clone(), state.clone()));
        }
        // Evidence arrives in hash order; sort for reproducible delegation.
        resolved.sort();
        Ok(resolved)
    }

    /// Draws `count` joint samples, one column per variable in network
    /// order, labelled with variable ids.
    pub fn sample(&mut self, count: usize) -> Result<DataTable> {
        let columns = self.variable_ids();
        let engine = self.compiled_engine()?;
        let rows = engine.generate(count)?;
        Ok(DataTable::new(columns, rows))
    }

    /// Re-estimates every variable's CPT from observed data. When `targets`
    /// is supplied it is concatenated onto `data` column-wise before
    /// delegation; no other transformation is applied. The returned tables
    /// replace each variable's values in place and invalidate the compiled
    /// engine.
    pub fn fit(&mut self, data: &DataTable, targets: Option<&DataTable>) -> Result<()> {
        let combined = match targets {
            Some(targets) => data.concat_columns(targets)?,
            None => data.clone(),
        };

        let fitted = {
            let engine = self.compiled_engine()?;
            engine.fit(&combined.columns, &combined.rows)?
        };

        for (id, flat) in fitted {
            let position = match self.index.get(&id) {
                Some(&position) => position,
                None => {
                    return Err(BnError::Lookup(format!(
                        "engine fitted unknown variable id '{id}'"
                    )));
                }
            };
            self.variables[position].set_table(TableSpec::Flat(flat), true)?;
        }
        self.engine = None;
        info!("fitted network '{}' from {} rows", self.id, combined.rows.len());
        Ok(())
    }

    pub fn to_record(&self) -> NetworkRecord {
        NetworkRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            input_groups: optional(&self.input_groups),
            output_groups: optional(&self.output_groups),
            variables: self.variables.iter().map(Variable::to_record).collect(),
        }
    }

    /// Reconstructs a network from its record, building variables in the
    /// listed order. Parents must appear earlier in the list; the native
    /// format assumes a valid topological order already.
    pub fn from_record(record: &NetworkRecord, force_summation: bool) -> Result<Self> {
        let mut variables: Vec<Variable> = Vec::with_capacity(record.variables.len());
        for variable_record in &record.variables {
            let parents = variable_record
                .parents
                .iter()
                .map(|parent_id| {
                    variables
                        .iter()
                        .find(|v| v.id() == parent_id)
                        .map(|v| ParentRef {
                            id: parent_id.clone(),
                            states: v.states().to_vec(),
                        })
                        .ok_or_else(|| {
                            BnError::Structural(format!(
                                "variable '{}' references undefined parent '{parent_id}'",
                                variable_record.id
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            variables.push(Variable::from_record(variable_record, parents, force_summation)?);
        }

        let mut network = Network::new(&record.name, variables)?.with_id(&record.id)?;
        if let Some(description) = &record.description {
            network = network.with_description(description);
        }
        if let Some(groups) = &record.input_groups {
            network = network.with_input_groups(groups.clone())?;
        }
        if let Some(groups) = &record.output_groups {
            network = network.with_output_groups(groups.clone())?;
        }
        Ok(network)
    }
}

fn optional(groups: &[Group]) -> Option<Vec<Group>> {
    if groups.is_empty() {
        None
    } else {
        Some(groups.to_vec())
    }
}

/// Serialized network shape used by the native JSON format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_groups: Option<Vec<Group>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_groups: Option<Vec<Group>>,
    pub variables: Vec<VariableRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::variable::StateSpec;

    fn prior(name: &str, values: Vec<f64>, states: &[&str]) -> Variable {
        Variable::new(
            name,
            StateSpec::labels(states.to_vec()),
            &[],
            TableSpec::Flat(values),
        )
        .unwrap()
    }

    fn two_variable_network() -> Network {
        let a = prior("A", vec![0.3, 0.7], &["x", "y"]);
        let b = Variable::new(
            "B",
            StateSpec::YN,
            &[&a],
            TableSpec::Flat(vec![0.9, 0.2, 0.1, 0.8]),
        )
        .unwrap();
        Network::new("Pair", vec![a, b]).unwrap()
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let a = prior("Same", vec![0.5, 0.5], &["x", "y"]);
        let b = prior("Same", vec![0.5, 0.5], &["u", "v"]);
        let err = Network::new("Net", vec![a, b]).unwrap_err();
        assert!(matches!(err, BnError::Structural(_)));
        assert!(err.to_string().contains("same"));
    }

    #[test]
    fn test_parent_must_precede_child() {
        let a = prior("A", vec![0.5, 0.5], &["x", "y"]);
        let b = Variable::new("B", StateSpec::YN, &[&a], TableSpec::Uniform).unwrap();
        // Parent listed after the child.
        let err = Network::new("Net", vec![b, a]).unwrap_err();
        assert!(matches!(err, BnError::Structural(_)));
    }

    #[test]
    fn test_edges_derived_from_parents() {
        let network = two_variable_network();
        assert_eq!(network.edges(), vec![("a".to_string(), "b".to_string())]);
    }

    #[test]
    fn test_lookup_unknown_id() {
        let network = two_variable_network();
        let err = network.lookup("zz").unwrap_err();
        assert!(matches!(err, BnError::Lookup(_)));
        assert!(err.to_string().contains("zz"));
    }

    #[test]
    fn test_duplicate_group_ids_rejected() {
        let group = |id: &str| Group {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
        };
        let network = two_variable_network()
            .with_input_groups(vec![group("g1")])
            .unwrap();
        let err = network.with_output_groups(vec![group("g1")]).unwrap_err();
        assert!(matches!(err, BnError::Structural(_)));
    }

    #[test]
    fn test_none_evidence_values_dropped() {
        let mut network = two_variable_network();
        let evidence: Evidence = HashMap::from([("a".to_string(), None)]);
        let marginals = network.query(&evidence).unwrap();
        // A `None` entry behaves like no evidence at all.
        assert!(marginals.contains_key("a"));
        assert!(marginals.contains_key("b"));
    }

    #[test]
    fn test_record_round_trip_preserves_order() {
        let network = two_variable_network();
        let record = network.to_record();
        let rebuilt = Network::from_record(&record, false).unwrap();
        assert_eq!(rebuilt.variable_ids(), network.variable_ids());
        assert_eq!(rebuilt.edges(), network.edges());
    }

    #[test]
    fn test_from_record_rejects_forward_parent_reference() {
        let network = two_variable_network();
        let mut record = network.to_record();
        record.variables.reverse();
        let err = Network::from_record(&record, false).unwrap_err();
        assert!(matches!(err, BnError::Structural(_)));
    }
}
