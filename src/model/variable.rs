//! Named random variables and their construction rules.

use ndarray::ArrayD;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::error::{BnError, Result};
use super::identifier;
use super::table::{self, ProbabilityTable};

/// State set specification. The shorthand codes expand to fixed two-state
/// lists; anything else is taken verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum StateSpec {
    /// `[No, Yes]`
    YN,
    /// `[Negative, Positive]`
    PN,
    /// `[False, True]`
    TF,
    Labels(Vec<String>),
}

impl StateSpec {
    pub fn labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StateSpec::Labels(labels.into_iter().map(Into::into).collect())
    }

    pub fn expand(&self) -> Vec<String> {
        match self {
            StateSpec::YN => vec!["No".to_string(), "Yes".to_string()],
            StateSpec::PN => vec!["Negative".to_string(), "Positive".to_string()],
            StateSpec::TF => vec!["False".to_string(), "True".to_string()],
            StateSpec::Labels(labels) => labels.clone(),
        }
    }
}

/// Table specification accepted at variable construction.
#[derive(Debug, Clone, Default)]
pub enum TableSpec {
    /// Equal mass per column.
    #[default]
    Uniform,
    /// Pseudo-random values, column-normalized.
    Random,
    /// Explicit tensor of shape `[|states|, |parent_1|, ..., |parent_k|]`.
    Tensor(ArrayD<f64>),
    /// Row-major flat list of the same shape.
    Flat(Vec<f64>),
}

/// Non-owning snapshot of a parent variable: its id and declared states.
/// The network arena remains the single owner of every variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub id: String,
    pub states: Vec<String>,
}

impl ParentRef {
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }
}

/// A discrete random variable with a finite state set and a conditional
/// probability table over its parents' states.
#[derive(Debug, Clone)]
pub struct Variable {
    id: String,
    name: String,
    states: Vec<String>,
    parents: Vec<ParentRef>,
    table: ProbabilityTable,
    description: Option<String>,
    group: Option<String>,
}

impl Variable {
    /// Constructs a variable. Parents must already exist; their ids and
    /// state lists are snapshotted so the variable never holds an owning
    /// reference back into another structure.
    pub fn new(
        name: &str,
        states: StateSpec,
        parents: &[&Variable],
        table: TableSpec,
    ) -> Result<Self> {
        let parents = parents
            .iter()
            .map(|p| ParentRef {
                id: p.id.clone(),
                states: p.states.clone(),
            })
            .collect();
        Self::from_parts(name, states.expand(), parents, table, false)
    }

    /// Shared construction path for the public constructor and the codecs,
    /// which supply already-resolved parent snapshots and a force flag.
    pub(crate) fn from_parts(
        name: &str,
        states: Vec<String>,
        parents: Vec<ParentRef>,
        table: TableSpec,
        force: bool,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(BnError::Validation("variable name must not be empty".to_string()));
        }
        if states.is_empty() {
            return Err(BnError::Validation(format!(
                "variable '{name}' must declare at least one state"
            )));
        }
        let mut seen = HashSet::new();
        for state in &states {
            if !seen.insert(state.as_str()) {
                return Err(BnError::Validation(format!(
                    "variable '{name}' declares duplicate state '{state}'"
                )));
            }
        }

        let id = identifier::id_from_name(name)?;
        let shape = table_shape(&states, &parents);
        let table = build_table(name, &shape, table, force)?;

        Ok(Variable {
            id,
            name: name.to_string(),
            states,
            parents,
            table,
            description: None,
            group: None,
        })
    }

    /// Overrides the derived id with an explicitly supplied one.
    pub fn with_id(mut self, id: &str) -> Result<Self> {
        identifier::validate_id(id)?;
        self.id = id.to_string();
        Ok(self)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn parents(&self) -> &[ParentRef] {
        &self.parents
    }

    pub fn parent_ids(&self) -> Vec<String> {
        self.parents.iter().map(|p| p.id.clone()).collect()
    }

    pub fn parent_sizes(&self) -> Vec<usize> {
        self.parents.iter().map(ParentRef::cardinality).collect()
    }

    /// A variable with no parents carries a plain prior distribution.
    pub fn is_prior(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn table(&self) -> &ProbabilityTable {
        &self.table
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Replaces the CPT values in place. The parent/child structure is
    /// fixed for the variable's lifetime; only values may change.
    pub fn set_table(&mut self, table: TableSpec, force: bool) -> Result<()> {
        let shape = table_shape(&self.states, &self.parents);
        self.table = build_table(&self.name, &shape, table, force)?;
        Ok(())
    }

    pub fn to_record(&self) -> VariableRecord {
        VariableRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            states: self.states.clone(),
            parents: self.parent_ids(),
            npt: self.table.to_nested_json(),
            description: self.description.clone(),
            group: self.group.clone(),
        }
    }

    pub(crate) fn from_record(
        record: &VariableRecord,
        parents: Vec<ParentRef>,
        force: bool,
    ) -> Result<Self> {
        let flat = table::flatten_nested_json(&record.npt, &record.name)?;
        let mut variable = Self::from_parts(
            &record.name,
            record.states.clone(),
            parents,
            TableSpec::Flat(flat),
            force,
        )?
        .with_id(&record.id)?;
        if let Some(description) = &record.description {
            variable = variable.with_description(description);
        }
        if let Some(group) = &record.group {
            variable = variable.with_group(group);
        }
        Ok(variable)
    }
}

/// Serialized variable shape used by the native JSON format: the table is
/// emitted as nested lists, row-major with axis 0 (own states) first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRecord {
    pub id: String,
    pub name: String,
    pub states: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    pub npt: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

fn table_shape(states: &[String], parents: &[ParentRef]) -> Vec<usize> {
    let mut shape = Vec::with_capacity(1 + parents.len());
    shape.push(states.len());
    shape.extend(parents.iter().map(ParentRef::cardinality));
    shape
}

fn build_table(name: &str, shape: &[usize], spec: TableSpec, force: bool) -> Result<ProbabilityTable> {
    match spec {
        TableSpec::Uniform => Ok(ProbabilityTable::uniform(shape)),
        TableSpec::Random => ProbabilityTable::random(shape, &mut thread_rng()),
        TableSpec::Tensor(values) => {
            if values.shape() != shape {
                return Err(BnError::Shape(format!(
                    "the distribution supplied for '{name}' should be of shape {shape:?}, got {:?}",
                    values.shape()
                )));
            }
            ProbabilityTable::new(values, name, force)
        }
        TableSpec::Flat(flat) => ProbabilityTable::from_flat(flat, shape, name, force),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prior(name: &str, states: &[&str]) -> Variable {
        Variable::new(name, StateSpec::labels(states.to_vec()), &[], TableSpec::Uniform).unwrap()
    }

    #[test]
    fn test_shorthand_states_expand() {
        let v = Variable::new("Alarm", StateSpec::YN, &[], TableSpec::Uniform).unwrap();
        assert_eq!(v.states(), ["No".to_string(), "Yes".to_string()]);
        let v = Variable::new("Test", StateSpec::PN, &[], TableSpec::Uniform).unwrap();
        assert_eq!(v.states(), ["Negative".to_string(), "Positive".to_string()]);
        let v = Variable::new("Flag", StateSpec::TF, &[], TableSpec::Uniform).unwrap();
        assert_eq!(v.states(), ["False".to_string(), "True".to_string()]);
    }

    #[test]
    fn test_id_derived_from_name() {
        let v = prior("Duration of Ischaemia", &["Short", "Long"]);
        assert_eq!(v.id(), "durationofischaemia");
    }

    #[test]
    fn test_default_table_is_uniform() {
        let a = prior("A", &["x", "y"]);
        let b = Variable::new("B", StateSpec::labels(["u", "v"]), &[&a], TableSpec::default())
            .unwrap();
        for p in b.table().to_flat() {
            assert!((p - 0.5).abs() < 1e-12);
        }
        assert_eq!(b.table().shape(), &[2, 2]);
    }

    #[test]
    fn test_empty_and_duplicate_states_rejected() {
        let err = Variable::new("A", StateSpec::labels(Vec::<String>::new()), &[], TableSpec::Uniform)
            .unwrap_err();
        assert!(matches!(err, BnError::Validation(_)));

        let err = Variable::new("A", StateSpec::labels(["x", "x"]), &[], TableSpec::Uniform)
            .unwrap_err();
        assert!(matches!(err, BnError::Validation(_)));
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_explicit_tensor_shape_checked() {
        let a = prior("A", &["x", "y"]);
        let b = prior("B", &["u", "v", "w"]);
        // Correct shape is [2, 2, 3].
        let err = Variable::new(
            "C",
            StateSpec::YN,
            &[&a, &b],
            TableSpec::Flat(vec![0.5; 6]),
        )
        .unwrap_err();
        assert!(matches!(err, BnError::Shape(_)));

        let c = Variable::new(
            "C",
            StateSpec::YN,
            &[&a, &b],
            TableSpec::Flat(vec![0.5; 12]),
        )
        .unwrap();
        assert_eq!(c.parent_sizes(), vec![2, 3]);
        assert_eq!(c.table().shape(), &[2, 2, 3]);
    }

    #[test]
    fn test_with_id_validates() {
        let v = prior("A", &["x", "y"]);
        assert!(v.clone().with_id("A").is_err());
        assert_eq!(v.with_id("a_2").unwrap().id(), "a_2");
    }

    #[test]
    fn test_set_table_replaces_values_in_place() {
        let mut v = prior("A", &["x", "y"]);
        v.set_table(TableSpec::Flat(vec![0.9, 0.1]), false).unwrap();
        assert_eq!(v.table().to_flat(), vec![0.9, 0.1]);
        // Structure is fixed: the replacement must match the shape.
        let err = v.set_table(TableSpec::Flat(vec![0.5; 4]), false).unwrap_err();
        assert!(matches!(err, BnError::Shape(_)));
    }

    #[test]
    fn test_record_round_trip() {
        let a = prior("A", &["x", "y"]);
        let c = Variable::new(
            "C",
            StateSpec::YN,
            &[&a],
            TableSpec::Flat(vec![0.2, 0.6, 0.8, 0.4]),
        )
        .unwrap()
        .with_description("conditional")
        .with_group("inputs_1");

        let record = c.to_record();
        assert_eq!(record.parents, vec!["a".to_string()]);

        let parents = vec![ParentRef {
            id: a.id().to_string(),
            states: a.states().to_vec(),
        }];
        let rebuilt = Variable::from_record(&record, parents, false).unwrap();
        assert_eq!(rebuilt.id(), c.id());
        assert_eq!(rebuilt.states(), c.states());
        assert_eq!(rebuilt.table(), c.table());
        assert_eq!(rebuilt.description(), Some("conditional"));
        assert_eq!(rebuilt.group(), Some("inputs_1"));
    }
}
