//! Tensor-based conditional probability tables.
//!
//! A table's axis 0 is the owning variable's own states; the remaining axes
//! are its parents' states in declaration order. Every axis-0 column must
//! sum to 1 within [`SUMMATION_TOLERANCE`] unless forced renormalization is
//! requested, and stored values are always divided by their column sum so
//! the invariant holds exactly.

use ndarray::{Array2, ArrayD, ArrayViewD, Axis, IxDyn};
use rand::Rng;
use serde_json::Value;

use super::error::{BnError, Result};

/// Tolerance used when checking that a column sums to 1.
pub const SUMMATION_TOLERANCE: f64 = 1e-10;

/// One full assignment of the long-format table consumed by inference
/// engines: the parent states in declaration order, the variable's own
/// state, and the conditional probability of that assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct LongFormatRow {
    pub parent_states: Vec<String>,
    pub state: String,
    pub probability: f64,
}

/// A column-stochastic probability tensor of shape
/// `[|states|, |parent_1|, ..., |parent_k|]`. Prior variables degenerate to
/// a flat vector of shape `[|states|]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTable {
    values: ArrayD<f64>,
}

impl ProbabilityTable {
    /// Validates and stores a tensor, dividing each column by its sum.
    ///
    /// Without `force`, a column whose sum deviates from 1 by more than the
    /// tolerance raises a normalization error naming `owner`.
    pub fn new(values: ArrayD<f64>, owner: &str, force: bool) -> Result<Self> {
        let values = normalize(values, owner, force)?;
        Ok(ProbabilityTable { values })
    }

    /// A table with equal mass on every own state in every column.
    pub fn uniform(shape: &[usize]) -> Self {
        debug_assert!(!shape.is_empty() && shape[0] > 0);
        let mass = 1.0 / shape[0] as f64;
        ProbabilityTable {
            values: ArrayD::from_elem(IxDyn(shape), mass),
        }
    }

    /// A pseudo-random table, column-normalized.
    pub fn random<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Result<Self> {
        let count: usize = shape.iter().product();
        let raw: Vec<f64> = (0..count).map(|_| rng.gen_range(0.0..1.0)).collect();
        Self::from_flat(raw, shape, "random table", true)
    }

    /// Builds a table from a row-major flat list of the given shape.
    pub fn from_flat(flat: Vec<f64>, shape: &[usize], owner: &str, force: bool) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if flat.len() != expected {
            return Err(BnError::Shape(format!(
                "the distribution supplied for '{owner}' should be of shape {shape:?}: expected {expected} values, got {}",
                flat.len()
            )));
        }
        let values = ArrayD::from_shape_vec(IxDyn(shape), flat).map_err(|e| {
            BnError::Shape(format!("the distribution supplied for '{owner}' does not fit shape {shape:?}: {e}"))
        })?;
        Self::new(values, owner, force)
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Number of own states (cardinality of axis 0).
    pub fn state_count(&self) -> usize {
        self.shape()[0]
    }

    /// Cardinalities of the parent axes, in declaration order.
    pub fn parent_shape(&self) -> &[usize] {
        &self.shape()[1..]
    }

    /// Number of parent-state combinations (1 for a prior table).
    pub fn column_count(&self) -> usize {
        self.parent_shape().iter().product()
    }

    /// The tensor flattened row-major, axis 0 first.
    pub fn to_flat(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Reshapes the tensor to two dimensions: rows are own states, columns
    /// are the Cartesian product of parent state tuples in declaration
    /// order with later parents varying fastest. Prior tables produce a
    /// single column.
    pub fn to_tabular(&self) -> Result<Array2<f64>> {
        let rows = self.state_count();
        let cols = self.column_count();
        Array2::from_shape_vec((rows, cols), self.to_flat())
            .map_err(|e| BnError::Shape(format!("cannot reshape table to {rows}x{cols}: {e}")))
    }

    /// Expands the tensor into long-format rows, one per full assignment.
    /// Columns are visited with later parents varying fastest, own states
    /// innermost, matching [`ProbabilityTable::to_tabular`].
    pub fn to_long_format(
        &self,
        states: &[String],
        parent_states: &[Vec<String>],
    ) -> Result<Vec<LongFormatRow>> {
        self.check_labels(states, parent_states)?;

        let tabular = self.to_tabular()?;
        let cols = self.column_count();
        let mut rows = Vec::with_capacity(cols * states.len());
        for column in 0..cols {
            let combo = column_assignment(column, self.parent_shape());
            let labels: Vec<String> = combo
                .iter()
                .zip(parent_states)
                .map(|(&idx, states)| states[idx].clone())
                .collect();
            for (s, state) in states.iter().enumerate() {
                rows.push(LongFormatRow {
                    parent_states: labels.clone(),
                    state: state.clone(),
                    probability: tabular[[s, column]],
                });
            }
        }
        Ok(rows)
    }

    /// Rebuilds a tensor from long-format rows. The lookup is label-based,
    /// so row order does not matter, but every full assignment must appear
    /// exactly once.
    pub fn from_long_format(
        rows: &[LongFormatRow],
        states: &[String],
        parent_states: &[Vec<String>],
        owner: &str,
        force: bool,
    ) -> Result<Self> {
        let mut shape = Vec::with_capacity(1 + parent_states.len());
        shape.push(states.len());
        shape.extend(parent_states.iter().map(Vec::len));

        let expected: usize = shape.iter().product();
        if rows.len() != expected {
            return Err(BnError::Shape(format!(
                "long-format table for '{owner}' should contain {expected} rows, got {}",
                rows.len()
            )));
        }

        let mut flat = vec![0.0; expected];
        let mut seen = vec![false; expected];
        for row in rows {
            if row.parent_states.len() != parent_states.len() {
                return Err(BnError::Shape(format!(
                    "long-format row for '{owner}' names {} parent states, expected {}",
                    row.parent_states.len(),
                    parent_states.len()
                )));
            }
            let mut index = state_position(states, &row.state, owner)?;
            for (label, states) in row.parent_states.iter().zip(parent_states) {
                let pos = state_position(states, label, owner)?;
                index = index * states.len() + pos;
            }
            // Row-major offset of [own, p1, ..., pk] computed above.
            if seen[index] {
                return Err(BnError::Shape(format!(
                    "duplicate long-format assignment for '{owner}' at state '{}'",
                    row.state
                )));
            }
            seen[index] = true;
            flat[index] = row.probability;
        }
        Self::from_flat(flat, &shape, owner, force)
    }

    /// Serializes the tensor as nested JSON lists, axis 0 outermost.
    /// A prior table serializes to a flat list.
    pub fn to_nested_json(&self) -> Value {
        nest_view(self.values.view())
    }

    fn check_labels(&self, states: &[String], parent_states: &[Vec<String>]) -> Result<()> {
        if states.len() != self.state_count() || parent_states.len() != self.parent_shape().len() {
            return Err(BnError::Shape(format!(
                "state labels do not match table shape {:?}: got {} states and {} parents",
                self.shape(),
                states.len(),
                parent_states.len()
            )));
        }
        for (labels, &size) in parent_states.iter().zip(self.parent_shape()) {
            if labels.len() != size {
                return Err(BnError::Shape(format!(
                    "parent state labels {labels:?} do not match cardinality {size}"
                )));
            }
        }
        Ok(())
    }
}

/// Flattens arbitrarily nested JSON lists of numbers row-major.
pub fn flatten_nested_json(value: &Value, owner: &str) -> Result<Vec<f64>> {
    let mut flat = Vec::new();
    collect_numbers(value, owner, &mut flat)?;
    Ok(flat)
}

fn collect_numbers(value: &Value, owner: &str, flat: &mut Vec<f64>) -> Result<()> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(x) => {
                flat.push(x);
                Ok(())
            }
            None => Err(BnError::Format(format!(
                "probability {n} for '{owner}' is not representable as a float"
            ))),
        },
        Value::Array(items) => {
            for item in items {
                collect_numbers(item, owner, flat)?;
            }
            Ok(())
        }
        other => Err(BnError::Format(format!(
            "the probabilities for '{owner}' must be numbers, got {other}"
        ))),
    }
}

fn nest_view(view: ArrayViewD<'_, f64>) -> Value {
    if view.ndim() <= 1 {
        return Value::Array(view.iter().map(|&x| Value::from(x)).collect());
    }
    Value::Array(view.outer_iter().map(nest_view).collect())
}

/// Decodes a tabular column index into per-parent state indices, later
/// parents varying fastest.
fn column_assignment(column: usize, parent_shape: &[usize]) -> Vec<usize> {
    let mut indices = vec![0; parent_shape.len()];
    let mut remainder = column;
    for (slot, &size) in indices.iter_mut().zip(parent_shape).rev() {
        *slot = remainder % size;
        remainder /= size;
    }
    indices
}

fn state_position(states: &[String], label: &str, owner: &str) -> Result<usize> {
    states
        .iter()
        .position(|s| s == label)
        .ok_or_else(|| BnError::Lookup(format!("'{label}' is not a state known to '{owner}'")))
}

fn normalize(values: ArrayD<f64>, owner: &str, force: bool) -> Result<ArrayD<f64>> {
    if values.iter().any(|x| !x.is_finite() || *x < 0.0) {
        return Err(BnError::Validation(format!(
            "the probabilities for '{owner}' must be finite and nonnegative"
        )));
    }

    let sums = values.sum_axis(Axis(0));
    if sums.iter().any(|s| *s <= 0.0) {
        return Err(BnError::Normalization(format!(
            "a probability column for '{owner}' sums to 0 and cannot be normalized"
        )));
    }
    if !force && sums.iter().any(|s| (s - 1.0).abs() > SUMMATION_TOLERANCE) {
        return Err(BnError::Normalization(format!(
            "the probabilities for '{owner}' do not sum to 1"
        )));
    }
    Ok(&values / &sums)
}
