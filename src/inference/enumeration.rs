//! Reference inference engine based on exact joint enumeration.
//!
//! Suitable for the small networks this crate is exercised with; swap in a
//! different [`InferenceEngine`] implementation for anything large.

use rand::Rng;
use std::collections::HashMap;

use super::engine::InferenceEngine;
use crate::model::error::{BnError, Result};
use crate::model::table::{LongFormatRow, ProbabilityTable};

#[derive(Debug, Clone)]
struct EngineVariable {
    id: String,
    states: Vec<String>,
    parent_positions: Vec<usize>,
    table: ProbabilityTable,
}

impl EngineVariable {
    /// Conditional probability of `state` given the states already fixed
    /// for this variable's parents in `assignment`.
    fn probability(&self, state: usize, assignment: &[usize]) -> f64 {
        let mut index = Vec::with_capacity(1 + self.parent_positions.len());
        index.push(state);
        for &parent in &self.parent_positions {
            index.push(assignment[parent]);
        }
        self.table.values()[index.as_slice()]
    }
}

/// Exact-inference engine: marginals by full joint enumeration, sampling
/// by ancestral draws, fitting by maximum-likelihood counting.
#[derive(Debug, Default)]
pub struct EnumerationEngine {
    variables: Vec<EngineVariable>,
    index: HashMap<String, usize>,
    finalized: bool,
}

impl EnumerationEngine {
    pub fn new() -> Self {
        EnumerationEngine::default()
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| BnError::Lookup(format!("engine has no variable with id '{id}'")))
    }

    fn push(&mut self, variable: EngineVariable) -> Result<()> {
        if self.index.contains_key(&variable.id) {
            return Err(BnError::Structural(format!(
                "a distribution for '{}' is already loaded",
                variable.id
            )));
        }
        self.index.insert(variable.id.clone(), self.variables.len());
        self.variables.push(variable);
        self.finalized = false;
        Ok(())
    }

    /// Depth-first walk over all joint assignments consistent with the
    /// pinned evidence, accumulating each completion's weight into the
    /// per-variable tallies.
    fn accumulate(
        &self,
        position: usize,
        assignment: &mut [usize],
        pinned: &[Option<usize>],
        weight: f64,
        tallies: &mut [Vec<f64>],
        total: &mut f64,
    ) {
        if position == self.variables.len() {
            *total += weight;
            for (tally, &state) in tallies.iter_mut().zip(assignment.iter()) {
                tally[state] += weight;
            }
            return;
        }

        let variable = &self.variables[position];
        let choices: Vec<usize> = match pinned[position] {
            Some(state) => vec![state],
            None => (0..variable.states.len()).collect(),
        };
        for state in choices {
            let p = variable.probability(state, assignment);
            if p == 0.0 {
                continue;
            }
            assignment[position] = state;
            self.accumulate(position + 1, assignment, pinned, weight * p, tallies, total);
        }
    }
}

impl InferenceEngine for EnumerationEngine {
    fn load_prior(&mut self, id: &str, distribution: &[(String, f64)]) -> Result<()> {
        let states: Vec<String> = distribution.iter().map(|(s, _)| s.clone()).collect();
        let values: Vec<f64> = distribution.iter().map(|(_, p)| *p).collect();
        let table = ProbabilityTable::from_flat(values, &[states.len()], id, false)?;
        self.push(EngineVariable {
            id: id.to_string(),
            states,
            parent_positions: Vec::new(),
            table,
        })
    }

    fn load_conditional(
        &mut self,
        id: &str,
        states: &[String],
        parent_ids: &[String],
        rows: &[LongFormatRow],
    ) -> Result<()> {
        let parent_positions = parent_ids
            .iter()
            .map(|parent_id| {
                self.index.get(parent_id).copied().ok_or_else(|| {
                    BnError::Structural(format!(
                        "no distribution loaded for parent '{parent_id}' of '{id}'"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let parent_states: Vec<Vec<String>> = parent_positions
            .iter()
            .map(|&p| self.variables[p].states.clone())
            .collect();
        let table = ProbabilityTable::from_long_format(rows, states, &parent_states, id, false)?;
        self.push(EngineVariable {
            id: id.to_string(),
            states: states.to_vec(),
            parent_positions,
            table,
        })
    }

    fn finalize(&mut self) -> Result<()> {
        // Variables arrive in topological order, so there is no structure
        // left to build; the flag just makes repeated calls observable.
        self.finalized = true;
        Ok(())
    }

    fn query(&self, evidence: &[(String, String)]) -> Result<Vec<(String, Vec<f64>)>> {
        if !self.finalized {
            return Err(BnError::Structural(
                "the engine must be finalized before querying".to_string(),
            ));
        }

        let mut pinned: Vec<Option<usize>> = vec![None; self.variables.len()];
        for (id, state) in evidence {
            let position = self.position(id)?;
            let variable = &self.variables[position];
            let state_index = variable
                .states
                .iter()
                .position(|s| s == state)
                .ok_or_else(|| {
                    BnError::Lookup(format!("'{state}' is not a state of variable '{id}'"))
                })?;
            pinned[position] = Some(state_index);
        }

        let mut tallies: Vec<Vec<f64>> = self
            .variables
            .iter()
            .map(|v| vec![0.0; v.states.len()])
            .collect();
        let mut total = 0.0;
        let mut assignment = vec![0usize; self.variables.len()];
        self.accumulate(0, &mut assignment, &pinned, 1.0, &mut tallies, &mut total);

        if total <= 0.0 {
            return Err(BnError::Validation(
                "the supplied evidence has probability zero under the model".to_string(),
            ));
        }

        Ok(self
            .variables
            .iter()
            .zip(tallies)
            .zip(&pinned)
            .filter(|(_, pin)| pin.is_none())
            .map(|((variable, tally), _)| {
                let marginal = tally.iter().map(|w| w / total).collect();
                (variable.id.clone(), marginal)
            })
            .collect())
    }

    fn generate(&mut self, count: usize) -> Result<Vec<Vec<String>>> {
        if !self.finalized {
            return Err(BnError::Structural(
                "the engine must be finalized before sampling".to_string(),
            ));
        }

        let mut rng = rand::thread_rng();
        let mut rows = Vec::with_capacity(count);
        for _ in 0..count {
            let mut assignment = vec![0usize; self.variables.len()];
            let mut row = Vec::with_capacity(self.variables.len());
            for (position, variable) in self.variables.iter().enumerate() {
                let draw: f64 = rng.gen_range(0.0..1.0);
                let mut cumulative = 0.0;
                let mut chosen = variable.states.len() - 1;
                for state in 0..variable.states.len() {
                    cumulative += variable.probability(state, &assignment);
                    if draw < cumulative {
                        chosen = state;
                        break;
                    }
                }
                assignment[position] = chosen;
                row.push(variable.states[chosen].clone());
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn fit(&mut self, columns: &[String], rows: &[Vec<String>]) -> Result<HashMap<String, Vec<f64>>> {
        let mut column_of = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            column_of.insert(column.as_str(), position);
        }

        let mut fitted = HashMap::with_capacity(self.variables.len());
        for variable in &self.variables {
            let own_column = *column_of.get(variable.id.as_str()).ok_or_else(|| {
                BnError::Lookup(format!(
                    "fit data has no column for variable '{}'",
                    variable.id
                ))
            })?;
            let parent_columns = variable
                .parent_positions
                .iter()
                .map(|&p| {
                    let parent = &self.variables[p];
                    column_of.get(parent.id.as_str()).copied().ok_or_else(|| {
                        BnError::Lookup(format!(
                            "fit data has no column for variable '{}'",
                            parent.id
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let state_count = variable.states.len();
            let column_count: usize = variable
                .parent_positions
                .iter()
                .map(|&p| self.variables[p].states.len())
                .product();
            let mut counts = vec![0.0_f64; state_count * column_count];

            for row in rows {
                if row.len() != columns.len() {
                    return Err(BnError::Shape(format!(
                        "fit row has {} entries, expected {}",
                        row.len(),
                        columns.len()
                    )));
                }
                let own_state = state_index(&variable.states, &row[own_column], &variable.id)?;
                let mut column = 0usize;
                for (&parent_position, &parent_column) in
                    variable.parent_positions.iter().zip(&parent_columns)
                {
                    let parent = &self.variables[parent_position];
                    let parent_state =
                        state_index(&parent.states, &row[parent_column], &parent.id)?;
                    column = column * parent.states.len() + parent_state;
                }
                counts[own_state * column_count + column] += 1.0;
            }

            // Parent combinations never observed keep a uniform column.
            let mut flat = vec![0.0_f64; counts.len()];
            for column in 0..column_count {
                let total: f64 = (0..state_count)
                    .map(|s| counts[s * column_count + column])
                    .sum();
                for state in 0..state_count {
                    let slot = state * column_count + column;
                    flat[slot] = if total > 0.0 {
                        counts[slot] / total
                    } else {
                        1.0 / state_count as f64
                    };
                }
            }
            fitted.insert(variable.id.clone(), flat);
        }
        Ok(fitted)
    }
}

fn state_index(states: &[String], label: &str, owner: &str) -> Result<usize> {
    states
        .iter()
        .position(|s| s == label)
        .ok_or_else(|| BnError::Lookup(format!("'{label}' is not a state of variable '{owner}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_variable_engine() -> EnumerationEngine {
        let mut engine = EnumerationEngine::new();
        engine
            .load_prior(
                "a",
                &[("x".to_string(), 0.3), ("y".to_string(), 0.7)],
            )
            .unwrap();
        let states = vec!["no".to_string(), "yes".to_string()];
        let table = ProbabilityTable::from_flat(
            vec![0.9, 0.2, 0.1, 0.8],
            &[2, 2],
            "b",
            false,
        )
        .unwrap();
        let rows = table
            .to_long_format(&states, &[vec!["x".to_string(), "y".to_string()]])
            .unwrap();
        engine
            .load_conditional("b", &states, &["a".to_string()], &rows)
            .unwrap();
        engine.finalize().unwrap();
        engine
    }

    #[test]
    fn test_query_requires_finalize() {
        let mut engine = EnumerationEngine::new();
        engine
            .load_prior("a", &[("x".to_string(), 1.0)])
            .unwrap();
        assert!(engine.query(&[]).is_err());
        engine.finalize().unwrap();
        engine.finalize().unwrap(); // idempotent
        assert!(engine.query(&[]).is_ok());
    }

    #[test]
    fn test_marginal_without_evidence() {
        let engine = two_variable_engine();
        let marginals: HashMap<_, _> = engine.query(&[]).unwrap().into_iter().collect();
        // P(b=no) = 0.3 * 0.9 + 0.7 * 0.2 = 0.41
        let b = &marginals["b"];
        assert!((b[0] - 0.41).abs() < 1e-12);
        assert!((b[1] - 0.59).abs() < 1e-12);
    }

    #[test]
    fn test_posterior_of_parent_given_child() {
        let engine = two_variable_engine();
        let evidence = vec![("b".to_string(), "no".to_string())];
        let marginals: HashMap<_, _> = engine.query(&evidence).unwrap().into_iter().collect();
        // P(a=x | b=no) = 0.27 / 0.41
        let a = &marginals["a"];
        assert!((a[0] - 0.27 / 0.41).abs() < 1e-12);
        assert!(!marginals.contains_key("b"));
    }

    #[test]
    fn test_conditional_requires_loaded_parent() {
        let mut engine = EnumerationEngine::new();
        let err = engine
            .load_conditional("b", &["no".to_string()], &["a".to_string()], &[])
            .unwrap_err();
        assert!(matches!(err, BnError::Structural(_)));
    }

    #[test]
    fn test_generate_emits_known_labels() {
        let mut engine = two_variable_engine();
        let rows = engine.generate(25).unwrap();
        assert_eq!(rows.len(), 25);
        for row in rows {
            assert!(row[0] == "x" || row[0] == "y");
            assert!(row[1] == "no" || row[1] == "yes");
        }
    }

    #[test]
    fn test_fit_counts_and_normalizes() {
        let mut engine = two_variable_engine();
        let columns = vec!["a".to_string(), "b".to_string()];
        let rows = vec![
            vec!["x".to_string(), "no".to_string()],
            vec!["x".to_string(), "no".to_string()],
            vec!["x".to_string(), "yes".to_string()],
            vec!["y".to_string(), "yes".to_string()],
        ];
        let fitted = engine.fit(&columns, &rows).unwrap();

        let a = &fitted["a"];
        assert!((a[0] - 0.75).abs() < 1e-12);
        assert!((a[1] - 0.25).abs() < 1e-12);

        // b given a=x observed no twice, yes once; a=y observed yes once.
        let b = &fitted["b"];
        assert!((b[0] - 2.0 / 3.0).abs() < 1e-12); // P(no|x)
        assert!((b[1] - 0.0).abs() < 1e-12); // P(no|y)
        assert!((b[2] - 1.0 / 3.0).abs() < 1e-12); // P(yes|x)
        assert!((b[3] - 1.0).abs() < 1e-12); // P(yes|y)
    }

    #[test]
    fn test_fit_unseen_parent_combination_stays_uniform() {
        let mut engine = two_variable_engine();
        let columns = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["x".to_string(), "no".to_string()]];
        let fitted = engine.fit(&columns, &rows).unwrap();
        let b = &fitted["b"];
        assert!((b[1] - 0.5).abs() < 1e-12);
        assert!((b[3] - 0.5).abs() < 1e-12);
    }
}
