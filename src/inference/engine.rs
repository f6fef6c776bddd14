//! Contract between the core model and an inference backend.

use std::collections::HashMap;

use crate::model::error::Result;
use crate::model::table::LongFormatRow;

/// An inference backend consuming translated network structure.
///
/// Distributions are loaded in topological order: a prior variable as a
/// direct state-to-probability mapping, a conditional variable as a
/// long-format table plus the ids of its parents' already-loaded
/// distributions. The engine must be finalized before the first query;
/// finalization is idempotent and the network triggers it lazily.
pub trait InferenceEngine: std::fmt::Debug {
    /// Loads a prior variable's distribution, pairs in declared state order.
    fn load_prior(&mut self, id: &str, distribution: &[(String, f64)]) -> Result<()>;

    /// Loads a conditional variable's distribution. Every id in
    /// `parent_ids` must already be loaded.
    fn load_conditional(
        &mut self,
        id: &str,
        states: &[String],
        parent_ids: &[String],
        rows: &[LongFormatRow],
    ) -> Result<()>;

    /// One-time compile step; repeated calls are no-ops.
    fn finalize(&mut self) -> Result<()>;

    /// Marginal distributions for every non-evidence variable, in load
    /// order, each vector in the variable's declared state order.
    fn query(&self, evidence: &[(String, String)]) -> Result<Vec<(String, Vec<f64>)>>;

    /// Draws joint samples; each row holds one state label per loaded
    /// variable, in load order.
    fn generate(&mut self, count: usize) -> Result<Vec<Vec<String>>>;

    /// Maximum-likelihood tables estimated from observed rows, keyed by
    /// variable id, each a row-major flat list matching the variable's
    /// CPT shape.
    fn fit(&mut self, columns: &[String], rows: &[Vec<String>]) -> Result<HashMap<String, Vec<f64>>>;
}
