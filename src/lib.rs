pub mod codec;
pub mod inference;
pub mod model;

pub use codec::CmpxReadOptions;
pub use inference::{EnumerationEngine, InferenceEngine};
pub use model::error::{BnError, Result};
pub use model::network::{DataTable, Evidence, Group, Marginals, Network};
pub use model::table::ProbabilityTable;
pub use model::variable::{StateSpec, TableSpec, Variable};
