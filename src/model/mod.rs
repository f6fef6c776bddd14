pub mod error;
pub mod identifier;
pub mod network;
pub mod table;
pub mod variable;

// Re-export key types
pub use error::{BnError, Result};
pub use network::{DataTable, Evidence, Group, Marginals, Network, NetworkRecord};
pub use table::{LongFormatRow, ProbabilityTable};
pub use variable::{StateSpec, TableSpec, Variable, VariableRecord};
