//! Domain model (IDs, execution state, exception records, errors).

pub mod errors;
pub mod exception;
pub mod ids;
pub mod input;
pub mod state;

pub use errors::{BobbinError, MismatchedExecutionError, TaskFailure};
pub use exception::TaskException;
pub use ids::{ExecutionId, WorkerId};
pub use input::TaskInput;
pub use state::ExecutionState;
