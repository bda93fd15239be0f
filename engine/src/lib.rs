use crate::model::GenerativeModel;

pub mod flows;
pub mod model;
pub mod params;
pub mod role;
pub mod router;
pub mod session;
pub mod templates;
pub mod tools;

pub use flows::{FlowError, Flows};
pub use session::Session;

pub type ModelBox = Box<dyn GenerativeModel + Send + Sync>;

/// Upper bound on model-triggered lookups during a single refinement.
pub const MAX_TOOL_ROUNDS: usize = 4;
