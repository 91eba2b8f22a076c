use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod change;
pub mod item;
pub mod source;

// Re-exports for convenience
pub use change::*;
pub use item::*;
pub use source::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Increased,
    Decreased,
    Unchanged,
}

// Short identifier attached to each run's tracing span and summary
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
