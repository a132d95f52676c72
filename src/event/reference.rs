//! References to the object an event is about

use serde::{Deserialize, Serialize};

/// Kind reported for every subject this tool records events about
pub const NODE_KIND: &str = "Node";

/// Identifies the entity an event describes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    /// Derived from the name, so restarts report against the same subject.
    /// Not a globally unique identifier.
    pub uid: String,
}

impl ObjectReference {
    /// Build a reference to a node
    pub fn node(namespace: &str, name: &str) -> Self {
        Self {
            kind: NODE_KIND.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            uid: name.to_string(),
        }
    }
}
