//! Model catalog types.
//!
//! The catalog itself is supplied by an external collaborator; this module
//! defines the records the engine reads from it and the fixed set of agent
//! roles every plan covers.

mod model;
mod role;

pub use model::*;
pub use role::*;

/// Look up a model by identifier.
pub fn find_model<'a>(catalog: &'a [Model], id: &str) -> Option<&'a Model> {
    catalog.iter().find(|m| m.id == id)
}

/// Whether the catalog contains a model with this identifier.
pub fn contains_model(catalog: &[Model], id: &str) -> bool {
    find_model(catalog, id).is_some()
}
