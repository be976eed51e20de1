pub mod constructor;
pub mod schema;

pub use crate::domain::model::{ComponentRole, RecipeComponent, RecipeKey, ResourceId, RuntimeFlags, ValueKind};
pub use crate::domain::ports::{DocumentSource, Recipe, RecipeHeader};
pub use crate::utils::error::Result;
