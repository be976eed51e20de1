pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::app::generic_recipe::GenericRecipe;
pub use crate::config::{cli::LocalDocuments, toml_config::SchemaFile};
pub use crate::core::{
    constructor::{positional_factory, RecipeConstructor, ValueFactory},
    schema::{RecipeFactory, RecipeSchema},
};
pub use domain::model::{ComponentRole, RecipeComponent, RecipeKey, ResourceId, RuntimeFlags, ValueKind};
pub use domain::ports::{DocumentSource, Recipe, RecipeHeader};
pub use utils::error::{RecipeError, Result};
