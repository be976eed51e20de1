pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::domain::model::RuntimeFlags;
#[cfg(feature = "cli")]
use crate::utils::error::{RecipeError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "recipe-schema")]
#[command(about = "Build recipes from TOML-declared schemas")]
pub struct CliConfig {
    #[arg(long, help = "TOML file declaring the recipe schemas")]
    pub schemas: String,

    #[arg(long = "type", help = "Recipe type id, e.g. minecraft:smelting")]
    pub recipe_type: String,

    #[arg(long, help = "Recipe id; omit to treat the recipe as new")]
    pub id: Option<String>,

    #[arg(long, help = "JSON document to deserialize")]
    pub input: Option<String>,

    #[arg(long, help = "JSON array of constructor arguments")]
    pub args: Option<String>,

    #[arg(long, help = "Keep a copy of the original document on loaded recipes")]
    pub debug_info: bool,

    #[arg(long, help = "Log generated constructors")]
    pub dev: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn flags(&self) -> RuntimeFlags {
        RuntimeFlags {
            debug_info: self.debug_info,
            development: self.dev,
        }
    }

    /// 解析 `--args` 成參數列表
    pub fn constructor_args(&self) -> Result<Option<Vec<serde_json::Value>>> {
        let Some(raw) = &self.args else {
            return Ok(None);
        };

        match serde_json::from_str::<serde_json::Value>(raw)? {
            serde_json::Value::Array(items) => Ok(Some(items)),
            _ => Err(RecipeError::InvalidConfigValueError {
                field: "args".to_string(),
                value: raw.clone(),
                reason: "Constructor arguments must be a JSON array".to_string(),
            }),
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("schemas", &self.schemas)?;
        validation::validate_identifier("type", &self.recipe_type)?;

        if let Some(id) = &self.id {
            validation::validate_identifier("id", id)?;
        }

        match (&self.input, &self.args) {
            (Some(input), None) => validation::validate_path("input", input),
            (None, Some(_)) => {
                if self.id.is_some() {
                    return Err(RecipeError::ConfigValidationError {
                        field: "id".to_string(),
                        message: "Constructed recipes are always new; drop --id".to_string(),
                    });
                }
                Ok(())
            }
            (Some(_), Some(_)) => Err(RecipeError::ConfigValidationError {
                field: "input".to_string(),
                message: "--input and --args are mutually exclusive".to_string(),
            }),
            (None, None) => {
                validation::validate_required_field("input", &self.input)?;
                Ok(())
            }
        }
    }
}
