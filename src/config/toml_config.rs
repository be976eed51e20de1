use crate::core::schema::RecipeSchema;
use crate::domain::model::{ComponentRole, RecipeComponent, ResourceId, RuntimeFlags, ValueKind};
use crate::utils::error::{RecipeError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    pub properties: Option<PropertiesConfig>,
    #[serde(default)]
    pub schemas: Vec<SchemaDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertiesConfig {
    pub debug_info: Option<bool>,
    pub development: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub r#type: String,
    pub description: Option<String>,
    #[serde(default)]
    pub keys: Vec<KeyDefinition>,
    /// 明確註冊的建構子，以欄位名稱列出
    pub constructors: Option<Vec<Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDefinition {
    pub name: String,
    pub role: ComponentRole,
    pub kind: Option<ValueKind>,
    pub optional: Option<bool>,
    pub default: Option<serde_json::Value>,
}

impl KeyDefinition {
    fn component(&self) -> RecipeComponent {
        let component = RecipeComponent::new(self.role, self.kind.unwrap_or_default());
        // 有預設值時隱含可省略，除非明確宣告 optional
        match (&self.default, self.optional.unwrap_or(self.default.is_some())) {
            (Some(default), true) => component.optional_with(default.clone()),
            (None, true) => component.optional(),
            (_, false) => component,
        }
    }
}

impl SchemaFile {
    /// 從 TOML 檔案載入 schema 定義
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RecipeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| RecipeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RECIPE_DEBUG})
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_unique_names(
            "schemas.type",
            self.schemas.iter().map(|s| s.r#type.as_str()),
        )?;

        for schema in &self.schemas {
            validation::validate_identifier("schemas.type", &schema.r#type)?;

            for key in &schema.keys {
                validation::validate_non_empty_string("schemas.keys.name", &key.name)?;
                if let (Some(default), Some(false)) = (&key.default, key.optional) {
                    return Err(RecipeError::InvalidConfigValueError {
                        field: format!("{}.{}.default", schema.r#type, key.name),
                        value: default.to_string(),
                        reason: "Required keys cannot declare a default".to_string(),
                    });
                }
                if let (Some(default), Some(kind)) = (&key.default, key.kind) {
                    if !kind.accepts(default) {
                        return Err(RecipeError::InvalidConfigValueError {
                            field: format!("{}.{}.default", schema.r#type, key.name),
                            value: default.to_string(),
                            reason: format!("Default does not match kind '{}'", kind),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    pub fn flags(&self) -> RuntimeFlags {
        let properties = self.properties.clone().unwrap_or_default();
        RuntimeFlags {
            debug_info: properties.debug_info.unwrap_or(false),
            development: properties.development.unwrap_or(false),
        }
    }

    /// Build every declared schema, with runtime flags merged from the file
    /// and `overrides`.
    pub fn build_schemas(
        &self,
        overrides: RuntimeFlags,
    ) -> Result<BTreeMap<ResourceId, RecipeSchema>> {
        self.validate_config()?;
        let flags = self.flags().merge(overrides);

        let mut schemas = BTreeMap::new();
        for definition in &self.schemas {
            let type_id = ResourceId::parse(&definition.r#type)?;
            let keys = definition
                .keys
                .iter()
                .map(|key| key.component().key(&key.name))
                .collect();

            let mut schema = RecipeSchema::new(keys)?.with_flags(flags);
            for names in definition.constructors.iter().flatten() {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                schema = schema.constructor_by_names(&names)?;
            }

            tracing::debug!(
                "Loaded schema {} with {} keys (min {} arguments)",
                type_id,
                schema.keys().len(),
                schema.min_required_arguments()
            );
            schemas.insert(type_id, schema);
        }

        tracing::info!("Loaded {} recipe schemas", schemas.len());
        Ok(schemas)
    }
}

impl Validate for SchemaFile {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
