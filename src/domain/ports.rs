use crate::core::schema::RecipeSchema;
use crate::domain::model::{RecipeKey, ResourceId};
use crate::utils::error::Result;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;

/// Bookkeeping every recipe object carries, stamped by the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeHeader {
    pub type_id: Option<ResourceId>,
    /// `None` 代表尚未儲存的新配方
    pub id: Option<ResourceId>,
    pub json: Value,
    pub original_json: Option<Value>,
    pub new_recipe: bool,
    pub changed: bool,
}

impl Default for RecipeHeader {
    fn default() -> Self {
        Self {
            type_id: None,
            id: None,
            json: Value::Object(Map::new()),
            original_json: None,
            new_recipe: false,
            changed: false,
        }
    }
}

impl RecipeHeader {
    /// Identity for error messages.
    pub fn display_id(&self) -> String {
        match &self.id {
            Some(id) => id.to_string(),
            None => "<new>".to_string(),
        }
    }
}

/// The domain object a schema builds.
///
/// The schema owns allocation and header stamping; the object owns how
/// values are stored and how they are read out of the raw document.
pub trait Recipe: fmt::Debug + Send + Sync {
    fn header(&self) -> &RecipeHeader;

    fn header_mut(&mut self) -> &mut RecipeHeader;

    /// Prepare value storage for every key the schema declares.
    fn init_values(&mut self, schema: &RecipeSchema) -> Result<()>;

    fn set_value(&mut self, key: &RecipeKey, value: Value) -> Result<()>;

    /// Populate values from `header().json`.
    fn deserialize(&mut self) -> Result<()>;

    fn set_all_changed(&mut self, changed: bool) {
        self.header_mut().changed = changed;
    }

    fn as_any(&self) -> &dyn Any;
}

/// 讀取原始配方文件的來源
pub trait DocumentSource {
    fn read_document(&self, path: &str) -> Result<Value>;
}
