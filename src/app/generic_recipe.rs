use crate::core::schema::RecipeSchema;
use crate::domain::model::{RecipeKey, ValueKind};
use crate::domain::ports::{Recipe, RecipeHeader};
use crate::utils::error::{RecipeError, Result};
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct ValueCell {
    key: Arc<RecipeKey>,
    value: Option<Value>,
    changed: bool,
}

/// Recipe object that keeps one JSON value per schema key.
#[derive(Debug, Clone, Default)]
pub struct GenericRecipe {
    header: RecipeHeader,
    values: Vec<ValueCell>,
}

impl GenericRecipe {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.cell(name).and_then(|cell| cell.value.as_ref())
    }

    pub fn is_value_changed(&self, name: &str) -> bool {
        self.cell(name).is_some_and(|cell| cell.changed)
    }

    /// 目前所有有值的欄位，依 schema 順序
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .filter_map(|cell| cell.value.as_ref().map(|v| (cell.key.name(), v)))
    }

    /// Write changed values back into the working document and return it.
    pub fn serialize(&mut self) -> Result<&Value> {
        let id = self.header.display_id();
        let json = self
            .header
            .json
            .as_object_mut()
            .ok_or_else(|| RecipeError::InvalidDocument {
                message: format!("recipe {} is not backed by an object", id),
            })?;

        for cell in &self.values {
            if !cell.changed {
                continue;
            }
            match &cell.value {
                Some(value) => {
                    json.insert(cell.key.name().to_string(), value.clone());
                }
                None => {
                    json.remove(cell.key.name());
                }
            }
        }

        Ok(&self.header.json)
    }

    fn cell(&self, name: &str) -> Option<&ValueCell> {
        self.values.iter().find(|cell| cell.key.name() == name)
    }
}

impl Recipe for GenericRecipe {
    fn header(&self) -> &RecipeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecipeHeader {
        &mut self.header
    }

    fn init_values(&mut self, schema: &RecipeSchema) -> Result<()> {
        self.values = schema
            .keys()
            .iter()
            .map(|key| ValueCell {
                key: key.clone(),
                value: key.component().default_value().cloned(),
                changed: false,
            })
            .collect();
        Ok(())
    }

    fn set_value(&mut self, key: &RecipeKey, value: Value) -> Result<()> {
        key.check(&value)?;

        let cell = self
            .values
            .iter_mut()
            .find(|cell| cell.key.name() == key.name())
            .ok_or_else(|| RecipeError::UnknownKey {
                key: key.name().to_string(),
            })?;
        cell.value = Some(value);
        cell.changed = true;
        Ok(())
    }

    fn deserialize(&mut self) -> Result<()> {
        let json: &Map<String, Value> =
            self.header
                .json
                .as_object()
                .ok_or_else(|| RecipeError::InvalidDocument {
                    message: format!(
                        "expected an object for recipe {}, got {}",
                        self.header.display_id(),
                        ValueKind::describe(&self.header.json)
                    ),
                })?;

        for cell in &mut self.values {
            match json.get(cell.key.name()) {
                Some(value) => {
                    cell.key.check(value)?;
                    cell.value = Some(value.clone());
                }
                None if cell.key.is_optional() => {}
                None => {
                    return Err(RecipeError::MissingValue {
                        key: cell.key.name().to_string(),
                        recipe: self.header.display_id(),
                    });
                }
            }
        }

        tracing::debug!(
            "Deserialized recipe {} ({} keys)",
            self.header.display_id(),
            self.values.len()
        );
        Ok(())
    }

    fn set_all_changed(&mut self, changed: bool) {
        self.header.changed = changed;
        for cell in &mut self.values {
            cell.changed = changed;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
