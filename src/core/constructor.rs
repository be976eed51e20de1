use crate::core::schema::RecipeSchema;
use crate::domain::model::{RecipeKey, ResourceId};
use crate::domain::ports::Recipe;
use crate::utils::error::{RecipeError, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Fills a freshly initialised recipe from constructor arguments.
///
/// Receives the constructor's keys and exactly one argument per key.
pub type ValueFactory =
    Arc<dyn Fn(&mut dyn Recipe, &[Arc<RecipeKey>], Vec<Value>) -> Result<()> + Send + Sync>;

/// 預設策略：依序將參數指派給對應欄位
pub fn positional_factory() -> ValueFactory {
    Arc::new(|recipe: &mut dyn Recipe, keys: &[Arc<RecipeKey>], args: Vec<Value>| {
        for (key, value) in keys.iter().zip(args) {
            recipe.set_value(key, value)?;
        }
        Ok(())
    })
}

pub(crate) fn describe_keys(keys: &[Arc<RecipeKey>]) -> String {
    keys.iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone)]
pub struct RecipeConstructor {
    keys: Vec<Arc<RecipeKey>>,
    factory: ValueFactory,
    explicit: bool,
}

impl RecipeConstructor {
    pub(crate) fn new(keys: Vec<Arc<RecipeKey>>, factory: ValueFactory, explicit: bool) -> Self {
        Self {
            keys,
            factory,
            explicit,
        }
    }

    pub fn arity(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> &[Arc<RecipeKey>] {
        &self.keys
    }

    /// Registered by the schema author rather than synthesized.
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Build a new (unsaved) recipe from `args`.
    pub fn create(
        &self,
        schema: &RecipeSchema,
        type_id: ResourceId,
        args: Vec<Value>,
    ) -> Result<Box<dyn Recipe>> {
        if args.len() != self.arity() {
            return Err(RecipeError::ArgumentCount {
                expected: self.arity(),
                actual: args.len(),
            });
        }

        let mut recipe = schema.new_recipe();
        {
            let header = recipe.header_mut();
            header.type_id = Some(type_id);
            header.id = None;
            header.json = Value::Object(Map::new());
            header.new_recipe = true;
        }

        recipe.init_values(schema)?;
        (self.factory)(recipe.as_mut(), &self.keys, args)?;
        recipe.set_all_changed(true);

        tracing::debug!(
            "Constructed {} recipe with {} arguments",
            schema.recipe_type(),
            self.arity()
        );
        Ok(recipe)
    }
}

impl fmt::Debug for RecipeConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeConstructor")
            .field("keys", &describe_keys(&self.keys))
            .field("explicit", &self.explicit)
            .finish()
    }
}
