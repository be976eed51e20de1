use crate::app::generic_recipe::GenericRecipe;
use crate::core::constructor::{
    describe_keys, positional_factory, RecipeConstructor, ValueFactory,
};
use crate::domain::model::{ComponentRole, RecipeKey, ResourceId, RuntimeFlags};
use crate::domain::ports::Recipe;
use crate::utils::error::{RecipeError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Allocates a blank recipe object.
pub type RecipeFactory = Arc<dyn Fn() -> Box<dyn Recipe> + Send + Sync>;

static NO_CONSTRUCTORS: BTreeMap<usize, RecipeConstructor> = BTreeMap::new();

/// Ordered, validated set of recipe keys plus the constructors derived from it.
///
/// Required keys always precede optional ones, so every constructor takes a
/// prefix of the keys: from `min_required_arguments()` up to all of them.
pub struct RecipeSchema {
    recipe_type: &'static str,
    factory: RecipeFactory,
    keys: Vec<Arc<RecipeKey>>,
    input_keys: Vec<usize>,
    output_keys: Vec<usize>,
    min_required_arguments: usize,
    flags: RuntimeFlags,
    registered: BTreeMap<usize, RecipeConstructor>,
    constructors: OnceLock<BTreeMap<usize, RecipeConstructor>>,
}

impl RecipeSchema {
    /// Schema building [`GenericRecipe`] objects.
    pub fn new(keys: Vec<Arc<RecipeKey>>) -> Result<Self> {
        Self::of::<GenericRecipe>(keys)
    }

    pub fn of<R>(keys: Vec<Arc<RecipeKey>>) -> Result<Self>
    where
        R: Recipe + Default + 'static,
    {
        Self::with_factory(
            std::any::type_name::<R>(),
            Arc::new(|| Box::new(R::default()) as Box<dyn Recipe>),
            keys,
        )
    }

    pub fn with_factory(
        recipe_type: &'static str,
        factory: RecipeFactory,
        keys: Vec<Arc<RecipeKey>>,
    ) -> Result<Self> {
        let mut min_required: Option<usize> = None;
        let mut input_keys = Vec::with_capacity(keys.len() / 2);
        let mut output_keys = Vec::with_capacity(keys.len() / 2);
        let mut names = HashSet::with_capacity(keys.len());

        for (i, key) in keys.iter().enumerate() {
            if key.is_optional() {
                if min_required.is_none() {
                    min_required = Some(i);
                }
            } else if min_required.is_some() {
                return Err(RecipeError::OrderingViolation {
                    key: key.name().to_string(),
                });
            }

            if !names.insert(key.name()) {
                return Err(RecipeError::DuplicateKey {
                    key: key.name().to_string(),
                });
            }

            match key.role() {
                ComponentRole::Input => input_keys.push(i),
                ComponentRole::Output => output_keys.push(i),
                ComponentRole::Other => {}
            }
        }

        let min_required_arguments = min_required.unwrap_or(keys.len());

        Ok(Self {
            recipe_type,
            factory,
            keys,
            input_keys,
            output_keys,
            min_required_arguments,
            flags: RuntimeFlags::default(),
            registered: BTreeMap::new(),
            constructors: OnceLock::new(),
        })
    }

    pub fn with_flags(mut self, flags: RuntimeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Register a constructor for exactly `keys`, filled in by `factory`.
    ///
    /// Keys must belong to this schema. Fails if the arity is already taken,
    /// whether by an earlier registration or an already generated table.
    pub fn constructor_with(
        mut self,
        factory: ValueFactory,
        keys: &[Arc<RecipeKey>],
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(keys.len());
        for key in keys {
            if !self.keys.iter().any(|own| Arc::ptr_eq(own, key)) {
                return Err(RecipeError::UnknownKey {
                    key: key.name().to_string(),
                });
            }
            if !seen.insert(key.name()) {
                return Err(RecipeError::DuplicateKey {
                    key: key.name().to_string(),
                });
            }
        }

        let arity = keys.len();
        if arity < self.min_required_arguments {
            return Err(RecipeError::ArityNotSupported {
                actual: arity,
                supported: (self.min_required_arguments..=self.keys.len()).collect(),
            });
        }

        let materialized = self
            .constructors
            .get()
            .is_some_and(|table| table.contains_key(&arity));
        if materialized || self.registered.contains_key(&arity) {
            return Err(RecipeError::DuplicateArity { arity });
        }

        let constructor = RecipeConstructor::new(keys.to_vec(), factory, true);
        self.registered.insert(arity, constructor);

        tracing::debug!(
            "Registered constructor for {} with {} arguments",
            self.recipe_type,
            arity
        );
        Ok(self)
    }

    pub fn constructor(self, keys: &[Arc<RecipeKey>]) -> Result<Self> {
        self.constructor_with(positional_factory(), keys)
    }

    /// Same as [`constructor`](Self::constructor), naming keys instead of passing them.
    pub fn constructor_by_names(self, names: &[&str]) -> Result<Self> {
        let keys = names
            .iter()
            .map(|name| {
                self.key(name).cloned().ok_or_else(|| RecipeError::UnknownKey {
                    key: name.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.constructor(&keys)
    }

    /// Constructors keyed by arity, generated on first call.
    ///
    /// Every arity in `min_required_arguments()..=keys().len()` is present;
    /// explicitly registered constructors take precedence over generated ones.
    pub fn constructors(&self) -> &BTreeMap<usize, RecipeConstructor> {
        if self.keys.is_empty() {
            return &NO_CONSTRUCTORS;
        }
        self.constructors.get_or_init(|| self.generate_constructors())
    }

    fn generate_constructors(&self) -> BTreeMap<usize, RecipeConstructor> {
        let mut table = BTreeMap::new();
        let dev = self.flags.development;
        if dev {
            tracing::info!("Generating constructors for [{}]", describe_keys(&self.keys));
        }

        for arity in self.min_required_arguments..=self.keys.len() {
            let constructor = match self.registered.get(&arity) {
                Some(explicit) => explicit.clone(),
                None => RecipeConstructor::new(
                    self.keys[..arity].to_vec(),
                    positional_factory(),
                    false,
                ),
            };

            if dev {
                tracing::info!("> {}: [{}]", arity, describe_keys(constructor.keys()));
            }
            table.insert(arity, constructor);
        }

        table
    }

    /// Build a new recipe, picking the constructor by argument count.
    pub fn construct(&self, type_id: ResourceId, args: Vec<Value>) -> Result<Box<dyn Recipe>> {
        let constructors = self.constructors();
        let constructor =
            constructors
                .get(&args.len())
                .ok_or_else(|| RecipeError::ArityNotSupported {
                    actual: args.len(),
                    supported: constructors.keys().copied().collect(),
                })?;
        constructor.create(self, type_id, args)
    }

    /// Load a recipe from its raw JSON document.
    ///
    /// A missing `id` marks the recipe as new, and new recipes start out changed.
    /// Errors from the recipe's own hooks are returned unchanged.
    pub fn deserialize(
        &self,
        type_id: ResourceId,
        id: Option<ResourceId>,
        json: Value,
    ) -> Result<Box<dyn Recipe>> {
        let new_recipe = id.is_none();
        let mut recipe = self.new_recipe();
        {
            let header = recipe.header_mut();
            header.type_id = Some(type_id);
            header.id = id;
            header.json = json;
            header.new_recipe = new_recipe;
        }

        recipe.init_values(self)?;

        if !new_recipe && self.flags.debug_info {
            let snapshot = recipe.header().json.clone();
            recipe.header_mut().original_json = Some(snapshot);
        }

        recipe.deserialize()?;
        recipe.set_all_changed(new_recipe);
        Ok(recipe)
    }

    pub fn new_recipe(&self) -> Box<dyn Recipe> {
        (self.factory)()
    }

    pub fn recipe_type(&self) -> &'static str {
        self.recipe_type
    }

    pub fn keys(&self) -> &[Arc<RecipeKey>] {
        &self.keys
    }

    pub fn key(&self, name: &str) -> Option<&Arc<RecipeKey>> {
        self.keys.iter().find(|key| key.name() == name)
    }

    pub fn input_keys(&self) -> &[usize] {
        &self.input_keys
    }

    pub fn output_keys(&self) -> &[usize] {
        &self.output_keys
    }

    pub fn min_required_arguments(&self) -> usize {
        self.min_required_arguments
    }

    pub fn flags(&self) -> RuntimeFlags {
        self.flags
    }
}

impl fmt::Debug for RecipeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeSchema")
            .field("recipe_type", &self.recipe_type)
            .field("keys", &describe_keys(&self.keys))
            .field("min_required_arguments", &self.min_required_arguments)
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{RecipeComponent, ValueKind};
    use serde_json::json;
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .map_err(|_| io::Error::other("log buffer lock poisoned"))?
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_logs(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::with_default(subscriber, f);

        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn keys_abc() -> Vec<Arc<RecipeKey>> {
        vec![
            RecipeComponent::input(ValueKind::Any).key("a"),
            RecipeComponent::output(ValueKind::Any).key("b"),
            RecipeComponent::input(ValueKind::Any).optional().key("c"),
        ]
    }

    fn type_id() -> ResourceId {
        ResourceId::parse("kubejs:test").unwrap()
    }

    #[test]
    fn test_partitions_and_min_required() {
        let schema = RecipeSchema::new(keys_abc()).unwrap();
        assert_eq!(schema.min_required_arguments(), 2);
        assert_eq!(schema.input_keys(), &[0, 2]);
        assert_eq!(schema.output_keys(), &[1]);

        let arities: Vec<usize> = schema.constructors().keys().copied().collect();
        assert_eq!(arities, vec![2, 3]);
        assert!(schema.constructors().values().all(|c| !c.is_explicit()));
    }

    #[test]
    fn test_all_required_keys() {
        let schema = RecipeSchema::new(vec![
            RecipeComponent::output(ValueKind::String).key("result"),
            RecipeComponent::input(ValueKind::String).key("ingredient"),
            RecipeComponent::other(ValueKind::Number).key("time"),
        ])
        .unwrap();
        assert_eq!(schema.min_required_arguments(), 3);
        assert_eq!(schema.constructors().len(), 1);
        assert!(schema.constructors().contains_key(&3));
    }

    #[test]
    fn test_required_after_optional_fails() {
        let result = RecipeSchema::new(vec![
            RecipeComponent::input(ValueKind::Any).key("a"),
            RecipeComponent::input(ValueKind::Any).optional().key("b"),
            RecipeComponent::input(ValueKind::Any).key("c"),
        ]);
        assert!(matches!(
            result,
            Err(RecipeError::OrderingViolation { ref key }) if key == "c"
        ));
    }

    #[test]
    fn test_first_key_optional() {
        let schema = RecipeSchema::new(vec![
            RecipeComponent::input(ValueKind::Any).optional().key("a"),
            RecipeComponent::input(ValueKind::Any).optional().key("b"),
        ])
        .unwrap();
        assert_eq!(schema.min_required_arguments(), 0);
        let arities: Vec<usize> = schema.constructors().keys().copied().collect();
        assert_eq!(arities, vec![0, 1, 2]);

        let result = RecipeSchema::new(vec![
            RecipeComponent::input(ValueKind::Any).optional().key("a"),
            RecipeComponent::input(ValueKind::Any).key("b"),
        ]);
        assert!(matches!(result, Err(RecipeError::OrderingViolation { .. })));
    }

    #[test]
    fn test_duplicate_names_fail() {
        let result = RecipeSchema::new(vec![
            RecipeComponent::input(ValueKind::Any).key("a"),
            RecipeComponent::output(ValueKind::Any).key("b"),
            RecipeComponent::other(ValueKind::Any).key("a"),
        ]);
        assert!(matches!(
            result,
            Err(RecipeError::DuplicateKey { ref key }) if key == "a"
        ));
    }

    #[test]
    fn test_empty_schema() {
        let schema = RecipeSchema::new(Vec::new()).unwrap();
        assert_eq!(schema.min_required_arguments(), 0);
        assert!(schema.constructors().is_empty());
        assert!(schema.input_keys().is_empty());
    }

    #[test]
    fn test_explicit_constructor_wins() {
        let keys = keys_abc();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let factory: ValueFactory = Arc::new(
            move |recipe: &mut dyn Recipe, keys: &[Arc<RecipeKey>], args: Vec<Value>| {
                counter.fetch_add(1, Ordering::SeqCst);
                for (key, value) in keys.iter().zip(args) {
                    recipe.set_value(key, value)?;
                }
                Ok(())
            },
        );

        let schema = RecipeSchema::new(keys.clone())
            .unwrap()
            .constructor_with(factory, &keys[..2])
            .unwrap();

        let table = schema.constructors();
        assert_eq!(table.len(), 2);
        assert!(table[&2].is_explicit());
        assert!(!table[&3].is_explicit());

        schema
            .construct(type_id(), vec![json!("x"), json!("y")])
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        schema
            .construct(type_id(), vec![json!("x"), json!("y"), json!("z")])
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_arity_fails() {
        let keys = keys_abc();
        let result = RecipeSchema::new(keys.clone())
            .unwrap()
            .constructor(&keys[..2])
            .unwrap()
            .constructor(&[keys[1].clone(), keys[0].clone()]);
        assert!(matches!(
            result,
            Err(RecipeError::DuplicateArity { arity: 2 })
        ));
    }

    #[test]
    fn test_register_after_generation_conflicts() {
        let keys = keys_abc();
        let schema = RecipeSchema::new(keys.clone()).unwrap();
        assert_eq!(schema.constructors().len(), 2);

        let result = schema.constructor(&keys);
        assert!(matches!(
            result,
            Err(RecipeError::DuplicateArity { arity: 3 })
        ));

        // 已產生的表格不接受任何新的建構子，包括換了順序的
        let schema = RecipeSchema::new(keys.clone()).unwrap();
        schema.constructors();
        let result = schema.constructor(&[keys[1].clone(), keys[0].clone()]);
        assert!(matches!(
            result,
            Err(RecipeError::DuplicateArity { arity: 2 })
        ));
    }

    #[test]
    fn test_foreign_key_rejected() {
        let keys = keys_abc();
        let lookalike = RecipeComponent::input(ValueKind::Any).key("a");
        let result = RecipeSchema::new(keys.clone())
            .unwrap()
            .constructor(&[lookalike, keys[1].clone()]);
        assert!(matches!(
            result,
            Err(RecipeError::UnknownKey { ref key }) if key == "a"
        ));
    }

    #[test]
    fn test_arity_below_minimum_rejected() {
        let keys = keys_abc();
        let result = RecipeSchema::new(keys.clone())
            .unwrap()
            .constructor(&keys[..1]);
        assert!(matches!(
            result,
            Err(RecipeError::ArityNotSupported { actual: 1, .. })
        ));
    }

    #[test]
    fn test_constructor_by_names() {
        let schema = RecipeSchema::new(keys_abc())
            .unwrap()
            .constructor_by_names(&["b", "a"])
            .unwrap();
        let names: Vec<&str> = schema.constructors()[&2]
            .keys()
            .iter()
            .map(|key| key.name())
            .collect();
        assert_eq!(names, vec!["b", "a"]);

        let result = RecipeSchema::new(keys_abc())
            .unwrap()
            .constructor_by_names(&["a", "missing"]);
        assert!(matches!(result, Err(RecipeError::UnknownKey { .. })));
    }

    #[test]
    fn test_constructors_memoized() {
        let schema = RecipeSchema::new(keys_abc()).unwrap();
        let first = schema.constructors();
        let second = schema.constructors();
        assert!(std::ptr::eq(first, second));
        assert!(Arc::ptr_eq(&first[&3].keys()[0], &schema.keys()[0]));
    }

    #[test]
    fn test_concurrent_generation_yields_one_table() {
        let schema = RecipeSchema::new(keys_abc()).unwrap();
        let addresses: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| schema.constructors() as *const _ as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_construct_unknown_arity() {
        let schema = RecipeSchema::new(keys_abc()).unwrap();
        let err = schema.construct(type_id(), vec![json!(1)]).unwrap_err();
        assert!(matches!(
            err,
            RecipeError::ArityNotSupported { actual: 1, ref supported } if supported == &vec![2, 3]
        ));
    }

    #[test]
    fn test_deserialize_flags() {
        let schema = RecipeSchema::new(keys_abc()).unwrap();
        let doc = json!({"a": 1, "b": 2});

        let fresh = schema.deserialize(type_id(), None, doc.clone()).unwrap();
        assert!(fresh.header().new_recipe);
        assert!(fresh.header().changed);

        let id = ResourceId::parse("kubejs:existing").unwrap();
        let loaded = schema.deserialize(type_id(), Some(id), doc).unwrap();
        assert!(!loaded.header().new_recipe);
        assert!(!loaded.header().changed);
        assert!(loaded.header().original_json.is_none());
    }

    #[test]
    fn test_debug_info_snapshot() {
        let schema = RecipeSchema::new(keys_abc())
            .unwrap()
            .with_flags(RuntimeFlags {
                debug_info: true,
                development: false,
            });
        let doc = json!({"a": 1, "b": 2});

        let fresh = schema.deserialize(type_id(), None, doc.clone()).unwrap();
        assert!(fresh.header().original_json.is_none());

        let id = ResourceId::parse("kubejs:existing").unwrap();
        let mut loaded = schema.deserialize(type_id(), Some(id), doc.clone()).unwrap();
        loaded.header_mut().json["a"] = json!(99);
        assert_eq!(loaded.header().original_json.as_ref(), Some(&doc));
    }

    #[test]
    fn test_development_mode_logs_generated_constructors() {
        let schema = RecipeSchema::new(keys_abc())
            .unwrap()
            .with_flags(RuntimeFlags {
                debug_info: false,
                development: true,
            });

        let logs = capture_logs(|| {
            schema.constructors();
        });
        assert!(logs.contains("Generating constructors for [a:input:any, b:output:any, c:input:any?]"));
        assert!(logs.contains("> 2: [a:input:any, b:output:any]"));
        assert!(logs.contains("> 3: [a:input:any, b:output:any, c:input:any?]"));

        // 第二次呼叫直接使用快取，不再產生
        let logs = capture_logs(|| {
            schema.constructors();
        });
        assert!(!logs.contains("Generating constructors"));
    }

    #[test]
    fn test_constructor_logs_silent_outside_development() {
        let schema = RecipeSchema::new(keys_abc()).unwrap();
        let logs = capture_logs(|| {
            assert_eq!(schema.constructors().len(), 2);
        });
        assert!(!logs.contains("Generating constructors"));
        assert!(!logs.contains("> 2:"));
    }
}
