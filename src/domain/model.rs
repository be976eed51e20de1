use crate::utils::error::{RecipeError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<namespace>[a-z0-9_.\-]+):(?P<path>[a-z0-9_.\-/]+)$")
        .expect("identifier regex")
});

/// 欄位在配方中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentRole {
    Input,
    Output,
    Other,
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentRole::Input => write!(f, "input"),
            ComponentRole::Output => write!(f, "output"),
            ComponentRole::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Any,
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueKind {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ValueKind::Any => true,
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }

    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Any => "any",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        write!(f, "{}", name)
    }
}

/// Describes how one recipe key is typed and whether it may be omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeComponent {
    role: ComponentRole,
    kind: ValueKind,
    optional: bool,
    default: Option<Value>,
}

impl RecipeComponent {
    pub fn new(role: ComponentRole, kind: ValueKind) -> Self {
        Self {
            role,
            kind,
            optional: false,
            default: None,
        }
    }

    pub fn input(kind: ValueKind) -> Self {
        Self::new(ComponentRole::Input, kind)
    }

    pub fn output(kind: ValueKind) -> Self {
        Self::new(ComponentRole::Output, kind)
    }

    pub fn other(kind: ValueKind) -> Self {
        Self::new(ComponentRole::Other, kind)
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// 可省略，且省略時使用預設值
    pub fn optional_with(mut self, default: Value) -> Self {
        self.optional = true;
        self.default = Some(default);
        self
    }

    pub fn role(&self) -> ComponentRole {
        self.role
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn key(self, name: impl Into<String>) -> Arc<RecipeKey> {
        Arc::new(RecipeKey::new(name, self))
    }
}

impl fmt::Display for RecipeComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.kind)?;
        if self.optional {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// A named slot in a recipe schema.
///
/// Keys are shared as `Arc<RecipeKey>` and compared by identity: two keys
/// built from identical parts are still different keys.
#[derive(Debug)]
pub struct RecipeKey {
    name: String,
    component: RecipeComponent,
}

impl RecipeKey {
    pub fn new(name: impl Into<String>, component: RecipeComponent) -> Self {
        Self {
            name: name.into(),
            component,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &RecipeComponent {
        &self.component
    }

    pub fn role(&self) -> ComponentRole {
        self.component.role
    }

    pub fn is_optional(&self) -> bool {
        self.component.optional
    }

    /// 檢查值的型別是否符合此欄位
    pub fn check(&self, value: &Value) -> Result<()> {
        if self.component.kind.accepts(value) {
            return Ok(());
        }

        Err(RecipeError::TypeMismatch {
            key: self.name.clone(),
            expected: self.component.kind.to_string(),
            actual: ValueKind::describe(value).to_string(),
        })
    }
}

impl fmt::Display for RecipeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.component)
    }
}

/// `namespace:path` identifier for recipe types and recipe ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    namespace: String,
    path: String,
}

impl ResourceId {
    pub fn parse(value: &str) -> Result<Self> {
        let caps = IDENTIFIER_RE
            .captures(value)
            .ok_or_else(|| RecipeError::InvalidIdentifier {
                value: value.to_string(),
                reason: "expected 'namespace:path' using [a-z0-9_.-] (and '/' in the path)"
                    .to_string(),
            })?;

        Ok(Self {
            namespace: caps["namespace"].to_string(),
            path: caps["path"].to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = RecipeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

/// Process-wide switches, read by schemas and never written by them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeFlags {
    /// 保留原始文件副本以便除錯
    pub debug_info: bool,
    pub development: bool,
}

impl RuntimeFlags {
    pub fn merge(self, other: RuntimeFlags) -> Self {
        Self {
            debug_info: self.debug_info || other.debug_info,
            development: self.development || other.development,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_component_display() {
        let c = RecipeComponent::input(ValueKind::String);
        assert_eq!(c.to_string(), "input:string");

        let c = RecipeComponent::other(ValueKind::Number).optional_with(json!(0.1));
        assert_eq!(c.to_string(), "other:number?");
        assert_eq!(c.default_value(), Some(&json!(0.1)));
    }

    #[test]
    fn test_keys_compare_by_identity() {
        let a = RecipeComponent::input(ValueKind::Any).key("item");
        let b = RecipeComponent::input(ValueKind::Any).key("item");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), b.name());
    }

    #[test]
    fn test_key_type_check() {
        let key = RecipeComponent::output(ValueKind::String).key("result");
        assert!(key.check(&json!("minecraft:stone")).is_ok());

        let err = key.check(&json!(3)).unwrap_err();
        assert!(matches!(
            err,
            RecipeError::TypeMismatch { ref expected, ref actual, .. }
                if expected == "string" && actual == "number"
        ));
    }

    #[test]
    fn test_resource_id_parse() {
        let id = ResourceId::parse("kubejs:smelting/iron").unwrap();
        assert_eq!(id.namespace(), "kubejs");
        assert_eq!(id.path(), "smelting/iron");
        assert_eq!(id.to_string(), "kubejs:smelting/iron");

        assert!(ResourceId::parse("no_namespace").is_err());
        assert!(ResourceId::parse(":path").is_err());
        assert!(ResourceId::parse("Upper:case").is_err());
    }

    #[test]
    fn test_resource_id_serde() {
        let id: ResourceId = serde_json::from_value(json!("minecraft:stone")).unwrap();
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("minecraft:stone"));
        assert!(serde_json::from_value::<ResourceId>(json!("bad")).is_err());
    }

    #[test]
    fn test_runtime_flags_merge() {
        let file = RuntimeFlags {
            debug_info: true,
            development: false,
        };
        let cli = RuntimeFlags {
            debug_info: false,
            development: true,
        };
        let merged = file.merge(cli);
        assert!(merged.debug_info && merged.development);
    }
}
