//! Component registry
//!
//! Maps component type identifiers to factories and declared input/output
//! schemas. The catalog is a closed set registered once at startup; lookups
//! are read-only afterwards and safe to share across tasks behind an `Arc`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::error::EngineError;

/// Failure from an integration collaborator behind the invoke contract.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invocation timed out after {0}ms")]
    Timeout(u64),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Uniform invocation contract for every component.
///
/// The executor hands a fully resolved configuration (no placeholders left)
/// and receives the component's outputs keyed by its declared output names.
#[async_trait]
pub trait Component: Send + Sync {
    async fn invoke(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError>;
}

/// Declared type of an input parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

/// Schema for one input parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// How the executor bounds an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    /// Pure in-process work, runs with no timeout.
    Pure,
    /// Network call, bounded by the executor's I/O timeout.
    Network,
    /// Blocks until an inbound event arrives; bounds itself via its own
    /// `timeout` parameter, so the executor leaves it unbounded.
    Subscribe,
}

/// Declared schema of a component type: its input parameters, the output
/// keys it guarantees to produce on success, and its invocation kind.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub type_id: String,
    pub inputs: Vec<ParamSpec>,
    pub outputs: Vec<String>,
    pub kind: InvocationKind,
}

impl ComponentSpec {
    pub fn new(
        type_id: impl Into<String>,
        inputs: Vec<ParamSpec>,
        outputs: Vec<&str>,
        kind: InvocationKind,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            inputs,
            outputs: outputs.into_iter().map(String::from).collect(),
            kind,
        }
    }
}

type Factory = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

struct Entry {
    spec: ComponentSpec,
    factory: Factory,
}

/// Registry of component types, populated once at startup.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: HashMap<String, Entry>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type with its schema and factory.
    pub fn register<F>(&mut self, spec: ComponentSpec, factory: F)
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.entries.insert(
            spec.type_id.clone(),
            Entry {
                spec,
                factory: Arc::new(factory),
            },
        );
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.entries.contains_key(type_id)
    }

    pub fn spec(&self, type_id: &str) -> Option<&ComponentSpec> {
        self.entries.get(type_id).map(|e| &e.spec)
    }

    pub fn type_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort();
        ids
    }

    /// Instantiate a component after validating the configuration against
    /// the declared schema.
    pub fn create(
        &self,
        type_id: &str,
        config: &HashMap<String, String>,
    ) -> Result<Box<dyn Component>, EngineError> {
        let entry = self
            .entries
            .get(type_id)
            .ok_or_else(|| EngineError::UnknownComponentType(type_id.to_string()))?;

        validate_config(&entry.spec, config)?;
        Ok((entry.factory)())
    }
}

/// Check required parameters and literal value kinds.
///
/// Values still carrying a `{{key}}` placeholder are exempt from kind checks:
/// their shape is only known after resolution at execution time, and their
/// references are validated structurally by the graph builder.
pub fn validate_config(
    spec: &ComponentSpec,
    config: &HashMap<String, String>,
) -> Result<(), EngineError> {
    for param in &spec.inputs {
        let value = match config.get(&param.name) {
            Some(v) => v,
            None if param.required => {
                return Err(EngineError::InvalidConfig {
                    type_id: spec.type_id.clone(),
                    reason: format!("missing required parameter '{}'", param.name),
                });
            }
            None => continue,
        };

        if crate::workflow::contains_placeholder(value) {
            continue;
        }

        let ok = match param.kind {
            ParamKind::String => true,
            ParamKind::Number => value.parse::<f64>().is_ok(),
            ParamKind::Boolean => matches!(value.as_str(), "true" | "false"),
        };
        if !ok {
            return Err(EngineError::InvalidConfig {
                type_id: spec.type_id.clone(),
                reason: format!(
                    "parameter '{}' expects a {:?}, got '{}'",
                    param.name, param.kind, value
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Component for Echo {
        async fn invoke(
            &self,
            config: &HashMap<String, String>,
        ) -> Result<HashMap<String, String>, IntegrationError> {
            let mut outputs = HashMap::new();
            outputs.insert(
                "echo".to_string(),
                config.get("input").cloned().unwrap_or_default(),
            );
            Ok(outputs)
        }
    }

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register(
            ComponentSpec::new(
                "test.echo",
                vec![
                    ParamSpec::required("input", ParamKind::String),
                    ParamSpec::optional("repeat", ParamKind::Number),
                ],
                vec!["echo"],
                InvocationKind::Pure,
            ),
            || Box::new(Echo),
        );
        registry
    }

    #[test]
    fn test_unknown_component_type() {
        let registry = registry();
        let Err(err) = registry.create("test.nope", &HashMap::new()) else {
            panic!("expected an error for an unregistered type");
        };
        assert!(matches!(err, EngineError::UnknownComponentType(t) if t == "test.nope"));
    }

    #[test]
    fn test_missing_required_parameter() {
        let registry = registry();
        let Err(err) = registry.create("test.echo", &HashMap::new()) else {
            panic!("expected a missing-parameter error");
        };
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn test_kind_mismatch() {
        let registry = registry();
        let mut config = HashMap::new();
        config.insert("input".to_string(), "hello".to_string());
        config.insert("repeat".to_string(), "not-a-number".to_string());

        let Err(err) = registry.create("test.echo", &config) else {
            panic!("expected a kind-mismatch error");
        };
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn test_placeholder_values_skip_kind_check() {
        let registry = registry();
        let mut config = HashMap::new();
        config.insert("input".to_string(), "hello".to_string());
        config.insert("repeat".to_string(), "{{count}}".to_string());

        assert!(registry.create("test.echo", &config).is_ok());
    }

    #[tokio::test]
    async fn test_create_and_invoke() {
        let registry = registry();
        let mut config = HashMap::new();
        config.insert("input".to_string(), "hello".to_string());

        let component = registry.create("test.echo", &config).unwrap();
        let outputs = component.invoke(&config).await.unwrap();
        assert_eq!(outputs["echo"], "hello");
    }

    #[test]
    fn test_type_ids_sorted() {
        let registry = registry();
        assert_eq!(registry.type_ids(), vec!["test.echo"]);
    }
}
