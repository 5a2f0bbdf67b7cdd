// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type registry for polymorphic deserialization.
//!
//! Maps stable type identifiers to factories producing default instances of
//! concrete value and node types. The lifecycle is explicit: a registry is
//! built (built-ins plus any extension types), then either passed by
//! reference to readers or frozen as the process-wide instance with
//! [`initialize`]. A frozen registry is never written again, so it can be
//! read from any thread.

use crate::node::NodeKind;
use crate::serialization::SerializationInfo;
use crate::stream::StreamError;
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::OnceLock;

/// Factory producing a default value instance
pub type ValueFactory = fn() -> Box<dyn Value>;

/// Factory producing a default node kind instance
pub type NodeFactory = fn() -> Box<dyn NodeKind>;

static GLOBAL_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Identifier is not registered
    #[error("Unknown type identifier: {0}")]
    UnknownType(String),

    /// Identifier is registered for a different kind of object
    #[error("{type_id} is not a {expected} type")]
    KindMismatch {
        /// Identifier looked up
        type_id: String,
        /// Kind that was requested
        expected: &'static str,
    },

    /// The process-wide registry was already frozen
    #[error("Type registry already initialized")]
    AlreadyInitialized,
}

impl From<RegistryError> for StreamError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::UnknownType(type_id) => StreamError::UnknownType(type_id),
            other => StreamError::Malformed(other.to_string()),
        }
    }
}

/// Constructor stored for a type identifier
#[derive(Debug, Clone, Copy)]
pub enum Factory {
    /// Value type
    Value(ValueFactory),
    /// Node kind
    Node(NodeFactory),
}

/// A registered type
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    /// Identifier and current version
    pub info: SerializationInfo,
    /// Constructor
    pub factory: Factory,
}

/// Catalog of constructible types keyed by identifier
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: IndexMap<&'static str, Registration>,
}

fn default_value<V: Value + Default>() -> Box<dyn Value> {
    Box::new(V::default())
}

fn default_node<K: NodeKind + Default>() -> Box<dyn NodeKind> {
    Box::new(K::default())
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, registration: Registration) -> bool {
        let type_id = registration.info.type_id;
        if let Some(existing) = self.entries.get(type_id) {
            if existing.info.version != registration.info.version {
                tracing::warn!(
                    "Ignoring re-registration of {} (version {} already registered, got {})",
                    type_id,
                    existing.info.version,
                    registration.info.version
                );
            }
            return false;
        }
        tracing::debug!("Registered type {} v{}", type_id, registration.info.version);
        self.entries.insert(type_id, registration);
        true
    }

    /// Register a value type. Returns `false` if the identifier was already
    /// registered, in which case the first registration is kept.
    pub fn register_value(&mut self, info: SerializationInfo, factory: ValueFactory) -> bool {
        self.register(Registration {
            info,
            factory: Factory::Value(factory),
        })
    }

    /// Register a node kind. Same idempotence rule as [`Self::register_value`].
    pub fn register_node(&mut self, info: SerializationInfo, factory: NodeFactory) -> bool {
        self.register(Registration {
            info,
            factory: Factory::Node(factory),
        })
    }

    /// Register a value type constructed through `Default`
    pub fn register_value_type<V: Value + Default>(&mut self) -> bool {
        let info = *V::default().serialization_info();
        self.register_value(info, default_value::<V>)
    }

    /// Register a node kind constructed through `Default`
    pub fn register_node_type<K: NodeKind + Default>(&mut self) -> bool {
        let info = *K::default().serialization_info();
        self.register_node(info, default_node::<K>)
    }

    /// Look up a registration
    pub fn resolve(&self, type_id: &str) -> Result<&Registration, RegistryError> {
        self.entries
            .get(type_id)
            .ok_or_else(|| RegistryError::UnknownType(type_id.to_string()))
    }

    /// Whether an identifier is registered
    pub fn contains(&self, type_id: &str) -> bool {
        self.entries.contains_key(type_id)
    }

    /// Current version registered for an identifier
    pub fn info(&self, type_id: &str) -> Option<&SerializationInfo> {
        self.entries.get(type_id).map(|r| &r.info)
    }

    /// Construct a default value of the named type
    pub fn create_value(&self, type_id: &str) -> Result<Box<dyn Value>, RegistryError> {
        match self.resolve(type_id)?.factory {
            Factory::Value(factory) => Ok(factory()),
            Factory::Node(_) => Err(RegistryError::KindMismatch {
                type_id: type_id.to_string(),
                expected: "value",
            }),
        }
    }

    /// Construct a default node kind of the named type
    pub fn create_node(&self, type_id: &str) -> Result<Box<dyn NodeKind>, RegistryError> {
        match self.resolve(type_id)?.factory {
            Factory::Node(factory) => Ok(factory()),
            Factory::Value(_) => Err(RegistryError::KindMismatch {
                type_id: type_id.to_string(),
                expected: "node",
            }),
        }
    }

    /// Registered identifiers in registration order
    pub fn type_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Registered node kinds in registration order
    pub fn node_types(&self) -> impl Iterator<Item = &SerializationInfo> {
        self.entries
            .values()
            .filter(|r| matches!(r.factory, Factory::Node(_)))
            .map(|r| &r.info)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registry holding every built-in value and node type
pub fn builtin_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    crate::value::register_builtin_values(&mut registry);
    crate::nodes::register_builtin_nodes(&mut registry);
    registry
}

/// Freeze `registry` as the process-wide instance.
///
/// Must run before the first deserialization that relies on [`global`].
/// Fails if a registry was already installed; the existing one is kept.
pub fn initialize(registry: TypeRegistry) -> Result<&'static TypeRegistry, RegistryError> {
    let mut pending = Some(registry);
    let installed = GLOBAL_REGISTRY.get_or_init(|| pending.take().unwrap_or_default());
    if pending.is_some() {
        return Err(RegistryError::AlreadyInitialized);
    }
    tracing::info!("Type registry initialized with {} types", installed.len());
    Ok(installed)
}

/// The process-wide registry, if [`initialize`] has run
pub fn global() -> Option<&'static TypeRegistry> {
    GLOBAL_REGISTRY.get()
}

/// The process-wide registry, freezing the built-in catalog if nothing was installed
pub fn global_or_builtin() -> &'static TypeRegistry {
    GLOBAL_REGISTRY.get_or_init(builtin_registry)
}
