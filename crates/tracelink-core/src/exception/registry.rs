//! Registry mapping exception class names to kind constructors.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::kinds::ExceptionKind;
use super::message::split_header;
use super::ExceptionRecord;

/// Builds an [`ExceptionKind`] from the message text of a header line.
pub type KindConstructor = Arc<dyn Fn(&str) -> ExceptionKind + Send + Sync>;

/// Registry of exception kinds.
///
/// Maps fully qualified exception class names to the constructor that parses
/// their message. Names without an entry get [`ExceptionKind::Generic`].
/// Automatically registers the `java.lang` kinds on creation.
#[derive(Clone)]
pub struct ExceptionKindRegistry {
    constructors: HashMap<String, KindConstructor>,
}

impl ExceptionKindRegistry {
    /// Create a new registry with all built-in kinds.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register("java.lang.NullPointerException", ExceptionKind::null_pointer);
        registry.register(
            "java.lang.ArrayIndexOutOfBoundsException",
            ExceptionKind::array_index_out_of_bounds,
        );
        registry.register("java.lang.ArrayStoreException", ExceptionKind::array_store);
        registry.register("java.lang.ClassCastException", ExceptionKind::class_cast);
        registry.register("java.lang.ArithmeticException", ExceptionKind::arithmetic);
        registry.register("java.lang.AssertionError", ExceptionKind::assertion);
        registry.register(
            "java.lang.NegativeArraySizeException",
            ExceptionKind::negative_array_size,
        );

        registry
    }

    /// Registry without any kinds; every exception is generic.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Shared registry holding the built-in kinds.
    pub fn builtin() -> &'static ExceptionKindRegistry {
        static REGISTRY: OnceLock<ExceptionKindRegistry> = OnceLock::new();
        REGISTRY.get_or_init(ExceptionKindRegistry::new)
    }

    /// Register (or replace) the constructor for an exception class.
    pub fn register<F>(&mut self, class_name: impl Into<String>, constructor: F)
    where
        F: Fn(&str) -> ExceptionKind + Send + Sync + 'static,
    {
        self.constructors
            .insert(class_name.into(), Arc::new(constructor));
    }

    /// Check if a class name has a registered kind.
    pub fn is_registered(&self, class_name: &str) -> bool {
        self.constructors.contains_key(class_name)
    }

    /// Kind for an exception class and its message.
    pub fn kind_for(&self, class_name: &str, message: &str) -> ExceptionKind {
        match self.constructors.get(class_name) {
            Some(constructor) => constructor(message),
            None => ExceptionKind::Generic,
        }
    }

    /// Parse an exception header line.
    ///
    /// The record's class-name offset is relative to `line`.
    pub fn parse_message(&self, line: &str) -> Option<ExceptionRecord> {
        let header = split_header(line)?;
        let class_name = header.class_name(line);
        let kind = self.kind_for(class_name, &header.message);
        debug!(class_name, kind = kind.name(), "exception header");
        Some(ExceptionRecord::new(
            header.class_name_range.start,
            class_name,
            header.message,
            kind,
        ))
    }

    /// List registered class names.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ExceptionKindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExceptionKindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionKindRegistry")
            .field("registered", &self.registered_names())
            .finish()
    }
}

/// Parse an exception header line with the built-in registry.
pub fn parse_message(line: &str) -> Option<ExceptionRecord> {
    ExceptionKindRegistry::builtin().parse_message(line)
}
