//! Management operations and their wire form.
//!
//! An [`Operation`] is a verb, a target [`ResourceAddress`], and an ordered
//! parameter map. Operations are immutable once built; use
//! [`Operation::builder`] to accumulate parameters. [`Operation::to_json`]
//! produces the envelope understood by the management endpoint.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::address::ResourceAddress;

/// Operation verbs understood by the management endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Create a resource at the target address
    Add,
    /// Delete the resource at the target address
    Remove,
    /// Read the resource and its attributes
    ReadResource,
    /// Read a single attribute (`name` parameter)
    ReadAttribute,
    /// Write a single attribute (`name` and `value` parameters)
    WriteAttribute,
    /// Unset a single attribute (`name` parameter)
    UndefineAttribute,
}

impl Verb {
    /// The wire name of the verb
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::ReadResource => "read-resource",
            Self::ReadAttribute => "read-attribute",
            Self::WriteAttribute => "write-attribute",
            Self::UndefineAttribute => "undefine-attribute",
        }
    }

    /// Whether the verb mutates the management model
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Remove | Self::WriteAttribute | Self::UndefineAttribute
        )
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single management operation
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    verb: Verb,
    address: ResourceAddress,
    params: BTreeMap<String, Value>,
}

impl Operation {
    /// Create a parameterless operation
    #[must_use]
    pub const fn new(verb: Verb, address: ResourceAddress) -> Self {
        Self {
            verb,
            address,
            params: BTreeMap::new(),
        }
    }

    /// Start building an operation with parameters
    #[must_use]
    pub const fn builder(verb: Verb, address: ResourceAddress) -> OperationBuilder {
        OperationBuilder {
            verb,
            address,
            params: BTreeMap::new(),
        }
    }

    /// `read-resource` on the given address
    #[must_use]
    pub const fn read_resource(address: ResourceAddress) -> Self {
        Self::new(Verb::ReadResource, address)
    }

    /// `read-attribute` of `name` on the given address
    #[must_use]
    pub fn read_attribute(address: ResourceAddress, name: impl Into<String>) -> Self {
        Self::builder(Verb::ReadAttribute, address)
            .param("name", name.into())
            .build()
    }

    /// `write-attribute` of `name` to `value` on the given address
    #[must_use]
    pub fn write_attribute(
        address: ResourceAddress,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::builder(Verb::WriteAttribute, address)
            .param("name", name.into())
            .param("value", value)
            .build()
    }

    /// `undefine-attribute` of `name` on the given address
    #[must_use]
    pub fn undefine_attribute(address: ResourceAddress, name: impl Into<String>) -> Self {
        Self::builder(Verb::UndefineAttribute, address)
            .param("name", name.into())
            .build()
    }

    /// `remove` of the given address
    #[must_use]
    pub const fn remove(address: ResourceAddress) -> Self {
        Self::new(Verb::Remove, address)
    }

    /// The operation verb
    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.verb
    }

    /// The target address
    #[must_use]
    pub const fn address(&self) -> &ResourceAddress {
        &self.address
    }

    /// All parameters in name order
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// A single parameter by name
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// The JSON envelope submitted to the management endpoint
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut envelope = Map::new();
        envelope.insert(
            "operation".to_string(),
            Value::String(self.verb.as_str().to_string()),
        );
        envelope.insert("address".to_string(), self.address.to_json());
        for (name, value) in &self.params {
            envelope.insert(name.clone(), value.clone());
        }
        Value::Object(envelope)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.address)
    }
}

/// Builder accumulating operation parameters
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    verb: Verb,
    address: ResourceAddress,
    params: BTreeMap<String, Value>,
}

impl OperationBuilder {
    /// Add one parameter
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Finish building the operation
    #[must_use]
    pub fn build(self) -> Operation {
        Operation {
            verb: self.verb,
            address: self.address,
            params: self.params,
        }
    }
}
