//! The fixed table of capabilities.

use futures::future::BoxFuture;
use serde_json::Value;

use crate::capabilities;
use crate::dispatcher::Services;
use crate::error::CapabilityError;
use crate::schema::{Args, CapabilityDescriptor, InputSchema};

/// Routes validated arguments to the component that owns the operation.
pub type Handler = for<'a> fn(&'a Services, Args) -> BoxFuture<'a, Result<Value, CapabilityError>>;

/// A descriptor paired with its handler.
#[derive(Clone)]
pub struct Capability {
  pub descriptor: CapabilityDescriptor,
  pub handler: Handler,
}

impl Capability {
  pub fn new(name: &'static str, description: &'static str, input_schema: InputSchema, handler: Handler) -> Self {
    Self {
      descriptor: CapabilityDescriptor {
        name,
        description,
        input_schema,
      },
      handler,
    }
  }
}

/// Every capability, in registration order.
#[derive(Clone, Default)]
pub struct Catalog {
  capabilities: Vec<Capability>,
}

impl Catalog {
  /// The built-in capability set.
  pub fn builtin() -> Self {
    let mut catalog = Catalog::default();
    capabilities::loom::register(&mut catalog);
    capabilities::canvas::register(&mut catalog);
    capabilities::molt::register(&mut catalog);
    capabilities::delegates::register(&mut catalog);
    catalog
  }

  /// Add a capability, replacing any with the same name.
  pub fn register(&mut self, capability: Capability) {
    let name = capability.descriptor.name;
    match self.capabilities.iter_mut().find(|c| c.descriptor.name == name) {
      Some(existing) => *existing = capability,
      None => self.capabilities.push(capability),
    }
  }

  pub fn get(&self, name: &str) -> Option<&Capability> {
    self.capabilities.iter().find(|c| c.descriptor.name == name)
  }

  pub fn descriptors(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
    self.capabilities.iter().map(|c| &c.descriptor)
  }

  pub fn len(&self) -> usize {
    self.capabilities.len()
  }

  pub fn is_empty(&self) -> bool {
    self.capabilities.is_empty()
  }
}
