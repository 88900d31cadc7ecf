//! The single seam every surface invokes through.

use std::sync::Arc;

use loom_index::LoomIndex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::catalog::Catalog;
use crate::delegate::{Agent, MemoryStore, SkillProvider};
use crate::envelope::Envelope;
use crate::error::CapabilityError;
use crate::schema::CapabilityDescriptor;

/// What capability handlers route to.
#[derive(Clone)]
pub struct Services {
  pub index: Arc<LoomIndex>,
  pub agent: Arc<dyn Agent>,
  pub memory: Arc<dyn MemoryStore>,
  pub skills: Arc<dyn SkillProvider>,
  /// Loom used by canvas operations that name none.
  pub default_loom: String,
  /// Cancelled on shutdown; weaves and molts run under child tokens.
  pub shutdown: CancellationToken,
}

/// Validates and routes capability invocations.
pub struct Dispatcher {
  services: Services,
  catalog: Catalog,
}

impl Dispatcher {
  pub fn new(services: Services) -> Self {
    Self::with_catalog(services, Catalog::builtin())
  }

  pub fn with_catalog(services: Services, catalog: Catalog) -> Self {
    Self { services, catalog }
  }

  pub fn services(&self) -> &Services {
    &self.services
  }

  /// Every descriptor, in registration order.
  pub fn list(&self) -> Vec<CapabilityDescriptor> {
    self.catalog.descriptors().cloned().collect()
  }

  /// Invoke a capability and wrap the outcome in an envelope.
  #[instrument(name = "invoke", skip(self, args))]
  pub async fn invoke(&self, capability: &str, args: Value) -> Envelope {
    let result = self.call(capability, args).await;
    match &result {
      Ok(_) => info!(capability, "capability ok"),
      Err(e) => warn!(capability, kind = e.kind(), error = %e, "capability failed"),
    }
    Envelope::from_result(capability, result)
  }

  /// Invoke a capability, returning its raw result.
  ///
  /// Arguments are validated in full before the handler runs.
  pub async fn call(&self, capability: &str, args: Value) -> Result<Value, CapabilityError> {
    let entry = self
      .catalog
      .get(capability)
      .ok_or_else(|| CapabilityError::UnknownCapability(capability.to_string()))?;
    let args = entry.descriptor.input_schema.validate(args)?;
    (entry.handler)(&self.services, args).await
  }
}
