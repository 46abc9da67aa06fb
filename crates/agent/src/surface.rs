//! Tool surface: one name -> descriptor view over local and remote tools.
//!
//! The catalog is recomputed on demand. A remote backend that cannot list
//! its tools degrades the catalog to local tools with a warning; a name
//! offered by two sources is a configuration error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use codewright_core::error::{Error, ToolError};
use codewright_core::remote::RemoteToolBackend;
use codewright_core::tool::{ToolDescriptor, ToolOrigin, ToolRegistry};
use tracing::{debug, warn};

/// Default upper bound for a remote listing.
const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Which backend owns a tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRoute {
    Local,
    Remote,
}

impl From<ToolRoute> for ToolOrigin {
    fn from(route: ToolRoute) -> Self {
        match route {
            ToolRoute::Local => ToolOrigin::Local,
            ToolRoute::Remote => ToolOrigin::Remote,
        }
    }
}

/// A snapshot of every tool offered to the model for one request.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    descriptors: Vec<ToolDescriptor>,
    routes: HashMap<String, ToolRoute>,
    warnings: Vec<String>,
}

impl Catalog {
    /// Descriptors sorted by name.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Soft failures hit while building this catalog.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether remote tools were left out because listing failed.
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Result<ToolRoute, ToolError> {
        self.routes
            .get(name)
            .copied()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Merges the local registry with an optional remote backend.
#[derive(Clone)]
pub struct ToolSurface {
    local: Arc<ToolRegistry>,
    remote: Option<Arc<dyn RemoteToolBackend>>,
    list_timeout: Duration,
}

impl ToolSurface {
    pub fn new(local: Arc<ToolRegistry>, remote: Option<Arc<dyn RemoteToolBackend>>) -> Self {
        Self {
            local,
            remote,
            list_timeout: DEFAULT_LIST_TIMEOUT,
        }
    }

    /// Bound the time spent listing remote tools.
    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    pub fn local(&self) -> &Arc<ToolRegistry> {
        &self.local
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteToolBackend>> {
        self.remote.as_ref()
    }

    /// Build the current catalog.
    ///
    /// Fails only with [`Error::DuplicateTool`]. Remote listing failures are
    /// recorded in [`Catalog::warnings`] and the remote tools are left out.
    pub async fn catalog(&self) -> Result<Catalog, Error> {
        let mut catalog = Catalog::default();

        for descriptor in self.local.descriptors() {
            catalog
                .routes
                .insert(descriptor.name.clone(), ToolRoute::Local);
            catalog.descriptors.push(descriptor);
        }

        if let Some(remote) = &self.remote {
            match self.list_remote(remote.as_ref()).await {
                Ok(listed) => {
                    for mut descriptor in listed {
                        if catalog.routes.contains_key(&descriptor.name) {
                            return Err(Error::DuplicateTool {
                                name: descriptor.name,
                            });
                        }
                        descriptor.origin = ToolOrigin::Remote;
                        catalog
                            .routes
                            .insert(descriptor.name.clone(), ToolRoute::Remote);
                        catalog.descriptors.push(descriptor);
                    }
                }
                Err(reason) => {
                    warn!(backend = remote.name(), %reason, "Remote tools unavailable, using local tools only");
                    catalog.warnings.push(reason);
                }
            }
        }

        catalog.descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(
            tools = catalog.descriptors.len(),
            degraded = catalog.is_degraded(),
            "Tool catalog built"
        );
        Ok(catalog)
    }

    /// Find the backend owning `name` without building a full catalog.
    pub async fn resolve(&self, name: &str) -> Result<ToolRoute, ToolError> {
        if self.local.contains(name) {
            return Ok(ToolRoute::Local);
        }
        let Some(remote) = &self.remote else {
            return Err(ToolError::NotFound(name.to_string()));
        };
        let listed = self
            .list_remote(remote.as_ref())
            .await
            .map_err(ToolError::Remote)?;
        if listed.iter().any(|d| d.name == name) {
            Ok(ToolRoute::Remote)
        } else {
            Err(ToolError::NotFound(name.to_string()))
        }
    }

    async fn list_remote(
        &self,
        remote: &dyn RemoteToolBackend,
    ) -> Result<Vec<ToolDescriptor>, String> {
        match tokio::time::timeout(self.list_timeout, remote.list_tools()).await {
            Ok(Ok(listed)) => Ok(listed),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "listing remote tools timed out after {}s",
                self.list_timeout.as_secs_f32()
            )),
        }
    }
}
