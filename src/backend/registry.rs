//! Backend Registry
//!
//! Process-wide table mapping backend names to constructors. The table is
//! populated with the platform built-ins on first use, grows through
//! [`register_backend`], and never shrinks. Registration order is the
//! auto-selection preference order, platform default first.
//!
//! Writes go through the registry lock; lookups take read locks. The
//! table is a setup-time surface, not a per-frame path.

use std::sync::{LazyLock, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendOptions};
use crate::error::{CameraError, Result};

/// Constructor registered for a backend name
///
/// Plays the role of the driver's `open()`: claims a device for the given
/// options, decides the native format, and returns the live handle.
pub type BackendConstructor =
    Box<dyn Fn(&BackendOptions) -> Result<Box<dyn Backend>> + Send + Sync>;

struct BackendEntry {
    name: String,
    constructor: BackendConstructor,
}

/// Ordered name -> constructor table with first-success selection
pub struct BackendRegistry {
    entries: Vec<BackendEntry>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a registry seeded with the built-in drivers for this platform
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(target_os = "linux")]
        registry.register("v4l2loopback", crate::backend::v4l2loopback::open);
        registry
    }

    /// Register a backend constructor under a name
    ///
    /// Re-registering an existing name replaces its constructor in place,
    /// keeping the original preference position.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&BackendOptions) -> Result<Box<dyn Backend>> + Send + Sync + 'static,
    {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            warn!("Backend '{}' re-registered, replacing constructor", name);
            entry.constructor = Box::new(constructor);
            return;
        }
        debug!("Registering backend '{}'", name);
        self.entries.push(BackendEntry {
            name: name.to_string(),
            constructor: Box::new(constructor),
        });
    }

    /// Registered backend names in preference order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Open a backend for the given options
    ///
    /// With `requested` set, only that backend is tried and its failure is
    /// propagated unchanged. Otherwise every registered backend is tried
    /// in preference order and the first successful open wins; if all
    /// fail, [`CameraError::NoBackendAvailable`] aggregates each attempt's
    /// error, one per line.
    pub fn open(
        &self,
        requested: Option<&str>,
        options: &BackendOptions,
    ) -> Result<(String, Box<dyn Backend>)> {
        if let Some(name) = requested {
            let entry = self.entries.iter().find(|e| e.name == name).ok_or_else(|| {
                CameraError::NoBackendAvailable(format!(
                    "backend '{}' is not registered (registered: {})",
                    name,
                    self.names().join(", ")
                ))
            })?;
            let backend = (entry.constructor)(options)?;
            info!("Opened requested backend '{}' on {}", name, backend.device());
            return Ok((entry.name.clone(), backend));
        }

        if self.entries.is_empty() {
            return Err(CameraError::NoBackendAvailable(
                "no virtual camera backends are registered for this platform".to_string(),
            ));
        }

        let mut failures = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match (entry.constructor)(options) {
                Ok(backend) => {
                    info!("Opened backend '{}' on {}", entry.name, backend.device());
                    return Ok((entry.name.clone(), backend));
                }
                Err(e) => {
                    debug!("Backend '{}' unavailable: {}", entry.name, e);
                    failures.push(format!("'{}' backend: {}", entry.name, e));
                }
            }
        }
        Err(CameraError::NoBackendAvailable(failures.join("\n")))
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

static REGISTRY: LazyLock<RwLock<BackendRegistry>> =
    LazyLock::new(|| RwLock::new(BackendRegistry::with_builtins()));

/// Register a backend with the process-wide registry
///
/// Embedding code calls this once at setup for each external driver; the
/// entry becomes a candidate for auto-selection and addressable by name
/// from [`crate::CameraConfig`].
pub fn register_backend<F>(name: &str, constructor: F)
where
    F: Fn(&BackendOptions) -> Result<Box<dyn Backend>> + Send + Sync + 'static,
{
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, constructor);
}

/// Names registered with the process-wide registry, in preference order
pub fn backend_names() -> Vec<String> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .names()
}

/// Open a backend from the process-wide registry
pub(crate) fn open_backend(
    requested: Option<&str>,
    options: &BackendOptions,
) -> Result<(String, Box<dyn Backend>)> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .open(requested, options)
}
