//! Mounted widget instances, keyed by container id
//!
//! Mirrors the embedding API of the browser bundle: `init` mounts a widget into
//! a container (replacing whatever was mounted there), `destroy` unmounts it.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{WidgetConfig, WidgetController, WidgetError};

/// Version reported by the embedding API
pub const WIDGET_VERSION: &str = "1.0.0";

/// A mounted widget's controller, shared with the host that drives it
pub type WidgetHandle = Arc<Mutex<WidgetController>>;

#[derive(Default)]
pub struct WidgetRegistry {
    instances: DashMap<String, WidgetHandle>,
}

/// Unmounts the widget it was created for, once
#[must_use = "dropping the disposer does not unmount the widget"]
pub struct Disposer {
    registry: Arc<WidgetRegistry>,
    container_id: String,
    handle: WidgetHandle,
}

impl Disposer {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Unmount the widget; a newer widget in the same container is left alone
    pub fn dispose(self) {
        self.registry
            .instances
            .remove_if(&self.container_id, |_, mounted| {
                Arc::ptr_eq(mounted, &self.handle)
            });
    }
}

impl WidgetRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Validate `config` and mount a fresh widget in its container
    pub fn init(self: &Arc<Self>, config: WidgetConfig) -> Result<Disposer, WidgetError> {
        config.validate()?;

        let container_id = config.container_id.clone();
        if self.instances.contains_key(&container_id) {
            tracing::debug!("Replacing widget in container {}", container_id);
            self.destroy(&container_id);
        }

        let handle: WidgetHandle = Arc::new(Mutex::new(WidgetController::new(config)));
        self.instances
            .insert(container_id.clone(), Arc::clone(&handle));
        tracing::info!("Mounted widget in container {}", container_id);

        Ok(Disposer {
            registry: Arc::clone(self),
            container_id,
            handle,
        })
    }

    /// Unmount the widget in `container_id`; unknown containers are ignored
    pub fn destroy(&self, container_id: &str) {
        if self.instances.remove(container_id).is_some() {
            tracing::info!("Destroyed widget in container {}", container_id);
        }
    }

    /// Mount from script tag data attributes when auto-init is requested
    pub fn auto_init(
        self: &Arc<Self>,
        attrs: &HashMap<String, String>,
    ) -> Result<Option<Disposer>, WidgetError> {
        match WidgetConfig::from_data_attributes(attrs) {
            Ok(Some(config)) => self.init(config).map(Some),
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::error!("SmeduverseAI: {}", e);
                Err(e)
            }
        }
    }

    pub fn get(&self, container_id: &str) -> Option<WidgetHandle> {
        self.instances
            .get(container_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_mounted(&self, container_id: &str) -> bool {
        self.instances.contains_key(container_id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn version() -> &'static str {
        WIDGET_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::DEFAULT_CONTAINER_ID;

    fn config() -> WidgetConfig {
        WidgetConfig::new("https://relay.example.com/api/chat")
    }

    #[test]
    fn test_init_and_dispose() {
        let registry = WidgetRegistry::new();
        let disposer = registry.init(config()).unwrap();
        assert!(registry.is_mounted(DEFAULT_CONTAINER_ID));
        assert_eq!(disposer.container_id(), DEFAULT_CONTAINER_ID);

        disposer.dispose();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reinit_replaces_instance() {
        let registry = WidgetRegistry::new();
        let first = registry.init(config()).unwrap();
        let old = registry.get(DEFAULT_CONTAINER_ID).unwrap();
        old.lock().unwrap().set_input("draft");

        let _second = registry.init(config()).unwrap();
        assert_eq!(registry.len(), 1);
        let current = registry.get(DEFAULT_CONTAINER_ID).unwrap();
        assert_eq!(current.lock().unwrap().input(), "");

        // the stale disposer must not unmount the replacement
        first.dispose();
        assert!(registry.is_mounted(DEFAULT_CONTAINER_ID));
    }

    #[test]
    fn test_invalid_config_mounts_nothing() {
        let registry = WidgetRegistry::new();
        let err = registry.init(WidgetConfig::new("")).err().unwrap();
        assert_eq!(err, WidgetError::MissingApiEndpoint);
        assert!(registry.is_empty());

        registry.destroy("never-mounted");
        assert_eq!(WidgetRegistry::version(), "1.0.0");
    }

    #[test]
    fn test_auto_init() {
        let registry = WidgetRegistry::new();
        let mut attrs = HashMap::new();
        attrs.insert("data-smeduverse-ai".to_string(), "auto".to_string());
        assert_eq!(
            registry.auto_init(&attrs).err(),
            Some(WidgetError::AutoInitMissingEndpoint)
        );

        attrs.insert(
            "data-api-endpoint".to_string(),
            "https://relay.example.com/api/chat".to_string(),
        );
        attrs.insert("data-title".to_string(), "Asisten Guru".to_string());
        let disposer = registry.auto_init(&attrs).unwrap().unwrap();
        let handle = registry.get(disposer.container_id()).unwrap();
        assert_eq!(handle.lock().unwrap().config().title, "Asisten Guru");
    }
}
