use std::collections::HashMap;

use thiserror::Error;

use crate::{platform::Platform, widget::Widget};

/// Constructs one widget instance.
pub type WidgetFactory<P> = Box<dyn Fn() -> Box<dyn Widget<P>>>;

/// A widget could not be resolved from its bridge path. Load failures are explicit values; a
/// load either returns a widget or one of these, immediately.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("no module registered for bridge path `{0}`")]
    ModuleNotFound(String),

    #[error("module `{0}` does not register a default export")]
    NoDefaultExport(String),

    #[error("module `{0}` has no export named `{1}`")]
    NoSuchExport(String, String),
}

/// The behavior-provider contract: a bridge path (and optional export name) in, a constructed
/// widget instance or an explicit failure out.
pub trait WidgetLoader<P: Platform> {
    fn load(&self, bridge: &str, export: Option<&str>) -> Result<Box<dyn Widget<P>>, LoadError>;
}

struct Module<P: Platform> {
    default: Option<WidgetFactory<P>>,
    named: HashMap<String, WidgetFactory<P>>,
}

impl<P: Platform> Default for Module<P> {
    fn default() -> Self {
        Self {
            default: None,
            named: HashMap::new(),
        }
    }
}

/// The concrete loader: widget factories registered up front under the bridge paths markup will
/// name in `data-bridge`. Mirrors a JS module's shape, with one optional default export and any
/// number of named exports per path.
pub struct WidgetRegistry<P: Platform> {
    modules: HashMap<String, Module<P>>,
}

impl<P: Platform> WidgetRegistry<P> {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Register the default export for a bridge path.
    pub fn register_default<W, F>(&mut self, bridge: &str, factory: F)
    where
        W: Widget<P> + 'static,
        F: Fn() -> W + 'static,
    {
        self.module(bridge).default = Some(Box::new(move || Box::new(factory())));
    }

    /// Register a named export for a bridge path.
    pub fn register<W, F>(&mut self, bridge: &str, export: &str, factory: F)
    where
        W: Widget<P> + 'static,
        F: Fn() -> W + 'static,
    {
        self.module(bridge)
            .named
            .insert(export.to_string(), Box::new(move || Box::new(factory())));
    }

    fn module(&mut self, bridge: &str) -> &mut Module<P> {
        self.modules.entry(bridge.to_string()).or_default()
    }
}

impl<P: Platform> Default for WidgetRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Platform> WidgetLoader<P> for WidgetRegistry<P> {
    fn load(&self, bridge: &str, export: Option<&str>) -> Result<Box<dyn Widget<P>>, LoadError> {
        let module = self
            .modules
            .get(bridge)
            .ok_or_else(|| LoadError::ModuleNotFound(bridge.to_string()))?;

        match export {
            None => module
                .default
                .as_ref()
                .map(|factory| factory())
                .ok_or_else(|| LoadError::NoDefaultExport(bridge.to_string())),
            Some(name) => module
                .named
                .get(name)
                .map(|factory| factory())
                .ok_or_else(|| LoadError::NoSuchExport(bridge.to_string(), name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;

    struct Noop;
    impl Widget<MemoryPlatform> for Noop {}

    #[test]
    fn unknown_bridge_path_is_module_not_found() {
        let registry = WidgetRegistry::<MemoryPlatform>::new();

        assert_eq!(
            registry.load("./missing.js", None).err().unwrap(),
            LoadError::ModuleNotFound("./missing.js".to_string())
        );
    }

    #[test]
    fn module_without_default_export_is_explicit() {
        let mut registry = WidgetRegistry::new();
        registry.register("./mod.js", "Named", || Noop);

        assert_eq!(
            registry.load("./mod.js", None).err().unwrap(),
            LoadError::NoDefaultExport("./mod.js".to_string())
        );
    }

    #[test]
    fn missing_named_export_is_explicit() {
        let mut registry = WidgetRegistry::new();
        registry.register_default("./mod.js", || Noop);

        assert_eq!(
            registry.load("./mod.js", Some("Other")).err().unwrap(),
            LoadError::NoSuchExport("./mod.js".to_string(), "Other".to_string())
        );
    }

    #[test]
    fn registered_exports_construct_instances() {
        let mut registry = WidgetRegistry::new();
        registry.register_default("./mod.js", || Noop);
        registry.register("./mod.js", "Named", || Noop);

        assert!(registry.load("./mod.js", None).is_ok());
        assert!(registry.load("./mod.js", Some("Named")).is_ok());
    }
}
