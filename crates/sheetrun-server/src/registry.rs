//! Processing modules served by the HTTP surface.

use std::fmt;
use std::sync::Arc;

use sheetrun_core::{CoreError, ModuleSpec};

use crate::delegate::ProcessingDelegate;

/// A module and the processor behind it, if any.
#[derive(Clone)]
pub struct Module {
    pub spec: ModuleSpec,
    pub delegate: Option<Arc<dyn ProcessingDelegate>>,
}

impl Module {
    /// Whether uploads for this module can be processed.
    pub fn is_processable(&self) -> bool {
        self.delegate.is_some()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("spec", &self.spec)
            .field("processable", &self.is_processable())
            .finish()
    }
}

/// Modules in registration order.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in modules and no processors attached.
    pub fn builtin() -> Result<Self, CoreError> {
        let mut registry = Self::new();
        registry.register(ModuleSpec::modulo1()?, None);
        registry.register(ModuleSpec::modulo2()?, None);
        Ok(registry)
    }

    /// Add a module, replacing any module of the same name.
    pub fn register(&mut self, spec: ModuleSpec, delegate: Option<Arc<dyn ProcessingDelegate>>) {
        let module = Module { spec, delegate };
        match self
            .modules
            .iter_mut()
            .find(|m| m.spec.name == module.spec.name)
        {
            Some(existing) => *existing = module,
            None => self.modules.push(module),
        }
    }

    /// Attach a processor to an existing module. Returns false if no module
    /// is called `name`.
    pub fn set_delegate(&mut self, name: &str, delegate: Arc<dyn ProcessingDelegate>) -> bool {
        match self.modules.iter_mut().find(|m| m.spec.name.as_str() == name) {
            Some(module) => {
                module.delegate = Some(delegate);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.spec.name.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::CommandDelegate;

    #[test]
    fn test_builtin_modules() {
        let registry = ModuleRegistry::builtin().unwrap();
        let names: Vec<&str> = registry.iter().map(|m| m.spec.name.as_str()).collect();
        assert_eq!(names, vec!["modulo1", "modulo2"]);
        assert_eq!(registry.get("modulo1").unwrap().spec.roles.len(), 6);
        assert!(!registry.get("modulo1").unwrap().is_processable());
        assert!(registry.get("modulo3").is_none());
    }

    #[test]
    fn test_set_delegate() {
        let mut registry = ModuleRegistry::builtin().unwrap();
        assert!(registry.set_delegate("modulo1", Arc::new(CommandDelegate::new("process.py"))));
        assert!(!registry.set_delegate("modulo9", Arc::new(CommandDelegate::new("x"))));
        assert!(registry.get("modulo1").unwrap().is_processable());
        assert!(!registry.get("modulo2").unwrap().is_processable());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ModuleRegistry::builtin().unwrap();
        registry.register(ModuleSpec::modulo1().unwrap(), Some(Arc::new(CommandDelegate::new("x"))));
        assert_eq!(registry.len(), 2);
        assert!(registry.get("modulo1").unwrap().is_processable());
    }
}
