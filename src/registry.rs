//! Process-wide (but explicitly held, not globally hidden) mapping from
//! type-name to deserialization factory (§4.A, §4.I).

use crate::container::Primitive;
use crate::doc::unwrap_shell;
use crate::error::{ConfigError, FormatError, Result};
use crate::primitives;
use hashbrown::HashMap;
use serde_json::Value;
use std::rc::Rc;

pub type Factory<D> = Rc<dyn Fn(&Value, &str, &Registry<D>) -> Result<Box<dyn Primitive<D>>>>;

/// Maps a primitive's `type_name()` to a factory that can rebuild it from a
/// document body. Registration is idempotent: registering the same name with
/// the exact same factory again is a no-op; registering it with a different
/// factory is a [`ConfigError`].
pub struct Registry<D> {
    factories: HashMap<String, Factory<D>>,
}

impl<D> Registry<D> {
    pub fn new() -> Self {
        Registry {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, factory: Factory<D>) -> Result<()> {
        if let Some(existing) = self.factories.get(name) {
            if !Rc::ptr_eq(existing, &factory) {
                return Err(ConfigError::DuplicateType(name.to_string()).into());
            }
            return Ok(());
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn factory_for(&self, name: &str) -> Option<&Factory<D>> {
        self.factories.get(name)
    }

    /// Deserialize a `{version, type, data}` document, dispatching on
    /// `type` via the registry.
    pub fn from_document(&self, doc: &Value, path: &str) -> Result<Box<dyn Primitive<D>>>
    where
        D: 'static,
    {
        let (_version, type_name, data) = unwrap_shell(doc, path)?;
        let factory = self.factory_for(type_name).ok_or_else(|| FormatError::UnknownType {
            path: path.to_string(),
            type_name: type_name.to_string(),
        })?;
        factory(data, &format!("{path}.data"), self)
    }
}

impl<D> Default for Registry<D> {
    fn default() -> Self {
        Registry::new()
    }
}

impl<D: 'static> Registry<D> {
    /// A registry pre-populated with every primitive this crate defines.
    pub fn with_builtins() -> Self {
        let mut reg = Registry::new();
        primitives::register_builtins(&mut reg).expect("builtin registration cannot collide");
        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::count::Count;

    #[test]
    fn reregistering_the_same_factory_is_a_no_op() {
        let mut reg = Registry::<f64>::new();
        let factory: Factory<f64> = Rc::new(|_, _, _| Ok(Box::new(Count::new()) as Box<dyn Primitive<f64>>));
        reg.register("Count", factory.clone()).unwrap();
        assert!(reg.register("Count", factory).is_ok());
    }

    #[test]
    fn registering_a_different_factory_under_the_same_name_is_an_error() {
        let mut reg = Registry::<f64>::new();
        let first: Factory<f64> = Rc::new(|_, _, _| Ok(Box::new(Count::new()) as Box<dyn Primitive<f64>>));
        let second: Factory<f64> = Rc::new(|_, _, _| Ok(Box::new(Count::new()) as Box<dyn Primitive<f64>>));
        reg.register("Count", first).unwrap();
        assert!(reg.register("Count", second).is_err());
    }

    #[test]
    fn unknown_type_is_a_format_error() {
        let reg = Registry::<f64>::with_builtins();
        let doc = serde_json::json!({"version": "1.0", "type": "NoSuchThing", "data": {}});
        assert!(reg.from_document(&doc, "$").is_err());
    }
}
