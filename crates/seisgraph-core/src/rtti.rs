//! Process-wide class registry.
//!
//! Maps wire-stable class names to their base classes and an optional
//! factory. Registration is additive and expected to happen once at start-up,
//! before any archive is opened.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, Mutex};

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::object::{ClassInfo, Object};

/// Constructs a default instance of a class as the product type `R`
/// (for example `dyn Object`).
pub type Factory<R> = fn() -> Box<R>;

struct ClassEntry {
    bases: Vec<String>,
    /// A `Factory<R>` for the product type chosen at registration.
    factory: Option<Box<dyn Any + Send + Sync>>,
}

static CLASSES: LazyLock<Mutex<HashMap<String, ClassEntry>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Global RTTI table.
pub struct ClassRegistry;

impl ClassRegistry {
    /// Register a class that cannot be instantiated from the wire.
    pub fn register_abstract(type_name: &str, bases: &[&str]) -> CoreResult<()> {
        Self::insert(type_name, bases, None)
    }

    /// Register a concrete class together with its factory.
    pub fn register<R: ?Sized + 'static>(
        type_name: &str,
        bases: &[&str],
        factory: Factory<R>,
    ) -> CoreResult<()> {
        Self::insert(type_name, bases, Some(Box::new(factory)))
    }

    /// Register `T` under its static class name.
    pub fn register_class<T: ClassInfo, R: ?Sized + 'static>(
        factory: Option<Factory<R>>,
    ) -> CoreResult<()> {
        match factory {
            Some(factory) => Self::register(T::CLASS_NAME, T::BASE_CLASSES, factory),
            None => Self::register_abstract(T::CLASS_NAME, T::BASE_CLASSES),
        }
    }

    fn insert(
        type_name: &str,
        bases: &[&str],
        factory: Option<Box<dyn Any + Send + Sync>>,
    ) -> CoreResult<()> {
        let mut classes = CLASSES.lock().expect("lock poisoned");
        if classes.contains_key(type_name) {
            return Err(CoreError::AlreadyRegistered(type_name.to_string()));
        }
        debug!(class = type_name, bases = ?bases, "registered class");
        classes.insert(
            type_name.to_string(),
            ClassEntry {
                bases: bases.iter().map(|b| b.to_string()).collect(),
                factory,
            },
        );
        Ok(())
    }

    /// Construct a default instance of `type_name`.
    ///
    /// Fails with `UnknownType` for unregistered names and with `NoFactory`
    /// for abstract classes or factories of another product type.
    pub fn create<R: ?Sized + 'static>(type_name: &str) -> CoreResult<Box<R>> {
        let factory = {
            let classes = CLASSES.lock().expect("lock poisoned");
            let entry = classes
                .get(type_name)
                .ok_or_else(|| CoreError::UnknownType(type_name.to_string()))?;
            entry
                .factory
                .as_ref()
                .and_then(|f| f.downcast_ref::<Factory<R>>())
                .copied()
                .ok_or_else(|| CoreError::NoFactory(type_name.to_string()))?
        };
        Ok(factory())
    }

    pub fn contains(type_name: &str) -> bool {
        CLASSES.lock().expect("lock poisoned").contains_key(type_name)
    }

    /// Direct base classes of a registered class.
    pub fn bases(type_name: &str) -> Option<Vec<String>> {
        CLASSES
            .lock()
            .expect("lock poisoned")
            .get(type_name)
            .map(|entry| entry.bases.clone())
    }

    /// Whether `candidate` is `required` or (transitively) derived from it.
    /// A class may list several bases.
    pub fn is_type_of(candidate: &str, required: &str) -> bool {
        if candidate == required {
            return true;
        }
        let classes = CLASSES.lock().expect("lock poisoned");
        let mut pending = vec![candidate];
        let mut seen = HashSet::new();
        while let Some(name) = pending.pop() {
            if !seen.insert(name) {
                continue;
            }
            let Some(entry) = classes.get(name) else {
                continue;
            };
            for base in &entry.bases {
                if base == required {
                    return true;
                }
                pending.push(base.as_str());
            }
        }
        false
    }

    /// All registered class names, sorted.
    pub fn class_names() -> Vec<String> {
        let mut names: Vec<String> = CLASSES
            .lock()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Narrow an object to a concrete type; `None` if it is something else.
pub fn cast<T: Object>(object: &dyn Object) -> Option<&T> {
    object.as_any().downcast_ref::<T>()
}

pub fn cast_mut<T: Object>(object: &mut dyn Object) -> Option<&mut T> {
    object.as_any_mut().downcast_mut::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archive;

    #[derive(Debug, Default)]
    struct Sample {
        value: i32,
    }

    impl Object for Sample {
        fn class_name(&self) -> &'static str {
            "RttiSample"
        }

        fn serialize(&mut self, _ar: &mut dyn Archive) {}
    }

    #[derive(Debug, Default)]
    struct Other;

    impl Object for Other {
        fn class_name(&self) -> &'static str {
            "RttiOther"
        }

        fn serialize(&mut self, _ar: &mut dyn Archive) {}
    }

    fn sample_factory() -> Box<dyn Object> {
        Box::new(Sample { value: 7 })
    }

    // -----------------------------------------------------------------------
    // Registration and creation
    // -----------------------------------------------------------------------

    #[test]
    fn create_registered_class() {
        ClassRegistry::register_abstract("RttiSampleBase", &[]).unwrap();
        ClassRegistry::register("RttiSample", &["RttiSampleBase"], sample_factory as Factory<dyn Object>)
            .unwrap();

        let object = ClassRegistry::create::<dyn Object>("RttiSample").unwrap();
        assert_eq!(object.class_name(), "RttiSample");
        assert_eq!(cast::<Sample>(object.as_ref()).map(|s| s.value), Some(7));
        assert!(cast::<Other>(object.as_ref()).is_none());
    }

    #[test]
    fn unknown_and_abstract_types() {
        assert!(matches!(
            ClassRegistry::create::<dyn Object>("RttiNeverRegistered"),
            Err(CoreError::UnknownType(_))
        ));

        ClassRegistry::register_abstract("RttiAbstract", &[]).unwrap();
        assert!(matches!(
            ClassRegistry::create::<dyn Object>("RttiAbstract"),
            Err(CoreError::NoFactory(_))
        ));
    }

    #[test]
    fn factory_product_must_match() {
        fn boxed_other() -> Box<Other> {
            Box::new(Other)
        }
        ClassRegistry::register("RttiOther", &[], boxed_other as Factory<Other>).unwrap();
        assert!(ClassRegistry::create::<Other>("RttiOther").is_ok());
        assert!(matches!(
            ClassRegistry::create::<dyn Object>("RttiOther"),
            Err(CoreError::NoFactory(_))
        ));
    }

    #[test]
    fn duplicate_registration_rejected() {
        ClassRegistry::register_abstract("RttiTwice", &[]).unwrap();
        assert_eq!(
            ClassRegistry::register_abstract("RttiTwice", &[]),
            Err(CoreError::AlreadyRegistered("RttiTwice".into()))
        );
    }

    // -----------------------------------------------------------------------
    // Type compatibility
    // -----------------------------------------------------------------------

    #[test]
    fn is_type_of_walks_multiple_bases() {
        ClassRegistry::register_abstract("RttiRoot", &[]).unwrap();
        ClassRegistry::register_abstract("RttiLeft", &["RttiRoot"]).unwrap();
        ClassRegistry::register_abstract("RttiRight", &["RttiRoot"]).unwrap();
        ClassRegistry::register_abstract("RttiDiamond", &["RttiLeft", "RttiRight"]).unwrap();

        assert!(ClassRegistry::is_type_of("RttiDiamond", "RttiDiamond"));
        assert!(ClassRegistry::is_type_of("RttiDiamond", "RttiLeft"));
        assert!(ClassRegistry::is_type_of("RttiDiamond", "RttiRight"));
        assert!(ClassRegistry::is_type_of("RttiDiamond", "RttiRoot"));
        assert!(!ClassRegistry::is_type_of("RttiRoot", "RttiDiamond"));
        assert!(!ClassRegistry::is_type_of("RttiLeft", "RttiRight"));
        assert!(!ClassRegistry::is_type_of("RttiUnregistered", "RttiRoot"));
        assert_eq!(
            ClassRegistry::bases("RttiDiamond"),
            Some(vec!["RttiLeft".to_string(), "RttiRight".to_string()])
        );
    }
}
