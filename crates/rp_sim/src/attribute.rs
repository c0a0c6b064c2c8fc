//! Named entity attributes with change notification.
//!
//! Attributes are small dynamically typed values (health, player number,
//! stance) identified by name. The value type is locked by the first
//! assignment; later writes with a different type are rejected rather than
//! applied. Each attribute carries an explicit observer list; observers
//! are invoked synchronously after a successful write, and the attribute
//! set never owns or extends an observer's lifetime beyond its
//! subscription.

use std::collections::HashMap;
use std::rc::Rc;

use crate::property::PropertyValue;

/// Handle returned by [`AttributeSet::subscribe`], used to unsubscribe.
pub type ObserverId = u64;

/// Observer callback invoked with the attribute's new value.
pub type ObserverFn = Rc<dyn Fn(&PropertyValue)>;

/// Outcome of a rejected write, reported to the caller for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Type locked in by the first assignment.
    pub expected: &'static str,
    /// Type of the rejected value.
    pub got: &'static str,
}

/// The attribute storage for one entity.
#[derive(Default)]
pub struct AttributeSet {
    values: HashMap<String, PropertyValue>,
    observers: HashMap<String, Vec<(ObserverId, ObserverFn)>>,
    next_observer: ObserverId,
}

impl AttributeSet {
    /// Create an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Names of all attributes, in unspecified order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Write an attribute value.
    ///
    /// The first write to a name locks its type. On success the observers
    /// subscribed to the name are returned (snapshot) so the caller can
    /// invoke them after releasing any outer borrow. On a type mismatch
    /// nothing is written and the mismatch is reported.
    pub fn set(
        &mut self,
        name: &str,
        value: PropertyValue,
    ) -> Result<Vec<ObserverFn>, TypeMismatch> {
        if let Some(existing) = self.values.get(name) {
            if !existing.same_kind(&value) {
                return Err(TypeMismatch {
                    expected: existing.kind(),
                    got: value.kind(),
                });
            }
        }
        self.values.insert(name.to_owned(), value);

        let snapshot = self
            .observers
            .get(name)
            .map(|list| list.iter().map(|(_, f)| Rc::clone(f)).collect())
            .unwrap_or_default();
        Ok(snapshot)
    }

    /// Seed an attribute without notifying observers.
    ///
    /// Used when instantiating an entity from a template, before any
    /// observer can exist. Replaces the value and its type lock.
    pub fn seed(&mut self, name: &str, value: PropertyValue) {
        self.values.insert(name.to_owned(), value);
    }

    /// Subscribe to changes of the named attribute.
    ///
    /// The attribute does not need to exist yet; the observer fires on the
    /// first successful write as well.
    pub fn subscribe(&mut self, name: &str, observer: impl Fn(&PropertyValue) + 'static) -> ObserverId {
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers
            .entry(name.to_owned())
            .or_default()
            .push((id, Rc::new(observer)));
        id
    }

    /// Remove a subscription. Returns `false` if the id was not found.
    pub fn unsubscribe(&mut self, name: &str, id: ObserverId) -> bool {
        match self.observers.get_mut(name) {
            Some(list) => {
                let before = list.len();
                list.retain(|(oid, _)| *oid != id);
                list.len() != before
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeSet")
            .field("values", &self.values)
            .field("observers", &self.observers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_first_write_locks_type() {
        let mut attrs = AttributeSet::new();
        attrs.set("health", PropertyValue::Int(100)).unwrap();

        let err = match attrs.set("health", PropertyValue::Float(50.0)) {
            Ok(_) => panic!("expected type mismatch"),
            Err(e) => e,
        };
        assert_eq!(err.expected, "int");
        assert_eq!(err.got, "float");
        assert_eq!(attrs.get("health"), Some(&PropertyValue::Int(100)));
    }

    #[test]
    fn test_matching_type_overwrites() {
        let mut attrs = AttributeSet::new();
        attrs.set("health", PropertyValue::Int(100)).unwrap();
        attrs.set("health", PropertyValue::Int(80)).unwrap();
        assert_eq!(attrs.get("health"), Some(&PropertyValue::Int(80)));
    }

    #[test]
    fn test_observer_snapshot_returned_on_success_only() {
        let mut attrs = AttributeSet::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        attrs.subscribe("health", move |value| {
            sink.borrow_mut().push(value.clone());
        });

        let observers = attrs.set("health", PropertyValue::Int(10)).unwrap();
        for observer in &observers {
            observer(attrs.get("health").unwrap());
        }
        assert_eq!(*seen.borrow(), vec![PropertyValue::Int(10)]);

        // Rejected writes hand back no observers.
        assert!(attrs.set("health", PropertyValue::Bool(true)).is_err());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut attrs = AttributeSet::new();
        let id = attrs.subscribe("health", |_| {});
        assert!(attrs.unsubscribe("health", id));
        assert!(!attrs.unsubscribe("health", id));
        assert!(attrs.set("health", PropertyValue::Int(1)).unwrap().is_empty());
    }

    #[test]
    fn test_seed_resets_type_lock() {
        let mut attrs = AttributeSet::new();
        attrs.set("stance", PropertyValue::Text("hold".into())).unwrap();
        attrs.seed("stance", PropertyValue::Int(0));
        assert!(attrs.set("stance", PropertyValue::Int(1)).is_ok());
    }
}
