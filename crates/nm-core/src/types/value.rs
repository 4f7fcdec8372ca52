//! Dynamic values flowing through providers, properties and stand-ins.

use std::fmt;
use std::sync::Arc;

use super::instance::Instance;

/// A runtime value.
///
/// Plain data is carried as JSON; mock and component instances are shared by
/// reference so that a provider's `useValue` and the object a test inspects
/// are the same instance.
///
/// # Examples
///
/// ```
/// use nm_core::Value;
/// use serde_json::json;
///
/// assert!(Value::default().is_undefined());
/// assert_eq!(Value::from(json!(3)), Value::Json(json!(3)));
/// ```
#[derive(Clone, Default)]
pub enum Value {
    /// The absence of a value.
    #[default]
    Undefined,
    /// Plain data.
    Json(serde_json::Value),
    /// A shared object instance.
    Instance(Arc<Instance>),
}

impl Value {
    /// Returns `true` for [`Value::Undefined`].
    #[inline]
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns the JSON payload, if any.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the shared instance, if any.
    #[must_use]
    pub fn as_instance(&self) -> Option<&Arc<Instance>> {
        match self {
            Self::Instance(instance) => Some(instance),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) => true,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::Instance(a), Self::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<Arc<Instance>> for Value {
    fn from(instance: Arc<Instance>) -> Self {
        Self::Instance(instance)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Json(value) => write!(f, "{value}"),
            Self::Instance(instance) => write!(f, "<{}>", instance.class().name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassRef;
    use serde_json::json;

    #[test]
    fn test_instances_compare_by_reference() {
        let class = ClassRef::new("Logger");
        let a = Arc::new(Instance::new(class.clone()));
        let b = Arc::new(Instance::new(class));
        assert_eq!(Value::from(Arc::clone(&a)), Value::from(Arc::clone(&a)));
        assert_ne!(Value::from(a), Value::from(b));
    }

    #[test]
    fn test_debug_output() {
        assert_eq!(format!("{:?}", Value::Undefined), "undefined");
        assert_eq!(format!("{:?}", Value::from(json!({"a": 1}))), r#"{"a":1}"#);
    }
}
