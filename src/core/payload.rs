//! Dynamically typed event payloads.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Optional value carried alongside a fired event.
///
/// Cloning is cheap: the value is shared, never copied, so every action of a
/// transition observes the very same instance.
///
/// # Example
///
/// ```rust
/// use switchyard::core::Payload;
///
/// let payload = Payload::new("parameter".to_string());
/// assert_eq!(payload.get::<String>().map(String::as_str), Some("parameter"));
/// assert!(payload.get::<i32>().is_none());
/// assert!(Payload::none().is_none());
/// ```
#[derive(Clone, Default)]
pub struct Payload {
    value: Option<Arc<dyn Any + Send + Sync>>,
    type_name: &'static str,
}

impl Payload {
    /// Wrap a value.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            value: Some(Arc::new(value)),
            type_name: type_name::<T>(),
        }
    }

    /// The absent payload.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_some(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow the value if it has type `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.value.as_deref().and_then(|v| v.downcast_ref::<T>())
    }

    /// Name of the carried type, or `"()"` when absent.
    pub fn type_name(&self) -> &'static str {
        if self.value.is_some() {
            self.type_name
        } else {
            "()"
        }
    }

    /// Check whether two payloads share the same underlying value.
    pub fn ptr_eq(&self, other: &Payload) -> bool {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(_) => write!(f, "Payload({})", self.type_name),
            None => f.write_str("Payload(none)"),
        }
    }
}
