//! Client-side references to remote objects.

use crate::error::{Result, UrpError};
use crate::types::{Type, UnoValue};

/// A remote object as seen through one of its interfaces.
///
/// Proxies are plain data; every call goes through the owning
/// [`UrpConnection`](crate::UrpConnection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnoProxy {
    pub oid: String,
    pub interface: Type,
}

impl UnoProxy {
    pub fn new(oid: impl Into<String>, interface: Type) -> Self {
        Self {
            oid: oid.into(),
            interface,
        }
    }

    /// Same object, viewed through another interface.
    pub fn as_interface(&self, name: &str) -> Self {
        Self::new(self.oid.clone(), Type::interface(name))
    }

    /// Proxy for an interface-returning call, or `None` for a null reference.
    pub fn from_return(value: &UnoValue, interface: &str) -> Option<Self> {
        value
            .interface_oid()
            .map(|oid| Self::new(oid, Type::interface(interface)))
    }

    /// Interprets a `queryInterface` result: a void `any` means "not supported".
    pub fn from_query(value: UnoValue, requested: Type) -> Result<Option<Self>> {
        match value {
            UnoValue::Any(any) if any.is_void() => Ok(None),
            UnoValue::Any(any) => Ok(any.value.interface_oid().map(|oid| Self::new(oid, requested))),
            other => Err(UrpError::Protocol(format!(
                "queryInterface returned {other:?} instead of an any"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{names, Any};

    #[test]
    fn test_from_query() {
        let loader = Type::interface(names::X_COMPONENT_LOADER);
        let hit: UnoValue = Any::interface(names::X_COMPONENT_LOADER, "desk").into();
        assert_eq!(
            UnoProxy::from_query(hit, loader.clone()).unwrap(),
            Some(UnoProxy::new("desk", loader.clone()))
        );
        assert_eq!(UnoProxy::from_query(Any::void().into(), loader.clone()).unwrap(), None);
        assert!(UnoProxy::from_query(UnoValue::Long(1), loader).is_err());
    }

    #[test]
    fn test_from_return_null() {
        assert_eq!(
            UnoProxy::from_return(&UnoValue::Interface(String::new()), names::X_COMPONENT),
            None
        );
    }
}
