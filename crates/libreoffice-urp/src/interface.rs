//! Method tables for the interfaces the connector talks to.
//!
//! Function ids are absolute positions in the interface's flattened method
//! list: XInterface contributes 0..=2 (queryInterface, acquire, release) and
//! every derived interface continues from there.

use crate::types::{names, Type};

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: &'static str,
    pub index: u16,
    pub arity: usize,
    pub return_type: Type,
    /// One-way methods get no reply.
    pub one_way: bool,
}

impl MethodDef {
    fn new(name: &'static str, index: u16, arity: usize, return_type: Type) -> Self {
        Self {
            name,
            index,
            arity,
            return_type,
            one_way: false,
        }
    }
}

/// XInterface::queryInterface(type) -> any
pub fn query_interface() -> MethodDef {
    MethodDef::new("queryInterface", 0, 1, Type::any())
}

/// XInterface::release(), sent one-way.
pub fn release() -> MethodDef {
    MethodDef {
        one_way: true,
        ..MethodDef::new("release", 2, 0, Type::void())
    }
}

/// XProtocolProperties::requestChange(long) -> long
pub fn request_change() -> MethodDef {
    MethodDef::new("requestChange", 4, 1, Type::long())
}

/// XProtocolProperties::commitChange([]ProtocolProperty)
pub fn commit_change() -> MethodDef {
    MethodDef::new("commitChange", 5, 1, Type::void())
}

/// XComponentContext: getValueByName(3), getServiceManager(4)
pub fn get_service_manager() -> MethodDef {
    MethodDef::new(
        "getServiceManager",
        4,
        0,
        Type::interface(names::X_MULTI_COMPONENT_FACTORY),
    )
}

/// XMultiComponentFactory::createInstanceWithContext(string, XComponentContext)
pub fn create_instance_with_context() -> MethodDef {
    MethodDef::new(
        "createInstanceWithContext",
        3,
        2,
        Type::interface(names::X_INTERFACE),
    )
}

/// XComponentLoader::loadComponentFromURL(url, target frame, search flags, []PropertyValue)
pub fn load_component_from_url() -> MethodDef {
    MethodDef::new(
        "loadComponentFromURL",
        3,
        4,
        Type::interface(names::X_COMPONENT),
    )
}

/// XStorable: hasLocation(3), getLocation(4), isReadonly(5), store(6),
/// storeAsURL(7), storeToURL(8)
pub fn store_as_url() -> MethodDef {
    MethodDef::new("storeAsURL", 7, 2, Type::void())
}

/// XCloseable::close(deliverOwnership), after XCloseBroadcaster's two listener methods.
pub fn close() -> MethodDef {
    MethodDef::new("close", 5, 1, Type::void())
}
