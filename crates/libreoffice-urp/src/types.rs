//! The slice of the UNO type system that travels over the bridge.
//!
//! Only the shapes used while bootstrapping and loading documents get
//! dedicated constructors; everything else decodes into the generic variants.

use std::fmt;

/// Wire discriminant of a UNO type (bits 6..0 of a type byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeClass {
    Void = 0,
    Char = 1,
    Boolean = 2,
    Byte = 3,
    Short = 4,
    UnsignedShort = 5,
    Long = 6,
    UnsignedLong = 7,
    Hyper = 8,
    UnsignedHyper = 9,
    Float = 10,
    Double = 11,
    String = 12,
    Type = 13,
    Any = 14,
    Enum = 15,
    Struct = 17,
    Exception = 19,
    Sequence = 20,
    Interface = 22,
}

impl TypeClass {
    pub fn from_wire(byte: u8) -> Option<Self> {
        use TypeClass::*;
        let class = match byte & 0x7F {
            0 => Void,
            1 => Char,
            2 => Boolean,
            3 => Byte,
            4 => Short,
            5 => UnsignedShort,
            6 => Long,
            7 => UnsignedLong,
            8 => Hyper,
            9 => UnsignedHyper,
            10 => Float,
            11 => Double,
            12 => String,
            13 => Type,
            14 => Any,
            15 => Enum,
            17 => Struct,
            19 => Exception,
            20 => Sequence,
            22 => Interface,
            _ => return None,
        };
        Some(class)
    }

    /// Simple classes are encoded as a lone byte and never carry a name.
    pub fn is_simple(self) -> bool {
        (self as u8) <= TypeClass::Any as u8
    }
}

/// A type class plus, for complex classes, its fully-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub class: TypeClass,
    pub name: String,
}

impl Type {
    pub fn simple(class: TypeClass) -> Self {
        Self {
            class,
            name: String::new(),
        }
    }

    pub fn void() -> Self {
        Self::simple(TypeClass::Void)
    }

    pub fn boolean() -> Self {
        Self::simple(TypeClass::Boolean)
    }

    pub fn long() -> Self {
        Self::simple(TypeClass::Long)
    }

    pub fn string() -> Self {
        Self::simple(TypeClass::String)
    }

    pub fn any() -> Self {
        Self::simple(TypeClass::Any)
    }

    pub fn r#type() -> Self {
        Self::simple(TypeClass::Type)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            class: TypeClass::Interface,
            name: name.into(),
        }
    }

    pub fn r#struct(name: impl Into<String>) -> Self {
        Self {
            class: TypeClass::Struct,
            name: name.into(),
        }
    }

    /// `[]element` in UNO notation.
    pub fn sequence_of(element: &str) -> Self {
        Self {
            class: TypeClass::Sequence,
            name: format!("[]{element}"),
        }
    }

    /// Element type of a sequence type, resolved from its name.
    pub fn element(&self) -> Option<Type> {
        let element = self.name.strip_prefix("[]")?;
        let class = class_for_name(element);
        let name = if class.is_simple() {
            String::new()
        } else {
            element.to_string()
        };
        Some(Type { class, name })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{:?}", self.class)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Maps a UNO type name onto its class. Interface names follow the `.X` convention.
pub fn class_for_name(name: &str) -> TypeClass {
    match name {
        "" | "void" => TypeClass::Void,
        "boolean" => TypeClass::Boolean,
        "byte" => TypeClass::Byte,
        "char" => TypeClass::Char,
        "short" => TypeClass::Short,
        "unsigned short" => TypeClass::UnsignedShort,
        "long" => TypeClass::Long,
        "unsigned long" => TypeClass::UnsignedLong,
        "hyper" => TypeClass::Hyper,
        "unsigned hyper" => TypeClass::UnsignedHyper,
        "float" => TypeClass::Float,
        "double" => TypeClass::Double,
        "string" => TypeClass::String,
        "type" => TypeClass::Type,
        "any" => TypeClass::Any,
        n if n.starts_with("[]") => TypeClass::Sequence,
        n if n.contains(".X") => TypeClass::Interface,
        _ => TypeClass::Struct,
    }
}

/// A decoded or to-be-encoded UNO value.
#[derive(Debug, Clone, PartialEq)]
pub enum UnoValue {
    Void,
    Bool(bool),
    Byte(u8),
    Char(u16),
    Short(i16),
    UnsignedShort(u16),
    Long(i32),
    UnsignedLong(u32),
    Hyper(i64),
    UnsignedHyper(u64),
    Float(f32),
    Double(f64),
    String(String),
    Type(Type),
    Any(Box<Any>),
    Enum(i32),
    /// Members in declaration order; each member is encoded by its own variant.
    Struct(Vec<UnoValue>),
    Exception(UnoException),
    Sequence(Vec<UnoValue>),
    /// Interface reference by OID. The empty OID is the null reference.
    Interface(String),
}

impl UnoValue {
    pub fn as_long(&self) -> Option<i32> {
        match self {
            UnoValue::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            UnoValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// OID of a non-null interface reference, looking through one level of `Any`.
    pub fn interface_oid(&self) -> Option<&str> {
        match self {
            UnoValue::Interface(oid) if !oid.is_empty() => Some(oid),
            UnoValue::Any(any) => any.value.interface_oid(),
            _ => None,
        }
    }

    /// Wire type implied by the variant, used for struct members where no
    /// signature is available. Names of complex types are left blank.
    pub fn implied_type(&self) -> Type {
        let class = match self {
            UnoValue::Void => TypeClass::Void,
            UnoValue::Bool(_) => TypeClass::Boolean,
            UnoValue::Byte(_) => TypeClass::Byte,
            UnoValue::Char(_) => TypeClass::Char,
            UnoValue::Short(_) => TypeClass::Short,
            UnoValue::UnsignedShort(_) => TypeClass::UnsignedShort,
            UnoValue::Long(_) => TypeClass::Long,
            UnoValue::UnsignedLong(_) => TypeClass::UnsignedLong,
            UnoValue::Hyper(_) => TypeClass::Hyper,
            UnoValue::UnsignedHyper(_) => TypeClass::UnsignedHyper,
            UnoValue::Float(_) => TypeClass::Float,
            UnoValue::Double(_) => TypeClass::Double,
            UnoValue::String(_) => TypeClass::String,
            UnoValue::Type(_) => TypeClass::Type,
            UnoValue::Any(_) => TypeClass::Any,
            UnoValue::Enum(_) => TypeClass::Enum,
            UnoValue::Struct(_) => TypeClass::Struct,
            UnoValue::Exception(_) => TypeClass::Exception,
            UnoValue::Sequence(_) => TypeClass::Sequence,
            UnoValue::Interface(_) => TypeClass::Interface,
        };
        Type::simple(class)
    }
}

/// A value tagged with its own type, as carried by `any` parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Any {
    pub type_desc: Type,
    pub value: UnoValue,
}

impl Any {
    pub fn void() -> Self {
        Self {
            type_desc: Type::void(),
            value: UnoValue::Void,
        }
    }

    pub fn boolean(b: bool) -> Self {
        Self {
            type_desc: Type::boolean(),
            value: UnoValue::Bool(b),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self {
            type_desc: Type::string(),
            value: UnoValue::String(s.into()),
        }
    }

    pub fn interface(type_name: &str, oid: impl Into<String>) -> Self {
        Self {
            type_desc: Type::interface(type_name),
            value: UnoValue::Interface(oid.into()),
        }
    }

    pub fn is_void(&self) -> bool {
        self.type_desc.class == TypeClass::Void
    }
}

impl From<Any> for UnoValue {
    fn from(any: Any) -> Self {
        UnoValue::Any(Box::new(any))
    }
}

/// The base part of a remote `com.sun.star.uno.Exception`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnoException {
    pub type_name: String,
    pub message: String,
}

/// `com.sun.star.beans.PropertyValue`, the argument record of loaders and storers.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub name: String,
    pub value: Any,
}

impl PropertyValue {
    pub fn new(name: impl Into<String>, value: Any) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl From<PropertyValue> for UnoValue {
    /// Name, Handle, Value, State (DIRECT_VALUE).
    fn from(pv: PropertyValue) -> Self {
        UnoValue::Struct(vec![
            UnoValue::String(pv.name),
            UnoValue::Long(0),
            pv.value.into(),
            UnoValue::Enum(0),
        ])
    }
}

/// Well-known names used during bootstrap and document handling.
pub mod names {
    pub const X_INTERFACE: &str = "com.sun.star.uno.XInterface";
    pub const X_COMPONENT_CONTEXT: &str = "com.sun.star.uno.XComponentContext";
    pub const X_MULTI_COMPONENT_FACTORY: &str = "com.sun.star.lang.XMultiComponentFactory";
    pub const X_COMPONENT_LOADER: &str = "com.sun.star.frame.XComponentLoader";
    pub const X_COMPONENT: &str = "com.sun.star.lang.XComponent";
    pub const X_STORABLE: &str = "com.sun.star.frame.XStorable";
    pub const X_CLOSEABLE: &str = "com.sun.star.util.XCloseable";
    pub const X_PROTOCOL_PROPERTIES: &str = "com.sun.star.bridge.XProtocolProperties";

    pub const PROPERTY_VALUE: &str = "com.sun.star.beans.PropertyValue";
    pub const PROTOCOL_PROPERTY: &str = "com.sun.star.bridge.ProtocolProperty";

    pub const SERVICE_DESKTOP: &str = "com.sun.star.frame.Desktop";
    /// Initial object name announced in the `--accept` string.
    pub const INITIAL_CONTEXT: &str = "StarOffice.ComponentContext";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_element_type() {
        let seq = Type::sequence_of(names::PROPERTY_VALUE);
        let elem = seq.element().unwrap();
        assert_eq!(elem.class, TypeClass::Struct);
        assert_eq!(elem.name, names::PROPERTY_VALUE);

        let bytes = Type::sequence_of("byte").element().unwrap();
        assert_eq!(bytes, Type::simple(TypeClass::Byte));
    }

    #[test]
    fn test_interface_oid_through_any() {
        let value: UnoValue = Any::interface(names::X_COMPONENT, "doc-1").into();
        assert_eq!(value.interface_oid(), Some("doc-1"));
        assert_eq!(UnoValue::Interface(String::new()).interface_oid(), None);
        assert_eq!(UnoValue::from(Any::void()).interface_oid(), None);
    }

    #[test]
    fn test_class_round_trip_through_wire_byte() {
        for class in [TypeClass::Void, TypeClass::Any, TypeClass::Struct, TypeClass::Interface] {
            assert_eq!(TypeClass::from_wire(class as u8), Some(class));
        }
        assert_eq!(TypeClass::from_wire(16), None);
        assert!(TypeClass::Any.is_simple());
        assert!(!TypeClass::Enum.is_simple());
    }
}
