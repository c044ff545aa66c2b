//! Binary encoding of UNO values.
//!
//! Integers are big-endian. Lengths use the compressed form: one byte below
//! 0xFF, otherwise 0xFF followed by a u32.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::cache::{InboundCaches, OutboundCache, NO_CACHE};
use crate::error::{Result, UrpError};
use crate::types::{names, Any, Type, TypeClass, UnoException, UnoValue};

pub fn write_compressed(buf: &mut BytesMut, value: u32) {
    if value < 0xFF {
        buf.put_u8(value as u8);
    } else {
        buf.put_u8(0xFF);
        buf.put_u32(value);
    }
}

pub fn read_compressed(buf: &mut Bytes) -> Result<u32> {
    need(buf, 1, "compressed number")?;
    match buf.get_u8() {
        0xFF => {
            need(buf, 4, "extended compressed number")?;
            Ok(buf.get_u32())
        }
        small => Ok(small as u32),
    }
}

pub fn write_string(buf: &mut BytesMut, s: &str) {
    write_compressed(buf, s.len() as u32);
    buf.put_slice(s.as_bytes());
}

pub fn read_string(buf: &mut Bytes) -> Result<String> {
    let raw = read_byte_sequence(buf, "string")?;
    String::from_utf8(raw).map_err(|e| UrpError::Marshal(format!("invalid UTF-8 in string: {e}")))
}

/// Compressed length followed by raw bytes (TIDs and `[]byte`).
pub fn read_byte_sequence(buf: &mut Bytes, what: &str) -> Result<Vec<u8>> {
    let len = read_compressed(buf)? as usize;
    need(buf, len, what)?;
    Ok(buf.copy_to_bytes(len).to_vec())
}

/// Writes a type descriptor. Complex types go through `cache` when given,
/// otherwise they are sent in full and marked uncached.
pub fn write_type(buf: &mut BytesMut, ty: &Type, cache: Option<&mut OutboundCache<Type>>) {
    let class = ty.class as u8;
    if ty.class.is_simple() {
        buf.put_u8(class);
        return;
    }
    match cache.map(|c| c.slot_for(ty)) {
        Some((index, false)) => {
            buf.put_u8(class);
            buf.put_u16(index);
        }
        Some((index, true)) => {
            buf.put_u8(class | 0x80);
            buf.put_u16(index);
            write_string(buf, &ty.name);
        }
        None => {
            buf.put_u8(class | 0x80);
            buf.put_u16(NO_CACHE);
            write_string(buf, &ty.name);
        }
    }
}

/// Reads a type descriptor, resolving or filling the type cache.
pub fn read_type(buf: &mut Bytes, caches: &mut InboundCaches) -> Result<Type> {
    need(buf, 1, "type")?;
    let byte = buf.get_u8();
    let class = TypeClass::from_wire(byte).ok_or(UrpError::UnknownTypeClass(byte & 0x7F))?;
    if class.is_simple() {
        return Ok(Type::simple(class));
    }

    need(buf, 2, "type cache index")?;
    let index = buf.get_u16();
    if byte & 0x80 != 0 {
        let ty = Type {
            class,
            name: read_string(buf)?,
        };
        caches.types.store(index, ty.clone())?;
        Ok(ty)
    } else {
        caches.types.get(index)
    }
}

/// Writes an interface reference. Non-null OIDs share the header OID cache.
pub fn write_oid(buf: &mut BytesMut, oid: &str, oids: &mut OutboundCache<String>) {
    if oid.is_empty() {
        write_string(buf, "");
        buf.put_u16(NO_CACHE);
        return;
    }
    let (index, first_sight) = oids.slot_for(&oid.to_string());
    write_string(buf, if first_sight { oid } else { "" });
    buf.put_u16(index);
}

pub fn read_oid(buf: &mut Bytes, caches: &mut InboundCaches) -> Result<String> {
    let oid = read_string(buf)?;
    need(buf, 2, "OID cache index")?;
    let index = buf.get_u16();
    if oid.is_empty() {
        if index == NO_CACHE {
            return Ok(oid);
        }
        return caches.oids.get(index);
    }
    caches.oids.store(index, oid.clone())?;
    Ok(oid)
}

/// Encodes a value. The variant drives the encoding; `Any` carries its own type.
pub fn write_value(buf: &mut BytesMut, value: &UnoValue, oids: &mut OutboundCache<String>) {
    match value {
        UnoValue::Void => {}
        UnoValue::Bool(b) => buf.put_u8(u8::from(*b)),
        UnoValue::Byte(b) => buf.put_u8(*b),
        UnoValue::Char(c) | UnoValue::UnsignedShort(c) => buf.put_u16(*c),
        UnoValue::Short(n) => buf.put_i16(*n),
        UnoValue::Long(n) | UnoValue::Enum(n) => buf.put_i32(*n),
        UnoValue::UnsignedLong(n) => buf.put_u32(*n),
        UnoValue::Hyper(n) => buf.put_i64(*n),
        UnoValue::UnsignedHyper(n) => buf.put_u64(*n),
        UnoValue::Float(f) => buf.put_f32(*f),
        UnoValue::Double(d) => buf.put_f64(*d),
        UnoValue::String(s) => write_string(buf, s),
        UnoValue::Type(t) => write_type(buf, t, None),
        UnoValue::Any(any) => {
            write_type(buf, &any.type_desc, None);
            write_value(buf, &any.value, oids);
        }
        UnoValue::Struct(members) => {
            for member in members {
                write_value(buf, member, oids);
            }
        }
        UnoValue::Exception(exc) => {
            write_string(buf, &exc.message);
            write_oid(buf, "", oids);
        }
        UnoValue::Sequence(items) => {
            write_compressed(buf, items.len() as u32);
            for item in items {
                write_value(buf, item, oids);
            }
        }
        UnoValue::Interface(oid) => write_oid(buf, oid, oids),
    }
}

/// Decodes a value of the given type.
pub fn read_value(buf: &mut Bytes, ty: &Type, caches: &mut InboundCaches) -> Result<UnoValue> {
    let value = match ty.class {
        TypeClass::Void => UnoValue::Void,
        TypeClass::Boolean => {
            need(buf, 1, "boolean")?;
            UnoValue::Bool(buf.get_u8() != 0)
        }
        TypeClass::Byte => {
            need(buf, 1, "byte")?;
            UnoValue::Byte(buf.get_u8())
        }
        TypeClass::Char => {
            need(buf, 2, "char")?;
            UnoValue::Char(buf.get_u16())
        }
        TypeClass::Short => {
            need(buf, 2, "short")?;
            UnoValue::Short(buf.get_i16())
        }
        TypeClass::UnsignedShort => {
            need(buf, 2, "unsigned short")?;
            UnoValue::UnsignedShort(buf.get_u16())
        }
        TypeClass::Long => {
            need(buf, 4, "long")?;
            UnoValue::Long(buf.get_i32())
        }
        TypeClass::UnsignedLong => {
            need(buf, 4, "unsigned long")?;
            UnoValue::UnsignedLong(buf.get_u32())
        }
        TypeClass::Enum => {
            need(buf, 4, "enum")?;
            UnoValue::Enum(buf.get_i32())
        }
        TypeClass::Hyper => {
            need(buf, 8, "hyper")?;
            UnoValue::Hyper(buf.get_i64())
        }
        TypeClass::UnsignedHyper => {
            need(buf, 8, "unsigned hyper")?;
            UnoValue::UnsignedHyper(buf.get_u64())
        }
        TypeClass::Float => {
            need(buf, 4, "float")?;
            UnoValue::Float(buf.get_f32())
        }
        TypeClass::Double => {
            need(buf, 8, "double")?;
            UnoValue::Double(buf.get_f64())
        }
        TypeClass::String => UnoValue::String(read_string(buf)?),
        TypeClass::Type => UnoValue::Type(read_type(buf, caches)?),
        TypeClass::Any => {
            let type_desc = read_type(buf, caches)?;
            let value = read_value(buf, &type_desc, caches)?;
            Any { type_desc, value }.into()
        }
        TypeClass::Struct => read_struct(buf, &ty.name, caches)?,
        TypeClass::Exception => {
            // Only the base members are decoded; derived members stay unread.
            let message = read_string(buf)?;
            let _context = read_oid(buf, caches)?;
            UnoValue::Exception(UnoException {
                type_name: ty.name.clone(),
                message,
            })
        }
        TypeClass::Sequence => {
            let element = ty
                .element()
                .ok_or_else(|| UrpError::Marshal(format!("not a sequence type: {ty}")))?;
            if element.class == TypeClass::Byte {
                let raw = read_byte_sequence(buf, "byte sequence")?;
                UnoValue::Sequence(raw.into_iter().map(UnoValue::Byte).collect())
            } else {
                let count = read_compressed(buf)? as usize;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(read_value(buf, &element, caches)?);
                }
                UnoValue::Sequence(items)
            }
        }
        TypeClass::Interface => UnoValue::Interface(read_oid(buf, caches)?),
    };
    Ok(value)
}

fn read_struct(buf: &mut Bytes, name: &str, caches: &mut InboundCaches) -> Result<UnoValue> {
    match name {
        names::PROPERTY_VALUE => {
            let prop = read_string(buf)?;
            need(buf, 4, "PropertyValue.Handle")?;
            let handle = buf.get_i32();
            let value = read_value(buf, &Type::any(), caches)?;
            need(buf, 4, "PropertyValue.State")?;
            let state = buf.get_i32();
            Ok(UnoValue::Struct(vec![
                UnoValue::String(prop),
                UnoValue::Long(handle),
                value,
                UnoValue::Enum(state),
            ]))
        }
        names::PROTOCOL_PROPERTY => {
            let prop = read_string(buf)?;
            let value = read_value(buf, &Type::any(), caches)?;
            Ok(UnoValue::Struct(vec![UnoValue::String(prop), value]))
        }
        other => Err(UrpError::Marshal(format!("no layout known for struct {other}"))),
    }
}

fn need(buf: &Bytes, n: usize, what: &str) -> Result<()> {
    if buf.remaining() < n {
        return Err(UrpError::Marshal(format!(
            "truncated {what}: need {n} bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}
