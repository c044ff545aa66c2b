//! Request and reply headers.
//!
//! Each side keeps a first-level cache (last type, OID and TID it sent or
//! received) plus the 256-slot tables in [`crate::cache`]. A request whose
//! type, OID and TID all match the previous one can use the 1- or 2-byte
//! short header.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::cache::{InboundCaches, OutboundCache};
use crate::error::{Result, UrpError};
use crate::marshal;
use crate::types::Type;

const LONG_HEADER: u8 = 0x80;
const REQUEST: u8 = 0x40;
const NEW_TYPE: u8 = 0x20;
const NEW_OID: u8 = 0x10;
const NEW_TID: u8 = 0x08;
const FUNCTION_ID_16: u8 = 0x04;
const MORE_FLAGS: u8 = 0x01;

const REPLY_EXCEPTION: u8 = 0x20;

const MUST_REPLY: u8 = 0x80;
const SYNCHRONOUS: u8 = 0x40;

/// Pseudo-object that answers protocol-property negotiation.
pub const PROTOCOL_PROPERTIES_OID: &str = "UrpProtocolProperties";
/// TID reserved for protocol-property negotiation.
pub const PROTOCOL_PROPERTIES_TID: &[u8] = b".UrpProtocolPropertiesTid";

#[derive(Debug, Clone)]
pub struct Request {
    pub function_id: u16,
    pub interface: Type,
    pub oid: String,
    pub tid: Vec<u8>,
    pub must_reply: bool,
    /// Still-encoded in-parameters.
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub tid: Vec<u8>,
    pub is_exception: bool,
    /// Return value and out-parameters, or the exception as an `any`.
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub enum Message {
    Request(Request),
    Reply(Reply),
}

/// Decoding state for messages arriving from the peer.
#[derive(Debug, Default)]
pub struct Inbound {
    pub caches: InboundCaches,
    last_type: Option<Type>,
    last_oid: Option<String>,
    last_tid: Option<Vec<u8>>,
}

impl Inbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, mut data: Bytes) -> Result<Message> {
        if data.is_empty() {
            return Err(UrpError::Protocol("empty message".into()));
        }
        let flags = data.get_u8();
        if flags & LONG_HEADER == 0 {
            self.decode_short_request(flags, data)
        } else if flags & REQUEST != 0 {
            self.decode_long_request(flags, data)
        } else {
            self.decode_reply(flags, data)
        }
    }

    fn decode_short_request(&mut self, flags: u8, mut data: Bytes) -> Result<Message> {
        let function_id = if flags & 0x40 != 0 {
            take(&data, 1, "function id")?;
            (u16::from(flags & 0x3F) << 8) | u16::from(data.get_u8())
        } else {
            u16::from(flags & 0x3F)
        };
        Ok(Message::Request(Request {
            function_id,
            interface: last(&self.last_type, "type")?,
            oid: last(&self.last_oid, "OID")?,
            tid: last(&self.last_tid, "TID")?,
            must_reply: true,
            body: data,
        }))
    }

    fn decode_long_request(&mut self, flags: u8, mut data: Bytes) -> Result<Message> {
        let mut must_reply = true;
        if flags & MORE_FLAGS != 0 {
            take(&data, 1, "second flags byte")?;
            let more = data.get_u8();
            must_reply = more & MUST_REPLY != 0;
        }

        let function_id = if flags & FUNCTION_ID_16 != 0 {
            take(&data, 2, "function id")?;
            data.get_u16()
        } else {
            take(&data, 1, "function id")?;
            u16::from(data.get_u8())
        };

        if flags & NEW_TYPE != 0 {
            self.last_type = Some(marshal::read_type(&mut data, &mut self.caches)?);
        }
        if flags & NEW_OID != 0 {
            self.last_oid = Some(marshal::read_oid(&mut data, &mut self.caches)?);
        }
        if flags & NEW_TID != 0 {
            self.read_tid(&mut data)?;
        }

        Ok(Message::Request(Request {
            function_id,
            interface: last(&self.last_type, "type")?,
            oid: last(&self.last_oid, "OID")?,
            tid: last(&self.last_tid, "TID")?,
            must_reply,
            body: data,
        }))
    }

    fn decode_reply(&mut self, flags: u8, mut data: Bytes) -> Result<Message> {
        if flags & NEW_TID != 0 {
            self.read_tid(&mut data)?;
        }
        Ok(Message::Reply(Reply {
            tid: last(&self.last_tid, "TID")?,
            is_exception: flags & REPLY_EXCEPTION != 0,
            body: data,
        }))
    }

    fn read_tid(&mut self, data: &mut Bytes) -> Result<()> {
        let tid = marshal::read_byte_sequence(data, "TID")?;
        take(data, 2, "TID cache index")?;
        let index = data.get_u16();
        let tid = if tid.is_empty() {
            self.caches.tids.get(index)?
        } else {
            self.caches.tids.store(index, tid.clone())?;
            tid
        };
        self.last_tid = Some(tid);
        Ok(())
    }
}

/// Encoding state for messages sent to the peer.
#[derive(Debug, Default)]
pub struct Outbound {
    pub types: OutboundCache<Type>,
    pub oids: OutboundCache<String>,
    pub tids: OutboundCache<Vec<u8>>,
    last_type: Option<Type>,
    last_oid: Option<String>,
    last_tid: Option<Vec<u8>>,
}

impl Outbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode_request(
        &mut self,
        function_id: u16,
        interface: &Type,
        oid: &str,
        tid: &[u8],
        must_reply: bool,
        body: &[u8],
    ) -> BytesMut {
        let mut buf = BytesMut::with_capacity(body.len() + 64);

        let new_type = self.last_type.as_ref() != Some(interface);
        let new_oid = self.last_oid.as_deref() != Some(oid);
        let new_tid = self.last_tid.as_deref() != Some(tid);

        if !(new_type || new_oid || new_tid) && must_reply && function_id < 0x4000 {
            if function_id < 0x40 {
                buf.put_u8(function_id as u8);
            } else {
                buf.put_u16(function_id | 0x4000);
            }
            buf.put_slice(body);
            return buf;
        }

        let mut flags = LONG_HEADER | REQUEST;
        if new_type {
            flags |= NEW_TYPE;
        }
        if new_oid {
            flags |= NEW_OID;
        }
        if new_tid {
            flags |= NEW_TID;
        }
        if function_id > 0xFF {
            flags |= FUNCTION_ID_16;
        }
        if !must_reply {
            flags |= MORE_FLAGS;
        }
        buf.put_u8(flags);
        if !must_reply {
            // Asynchronous, no reply wanted.
            buf.put_u8(0);
        }

        if function_id > 0xFF {
            buf.put_u16(function_id);
        } else {
            buf.put_u8(function_id as u8);
        }

        if new_type {
            marshal::write_type(&mut buf, interface, Some(&mut self.types));
            self.last_type = Some(interface.clone());
        }
        if new_oid {
            marshal::write_oid(&mut buf, oid, &mut self.oids);
            self.last_oid = Some(oid.to_string());
        }
        if new_tid {
            self.write_tid(&mut buf, tid);
        }

        buf.put_slice(body);
        buf
    }

    pub fn encode_reply(&mut self, tid: &[u8], is_exception: bool, body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(body.len() + 32);
        let new_tid = self.last_tid.as_deref() != Some(tid);

        let mut flags = LONG_HEADER;
        if is_exception {
            flags |= REPLY_EXCEPTION;
        }
        if new_tid {
            flags |= NEW_TID;
        }
        buf.put_u8(flags);
        if new_tid {
            self.write_tid(&mut buf, tid);
        }
        buf.put_slice(body);
        buf
    }

    fn write_tid(&mut self, buf: &mut BytesMut, tid: &[u8]) {
        let (index, first_sight) = self.tids.slot_for(&tid.to_vec());
        let sent: &[u8] = if first_sight { tid } else { &[] };
        marshal::write_compressed(buf, sent.len() as u32);
        buf.put_slice(sent);
        buf.put_u16(index);
        self.last_tid = Some(tid.to_vec());
    }
}

fn take(data: &Bytes, n: usize, what: &str) -> Result<()> {
    if data.remaining() < n {
        return Err(UrpError::Protocol(format!("header truncated before {what}")));
    }
    Ok(())
}

fn last<T: Clone>(slot: &Option<T>, what: &str) -> Result<T> {
    slot.clone()
        .ok_or_else(|| UrpError::Protocol(format!("header reuses {what} before any was sent")))
}
