//! A live bridge: negotiation, synchronous calls and the bootstrap sequence.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{Result, UrpError};
use crate::interface::{self, MethodDef};
use crate::marshal;
use crate::protocol::{
    Inbound, Message, Outbound, Reply, Request, PROTOCOL_PROPERTIES_OID, PROTOCOL_PROPERTIES_TID,
};
use crate::proxy::UnoProxy;
use crate::transport::Transport;
use crate::types::{names, Any, Type, UnoValue};

/// How many requestChange ties we sit through before giving up on negotiation.
const MAX_NEGOTIATION_ROUNDS: usize = 3;

/// The three objects every session starts from.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub context: UnoProxy,
    pub service_manager: UnoProxy,
    /// The Desktop, typed as `XComponentLoader`.
    pub desktop: UnoProxy,
}

pub struct UrpConnection<S = TcpStream> {
    transport: Transport<S>,
    inbound: Inbound,
    outbound: Outbound,
    next_tid: u64,
    /// Set once both sides agreed to prefix requests with an XCurrentContext.
    current_context: bool,
}

impl UrpConnection<TcpStream> {
    /// Opens a TCP connection and negotiates protocol properties.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        tracing::debug!("TCP connection to {host}:{port} established");
        Self::handshake(stream).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> UrpConnection<S> {
    /// Wraps an already-open stream and negotiates protocol properties.
    pub async fn handshake(stream: S) -> Result<Self> {
        let mut conn = Self {
            transport: Transport::new(stream),
            inbound: Inbound::new(),
            outbound: Outbound::new(),
            next_tid: 1,
            current_context: false,
        };
        conn.current_context = conn.negotiate().await?;
        tracing::debug!("Protocol negotiation done, current context: {}", conn.current_context);
        Ok(conn)
    }

    pub fn current_context_mode(&self) -> bool {
        self.current_context
    }

    fn tid(&mut self) -> Vec<u8> {
        let n = self.next_tid;
        self.next_tid += 1;
        format!("calc-connect-{n}").into_bytes()
    }

    async fn recv(&mut self) -> Result<Message> {
        let data = self.transport.recv().await?;
        self.inbound.decode(data)
    }

    async fn send_reply(&mut self, tid: &[u8], body: &[u8]) -> Result<()> {
        let msg = self.outbound.encode_reply(tid, false, body);
        self.transport.send(&msg).await
    }

    // Protocol properties

    /// Runs the requestChange/commitChange exchange. Returns whether
    /// CurrentContext mode is active afterwards. A peer that refuses the
    /// exchange is not an error; the bridge simply stays in plain mode.
    async fn negotiate(&mut self) -> Result<bool> {
        for _ in 0..MAX_NEGOTIATION_ROUNDS {
            let ours: i32 = rand::random();
            tracing::trace!("requestChange({ours})");
            self.send_properties_request(&interface::request_change(), &UnoValue::Long(ours))
                .await?;

            match self.await_request_change_outcome(ours).await? {
                Some(active) => return Ok(active),
                None => tracing::debug!("requestChange tie, retrying"),
            }
        }
        Ok(false)
    }

    /// `Some(active)` once settled, `None` on a tie.
    async fn await_request_change_outcome(&mut self, ours: i32) -> Result<Option<bool>> {
        loop {
            match self.recv().await? {
                Message::Reply(reply) if reply.is_exception => {
                    tracing::debug!("Peer rejected requestChange, staying in plain mode");
                    return Ok(Some(false));
                }
                Message::Reply(reply) => {
                    let mut body = reply.body;
                    let verdict = marshal::read_value(&mut body, &Type::long(), &mut self.inbound.caches)?;
                    return match verdict.as_long() {
                        Some(1) => {
                            self.commit_current_context().await?;
                            Ok(Some(true))
                        }
                        Some(0) => {
                            self.await_commit_change().await?;
                            Ok(Some(true))
                        }
                        Some(-1) => Ok(None),
                        _ => {
                            tracing::warn!("Unexpected requestChange verdict {verdict:?}");
                            Ok(Some(false))
                        }
                    };
                }
                Message::Request(req) if is_properties_call(&req, &interface::request_change()) => {
                    // Both sides asked at once; the larger number commits.
                    let mut body = req.body.clone();
                    let theirs = marshal::read_value(&mut body, &Type::long(), &mut self.inbound.caches)?
                        .as_long()
                        .unwrap_or(0);
                    let verdict: i32 = match ours.cmp(&theirs) {
                        std::cmp::Ordering::Greater => 0,
                        std::cmp::Ordering::Less => 1,
                        std::cmp::Ordering::Equal => -1,
                    };
                    let mut reply = BytesMut::new();
                    marshal::write_value(&mut reply, &UnoValue::Long(verdict), &mut self.outbound.oids);
                    self.send_reply(&req.tid, &reply).await?;
                    if verdict == 1 {
                        self.await_commit_change().await?;
                        return Ok(Some(true));
                    }
                }
                Message::Request(req) if is_properties_call(&req, &interface::commit_change()) => {
                    self.send_reply(&req.tid, &[]).await?;
                    return Ok(Some(true));
                }
                Message::Request(req) => self.answer_stray_request(req).await?,
            }
        }
    }

    async fn commit_current_context(&mut self) -> Result<()> {
        let properties = UnoValue::Sequence(vec![UnoValue::Struct(vec![
            UnoValue::String("CurrentContext".into()),
            Any::void().into(),
        ])]);
        self.send_properties_request(&interface::commit_change(), &properties)
            .await?;
        match self.recv().await? {
            Message::Reply(Reply { is_exception: true, .. }) => {
                tracing::warn!("commitChange raised an exception");
            }
            Message::Reply(_) => {}
            Message::Request(req) => self.answer_stray_request(req).await?,
        }
        Ok(())
    }

    async fn await_commit_change(&mut self) -> Result<()> {
        loop {
            match self.recv().await? {
                Message::Request(req) if is_properties_call(&req, &interface::commit_change()) => {
                    return self.send_reply(&req.tid, &[]).await;
                }
                Message::Request(req) => self.answer_stray_request(req).await?,
                Message::Reply(_) => tracing::trace!("Ignoring reply while awaiting commitChange"),
            }
        }
    }

    async fn send_properties_request(&mut self, method: &MethodDef, arg: &UnoValue) -> Result<()> {
        let mut body = BytesMut::new();
        marshal::write_value(&mut body, arg, &mut self.outbound.oids);
        let msg = self.outbound.encode_request(
            method.index,
            &Type::interface(names::X_PROTOCOL_PROPERTIES),
            PROTOCOL_PROPERTIES_OID,
            PROTOCOL_PROPERTIES_TID,
            true,
            &body,
        );
        self.transport.send(&msg).await
    }

    /// The peer may call us while we wait (mostly `release`). We hold no local
    /// objects, so anything needing an answer gets a void reply.
    async fn answer_stray_request(&mut self, req: Request) -> Result<()> {
        if req.function_id == interface::release().index {
            tracing::trace!("Peer released {}", req.oid);
            return Ok(());
        }
        if req.must_reply {
            self.send_reply(&req.tid, &[]).await?;
        }
        Ok(())
    }

    // Calls

    /// Invokes `method` on `target` and waits for its reply. Replies are
    /// assumed to arrive in request order; one call is in flight at a time.
    pub async fn call(
        &mut self,
        target: &UnoProxy,
        method: &MethodDef,
        args: &[UnoValue],
    ) -> Result<UnoValue> {
        if args.len() != method.arity {
            return Err(UrpError::Arity {
                method: method.name,
                expected: method.arity,
                actual: args.len(),
            });
        }

        let mut body = BytesMut::with_capacity(128);
        if self.current_context && !method.one_way {
            // Null XCurrentContext.
            marshal::write_string(&mut body, "");
            body.put_u16(crate::cache::NO_CACHE);
        }
        for arg in args {
            marshal::write_value(&mut body, arg, &mut self.outbound.oids);
        }

        let tid = self.tid();
        let msg = self.outbound.encode_request(
            method.index,
            &target.interface,
            &target.oid,
            &tid,
            !method.one_way,
            &body,
        );
        tracing::trace!("{}.{}() on {}", target.interface, method.name, target.oid);
        self.transport.send(&msg).await?;

        if method.one_way {
            return Ok(UnoValue::Void);
        }

        loop {
            match self.recv().await? {
                Message::Reply(reply) => return self.finish_call(method, reply),
                Message::Request(req) => self.answer_stray_request(req).await?,
            }
        }
    }

    fn finish_call(&mut self, method: &MethodDef, reply: Reply) -> Result<UnoValue> {
        let mut body = reply.body;
        if reply.is_exception {
            let raised = marshal::read_value(&mut body, &Type::any(), &mut self.inbound.caches)?;
            return Err(remote_exception(raised));
        }
        let value = marshal::read_value(&mut body, &method.return_type, &mut self.inbound.caches)?;
        tracing::trace!("{}() -> {value:?}", method.name);
        Ok(value)
    }

    /// `queryInterface` is always addressed through XInterface.
    pub async fn query_interface(&mut self, target: &UnoProxy, wanted: Type) -> Result<Option<UnoProxy>> {
        let via = target.as_interface(names::X_INTERFACE);
        let result = self
            .call(&via, &interface::query_interface(), &[UnoValue::Type(wanted.clone())])
            .await?;
        UnoProxy::from_query(result, wanted)
    }

    pub async fn release(&mut self, target: &UnoProxy) -> Result<()> {
        let via = target.as_interface(names::X_INTERFACE);
        self.call(&via, &interface::release(), &[]).await?;
        Ok(())
    }

    // Bootstrap

    /// Resolves the context announced by `--accept`, its service manager, and a
    /// Desktop ready to load components.
    pub async fn bootstrap(&mut self) -> Result<Bootstrap> {
        // The bridge hands out the initial object in answer to a queryInterface
        // on its well-known name.
        let named = UnoProxy::new(names::INITIAL_CONTEXT, Type::interface(names::X_INTERFACE));
        let initial = self
            .query_interface(&named, Type::interface(names::X_INTERFACE))
            .await?
            .ok_or_else(|| UrpError::Bootstrap(format!("no initial object named {}", names::INITIAL_CONTEXT)))?;
        let context = self
            .query_interface(&initial, Type::interface(names::X_COMPONENT_CONTEXT))
            .await?
            .unwrap_or_else(|| initial.as_interface(names::X_COMPONENT_CONTEXT));
        tracing::debug!("Component context: {}", context.oid);

        let smgr = self.call(&context, &interface::get_service_manager(), &[]).await?;
        let service_manager = UnoProxy::from_return(&smgr, names::X_MULTI_COMPONENT_FACTORY)
            .ok_or_else(|| UrpError::Bootstrap("getServiceManager returned null".into()))?;
        tracing::debug!("Service manager: {}", service_manager.oid);

        let desktop = self
            .call(
                &service_manager,
                &interface::create_instance_with_context(),
                &[
                    UnoValue::String(names::SERVICE_DESKTOP.into()),
                    UnoValue::Interface(context.oid.clone()),
                ],
            )
            .await?;
        let desktop = UnoProxy::from_return(&desktop, names::X_INTERFACE)
            .ok_or_else(|| UrpError::Bootstrap(format!("could not create {}", names::SERVICE_DESKTOP)))?;

        let desktop = self
            .query_interface(&desktop, Type::interface(names::X_COMPONENT_LOADER))
            .await?
            .unwrap_or_else(|| desktop.as_interface(names::X_COMPONENT_LOADER));
        tracing::info!("Bridge bootstrapped, desktop {}", desktop.oid);

        Ok(Bootstrap {
            context,
            service_manager,
            desktop,
        })
    }
}

fn is_properties_call(req: &Request, method: &MethodDef) -> bool {
    req.oid == PROTOCOL_PROPERTIES_OID && req.function_id == method.index
}

fn remote_exception(raised: UnoValue) -> UrpError {
    match raised {
        UnoValue::Any(any) => match any.value {
            UnoValue::Exception(e) => UrpError::RemoteException {
                type_name: e.type_name,
                message: e.message,
            },
            other => UrpError::RemoteException {
                type_name: any.type_desc.to_string(),
                message: format!("{other:?}"),
            },
        },
        other => UrpError::RemoteException {
            type_name: "unknown".into(),
            message: format!("{other:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeClass, UnoException};
    use tokio::io::DuplexStream;

    /// Scripted stand-in for the office side of the bridge.
    struct FakeOffice {
        transport: Transport<DuplexStream>,
        inbound: Inbound,
        outbound: Outbound,
    }

    impl FakeOffice {
        fn pair() -> (DuplexStream, Self) {
            let (client, server) = tokio::io::duplex(16 * 1024);
            let office = FakeOffice {
                transport: Transport::new(server),
                inbound: Inbound::new(),
                outbound: Outbound::new(),
            };
            (client, office)
        }

        async fn next_request(&mut self) -> Request {
            let data = self.transport.recv().await.unwrap();
            match self.inbound.decode(data).unwrap() {
                Message::Request(req) => req,
                Message::Reply(r) => panic!("fake office got a reply: {r:?}"),
            }
        }

        async fn reply(&mut self, tid: &[u8], value: Option<UnoValue>) {
            let mut body = BytesMut::new();
            if let Some(v) = value {
                marshal::write_value(&mut body, &v, &mut self.outbound.oids);
            }
            let msg = self.outbound.encode_reply(tid, false, &body);
            self.transport.send(&msg).await.unwrap();
        }

        async fn raise(&mut self, tid: &[u8], exception: Option<UnoException>) {
            let mut body = BytesMut::new();
            if let Some(e) = exception {
                let any = Any {
                    type_desc: Type {
                        class: TypeClass::Exception,
                        name: e.type_name.clone(),
                    },
                    value: UnoValue::Exception(e),
                };
                marshal::write_value(&mut body, &any.into(), &mut self.outbound.oids);
            }
            let msg = self.outbound.encode_reply(tid, true, &body);
            self.transport.send(&msg).await.unwrap();
        }

        /// Answers requestChange with an exception, as an old bridge would.
        async fn refuse_negotiation(&mut self) {
            let req = self.next_request().await;
            assert_eq!(req.oid, PROTOCOL_PROPERTIES_OID);
            assert_eq!(req.function_id, interface::request_change().index);
            self.raise(&req.tid, None).await;
        }

        /// Serves the whole bootstrap sequence.
        async fn serve_bootstrap(&mut self) {
            let req = self.next_request().await;
            assert_eq!(req.oid, names::INITIAL_CONTEXT);
            assert_eq!(req.function_id, 0);
            self.reply(&req.tid, Some(Any::interface(names::X_INTERFACE, "ctx").into()))
                .await;

            let req = self.next_request().await;
            assert_eq!(req.oid, "ctx");
            let mut body = req.body.clone();
            let wanted = marshal::read_value(&mut body, &Type::r#type(), &mut self.inbound.caches).unwrap();
            assert_eq!(wanted, UnoValue::Type(Type::interface(names::X_COMPONENT_CONTEXT)));
            self.reply(&req.tid, Some(Any::interface(names::X_COMPONENT_CONTEXT, "ctx").into()))
                .await;

            let req = self.next_request().await;
            assert_eq!(req.oid, "ctx");
            assert_eq!(req.function_id, interface::get_service_manager().index);
            self.reply(&req.tid, Some(UnoValue::Interface("smgr".into()))).await;

            let req = self.next_request().await;
            assert_eq!(req.oid, "smgr");
            let mut body = req.body.clone();
            let service = marshal::read_value(&mut body, &Type::string(), &mut self.inbound.caches).unwrap();
            assert_eq!(service.as_str(), Some(names::SERVICE_DESKTOP));
            self.reply(&req.tid, Some(UnoValue::Interface("desktop".into()))).await;

            let req = self.next_request().await;
            assert_eq!(req.oid, "desktop");
            self.reply(&req.tid, Some(Any::interface(names::X_COMPONENT_LOADER, "desktop").into()))
                .await;
        }
    }

    #[tokio::test]
    async fn test_bootstrap_against_fake_office() {
        let (client, mut office) = FakeOffice::pair();
        let server = tokio::spawn(async move {
            office.refuse_negotiation().await;
            office.serve_bootstrap().await;
        });

        let mut conn = UrpConnection::handshake(client).await.unwrap();
        assert!(!conn.current_context_mode());
        let boot = conn.bootstrap().await.unwrap();
        server.await.unwrap();

        assert_eq!(boot.context.oid, "ctx");
        assert_eq!(boot.service_manager.oid, "smgr");
        assert_eq!(boot.desktop, UnoProxy::new("desktop", Type::interface(names::X_COMPONENT_LOADER)));
    }

    #[tokio::test]
    async fn test_negotiation_commit_from_peer() {
        let (client, mut office) = FakeOffice::pair();
        let server = tokio::spawn(async move {
            let req = office.next_request().await;
            // We always lose, then commit ourselves.
            office.reply(&req.tid, Some(UnoValue::Long(0))).await;

            let mut body = BytesMut::new();
            marshal::write_value(&mut body, &UnoValue::Sequence(vec![]), &mut office.outbound.oids);
            let commit = office.outbound.encode_request(
                interface::commit_change().index,
                &Type::interface(names::X_PROTOCOL_PROPERTIES),
                PROTOCOL_PROPERTIES_OID,
                b"office-tid",
                true,
                &body,
            );
            office.transport.send(&commit).await.unwrap();
            let data = office.transport.recv().await.unwrap();
            assert!(matches!(office.inbound.decode(data).unwrap(), Message::Reply(_)));
        });

        let conn = UrpConnection::handshake(client).await.unwrap();
        server.await.unwrap();
        assert!(conn.current_context_mode());
    }

    #[tokio::test]
    async fn test_remote_exception_surfaces() {
        let (client, mut office) = FakeOffice::pair();
        let server = tokio::spawn(async move {
            office.refuse_negotiation().await;
            let req = office.next_request().await;
            office
                .raise(
                    &req.tid,
                    Some(UnoException {
                        type_name: "com.sun.star.lang.IllegalArgumentException".into(),
                        message: "Unsupported URL".into(),
                    }),
                )
                .await;
        });

        let mut conn = UrpConnection::handshake(client).await.unwrap();
        let desktop = UnoProxy::new("desktop", Type::interface(names::X_COMPONENT_LOADER));
        let err = conn
            .call(
                &desktop,
                &interface::load_component_from_url(),
                &[
                    UnoValue::String("file:///nowhere".into()),
                    UnoValue::String("_blank".into()),
                    UnoValue::Long(0),
                    UnoValue::Sequence(vec![]),
                ],
            )
            .await
            .unwrap_err();
        server.await.unwrap();

        match err {
            UrpError::RemoteException { type_name, message } => {
                assert_eq!(type_name, "com.sun.star.lang.IllegalArgumentException");
                assert_eq!(message, "Unsupported URL");
            }
            other => panic!("expected remote exception, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_arity_is_checked_before_sending() {
        let (client, mut office) = FakeOffice::pair();
        let server = tokio::spawn(async move { office.refuse_negotiation().await });
        let mut conn = UrpConnection::handshake(client).await.unwrap();
        server.await.unwrap();

        let target = UnoProxy::new("ctx", Type::interface(names::X_COMPONENT_CONTEXT));
        let err = conn
            .call(&target, &interface::get_service_manager(), &[UnoValue::Long(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, UrpError::Arity { expected: 0, actual: 1, .. }));
    }
}
