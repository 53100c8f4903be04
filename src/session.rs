//! AgentX session: Open / Register / Unregister / Close, and translation of
//! master-initiated Get, GetNext and GetBulk PDUs into handler calls.
//!
//! A session moves `Created -> Opened -> Registered -> Unregistered ->
//! Closed`. The Open and Register frames are cached and replayed verbatim
//! when the connection is re-established; the master assigns a fresh
//! session id on every (re)open.

use crate::client::dispatch::{Command, DispatchHandle};
use crate::error::{AgentxStatus, Error, Result};
use crate::handler::Handler;
use crate::oid::Oid;
use crate::pdu::{
    Close, CloseReason, Frame, Get, GetBulk, GetNext, Header, Open, Pdu, PduType, Register,
    Response, Timeout, Unregister,
};
use crate::value::Value;
use crate::varbind::VarBind;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A session with the master agent.
///
/// Created via [`Client::session`]; cheap to clone through the underlying
/// `Arc`.
///
/// [`Client::session`]: crate::client::Client::session
pub struct Session {
    core: Arc<SessionCore>,
}

impl Session {
    pub(crate) fn new(core: Arc<SessionCore>) -> Self {
        Self { core }
    }

    /// The master-assigned session id. Changes after a reconnect.
    pub fn id(&self) -> u32 {
        self.core.session_id()
    }

    /// Claim the OID region rooted at `subtree` with the given priority
    /// (lower wins when registrations overlap; 127 is the customary
    /// default).
    ///
    /// A session holds at most one registration; registering again without
    /// an intervening [`unregister`](Self::unregister) fails with
    /// [`Error::AlreadyRegistered`].
    pub async fn register(&self, priority: u8, subtree: Oid) -> Result<()> {
        self.core.register(priority, subtree).await
    }

    /// Release the registration made with [`register`](Self::register).
    ///
    /// Fails with [`Error::NotRegistered`] when the session holds no
    /// registration. Registering again afterwards is permitted.
    pub async fn unregister(&self, priority: u8, subtree: Oid) -> Result<()> {
        self.core.unregister(priority, subtree).await
    }

    /// Tear down the session with an orderly Close.
    pub async fn close(&self) -> Result<()> {
        self.core.close().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.core.session_id())
            .finish()
    }
}

/// Shared session state, reachable from the public [`Session`] handle and
/// from the dispatcher's session table.
pub(crate) struct SessionCore {
    handle: DispatchHandle,
    handler: Option<Arc<dyn Handler>>,
    session_id: AtomicU32,
    /// When the current Open completed; feeds the Response uptime field.
    opened_at: Mutex<Instant>,
    open_frame: Mutex<Option<Frame>>,
    register_frame: Mutex<Option<Frame>>,
}

impl SessionCore {
    /// Open a session: send the Open PDU and adopt the assigned id.
    pub(crate) async fn open(
        handle: DispatchHandle,
        name_oid: Oid,
        name: &str,
        handler: Option<Arc<dyn Handler>>,
    ) -> Result<Arc<Self>> {
        let timeout = Timeout {
            duration: handle.timeout().unwrap_or(Duration::ZERO),
            priority: 0,
        };
        let core = Arc::new(Self {
            handle,
            handler,
            session_id: AtomicU32::new(0),
            opened_at: Mutex::new(Instant::now()),
            open_frame: Mutex::new(None),
            register_frame: Mutex::new(None),
        });

        let frame = Frame::new(
            Header::new(PduType::Open),
            Pdu::Open(Open {
                timeout,
                id: name_oid,
                description: name.to_string(),
            }),
        );
        let response = core.request(frame.clone()).await?;
        check_error(&response)?;

        core.session_id
            .store(response.header.session_id, Ordering::SeqCst);
        *core.opened_at.lock().unwrap() = Instant::now();
        *core.open_frame.lock().unwrap() = Some(frame);
        Ok(core)
    }

    pub(crate) fn session_id(&self) -> u32 {
        self.session_id.load(Ordering::SeqCst)
    }

    async fn register(&self, priority: u8, subtree: Oid) -> Result<()> {
        if self.register_frame.lock().unwrap().is_some() {
            return Err(Error::AlreadyRegistered.boxed());
        }

        let frame = Frame::new(
            Header::new(PduType::Register),
            Pdu::Register(Register {
                timeout: Timeout {
                    duration: self.handle.timeout().unwrap_or(Duration::ZERO),
                    priority,
                },
                subtree,
            }),
        );
        let response = self.request(frame.clone()).await?;
        check_error(&response)?;

        *self.register_frame.lock().unwrap() = Some(frame);
        Ok(())
    }

    async fn unregister(&self, priority: u8, subtree: Oid) -> Result<()> {
        if self.register_frame.lock().unwrap().is_none() {
            return Err(Error::NotRegistered.boxed());
        }

        let frame = Frame::new(
            Header::new(PduType::Unregister),
            Pdu::Unregister(Unregister {
                timeout: Timeout {
                    duration: self.handle.timeout().unwrap_or(Duration::ZERO),
                    priority,
                },
                subtree,
            }),
        );
        let response = self.request(frame).await?;
        check_error(&response)?;

        *self.register_frame.lock().unwrap() = None;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let frame = Frame::new(
            Header::new(PduType::Close),
            Pdu::Close(Close {
                reason: CloseReason::Shutdown,
            }),
        );
        let response = self.request(frame).await?;
        check_error(&response)?;

        let _ = self
            .handle
            .send(Command::RemoveSession {
                id: self.session_id(),
            })
            .await;
        Ok(())
    }

    /// Replay the cached Open (adopting a fresh session id) and then the
    /// cached Register, if any. Called off the dispatcher task after a
    /// reconnect.
    pub(crate) async fn reopen(&self) -> Result<()> {
        let open = self.open_frame.lock().unwrap().clone();
        if let Some(frame) = open {
            let response = self.request(frame).await?;
            check_error(&response)?;
            self.session_id
                .store(response.header.session_id, Ordering::SeqCst);
            *self.opened_at.lock().unwrap() = Instant::now();
        }

        let register = self.register_frame.lock().unwrap().clone();
        if let Some(frame) = register {
            let response = self.request(frame).await?;
            check_error(&response)?;
        }
        Ok(())
    }

    /// Stamp the current session id and issue the request.
    async fn request(&self, mut frame: Frame) -> Result<Frame> {
        frame.header.session_id = self.session_id();
        self.handle.request(frame).await
    }

    /// Centiseconds since the current Open completed.
    fn uptime_centiseconds(&self) -> u32 {
        let elapsed = self.opened_at.lock().unwrap().elapsed();
        (elapsed.as_millis() / 10).min(u32::MAX as u128) as u32
    }

    /// Handle a master-initiated PDU and build the Response frame.
    ///
    /// Runs on the dispatcher task between frames; must not block.
    pub(crate) fn handle_frame(&self, header: &Header, pdu: &Pdu) -> Frame {
        let mut response_header = Header::new(PduType::Response);
        response_header.session_id = header.session_id;
        response_header.transaction_id = header.transaction_id;
        response_header.packet_id = header.packet_id;
        // Responses go out little-endian like everything else we send.
        response_header.flags = 0;

        let mut response = Response {
            sys_uptime: self.uptime_centiseconds(),
            ..Default::default()
        };

        match pdu {
            Pdu::Get(get) => self.handle_get(get, &mut response),
            Pdu::GetNext(get_next) => self.handle_get_next(get_next, &mut response),
            Pdu::GetBulk(get_bulk) => self.handle_get_bulk(get_bulk, &mut response),
            other => {
                tracing::error!(
                    target: "async_agentx::session",
                    packet_type = %other.pdu_type(),
                    "unable to handle packet",
                );
                response.error = AgentxStatus::ProcessingError;
            }
        }

        Frame::new(response_header, Pdu::Response(response))
    }

    fn handle_get(&self, get: &Get, response: &mut Response) {
        let Some(handler) = &self.handler else {
            tracing::warn!(
                target: "async_agentx::session",
                "no handler for session specified",
            );
            for range in &get.ranges {
                response.varbinds.push(VarBind::null(range.from.clone()));
            }
            return;
        };

        // One varbind per requested OID, in request order.
        for range in &get.ranges {
            match handler.get(&range.from) {
                Ok(Some((oid, value))) => response.varbinds.push(VarBind::new(oid, value)),
                Ok(None) => response
                    .varbinds
                    .push(VarBind::new(range.from.clone(), Value::NoSuchObject)),
                Err(err) => {
                    tracing::error!(
                        target: "async_agentx::session",
                        error = %err,
                        "handler error",
                    );
                    response.error = AgentxStatus::ProcessingError;
                    response
                        .varbinds
                        .push(VarBind::new(range.from.clone(), Value::NoSuchObject));
                }
            }
        }
    }

    fn handle_get_next(&self, get_next: &GetNext, response: &mut Response) {
        let Some(handler) = &self.handler else {
            tracing::warn!(
                target: "async_agentx::session",
                "no handler for session specified",
            );
            return;
        };

        for range in &get_next.ranges {
            match handler.get_next(&range.from, range.include, &range.to) {
                Ok(Some((oid, value))) => response.varbinds.push(VarBind::new(oid, value)),
                Ok(None) => response
                    .varbinds
                    .push(VarBind::new(range.from.clone(), Value::EndOfMibView)),
                Err(err) => {
                    tracing::error!(
                        target: "async_agentx::session",
                        error = %err,
                        "handler error",
                    );
                    response.error = AgentxStatus::ProcessingError;
                    response
                        .varbinds
                        .push(VarBind::new(range.from.clone(), Value::EndOfMibView));
                }
            }
        }
    }

    /// GetBulk yields exactly `min(N, K) + max(K - N, 0) * R` varbinds: one
    /// GetNext per non-repeater, then R walk rounds over the remaining
    /// ranges. A range that runs dry keeps contributing endOfMibView
    /// varbinds for the rounds left.
    fn handle_get_bulk(&self, get_bulk: &GetBulk, response: &mut Response) {
        let Some(handler) = &self.handler else {
            tracing::warn!(
                target: "async_agentx::session",
                "no handler for session specified",
            );
            return;
        };

        let total = get_bulk.ranges.len();
        let non_repeaters = (get_bulk.non_repeaters as usize).min(total);

        for range in &get_bulk.ranges[..non_repeaters] {
            match handler.get_next(&range.from, range.include, &range.to) {
                Ok(Some((oid, value))) => response.varbinds.push(VarBind::new(oid, value)),
                Ok(None) => response
                    .varbinds
                    .push(VarBind::new(range.from.clone(), Value::EndOfMibView)),
                Err(err) => {
                    tracing::error!(
                        target: "async_agentx::session",
                        error = %err,
                        "handler error",
                    );
                    response.error = AgentxStatus::ProcessingError;
                    response
                        .varbinds
                        .push(VarBind::new(range.from.clone(), Value::EndOfMibView));
                }
            }
        }

        let repeaters = &get_bulk.ranges[non_repeaters..];
        if repeaters.is_empty() || get_bulk.max_repetitions == 0 {
            return;
        }

        struct Cursor {
            from: Oid,
            include: bool,
            exhausted: bool,
        }
        let mut cursors: Vec<Cursor> = repeaters
            .iter()
            .map(|range| Cursor {
                from: range.from.clone(),
                include: range.include,
                exhausted: false,
            })
            .collect();

        for _ in 0..get_bulk.max_repetitions {
            for (cursor, range) in cursors.iter_mut().zip(repeaters) {
                if cursor.exhausted {
                    response
                        .varbinds
                        .push(VarBind::new(cursor.from.clone(), Value::EndOfMibView));
                    continue;
                }

                match handler.get_next(&cursor.from, cursor.include, &range.to) {
                    Ok(Some((oid, value))) => {
                        response.varbinds.push(VarBind::new(oid.clone(), value));
                        cursor.from = oid;
                        cursor.include = false;
                    }
                    Ok(None) => {
                        response
                            .varbinds
                            .push(VarBind::new(cursor.from.clone(), Value::EndOfMibView));
                        cursor.exhausted = true;
                        cursor.include = false;
                    }
                    Err(err) => {
                        tracing::error!(
                            target: "async_agentx::session",
                            error = %err,
                            "handler error",
                        );
                        response.error = AgentxStatus::ProcessingError;
                        response
                            .varbinds
                            .push(VarBind::new(cursor.from.clone(), Value::EndOfMibView));
                        cursor.exhausted = true;
                        cursor.include = false;
                    }
                }
            }
        }
    }
}

/// Convert a nonzero Response error into a failure. Non-Response bodies
/// count as success with no payload semantics.
fn check_error(frame: &Frame) -> Result<()> {
    if let Pdu::Response(response) = &frame.pdu {
        if !response.error.is_ok() {
            return Err(Error::Agentx {
                status: response.error,
            }
            .boxed());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list_handler::ListHandler;
    use crate::oid;
    use crate::pdu::SearchRange;
    use tokio::sync::mpsc;

    fn search_range(from: Oid, include: bool, to: Oid) -> SearchRange {
        SearchRange { from, include, to }
    }

    /// A core wired to a dangling dispatcher; only `handle_frame` is
    /// exercised, which never touches the channel.
    fn test_core(handler: Option<Arc<dyn Handler>>) -> SessionCore {
        let (cmd_tx, _cmd_rx) = mpsc::channel(1);
        SessionCore {
            handle: DispatchHandle::new(cmd_tx, None),
            handler,
            session_id: AtomicU32::new(7),
            opened_at: Mutex::new(Instant::now()),
            open_frame: Mutex::new(None),
            register_frame: Mutex::new(None),
        }
    }

    fn test_handler() -> Arc<dyn Handler> {
        let mut handler = ListHandler::new();
        *handler.add("1.3.6.1.4.1.45995.3.1").unwrap() = Value::octet_string("test");
        *handler.add("1.3.6.1.4.1.45995.3.3").unwrap() = Value::octet_string("test2");
        *handler.add("1.3.6.1.4.1.45995.3.5").unwrap() = Value::octet_string("test5");
        *handler.add("1.3.6.1.4.1.45995.3.7").unwrap() = Value::octet_string("test7");
        Arc::new(handler)
    }

    fn request_header(ty: PduType) -> Header {
        let mut header = Header::new(ty);
        header.session_id = 7;
        header.transaction_id = 99;
        header.packet_id = 1234;
        header
    }

    fn response_of(frame: Frame) -> (Header, Response) {
        match frame.pdu {
            Pdu::Response(response) => (frame.header, response),
            other => panic!("expected a response, got {:?}", other),
        }
    }

    #[test]
    fn test_response_header_mirrors_request() {
        let core = test_core(Some(test_handler()));
        let header = request_header(PduType::Get);
        let frame = core.handle_frame(&header, &Pdu::Get(Get { ranges: vec![] }));
        let (response_header, _) = response_of(frame);
        assert_eq!(response_header.session_id, 7);
        assert_eq!(response_header.transaction_id, 99);
        assert_eq!(response_header.packet_id, 1234);
        assert_eq!(response_header.flags, 0);
        assert_eq!(response_header.ty, PduType::Response);
    }

    #[test]
    fn test_get_miss_returns_no_such_object() {
        // Scenario: Get on an empty handler answers noSuchObject per range.
        let core = test_core(Some(Arc::new(ListHandler::new())));
        let target = oid!(1, 3, 6, 1, 4, 1, 45995, 3, 1);
        let pdu = Pdu::Get(Get {
            ranges: vec![search_range(target.clone(), false, Oid::empty())],
        });
        let (_, response) = response_of(core.handle_frame(&request_header(PduType::Get), &pdu));
        assert_eq!(response.error, AgentxStatus::NoAgentxError);
        assert_eq!(response.varbinds.len(), 1);
        assert_eq!(response.varbinds[0].oid, target);
        assert_eq!(response.varbinds[0].value, Value::NoSuchObject);
    }

    #[test]
    fn test_get_hit() {
        let core = test_core(Some(test_handler()));
        let target = oid!(1, 3, 6, 1, 4, 1, 45995, 3, 1);
        let pdu = Pdu::Get(Get {
            ranges: vec![search_range(target.clone(), false, Oid::empty())],
        });
        let (_, response) = response_of(core.handle_frame(&request_header(PduType::Get), &pdu));
        assert_eq!(response.varbinds.len(), 1);
        assert_eq!(response.varbinds[0].oid, target);
        assert_eq!(response.varbinds[0].value.as_str(), Some("test"));
    }

    #[test]
    fn test_get_multiple_ranges_keep_order() {
        let core = test_core(Some(test_handler()));
        let pdu = Pdu::Get(Get {
            ranges: vec![
                search_range(oid!(1, 3, 6, 1, 4, 1, 45995, 3, 3), false, Oid::empty()),
                search_range(oid!(1, 3, 6, 1, 4, 1, 45995, 3, 2), false, Oid::empty()),
                search_range(oid!(1, 3, 6, 1, 4, 1, 45995, 3, 1), false, Oid::empty()),
            ],
        });
        let (_, response) = response_of(core.handle_frame(&request_header(PduType::Get), &pdu));
        assert_eq!(response.varbinds.len(), 3);
        assert_eq!(response.varbinds[0].value.as_str(), Some("test2"));
        assert_eq!(response.varbinds[1].value, Value::NoSuchObject);
        assert_eq!(response.varbinds[2].value.as_str(), Some("test"));
    }

    #[test]
    fn test_get_next_at_boundary() {
        // Scenario: GetNext from ..3.0 exclusive finds ..3.1.
        let core = test_core(Some(test_handler()));
        let pdu = Pdu::GetNext(GetNext {
            ranges: vec![search_range(
                oid!(1, 3, 6, 1, 4, 1, 45995, 3, 0),
                false,
                Oid::empty(),
            )],
        });
        let (_, response) =
            response_of(core.handle_frame(&request_header(PduType::GetNext), &pdu));
        assert_eq!(response.varbinds.len(), 1);
        assert_eq!(response.varbinds[0].oid, oid!(1, 3, 6, 1, 4, 1, 45995, 3, 1));
        assert_eq!(response.varbinds[0].value.as_str(), Some("test"));
    }

    #[test]
    fn test_get_next_exhausted() {
        // Scenario: GetNext past the last OID answers endOfMibView.
        let core = test_core(Some(test_handler()));
        let from = oid!(1, 3, 6, 1, 4, 1, 45995, 3, 7);
        let pdu = Pdu::GetNext(GetNext {
            ranges: vec![search_range(from.clone(), false, Oid::empty())],
        });
        let (_, response) =
            response_of(core.handle_frame(&request_header(PduType::GetNext), &pdu));
        assert_eq!(response.varbinds.len(), 1);
        assert_eq!(response.varbinds[0].oid, from);
        assert_eq!(response.varbinds[0].value, Value::EndOfMibView);
    }

    #[test]
    fn test_get_bulk_walk_single_range() {
        // Scenario: one range, 10 repetitions over 4 entries: the walk
        // yields all 4 values and then pads with endOfMibView.
        let core = test_core(Some(test_handler()));
        let pdu = Pdu::GetBulk(GetBulk {
            non_repeaters: 0,
            max_repetitions: 10,
            ranges: vec![search_range(
                oid!(1, 3, 6, 1, 4, 1, 45995, 3),
                false,
                Oid::empty(),
            )],
        });
        let (_, response) =
            response_of(core.handle_frame(&request_header(PduType::GetBulk), &pdu));
        assert_eq!(response.varbinds.len(), 10);

        let values: Vec<_> = response.varbinds[..4]
            .iter()
            .map(|vb| vb.value.as_str().unwrap().to_string())
            .collect();
        assert_eq!(values, ["test", "test2", "test5", "test7"]);
        for window in response.varbinds[..4].windows(2) {
            assert!(window[0].oid < window[1].oid);
        }
        for vb in &response.varbinds[4..] {
            assert_eq!(vb.value, Value::EndOfMibView);
            assert_eq!(vb.oid, oid!(1, 3, 6, 1, 4, 1, 45995, 3, 7));
        }
    }

    #[test]
    fn test_get_bulk_non_repeater_plus_repeater() {
        // Scenario: ranges [..3.0, ..3.1], N=1, R=1: the non-repeater block
        // answers ..3.1, the single repetition answers ..3.3.
        let core = test_core(Some(test_handler()));
        let pdu = Pdu::GetBulk(GetBulk {
            non_repeaters: 1,
            max_repetitions: 1,
            ranges: vec![
                search_range(oid!(1, 3, 6, 1, 4, 1, 45995, 3, 0), false, Oid::empty()),
                search_range(oid!(1, 3, 6, 1, 4, 1, 45995, 3, 1), false, Oid::empty()),
            ],
        });
        let (_, response) =
            response_of(core.handle_frame(&request_header(PduType::GetBulk), &pdu));
        assert_eq!(response.varbinds.len(), 2);
        assert_eq!(response.varbinds[0].oid, oid!(1, 3, 6, 1, 4, 1, 45995, 3, 1));
        assert_eq!(response.varbinds[0].value.as_str(), Some("test"));
        assert_eq!(response.varbinds[1].oid, oid!(1, 3, 6, 1, 4, 1, 45995, 3, 3));
        assert_eq!(response.varbinds[1].value.as_str(), Some("test2"));
    }

    #[test]
    fn test_get_bulk_varbind_arithmetic() {
        // K ranges, N non-repeaters, R repetitions: always
        // min(N,K) + max(K-N,0)*R varbinds.
        let core = test_core(Some(test_handler()));
        let range = || search_range(oid!(1, 3, 6, 1, 4, 1, 45995, 3), false, Oid::empty());
        let cases = [
            (0u16, 0u16, 3usize, 0usize),
            (0, 2, 3, 6),
            (1, 2, 3, 5),
            (3, 5, 3, 3),
            (7, 2, 3, 3), // N clamped to K
        ];
        for (n, r, k, expected) in cases {
            let pdu = Pdu::GetBulk(GetBulk {
                non_repeaters: n,
                max_repetitions: r,
                ranges: (0..k).map(|_| range()).collect(),
            });
            let (_, response) =
                response_of(core.handle_frame(&request_header(PduType::GetBulk), &pdu));
            assert_eq!(
                response.varbinds.len(),
                expected,
                "N={} R={} K={}",
                n,
                r,
                k
            );
        }
    }

    #[test]
    fn test_get_bulk_zero_repetitions_only_non_repeaters() {
        let core = test_core(Some(test_handler()));
        let pdu = Pdu::GetBulk(GetBulk {
            non_repeaters: 1,
            max_repetitions: 0,
            ranges: vec![
                search_range(oid!(1, 3, 6, 1, 4, 1, 45995, 3, 0), false, Oid::empty()),
                search_range(oid!(1, 3, 6, 1, 4, 1, 45995, 3, 1), false, Oid::empty()),
            ],
        });
        let (_, response) =
            response_of(core.handle_frame(&request_header(PduType::GetBulk), &pdu));
        assert_eq!(response.varbinds.len(), 1);
    }

    #[test]
    fn test_get_without_handler_answers_null() {
        let core = test_core(None);
        let target = oid!(1, 3, 6, 1, 4, 1, 45995, 3, 1);
        let pdu = Pdu::Get(Get {
            ranges: vec![search_range(target.clone(), false, Oid::empty())],
        });
        let (_, response) = response_of(core.handle_frame(&request_header(PduType::Get), &pdu));
        assert_eq!(response.varbinds.len(), 1);
        assert_eq!(response.varbinds[0].oid, target);
        assert_eq!(response.varbinds[0].value, Value::Null);
    }

    #[test]
    fn test_get_next_without_handler_answers_empty() {
        let core = test_core(None);
        let pdu = Pdu::GetNext(GetNext {
            ranges: vec![search_range(oid!(1, 3), false, Oid::empty())],
        });
        let (_, response) =
            response_of(core.handle_frame(&request_header(PduType::GetNext), &pdu));
        assert!(response.varbinds.is_empty());
        assert_eq!(response.error, AgentxStatus::NoAgentxError);
    }

    struct FailingHandler;

    impl Handler for FailingHandler {
        fn get(&self, _oid: &Oid) -> Result<Option<(Oid, Value)>> {
            Err(Error::Config("backend unavailable".into()).boxed())
        }

        fn get_next(
            &self,
            _from: &Oid,
            _include_from: bool,
            _to: &Oid,
        ) -> Result<Option<(Oid, Value)>> {
            Err(Error::Config("backend unavailable".into()).boxed())
        }
    }

    #[test]
    fn test_handler_error_sets_processing_but_keeps_index_alignment() {
        let core = test_core(Some(Arc::new(FailingHandler)));
        let pdu = Pdu::Get(Get {
            ranges: vec![
                search_range(oid!(1, 3, 1), false, Oid::empty()),
                search_range(oid!(1, 3, 2), false, Oid::empty()),
            ],
        });
        let (_, response) = response_of(core.handle_frame(&request_header(PduType::Get), &pdu));
        assert_eq!(response.error, AgentxStatus::ProcessingError);
        // Still one varbind per range so indexes line up with the request.
        assert_eq!(response.varbinds.len(), 2);
        assert_eq!(response.varbinds[0].oid, oid!(1, 3, 1));
        assert_eq!(response.varbinds[1].oid, oid!(1, 3, 2));
    }

    #[test]
    fn test_unexpected_pdu_answers_processing_error() {
        let core = test_core(Some(test_handler()));
        let pdu = Pdu::Close(Close {
            reason: CloseReason::Other,
        });
        let (_, response) = response_of(core.handle_frame(&request_header(PduType::Close), &pdu));
        assert_eq!(response.error, AgentxStatus::ProcessingError);
    }

    #[test]
    fn test_uptime_is_populated() {
        let core = test_core(Some(test_handler()));
        *core.opened_at.lock().unwrap() = Instant::now() - Duration::from_secs(3);
        let frame = core.handle_frame(
            &request_header(PduType::Get),
            &Pdu::Get(Get { ranges: vec![] }),
        );
        let (_, response) = response_of(frame);
        assert!(response.sys_uptime >= 300, "uptime {}", response.sys_uptime);
    }
}
