//! Frame dispatch: the ordered handler list and its handler variants.
//!
//! Every inbound frame is offered to the handlers in insertion order. A
//! handler answers with a [`HandlerAction`]: `remove` splices it out of the
//! list, `stop` ends the walk so later handlers never see the frame. Event
//! handlers are installed at construction and therefore sit ahead of every
//! per-request handler; a subscriber always sees its event even while a
//! request is waiting on an unrelated frame.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::event::{DecodeFn, EventDispatcher};
use crate::protocol::command::{Command, CommandType};
use crate::protocol::frame::Frame;
use crate::protocol::parser;

/// What a handler wants done after seeing a frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HandlerAction {
    /// Do not offer this frame to handlers further down the list.
    pub stop: bool,
    /// Remove this handler from the list; it will not be called again.
    pub remove: bool,
}

impl HandlerAction {
    const PASS: Self = Self {
        stop: false,
        remove: false,
    };
    const CLAIM: Self = Self {
        stop: true,
        remove: true,
    };
}

/// An entry of the dispatch list.
pub(crate) enum Handler {
    /// Tracks one outstanding synchronous request.
    Request(RequestHandler),
    /// Waits for one specific frame, optionally bounded by a timer.
    Waiter(WaiterHandler),
    /// Permanent decoder for one event kind.
    Event(EventHandler),
}

impl Handler {
    pub(crate) fn on_frame(&mut self, frame: &Frame) -> HandlerAction {
        match self {
            Self::Request(handler) => handler.on_frame(frame),
            Self::Waiter(handler) => handler.on_frame(frame),
            Self::Event(handler) => handler.on_frame(frame),
        }
    }

    /// Token of the tracked request, if this is a request handler.
    pub(crate) fn request_token(&self) -> Option<u64> {
        match self {
            Self::Request(handler) => Some(handler.token),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_waiter(&self) -> bool {
        matches!(self, Self::Waiter(_))
    }
}

/// Offers a frame to every handler in insertion order.
///
/// Frames nobody claims are logged and discarded.
pub(crate) fn dispatch(handlers: &mut Vec<Handler>, frame: &Frame) {
    let mut index = 0;
    while index < handlers.len() {
        let action = handlers[index].on_frame(frame);
        if action.remove {
            handlers.remove(index);
        } else {
            index += 1;
        }
        if action.stop {
            return;
        }
    }
    tracing::debug!(
        "unhandled frame {:?} {} [{}]",
        frame.kind,
        frame.command,
        hex::encode(&frame.payload)
    );
}

/// Tracks one outstanding SREQ until its SRSP (or a correlated
/// `RPC_Error`) arrives.
pub(crate) struct RequestHandler {
    pub(crate) token: u64,
    accepted: Vec<Command>,
    slot: Option<oneshot::Sender<Result<Bytes>>>,
}

impl RequestHandler {
    pub(crate) fn new(
        token: u64,
        accepted: Vec<Command>,
        slot: oneshot::Sender<Result<Bytes>>,
    ) -> Self {
        Self {
            token,
            accepted,
            slot: Some(slot),
        }
    }

    fn complete(&mut self, result: Result<Bytes>) {
        if let Some(slot) = self.slot.take() {
            // The caller may have gone away; nobody is left to care.
            let _ = slot.send(result);
        }
    }

    fn on_frame(&mut self, frame: &Frame) -> HandlerAction {
        if frame.kind != CommandType::Srsp {
            return HandlerAction::PASS;
        }

        // Normal response.
        if self.accepted.contains(&frame.command) {
            self.complete(Ok(frame.payload.clone()));
            return HandlerAction::CLAIM;
        }

        // Possible RPC_Error response. The payload names the refused
        // command; only an error for one of our accepted commands is ours.
        if frame.command == Command::RPC_ERROR {
            match parser::parse_rpc_error(&frame.payload) {
                Ok((code, kind, refused)) => {
                    if kind == CommandType::Sreq && self.accepted.contains(&refused) {
                        self.complete(Err(Error::Rpc { code }));
                        return HandlerAction::CLAIM;
                    }
                }
                Err(err) => {
                    tracing::debug!("unable to parse RPC_Error payload: {}", err);
                }
            }
        }

        HandlerAction::PASS
    }
}

/// Shared state between a waiter's list entry and its timer task.
pub(crate) struct WaiterSlot {
    /// False once either the timer fired or a frame matched.
    pub(crate) active: bool,
    pub(crate) slot: Option<oneshot::Sender<Result<Bytes>>>,
}

/// Waits for one frame of a given type and command, whose payload starts
/// with a given prefix.
pub(crate) struct WaiterHandler {
    kind: CommandType,
    command: Command,
    prefix: Vec<u8>,
    shared: Arc<Mutex<WaiterSlot>>,
}

impl WaiterHandler {
    pub(crate) fn new(
        kind: CommandType,
        command: Command,
        prefix: Vec<u8>,
        shared: Arc<Mutex<WaiterSlot>>,
    ) -> Self {
        Self {
            kind,
            command,
            prefix,
            shared,
        }
    }

    fn on_frame(&mut self, frame: &Frame) -> HandlerAction {
        let mut shared = self.shared.lock().expect("waiter slot poisoned");
        if !shared.active {
            // Timer fired already; leave the list on the next visit.
            return HandlerAction {
                stop: false,
                remove: true,
            };
        }

        let matches = frame.kind == self.kind
            && frame.command == self.command
            && frame.payload.starts_with(&self.prefix);
        if !matches {
            return HandlerAction::PASS;
        }

        shared.active = false;
        // With a prefix, the matched bytes are already known to the
        // caller; hand back only the remainder.
        let value = if self.prefix.is_empty() {
            frame.payload.clone()
        } else {
            frame.payload.slice(self.prefix.len()..)
        };
        if let Some(slot) = shared.slot.take() {
            let _ = slot.send(Ok(value));
        }
        HandlerAction::CLAIM
    }
}

/// Permanent decoder for one AREQ event kind.
///
/// On a decode failure the frame is deliberately left unclaimed so later
/// diagnostic handlers can still see it.
pub(crate) struct EventHandler {
    command: Command,
    allow_partial: bool,
    decode: DecodeFn,
    dispatcher: EventDispatcher,
}

impl EventHandler {
    pub(crate) fn new(
        command: Command,
        allow_partial: bool,
        decode: DecodeFn,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            command,
            allow_partial,
            decode,
            dispatcher,
        }
    }

    fn on_frame(&mut self, frame: &Frame) -> HandlerAction {
        if frame.kind != CommandType::Areq || frame.command != self.command {
            return HandlerAction::PASS;
        }
        match (self.decode)(&frame.payload, self.allow_partial) {
            Ok(event) => {
                self.dispatcher.dispatch(event);
                HandlerAction {
                    stop: true,
                    remove: false,
                }
            }
            Err(err) => {
                tracing::warn!("failed to decode {} event: {}", frame.command, err);
                HandlerAction::PASS
            }
        }
    }
}

/// An installed waiter's completion, resolved by the matching frame or the
/// timer, whichever comes first.
pub struct PendingFrame {
    rx: oneshot::Receiver<Result<Bytes>>,
}

impl PendingFrame {
    pub(crate) fn new(rx: oneshot::Receiver<Result<Bytes>>) -> Self {
        Self { rx }
    }
}

impl Future for PendingFrame {
    type Output = Result<Bytes>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx).poll(cx).map(|received| {
            match received {
                Ok(result) => result,
                // The handler list was torn down under us.
                Err(_) => Err(Error::ChannelClosed),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::command::{SysCommand, ZdoCommand};

    fn srsp(command: impl Into<Command>, payload: &'static [u8]) -> Frame {
        Frame::new(CommandType::Srsp, command, Bytes::from_static(payload))
    }

    fn request(
        accepted: Vec<Command>,
    ) -> (Handler, oneshot::Receiver<Result<Bytes>>) {
        let (tx, rx) = oneshot::channel();
        (Handler::Request(RequestHandler::new(0, accepted, tx)), rx)
    }

    #[test]
    fn test_first_registered_request_wins() {
        let ping = Command::from(SysCommand::Ping);
        let (first, mut first_rx) = request(vec![ping]);
        let (second, mut second_rx) = request(vec![ping]);
        let mut handlers = vec![first, second];

        dispatch(&mut handlers, &srsp(SysCommand::Ping, &[0x79, 0x00]));

        assert_eq!(handlers.len(), 1);
        let payload = first_rx.try_recv().unwrap().unwrap();
        assert_eq!(&payload[..], &[0x79, 0x00]);
        assert!(second_rx.try_recv().is_err());

        // The remaining handler picks up the next response.
        dispatch(&mut handlers, &srsp(SysCommand::Ping, &[0x79, 0x00]));
        assert!(handlers.is_empty());
        assert!(second_rx.try_recv().unwrap().is_ok());
    }

    #[test]
    fn test_rpc_error_correlation() {
        let leave = Command::from(ZdoCommand::MgmtLeaveReq);
        let (handler, mut rx) = request(vec![leave]);
        let mut handlers = vec![handler];

        // RPC_Error naming a different command passes through.
        dispatch(
            &mut handlers,
            &srsp(Command::RPC_ERROR, &[0x02, 0x25, 0x35]),
        );
        assert_eq!(handlers.len(), 1);
        assert!(rx.try_recv().is_err());

        // RPC_Error naming an AREQ (not an SREQ) passes through too.
        dispatch(
            &mut handlers,
            &srsp(Command::RPC_ERROR, &[0x02, 0x45, 0x34]),
        );
        assert_eq!(handlers.len(), 1);

        // Malformed RPC_Error payload is treated as unclaimed.
        dispatch(&mut handlers, &srsp(Command::RPC_ERROR, &[0x02]));
        assert_eq!(handlers.len(), 1);

        // The matching error claims the request.
        dispatch(
            &mut handlers,
            &srsp(Command::RPC_ERROR, &[0x02, 0x25, 0x34]),
        );
        assert!(handlers.is_empty());
        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(Error::Rpc { code: 2 })
        ));
    }

    #[test]
    fn test_waiter_prefix_semantics() {
        let bind_rsp = Command::from(ZdoCommand::BindRsp);
        let (tx, mut rx) = oneshot::channel();
        let shared = Arc::new(Mutex::new(WaiterSlot {
            active: true,
            slot: Some(tx),
        }));
        let mut handlers = vec![Handler::Waiter(WaiterHandler::new(
            CommandType::Areq,
            bind_rsp,
            vec![0x34, 0x12],
            shared,
        ))];

        // Prefix mismatch passes.
        let wrong = Frame::new(
            CommandType::Areq,
            bind_rsp,
            Bytes::from_static(&[0x99, 0x12, 0x00]),
        );
        dispatch(&mut handlers, &wrong);
        assert_eq!(handlers.len(), 1);

        // Match strips the prefix from the completion value.
        let right = Frame::new(
            CommandType::Areq,
            bind_rsp,
            Bytes::from_static(&[0x34, 0x12, 0x00]),
        );
        dispatch(&mut handlers, &right);
        assert!(handlers.is_empty());
        assert_eq!(&rx.try_recv().unwrap().unwrap()[..], &[0x00]);
    }

    #[test]
    fn test_waiter_without_prefix_returns_whole_payload() {
        let confirm = Command::from(crate::protocol::command::AfCommand::DataConfirm);
        let (tx, mut rx) = oneshot::channel();
        let shared = Arc::new(Mutex::new(WaiterSlot {
            active: true,
            slot: Some(tx),
        }));
        let mut handlers = vec![Handler::Waiter(WaiterHandler::new(
            CommandType::Areq,
            confirm,
            Vec::new(),
            shared,
        ))];

        let frame = Frame::new(
            CommandType::Areq,
            confirm,
            Bytes::from_static(&[0x00, 0x01, 0x42]),
        );
        dispatch(&mut handlers, &frame);
        assert_eq!(&rx.try_recv().unwrap().unwrap()[..], &[0x00, 0x01, 0x42]);
    }

    #[test]
    fn test_expired_waiter_removes_itself_without_claiming() {
        let confirm = Command::from(crate::protocol::command::AfCommand::DataConfirm);
        let shared = Arc::new(Mutex::new(WaiterSlot {
            active: false,
            slot: None,
        }));
        let (fallback, mut fallback_rx) = request(vec![confirm]);
        let mut handlers = vec![
            Handler::Waiter(WaiterHandler::new(
                CommandType::Areq,
                confirm,
                Vec::new(),
                shared,
            )),
            fallback,
        ];

        let frame = Frame::new(CommandType::Srsp, confirm, Bytes::from_static(&[0x00]));
        dispatch(&mut handlers, &frame);

        // The dead waiter left the list and the frame went on to the
        // next handler.
        assert_eq!(handlers.len(), 0);
        assert!(fallback_rx.try_recv().unwrap().is_ok());
    }

    #[test]
    fn test_event_handler_stays_installed() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe(None);
        let regs = crate::event::registrations();
        let (command, allow_partial, decode) = regs[4]; // PERMIT_JOIN_IND
        let mut handlers = vec![Handler::Event(EventHandler::new(
            command,
            allow_partial,
            decode,
            dispatcher,
        ))];

        let frame = Frame::new(CommandType::Areq, command, Bytes::from_static(&[0x3C]));
        dispatch(&mut handlers, &frame);
        dispatch(&mut handlers, &frame);
        assert_eq!(handlers.len(), 1);

        // Both deliveries reached the subscriber.
        for _ in 0..2 {
            let event = block_on(sub.recv()).unwrap();
            assert!(matches!(
                event,
                crate::event::Event::PermitJoin { duration: 0x3C }
            ));
        }
    }

    #[test]
    fn test_event_decode_failure_leaves_frame_unclaimed() {
        let dispatcher = EventDispatcher::new(16);
        let regs = crate::event::registrations();
        let (command, allow_partial, decode) = regs[1]; // STATE_CHANGE_IND
        let (tx, mut rx) = oneshot::channel();
        let shared = Arc::new(Mutex::new(WaiterSlot {
            active: true,
            slot: Some(tx),
        }));
        let mut handlers = vec![
            Handler::Event(EventHandler::new(command, allow_partial, decode, dispatcher)),
            Handler::Waiter(WaiterHandler::new(
                CommandType::Areq,
                command,
                Vec::new(),
                shared,
            )),
        ];

        // Two bytes where one is expected: decode fails, the frame passes
        // on to the diagnostic waiter behind the event handler.
        let frame = Frame::new(CommandType::Areq, command, Bytes::from_static(&[0x01, 0x02]));
        dispatch(&mut handlers, &frame);
        assert_eq!(&rx.try_recv().unwrap().unwrap()[..], &[0x01, 0x02]);
    }

    /// Minimal block_on for driving a ready future in sync tests.
    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }
}
