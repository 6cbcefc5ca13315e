//! Main [`ZnpApi`] mediator implementation.
//!
//! This module provides the high-level [`ZnpApi`] client that combines the
//! transport, the frame dispatch core and the event system into a unified
//! interface. The per-command wrappers live in [`crate::commands`].

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::dispatch::{
    Handler, PendingFrame, RequestHandler, WaiterHandler, WaiterSlot, dispatch,
};
use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher, EventFilter, EventKind, Subscription, registrations};
use crate::protocol::command::{Command, CommandType};
use crate::protocol::frame::Frame;
use crate::transport::serial::SerialConfig;
use crate::transport::{SerialTransport, Transport};
use crate::types::DeviceState;

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Builds the permanent event handlers, in registration order.
fn event_handlers(dispatcher: &EventDispatcher) -> Vec<Handler> {
    registrations()
        .into_iter()
        .map(|(command, allow_partial, decode)| {
            Handler::Event(crate::dispatch::EventHandler::new(
                command,
                allow_partial,
                decode,
                dispatcher.clone(),
            ))
        })
        .collect()
}

/// Client for driving a ZNP coordinator.
///
/// The mediator owns the handler list for the duration of its existence;
/// dropping it aborts the dispatch task and fails any outstanding
/// operation with [`Error::ChannelClosed`].
pub struct ZnpApi<T> {
    transport: Arc<Mutex<T>>,
    handlers: Arc<StdMutex<Vec<Handler>>>,
    dispatcher: EventDispatcher,
    next_token: AtomicU64,
    dispatch_task: Option<JoinHandle<()>>,
}

impl ZnpApi<SerialTransport> {
    /// Creates a new client for a serial port.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0")
    ///
    /// # Returns
    ///
    /// A new client (not yet connected).
    #[must_use]
    pub fn serial(port: impl Into<String>) -> Self {
        Self::with_serial_config(SerialConfig::new(port))
    }

    /// Creates a new client with custom serial configuration.
    #[must_use]
    pub fn with_serial_config(config: SerialConfig) -> Self {
        Self::new(SerialTransport::new(config))
    }
}

impl<T: Transport + 'static> ZnpApi<T> {
    /// Creates a new client with the given transport.
    ///
    /// The permanent event handlers are installed here, ahead of any
    /// per-request handler a later call may append.
    #[must_use]
    pub fn new(transport: T) -> Self {
        let dispatcher = EventDispatcher::new(EVENT_CHANNEL_CAPACITY);
        let handlers = Arc::new(StdMutex::new(event_handlers(&dispatcher)));

        Self {
            transport: Arc::new(Mutex::new(transport)),
            handlers,
            dispatcher,
            next_token: AtomicU64::new(1),
            dispatch_task: None,
        }
    }

    /// Connects the transport and starts the frame dispatch task.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to connect.
    pub async fn connect(&mut self) -> Result<()> {
        let frames = {
            let mut transport = self.transport.lock().await;
            transport.connect().await?;
            transport.take_frames().ok_or(Error::NotConnected)?
        };

        // Fresh list: permanent event handlers first, nothing else.
        *self.handlers.lock().expect("handler list poisoned") =
            event_handlers(&self.dispatcher);

        let handlers = Arc::clone(&self.handlers);
        self.dispatch_task = Some(tokio::spawn(async move {
            let mut frames = frames;
            while let Some(frame) = frames.recv().await {
                let mut list = handlers.lock().expect("handler list poisoned");
                dispatch(&mut list, &frame);
            }
            // Transport gone. Dropping the handlers drops their completion
            // slots, resolving every outstanding future.
            tracing::debug!("frame stream ended");
            handlers.lock().expect("handler list poisoned").clear();
        }));

        Ok(())
    }

    /// Disconnects from the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to shut down.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
        {
            let mut transport = self.transport.lock().await;
            transport.disconnect().await?;
        }
        self.handlers.lock().expect("handler list poisoned").clear();
        Ok(())
    }

    /// Returns true if connected.
    pub async fn is_connected(&self) -> bool {
        let transport = self.transport.lock().await;
        transport.is_connected()
    }

    /// Subscribes to all events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.dispatcher.subscribe(None)
    }

    /// Subscribes to events matching a filter.
    #[must_use]
    pub fn subscribe_filtered(&self, filter: EventFilter) -> Subscription {
        self.dispatcher.subscribe(Some(filter))
    }

    /// Sends a frame through the transport.
    pub(crate) async fn send_frame(
        &self,
        kind: CommandType,
        command: Command,
        payload: Bytes,
    ) -> Result<()> {
        let mut transport = self.transport.lock().await;
        transport
            .send_frame(Frame::new(kind, command, payload))
            .await
    }

    /// Sends a synchronous request and returns the matching response
    /// payload.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Rpc`] if the device refuses the request, or
    /// with a transport error if the frame cannot be sent. A non-success
    /// status byte is *not* an error at this layer; use
    /// [`check_status`](crate::protocol::check_status) on the returned
    /// payload.
    pub async fn send_sreq(
        &self,
        command: impl Into<Command>,
        payload: impl Into<Bytes>,
    ) -> Result<Bytes> {
        let command = command.into();
        self.send_sreq_accepting(command, vec![command], payload).await
    }

    /// As [`send_sreq`](Self::send_sreq), for commands whose response may
    /// echo a different command code.
    ///
    /// # Errors
    ///
    /// See [`send_sreq`](Self::send_sreq).
    pub async fn send_sreq_accepting(
        &self,
        command: impl Into<Command>,
        accepted: Vec<Command>,
        payload: impl Into<Bytes>,
    ) -> Result<Bytes> {
        let command = command.into();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        // Register before transmitting so the response cannot race the
        // registration.
        self.handlers
            .lock()
            .expect("handler list poisoned")
            .push(Handler::Request(RequestHandler::new(token, accepted, tx)));

        if let Err(err) = self
            .send_frame(CommandType::Sreq, command, payload.into())
            .await
        {
            self.handlers
                .lock()
                .expect("handler list poisoned")
                .retain(|handler| handler.request_token() != Some(token));
            return Err(err);
        }

        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    /// Installs a waiter for one frame of the given type and command whose
    /// payload starts with `prefix`.
    ///
    /// The waiter is registered before this function returns; awaiting the
    /// result may happen later. When `prefix` is non-empty the completion
    /// value is the payload with the prefix stripped; otherwise it is the
    /// whole payload. With `timeout = None` the waiter stays installed
    /// until a frame matches.
    pub fn wait_for(
        &self,
        kind: CommandType,
        command: impl Into<Command>,
        timeout: Option<Duration>,
        prefix: Vec<u8>,
    ) -> PendingFrame {
        let command = command.into();
        let (tx, rx) = oneshot::channel();
        let shared = Arc::new(StdMutex::new(WaiterSlot {
            active: true,
            slot: Some(tx),
        }));

        if let Some(after) = timeout {
            let timer = Arc::clone(&shared);
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let mut slot = timer.lock().expect("waiter slot poisoned");
                if slot.active {
                    slot.active = false;
                    if let Some(tx) = slot.slot.take() {
                        let _ = tx.send(Err(Error::Timeout {
                            timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
                        }));
                    }
                }
            });
        }

        self.handlers
            .lock()
            .expect("handler list poisoned")
            .push(Handler::Waiter(WaiterHandler::new(
                kind, command, prefix, shared,
            )));

        PendingFrame::new(rx)
    }

    /// Installs a waiter only after `first` completed successfully.
    ///
    /// Used for AREQ follow-ups to a synchronous request: the waiter is
    /// armed once the SRSP has been seen, and not at all if the request
    /// failed.
    ///
    /// # Errors
    ///
    /// Propagates `first`'s failure, then the waiter's.
    pub async fn wait_after(
        &self,
        first: impl Future<Output = Result<()>>,
        kind: CommandType,
        command: impl Into<Command>,
        timeout: Option<Duration>,
        prefix: Vec<u8>,
    ) -> Result<Bytes> {
        first.await?;
        self.wait_for(kind, command, timeout, prefix).await
    }

    /// Waits until the device reaches one of `end_states`.
    ///
    /// The current state is queried first; an end state resolves
    /// immediately. Any observed state outside `allowed_states` fails with
    /// [`Error::InvalidState`]. The state-change subscription is taken
    /// before the query, so a change arriving while the query is in
    /// flight is not lost.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidState`] when the device leaves the
    /// allowed corridor, or with the query's error.
    pub async fn wait_for_state(
        &self,
        end_states: &[DeviceState],
        allowed_states: &[DeviceState],
    ) -> Result<DeviceState> {
        let mut changes =
            self.subscribe_filtered(EventFilter::kinds(vec![EventKind::StateChange]));

        let state = self.device_state().await?;
        if end_states.contains(&state) {
            tracing::debug!("already in end state {:?}", state);
            return Ok(state);
        }
        if !allowed_states.contains(&state) {
            tracing::debug!("already in disallowed state {:?}", state);
            return Err(Error::InvalidState { state });
        }

        tracing::debug!("in state {:?}, waiting for state changes", state);
        loop {
            match changes.recv().await {
                Some(Event::StateChange(state)) => {
                    if end_states.contains(&state) {
                        return Ok(state);
                    }
                    if !allowed_states.contains(&state) {
                        return Err(Error::InvalidState { state });
                    }
                    tracing::debug!("intermediate state {:?}", state);
                }
                Some(_) => {}
                None => return Err(Error::ChannelClosed),
            }
        }
    }
}

impl<T> Drop for ZnpApi<T> {
    fn drop(&mut self) {
        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;

    use tokio::sync::mpsc;

    use crate::protocol::command::{AfCommand, SapiCommand, SysCommand, ZdoCommand};
    use crate::types::{Capability, DeviceState, NvItemId, ResetReason};

    struct MockTransport {
        connected: bool,
        sent: Arc<StdMutex<Vec<Frame>>>,
        frames: Option<mpsc::Receiver<Frame>>,
    }

    impl MockTransport {
        fn new() -> (Self, mpsc::Sender<Frame>, Arc<StdMutex<Vec<Frame>>>) {
            let (tx, rx) = mpsc::channel(64);
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let mock = Self {
                connected: false,
                sent: Arc::clone(&sent),
                frames: Some(rx),
            };
            (mock, tx, sent)
        }
    }

    impl Transport for MockTransport {
        fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.connected = true;
                Ok(())
            })
        }

        fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.connected = false;
                Ok(())
            })
        }

        fn send_frame(
            &mut self,
            frame: Frame,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            self.sent.lock().unwrap().push(frame);
            Box::pin(async { Ok(()) })
        }

        fn take_frames(&mut self) -> Option<mpsc::Receiver<Frame>> {
            self.frames.take()
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    type TestApi = Arc<ZnpApi<MockTransport>>;

    async fn connected_api() -> (TestApi, mpsc::Sender<Frame>, Arc<StdMutex<Vec<Frame>>>) {
        let (mock, tx, sent) = MockTransport::new();
        let mut api = ZnpApi::new(mock);
        api.connect().await.unwrap();
        (Arc::new(api), tx, sent)
    }

    async fn wait_for_sends(sent: &Arc<StdMutex<Vec<Frame>>>, n: usize) {
        while sent.lock().unwrap().len() < n {
            tokio::task::yield_now().await;
        }
    }

    async fn wait_for_waiter_count(api: &TestApi, n: usize) {
        loop {
            let waiters = api
                .handlers
                .lock()
                .unwrap()
                .iter()
                .filter(|handler| handler.is_waiter())
                .count();
            if waiters == n {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    fn srsp(command: impl Into<Command>, payload: &'static [u8]) -> Frame {
        Frame::new(CommandType::Srsp, command, Bytes::from_static(payload))
    }

    fn areq(command: impl Into<Command>, payload: &'static [u8]) -> Frame {
        Frame::new(CommandType::Areq, command, Bytes::from_static(payload))
    }

    #[tokio::test]
    async fn test_plain_sreq_srsp() {
        let (api, tx, sent) = connected_api().await;

        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move { api.sys_ping().await }
        });

        wait_for_sends(&sent, 1).await;
        {
            let sent = sent.lock().unwrap();
            assert_eq!(sent[0].kind, CommandType::Sreq);
            assert_eq!(sent[0].command, Command::from(SysCommand::Ping));
            assert!(sent[0].payload.is_empty());
        }

        tx.send(srsp(SysCommand::Ping, &[0x79, 0x00])).await.unwrap();

        let capability = task.await.unwrap().unwrap();
        assert_eq!(capability, Capability(0x0079));
        assert!(capability.contains(Capability::SYS | Capability::AF | Capability::ZDO));
    }

    #[tokio::test]
    async fn test_sreq_status_check() {
        let (api, tx, sent) = connected_api().await;

        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move {
                api.sys_osal_nv_write(NvItemId::PanId, 0, &[0x34, 0x12])
                    .await
            }
        });
        wait_for_sends(&sent, 1).await;
        tx.send(srsp(SysCommand::OsalNvWrite, &[0x00])).await.unwrap();
        task.await.unwrap().unwrap();

        // Same request answered with a failure status.
        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move {
                api.sys_osal_nv_write(NvItemId::PanId, 0, &[0x34, 0x12])
                    .await
            }
        });
        wait_for_sends(&sent, 2).await;
        tx.send(srsp(SysCommand::OsalNvWrite, &[0x0A])).await.unwrap();
        assert!(matches!(
            task.await.unwrap(),
            Err(Error::Status { code: 0x0A })
        ));
    }

    #[tokio::test]
    async fn test_rpc_error_correlation() {
        let (api, tx, sent) = connected_api().await;

        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move { api.zdo_mgmt_leave(0x0000, 0x0011_2233_4455_6677, 0).await }
        });
        wait_for_sends(&sent, 1).await;
        assert_eq!(
            sent.lock().unwrap()[0].command,
            Command::from(ZdoCommand::MgmtLeaveReq)
        );

        // An RPC_Error naming an unrelated command must not claim this
        // request.
        tx.send(srsp(Command::RPC_ERROR, &[0x02, 0x25, 0x35]))
            .await
            .unwrap();
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());

        // The error for MGMT_LEAVE_REQ (subsystem 5, id 0x34, SREQ) does.
        tx.send(srsp(Command::RPC_ERROR, &[0x02, 0x25, 0x34]))
            .await
            .unwrap();
        assert!(matches!(
            task.await.unwrap(),
            Err(Error::Rpc { code: 0x02 })
        ));
    }

    #[tokio::test]
    async fn test_data_request_confirm_correlation() {
        let (api, tx, sent) = connected_api().await;

        // Confirm for the wrong endpoint fails the operation.
        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move {
                api.af_data_request(0x1234, 0x01, 0x01, 0x0006, 0x42, 0, 30, &[0xAA])
                    .await
            }
        });
        wait_for_sends(&sent, 1).await;
        tx.send(srsp(AfCommand::DataRequest, &[0x00])).await.unwrap();
        // The confirm waiter arms once the SRSP has been consumed.
        wait_for_waiter_count(&api, 1).await;
        tx.send(areq(AfCommand::DataConfirm, &[0x00, 0x02, 0x42]))
            .await
            .unwrap();
        assert!(matches!(
            task.await.unwrap(),
            Err(Error::Protocol { .. })
        ));

        // Matching endpoint and transaction id succeed.
        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move {
                api.af_data_request(0x1234, 0x01, 0x01, 0x0006, 0x42, 0, 30, &[0xAA])
                    .await
            }
        });
        wait_for_sends(&sent, 2).await;
        tx.send(srsp(AfCommand::DataRequest, &[0x00])).await.unwrap();
        wait_for_waiter_count(&api, 1).await;
        tx.send(areq(AfCommand::DataConfirm, &[0x00, 0x01, 0x42]))
            .await
            .unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_timeout() {
        let (api, _tx, _sent) = connected_api().await;

        let err = api
            .wait_for(
                CommandType::Areq,
                ZdoCommand::BindRsp,
                Some(Duration::from_secs(15)),
                vec![0x34, 0x12],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 15_000 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_prefix_match() {
        let (api, tx, _sent) = connected_api().await;

        let pending = api.wait_for(
            CommandType::Areq,
            ZdoCommand::BindRsp,
            Some(Duration::from_secs(15)),
            vec![0x34, 0x12],
        );
        tx.send(areq(ZdoCommand::BindRsp, &[0x34, 0x12, 0x00]))
            .await
            .unwrap();

        let payload = pending.await.unwrap();
        assert_eq!(&payload[..], &[0x00]);
    }

    #[tokio::test]
    async fn test_wait_for_state_walks_corridor() {
        let (api, tx, sent) = connected_api().await;
        let allowed = [
            DeviceState::Hold,
            DeviceState::Init,
            DeviceState::NwkDisc,
            DeviceState::NwkJoining,
            DeviceState::CoordStarting,
            DeviceState::ZbCoord,
        ];

        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move {
                api.wait_for_state(&[DeviceState::ZbCoord], &allowed).await
            }
        });

        wait_for_sends(&sent, 1).await;
        assert_eq!(
            sent.lock().unwrap()[0].command,
            Command::from(SapiCommand::GetDeviceInfo)
        );
        // Echoed parameter, state byte, padded to eight value bytes.
        tx.send(srsp(
            SapiCommand::GetDeviceInfo,
            &[0x00, 0x00, 0, 0, 0, 0, 0, 0, 0],
        ))
        .await
        .unwrap();

        for state in [0x01u8, 0x03, 0x08] {
            let frame = Frame::new(
                CommandType::Areq,
                ZdoCommand::StateChangeInd,
                Bytes::copy_from_slice(&[state]),
            );
            tx.send(frame).await.unwrap();
        }
        tx.send(areq(ZdoCommand::StateChangeInd, &[0x09])).await.unwrap();

        assert_eq!(task.await.unwrap().unwrap(), DeviceState::ZbCoord);
    }

    #[tokio::test]
    async fn test_wait_for_state_rejects_disallowed_state() {
        let (api, tx, sent) = connected_api().await;
        let allowed = [
            DeviceState::Hold,
            DeviceState::Init,
            DeviceState::NwkJoining,
            DeviceState::ZbCoord,
        ];

        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move {
                api.wait_for_state(&[DeviceState::ZbCoord], &allowed).await
            }
        });

        wait_for_sends(&sent, 1).await;
        tx.send(srsp(
            SapiCommand::GetDeviceInfo,
            &[0x00, 0x00, 0, 0, 0, 0, 0, 0, 0],
        ))
        .await
        .unwrap();

        tx.send(areq(ZdoCommand::StateChangeInd, &[0x01])).await.unwrap();
        tx.send(areq(ZdoCommand::StateChangeInd, &[0x0A])).await.unwrap();

        assert!(matches!(
            task.await.unwrap(),
            Err(Error::InvalidState {
                state: DeviceState::NwkOrphan
            })
        ));
    }

    #[tokio::test]
    async fn test_event_fanout_in_subscription_order() {
        let (api, tx, _sent) = connected_api().await;

        let mut first = api.subscribe();
        let mut second = api.subscribe();

        tx.send(areq(ZdoCommand::PermitJoinInd, &[0x3C])).await.unwrap();

        for sub in [&mut first, &mut second] {
            let event = tokio::time::timeout(Duration::from_secs(1), sub.recv())
                .await
                .unwrap();
            assert!(matches!(event, Some(Event::PermitJoin { duration: 0x3C })));
        }
    }

    #[tokio::test]
    async fn test_sys_reset_captures_indication() {
        let (api, tx, sent) = connected_api().await;

        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move { api.sys_reset(true).await }
        });

        wait_for_sends(&sent, 1).await;
        {
            let sent = sent.lock().unwrap();
            assert_eq!(sent[0].kind, CommandType::Areq);
            assert_eq!(sent[0].command, Command::from(SysCommand::Reset));
            assert_eq!(&sent[0].payload[..], &[0x01]);
        }

        tx.send(areq(SysCommand::ResetInd, &[0x01, 0x02, 0x00, 0x02, 0x06, 0x03]))
            .await
            .unwrap();

        let info = task.await.unwrap().unwrap();
        assert_eq!(info.reason, ResetReason::External);
        assert_eq!(info.minor_rel, 6);
    }

    #[tokio::test]
    async fn test_alternate_accepted_response() {
        let (api, tx, sent) = connected_api().await;

        // EXT_REMOVE_ALL_GROUP may be answered with an EXT_REMOVE_GROUP
        // echo on some firmwares.
        let task = tokio::spawn({
            let api = Arc::clone(&api);
            async move { api.zdo_ext_remove_all_group(0x01).await }
        });
        wait_for_sends(&sent, 1).await;
        tx.send(srsp(ZdoCommand::ExtRemoveGroup, &[0x00])).await.unwrap();
        task.await.unwrap().unwrap();
    }
}
