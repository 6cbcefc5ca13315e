//! Event system for asynchronous device indications.
//!
//! Unsolicited AREQ frames are decoded into typed [`Event`]s by permanent
//! handlers at the head of the dispatch list and fanned out to every
//! subscriber. One-shot captures are expressed by dropping the
//! [`Subscription`] after the first match.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::Result;
use crate::protocol::command::{AfCommand, AppCnfCommand, Command, SysCommand, ZdoCommand};
use crate::protocol::parser;
use crate::types::{DeviceState, IeeeAddress, IncomingMsg, ResetInfo, ShortAddress};

/// Event types dispatched to subscribers.
#[derive(Debug, Clone)]
pub enum Event {
    /// The device reset.
    Reset(ResetInfo),
    /// The network state changed.
    StateChange(DeviceState),
    /// A device announced itself on the network.
    EndDeviceAnnounce {
        /// Short address of the sender of the announcement.
        source: ShortAddress,
        /// Short address of the announced device.
        nwk_addr: ShortAddress,
        /// IEEE address of the announced device.
        ieee_addr: IeeeAddress,
        /// MAC capability flags of the announced device.
        capabilities: u8,
    },
    /// The trust center authorized a device.
    TrustCenterDevice {
        /// Short address of the joined device.
        nwk_addr: ShortAddress,
        /// IEEE address of the joined device.
        ieee_addr: IeeeAddress,
        /// Short address of its parent.
        parent_addr: ShortAddress,
    },
    /// The permit-join window changed.
    PermitJoin {
        /// Remaining window in seconds, 0 when closed.
        duration: u8,
    },
    /// A device left the network.
    LeaveIndication {
        /// Short address of the leaving device.
        source: ShortAddress,
        /// IEEE address of the leaving device.
        ieee_addr: IeeeAddress,
        /// Whether this was a request rather than an indication.
        request: u8,
        /// Whether children are removed too.
        remove_children: u8,
        /// Whether the device will rejoin.
        rejoin: u8,
    },
    /// An AF data frame arrived.
    IncomingMsg(Box<IncomingMsg>),
    /// BDB commissioning progress changed.
    BdbCommissioning {
        /// Commissioning status code.
        status: u8,
        /// Commissioning mode the notification refers to.
        mode: u8,
        /// Remaining commissioning modes.
        remaining_modes: u8,
    },
}

/// Discriminant of an [`Event`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Reset indication.
    Reset,
    /// Network state change.
    StateChange,
    /// End device announce.
    EndDeviceAnnounce,
    /// Trust center device indication.
    TrustCenterDevice,
    /// Permit-join window change.
    PermitJoin,
    /// Leave indication.
    LeaveIndication,
    /// Incoming AF data frame.
    IncomingMsg,
    /// BDB commissioning notification.
    BdbCommissioning,
}

impl Event {
    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Reset(_) => EventKind::Reset,
            Self::StateChange(_) => EventKind::StateChange,
            Self::EndDeviceAnnounce { .. } => EventKind::EndDeviceAnnounce,
            Self::TrustCenterDevice { .. } => EventKind::TrustCenterDevice,
            Self::PermitJoin { .. } => EventKind::PermitJoin,
            Self::LeaveIndication { .. } => EventKind::LeaveIndication,
            Self::IncomingMsg(_) => EventKind::IncomingMsg,
            Self::BdbCommissioning { .. } => EventKind::BdbCommissioning,
        }
    }
}

/// Subscription filter for specific event kinds.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Kinds to deliver; `None` delivers everything.
    pub kinds: Option<Vec<EventKind>>,
}

impl EventFilter {
    /// Creates a filter for specific event kinds.
    #[must_use]
    pub const fn kinds(kinds: Vec<EventKind>) -> Self {
        Self { kinds: Some(kinds) }
    }

    /// Checks if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        match &self.kinds {
            Some(kinds) => kinds.contains(&event.kind()),
            None => true,
        }
    }
}

/// A subscription to events.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
    filter: Option<EventFilter>,
}

impl Subscription {
    /// Receives the next event matching the subscription's filter.
    ///
    /// Returns `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.as_ref().map_or(true, |f| f.matches(&event)) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("event subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

struct EventDispatcherInner {
    sender: broadcast::Sender<Event>,
}

/// Dispatches events to subscribers.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<EventDispatcherInner>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(EventDispatcherInner { sender }),
        }
    }

    /// Dispatches an event to all subscribers.
    pub fn dispatch(&self, event: Event) {
        // No subscribers is fine; the send error is meaningless here.
        let _ = self.inner.sender.send(event);
    }

    /// Subscribes to events with an optional filter.
    #[must_use]
    pub fn subscribe(&self, filter: Option<EventFilter>) -> Subscription {
        Subscription {
            receiver: self.inner.sender.subscribe(),
            filter,
        }
    }

    /// Waits for an event matching the filter, up to `timeout`.
    ///
    /// Returns `None` if the timeout expires or the dispatcher is gone.
    pub async fn wait_for(
        &self,
        filter: EventFilter,
        timeout: std::time::Duration,
    ) -> Option<Event> {
        let mut subscription = self.subscribe(Some(filter));

        tokio::select! {
            biased;
            event = subscription.recv() => event,
            () = tokio::time::sleep(timeout) => None,
        }
    }
}

/// Decoder installed for one event kind.
pub(crate) type DecodeFn = fn(&[u8], bool) -> Result<Event>;

/// The permanent event registrations: AREQ command, partial-decoding flag
/// and decoder, in installation order.
pub(crate) fn registrations() -> Vec<(Command, bool, DecodeFn)> {
    vec![
        (SysCommand::ResetInd.into(), false, decode_reset),
        (ZdoCommand::StateChangeInd.into(), false, decode_state_change),
        (
            ZdoCommand::EndDeviceAnnceInd.into(),
            false,
            decode_end_device_announce,
        ),
        (ZdoCommand::TcDevInd.into(), false, decode_trust_center_device),
        (ZdoCommand::PermitJoinInd.into(), false, decode_permit_join),
        (ZdoCommand::LeaveInd.into(), false, decode_leave_indication),
        // INCOMING_MSG sometimes carries extra trailing bytes, so allow a
        // partial decoding.
        (AfCommand::IncomingMsg.into(), true, decode_incoming_msg),
        (
            AppCnfCommand::BdbCommissioningNotification.into(),
            false,
            decode_bdb_commissioning,
        ),
    ]
}

fn decode_reset(data: &[u8], _allow_partial: bool) -> Result<Event> {
    parser::parse_reset_info(data).map(Event::Reset)
}

fn decode_state_change(data: &[u8], _allow_partial: bool) -> Result<Event> {
    parser::parse_device_state(data).map(Event::StateChange)
}

fn decode_end_device_announce(data: &[u8], _allow_partial: bool) -> Result<Event> {
    let (source, nwk_addr, ieee_addr, capabilities) = parser::parse_end_device_announce(data)?;
    Ok(Event::EndDeviceAnnounce {
        source,
        nwk_addr,
        ieee_addr,
        capabilities,
    })
}

fn decode_trust_center_device(data: &[u8], _allow_partial: bool) -> Result<Event> {
    let (nwk_addr, ieee_addr, parent_addr) = parser::parse_trust_center_device(data)?;
    Ok(Event::TrustCenterDevice {
        nwk_addr,
        ieee_addr,
        parent_addr,
    })
}

fn decode_permit_join(data: &[u8], _allow_partial: bool) -> Result<Event> {
    parser::parse_u8(data).map(|duration| Event::PermitJoin { duration })
}

fn decode_leave_indication(data: &[u8], _allow_partial: bool) -> Result<Event> {
    let (source, ieee_addr, request, remove_children, rejoin) =
        parser::parse_leave_indication(data)?;
    Ok(Event::LeaveIndication {
        source,
        ieee_addr,
        request,
        remove_children,
        rejoin,
    })
}

fn decode_incoming_msg(data: &[u8], allow_partial: bool) -> Result<Event> {
    parser::parse_incoming_msg(data, allow_partial).map(|msg| Event::IncomingMsg(Box::new(msg)))
}

fn decode_bdb_commissioning(data: &[u8], _allow_partial: bool) -> Result<Event> {
    if data.len() != 3 {
        return Err(crate::error::Error::decode(format!(
            "BdbCommissioning: expected 3 bytes, got {}",
            data.len()
        )));
    }
    Ok(Event::BdbCommissioning {
        status: data[0],
        mode: data[1],
        remaining_modes: data[2],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_dispatch() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe(None);

        dispatcher.dispatch(Event::PermitJoin { duration: 60 });

        let event = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap();

        assert!(matches!(event, Some(Event::PermitJoin { duration: 60 })));
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::kinds(vec![EventKind::Reset, EventKind::StateChange]);

        assert!(filter.matches(&Event::StateChange(DeviceState::Init)));
        assert!(!filter.matches(&Event::PermitJoin { duration: 0 }));
    }

    #[tokio::test]
    async fn test_filtered_subscription_skips_other_kinds() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub =
            dispatcher.subscribe(Some(EventFilter::kinds(vec![EventKind::StateChange])));

        dispatcher.dispatch(Event::PermitJoin { duration: 1 });
        dispatcher.dispatch(Event::StateChange(DeviceState::ZbCoord));

        let event = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap();
        assert!(matches!(
            event,
            Some(Event::StateChange(DeviceState::ZbCoord))
        ));
    }

    #[test]
    fn test_registrations_order_starts_with_reset() {
        let regs = registrations();
        assert_eq!(regs[0].0, Command::from(SysCommand::ResetInd));
        // Only INCOMING_MSG allows partial decoding.
        assert_eq!(
            regs.iter().filter(|(_, partial, _)| *partial).count(),
            1
        );
    }
}
