//! Device, configuration and non-volatile storage types.

use std::ops::BitOr;

/// Status byte carried by most synchronous responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Operation succeeded.
    Success = 0x00,
    /// Generic failure.
    Failure = 0x01,
    /// Invalid parameter.
    InvalidParameter = 0x02,
    /// Memory allocation failure on the device.
    MemError = 0x03,
    /// Transmit buffer full.
    BufferFull = 0x11,
}

/// Network state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceState {
    /// Initialized, not started automatically.
    Hold = 0,
    /// Initialized, not connected to anything.
    Init = 1,
    /// Discovering PANs to join.
    NwkDisc = 2,
    /// Joining a PAN.
    NwkJoining = 3,
    /// Rejoining a PAN.
    NwkRejoin = 4,
    /// Joined but not yet authenticated by the trust center.
    EndDeviceUnauth = 5,
    /// Started as an end device.
    EndDevice = 6,
    /// Started as a router.
    Router = 7,
    /// Starting as a coordinator.
    CoordStarting = 8,
    /// Started as a coordinator.
    ZbCoord = 9,
    /// Lost information about the parent.
    NwkOrphan = 10,
}

impl DeviceState {
    /// Attempts to parse a device state from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Hold),
            1 => Some(Self::Init),
            2 => Some(Self::NwkDisc),
            3 => Some(Self::NwkJoining),
            4 => Some(Self::NwkRejoin),
            5 => Some(Self::EndDeviceUnauth),
            6 => Some(Self::EndDevice),
            7 => Some(Self::Router),
            8 => Some(Self::CoordStarting),
            9 => Some(Self::ZbCoord),
            10 => Some(Self::NwkOrphan),
            _ => None,
        }
    }
}

/// Cause of the last device reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResetReason {
    /// Power-on reset.
    PowerUp = 0,
    /// Externally requested reset.
    External = 1,
    /// Watchdog reset.
    Watchdog = 2,
}

impl ResetReason {
    /// Attempts to parse a reset reason from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::PowerUp),
            1 => Some(Self::External),
            2 => Some(Self::Watchdog),
            _ => None,
        }
    }
}

/// Reset indication payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetInfo {
    /// Why the device reset.
    pub reason: ResetReason,
    /// Transport protocol revision.
    pub transport_rev: u8,
    /// Product id.
    pub product_id: u8,
    /// Major release number.
    pub major_rel: u8,
    /// Minor release number.
    pub minor_rel: u8,
    /// Hardware revision.
    pub hw_rev: u8,
}

/// Firmware version information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// Transport protocol revision.
    pub transport_rev: u8,
    /// Product id.
    pub product_id: u8,
    /// Major release number.
    pub major_rel: u8,
    /// Minor release number.
    pub minor_rel: u8,
    /// Maintenance release number.
    pub maint_rel: u8,
}

/// Capability bit set reported by a ping response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability(pub u16);

impl Capability {
    /// SYS subsystem available.
    pub const SYS: u16 = 0x0001;
    /// MAC subsystem available.
    pub const MAC: u16 = 0x0002;
    /// NWK subsystem available.
    pub const NWK: u16 = 0x0004;
    /// AF subsystem available.
    pub const AF: u16 = 0x0008;
    /// ZDO subsystem available.
    pub const ZDO: u16 = 0x0010;
    /// SAPI subsystem available.
    pub const SAPI: u16 = 0x0020;
    /// UTIL subsystem available.
    pub const UTIL: u16 = 0x0040;
    /// DEBUG subsystem available.
    pub const DEBUG: u16 = 0x0080;
    /// APP subsystem available.
    pub const APP: u16 = 0x0100;
    /// ZOAD subsystem available.
    pub const ZOAD: u16 = 0x1000;

    /// Returns true if all bits in `mask` are set.
    #[must_use]
    pub const fn contains(&self, mask: u16) -> bool {
        self.0 & mask == mask
    }
}

/// Outcome of `ZDO_STARTUP_FROM_APP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StartupFromAppResult {
    /// Network state restored from NV.
    Restored = 0,
    /// New network state established.
    New = 1,
    /// Network left.
    Leave = 2,
}

impl StartupFromAppResult {
    /// Attempts to parse a startup result from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Restored),
            1 => Some(Self::New),
            2 => Some(Self::Leave),
            _ => None,
        }
    }
}

/// Startup option flags (`ZCD_NV_STARTUP_OPTION`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartupOption(pub u8);

impl StartupOption {
    /// No startup action.
    pub const NONE: Self = Self(0);
    /// Clear the configuration on startup.
    pub const CLEAR_CONFIG: Self = Self(1);
    /// Clear the network state on startup.
    pub const CLEAR_STATE: Self = Self(2);
    /// Start the network automatically.
    pub const AUTO_START: Self = Self(4);
}

impl BitOr for StartupOption {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Logical device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogicalType {
    /// Network coordinator.
    Coordinator = 0,
    /// Router.
    Router = 1,
    /// End device.
    EndDevice = 2,
}

/// AF endpoint latency requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Latency {
    /// No latency requirement.
    NoLatency = 0,
    /// Fast beacons.
    FastBeacons = 1,
    /// Slow beacons.
    SlowBeacons = 2,
}

/// Configuration properties readable and writable through SAPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConfigId {
    /// Startup option flags.
    StartupOption = 0x03,
    /// Poll rate.
    PollRate = 0x24,
    /// Queued poll rate.
    QueuedPollRate = 0x25,
    /// Response poll rate.
    ResponsePollRate = 0x26,
    /// Poll failure retries.
    PollFailureRetries = 0x29,
    /// Indirect message timeout.
    IndirectMsgTimeout = 0x2B,
    /// Route expiry time.
    RouteExpiryTime = 0x2C,
    /// Extended PAN id.
    ExtendedPanId = 0x2D,
    /// Broadcast retries.
    BcastRetries = 0x2E,
    /// Passive ack timeout.
    PassiveAckTimeout = 0x2F,
    /// Broadcast delivery time.
    BcastDeliveryTime = 0x30,
    /// APS frame retries.
    ApsFrameRetries = 0x43,
    /// APS ack wait duration.
    ApsAckWaitDuration = 0x44,
    /// Binding time.
    BindingTime = 0x46,
    /// Pre-configured network key.
    PreCfgKey = 0x62,
    /// Whether the pre-configured key is distributed.
    PreCfgKeysEnable = 0x63,
    /// Security mode.
    SecurityMode = 0x64,
    /// User descriptor.
    UserDesc = 0x81,
    /// PAN id.
    PanId = 0x83,
    /// Channel mask.
    ChanList = 0x84,
    /// Logical device type.
    LogicalType = 0x87,
    /// Direct ZDO callbacks.
    ZdoDirectCb = 0x8F,
}

/// Properties readable through SAPI `GET_DEVICE_INFO`.
///
/// The device pads every answer to eight value bytes regardless of the
/// property's actual width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceInfoParam {
    /// Current device state.
    DeviceState = 0,
    /// Device IEEE address.
    DeviceIeeeAddress = 1,
    /// Device short address.
    DeviceShortAddress = 2,
    /// Parent short address.
    ParentShortAddress = 3,
    /// Parent IEEE address.
    ParentIeeeAddress = 4,
    /// Radio channel.
    Channel = 5,
    /// PAN id.
    PanId = 6,
    /// Extended PAN id.
    ExtendedPanId = 7,
}

/// Non-volatile storage item ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NvItemId {
    /// Extended address.
    ExtAddr = 0x0001,
    /// Boot counter.
    BootCounter = 0x0002,
    /// Startup option flags.
    StartupOption = 0x0003,
    /// Startup delay.
    StartDelay = 0x0004,
    /// Network information base.
    Nib = 0x0021,
    /// Device list.
    DeviceList = 0x0022,
    /// Address manager table.
    AddrMgr = 0x0023,
    /// Poll rate.
    PollRate = 0x0024,
    /// Queued poll rate.
    QueuedPollRate = 0x0025,
    /// Response poll rate.
    ResponsePollRate = 0x0026,
    /// Rejoin poll rate.
    RejoinPollRate = 0x0027,
    /// Data retries.
    DataRetries = 0x0028,
    /// Poll failure retries.
    PollFailureRetries = 0x0029,
    /// Stack profile.
    StackProfile = 0x002A,
    /// Indirect message timeout.
    IndirectMsgTimeout = 0x002B,
    /// Route expiry time.
    RouteExpiryTime = 0x002C,
    /// Extended PAN id.
    ExtendedPanId = 0x002D,
    /// Broadcast retries.
    BcastRetries = 0x002E,
    /// Passive ack timeout.
    PassiveAckTimeout = 0x002F,
    /// Broadcast delivery time.
    BcastDeliveryTime = 0x0030,
    /// Network mode.
    NwkMode = 0x0031,
    /// Concentrator enable.
    ConcentratorEnable = 0x0032,
    /// Concentrator discovery time.
    ConcentratorDiscovery = 0x0033,
    /// Concentrator radius.
    ConcentratorRadius = 0x0034,
    /// Maximum source routes.
    MaxSourceRoute = 0x0035,
    /// Binding table.
    BindingTable = 0x0041,
    /// Group table.
    GroupTable = 0x0042,
    /// APS frame retries.
    ApsFrameRetries = 0x0043,
    /// APS ack wait duration.
    ApsAckWaitDuration = 0x0044,
    /// APS ack wait multiplier.
    ApsAckWaitMultiplier = 0x0045,
    /// Binding time.
    BindingTime = 0x0046,
    /// Security level.
    SecurityLevel = 0x0061,
    /// Pre-configured network key.
    PreCfgKey = 0x0062,
    /// Whether the pre-configured key is distributed.
    PreCfgKeysEnable = 0x0063,
    /// Use the default trust center link key.
    UseDefaultTclk = 0x006D,
    /// User descriptor.
    UserDesc = 0x0081,
    /// Network key.
    NwkKey = 0x0082,
    /// PAN id.
    PanId = 0x0083,
    /// Channel mask.
    ChanList = 0x0084,
    /// Leave control.
    LeaveCtrl = 0x0085,
    /// Scan duration.
    ScanDuration = 0x0086,
    /// Logical device type.
    LogicalType = 0x0087,
    /// Direct ZDO callbacks.
    ZdoDirectCb = 0x008F,
    /// Scene table.
    SceneTable = 0x0091,
    /// SAPI endpoint.
    SapiEndpoint = 0x00A1,
    /// RF test parameters.
    RfTestParams = 0x0F07,
}
