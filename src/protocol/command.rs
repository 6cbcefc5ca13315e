//! Command identifiers for the ZNP protocol.
//!
//! Every ZNP frame is addressed by a command type (the high nibble of CMD0)
//! and a 16-bit command pair: the subsystem (low nibble of CMD0) and the
//! command id (CMD1).

use std::fmt;

/// Frame direction/kind, encoded in the high nibble of CMD0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    /// Poll request (host to device, unused on USB transports).
    Poll = 0,
    /// Synchronous request, host to device.
    Sreq = 2,
    /// Asynchronous request, either direction.
    Areq = 4,
    /// Synchronous response, device to host.
    Srsp = 6,
}

impl CommandType {
    /// Attempts to parse a command type from a CMD0 high nibble.
    #[must_use]
    pub const fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0 => Some(Self::Poll),
            2 => Some(Self::Sreq),
            4 => Some(Self::Areq),
            6 => Some(Self::Srsp),
            _ => None,
        }
    }
}

/// Command subsystem, encoded in the low nibble of CMD0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Subsystem {
    /// Pseudo-subsystem used by the device to refuse a request.
    RpcError = 0,
    /// System interface.
    Sys = 1,
    /// MAC layer interface.
    Mac = 2,
    /// Network layer interface.
    Nwk = 3,
    /// Application framework.
    Af = 4,
    /// Zigbee device objects.
    Zdo = 5,
    /// Simple API.
    Sapi = 6,
    /// Utility interface.
    Util = 7,
    /// Debug interface.
    Debug = 8,
    /// Application interface.
    App = 9,
    /// Application configuration (BDB commissioning).
    AppCnf = 15,
}

impl Subsystem {
    /// Attempts to parse a subsystem from a CMD0 low nibble.
    #[must_use]
    pub const fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0 => Some(Self::RpcError),
            1 => Some(Self::Sys),
            2 => Some(Self::Mac),
            3 => Some(Self::Nwk),
            4 => Some(Self::Af),
            5 => Some(Self::Zdo),
            6 => Some(Self::Sapi),
            7 => Some(Self::Util),
            8 => Some(Self::Debug),
            9 => Some(Self::App),
            15 => Some(Self::AppCnf),
            _ => None,
        }
    }
}

/// A ZNP command: subsystem plus command id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    /// The subsystem the command belongs to.
    pub subsystem: Subsystem,
    /// The command id within the subsystem.
    pub id: u8,
}

impl Command {
    /// The `RPC_Error` response command.
    pub const RPC_ERROR: Self = Self::new(Subsystem::RpcError, 0);

    /// Creates a command from a subsystem and id.
    #[must_use]
    pub const fn new(subsystem: Subsystem, id: u8) -> Self {
        Self { subsystem, id }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02X})", self.subsystem, self.id)
    }
}

/// Commands in the SYS subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SysCommand {
    /// Reset the device (sent as AREQ).
    Reset = 0x00,
    /// Capability probe.
    Ping = 0x01,
    /// Firmware version query.
    Version = 0x02,
    /// Write the extended address.
    SetExtAddr = 0x03,
    /// Read the extended address.
    GetExtAddr = 0x04,
    /// Raw RAM read.
    RamRead = 0x05,
    /// Raw RAM write.
    RamWrite = 0x06,
    /// Initialize an NV item.
    OsalNvItemInit = 0x07,
    /// Read an NV item.
    OsalNvRead = 0x08,
    /// Write an NV item.
    OsalNvWrite = 0x09,
    /// Start an OSAL timer.
    OsalStartTimer = 0x0A,
    /// Stop an OSAL timer.
    OsalStopTimer = 0x0B,
    /// Random number request.
    Random = 0x0C,
    /// ADC read.
    AdcRead = 0x0D,
    /// GPIO control.
    Gpio = 0x0E,
    /// Stack tuning.
    StackTune = 0x0F,
    /// Set device time.
    SetTime = 0x10,
    /// Get device time.
    GetTime = 0x11,
    /// Delete an NV item.
    OsalNvDelete = 0x12,
    /// Query an NV item's length.
    OsalNvLength = 0x13,
    /// RF test.
    TestRf = 0x40,
    /// Loopback test.
    TestLoopback = 0x41,
    /// Reset indication (AREQ from device).
    ResetInd = 0x80,
    /// OSAL timer expired (AREQ from device).
    OsalTimerExpired = 0x81,
}

impl From<SysCommand> for Command {
    fn from(cmd: SysCommand) -> Self {
        Self::new(Subsystem::Sys, cmd as u8)
    }
}

/// Commands in the AF subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AfCommand {
    /// Register an application endpoint.
    Register = 0x00,
    /// Send a data frame.
    DataRequest = 0x01,
    /// Send a data frame, extended addressing.
    DataRequestExt = 0x02,
    /// Send a data frame with source routing.
    DataRequestSrcRtg = 0x03,
    /// Inter-PAN control.
    InterPanCtl = 0x10,
    /// Store a data block for later transmission.
    DataStore = 0x11,
    /// Retrieve a stored data block.
    DataRetrieve = 0x12,
    /// Configure APS fragmentation.
    ApsfConfigSet = 0x13,
    /// Transmission confirm (AREQ from device).
    DataConfirm = 0x80,
    /// Incoming data frame (AREQ from device).
    IncomingMsg = 0x81,
    /// Incoming data frame, extended (AREQ from device).
    IncomingMsgExt = 0x82,
    /// Reflection error (AREQ from device).
    ReflectError = 0x83,
}

impl From<AfCommand> for Command {
    fn from(cmd: AfCommand) -> Self {
        Self::new(Subsystem::Af, cmd as u8)
    }
}

/// Commands in the ZDO subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ZdoCommand {
    /// Network address request.
    NwkAddrReq = 0x00,
    /// IEEE address request.
    IeeeAddrReq = 0x01,
    /// Node descriptor request.
    NodeDescReq = 0x02,
    /// Power descriptor request.
    PowerDescReq = 0x03,
    /// Simple descriptor request.
    SimpleDescReq = 0x04,
    /// Active endpoint request.
    ActiveEpReq = 0x05,
    /// Match descriptor request.
    MatchDescReq = 0x06,
    /// Complex descriptor request.
    ComplexDescReq = 0x07,
    /// User descriptor request.
    UserDescReq = 0x08,
    /// Device announce.
    DeviceAnnce = 0x0A,
    /// User descriptor set.
    UserDescSet = 0x0B,
    /// Server discovery request.
    ServerDiscReq = 0x0C,
    /// End device bind request.
    EndDeviceBindReq = 0x20,
    /// Bind request.
    BindReq = 0x21,
    /// Unbind request.
    UnbindReq = 0x22,
    /// Set link key.
    SetLinkKey = 0x23,
    /// Remove link key.
    RemoveLinkKey = 0x24,
    /// Get link key.
    GetLinkKey = 0x25,
    /// Network discovery request.
    MgmtNwkDiscReq = 0x30,
    /// LQI table request.
    MgmtLqiReq = 0x31,
    /// Routing table request.
    MgmtRtgReq = 0x32,
    /// Binding table request.
    MgmtBindReq = 0x33,
    /// Management leave request.
    MgmtLeaveReq = 0x34,
    /// Direct join request.
    MgmtDirectJoinReq = 0x35,
    /// Permit join request.
    MgmtPermitJoinReq = 0x36,
    /// Network update request.
    MgmtNwkUpdateReq = 0x37,
    /// Register for ZDO message callbacks.
    MsgCbRegister = 0x3E,
    /// Remove a ZDO message callback.
    MsgCbRemove = 0x3F,
    /// Start the stack from application state.
    StartupFromApp = 0x40,
    /// Auto find destination.
    AutoFindDestination = 0x41,
    /// Remove a group from an endpoint.
    ExtRemoveGroup = 0x47,
    /// Remove all groups from an endpoint.
    ExtRemoveAllGroup = 0x48,
    /// List all groups on an endpoint.
    ExtFindAllGroupsEndpoint = 0x49,
    /// Look up a group on an endpoint.
    ExtFindGroup = 0x4A,
    /// Add a group to an endpoint.
    ExtAddGroup = 0x4B,
    /// Count all groups.
    ExtCountAllGroups = 0x4C,
    /// Network address response (AREQ).
    NwkAddrRsp = 0x80,
    /// IEEE address response (AREQ).
    IeeeAddrRsp = 0x81,
    /// Node descriptor response (AREQ).
    NodeDescRsp = 0x82,
    /// Power descriptor response (AREQ).
    PowerDescRsp = 0x83,
    /// Simple descriptor response (AREQ).
    SimpleDescRsp = 0x84,
    /// Active endpoint response (AREQ).
    ActiveEpRsp = 0x85,
    /// Match descriptor response (AREQ).
    MatchDescRsp = 0x86,
    /// Complex descriptor response (AREQ).
    ComplexDescRsp = 0x87,
    /// User descriptor response (AREQ).
    UserDescRsp = 0x88,
    /// User descriptor confirm (AREQ).
    UserDescConf = 0x89,
    /// Server discovery response (AREQ).
    ServerDiscRsp = 0x8A,
    /// End device bind response (AREQ).
    EndDeviceBindRsp = 0xA0,
    /// Bind response (AREQ).
    BindRsp = 0xA1,
    /// Unbind response (AREQ).
    UnbindRsp = 0xA2,
    /// Network discovery response (AREQ).
    MgmtNwkDiscRsp = 0xB0,
    /// LQI table response (AREQ).
    MgmtLqiRsp = 0xB1,
    /// Routing table response (AREQ).
    MgmtRtgRsp = 0xB2,
    /// Binding table response (AREQ).
    MgmtBindRsp = 0xB3,
    /// Management leave response (AREQ).
    MgmtLeaveRsp = 0xB4,
    /// Direct join response (AREQ).
    MgmtDirectJoinRsp = 0xB5,
    /// Permit join response (AREQ).
    MgmtPermitJoinRsp = 0xB6,
    /// Device state change indication (AREQ).
    StateChangeInd = 0xC0,
    /// End device announce indication (AREQ).
    EndDeviceAnnceInd = 0xC1,
    /// Match descriptor response sent (AREQ).
    MatchDescRspSent = 0xC2,
    /// Status error response (AREQ).
    StatusErrorRsp = 0xC3,
    /// Source route indication (AREQ).
    SrcRtgInd = 0xC4,
    /// Leave indication (AREQ).
    LeaveInd = 0xC9,
    /// Trust center device indication (AREQ).
    TcDevInd = 0xCA,
    /// Permit join changed indication (AREQ).
    PermitJoinInd = 0xCB,
    /// Incoming ZDO message callback (AREQ).
    MsgCbIncoming = 0xFF,
}

impl From<ZdoCommand> for Command {
    fn from(cmd: ZdoCommand) -> Self {
        Self::new(Subsystem::Zdo, cmd as u8)
    }
}

/// Commands in the SAPI subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SapiCommand {
    /// Start the simple API application.
    StartRequest = 0x00,
    /// Bind a device.
    BindDevice = 0x01,
    /// Allow binding.
    AllowBind = 0x02,
    /// Send data.
    SendDataRequest = 0x03,
    /// Read a configuration property.
    ReadConfiguration = 0x04,
    /// Write a configuration property.
    WriteConfiguration = 0x05,
    /// Query a device info property.
    GetDeviceInfo = 0x06,
    /// Find a device.
    FindDeviceRequest = 0x07,
    /// Permit joining.
    PermitJoiningRequest = 0x08,
    /// Reset the device.
    SystemReset = 0x09,
    /// Start confirm (AREQ).
    StartConfirm = 0x80,
    /// Bind confirm (AREQ).
    BindConfirm = 0x81,
    /// Allow bind confirm (AREQ).
    AllowBindConfirm = 0x82,
    /// Send data confirm (AREQ).
    SendDataConfirm = 0x83,
    /// Find device confirm (AREQ).
    FindDeviceConfirm = 0x85,
    /// Incoming data indication (AREQ).
    ReceiveDataIndication = 0x87,
}

impl From<SapiCommand> for Command {
    fn from(cmd: SapiCommand) -> Self {
        Self::new(Subsystem::Sapi, cmd as u8)
    }
}

/// Commands in the UTIL subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UtilCommand {
    /// Device info query.
    GetDeviceInfo = 0x00,
    /// NV info query.
    GetNvInfo = 0x01,
    /// Set PAN id.
    SetPanId = 0x02,
    /// Set channel mask.
    SetChannels = 0x03,
    /// Set security level.
    SetSecLevel = 0x04,
    /// Set pre-configured key.
    SetPreCfgKey = 0x05,
    /// Subscribe to MT callbacks.
    CallbackSubCmd = 0x06,
    /// Key press event.
    KeyEvent = 0x07,
    /// Uptime query.
    TimeAlive = 0x09,
    /// LED control.
    LedControl = 0x0A,
    /// Loopback test.
    TestLoopback = 0x10,
    /// Data request proxy.
    DataReq = 0x11,
    /// Enable source matching.
    SrcMatchEnable = 0x20,
    /// Add a source-match entry.
    SrcMatchAddEntry = 0x21,
    /// Delete a source-match entry.
    SrcMatchDelEntry = 0x22,
    /// Check a source-match address.
    SrcMatchCheckSrcAddr = 0x23,
    /// Ack all pending.
    SrcMatchAckAllPending = 0x24,
    /// Check all pending.
    SrcMatchCheckAllPending = 0x25,
    /// Look up an IEEE address by short address.
    AddrmgrExtAddrLookup = 0x40,
    /// Look up a short address by IEEE address.
    AddrmgrNwkAddrLookup = 0x41,
    /// Read APS link key data.
    ApsmeLinkKeyDataGet = 0x44,
    /// Read APS link key NV id.
    ApsmeLinkKeyNvIdGet = 0x45,
    /// Association table count.
    AssocCount = 0x48,
    /// Find an association table entry.
    AssocFindDevice = 0x49,
    /// Read an association table entry by address.
    AssocGetWithAddress = 0x4A,
    /// Request an APS key.
    ApsmeRequestKeyCmd = 0x4B,
    /// ZCL key establishment initiate.
    ZclKeyEstInitEst = 0x80,
    /// ZCL key establishment sign.
    ZclKeyEstSign = 0x81,
    /// Sync request (AREQ).
    SyncReq = 0xE0,
    /// ZCL key establishment indication (AREQ).
    ZclKeyEstablishInd = 0xE1,
}

impl From<UtilCommand> for Command {
    fn from(cmd: UtilCommand) -> Self {
        Self::new(Subsystem::Util, cmd as u8)
    }
}

/// Commands in the APP_CNF subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AppCnfCommand {
    /// Set the default remote end-device timeout.
    SetDefaultRemoteEnddeviceTimeout = 0x01,
    /// Start BDB commissioning.
    BdbStartCommissioning = 0x05,
    /// Set the BDB primary or secondary channel mask.
    BdbSetChannel = 0x08,
    /// BDB commissioning progress notification (AREQ).
    BdbCommissioningNotification = 0x80,
}

impl From<AppCnfCommand> for Command {
    fn from(cmd: AppCnfCommand) -> Self {
        Self::new(Subsystem::AppCnf, cmd as u8)
    }
}
