//! Data types for ZNP entities.

pub mod address;
pub mod device;
pub mod message;

pub use address::{AddrMode, BindTarget, IeeeAddress, ShortAddress};
pub use device::{
    Capability, ConfigId, DeviceInfoParam, DeviceState, Latency, LogicalType, NvItemId,
    ResetInfo, ResetReason, StartupFromAppResult, StartupOption, Status, VersionInfo,
};
pub use message::{BindTableEntry, IncomingMsg};
