//! # znp
//!
//! A Rust client library for Texas Instruments Z-Stack ZNP Zigbee
//! coordinators.
//!
//! This library provides async communication with a ZNP coordinator over
//! USB/Serial: reset and start the stack, read and write NV items, send
//! and receive AF data, and manage bindings, groups and joining.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Request/response correlation with `RPC_Error` handling
//! - Event-driven delivery of unsolicited device indications
//! - Type-safe protocol implementation
//! - Comprehensive error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use znp::ZnpApi;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), znp::Error> {
//!     // Connect to a ZNP coordinator
//!     let mut api = ZnpApi::serial("/dev/ttyUSB0");
//!     api.connect().await?;
//!
//!     let capability = api.sys_ping().await?;
//!     println!("Capabilities: {capability:?}");
//!
//!     let version = api.sys_version().await?;
//!     println!("Firmware: {}.{}.{}", version.major_rel, version.minor_rel, version.maint_rel);
//!
//!     // Open the network for joining for 60 seconds
//!     api.zdo_mgmt_permit_join(znp::AddrMode::ShortAddress, 0x0000, 60, 0)
//!         .await?;
//!
//!     api.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Low-level protocol types (frames, commands, payload parsing)
//! - [`types`] - Data structures (addresses, device state, NV items, messages)
//! - [`transport`] - Transport implementations (currently UART/Serial)
//! - [`event`] - Async event system for unsolicited indications
//! - [`commands`] - Per-command wrappers for device operations
//! - [`client`] - High-level [`ZnpApi`] mediator

pub mod client;
pub mod commands;
mod dispatch;
pub mod error;
pub mod event;
pub mod protocol;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::ZnpApi;
pub use dispatch::PendingFrame;
pub use error::{Error, FrameError, Result};
pub use event::{Event, EventDispatcher, EventFilter, EventKind, Subscription};
pub use protocol::{
    AfCommand, AppCnfCommand, Command, CommandType, Frame, SapiCommand, Subsystem, SysCommand,
    UtilCommand, ZdoCommand, check_only_status, check_status,
};
pub use transport::{SerialTransport, Transport, serial::list_ports};
pub use types::{
    AddrMode, BindTableEntry, BindTarget, Capability, ConfigId, DeviceInfoParam, DeviceState,
    IeeeAddress, IncomingMsg, Latency, LogicalType, NvItemId, ResetInfo, ResetReason,
    ShortAddress, StartupFromAppResult, StartupOption, Status, VersionInfo,
};
