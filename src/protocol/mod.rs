//! Protocol definitions for ZNP communication.
//!
//! This module contains the low-level protocol types:
//! - UART frame encoding/decoding
//! - Command type, subsystem and per-subsystem command ids
//! - Payload parsing and the status-byte helpers

pub mod command;
pub mod frame;
pub mod parser;

pub use command::{
    AfCommand, AppCnfCommand, Command, CommandType, SapiCommand, Subsystem, SysCommand,
    UtilCommand, ZdoCommand,
};
pub use frame::{FRAME_OVERHEAD, Frame, FrameDecoder, MAX_PAYLOAD, SOF, encode as encode_frame};
pub use parser::{IeeeAddrResponse, check_only_status, check_status};
