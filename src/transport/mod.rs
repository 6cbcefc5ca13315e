//! Transport layer for ZNP communication.
//!
//! This module provides the abstraction for different transport methods.
//! Currently only UART/Serial is implemented.

pub mod serial;

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::protocol::Frame;

/// Trait for transport implementations.
///
/// A transport frames outbound commands onto the wire and delivers every
/// well-formed inbound frame on the stream handed out by [`take_frames`].
///
/// [`take_frames`]: Transport::take_frames
pub trait Transport: Send + Sync {
    /// Connects to the device.
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Disconnects from the device.
    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Sends a frame to the device.
    fn send_frame(&mut self, frame: Frame) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Takes the inbound frame stream.
    ///
    /// Returns `None` when not connected or when the stream was already
    /// taken.
    fn take_frames(&mut self) -> Option<mpsc::Receiver<Frame>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

pub use serial::SerialTransport;
