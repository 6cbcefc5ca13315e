//! Serial/UART transport implementation.
//!
//! This module provides serial port communication for ZNP coordinators
//! connected via USB or a raw UART.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::error::{Error, Result};
use crate::protocol::{Frame, FrameDecoder, encode_frame};
use crate::transport::Transport;

/// Default baud rate for ZNP coordinators.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default delay after opening the port before talking to the device.
pub const DEFAULT_CONNECTION_DELAY: Duration = Duration::from_millis(300);

/// Capacity of the inbound frame channel.
const FRAME_CHANNEL_CAPACITY: usize = 256;

/// Configuration for serial transport.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Delay after connection before sending commands.
    pub connection_delay: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            connection_delay: DEFAULT_CONNECTION_DELAY,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the connection delay.
    #[must_use]
    pub const fn connection_delay(mut self, delay: Duration) -> Self {
        self.connection_delay = delay;
        self
    }
}

/// Serial transport for ZNP communication.
///
/// The read half of the port is owned by a background task that decodes
/// frames and feeds the inbound stream; the write half is shared for
/// outbound frames.
pub struct SerialTransport {
    config: SerialConfig,
    writer: Option<Arc<Mutex<WriteHalf<SerialStream>>>>,
    frames: Option<mpsc::Receiver<Frame>>,
    read_task: Option<JoinHandle<()>>,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            writer: None,
            frames: None,
            read_task: None,
        }
    }

    /// Creates a new serial transport for the given port with default
    /// settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// Runs the read loop, decoding frames off the port.
    async fn run_read_loop(
        mut reader: ReadHalf<SerialStream>,
        frame_tx: mpsc::Sender<Frame>,
    ) -> Result<()> {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 1024];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => {
                    tracing::debug!("serial port closed");
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "serial port closed",
                    )));
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("serial read error: {}", e);
                    return Err(Error::Io(e));
                }
            };

            tracing::trace!("received {} bytes", n);
            decoder.feed(&buf[..n]);

            // Process all complete frames.
            loop {
                match decoder.decode() {
                    Ok(Some(frame)) => {
                        tracing::trace!(
                            "decoded frame {:?} {} ({} payload bytes)",
                            frame.kind,
                            frame.command,
                            frame.payload.len()
                        );
                        if frame_tx.send(frame).await.is_err() {
                            tracing::debug!("frame receiver dropped");
                            return Ok(());
                        }
                    }
                    Ok(None) => break, // Need more data.
                    Err(e) => {
                        // The decoder resynchronizes internally.
                        tracing::warn!("frame decode error: {}", e);
                    }
                }
            }
        }
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.writer.is_some() {
                return Ok(());
            }

            tracing::info!("connecting to serial port: {}", self.config.port);

            let mut stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .open_native_async()
                .map_err(Error::Serial)?;

            // Deasserted RTS is required for proper coordinator startup on
            // common CC253x adapter boards.
            if let Err(e) = tokio_serial::SerialPort::write_request_to_send(&mut stream, false) {
                tracing::warn!("failed to set RTS: {}", e);
            }

            // Wait for the device to be ready.
            tokio::time::sleep(self.config.connection_delay).await;

            // Drain stale bytes left over from before we opened the port.
            let mut buf = [0u8; 1024];
            let mut total_drained = 0usize;
            let drain_deadline = tokio::time::Instant::now() + Duration::from_millis(500);
            while tokio::time::Instant::now() < drain_deadline {
                match tokio::time::timeout(Duration::from_millis(20), stream.read(&mut buf)).await
                {
                    Ok(Ok(n)) if n > 0 => {
                        total_drained += n;
                    }
                    _ => {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
            if total_drained > 0 {
                tracing::debug!("drained {} stale bytes from buffer", total_drained);
            }

            let (reader, writer) = tokio::io::split(stream);
            let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

            self.read_task = Some(tokio::spawn(async move {
                if let Err(e) = Self::run_read_loop(reader, frame_tx).await {
                    tracing::error!("read loop error: {}", e);
                }
            }));
            self.frames = Some(frame_rx);
            self.writer = Some(Arc::new(Mutex::new(writer)));

            tracing::info!("connected to serial port");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.writer.is_some() {
                tracing::info!("disconnecting from serial port");
            }
            if let Some(task) = self.read_task.take() {
                task.abort();
            }
            self.writer = None;
            self.frames = None;
            Ok(())
        })
    }

    fn send_frame(
        &mut self,
        frame: Frame,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let writer = self.writer.clone();
        Box::pin(async move {
            let writer = writer.ok_or(Error::NotConnected)?;
            let mut writer = writer.lock().await;

            let wire = encode_frame(&frame);
            tracing::trace!(
                "sending frame {:?} {} ({} bytes)",
                frame.kind,
                frame.command,
                wire.len()
            );

            writer.write_all(&wire).await.map_err(Error::Io)?;
            writer.flush().await.map_err(Error::Io)?;

            Ok(())
        })
    }

    fn take_frames(&mut self) -> Option<mpsc::Receiver<Frame>> {
        self.frames.take()
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
    }
}

/// Lists available serial ports.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
