//! Touchscreen link - byte transport to the display
//!
//! The display is reached either through a serial device node (already
//! configured for 115200 8N1 by the OS) or through a TCP serial bridge given as
//! `tcp://host:port`. One task decodes the inbound byte stream, another
//! drains queued instructions to the outbound side.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{FrameDecoder, Instruction, ScreenEvent};

const READ_BUFFER: usize = 256;
const EVENT_QUEUE: usize = 64;

/// Where the display is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEndpoint {
    /// Serial device node, e.g. `/dev/ttyUSB0`
    Device(PathBuf),
    /// TCP serial bridge
    Tcp(String),
}

impl ScreenEndpoint {
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix("tcp://") {
            Some(addr) => ScreenEndpoint::Tcp(addr.to_string()),
            None => ScreenEndpoint::Device(PathBuf::from(spec)),
        }
    }
}

impl std::fmt::Display for ScreenEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenEndpoint::Device(path) => write!(f, "{}", path.display()),
            ScreenEndpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Open the endpoint and split it into read and write halves
pub async fn connect(endpoint: &ScreenEndpoint) -> Result<(BoxedReader, BoxedWriter)> {
    match endpoint {
        ScreenEndpoint::Device(path) => {
            let reader = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open touchscreen device {}", path.display()))?;
            let writer = tokio::fs::OpenOptions::new()
                .write(true)
                .open(path)
                .await
                .with_context(|| {
                    format!("Failed to open touchscreen device {} for writing", path.display())
                })?;
            info!("Touchscreen attached on {}", path.display());
            Ok((Box::new(reader), Box::new(writer)))
        }
        ScreenEndpoint::Tcp(addr) => {
            let stream = tokio::net::TcpStream::connect(addr)
                .await
                .with_context(|| format!("Failed to connect to touchscreen bridge {}", addr))?;
            stream.set_nodelay(true).ok();
            let (reader, writer) = stream.into_split();
            info!("Touchscreen attached via tcp://{}", addr);
            Ok((Box::new(reader), Box::new(writer)))
        }
    }
}

/// Decode frames from `reader` until it closes
///
/// The returned receiver yields events in arrival order and ends when the
/// link does.
pub fn spawn_reader<R>(mut reader: R) -> mpsc::Receiver<ScreenEvent>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::channel(EVENT_QUEUE);

    tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; READ_BUFFER];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => {
                    info!("Touchscreen link closed");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!("Touchscreen read error: {}", e);
                    break;
                }
            };

            decoder.push(&buf[..n]);
            while let Some(event) = decoder.next_event() {
                debug!("Screen -> {:?}", event);
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }
    });

    rx
}

/// Write queued instructions to `writer` until every sender is dropped
pub fn spawn_writer<W>(
    mut writer: W,
    mut instructions: mpsc::UnboundedReceiver<Instruction>,
) -> JoinHandle<()>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        while let Some(instruction) = instructions.recv().await {
            let bytes = instruction.encode();
            if let Err(e) = writer.write_all(&bytes).await {
                warn!("Touchscreen write failed: {}", e);
                continue;
            }
            if let Err(e) = writer.flush().await {
                warn!("Touchscreen flush failed: {}", e);
            }
        }
        debug!("Touchscreen writer stopped");
    })
}
