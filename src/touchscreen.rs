//! Touchscreen surface
//!
//! Serial display with two pages: three primary buttons and the speed slider
//! on page 1, ten secondary buttons on page 2.

mod adapter;
mod link;
pub mod protocol;

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::engine::EngineHandle;

pub use adapter::{widget_property, ScreenWriter, TouchscreenAdapter, UiEvent, SLIDER_LABEL};
pub use link::{connect, spawn_reader, spawn_writer, ScreenEndpoint};
pub use protocol::{FrameDecoder, Instruction, ScreenEvent};

/// Attach the display, register it with the engine and start the event loop
///
/// The returned task ends when the link closes.
pub async fn start(endpoint: &ScreenEndpoint, engine: EngineHandle) -> Result<JoinHandle<()>> {
    let (reader, writer) = connect(endpoint).await?;

    let (screen, instructions) = ScreenWriter::channel();
    spawn_writer(writer, instructions);

    let adapter = Arc::new(TouchscreenAdapter::new(engine.clone(), screen));
    engine.register_surface(adapter.clone());

    let events = ReceiverStream::new(spawn_reader(reader));
    Ok(tokio::spawn(async move {
        adapter.run(events).await;
    }))
}
