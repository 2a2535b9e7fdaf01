//! Touchscreen adapter
//!
//! Translates component events from the screen into engine mutations and
//! engine refreshes into widget writes. Writes are queued on a
//! [`ScreenWriter`] and never waited on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, trace};

use super::protocol::{Instruction, ScreenEvent};
use crate::engine::EngineHandle;
use crate::state::{ControlId, ControlSnapshot};
use crate::surface::{Page, ResyncScope, Surface, SurfaceId};

/// Label widget mirroring the slider value
pub const SLIDER_LABEL: &str = "t0.txt";

/// Component events the adapter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// A button was tapped
    Tap(ControlId),
    /// The slider was released; its value must be read back
    SliderReleased,
    /// A page was drawn and needs its widgets repainted
    PageShown(Page),
}

impl UiEvent {
    /// Map a component name through the static name table
    ///
    /// Returns `None` for components outside the panel's control set.
    pub fn from_component(name: &str) -> Option<UiEvent> {
        match name {
            "page1" => Some(UiEvent::PageShown(Page::Main)),
            "page2" => Some(UiEvent::PageShown(Page::Secondary)),
            _ => match name.parse::<ControlId>().ok()? {
                ControlId::Slider => Some(UiEvent::SliderReleased),
                id => Some(UiEvent::Tap(id)),
            },
        }
    }
}

/// Fire-and-forget sender of screen instructions
#[derive(Clone)]
pub struct ScreenWriter {
    tx: mpsc::UnboundedSender<Instruction>,
}

impl ScreenWriter {
    /// Create a writer and the receiving end the link task drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Instruction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an instruction; dropped silently when the link is gone
    pub fn send(&self, instruction: Instruction) {
        trace!("Screen <- {:?}", instruction);
        let _ = self.tx.send(instruction);
    }
}

/// Touchscreen surface adapter
pub struct TouchscreenAdapter {
    engine: EngineHandle,
    writer: ScreenWriter,
    /// Value each widget currently displays
    shown: Mutex<HashMap<ControlId, i32>>,
    /// A `get slider1.val` is outstanding
    slider_read_pending: AtomicBool,
}

impl TouchscreenAdapter {
    pub fn new(engine: EngineHandle, writer: ScreenWriter) -> Self {
        Self {
            engine,
            writer,
            shown: Mutex::new(HashMap::new()),
            slider_read_pending: AtomicBool::new(false),
        }
    }

    /// Consume decoded screen events until the stream ends
    pub async fn run<S>(&self, mut events: S)
    where
        S: Stream<Item = ScreenEvent> + Unpin,
    {
        info!("Touchscreen adapter listening");
        while let Some(event) = events.next().await {
            self.handle_event(event).await;
        }
        info!("Touchscreen event stream ended");
    }

    /// Handle one decoded frame
    pub async fn handle_event(&self, event: ScreenEvent) {
        match event {
            ScreenEvent::Component(name) => match UiEvent::from_component(&name) {
                Some(ui) => self.handle_ui_event(ui).await,
                None => debug!("Ignoring touchscreen component '{}'", name),
            },
            ScreenEvent::Number(value) => {
                if self.slider_read_pending.swap(false, Ordering::SeqCst) {
                    self.apply_slider(value).await;
                } else {
                    trace!("Unsolicited numeric reply {}", value);
                }
            }
            ScreenEvent::Status(code) => {
                if self.slider_read_pending.swap(false, Ordering::SeqCst) {
                    debug!("Slider read answered with status 0x{:02X}, dropped", code);
                } else {
                    trace!("Touchscreen status 0x{:02X}", code);
                }
            }
        }
    }

    async fn handle_ui_event(&self, event: UiEvent) {
        match event {
            UiEvent::Tap(id) => {
                // The widget flips itself before reporting the tap
                if let Some(shown) = self.shown.lock().get_mut(&id) {
                    *shown = id.kind().toggled(*shown);
                }
                if let Err(e) = self.engine.toggle(SurfaceId::Touchscreen, id).await {
                    error!("Touchscreen tap on {} failed: {}", id, e);
                }
            }
            UiEvent::SliderReleased => {
                self.slider_read_pending.store(true, Ordering::SeqCst);
                self.writer
                    .send(Instruction::get(widget_property(ControlId::Slider)));
            }
            UiEvent::PageShown(page) => {
                debug!("Touchscreen page {:?} shown", page);
                self.engine
                    .resync(SurfaceId::Touchscreen, ResyncScope::Page(page));
            }
        }
    }

    async fn apply_slider(&self, raw: i32) {
        // The widget sits where it was released
        self.shown.lock().insert(ControlId::Slider, raw);

        if let Err(e) = self
            .engine
            .apply_change(SurfaceId::Touchscreen, ControlId::Slider, i64::from(raw))
            .await
        {
            error!("Touchscreen slider change failed: {}", e);
        }
    }

    fn push(&self, id: ControlId, value: i32) {
        self.writer
            .send(Instruction::set_number(widget_property(id), value));
        if id == ControlId::Slider {
            self.writer
                .send(Instruction::set_text(SLIDER_LABEL, value.to_string()));
        }
        self.shown.lock().insert(id, value);
    }
}

/// Numeric property of the widget showing `id`
pub fn widget_property(id: ControlId) -> String {
    format!("{}.val", id)
}

impl Surface for TouchscreenAdapter {
    fn id(&self) -> SurfaceId {
        SurfaceId::Touchscreen
    }

    fn refresh(&self, control: ControlId, value: i32) {
        if self.shown.lock().get(&control) == Some(&value) {
            trace!("{} already shows {}", control, value);
            return;
        }
        self.push(control, value);
    }

    fn applied_locally(&self, control: ControlId, value: i32) {
        let on_screen = self.shown.lock().get(&control).copied();
        if on_screen != Some(value) {
            self.push(control, value);
            return;
        }
        if control == ControlId::Slider {
            self.writer
                .send(Instruction::set_text(SLIDER_LABEL, value.to_string()));
        }
        self.shown.lock().insert(control, value);
    }

    fn resync(&self, scope: ResyncScope, snapshot: &ControlSnapshot) {
        for (id, value) in snapshot.iter() {
            if Page::of(id).in_scope(scope) {
                self.push(id, value);
            }
        }
    }
}
