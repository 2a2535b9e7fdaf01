//! GPIO output panel served over HTTP
//!
//! A fixed table of output pins, each on or off, driven through a
//! [`PinDriver`]. `GET /` renders the status page, `GET /<pin>/on|off`
//! drives a pin and re-renders it.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("unknown pin {0}")]
    UnknownPin(u8),

    #[error("pin {pin} driver failure: {reason}")]
    Driver { pin: u8, reason: String },
}

/// One configured output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PinSpec {
    pub pin: u8,
    pub label: String,
}

impl PinSpec {
    pub fn new(pin: u8, label: impl Into<String>) -> Self {
        Self {
            pin,
            label: label.into(),
        }
    }
}

/// Output table of the radio control head
pub fn default_pins() -> Vec<PinSpec> {
    vec![
        PinSpec::new(0, "Motor forward"),
        PinSpec::new(4, "Motor reverse"),
        PinSpec::new(32, "144 to 1296 triband"),
        PinSpec::new(25, "2304Ghz"),
        PinSpec::new(27, "Omnie enable"),
        PinSpec::new(16, "5760Ghz"),
        PinSpec::new(17, "triband dish"),
        PinSpec::new(21, "IO21"),
        PinSpec::new(22, "IO22"),
        PinSpec::new(2, "LED"),
    ]
}

/// Hardware access for output pins
pub trait PinDriver: Send + Sync {
    fn set_level(&self, pin: u8, high: bool) -> Result<(), GpioError>;
}

/// Driver for hosts without GPIO: logs every level change
#[derive(Debug, Default)]
pub struct LoggingPins;

impl PinDriver for LoggingPins {
    fn set_level(&self, pin: u8, high: bool) -> Result<(), GpioError> {
        info!("GPIO {} {}", pin, if high { "ON" } else { "OFF" });
        Ok(())
    }
}

/// Current state of one output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinState {
    pub pin: u8,
    pub label: String,
    pub on: bool,
}

/// The pin table and its driver
pub struct GpioBank {
    pins: Mutex<Vec<PinState>>,
    driver: Box<dyn PinDriver>,
}

impl GpioBank {
    /// Build the bank and drive every pin low
    pub fn new(specs: Vec<PinSpec>, driver: Box<dyn PinDriver>) -> Self {
        let pins: Vec<PinState> = specs
            .into_iter()
            .map(|spec| PinState {
                pin: spec.pin,
                label: spec.label,
                on: false,
            })
            .collect();

        for state in &pins {
            if let Err(e) = driver.set_level(state.pin, false) {
                warn!("Failed to initialize GPIO {}: {}", state.pin, e);
            }
        }
        debug!("GPIO bank ready with {} pins", pins.len());

        Self {
            pins: Mutex::new(pins),
            driver,
        }
    }

    /// Drive `pin` and record its state
    pub fn set(&self, pin: u8, on: bool) -> Result<(), GpioError> {
        let mut pins = self.pins.lock();
        let state = pins
            .iter_mut()
            .find(|p| p.pin == pin)
            .ok_or(GpioError::UnknownPin(pin))?;

        self.driver.set_level(pin, on)?;
        state.on = on;
        Ok(())
    }

    pub fn states(&self) -> Vec<PinState> {
        self.pins.lock().clone()
    }
}

/// Render the status page for `pins`
pub fn render_page(pins: &[PinState]) -> String {
    let mut html = String::from(PAGE_HEADER);

    for p in pins {
        let (class, next, button) = if p.on {
            ("on", "off", "Turn OFF")
        } else {
            ("off", "on", "Turn ON")
        };
        let _ = write!(
            html,
            "<div class=\"control-group\"><span>{label}</span>\
             <span class=\"status {class}\">{class}</span>\
             <button class=\"toggle-btn {class}\" onclick=\"location.href='/{pin}/{next}'\">{button}</button></div>\n",
            label = escape_html(&p.label),
            pin = p.pin,
        );
    }

    html.push_str(PAGE_FOOTER);
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const PAGE_HEADER: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Panel Control</title>
<link rel="icon" href="data:,">
<style>
body{background:#2d2f31;color:#fff;font-family:Helvetica,Arial,sans-serif;margin:0}
.container{max-width:520px;margin:40px auto;padding:24px;text-align:center}
.control-group{margin:20px 0;padding-bottom:14px;border-bottom:1px solid #444}
.status{margin-left:10px;padding:3px 12px;border-radius:12px;font-weight:600}
.on{background:#4CAF50}
.off{background:#f44336}
.toggle-btn{display:block;margin:10px auto 0;padding:14px 36px;border:none;border-radius:8px;color:#fff;cursor:pointer}
</style>
</head>
<body>
<div class="container">
<h1>Panel Control</h1>
"#;

const PAGE_FOOTER: &str = "</div>\n</body>\n</html>\n";

/// Router serving the status page and pin commands
pub fn router(bank: Arc<GpioBank>) -> Router {
    Router::new()
        .route("/", get(status_page))
        .route("/:pin/:level", get(drive_pin))
        .with_state(bank)
}

/// GET / - status page
async fn status_page(State(bank): State<Arc<GpioBank>>) -> Html<String> {
    Html(render_page(&bank.states()))
}

/// GET /:pin/on, GET /:pin/off
async fn drive_pin(
    Path((pin, level)): Path<(String, String)>,
    State(bank): State<Arc<GpioBank>>,
) -> Response {
    let on = match level.as_str() {
        "on" => true,
        "off" => false,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    let Ok(pin) = pin.parse::<u8>() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match bank.set(pin, on) {
        Ok(()) => Html(render_page(&bank.states())).into_response(),
        Err(GpioError::UnknownPin(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!("{}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
