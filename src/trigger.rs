//! Show-control trigger
//!
//! Presses a button on a show-control surface (Bitfocus Companion UDP API)
//! whenever a camera slot is switched to a real source. The column is the
//! slot index, so a page can hold one "camera switched" macro per slot.

use tokio::net::UdpSocket;

use crate::config::TriggerConfig;

/// Fire-and-forget button press sender
///
/// A trigger whose socket couldn't be set up is inert: [`press`](Self::press)
/// does nothing. Send failures are logged, never returned.
#[derive(Debug)]
pub struct ControlTrigger {
    socket: Option<UdpSocket>,
    page: String,
    row: u32,
}

impl ControlTrigger {
    /// A trigger that never sends
    pub fn disabled() -> Self {
        Self {
            socket: None,
            page: String::new(),
            row: 0,
        }
    }

    /// Connect a UDP socket to the configured host
    ///
    /// Failure is reported once and yields an inert trigger.
    pub async fn connect(config: &TriggerConfig) -> Self {
        let socket = match Self::open(config).await {
            Ok(socket) => {
                tracing::info!(host = %config.host, port = config.port, "Show control trigger ready");
                Some(socket)
            }
            Err(e) => {
                tracing::warn!(
                    host = %config.host,
                    port = config.port,
                    error = %e,
                    "Show control trigger unavailable, button presses disabled"
                );
                None
            }
        };

        Self {
            socket,
            page: config.page.clone(),
            row: config.row,
        }
    }

    async fn open(config: &TriggerConfig) -> std::io::Result<UdpSocket> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.connect((config.host.as_str(), config.port)).await?;
        Ok(socket)
    }

    /// Whether presses are actually sent
    pub fn is_enabled(&self) -> bool {
        self.socket.is_some()
    }

    /// Press the button at `column` on the configured page and row
    pub async fn press(&self, column: usize) {
        let Some(socket) = &self.socket else {
            return;
        };

        let message = location_press(&self.page, self.row, column);
        if let Err(e) = socket.send(message.as_bytes()).await {
            tracing::debug!(error = %e, message = %message, "Show control press not sent");
        }
    }
}

/// `LOCATION {page}/{row}/{column} PRESS`
pub fn location_press(page: &str, row: u32, column: usize) -> String {
    format!("LOCATION {}/{}/{} PRESS", page, row, column)
}
