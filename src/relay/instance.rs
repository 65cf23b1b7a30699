//! Single PTZ relay
//!
//! A relay owns one UDP socket. Datagrams from the camera go back to the last
//! controller heard from; everything else is treated as a controller command
//! and forwarded to the camera.
//!
//! ```text
//!   controller ──cmd──►  relay :base+i  ──cmd──►  camera :52381
//!   controller ◄─ack/completion─ relay ◄─ack/completion─ camera
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::frame::{fix_inquiry, ViscaHeader};
use super::RECV_BUFFER_SIZE;
use crate::error::{Error, Result};
use crate::resolve::Resolver;

/// One PTZ relay and its forwarding task
pub struct RelayInstance {
    local_addr: SocketAddr,
    camera_port: u16,
    camera_tx: watch::Sender<Option<SocketAddr>>,
    resolver: Arc<dyn Resolver>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RelayInstance {
    /// Bind `0.0.0.0:receive_port` and start forwarding
    ///
    /// Port 0 binds an ephemeral port. The task runs until `cancel` fires.
    pub async fn bind(
        receive_port: u16,
        camera_port: u16,
        patch_inquiry: bool,
        resolver: Arc<dyn Resolver>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", receive_port))
            .await
            .map_err(|source| Error::SocketBind {
                port: receive_port,
                source,
            })?;
        let local_addr = socket.local_addr()?;

        let (camera_tx, camera_rx) = watch::channel(None);
        let task = tokio::spawn(forward_loop(
            socket,
            camera_rx,
            patch_inquiry,
            cancel.clone(),
        ));

        tracing::info!(port = local_addr.port(), camera_port, "PTZ relay listening");

        Ok(Self {
            local_addr,
            camera_port,
            camera_tx,
            resolver,
            cancel,
            task: Some(task),
        })
    }

    /// Point the relay at a camera
    ///
    /// On resolution failure the previous target is kept and the error is
    /// returned to the caller.
    pub async fn set_camera_target(&self, host: &str) -> Result<SocketAddr> {
        let ip = self.resolver.resolve(host).await?;
        let addr = SocketAddr::new(ip, self.camera_port);

        self.camera_tx.send_replace(Some(addr));
        tracing::info!(port = self.local_addr.port(), ptz = host, camera = %addr, "PTZ target set");

        Ok(addr)
    }

    /// Current camera address, if one has been set
    pub fn camera_target(&self) -> Option<SocketAddr> {
        *self.camera_tx.borrow()
    }

    /// Local address of the receive socket
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Camera-side PTZ port
    pub fn camera_port(&self) -> u16 {
        self.camera_port
    }

    /// Stop the forwarding task and wait for it to exit
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(port = self.local_addr.port(), error = %e, "PTZ relay task failed");
            }
        }
    }
}

async fn forward_loop(
    socket: UdpSocket,
    camera_rx: watch::Receiver<Option<SocketAddr>>,
    patch_inquiry: bool,
    cancel: CancellationToken,
) {
    let port = socket.local_addr().map(|a| a.port()).unwrap_or_default();
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    // most recent sender that was not the camera
    let mut controller: Option<SocketAddr> = None;

    loop {
        let (len, from) = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                // a previous send's ICMP unreachable surfaces here as a reset
                Err(e) => {
                    tracing::debug!(port, error = %e, "Receive error ignored");
                    continue;
                }
            },
        };

        let camera = *camera_rx.borrow();
        let frame = &mut buf[..len];

        let dst = if Some(from) == camera {
            // a command may produce several replies, keep the controller
            controller
        } else {
            controller = Some(from);
            if patch_inquiry && fix_inquiry(frame) {
                tracing::trace!(
                    port,
                    sequence = ViscaHeader::parse(frame).map(|h| h.sequence),
                    "Inquiry sent as command, rewritten"
                );
            }
            camera
        };

        match dst {
            Some(dst) => {
                if let Err(e) = socket.send_to(frame, dst).await {
                    tracing::debug!(port, dst = %dst, error = %e, "Send error ignored");
                }
            }
            None => tracing::trace!(port, from = %from, len, "No destination, datagram dropped"),
        }
    }

    tracing::debug!(port, "PTZ relay stopped");
}
