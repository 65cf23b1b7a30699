//! Relays for every camera slot

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::instance::RelayInstance;
use crate::error::{Error, Result};
use crate::resolve::Resolver;

/// One relay per camera slot, on consecutive receive ports
pub struct RelaySet {
    relays: Vec<RelayInstance>,
    cancel: CancellationToken,
}

impl RelaySet {
    /// Bind `count` relays, slot `i` on `base_port + i`
    ///
    /// A `base_port` of 0 gives every relay an ephemeral port. If any port
    /// can't be bound the relays already started are stopped and the error
    /// is returned.
    pub async fn bind(
        count: usize,
        base_port: u16,
        camera_port: u16,
        patch_inquiry: bool,
        resolver: Arc<dyn Resolver>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let cancel = cancel.child_token();
        let mut relays = Vec::with_capacity(count);

        for slot in 0..count {
            let port = match slot_port(base_port, slot) {
                Ok(port) => port,
                Err(e) => {
                    Self::abort(relays, &cancel).await;
                    return Err(e);
                }
            };

            match RelayInstance::bind(
                port,
                camera_port,
                patch_inquiry,
                Arc::clone(&resolver),
                cancel.clone(),
            )
            .await
            {
                Ok(relay) => relays.push(relay),
                Err(e) => {
                    tracing::error!(slot, port, error = %e, "PTZ relay bind failed");
                    Self::abort(relays, &cancel).await;
                    return Err(e);
                }
            }
        }

        Ok(Self { relays, cancel })
    }

    async fn abort(relays: Vec<RelayInstance>, cancel: &CancellationToken) {
        cancel.cancel();
        for mut relay in relays {
            relay.shutdown().await;
        }
    }

    /// Number of relays
    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// Relay for a slot
    pub fn get(&self, slot: usize) -> Option<&RelayInstance> {
        self.relays.get(slot)
    }

    /// Point a slot's relay at a camera
    pub async fn set_camera_target(&self, slot: usize, host: &str) -> Result<SocketAddr> {
        let relay = self.relays.get(slot).ok_or(Error::SlotOutOfRange {
            slot,
            count: self.relays.len(),
        })?;
        relay.set_camera_target(host).await
    }

    /// Stop all relays
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        for relay in &mut self.relays {
            relay.shutdown().await;
        }
    }
}

fn slot_port(base_port: u16, slot: usize) -> Result<u16> {
    if base_port == 0 {
        return Ok(0);
    }

    u16::try_from(slot)
        .ok()
        .and_then(|slot| base_port.checked_add(slot))
        .ok_or_else(|| Error::SocketBind {
            port: base_port,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("slot {} has no port above {}", slot, base_port),
            ),
        })
}

#[cfg(test)]
mod tests {
    use tokio::net::UdpSocket;

    use super::*;
    use crate::resolve::StaticResolver;

    #[test]
    fn test_slot_port() {
        assert_eq!(slot_port(10001, 0).unwrap(), 10001);
        assert_eq!(slot_port(10001, 6).unwrap(), 10007);
        assert_eq!(slot_port(0, 6).unwrap(), 0);
        assert!(slot_port(u16::MAX, 1).is_err());
    }

    #[tokio::test]
    async fn test_bind_set() {
        let mut set = RelaySet::bind(
            3,
            0,
            52381,
            true,
            Arc::new(StaticResolver::new()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(set.len(), 3);
        assert!(set.get(3).is_none());

        set.set_camera_target(1, "10.0.0.9").await.unwrap();
        assert_eq!(
            set.get(1).unwrap().camera_target(),
            Some("10.0.0.9:52381".parse().unwrap())
        );
        assert!(set.get(0).unwrap().camera_target().is_none());
        assert!(matches!(
            set.set_camera_target(3, "10.0.0.9").await,
            Err(Error::SlotOutOfRange { slot: 3, count: 3 })
        ));

        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_bind_failure_fails_whole_set() {
        // hold a port, then ask for a set whose second slot needs it
        let taken = UdpSocket::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let Some(base) = port.checked_sub(1) else {
            return;
        };
        // base itself may be busy on a shared machine; either way the set must fail
        let result = RelaySet::bind(
            2,
            base,
            52381,
            true,
            Arc::new(StaticResolver::new()),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(Error::SocketBind { .. })));
    }
}
