// UDP ingest transport: each datagram carries one JSON envelope.
// Invariants: only binds to localhost by default; payloads are forwarded without logging them;
// every TransportUnavailable is followed by TransportRestored once the socket is bound again.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::constants::MAX_DATAGRAM_LEN;
use crate::pipeline::InboundEvent;

pub const TRANSPORT: &str = "udp";

// Returns once the ingest channel is closed.
pub async fn udp_loop(bind_addr: SocketAddr, tx: mpsc::Sender<InboundEvent>, retry_delay: Duration) {
    let mut unavailable = false;

    loop {
        let outage = match bind_udp_socket(bind_addr).await {
            Ok(socket) => {
                if unavailable {
                    let restored = InboundEvent::TransportRestored {
                        transport: TRANSPORT,
                    };
                    if tx.send(restored).await.is_err() {
                        return;
                    }
                    unavailable = false;
                }
                match forward_datagrams(&socket, &tx).await {
                    Ok(()) => {
                        info!("ingest channel closed; stopping udp ingest");
                        return;
                    }
                    Err(err) => err,
                }
            }
            Err(err) => err,
        };

        if !unavailable {
            warn!(?outage, "udp ingest unavailable");
            let event = InboundEvent::TransportUnavailable {
                transport: TRANSPORT,
                reason: outage.to_string(),
            };
            if tx.send(event).await.is_err() {
                return;
            }
            unavailable = true;
        }
        tokio::time::sleep(retry_delay).await;
    }
}

async fn forward_datagrams(
    socket: &UdpSocket,
    tx: &mpsc::Sender<InboundEvent>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];

    loop {
        let (len, source) = socket.recv_from(&mut buf).await?;
        debug!(%source, len, "datagram received");
        // a full queue drops the datagram rather than stalling the socket
        match tx.try_send(InboundEvent::message(TRANSPORT, buf[..len].to_vec())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%source, "ingest queue full; datagram dropped");
            }
            Err(TrySendError::Closed(_)) => return Ok(()),
        }
    }
}

async fn bind_udp_socket(addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let socket = UdpSocket::bind(addr).await?;
    info!(addr = %socket.local_addr()?, "udp ingest started");
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETRY: Duration = Duration::from_millis(20);

    fn free_addr() -> SocketAddr {
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap()
    }

    async fn next_event(rx: &mut mpsc::Receiver<InboundEvent>) -> InboundEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn forwards_datagrams_to_ingest_channel() {
        let addr = free_addr();
        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(udp_loop(addr, tx, RETRY));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(br#"{"data":"00"}"#, addr).await.unwrap();

        match next_event(&mut rx).await {
            InboundEvent::Message {
                transport, payload, ..
            } => {
                assert_eq!(transport, TRANSPORT);
                assert_eq!(payload, br#"{"data":"00"}"#);
            }
            other => panic!("unexpected event {other:?}"),
        }
        task.abort();
    }

    #[tokio::test]
    async fn occupied_port_reports_outage_then_restores() {
        let blocker = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = blocker.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(udp_loop(addr, tx, RETRY));

        match next_event(&mut rx).await {
            InboundEvent::TransportUnavailable { transport, .. } => assert_eq!(transport, TRANSPORT),
            other => panic!("unexpected event {other:?}"),
        }

        drop(blocker);
        match next_event(&mut rx).await {
            InboundEvent::TransportRestored { transport } => assert_eq!(transport, TRANSPORT),
            other => panic!("unexpected event {other:?}"),
        }

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(br#"{"data":"01"}"#, addr).await.unwrap();
        assert!(matches!(next_event(&mut rx).await, InboundEvent::Message { .. }));
        task.abort();
    }
}
