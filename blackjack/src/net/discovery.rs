//! Best-effort server discovery over UDP broadcast.

use std::{io, net::SocketAddr, sync::Arc};

use tokio::{net::UdpSocket, time::interval};

use super::messages::Offer;
use crate::table::TableConfig;

/// Broadcasts an offer for `tcp_port` every `offer_interval`, forever.
///
/// Send failures are logged and skipped; the next tick simply tries again.
/// Only failing to open the socket is returned as an error.
pub async fn broadcast_offers(tcp_port: u16, config: Arc<TableConfig>) -> io::Result<()> {
    let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).await?;
    socket.set_broadcast(true)?;

    let frame = Offer {
        tcp_port,
        server_name: config.server_name.clone(),
    }
    .encode();

    log::info!(
        "advertising '{}' on port {} to {}",
        config.server_name,
        tcp_port,
        config.broadcast_addr
    );

    let mut ticker = interval(config.offer_interval);
    loop {
        ticker.tick().await;
        if let Err(error) = socket.send_to(&frame, config.broadcast_addr).await {
            log::debug!("offer to {} failed: {}", config.broadcast_addr, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::net::messages::OFFER_LEN;

    #[tokio::test]
    async fn offers_repeat() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = Arc::new(TableConfig {
            server_name: "Dealer Dan".to_string(),
            broadcast_addr: listener.local_addr().unwrap(),
            offer_interval: Duration::from_millis(20),
            ..TableConfig::default()
        });
        let task = tokio::spawn(broadcast_offers(4242, config));

        let mut buf = [0; 64];
        for _ in 0..2 {
            let (n, _) = listener.recv_from(&mut buf).await.unwrap();
            assert_eq!(n, OFFER_LEN);
            let offer = Offer::decode(&buf[..n]).unwrap();
            assert_eq!(offer.tcp_port, 4242);
            assert_eq!(offer.server_name, "Dealer Dan");
        }
        task.abort();
    }
}
