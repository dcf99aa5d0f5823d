//! Delivery of frames to seated players.
//!
//! Recipients are snapshotted under the table lock, then written to
//! concurrently with the lock released. A peer whose write fails or stalls
//! past the send timeout is unseated; everyone else still gets the frame.

use futures_util::future::join_all;

use super::state::{Player, PlayerId, Table};
use crate::net::messages::Payload;

/// Sends `payload` to every active player except `skip`.
///
/// Returns the ids of players that were removed because their send failed.
pub async fn broadcast(table: &Table, payload: &Payload, skip: Option<PlayerId>) -> Vec<PlayerId> {
    let recipients: Vec<Player> = table
        .active_snapshot()
        .await
        .into_iter()
        .filter(|p| Some(p.id) != skip)
        .collect();

    let sends = recipients.iter().map(|player| async move {
        (player, player.conn().send(payload).await)
    });

    let mut failed = Vec::new();
    for (player, result) in join_all(sends).await {
        if let Err(error) = result {
            log::warn!("broadcast to {} failed: {}", player, error);
            table.drop_player(player.id).await;
            failed.push(player.id);
        }
    }
    failed
}

/// Sends `payload` to one player, unseating them on failure.
///
/// Returns whether the frame was written.
pub async fn deliver(table: &Table, player: &Player, payload: &Payload) -> bool {
    match player.conn().send(payload).await {
        Ok(()) => true,
        Err(error) => {
            log::warn!("send to {} failed: {}", player, error);
            table.drop_player(player.id).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{io::AsyncReadExt, net::TcpStream};

    use super::*;
    use crate::{
        game::entities::{Card, Suit},
        net::{
            messages::{OpponentEvent, PAYLOAD_LEN},
            utils::tests::connection_pair,
        },
        table::state::Seating,
    };

    async fn seat(table: &Table, name: &str) -> (PlayerId, TcpStream) {
        let (conn, client) = connection_pair().await;
        let (id, seating) = table.register(name.to_string(), 1, conn).await;
        assert_eq!(seating, Seating::Active);
        (id, client)
    }

    async fn read_payload(client: &mut TcpStream) -> Payload {
        let mut buf = [0; PAYLOAD_LEN];
        client.read_exact(&mut buf).await.unwrap();
        Payload::decode(&buf).unwrap()
    }

    #[tokio::test]
    async fn broadcast_skips_the_acting_player() {
        let table = Table::new();
        let (alice, mut alice_client) = seat(&table, "alice").await;
        let (_bob, mut bob_client) = seat(&table, "bob").await;

        let event = OpponentEvent::CardDrawn {
            player: alice,
            card: Card(9, Suit::Diamond),
        };
        let failed = broadcast(&table, &event.into(), Some(alice)).await;
        assert!(failed.is_empty());

        assert_eq!(read_payload(&mut bob_client).await.opponent_event(), Some(event));

        // Alice got nothing: the next frame she sees is this heartbeat.
        broadcast(&table, &Payload::heartbeat(), None).await;
        assert_eq!(read_payload(&mut alice_client).await, Payload::heartbeat());
    }

    #[tokio::test]
    async fn dead_peer_does_not_block_others() {
        let table = Table::new();
        let (_a, mut a_client) = seat(&table, "a").await;
        let (b, _b_client) = seat(&table, "b").await;
        let (_c, mut c_client) = seat(&table, "c").await;

        let b_conn = table
            .active_snapshot()
            .await
            .into_iter()
            .find(|p| p.id == b)
            .map(|p| p.conn().clone())
            .unwrap();
        b_conn.close().await;

        let update = Payload::update(Card(1, Suit::Spade));
        let failed = broadcast(&table, &update, None).await;
        assert_eq!(failed, vec![b]);
        assert!(!table.active_ids().await.contains(&b));

        assert_eq!(read_payload(&mut a_client).await, update);
        assert_eq!(read_payload(&mut c_client).await, update);
    }

    #[tokio::test]
    async fn failed_delivery_unseats_player() {
        let table = Table::new();
        let (id, _client) = seat(&table, "solo").await;
        let player = table.active_snapshot().await.remove(0);
        player.conn().close().await;

        assert!(!deliver(&table, &player, &Payload::your_turn()).await);
        assert_eq!(table.player_count().await, 0);
        assert!(!table.drop_player(id).await);
    }
}
