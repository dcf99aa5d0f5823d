//! TCP acceptor, player registration, and the server entry points.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use tokio::{
    net::{TcpListener, TcpStream},
    runtime::Builder,
    time::timeout,
};

use super::{
    discovery,
    errors::{ConnectionError, Result},
    messages::{JoinRequest, Payload, REQUEST_LEN},
    utils::{Connection, FrameReader},
};
use crate::table::{PlayerId, Scheduler, Seating, Table, TableConfig};

/// Reads the join request of a fresh connection and seats the player.
///
/// Players arriving mid-round land in the waiting room and get a heartbeat
/// right away so their client isn't left blocking on a silent socket.
pub async fn register(
    stream: TcpStream,
    addr: SocketAddr,
    table: &Table,
    config: &TableConfig,
) -> Result<PlayerId> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);

    let frame = timeout(config.registration_timeout, reader.next_frame::<REQUEST_LEN>())
        .await
        .map_err(|_| ConnectionError::Timeout(config.registration_timeout))??;
    let request = JoinRequest::decode(&frame)?;
    if request.rounds == 0 {
        return Err(ConnectionError::Rejected("zero rounds requested"));
    }

    let conn = Arc::new(Connection::new(
        addr,
        reader,
        write_half,
        config.send_timeout,
    ));
    let (id, seating) = table
        .register(request.client_name.clone(), request.rounds, conn.clone())
        .await;
    log::info!(
        "{} joined as '{}' (#{}) for {} round(s), {:?}",
        addr,
        request.client_name,
        id,
        request.rounds,
        seating
    );

    if seating == Seating::WaitingRoom
        && let Err(error) = conn.send(&Payload::heartbeat()).await
    {
        table.drop_player(id).await;
        return Err(error);
    }
    Ok(id)
}

/// Accepts connections forever, registering each on its own task.
pub async fn accept_loop(listener: TcpListener, table: Arc<Table>, config: Arc<TableConfig>) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(error) => {
                log::warn!("accept failed: {}", error);
                continue;
            }
        };
        log::debug!("new connection from {}", addr);

        let table = table.clone();
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(error) = register(stream, addr, &table, &config).await {
                log::warn!("dropping {} during registration: {}", addr, error);
            }
        });
    }
}

/// Runs discovery, registration and the round scheduler on the current
/// runtime. Only returns if the discovery socket can't be opened.
pub async fn serve(
    listener: TcpListener,
    table: Arc<Table>,
    config: TableConfig,
) -> std::result::Result<(), Error> {
    config.validate()?;
    let config = Arc::new(config);
    let port = listener.local_addr()?.port();
    log::info!("'{}' accepting players on port {}", config.server_name, port);

    tokio::spawn(Scheduler::new(table.clone(), config.clone()).run());
    tokio::spawn(accept_loop(listener, table, config.clone()));

    discovery::broadcast_offers(port, config)
        .await
        .context("discovery broadcaster stopped")
}

/// Binds `addr` and serves a fresh table on a new multi-threaded runtime,
/// blocking the calling thread.
pub fn run(addr: SocketAddr, config: TableConfig) -> std::result::Result<(), Error> {
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        serve(listener, Arc::new(Table::new()), config).await
    })
}
