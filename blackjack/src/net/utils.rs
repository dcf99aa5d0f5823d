use std::{
    io::{self, Read},
    net::SocketAddr,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use futures_util::FutureExt;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    sync::Mutex,
    time::timeout,
};

use super::{
    errors::{ConnectionError, Result},
    messages::{PAYLOAD_LEN, Payload},
};

const READ_CHUNK: usize = 64;

fn is_line_terminator(byte: &u8) -> bool {
    matches!(byte, b'\n' | b'\r')
}

/// Reassembles fixed-size frames from a byte stream.
///
/// Line terminators found where a frame would start are discarded, since
/// some clients follow their join request with a newline. Reads go through
/// `AsyncReadExt::read`, so dropping a pending `next_frame` future (e.g. on
/// a turn timeout) never loses bytes that already arrived.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::with_capacity(READ_CHUNK),
        }
    }

    pub async fn next_frame<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        loop {
            let skip = self.pending.iter().take_while(|b| is_line_terminator(b)).count();
            self.pending.drain(..skip);

            if self.pending.len() >= N {
                let mut frame = [0; N];
                frame.copy_from_slice(&self.pending[..N]);
                self.pending.drain(..N);
                return Ok(frame);
            }

            let mut chunk = [0; READ_CHUNK];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    /// Throws away buffered bytes and whatever is readable right now,
    /// without waiting for more. Returns how many bytes were dropped.
    pub fn discard_pending(&mut self) -> usize {
        let mut discarded = self.pending.len();
        self.pending.clear();
        let mut chunk = [0; READ_CHUNK];
        while let Some(Ok(n)) = self.inner.read(&mut chunk).now_or_never() {
            if n == 0 {
                break;
            }
            discarded += n;
        }
        discarded
    }
}

/// Blocking counterpart of [`FrameReader::next_frame`] for `std` streams.
/// Stray terminators before the frame are skipped.
pub fn read_frame<R: Read, const N: usize>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut frame = [0; N];
    let mut first = [0; 1];
    loop {
        reader.read_exact(&mut first)?;
        if !is_line_terminator(&first[0]) {
            break;
        }
    }
    frame[0] = first[0];
    reader.read_exact(&mut frame[1..])?;
    Ok(frame)
}

/// A seated player's socket.
///
/// Owned by exactly one [`crate::Player`] (shared behind an `Arc` so the
/// scheduler can work from a snapshot). Once closed, every further send or
/// receive fails with [`ConnectionError::Closed`].
#[derive(Debug)]
pub struct Connection {
    addr: SocketAddr,
    reader: Mutex<FrameReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
    send_timeout: Duration,
    closed: AtomicBool,
}

impl Connection {
    pub fn new(
        addr: SocketAddr,
        reader: FrameReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
        send_timeout: Duration,
    ) -> Self {
        Self {
            addr,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            send_timeout,
            closed: AtomicBool::new(false),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Writes one payload frame, bounded by the send timeout.
    pub async fn send(&self, payload: &Payload) -> Result<()> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        let buf = payload.encode();
        let mut writer = self.writer.lock().await;
        match timeout(self.send_timeout, writer.write_all(&buf)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ConnectionError::Timeout(self.send_timeout)),
        }
    }

    /// Reads the next payload frame. Cancel safe.
    pub async fn recv(&self) -> Result<Payload> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        let frame = self.reader.lock().await.next_frame::<PAYLOAD_LEN>().await?;
        Ok(Payload::decode(&frame)?)
    }

    /// Drops anything the client sent that hasn't been consumed yet.
    pub async fn discard_pending(&self) -> usize {
        self.reader.lock().await.discard_pending()
    }

    /// Marks the connection closed and shuts down the write side so the
    /// client sees EOF. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(error) = self.writer.lock().await.shutdown().await {
            log::debug!("shutdown of {} failed: {}", self.addr, error);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::{
        game::entities::{Card, Suit},
        net::messages::{Decision, JoinRequest, REQUEST_LEN},
    };

    /// A server-side connection and the raw client socket on the other end.
    pub(crate) async fn connection_pair() -> (Arc<Connection>, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let conn = Connection::new(
            peer,
            FrameReader::new(read_half),
            write_half,
            Duration::from_secs(1),
        );
        (Arc::new(conn), client)
    }

    #[tokio::test]
    async fn frames_split_across_writes() {
        let (conn, mut client) = connection_pair().await;
        let buf = Payload::decision(Decision::Hit).encode();
        client.write_all(&buf[..3]).await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(&buf[3..]).await.unwrap();
        let payload = conn.recv().await.unwrap();
        assert_eq!(payload.parse_decision(), Some(Decision::Hit));
    }

    #[tokio::test]
    async fn newline_after_request_is_discarded() {
        let (read_half, mut write_half) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(read_half);
        let request = JoinRequest {
            rounds: 2,
            client_name: "bob".to_string(),
        };
        write_half.write_all(&request.encode()).await.unwrap();
        write_half.write_all(b"\n").await.unwrap();
        write_half
            .write_all(&Payload::decision(Decision::Stand).encode())
            .await
            .unwrap();

        let frame = reader.next_frame::<REQUEST_LEN>().await.unwrap();
        assert_eq!(JoinRequest::decode(&frame).unwrap(), request);
        let frame = reader.next_frame::<PAYLOAD_LEN>().await.unwrap();
        assert_eq!(
            Payload::decode(&frame).unwrap().parse_decision(),
            Some(Decision::Stand)
        );
    }

    #[tokio::test]
    async fn discarded_bytes_never_reach_next_frame() {
        let (read_half, mut write_half) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(read_half);
        let hit = Payload::decision(Decision::Hit).encode();
        write_half.write_all(&hit).await.unwrap();
        write_half.write_all(&hit[..5]).await.unwrap();

        assert_eq!(reader.discard_pending(), PAYLOAD_LEN + 5);
        // Nothing left to drop, and the call doesn't wait for more.
        assert_eq!(reader.discard_pending(), 0);

        write_half
            .write_all(&Payload::decision(Decision::Stand).encode())
            .await
            .unwrap();
        let frame = reader.next_frame::<PAYLOAD_LEN>().await.unwrap();
        assert_eq!(
            Payload::decode(&frame).unwrap().parse_decision(),
            Some(Decision::Stand)
        );
    }

    #[tokio::test]
    async fn discard_drops_partially_buffered_frame() {
        let (read_half, mut write_half) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(read_half);
        let hit = Payload::decision(Decision::Hit).encode();
        write_half.write_all(&hit[..9]).await.unwrap();
        // A timed-out read leaves the partial frame in the buffer.
        let pending = tokio::time::timeout(
            Duration::from_millis(20),
            reader.next_frame::<PAYLOAD_LEN>(),
        )
        .await;
        assert!(pending.is_err());

        assert_eq!(reader.discard_pending(), 9);
        write_half.write_all(&Payload::your_turn().encode()).await.unwrap();
        let frame = reader.next_frame::<PAYLOAD_LEN>().await.unwrap();
        assert_eq!(Payload::decode(&frame).unwrap(), Payload::your_turn());
    }

    #[tokio::test]
    async fn eof_mid_frame() {
        let (read_half, mut write_half) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(read_half);
        write_half.write_all(&[0xAB, 0xCD]).await.unwrap();
        drop(write_half);
        let err = reader.next_frame::<PAYLOAD_LEN>().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (conn, mut client) = connection_pair().await;
        conn.send(&Payload::update(Card(4, Suit::Heart))).await.unwrap();
        conn.close().await;
        assert!(matches!(
            conn.send(&Payload::heartbeat()).await,
            Err(ConnectionError::Closed)
        ));

        let mut buf = [0; PAYLOAD_LEN];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(Payload::decode(&buf).unwrap().card(), Some(Card(4, Suit::Heart)));
        // Write side was shut down, so the client reads EOF next.
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[test]
    fn blocking_reader_skips_terminators() {
        let mut bytes = b"\r\n".to_vec();
        bytes.extend_from_slice(&Payload::your_turn().encode());
        let frame: [u8; PAYLOAD_LEN] = read_frame(&mut bytes.as_slice()).unwrap();
        assert_eq!(Payload::decode(&frame).unwrap(), Payload::your_turn());
    }
}
