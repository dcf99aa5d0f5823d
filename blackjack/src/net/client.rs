//! A low-level blocking blackjack client.
//!
//! This client is blocking and has no UI, so it's primarily used as a
//! testing utility rather than as an actual game client.

use anyhow::{Error, bail};
use std::{
    io::Write,
    net::{SocketAddr, TcpStream, UdpSocket},
    thread,
    time::{Duration, Instant},
};

use super::{
    messages::{Decision, JoinRequest, Offer, PAYLOAD_LEN, Payload},
    utils,
};

/// Default time to wait for a server offer.
pub const OFFER_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for reading from the server.
pub const READ_TIMEOUT: Duration = Duration::from_secs(20);

/// Default timeout for writing to the server.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// A blocking TCP client for a blackjack server.
pub struct Client {
    /// The name sent in the join request.
    pub name: String,
    /// The underlying TCP stream.
    pub stream: TcpStream,
}

impl Client {
    /// Listens on `bind` for the first valid offer.
    ///
    /// Datagrams that aren't offers are skipped until `timeout` runs out.
    /// Returns the server's TCP address (offer sender's IP, advertised
    /// port) along with the offer itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket can't be bound or no offer arrives
    /// in time.
    pub fn discover(bind: SocketAddr, timeout: Duration) -> Result<(SocketAddr, Offer), Error> {
        let socket = UdpSocket::bind(bind)?;
        let deadline = Instant::now() + timeout;
        let mut buf = [0; 64];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                bail!("no offer received on {bind} within {timeout:?}");
            }
            socket.set_read_timeout(Some(remaining))?;
            let (n, from) = match socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(error)
                    if matches!(
                        error.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(error) => bail!(error),
            };
            match Offer::decode(&buf[..n]) {
                Ok(offer) => return Ok((SocketAddr::new(from.ip(), offer.tcp_port), offer)),
                Err(error) => log::debug!("ignoring datagram from {from}: {error}"),
            }
        }
    }

    /// Connects to a server and sends the join request.
    ///
    /// This method attempts to connect with backoff, trying three times
    /// with decreasing timeouts (1s, 500ms, 100ms). The request is followed
    /// by a newline, which the server tolerates.
    ///
    /// # Errors
    ///
    /// Returns an error if unable to connect or to send the request.
    pub fn connect(name: &str, rounds: u8, addr: &SocketAddr) -> Result<Self, Error> {
        let mut connect_timeouts = vec![
            Duration::from_secs(1),
            Duration::from_millis(500),
            Duration::from_millis(100),
        ];
        while let Some(connect_timeout) = connect_timeouts.pop() {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(mut stream) => {
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                    let request = JoinRequest {
                        rounds,
                        client_name: name.to_string(),
                    };
                    let mut bytes = request.encode().to_vec();
                    bytes.push(b'\n');
                    stream.write_all(&bytes)?;
                    return Ok(Self {
                        name: name.to_string(),
                        stream,
                    });
                }
                _ => thread::sleep(connect_timeout),
            }
        }
        bail!("couldn't connect to {addr} as {name}")
    }

    /// Receives the next payload frame.
    pub fn recv(&mut self) -> Result<Payload, Error> {
        let frame: [u8; PAYLOAD_LEN] = utils::read_frame(&mut self.stream)?;
        Ok(Payload::decode(&frame)?)
    }

    pub fn decide(&mut self, decision: Decision) -> Result<(), Error> {
        self.send_raw(&Payload::decision(decision).encode())
    }

    /// Writes arbitrary bytes, e.g. to probe how the server handles noise.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.stream.write_all(bytes)?;
        Ok(())
    }
}
