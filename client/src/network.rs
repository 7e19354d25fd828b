//! Client transport: a non-blocking UDP socket drained once per frame.
//!
//! The simulation loop must never block on the network, so the socket is
//! polled at the tick boundary and every send is fire-and-forget, with no
//! acknowledgement and no retry. A dropped datagram simply never arrives.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use bincode::{deserialize, serialize};
use log::{error, info, warn};

use shared::{timestamp_millis, Message, PROTOCOL_VERSION};

/// How long the line may stay quiet before we remind the relay we exist.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

pub struct NetworkClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    last_sent: Instant,
}

impl NetworkClient {
    pub fn new(server: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let server_addr = server.parse()?;

        Ok(Self {
            socket,
            server_addr,
            last_sent: Instant::now(),
        })
    }

    pub fn connect(&mut self) {
        info!("Connecting to relay at {}...", self.server_addr);
        self.send(&Message::Connect {
            client_version: PROTOCOL_VERSION,
        });
    }

    /// Fire-and-forget send. Failures are logged and never retried.
    pub fn send(&mut self, message: &Message) {
        match serialize(message) {
            Ok(data) => {
                if let Err(e) = self.socket.send_to(&data, self.server_addr) {
                    error!("Failed to send to relay: {}", e);
                }
                self.last_sent = Instant::now();
            }
            Err(e) => error!("Failed to serialize message: {}", e),
        }
    }

    /// Drains every datagram that has arrived since the previous frame.
    pub fn poll(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        let mut buffer = [0u8; 2048];

        loop {
            match self.socket.recv_from(&mut buffer) {
                Ok((len, addr)) => {
                    if addr != self.server_addr {
                        warn!("Dropping datagram from unexpected address {}", addr);
                        continue;
                    }

                    match deserialize::<Message>(&buffer[0..len]) {
                        Ok(message) => messages.push(message),
                        Err(_) => warn!("Failed to deserialize datagram from {}", addr),
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("Error receiving datagram: {}", e);
                    break;
                }
            }
        }

        messages
    }

    /// Keeps an otherwise idle connection registered with the relay.
    pub fn maybe_heartbeat(&mut self) {
        if self.last_sent.elapsed() >= HEARTBEAT_INTERVAL {
            self.send(&Message::Heartbeat {
                timestamp: timestamp_millis(),
            });
        }
    }

    pub fn disconnect(&mut self) {
        self.send(&Message::Disconnect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn fake_relay() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    #[test]
    fn test_poll_without_traffic_is_empty() {
        let (_relay, addr) = fake_relay();
        let mut client = NetworkClient::new(&addr.to_string()).unwrap();

        assert!(client.poll().is_empty());
    }

    #[test]
    fn test_connect_reaches_relay() {
        let (relay, addr) = fake_relay();
        let mut client = NetworkClient::new(&addr.to_string()).unwrap();

        client.connect();

        let mut buffer = [0u8; 2048];
        relay
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let (len, _) = relay.recv_from(&mut buffer).unwrap();

        match deserialize::<Message>(&buffer[0..len]).unwrap() {
            Message::Connect { client_version } => {
                assert_eq!(client_version, PROTOCOL_VERSION);
            }
            other => panic!("Expected a connect, got {:?}", other),
        }
    }

    #[test]
    fn test_poll_receives_relay_messages() {
        let (relay, addr) = fake_relay();
        let mut client = NetworkClient::new(&addr.to_string()).unwrap();

        // The relay learns our address from the first datagram.
        client.connect();
        let mut buffer = [0u8; 2048];
        relay
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let (_, client_addr) = relay.recv_from(&mut buffer).unwrap();

        let reply = serialize(&Message::Connected { client_id: 3 }).unwrap();
        relay.send_to(&reply, client_addr).unwrap();

        // Loopback delivery is fast but not instant.
        thread::sleep(Duration::from_millis(50));

        let messages = client.poll();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            Message::Connected { client_id } => assert_eq!(*client_id, 3),
            other => panic!("Expected the acknowledgement, got {:?}", other),
        }
    }

    #[test]
    fn test_datagrams_from_other_addresses_dropped() {
        let (relay, addr) = fake_relay();
        let (stranger, _) = fake_relay();
        let mut client = NetworkClient::new(&addr.to_string()).unwrap();

        client.connect();
        let mut buffer = [0u8; 2048];
        relay
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let (_, client_addr) = relay.recv_from(&mut buffer).unwrap();

        let spoofed = serialize(&Message::Connected { client_id: 99 }).unwrap();
        stranger.send_to(&spoofed, client_addr).unwrap();

        thread::sleep(Duration::from_millis(50));

        assert!(client.poll().is_empty());
    }
}
