//! Connection registry for the relay.
//!
//! Tracks which source addresses are registered, assigns connection ids,
//! and sweeps out connections that have gone silent. The relay runs no
//! simulation, so unlike a full game server there is nothing to queue per
//! client: a connection is just an address with an assigned id and a
//! liveness timestamp.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use log::info;

/// A registered connection.
#[derive(Debug)]
pub struct Connection {
    pub id: u32,
    pub addr: SocketAddr,
    /// Last time any datagram arrived from this address.
    pub last_seen: Instant,
}

impl Connection {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages the live connection set.
///
/// Ids start at 1 and increment per connection; id 0 is reserved for the
/// relay itself as the owner tag of static level entities.
pub struct ClientManager {
    connections: HashMap<u32, Connection>,
    next_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Registers a new connection, or returns `None` at capacity.
    pub fn add(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.connections.len() >= self.max_clients {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        info!("Client {} connected from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr));

        Some(id)
    }

    /// Drops a connection. Returns false if it was already gone.
    pub fn remove(&mut self, id: u32) -> bool {
        if let Some(connection) = self.connections.remove(&id) {
            info!("Client {} disconnected", connection.id);
            true
        } else {
            false
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.connections
            .iter()
            .find(|(_, connection)| connection.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, id: u32) -> Option<SocketAddr> {
        self.connections.get(&id).map(|connection| connection.addr)
    }

    /// Marks a connection as alive. Any inbound datagram counts.
    pub fn refresh(&mut self, id: u32) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.last_seen = Instant::now();
        }
    }

    /// Removes and returns every connection silent for longer than the
    /// configured timeout.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timeout = self.timeout;
        let timed_out: Vec<u32> = self
            .connections
            .iter()
            .filter(|(_, connection)| connection.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for id in &timed_out {
            self.remove(*id);
        }

        timed_out
    }

    /// The live connection set for broadcasting, enumerated at call time.
    pub fn client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.connections
            .iter()
            .map(|(id, connection)| (*id, connection.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    fn manager(max: usize) -> ClientManager {
        ClientManager::new(max, Duration::from_secs(5))
    }

    #[test]
    fn test_ids_assigned_from_one() {
        let mut clients = manager(4);

        assert_eq!(clients.add(test_addr()), Some(1));
        assert_eq!(clients.add(test_addr2()), Some(2));
        assert_eq!(clients.len(), 2);
    }

    #[test]
    fn test_capacity_limit() {
        let mut clients = manager(1);

        assert!(clients.add(test_addr()).is_some());
        assert!(clients.add(test_addr2()).is_none());
        assert_eq!(clients.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut clients = manager(2);
        let id = clients.add(test_addr()).unwrap();

        assert!(clients.remove(id));
        assert!(clients.is_empty());
        assert!(!clients.remove(id));
    }

    #[test]
    fn test_find_by_addr() {
        let mut clients = manager(2);
        let id = clients.add(test_addr()).unwrap();
        clients.add(test_addr2()).unwrap();

        assert_eq!(clients.find_by_addr(test_addr()), Some(id));

        let unknown: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(clients.find_by_addr(unknown), None);
    }

    #[test]
    fn test_addr_of() {
        let mut clients = manager(2);
        let id = clients.add(test_addr()).unwrap();

        assert_eq!(clients.addr_of(id), Some(test_addr()));
        assert_eq!(clients.addr_of(99), None);
    }

    #[test]
    fn test_timeout_sweep() {
        let mut clients = manager(2);
        let id = clients.add(test_addr()).unwrap();
        let keeper = clients.add(test_addr2()).unwrap();

        clients
            .connections
            .get_mut(&id)
            .unwrap()
            .last_seen = Instant::now() - Duration::from_secs(10);

        let timed_out = clients.check_timeouts();
        assert_eq!(timed_out, vec![id]);
        assert_eq!(clients.len(), 1);
        assert!(clients.addr_of(keeper).is_some());
    }

    #[test]
    fn test_refresh_prevents_timeout() {
        let mut clients = manager(2);
        let id = clients.add(test_addr()).unwrap();

        clients
            .connections
            .get_mut(&id)
            .unwrap()
            .last_seen = Instant::now() - Duration::from_secs(10);
        clients.refresh(id);

        assert!(clients.check_timeouts().is_empty());
        assert_eq!(clients.len(), 1);
    }

    #[test]
    fn test_client_addrs_enumerates_live_set() {
        let mut clients = manager(3);
        clients.add(test_addr()).unwrap();
        let second = clients.add(test_addr2()).unwrap();
        clients.remove(second);

        let addrs = clients.client_addrs();
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].1, test_addr());
    }
}
