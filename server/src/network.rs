//! Relay network layer: UDP socket handling and the event loop that feeds
//! the hub.
//!
//! All inbound datagrams funnel through one mpsc channel into a single
//! processing loop, so every message is handled to completion before the
//! next and snapshot mutations need no locking. Socket reads, socket
//! writes, and the timeout sweep run as separate tasks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bincode::{deserialize, serialize};
use log::{error, info, warn};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

use shared::{Entity, Message, PROTOCOL_VERSION};

use crate::clients::ClientManager;
use crate::hub::{Action, Hub};

/// Events sent from network tasks to the processing loop.
#[derive(Debug)]
pub enum ServerEvent {
    PacketReceived { message: Message, addr: SocketAddr },
    ClientTimeout { client_id: u32 },
}

/// Outbound work queued for the sender task.
#[derive(Debug)]
pub enum Outgoing {
    Send {
        message: Message,
        addr: SocketAddr,
    },
    Broadcast {
        message: Message,
        exclude: Option<u32>,
    },
}

/// The relay process: socket, connection registry, and hub.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    hub: Hub,

    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
    out_tx: mpsc::UnboundedSender<Outgoing>,
    out_rx: mpsc::UnboundedReceiver<Outgoing>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
        timeout: Duration,
        level: Vec<Entity>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Relay listening on {}", addr);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients, timeout))),
            hub: Hub::with_entities(level),
            event_tx,
            event_rx,
            out_tx,
            out_rx,
        })
    }

    /// Spawns the task that continuously listens for incoming datagrams.
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(message) = deserialize::<Message>(&buffer[0..len]) {
                            if event_tx
                                .send(ServerEvent::PacketReceived { message, addr })
                                .is_err()
                            {
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize datagram from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outgoing queue.
    ///
    /// Broadcasts enumerate the live connection set at send time; a failed
    /// send to one address is logged and does not abort the fan-out.
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut out_rx = std::mem::replace(&mut self.out_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(outgoing) = out_rx.recv().await {
                match outgoing {
                    Outgoing::Send { message, addr } => {
                        if let Err(e) = Self::send_impl(&socket, &message, addr).await {
                            error!("Failed to send to {}: {}", addr, e);
                        }
                    }
                    Outgoing::Broadcast { message, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_impl(&socket, &message, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that sweeps out silent connections.
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if event_tx
                        .send(ServerEvent::ClientTimeout { client_id })
                        .is_err()
                    {
                        return;
                    }
                }
            }
        });
    }

    async fn send_impl(
        socket: &UdpSocket,
        message: &Message,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(message)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn queue(&self, outgoing: Outgoing) {
        if self.out_tx.send(outgoing).is_err() {
            error!("Failed to queue outgoing message: sender task gone");
        }
    }

    /// Executes the hub's decisions, resolving connection ids to addresses.
    async fn dispatch(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Send { to, message } => {
                    let addr = {
                        let clients = self.clients.read().await;
                        clients.addr_of(to)
                    };

                    match addr {
                        Some(addr) => self.queue(Outgoing::Send { message, addr }),
                        // Disconnected between decision and dispatch.
                        None => warn!("Dropping message for unknown client {}", to),
                    }
                }
                Action::Broadcast { exclude, message } => {
                    self.queue(Outgoing::Broadcast { message, exclude });
                }
            }
        }
    }

    async fn handle_packet(&mut self, message: Message, addr: SocketAddr) {
        match message {
            Message::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    self.queue(Outgoing::Send {
                        message: Message::Disconnected {
                            reason: "Protocol version mismatch".to_string(),
                        },
                        addr,
                    });
                    return;
                }

                // A reconnect from the same address replaces the old
                // registration, with full disconnect side effects.
                let existing = {
                    let clients = self.clients.read().await;
                    clients.find_by_addr(addr)
                };

                if let Some(existing_id) = existing {
                    info!("Replacing existing client {} from {}", existing_id, addr);
                    {
                        let mut clients = self.clients.write().await;
                        clients.remove(existing_id);
                    }
                    let actions = self.hub.on_disconnect(existing_id);
                    self.dispatch(actions).await;
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add(addr)
                };

                match client_id {
                    Some(client_id) => {
                        let actions = self.hub.on_connect(client_id);
                        self.dispatch(actions).await;
                    }
                    None => {
                        self.queue(Outgoing::Send {
                            message: Message::Disconnected {
                                reason: "Relay full".to_string(),
                            },
                            addr,
                        });
                    }
                }
            }

            Message::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    {
                        let mut clients = self.clients.write().await;
                        clients.remove(client_id);
                    }
                    let actions = self.hub.on_disconnect(client_id);
                    self.dispatch(actions).await;
                }
            }

            message => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_by_addr(addr)
                };

                match client_id {
                    Some(client_id) => {
                        {
                            let mut clients = self.clients.write().await;
                            clients.refresh(client_id);
                        }
                        let actions = self.hub.handle(client_id, message);
                        self.dispatch(actions).await;
                    }
                    None => {
                        warn!("Dropping message from unregistered address {}", addr);
                    }
                }
            }
        }
    }

    /// Runs the processing loop until the receiver task dies.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!("Relay started");

        while let Some(event) = self.event_rx.recv().await {
            match event {
                ServerEvent::PacketReceived { message, addr } => {
                    self.handle_packet(message, addr).await;
                }
                ServerEvent::ClientTimeout { client_id } => {
                    info!("Client {} timed out", client_id);
                    let actions = self.hub.on_disconnect(client_id);
                    self.dispatch(actions).await;
                }
            }
        }

        info!("Relay shutting down");
        Ok(())
    }
}
