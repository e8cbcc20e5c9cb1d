//! Best-effort UDP multiplayer: one server relays chat and poses between clients.
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::core::packet::{Packet, PoseUpdate};

pub const DEFAULT_PORT: u16 = 1234;
/// Server plus clients.
pub const MAX_PLAYERS: usize = 16;
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);
const HANDSHAKE_RETRY: Duration = Duration::from_millis(250);
const MAX_DATAGRAM: usize = 512;
/// The server always plays as this id.
pub const SERVER_PLAYER_ID: u8 = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    pub addr: SocketAddr,
    pub player_id: u8,
    pub name: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum NetMode {
    Offline,
    Server { peers: Vec<Peer> },
    Client { server: SocketAddr, player_id: u8 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum NetEvent {
    Connected { player_id: u8, name: String },
    Chat { text: String },
    Pose(PoseUpdate),
    Hit { player_id: u8 },
    Disconnected { player_id: u8 },
}

pub struct Network {
    socket: Option<UdpSocket>,
    mode: NetMode,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Self {
            socket: None,
            mode: NetMode::Offline,
        }
    }

    pub fn mode(&self) -> &NetMode {
        &self.mode
    }

    pub fn is_online(&self) -> bool {
        !matches!(self.mode, NetMode::Offline)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn local_player_id(&self) -> u8 {
        match self.mode {
            NetMode::Client { player_id, .. } => player_id,
            _ => SERVER_PLAYER_ID,
        }
    }

    /// Starts a server on `port` (0 picks a free one). Any previous session is left first.
    pub fn host(&mut self, port: u16) -> Result<SocketAddr> {
        self.leave();
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .with_context(|| format!("could not create server at port {port}"))?;
        socket.set_nonblocking(true)?;
        let addr = socket.local_addr()?;
        self.socket = Some(socket);
        self.mode = NetMode::Server { peers: Vec::new() };
        info!(%addr, "server listening");
        Ok(addr)
    }

    /// Connects to a server and blocks until it accepts us or the handshake times out.
    /// Returns the player id assigned by the server.
    pub fn join(&mut self, address: &str, name: &str) -> Result<u8> {
        self.leave();
        let server = resolve(address)?;
        let socket = UdpSocket::bind(("0.0.0.0", 0)).context("could not create network client")?;
        socket.connect(server)?;

        let hello = Packet::Connect {
            name: name.to_string(),
        }
        .to_bytes();
        let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
        let mut buf = [0u8; MAX_DATAGRAM];
        info!(%server, "connecting");

        let player_id = 'handshake: loop {
            socket.send(&hello)?;
            let retry_at = Instant::now() + HANDSHAKE_RETRY;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    bail!("no answer from {server}");
                }
                let wait = deadline.min(retry_at).saturating_duration_since(now);
                if wait.is_zero() {
                    break;
                }
                socket.set_read_timeout(Some(wait))?;
                match socket.recv(&mut buf) {
                    Ok(n) => match Packet::try_from_bytes(&buf[..n]) {
                        Ok(Packet::Accept { player_id }) => break 'handshake player_id,
                        Ok(other) => debug!(?other, "ignoring packet during handshake"),
                        Err(e) => debug!("ignoring malformed datagram: {e:#}"),
                    },
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                        break;
                    }
                    Err(e) => return Err(e).with_context(|| format!("connection to {server} failed")),
                }
            }
        };

        socket.set_read_timeout(None)?;
        socket.set_nonblocking(true)?;
        self.socket = Some(socket);
        self.mode = NetMode::Client { server, player_id };
        info!(%server, player_id, "connected");
        Ok(player_id)
    }

    /// Says goodbye to the other side and goes offline.
    pub fn leave(&mut self) {
        if self.is_online() {
            let goodbye = Packet::Disconnect {
                player_id: self.local_player_id(),
            };
            self.broadcast(&goodbye, None);
            info!("left network session");
        }
        self.socket = None;
        self.mode = NetMode::Offline;
    }

    /// Drains every pending datagram without blocking.
    pub fn poll(&mut self) -> Vec<NetEvent> {
        let mut events = Vec::new();
        let mut received = Vec::new();
        if let Some(socket) = self.socket.as_ref() {
            let mut buf = [0u8; MAX_DATAGRAM];
            loop {
                match socket.recv_from(&mut buf) {
                    Ok((n, from)) => match Packet::try_from_bytes(&buf[..n]) {
                        Ok(packet) => received.push((packet, from)),
                        Err(e) => warn!(%from, "dropping malformed datagram: {e:#}"),
                    },
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    // ICMP errors from a vanished peer surface once; keep draining.
                    Err(e)
                        if matches!(
                            e.kind(),
                            ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused
                        ) =>
                    {
                        debug!("peer unreachable: {e}");
                    }
                    Err(e) => {
                        warn!("receive failed: {e}");
                        break;
                    }
                }
            }
        }
        for (packet, from) in received {
            match self.mode {
                NetMode::Server { .. } => self.handle_as_server(packet, from, &mut events),
                NetMode::Client { .. } => self.handle_as_client(packet, &mut events),
                NetMode::Offline => {}
            }
        }
        events
    }

    fn handle_as_server(&mut self, packet: Packet, from: SocketAddr, events: &mut Vec<NetEvent>) {
        let NetMode::Server { peers } = &mut self.mode else {
            return;
        };
        let sender = peers.iter().find(|p| p.addr == from).map(|p| p.player_id);

        match (packet, sender) {
            (Packet::Connect { .. }, Some(player_id)) => {
                // Our accept got lost; say it again.
                self.send(&Packet::Accept { player_id }, Some(from));
            }
            (Packet::Connect { name }, None) => {
                if peers.len() + 1 >= MAX_PLAYERS {
                    warn!(%from, "server full, ignoring connection");
                    return;
                }
                let Some(player_id) = (1..MAX_PLAYERS as u8)
                    .find(|id| !peers.iter().any(|p| p.player_id == *id))
                else {
                    return;
                };
                info!(%from, player_id, %name, "client connected");
                peers.push(Peer {
                    addr: from,
                    player_id,
                    name: name.clone(),
                });
                self.send(&Packet::Accept { player_id }, Some(from));
                events.push(NetEvent::Connected { player_id, name });
            }
            (Packet::Chat { text }, Some(_)) => {
                self.broadcast(&Packet::Chat { text: text.clone() }, Some(from));
                events.push(NetEvent::Chat { text });
            }
            (Packet::Pose(mut pose), Some(player_id)) => {
                pose.player_id = player_id;
                self.broadcast(&Packet::Pose(pose), Some(from));
                events.push(NetEvent::Pose(pose));
            }
            (Packet::Hit { player_id }, Some(_)) => {
                self.broadcast(&Packet::Hit { player_id }, Some(from));
                events.push(NetEvent::Hit { player_id });
            }
            (Packet::Disconnect { .. }, Some(player_id)) => {
                peers.retain(|p| p.addr != from);
                info!(%from, player_id, "client disconnected");
                self.broadcast(&Packet::Disconnect { player_id }, None);
                events.push(NetEvent::Disconnected { player_id });
            }
            (packet, _) => debug!(%from, ?packet, "ignoring packet"),
        }
    }

    fn handle_as_client(&mut self, packet: Packet, events: &mut Vec<NetEvent>) {
        let local = self.local_player_id();
        match packet {
            Packet::Chat { text } => events.push(NetEvent::Chat { text }),
            Packet::Pose(pose) if pose.player_id != local => events.push(NetEvent::Pose(pose)),
            Packet::Hit { player_id } => events.push(NetEvent::Hit { player_id }),
            Packet::Disconnect { player_id } => {
                if player_id == SERVER_PLAYER_ID {
                    info!("server closed the session");
                    self.socket = None;
                    self.mode = NetMode::Offline;
                }
                events.push(NetEvent::Disconnected { player_id });
            }
            _ => {}
        }
    }

    pub fn send_chat(&self, text: &str) {
        self.broadcast(
            &Packet::Chat {
                text: text.to_string(),
            },
            None,
        );
    }

    pub fn send_pose(&self, pose: PoseUpdate) {
        self.broadcast(&Packet::Pose(pose), None);
    }

    pub fn send_hit(&self, player_id: u8) {
        self.broadcast(&Packet::Hit { player_id }, None);
    }

    /// Server: every peer except `except`. Client: the server.
    fn broadcast(&self, packet: &Packet, except: Option<SocketAddr>) {
        match &self.mode {
            NetMode::Server { peers } => {
                for peer in peers.iter().filter(|p| Some(p.addr) != except) {
                    self.send(packet, Some(peer.addr));
                }
            }
            NetMode::Client { .. } => self.send(packet, None),
            NetMode::Offline => {}
        }
    }

    fn send(&self, packet: &Packet, to: Option<SocketAddr>) {
        let Some(socket) = self.socket.as_ref() else {
            return;
        };
        let bytes = packet.to_bytes();
        let result = match to {
            Some(addr) => socket.send_to(&bytes, addr),
            None => socket.send(&bytes),
        };
        if let Err(e) = result {
            debug!(?to, "send failed: {e}");
        }
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        self.leave();
    }
}

/// `host`, `host:port` or `ip:port`; the default port is used when none is given.
pub fn resolve(address: &str) -> Result<SocketAddr> {
    let address = address.trim();
    let candidates: Vec<SocketAddr> = if address.contains(':') {
        address.to_socket_addrs()
    } else {
        (address, DEFAULT_PORT).to_socket_addrs()
    }
    .with_context(|| format!("could not resolve '{address}'"))?
    .collect();
    candidates
        .iter()
        .find(|a| a.is_ipv4())
        .or(candidates.first())
        .copied()
        .with_context(|| format!("'{address}' has no addresses"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_applies_default_port() {
        assert_eq!(
            resolve("127.0.0.1").unwrap(),
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
        );
        assert_eq!(
            resolve(" 127.0.0.1:4000 ").unwrap(),
            SocketAddr::from(([127, 0, 0, 1], 4000))
        );
        assert!(resolve("127.0.0.1:notaport").is_err());
    }

    #[test]
    fn offline_is_inert() {
        let mut net = Network::new();
        assert!(!net.is_online());
        assert!(net.poll().is_empty());
        net.send_chat("nobody hears this");
        assert_eq!(net.local_player_id(), SERVER_PLAYER_ID);
        assert!(net.local_addr().is_none());
    }

    #[test]
    fn host_binds_and_leave_goes_offline() {
        let mut net = Network::new();
        let addr = net.host(0).unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(net.mode(), &NetMode::Server { peers: Vec::new() });
        net.leave();
        assert!(!net.is_online());
    }
}
