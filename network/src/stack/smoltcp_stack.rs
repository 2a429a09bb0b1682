//! smoltcp-backed network stack.
//!
//! Implements every capability the session consumes on top of one smoltcp
//! `Interface`:
//!
//! | Capability        | smoltcp mechanism                                  |
//! |-------------------|----------------------------------------------------|
//! | link association  | `Radio` + DHCPv4 socket (or static address)        |
//! | name resolution   | DNS socket, literal addresses answered immediately |
//! | transport         | one TCP socket at a time                           |
//! | event pump        | `Interface::poll` + socket state inspection        |
//!
//! smoltcp has no callbacks, so `pump_events()` compares each socket's
//! state with what was last reported and calls the matching completion
//! handler on the registered `CompletionSink`.

extern crate alloc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use log::{debug, info, trace, warn};
use smoltcp::iface::{Config as IfaceConfig, Interface, SocketHandle, SocketSet, SocketStorage};
use smoltcp::phy::Device;
use smoltcp::socket::dhcpv4;
use smoltcp::socket::dns::{self, DnsQuery, GetQueryResultError, QueryHandle};
use smoltcp::socket::tcp::{self, State as TcpState};
use smoltcp::time::Instant;
use smoltcp::wire::{
    DnsQueryType, HardwareAddress, IpAddress, IpCidr, IpVersion, Ipv4Address, Ipv4Cidr,
};

use crate::driver::traits::Radio;
use crate::error::ErrorCode;
use crate::mainloop::event::CompletionSink;
use crate::time::{Clock, Deadline};
use super::{parse_ipv4, Link, Resolution, Resolver, Transport};

/// TCP receive / transmit buffer size.
const TCP_BUFFER_SIZE: usize = 2048;

/// Length of one coarse poll tick.
const COARSE_TICK_MS: u64 = 500;

/// First port of the dynamic range.
const EPHEMERAL_PORT_FIRST: u16 = 49152;

/// How the interface gets its address once the radio is associated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpConfig {
    /// Lease address, default route and DNS server via DHCPv4.
    Dhcp,
    /// Fixed configuration.
    Static {
        address: Ipv4Cidr,
        gateway: Option<Ipv4Address>,
        dns: Option<Ipv4Address>,
    },
}

/// Address configuration applied to the interface.
struct Lease {
    address: Ipv4Cidr,
    router: Option<Ipv4Address>,
    dns: Vec<Ipv4Address>,
}

/// DNS query in flight.
struct PendingQuery {
    handle: QueryHandle,
    name: String,
    sink: CompletionSink,
}

/// Progress of the live connection as last reported to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TcpPhase {
    Open,
    Connecting,
    Established,
    Done,
}

/// The single live connection.
struct Connection {
    socket: SocketHandle,
    sink: Option<CompletionSink>,
    phase: TcpPhase,
    poll_interval_ms: u64,
    last_poll_ms: u64,
    /// Bytes queued but not yet acknowledged.
    unacked: usize,
    peer_closed: bool,
}

/// Network stack over a smoltcp interface.
pub struct SmoltcpStack<D: Device, R: Radio, C: Clock> {
    device: D,
    radio: R,
    clock: C,
    iface: Interface,
    sockets: SocketSet<'static>,
    ip: IpConfig,
    dhcp: Option<SocketHandle>,
    dns: SocketHandle,
    dns_servers: usize,
    query: Option<PendingQuery>,
    connection: Option<Connection>,
    /// Closed or aborted sockets waiting to finish their teardown.
    retired: Vec<SocketHandle>,
    next_port: u16,
}

impl<D: Device, R: Radio, C: Clock> SmoltcpStack<D, R, C> {
    /// Build the interface. No address is configured until `link_connect`.
    pub fn new(mut device: D, radio: R, clock: C, hardware_addr: HardwareAddress, ip: IpConfig) -> Self {
        let seed = clock.now_ms();
        let mut config = IfaceConfig::new(hardware_addr);
        config.random_seed = seed ^ 0x5a5a_5a5a_1234_5678;

        let now = Instant::from_millis(seed as i64);
        let iface = Interface::new(config, &mut device, now);

        let storage: Vec<SocketStorage<'static>> = Vec::new();
        let mut sockets = SocketSet::new(storage);
        let queries: Vec<Option<DnsQuery>> = Vec::new();
        let dns = sockets.add(dns::Socket::new(&[], queries));

        Self {
            device,
            radio,
            clock,
            iface,
            sockets,
            ip,
            dhcp: None,
            dns,
            dns_servers: 0,
            query: None,
            connection: None,
            retired: Vec::new(),
            next_port: EPHEMERAL_PORT_FIRST + (seed % 4096) as u16,
        }
    }

    /// Underlying interface.
    pub fn interface(&self) -> &Interface {
        &self.iface
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    fn now(&self) -> Instant {
        Instant::from_millis(self.clock.now_ms() as i64)
    }

    fn poll_iface(&mut self) {
        let now = self.now();
        let _ = self.iface.poll(now, &mut self.device, &mut self.sockets);
    }

    fn ephemeral_port(&mut self) -> u16 {
        let port = self.next_port;
        self.next_port = if port == u16::MAX {
            EPHEMERAL_PORT_FIRST
        } else {
            port + 1
        };
        port
    }

    fn configure(&mut self, lease: Lease) {
        info!("[LINK] Address {}", lease.address);
        self.iface.update_ip_addrs(|addrs| {
            addrs.clear();
            let _ = addrs.push(IpCidr::Ipv4(lease.address));
        });

        match lease.router {
            Some(router) => {
                debug!("[LINK] Gateway {}", router);
                let _ = self.iface.routes_mut().add_default_ipv4_route(router);
            }
            None => {
                self.iface.routes_mut().remove_default_ipv4_route();
            }
        }

        let servers: Vec<IpAddress> = lease
            .dns
            .iter()
            .take(smoltcp::config::DNS_MAX_SERVER_COUNT)
            .map(|server| IpAddress::Ipv4(*server))
            .collect();
        self.dns_servers = servers.len();
        self.sockets
            .get_mut::<dns::Socket>(self.dns)
            .update_servers(&servers);
    }

    fn acquire_lease(&mut self, deadline: Deadline) -> Result<Lease, ErrorCode> {
        let handle = match self.dhcp {
            Some(handle) => handle,
            None => {
                let handle = self.sockets.add(dhcpv4::Socket::new());
                self.dhcp = Some(handle);
                handle
            }
        };
        debug!(
            "[LINK] Waiting for DHCP lease ({} ms left)",
            deadline.remaining_ms(&self.clock)
        );

        loop {
            self.poll_iface();

            let lease = match self.sockets.get_mut::<dhcpv4::Socket>(handle).poll() {
                Some(dhcpv4::Event::Configured(config)) => Some(Lease {
                    address: config.address,
                    router: config.router,
                    dns: config.dns_servers.iter().copied().collect(),
                }),
                Some(dhcpv4::Event::Deconfigured) | None => None,
            };
            if let Some(lease) = lease {
                return Ok(lease);
            }

            if deadline.expired(&self.clock) {
                return Err(ErrorCode::TIMEOUT);
            }
        }
    }

    fn cancel_query(&mut self) {
        if let Some(query) = self.query.take() {
            self.sockets
                .get_mut::<dns::Socket>(self.dns)
                .cancel_query(query.handle);
        }
    }

    /// Socket belongs to this stack and has not been removed.
    fn owns(&self, handle: SocketHandle) -> bool {
        self.connection.as_ref().is_some_and(|c| c.socket == handle) || self.retired.contains(&handle)
    }

    /// Stop tracking `handle` as the live connection.
    fn retire(&mut self, handle: SocketHandle) {
        if self.connection.as_ref().is_some_and(|c| c.socket == handle) {
            self.connection = None;
        }
        if !self.retired.contains(&handle) {
            self.retired.push(handle);
        }
    }

    fn service_query(&mut self) {
        let handle = match &self.query {
            Some(query) => query.handle,
            None => return,
        };

        let address = match self
            .sockets
            .get_mut::<dns::Socket>(self.dns)
            .get_query_result(handle)
        {
            Ok(addresses) => addresses.first().copied(),
            Err(GetQueryResultError::Pending) => return,
            Err(GetQueryResultError::Failed) => None,
        };

        if let Some(query) = self.query.take() {
            trace!("[DNS] Query for {} finished", query.name);
            query.sink.on_resolved(&query.name, address);
        }
    }

    fn service_connection(&mut self) {
        let now_ms = self.clock.now_ms();
        let Some(conn) = self.connection.as_mut() else {
            return;
        };
        let Some(sink) = conn.sink.clone() else {
            return;
        };
        let socket = self.sockets.get_mut::<tcp::Socket>(conn.socket);

        match conn.phase {
            TcpPhase::Open | TcpPhase::Done => {}
            TcpPhase::Connecting => match socket.state() {
                TcpState::Established => {
                    debug!("[TCP] Established");
                    conn.phase = TcpPhase::Established;
                    sink.on_connected();
                }
                TcpState::Closed => {
                    debug!("[TCP] Connection refused");
                    conn.phase = TcpPhase::Done;
                    sink.on_error(ErrorCode::RESET);
                }
                _ => {}
            },
            TcpPhase::Established => {
                let queued = socket.send_queue();
                if queued < conn.unacked {
                    sink.on_sent(conn.unacked - queued);
                    conn.unacked = queued;
                }

                if socket.can_recv() {
                    let _ = socket.recv(|data| (sink.on_receive(Some(&data[..])), ()));
                } else if !socket.may_recv() && !conn.peer_closed && socket.state() != TcpState::Closed {
                    debug!("[TCP] Peer closed");
                    conn.peer_closed = true;
                    sink.on_receive(None);
                }

                if socket.state() == TcpState::Closed && !conn.peer_closed {
                    debug!("[TCP] Connection reset");
                    conn.phase = TcpPhase::Done;
                    sink.on_error(ErrorCode::RESET);
                }
            }
        }

        if conn.poll_interval_ms > 0 && now_ms.saturating_sub(conn.last_poll_ms) >= conn.poll_interval_ms {
            conn.last_poll_ms = now_ms;
            sink.on_poll();
        }
    }

    /// Drop retired sockets once their teardown has finished.
    fn service_retired(&mut self) {
        let sockets = &mut self.sockets;
        self.retired.retain(|&handle| {
            let done = matches!(
                sockets.get::<tcp::Socket>(handle).state(),
                TcpState::Closed | TcpState::TimeWait
            );
            if done {
                sockets.remove(handle);
            }
            !done
        });
    }
}

impl<D: Device, R: Radio, C: Clock> Link for SmoltcpStack<D, R, C> {
    fn link_connect(&mut self, ssid: &str, credential: &str, timeout_ms: u32) -> Result<(), ErrorCode> {
        let deadline = Deadline::after(&self.clock, timeout_ms as u64);

        if let Err(e) = self.radio.associate(ssid, credential) {
            warn!("[LINK] Association with {} failed: {}", ssid, e);
            return Err(ErrorCode::LINK);
        }

        while !self.radio.is_associated() {
            if deadline.expired(&self.clock) {
                warn!("[LINK] Association with {} timed out", ssid);
                self.radio.disassociate();
                return Err(ErrorCode::TIMEOUT);
            }
            self.poll_iface();
            core::hint::spin_loop();
        }

        let lease = match self.ip {
            IpConfig::Static { address, gateway, dns } => Lease {
                address,
                router: gateway,
                dns: dns.into_iter().collect(),
            },
            IpConfig::Dhcp => match self.acquire_lease(deadline) {
                Ok(lease) => lease,
                Err(code) => {
                    warn!("[LINK] No DHCP lease: {}", code);
                    self.link_disconnect();
                    return Err(code);
                }
            },
        };
        self.configure(lease);
        Ok(())
    }

    fn link_disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            self.sockets.get_mut::<tcp::Socket>(conn.socket).abort();
            self.retired.push(conn.socket);
        }
        self.cancel_query();

        // flush pending FIN / RST segments
        self.poll_iface();
        for handle in self.retired.drain(..) {
            self.sockets.remove(handle);
        }

        if let Some(handle) = self.dhcp.take() {
            self.sockets.remove(handle);
        }
        self.iface.update_ip_addrs(|addrs| addrs.clear());
        self.iface.routes_mut().remove_default_ipv4_route();
        self.sockets
            .get_mut::<dns::Socket>(self.dns)
            .update_servers(&[]);
        self.dns_servers = 0;

        self.radio.disassociate();
    }
}

impl<D: Device, R: Radio, C: Clock> Resolver for SmoltcpStack<D, R, C> {
    fn resolve(&mut self, hostname: &str, sink: &CompletionSink) -> Resolution {
        if let Some(ip) = parse_ipv4(hostname) {
            return Resolution::Ready(IpAddress::Ipv4(ip));
        }
        if self.dns_servers == 0 {
            warn!("[DNS] No server configured");
            return Resolution::Failed(ErrorCode::RESOLVE);
        }

        self.cancel_query();
        let socket = self.sockets.get_mut::<dns::Socket>(self.dns);
        match socket.start_query(self.iface.context(), hostname, DnsQueryType::A) {
            Ok(handle) => {
                self.query = Some(PendingQuery {
                    handle,
                    name: String::from(hostname),
                    sink: sink.clone(),
                });
                Resolution::Pending
            }
            Err(e) => {
                warn!("[DNS] Cannot query {}: {:?}", hostname, e);
                Resolution::Failed(ErrorCode::RESOLVE)
            }
        }
    }
}

impl<D: Device, R: Radio, C: Clock> Transport for SmoltcpStack<D, R, C> {
    type Handle = SocketHandle;

    fn connection_open(&mut self, family: IpVersion) -> Option<SocketHandle> {
        if family != IpVersion::Ipv4 {
            return None;
        }
        if self.connection.is_some() {
            warn!("[TCP] Connection already open");
            return None;
        }

        let socket = tcp::Socket::new(
            tcp::SocketBuffer::new(vec![0u8; TCP_BUFFER_SIZE]),
            tcp::SocketBuffer::new(vec![0u8; TCP_BUFFER_SIZE]),
        );
        let handle = self.sockets.add(socket);
        self.connection = Some(Connection {
            socket: handle,
            sink: None,
            phase: TcpPhase::Open,
            poll_interval_ms: 0,
            last_poll_ms: 0,
            unacked: 0,
            peer_closed: false,
        });
        Some(handle)
    }

    fn register_handlers(&mut self, handle: SocketHandle, sink: CompletionSink, poll_interval_ticks: u8) {
        let now_ms = self.clock.now_ms();
        if let Some(conn) = self.connection.as_mut().filter(|c| c.socket == handle) {
            conn.sink = Some(sink);
            conn.poll_interval_ms = poll_interval_ticks as u64 * COARSE_TICK_MS;
            conn.last_poll_ms = now_ms;
        }
    }

    fn connect(&mut self, handle: SocketHandle, address: IpAddress, port: u16) -> Result<(), ErrorCode> {
        let local_port = self.ephemeral_port();
        let conn = self
            .connection
            .as_mut()
            .filter(|c| c.socket == handle)
            .ok_or(ErrorCode::ARG)?;

        let socket = self.sockets.get_mut::<tcp::Socket>(handle);
        socket
            .connect(self.iface.context(), (address, port), local_port)
            .map_err(|e| {
                warn!("[TCP] connect to {}:{} rejected: {:?}", address, port, e);
                match e {
                    tcp::ConnectError::Unaddressable => ErrorCode::ROUTE,
                    tcp::ConnectError::InvalidState => ErrorCode::VALUE,
                }
            })?;

        conn.phase = TcpPhase::Connecting;
        Ok(())
    }

    fn write(&mut self, handle: SocketHandle, bytes: &[u8]) -> Result<(), ErrorCode> {
        let conn = self
            .connection
            .as_mut()
            .filter(|c| c.socket == handle)
            .ok_or(ErrorCode::ARG)?;

        let socket = self.sockets.get_mut::<tcp::Socket>(handle);
        if !socket.may_send() {
            return Err(ErrorCode::CONN);
        }
        if socket.send_capacity() - socket.send_queue() < bytes.len() {
            return Err(ErrorCode::MEM);
        }

        let queued = socket.send_slice(bytes).map_err(|_| ErrorCode::CONN)?;
        conn.unacked += queued;
        Ok(())
    }

    fn close(&mut self, handle: SocketHandle) -> Result<(), ErrorCode> {
        if !self.owns(handle) {
            return Err(ErrorCode::ARG);
        }
        self.retire(handle);

        let socket = self.sockets.get_mut::<tcp::Socket>(handle);
        if socket.is_open() {
            socket.close();
            Ok(())
        } else {
            Err(ErrorCode::CONN)
        }
    }

    fn abort(&mut self, handle: SocketHandle) {
        if !self.owns(handle) {
            return;
        }
        self.retire(handle);
        self.sockets.get_mut::<tcp::Socket>(handle).abort();
    }

    fn pump_events(&mut self) {
        self.poll_iface();
        self.service_query();
        self.service_connection();
        self.service_retired();
    }
}
