//! Host runner for the wisp session loop.
//!
//! Runs the same session code the firmware runs, over a Linux TAP
//! interface. There is no radio on a TAP device, so association is handled
//! by `WiredRadio` and the SSID / passphrase are only logged.
//!
//! ```text
//! sudo ip tuntap add name tap0 mode tap user $USER
//! sudo ip link set tap0 up
//! RUST_LOG=debug wisp --tap tap0 --host 192.168.69.100 --address 192.168.69.1/24
//! ```

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use smoltcp::phy::{Medium, TunTapInterface};
use smoltcp::wire::{EthernetAddress, HardwareAddress, Ipv4Address, Ipv4Cidr};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wisp_network::driver::WiredRadio;
use wisp_network::time::StdClock;
use wisp_network::{IpConfig, Session, SessionConfig, SmoltcpStack, Timeouts};

/// Connect, read one payload, answer "Hello server N", repeat.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TAP interface to attach to (must already exist).
    #[arg(long, default_value = "tap0")]
    tap: String,

    /// Wireless network name.
    #[arg(long, default_value = "ssid")]
    ssid: String,

    /// Wireless passphrase.
    #[arg(long, default_value = "password")]
    password: String,

    /// Server host name or dotted-quad address.
    #[arg(long, default_value = "server")]
    host: String,

    /// Server TCP port.
    #[arg(long, default_value_t = SessionConfig::DEFAULT_PORT)]
    port: u16,

    /// Station MAC address.
    #[arg(long, default_value = "02:00:00:00:00:01", value_parser = parse_mac)]
    mac: EthernetAddress,

    /// Static address, e.g. 192.168.69.1/24. DHCP when omitted.
    #[arg(long, value_parser = parse_cidr)]
    address: Option<Ipv4Cidr>,

    /// Default gateway for a static address.
    #[arg(long, value_parser = parse_ipv4, requires = "address")]
    gateway: Option<Ipv4Address>,

    /// DNS server for a static address.
    #[arg(long, value_parser = parse_ipv4, requires = "address")]
    dns: Option<Ipv4Address>,

    /// Pause between cycles.
    #[arg(long, default_value_t = SessionConfig::DEFAULT_CYCLE_DELAY_MS)]
    cycle_delay_ms: u64,

    /// Link association timeout.
    #[arg(long, default_value_t = Timeouts::LINK_MS)]
    link_timeout_ms: u32,

    /// Stop after this many cycles instead of running forever.
    #[arg(long)]
    cycles: Option<usize>,
}

fn parse_mac(s: &str) -> Result<EthernetAddress, String> {
    EthernetAddress::from_str(s).map_err(|_| format!("invalid MAC address `{s}`"))
}

fn parse_cidr(s: &str) -> Result<Ipv4Cidr, String> {
    Ipv4Cidr::from_str(s).map_err(|_| format!("invalid address `{s}`, expected a.b.c.d/len"))
}

fn parse_ipv4(s: &str) -> Result<Ipv4Address, String> {
    Ipv4Address::from_str(s).map_err(|_| format!("invalid IPv4 address `{s}`"))
}

impl Args {
    fn ip_config(&self) -> IpConfig {
        match self.address {
            Some(address) => IpConfig::Static {
                address,
                gateway: self.gateway,
                dns: self.dns,
            },
            None => IpConfig::Dhcp,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let device = TunTapInterface::new(&args.tap, Medium::Ethernet)
        .with_context(|| format!("failed to open TAP interface {}", args.tap))?;
    let ip = args.ip_config();
    info!(tap = %args.tap, mac = %args.mac, ?ip, "starting session loop");

    let clock = StdClock::new();
    let stack = SmoltcpStack::new(
        device,
        WiredRadio,
        clock,
        HardwareAddress::Ethernet(args.mac),
        ip,
    );

    let timeouts = Timeouts {
        link_ms: args.link_timeout_ms,
        ..Timeouts::default()
    };
    let config = SessionConfig::new(&args.ssid, &args.password, &args.host)
        .with_port(args.port)
        .with_cycle_delay_ms(args.cycle_delay_ms)
        .with_timeouts(timeouts);
    let mut session = Session::new(stack, clock, config);

    let Some(count) = args.cycles else {
        session.run_forever();
    };

    let reports = session.run_cycles(count);
    for report in &reports {
        match &report.error {
            None => info!(
                cycle = report.cycle,
                sent = %String::from_utf8_lossy(&report.sent),
                "cycle complete"
            ),
            Some(e) => warn!(
                cycle = report.cycle,
                terminal = %report.terminal,
                error = %e,
                "cycle failed"
            ),
        }
    }

    let ok = reports.iter().filter(|r| r.is_success()).count();
    info!(ok, total = reports.len(), "done");
    Ok(())
}
