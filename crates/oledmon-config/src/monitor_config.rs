//! Monitoring front end settings

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Where the monitor listens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Serve the monitor at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// TCP port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8087
}

impl MonitorConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
            port: default_port(),
        }
    }
}
