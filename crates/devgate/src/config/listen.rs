//! Listener configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen_host")]
    pub host: IpAddr,
    #[serde(default = "default_listen_port")]
    pub port: u16,
    /// Pending connection backlog passed to `listen(2)`
    #[serde(default = "default_backlog")]
    pub backlog: i32,
}

impl ListenConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: default_listen_port(),
            backlog: default_backlog(),
        }
    }
}

fn default_listen_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_listen_port() -> u16 {
    8080
}

fn default_backlog() -> i32 {
    1024
}
