//! Listening socket setup.

use crate::config::ListenConfig;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

/// Bind the dev server listener with `SO_REUSEADDR`, so a restarted server
/// can take the port back while old connections sit in `TIME_WAIT`.
pub fn bind_listener(listen: &ListenConfig) -> std::io::Result<TcpListener> {
    let addr = listen.socket_addr();
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(listen.backlog)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
