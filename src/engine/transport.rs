//! Connection establishment
//!
//! Resolves a URL to a socket, applies the configured timeouts and, for
//! `https`, performs the handshake with the engine's [`TlsContext`].

use crate::tls::TlsContext;
use crate::{Error, Result};
use openssl::ssl::SslStream;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, BufReader, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use url::{Host, Url};

/// Scheme, host and port a request is sent to; also the pool key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    tls: bool,
    host: Host<String>,
    port: u16,
}

impl Target {
    pub fn from_url(url: &Url) -> Result<Self> {
        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        };
        let host = url
            .host()
            .ok_or_else(|| Error::InvalidUrl(format!("{}: missing host", url)))?
            .to_owned();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::InvalidUrl(format!("{}: missing port", url)))?;

        Ok(Target { tls, host, port })
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Value for the `Host` header, port omitted when it is the default
    pub fn authority(&self) -> String {
        let default_port = if self.tls { 443 } else { 80 };
        if self.port == default_port {
            self.host.to_string()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Host name or address as used for SNI and certificate matching
    pub fn server_name(&self) -> String {
        match &self.host {
            Host::Domain(domain) => domain.clone(),
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(ip) => ip.to_string(),
        }
    }

    fn socket_addrs(&self) -> Result<Vec<SocketAddr>> {
        let addrs = match &self.host {
            Host::Domain(domain) => (domain.as_str(), self.port)
                .to_socket_addrs()
                .map_err(|source| Error::Connect {
                    addr: self.authority(),
                    source,
                })?
                .collect(),
            Host::Ipv4(ip) => vec![SocketAddr::new(IpAddr::V4(*ip), self.port)],
            Host::Ipv6(ip) => vec![SocketAddr::new(IpAddr::V6(*ip), self.port)],
        };
        Ok(addrs)
    }
}

/// A plain or TLS-wrapped TCP stream
#[derive(Debug)]
pub enum Stream {
    Plain(TcpStream),
    Tls(SslStream<TcpStream>),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            Stream::Tls(s) => s.flush(),
        }
    }
}

/// A buffered connection, ready for request/response exchanges
pub type Connection = BufReader<Stream>;

/// Opens connections with fixed timeouts and TLS settings
#[derive(Debug, Clone)]
pub struct Connector {
    tls: TlsContext,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
}

impl Connector {
    pub fn new(tls: TlsContext, connect_timeout: Option<Duration>, io_timeout: Option<Duration>) -> Self {
        Connector {
            tls,
            connect_timeout,
            io_timeout,
        }
    }

    pub fn tls_context(&self) -> &TlsContext {
        &self.tls
    }

    /// Connect to the first reachable address of `target`
    pub fn connect(&self, target: &Target) -> Result<Connection> {
        let mut last_err = None;

        for addr in target.socket_addrs()? {
            match self.connect_addr(addr) {
                Ok(tcp) => {
                    tracing::debug!(%addr, tls = target.is_tls(), "connected");
                    let stream = if target.is_tls() {
                        Stream::Tls(self.tls.connect(&target.server_name(), tcp)?)
                    } else {
                        Stream::Plain(tcp)
                    };
                    return Ok(BufReader::new(stream));
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "connect failed");
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) if e.kind() == io::ErrorKind::TimedOut => Error::Timeout,
            Some(source) => Error::Connect {
                addr: target.authority(),
                source,
            },
            None => Error::Connect {
                addr: target.authority(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"),
            },
        })
    }

    fn connect_addr(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nodelay(true)?;

        match self.connect_timeout {
            Some(timeout) => socket.connect_timeout(&addr.into(), timeout)?,
            None => socket.connect(&addr.into())?,
        }

        socket.set_read_timeout(self.io_timeout)?;
        socket.set_write_timeout(self.io_timeout)?;
        Ok(socket.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> Result<Target> {
        Target::from_url(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_target_defaults() {
        let t = target("https://example.com/path").unwrap();
        assert!(t.is_tls());
        assert_eq!(t.port(), 443);
        assert_eq!(t.authority(), "example.com");
        assert_eq!(t.server_name(), "example.com");

        let t = target("http://127.0.0.1:8080/").unwrap();
        assert!(!t.is_tls());
        assert_eq!(t.authority(), "127.0.0.1:8080");
    }

    #[test]
    fn test_target_ipv6() {
        let t = target("http://[::1]:9000/").unwrap();
        assert_eq!(t.authority(), "[::1]:9000");
        assert_eq!(t.server_name(), "::1");
    }

    #[test]
    fn test_unsupported_scheme() {
        assert!(matches!(target("ftp://example.com/"), Err(Error::UnsupportedScheme(_))));
    }

    #[test]
    fn test_pool_key_equality() {
        assert_eq!(target("http://a:1/x").unwrap(), target("http://a:1/y?z").unwrap());
        assert_ne!(target("http://a:1/").unwrap(), target("https://a:1/").unwrap());
    }

    #[test]
    fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = Connector::new(
            TlsContext::platform_default().unwrap(),
            Some(Duration::from_secs(1)),
            None,
        );
        let result = connector.connect(&target(&format!("http://127.0.0.1:{}/", port)).unwrap());
        assert!(matches!(result, Err(Error::Connect { .. })));
    }
}
