//! Shared fixtures for integration tests
//!
//! Certificates are generated per test with OpenSSL and written as PKCS#12
//! stores into a temporary directory. Servers run on loopback in a thread
//! and speak just enough HTTP/1.1 to answer the client.

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{SslAcceptor, SslMethod, SslVerifyMode};
use openssl::stack::Stack;
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const PASSWORD: &str = "changeit";

/// A key pair with its certificate
pub struct Identity {
    pub key: PKey<Private>,
    pub cert: X509,
}

fn key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn name(cn: &str) -> X509Name {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    name.build()
}

fn builder(cn: &str, key: &PKey<Private>) -> X509Builder {
    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
    builder.set_subject_name(&name(cn)).unwrap();
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(30).unwrap()).unwrap();
    builder
}

/// Self-signed certificate authority
pub fn ca(cn: &str) -> Identity {
    let key = key();
    let mut builder = builder(cn, &key);
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(ski).unwrap();

    builder.set_issuer_name(&name(cn)).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    Identity {
        key,
        cert: builder.build(),
    }
}

/// End-entity certificate for `localhost` and `127.0.0.1`, issued by `issuer`
pub fn leaf(cn: &str, issuer: &Identity) -> Identity {
    let key = key();
    let mut builder = builder(cn, &key);

    let san = SubjectAlternativeName::new()
        .dns("localhost")
        .ip("127.0.0.1")
        .build(&builder.x509v3_context(Some(&*issuer.cert), None))
        .unwrap();
    builder.append_extension(san).unwrap();
    let aki = AuthorityKeyIdentifier::new()
        .keyid(false)
        .build(&builder.x509v3_context(Some(&*issuer.cert), None))
        .unwrap();
    builder.append_extension(aki).unwrap();

    builder.set_issuer_name(issuer.cert.subject_name()).unwrap();
    builder.sign(&issuer.key, MessageDigest::sha256()).unwrap();

    Identity {
        key,
        cert: builder.build(),
    }
}

/// Self-signed leaf that expired long ago
pub fn expired_self_signed(cn: &str) -> Identity {
    let key = key();
    let mut builder = builder(cn, &key);
    builder.set_not_before(&Asn1Time::from_unix(1_000_000_000).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::from_unix(1_100_000_000).unwrap()).unwrap();

    builder.set_issuer_name(&name(cn)).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    Identity {
        key,
        cert: builder.build(),
    }
}

/// PKCS#12 store holding a private key and its certificate
pub fn write_key_store(dir: &Path, name: &str, identity: &Identity, password: &str) -> PathBuf {
    let der = Pkcs12::builder()
        .name(name)
        .pkey(&identity.key)
        .cert(&identity.cert)
        .build2(password)
        .unwrap()
        .to_der()
        .unwrap();
    let path = dir.join(format!("{}.p12", name));
    std::fs::write(&path, der).unwrap();
    path
}

/// PKCS#12 store holding only trusted certificates
pub fn write_trust_store(dir: &Path, name: &str, anchors: &[&X509], password: &str) -> PathBuf {
    let mut stack = Stack::new().unwrap();
    for anchor in anchors {
        stack.push((*anchor).clone()).unwrap();
    }
    let der = Pkcs12::builder()
        .ca(stack)
        .build2(password)
        .unwrap()
        .to_der()
        .unwrap();
    let path = dir.join(format!("{}.p12", name));
    std::fs::write(&path, der).unwrap();
    path
}

/// Server-side TLS acceptor presenting `identity`
///
/// With `client_ca`, a client certificate issued by it is required.
pub fn acceptor(identity: &Identity, client_ca: Option<&X509>) -> SslAcceptor {
    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server()).unwrap();
    builder.set_private_key(&identity.key).unwrap();
    builder.set_certificate(&identity.cert).unwrap();
    builder.check_private_key().unwrap();

    if let Some(ca) = client_ca {
        let mut store = X509StoreBuilder::new().unwrap();
        store.add_cert(ca.clone()).unwrap();
        builder.set_verify_cert_store(store.build()).unwrap();
        builder.set_verify(SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT);
    }

    builder.build()
}

/// What the server saw of one request
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub connection: usize,
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Common name of the client certificate, if one was presented
    pub peer: Option<String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// How the server treats accepted connections
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Answer up to this many requests, then close
    Respond(usize),
    /// Read the request and never answer
    Stall(Duration),
}

/// Loopback server answering `200 OK` with the request path as body
pub struct TestServer {
    pub addr: SocketAddr,
    tls: bool,
    requests: Receiver<RecordedRequest>,
    handle: JoinHandle<usize>,
}

impl TestServer {
    pub fn http(connections: usize, behavior: Behavior) -> Self {
        Self::spawn(None, connections, behavior)
    }

    pub fn https(acceptor: SslAcceptor, connections: usize, behavior: Behavior) -> Self {
        Self::spawn(Some(acceptor), connections, behavior)
    }

    fn spawn(acceptor: Option<SslAcceptor>, connections: usize, behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let tls = acceptor.is_some();
        let (tx, rx) = mpsc::channel();

        let acceptor = acceptor.map(Arc::new);

        let handle = thread::spawn(move || {
            let mut workers = Vec::new();
            let mut accepted = 0;
            while accepted < connections {
                let Ok((tcp, _)) = listener.accept() else {
                    break;
                };
                let id = accepted;
                accepted += 1;

                let acceptor = acceptor.clone();
                let tx = tx.clone();
                workers.push(thread::spawn(move || match acceptor {
                    Some(acceptor) => {
                        let Ok(tls) = acceptor.accept(tcp) else {
                            return;
                        };
                        let peer = tls
                            .ssl()
                            .peer_certificate()
                            .and_then(|c| common_name(&c));
                        serve(tls, id, peer, behavior, &tx);
                    }
                    None => serve(tcp, id, None, behavior, &tx),
                }));
            }
            for worker in workers {
                let _ = worker.join();
            }
            accepted
        });

        TestServer {
            addr,
            tls,
            requests: rx,
            handle,
        }
    }

    /// URL on this server; TLS servers are addressed as `localhost`
    pub fn url(&self, path: &str) -> String {
        if self.tls {
            format!("https://localhost:{}{}", self.addr.port(), path)
        } else {
            format!("http://127.0.0.1:{}{}", self.addr.port(), path)
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.try_iter().collect()
    }

    /// Wait for the server to finish; returns the number of accepted connections
    pub fn join(self) -> usize {
        self.handle.join().unwrap()
    }
}

fn common_name(cert: &X509) -> Option<String> {
    cert.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|e| e.data().as_utf8().ok())
        .map(|s| s.to_string())
}

fn serve<S: Read + Write>(
    stream: S,
    connection: usize,
    peer: Option<String>,
    behavior: Behavior,
    tx: &Sender<RecordedRequest>,
) {
    let mut reader = BufReader::new(stream);

    match behavior {
        Behavior::Stall(delay) => {
            if let Some(request) = read_request(&mut reader, connection, peer) {
                let _ = tx.send(request);
            }
            thread::sleep(delay);
        }
        Behavior::Respond(limit) => {
            for _ in 0..limit {
                let Some(request) = read_request(&mut reader, connection, peer.clone()) else {
                    return;
                };
                let close = request
                    .header("Connection")
                    .is_some_and(|v| v.eq_ignore_ascii_case("close"));
                let body = request.path.clone();
                let _ = tx.send(request);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nX-Connection-Id: {}\r\nContent-Length: {}\r\n\r\n{}",
                    connection,
                    body.len(),
                    body
                );
                if reader.get_mut().write_all(response.as_bytes()).is_err() {
                    return;
                }
                let _ = reader.get_mut().flush();
                if close {
                    return;
                }
            }
        }
    }
}

fn read_request<R: BufRead>(
    reader: &mut R,
    connection: usize,
    peer: Option<String>,
) -> Option<RecordedRequest> {
    let mut line = String::new();
    if reader.read_line(&mut line).ok()? == 0 {
        return None;
    }
    let mut parts = line.trim_end().splitn(3, ' ');
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;

    Some(RecordedRequest {
        connection,
        method,
        path,
        headers,
        body,
        peer,
    })
}
