//! UDP fix source
//!
//! Stand-in for the bus subscriber: one datagram carries one position
//! message. The broker bridge terminates the pub/sub protocol and forwards
//! payloads here.

use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{FixSource, RawFixCallback};
use tracing::{debug, error, trace};

const MAX_DATAGRAM: usize = 65_507;
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Fix source reading JSON datagrams from a bound UDP socket.
pub struct UdpFixSource {
    source_id: String,
    bind_host: String,
    bind_port: u16,
    listening: Arc<AtomicBool>,
}

impl UdpFixSource {
    pub fn new(source_id: impl Into<String>, bind_host: impl Into<String>, bind_port: u16) -> Self {
        Self {
            source_id: source_id.into(),
            bind_host: bind_host.into(),
            bind_port,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FixSource for UdpFixSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: RawFixCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let addr = format!("{}:{}", self.bind_host, self.bind_port);
        let listening = self.listening.clone();

        thread::spawn(move || {
            let socket = match UdpSocket::bind(&addr) {
                Ok(socket) => socket,
                Err(e) => {
                    error!(source = %source_id, addr = %addr, error = %e, "UDP bind failed");
                    listening.store(false, Ordering::SeqCst);
                    return;
                }
            };
            // Periodic wakeups so stop() is observed without traffic
            if let Err(e) = socket.set_read_timeout(Some(POLL_INTERVAL)) {
                error!(source = %source_id, error = %e, "failed to set read timeout");
                listening.store(false, Ordering::SeqCst);
                return;
            }

            debug!(source = %source_id, addr = %addr, "UDP fix source listening");

            let mut buf = vec![0u8; MAX_DATAGRAM];
            while listening.load(Ordering::Relaxed) {
                match socket.recv_from(&mut buf) {
                    Ok((len, peer)) => {
                        trace!(source = %source_id, bytes = len, peer = %peer, "datagram received");
                        callback(Bytes::copy_from_slice(&buf[..len]));
                    }
                    Err(e)
                        if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!(source = %source_id, error = %e, "UDP receive failed");
                        break;
                    }
                }
            }

            listening.store(false, Ordering::SeqCst);
            debug!(source = %source_id, "UDP fix source stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
