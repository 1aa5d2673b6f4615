use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use seed_proto::{
    decode_request, encode_response, read_frame, write_frame, FrameError, StoreResponse,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::store::SeedStore;

#[derive(Debug, Error)]
enum ServeError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("failed to encode response: {0}")]
    Encode(#[from] bincode::Error),
}

/// Running seed server. Dropping the handle stops accepting new connections.
pub struct SeedServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl SeedServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            if handle.join().is_err() {
                error!(target: "seed_store::server", "accept thread panicked");
            }
        }
    }

    /// Block until the accept loop ends.
    pub fn wait(mut self) {
        if let Some(handle) = self.accept_thread.take() {
            if handle.join().is_err() {
                error!(target: "seed_store::server", "accept thread panicked");
            }
        }
    }
}

impl Drop for SeedServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Bind `config.bind` and serve store requests on a fixed worker pool.
pub fn start_seed_server(config: &StoreConfig, store: SeedStore) -> io::Result<SeedServerHandle> {
    let listener = TcpListener::bind(config.bind)?;
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;

    let (sender, receiver) = unbounded::<TcpStream>();
    for worker in 0..config.worker_count() {
        let receiver = receiver.clone();
        let store = store.clone();
        thread::Builder::new()
            .name(format!("seed-worker-{worker}"))
            .spawn(move || run_worker(receiver, store))?;
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let accept_shutdown = Arc::clone(&shutdown);
    let idle_timeout = config.idle_timeout();
    let accept_thread = thread::Builder::new()
        .name("seed-accept".to_string())
        .spawn(move || loop {
            if accept_shutdown.load(Ordering::SeqCst) {
                debug!(target: "seed_store::server", "accept.stopped");
                break;
            }
            match listener.accept() {
                Ok((stream, addr)) => {
                    debug!(target: "seed_store::server", %addr, "client.connected");
                    if let Err(err) = prepare_stream(&stream, idle_timeout) {
                        warn!("Failed to configure client {}: {}", addr, err);
                        continue;
                    }
                    if sender.send(stream).is_err() {
                        error!(target: "seed_store::server", "worker pool gone");
                        break;
                    }
                }
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(20));
                }
                Err(err) => {
                    error!("Error accepting seed client: {}", err);
                    thread::sleep(Duration::from_millis(200));
                }
            }
        })?;

    info!(
        target: "seed_store::server",
        %local_addr,
        workers = config.worker_count(),
        "server.listening"
    );

    Ok(SeedServerHandle {
        local_addr,
        shutdown,
        accept_thread: Some(accept_thread),
    })
}

fn prepare_stream(stream: &TcpStream, idle_timeout: Duration) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(idle_timeout))
}

fn run_worker(receiver: Receiver<TcpStream>, store: SeedStore) {
    for mut stream in receiver {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        match serve_connection(&mut stream, &store) {
            Ok(served) => debug!(target: "seed_store::server", %peer, served, "client.closed"),
            Err(ServeError::Frame(FrameError::Io(err)))
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                debug!(target: "seed_store::server", %peer, "client.idle_timeout");
            }
            Err(err) => warn!("Dropping seed client {}: {}", peer, err),
        }
    }
}

/// Serve requests until the peer closes the stream. Returns the number answered.
fn serve_connection(stream: &mut TcpStream, store: &SeedStore) -> Result<u64, ServeError> {
    let mut served = 0;
    while let Some(payload) = read_frame(stream)? {
        let response = match decode_request(&payload) {
            Ok(request) => store.handle_request(&request),
            Err(err) => {
                warn!(target: "seed_store::server", error = %err, "request.malformed");
                StoreResponse::Rejected(format!("malformed request: {err}"))
            }
        };
        let bytes = encode_response(&response)?;
        write_frame(stream, &bytes)?;
        served += 1;
    }
    Ok(served)
}
