//! TCP transport for the protocol server.
//! - DebugServer::bind: listen for debug clients
//! - serve/spawn: accept loop, one session at a time

use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use scriptdbg_runtime::debug::DebugControl;

use crate::adapter::{AdapterOptions, DebugAdapter};
use crate::source::SourceResolver;

/// Listens for debug clients and serves them sequentially against one debuggee.
pub struct DebugServer {
    listener: TcpListener,
    control: DebugControl,
    options: AdapterOptions,
    resolver: Arc<dyn SourceResolver>,
}

impl DebugServer {
    pub fn bind(
        addr: &str,
        control: DebugControl,
        options: AdapterOptions,
        resolver: Arc<dyn SourceResolver>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|err| io::Error::new(err.kind(), format!("bind {addr}: {err}")))?;
        Ok(Self {
            listener,
            control,
            options,
            resolver,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve clients on a background thread for the life of the process.
    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.serve())
    }

    /// Accept clients forever. Further clients queue until the current session ends.
    pub fn serve(self) {
        if let Ok(addr) = self.local_addr() {
            info!(%addr, "debug server listening");
        }
        for stream in self.listener.incoming().map_while(Result::ok) {
            let peer = stream
                .peer_addr()
                .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
            info!(%peer, "debug client connected");
            if let Err(err) = self.serve_client(stream) {
                warn!(%peer, %err, "debug client dropped");
            }
        }
    }

    fn serve_client(&self, stream: TcpStream) -> io::Result<()> {
        let _ = stream.set_nodelay(true);
        let reader = BufReader::new(stream.try_clone()?);
        let mut adapter = DebugAdapter::new(self.control.clone())
            .with_options(self.options.clone())
            .with_resolver(Arc::clone(&self.resolver));
        adapter.run(reader, stream)
    }
}
