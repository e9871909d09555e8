use std::future::Future;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use relay_api::RelayError;

/// Largest payload a UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Where the relay loop reads datagrams from.
pub trait DatagramSource {
    /// Wait for the next datagram. Must be cancel safe.
    fn recv(&mut self) -> impl Future<Output = Result<&[u8], RelayError>> + Send;
}

/// UDP socket bound to the listen port.
///
/// A successfully returned listener is the listener's readiness signal.
/// Datagrams are only read once the owner starts calling
/// [`DatagramSource::recv`], anything arriving earlier waits in the
/// socket buffer or is lost.
pub struct DatagramListener {
    socket: UdpSocket,
    local_addr: SocketAddr,
    buf: Vec<u8>,
}

impl DatagramListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self, RelayError> {
        tracing::info!(%addr, "initialising UDP socket");
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| RelayError::Bind { addr, source })?;
        tracing::info!(addr = %local_addr, "UDP listening");
        Ok(Self {
            socket,
            local_addr,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl DatagramSource for DatagramListener {
    fn recv(&mut self) -> impl Future<Output = Result<&[u8], RelayError>> + Send {
        async move {
            let (len, peer) = self
                .socket
                .recv_from(&mut self.buf)
                .await
                .map_err(RelayError::Receive)?;
            tracing::trace!(%peer, len, "datagram received");
            Ok(&self.buf[..len])
        }
    }
}
