//! Connection pipeline: the transmitter and receiver tasks.
//!
//! One [`Stream`] carries a client's traffic. The transmitter drains a
//! channel of outbound frames and writes each one to completion before the
//! next, so frames from concurrent requesters interleave only at frame
//! boundaries. The receiver reads frames with read-until-full semantics and
//! hands them to the dispatcher; on EOF it owns the reconnect loop,
//! re-dialing until the master is back and then swapping the fresh write
//! half into the transmitter.

use crate::client::dispatch::Command;
use crate::error::{Error, Result};
use crate::pdu::{Frame, Header, Pdu, PduType, HEADER_SIZE};
use crate::pool::BufferPool;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf, ReadHalf, WriteHalf};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Upper bound on a frame body before the connection is considered broken.
///
/// A length beyond this cannot be skipped safely; framing is already lost.
const MAX_PAYLOAD_LENGTH: u32 = 16 * 1024 * 1024;

/// A reliable byte stream to the master agent.
#[derive(Debug)]
pub(crate) enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(unix)]
            Stream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(unix)]
            Stream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_flush(cx),
            #[cfg(unix)]
            Stream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(unix)]
            Stream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Connect to the master agent.
///
/// `network` selects the transport: `"tcp"` dials a TCP endpoint (NoDelay
/// and keepalive enabled), `"unix"` a stream socket path.
pub(crate) async fn dial(network: &str, address: &str) -> Result<Stream> {
    match network {
        "tcp" => dial_tcp(address).await,
        #[cfg(unix)]
        "unix" => {
            let stream = UnixStream::connect(address).await.map_err(|source| {
                Error::Dial {
                    network: network.to_string(),
                    address: address.to_string(),
                    source,
                }
                .boxed()
            })?;
            Ok(Stream::Unix(stream))
        }
        other => {
            Err(Error::Config(format!("unsupported network {:?}", other).into()).boxed())
        }
    }
}

async fn dial_tcp(address: &str) -> Result<Stream> {
    let dial_error = |source: io::Error| {
        Error::Dial {
            network: "tcp".to_string(),
            address: address.to_string(),
            source,
        }
        .boxed()
    };

    let addrs = lookup_host(address).await.map_err(dial_error)?;
    let mut last_error = None;
    for addr in addrs {
        let connect = async {
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            socket.set_keepalive(true)?;
            let stream = socket.connect(addr).await?;
            stream.set_nodelay(true)?;
            Ok::<_, io::Error>(stream)
        };
        match connect.await {
            Ok(stream) => return Ok(Stream::Tcp(stream)),
            Err(err) => last_error = Some(err),
        }
    }
    Err(dial_error(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
    })))
}

/// Messages consumed by the transmitter task.
pub(crate) enum TxMessage {
    /// Serialize and write one frame.
    Frame(Frame),
    /// Start writing to a new connection (after reconnect).
    Swap(WriteHalf<Stream>),
}

/// Transmitter task: serialize outbound frames and write each one whole.
///
/// Marshal and write failures drop the frame and move on; the requester's
/// correlation slot times out independently.
pub(crate) async fn run_transmitter(
    mut rx: mpsc::Receiver<TxMessage>,
    mut writer: WriteHalf<Stream>,
    pool: Arc<BufferPool>,
) {
    while let Some(message) = rx.recv().await {
        let frame = match message {
            TxMessage::Swap(new_writer) => {
                writer = new_writer;
                continue;
            }
            TxMessage::Frame(frame) => frame,
        };

        let mut buf = pool.acquire(HEADER_SIZE + 128);
        match frame.encode(&mut buf) {
            Err(err) => {
                tracing::error!(
                    target: "async_agentx::pipeline",
                    packet_type = %frame.header.ty,
                    packet_id = frame.header.packet_id,
                    error = %err,
                    "packet marshal error",
                );
            }
            Ok(()) => {
                if let Err(err) = writer.write_all(&buf).await {
                    tracing::error!(
                        target: "async_agentx::pipeline",
                        packet_type = %frame.pdu.pdu_type(),
                        session_id = frame.header.session_id,
                        packet_id = frame.header.packet_id,
                        error = %err,
                        "packet write error",
                    );
                } else {
                    tracing::debug!(
                        target: "async_agentx::pipeline",
                        packet_type = %frame.pdu.pdu_type(),
                        session_id = frame.header.session_id,
                        transaction_id = frame.header.transaction_id,
                        packet_id = frame.header.packet_id,
                        payload_length = (buf.len() - HEADER_SIZE) as u32,
                        "packet sent",
                    );
                }
            }
        }
        pool.release(buf);
    }
}

/// Everything the receiver task needs.
pub(crate) struct Receiver {
    pub(crate) reader: ReadHalf<Stream>,
    pub(crate) network: String,
    pub(crate) address: String,
    pub(crate) reconnect_interval: Duration,
    pub(crate) out_tx: mpsc::Sender<TxMessage>,
    pub(crate) cmd_tx: mpsc::Sender<Command>,
    pub(crate) token: CancellationToken,
    pub(crate) pool: Arc<BufferPool>,
}

#[derive(Debug)]
enum ReadOutcome {
    /// A decodable frame arrived.
    Frame(Header, Pdu),
    /// A frame was consumed but dropped (unhandled type or decode error).
    Skipped,
}

impl Receiver {
    /// Receiver task: read frames until the client closes, reconnecting on
    /// EOF.
    pub(crate) async fn run(mut self) {
        'main: loop {
            let outcome = tokio::select! {
                _ = self.token.cancelled() => return,
                outcome = read_frame(&mut self.reader, &self.pool) => outcome,
            };

            match outcome {
                Ok(ReadOutcome::Frame(header, pdu)) => {
                    if self
                        .cmd_tx
                        .send(Command::Inbound { header, pdu })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Ok(ReadOutcome::Skipped) => {}
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    if self.token.is_cancelled() {
                        return;
                    }
                    tracing::info!(
                        target: "async_agentx::pipeline",
                        reconnect_in = ?self.reconnect_interval,
                        "lost connection to master",
                    );
                    if self.reconnect().await {
                        continue 'main;
                    }
                    return;
                }
                Err(err) => {
                    if !self.token.is_cancelled() {
                        tracing::error!(
                            target: "async_agentx::pipeline",
                            error = %err,
                            "receive error, terminating receiver",
                        );
                    }
                    return;
                }
            }
        }
    }

    /// Re-dial until a connection is established or the client closes.
    /// Returns false when the client closed during the attempt.
    async fn reconnect(&mut self) -> bool {
        loop {
            tokio::select! {
                _ = self.token.cancelled() => return false,
                _ = tokio::time::sleep(self.reconnect_interval) => {}
            }
            match dial(&self.network, &self.address).await {
                Err(err) => {
                    tracing::error!(
                        target: "async_agentx::pipeline",
                        error = %err,
                        "re-connect error",
                    );
                }
                Ok(stream) => {
                    let (reader, writer) = tokio::io::split(stream);
                    self.reader = reader;
                    if self.out_tx.send(TxMessage::Swap(writer)).await.is_err() {
                        return false;
                    }
                    if self.cmd_tx.send(Command::Reconnected).await.is_err() {
                        return false;
                    }
                    return true;
                }
            }
        }
    }
}

/// Read one frame: exactly 20 header bytes, then exactly `payload_length`
/// body bytes, then decode by type.
async fn read_frame(
    reader: &mut ReadHalf<Stream>,
    pool: &BufferPool,
) -> io::Result<ReadOutcome> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes).await?;
    let header = Header::from_bytes(&header_bytes);

    if header.payload_length > MAX_PAYLOAD_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame claims {} byte payload", header.payload_length),
        ));
    }

    let payload_length = header.payload_length as usize;
    let mut buf = pool.acquire(payload_length);
    buf.resize(payload_length, 0);
    let read = reader.read_exact(&mut buf[..]).await;
    if let Err(err) = read {
        pool.release(buf);
        return Err(err);
    }

    tracing::debug!(
        target: "async_agentx::pipeline",
        packet_type = %header.ty,
        session_id = header.session_id,
        transaction_id = header.transaction_id,
        packet_id = header.packet_id,
        payload_length = header.payload_length,
        "packet received",
    );

    let outcome = match header.ty {
        PduType::Response | PduType::Get | PduType::GetNext | PduType::GetBulk => {
            match Pdu::decode(header.ty, &buf) {
                Ok(pdu) => ReadOutcome::Frame(header, pdu),
                Err(err) => {
                    tracing::error!(
                        target: "async_agentx::pipeline",
                        packet_type = %header.ty,
                        packet_id = header.packet_id,
                        error = %err,
                        "unable to unmarshal packet",
                    );
                    ReadOutcome::Skipped
                }
            }
        }
        other => {
            // Payload already consumed, framing stays intact.
            tracing::error!(
                target: "async_agentx::pipeline",
                packet_type = %other,
                packet_id = header.packet_id,
                "unable to handle packet",
            );
            ReadOutcome::Skipped
        }
    };
    pool.release(buf);
    Ok(outcome)
}
