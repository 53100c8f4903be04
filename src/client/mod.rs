//! AgentX client: connection ownership and session construction.

pub(crate) mod dispatch;
pub(crate) mod pipeline;

use crate::error::Result;
use crate::handler::Handler;
use crate::oid::Oid;
use crate::pool::BufferPool;
use crate::session::{Session, SessionCore};
use dispatch::{Command, DispatchHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Depth of the dispatcher and transmitter channels. Senders briefly block
/// when a burst outruns the socket, which is the backpressure we want.
const CHANNEL_CAPACITY: usize = 32;

/// Default delay between reconnect attempts after the master drops the
/// connection.
const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(10);

/// A connection to an AgentX master agent.
///
/// Dialing spawns the connection pipeline (transmitter, receiver and
/// dispatcher tasks); the client is a cheap cloneable handle onto it.
/// Sessions opened through [`session`](Self::session) survive connection
/// loss: the pipeline reconnects and replays each session's Open and
/// Register automatically.
///
/// # Example
///
/// ```rust,no_run
/// use async_agentx::{Client, ListHandler, Value, oid};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> async_agentx::Result<()> {
/// let client = Client::builder("tcp", "127.0.0.1:705")
///     .timeout(Duration::from_secs(60))
///     .reconnect_interval(Duration::from_secs(1))
///     .connect()
///     .await?;
///
/// let mut handler = ListHandler::new();
/// *handler.add("1.3.6.1.4.1.45995.3.1")? = Value::octet_string("test");
///
/// let session = client
///     .session(oid!(1, 3, 6, 1, 4, 1, 45995), "example agent", Some(Arc::new(handler)))
///     .await?;
/// session.register(127, oid!(1, 3, 6, 1, 4, 1, 45995)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    handle: DispatchHandle,
    token: CancellationToken,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl Client {
    /// Start building a client for the given endpoint.
    ///
    /// `network` is `"tcp"` for a TCP endpoint (`host:port`) or `"unix"`
    /// for a stream socket path.
    pub fn builder(network: impl Into<String>, address: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(network, address)
    }

    /// Connect with default options. Shorthand for
    /// `Client::builder(network, address).connect()`.
    pub async fn dial(network: &str, address: &str) -> Result<Client> {
        Self::builder(network, address).connect().await
    }

    /// Open a session identified by `name_oid` / `name`, served by
    /// `handler`.
    ///
    /// A session without a handler (`None`) answers Get requests with Null
    /// varbinds, which is occasionally useful for probing.
    pub async fn session(
        &self,
        name_oid: Oid,
        name: &str,
        handler: Option<Arc<dyn Handler>>,
    ) -> Result<Session> {
        let core = SessionCore::open(self.inner.handle.clone(), name_oid, name, handler).await?;
        self.inner
            .handle
            .send(Command::AddSession {
                id: core.session_id(),
                core: core.clone(),
            })
            .await?;
        Ok(Session::new(core))
    }

    /// Tear down the client: the receiver stops without reconnecting, the
    /// pipeline tasks exit and pending requests fail with
    /// [`Error::Closed`](crate::Error::Closed).
    pub fn close(&self) {
        self.inner.token.cancel();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("closed", &self.inner.token.is_cancelled())
            .finish()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    network: String,
    address: String,
    timeout: Option<Duration>,
    reconnect_interval: Duration,
}

impl ClientBuilder {
    /// Create a builder with default options.
    pub fn new(network: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            address: address.into(),
            timeout: None,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }

    /// Bound every request wait and advertise the value to the master as
    /// the session timeout. Without one, a lost response blocks its caller
    /// until the client closes.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Delay between reconnect attempts after connection loss
    /// (default 10 s).
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Connect and spawn the connection pipeline.
    pub async fn connect(self) -> Result<Client> {
        let stream = pipeline::dial(&self.network, &self.address).await?;
        let (reader, writer) = tokio::io::split(stream);

        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let token = CancellationToken::new();
        let pool = Arc::new(BufferPool::new());
        let handle = DispatchHandle::new(cmd_tx.clone(), self.timeout);

        tokio::spawn(pipeline::run_transmitter(out_rx, writer, pool.clone()));
        tokio::spawn(
            pipeline::Receiver {
                reader,
                network: self.network,
                address: self.address,
                reconnect_interval: self.reconnect_interval,
                out_tx: out_tx.clone(),
                cmd_tx,
                token: token.clone(),
                pool,
            }
            .run(),
        );
        tokio::spawn(dispatch::run_dispatcher(
            cmd_rx,
            handle.clone(),
            out_tx,
            token.clone(),
        ));

        Ok(Client {
            inner: Arc::new(ClientInner { handle, token }),
        })
    }
}
