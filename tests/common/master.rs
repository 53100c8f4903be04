//! An in-process mock AgentX master agent.
//!
//! Listens on a loopback TCP port, serves one subagent connection at a
//! time, and auto-responds to administrative PDUs (Open gets a fresh
//! session id; Register, Unregister and Close get a clean Response). Tests
//! drive Get, GetNext and GetBulk through it and receive the subagent's
//! Response frame. Dropping the connection mid-test exercises the
//! subagent's reconnect path: the master simply accepts the next
//! connection.

use async_agentx::pdu::{Frame, Header, Pdu, PduType, Response, HEADER_SIZE};
use bytes::BytesMut;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

enum MasterCommand {
    /// Stamp a packet id, remember the reply slot, send to the subagent.
    Request {
        frame: Frame,
        reply: oneshot::Sender<Frame>,
    },
    /// Close the current connection; the master accepts the next one.
    DropConnection,
}

/// Handle onto the mock master task.
pub struct MockMaster {
    addr: SocketAddr,
    cmd_tx: mpsc::Sender<MasterCommand>,
    /// Headers of every frame the subagent sent, in arrival order.
    received: Arc<Mutex<Vec<Header>>>,
}

impl MockMaster {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let received = Arc::new(Mutex::new(Vec::new()));

        tokio::spawn(master_loop(listener, cmd_rx, received.clone()));

        Self {
            addr,
            cmd_tx,
            received,
        }
    }

    /// Address for `Client::builder("tcp", master.address())`.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Headers of every subagent-originated frame seen so far.
    pub fn received(&self) -> Vec<Header> {
        self.received.lock().unwrap().clone()
    }

    /// Types of every subagent-originated frame seen so far.
    pub fn received_types(&self) -> Vec<PduType> {
        self.received().iter().map(|h| h.ty).collect()
    }

    /// Close the active connection, simulating a master restart.
    pub async fn drop_connection(&self) {
        self.cmd_tx
            .send(MasterCommand::DropConnection)
            .await
            .expect("master task gone");
    }

    /// Send a master-initiated PDU on `session_id` and await the
    /// subagent's Response frame.
    pub async fn request(&self, session_id: u32, transaction_id: u32, pdu: Pdu) -> Frame {
        let mut header = Header::new(pdu.pdu_type());
        header.session_id = session_id;
        header.transaction_id = transaction_id;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(MasterCommand::Request {
                frame: Frame::new(header, pdu),
                reply: reply_tx,
            })
            .await
            .expect("master task gone");
        reply_rx.await.expect("no response from subagent")
    }

    /// Like [`request`](Self::request) but unwraps the Response body.
    pub async fn request_response(&self, session_id: u32, pdu: Pdu) -> (Header, Response) {
        let frame = self.request(session_id, 1, pdu).await;
        match frame.pdu {
            Pdu::Response(response) => (frame.header, response),
            other => panic!("expected Response, got {:?}", other),
        }
    }
}

async fn master_loop(
    listener: TcpListener,
    mut cmd_rx: mpsc::Receiver<MasterCommand>,
    received: Arc<Mutex<Vec<Header>>>,
) {
    let mut next_session_id = 100u32;
    let mut next_packet_id = 5000u32;
    let mut pending: HashMap<u32, oneshot::Sender<Frame>> = HashMap::new();

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(_) => return,
        };
        let done = serve_connection(
            stream,
            &mut cmd_rx,
            &received,
            &mut next_session_id,
            &mut next_packet_id,
            &mut pending,
        )
        .await;
        if done {
            return;
        }
    }
}

/// Serve one connection until EOF or a DropConnection command. Returns
/// true when the master should shut down entirely.
async fn serve_connection(
    stream: TcpStream,
    cmd_rx: &mut mpsc::Receiver<MasterCommand>,
    received: &Arc<Mutex<Vec<Header>>>,
    next_session_id: &mut u32,
    next_packet_id: &mut u32,
    pending: &mut HashMap<u32, oneshot::Sender<Frame>>,
) -> bool {
    let (mut reader, mut writer) = stream.into_split();

    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => {
                let Some((header, pdu)) = frame else { return false };
                received.lock().unwrap().push(header);

                match pdu {
                    Pdu::Response(_) => {
                        if let Some(reply) = pending.remove(&header.packet_id) {
                            let _ = reply.send(Frame::new(header, pdu));
                        }
                    }
                    Pdu::Open(_) => {
                        let mut response = Header::new(PduType::Response);
                        response.session_id = *next_session_id;
                        *next_session_id += 1;
                        response.transaction_id = header.transaction_id;
                        response.packet_id = header.packet_id;
                        write_frame(
                            &mut writer,
                            &Frame::new(response, Pdu::Response(Response::default())),
                        )
                        .await;
                    }
                    _ => {
                        // Register / Unregister / Close: acknowledge.
                        let mut response = Header::new(PduType::Response);
                        response.session_id = header.session_id;
                        response.transaction_id = header.transaction_id;
                        response.packet_id = header.packet_id;
                        write_frame(
                            &mut writer,
                            &Frame::new(response, Pdu::Response(Response::default())),
                        )
                        .await;
                    }
                }
            }
            command = cmd_rx.recv() => {
                match command {
                    None => return true,
                    Some(MasterCommand::DropConnection) => return false,
                    Some(MasterCommand::Request { mut frame, reply }) => {
                        frame.header.packet_id = *next_packet_id;
                        *next_packet_id += 1;
                        pending.insert(frame.header.packet_id, reply);
                        write_frame(&mut writer, &frame).await;
                    }
                }
            }
        }
    }
}

async fn read_frame(reader: &mut OwnedReadHalf) -> Option<(Header, Pdu)> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes).await.ok()?;
    let header = Header::from_bytes(&header_bytes);

    let mut payload = vec![0u8; header.payload_length as usize];
    reader.read_exact(&mut payload).await.ok()?;

    let pdu = Pdu::decode(header.ty, &payload).expect("subagent sent an undecodable frame");
    Some((header, pdu))
}

async fn write_frame(writer: &mut OwnedWriteHalf, frame: &Frame) {
    let mut buf = BytesMut::new();
    frame.encode(&mut buf).unwrap();
    writer.write_all(&buf).await.unwrap();
}
