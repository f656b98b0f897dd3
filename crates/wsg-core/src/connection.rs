//! Connection driver
//!
//! Runs a WebSocket transport as two tasks: a reader that decodes inbound
//! frames and routes decode errors through the [`ProtocolErrorResponder`],
//! and a writer that owns the sink and acknowledges each submitted frame
//! once it has been flushed. Closing cancels both.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, FutureExt};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use wsg_protocol::{Frame, Role, WebSocketCodec};

use crate::config::ConnectionConfig;
use crate::error::PipelineError;
use crate::responder::ProtocolErrorResponder;
use crate::traits::{PipelineContext, WriteCompletion};

/// Events delivered to the application
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A frame received from the peer
    Frame(Frame),
    /// An error that reached the end of the inbound path
    Error(PipelineError),
}

/// A frame waiting for the writer, with the channel its result goes back on
struct Outbound {
    frame: Frame,
    ack: oneshot::Sender<Result<(), PipelineError>>,
}

/// Handle to a running connection
pub struct Connection {
    /// Local endpoint role
    role: Role,
    /// Queue feeding the writer task
    outbound_tx: mpsc::Sender<Outbound>,
    /// Application-facing events
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    /// Cancelled once the connection is closed
    cancel: CancellationToken,
}

impl Connection {
    /// Start driving `io` and return the handle plus the event stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T>(
        io: T,
        config: &ConnectionConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ConnectionEvent>)
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(io);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let conn = Arc::new(Self {
            role: config.role,
            outbound_tx,
            event_tx,
            cancel: cancel.clone(),
        });

        let codec = WebSocketCodec::with_max_payload_size(config.role, config.max_payload_size);
        let writer = FramedWrite::new(write_half, codec.clone());
        let reader = FramedRead::new(read_half, codec);
        let responder = ProtocolErrorResponder::new(reader.decoder().role());

        tokio::spawn(write_loop(
            writer,
            outbound_rx,
            cancel,
            config.write_timeout,
        ));
        tokio::spawn(read_loop(reader, Arc::clone(&conn), responder));

        tracing::debug!("Connection started as {}", config.role);
        (conn, event_rx)
    }

    /// Local endpoint role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Send a frame and wait until it has been flushed.
    ///
    /// The masking key is replaced according to the local role, so clients
    /// always mask and servers never do.
    pub async fn send(&self, mut frame: Frame) -> Result<(), PipelineError> {
        frame.mask = self.role.outbound_mask();
        self.write_and_flush(frame).await
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the connection is closed
    pub async fn closed(&self) {
        self.cancel.cancelled().await
    }
}

impl PipelineContext for Connection {
    fn write_and_flush(&self, frame: Frame) -> WriteCompletion {
        let (ack, done) = oneshot::channel();

        // Queue right away when there is room so the frame is submitted
        // before this call returns; otherwise wait for room when polled
        let pending = match self.outbound_tx.try_send(Outbound { frame, ack }) {
            Ok(()) => None,
            Err(mpsc::error::TrySendError::Full(outbound)) => Some(outbound),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                return future::ready(Err(PipelineError::ConnectionClosed)).boxed();
            }
        };

        let outbound_tx = self.outbound_tx.clone();
        async move {
            if let Some(outbound) = pending {
                outbound_tx
                    .send(outbound)
                    .await
                    .map_err(|_| PipelineError::ConnectionClosed)?;
            }
            done.await.map_err(|_| PipelineError::ConnectionClosed)?
        }
        .boxed()
    }

    fn close(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("Closing connection");
        }
        self.cancel.cancel();
    }

    fn fire_error(&self, error: PipelineError) {
        if let Err(mpsc::error::SendError(event)) = self.event_tx.send(ConnectionEvent::Error(error))
        {
            tracing::warn!("No observer for connection event: {:?}", event);
        }
    }
}

async fn read_loop<R>(
    mut reader: FramedRead<R, WebSocketCodec>,
    conn: Arc<Connection>,
    responder: ProtocolErrorResponder,
) where
    R: AsyncRead + Unpin,
{
    loop {
        tokio::select! {
            _ = conn.cancel.cancelled() => break,
            next = reader.next() => match next {
                Some(Ok(frame)) => {
                    // Keep decoding without an observer so violations still get a Close
                    if let Err(mpsc::error::SendError(event)) =
                        conn.event_tx.send(ConnectionEvent::Frame(frame))
                    {
                        tracing::debug!("No observer for connection event: {:?}", event);
                    }
                }
                Some(Err(e)) => {
                    // The byte stream can't be resynchronised after a decode error
                    responder.on_error(&conn, e.into());
                    break;
                }
                None => {
                    tracing::debug!("Peer closed the stream");
                    conn.close();
                    break;
                }
            }
        }
    }
}

async fn write_loop<W>(
    mut writer: FramedWrite<W, WebSocketCodec>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    cancel: CancellationToken,
    write_timeout: Duration,
) where
    W: AsyncWrite + Unpin,
{
    // Set once a write was abandoned with bytes still buffered
    let mut stalled = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = outbound_rx.recv() => match next {
                Some(Outbound { frame, ack }) => {
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(PipelineError::ConnectionClosed),
                        sent = tokio::time::timeout(write_timeout, writer.send(frame)) => match sent {
                            Ok(result) => result.map_err(PipelineError::from),
                            Err(_) => Err(PipelineError::WriteTimeout(write_timeout)),
                        },
                    };
                    match &result {
                        Ok(()) => stalled = false,
                        Err(e) => {
                            tracing::debug!("Frame write failed: {}", e);
                            stalled = matches!(
                                e,
                                PipelineError::ConnectionClosed | PipelineError::WriteTimeout(_)
                            );
                        }
                    }
                    let _ = ack.send(result);
                }
                None => break,
            }
        }
    }

    // Frames still queued resolve to ConnectionClosed once dropped
    outbound_rx.close();
    if stalled {
        // Flushing would block on the same peer again
        tracing::debug!("Dropping transport with unflushed data");
    } else if let Err(e) = writer.close().await {
        tracing::debug!("Transport shutdown failed: {}", e);
    }
    tracing::debug!("Writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::time::timeout;
    use wsg_protocol::OpCode;

    #[tokio::test]
    async fn test_frames_reach_the_application() {
        let (local, mut peer) = tokio::io::duplex(1024);
        let (_conn, mut events) = Connection::spawn(local, &ConnectionConfig::default());

        // Masked "Hello" from a client
        peer.write_all(&[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58])
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            ConnectionEvent::Frame(frame) => {
                assert_eq!(frame.opcode, OpCode::Text);
                assert_eq!(frame.payload.as_ref(), b"Hello");
            }
            other => panic!("Expected frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_applies_role_masking() {
        let (local, mut peer) = tokio::io::duplex(1024);
        let (conn, _events) = Connection::spawn(local, &ConnectionConfig::default());

        let frame = Frame::new(true, OpCode::Binary, Some([1, 2, 3, 4]), Bytes::from("hi"));
        conn.send(frame).await.unwrap();

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x82, 0x02, b'h', b'i']);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (local, mut peer) = tokio::io::duplex(1024);
        let (conn, _events) = Connection::spawn(local, &ConnectionConfig::default());

        conn.close();
        conn.close();
        timeout(Duration::from_secs(1), conn.closed()).await.unwrap();
        assert!(conn.is_closed());

        let mut rest = Vec::new();
        timeout(Duration::from_secs(1), peer.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let (local, _peer) = tokio::io::duplex(1024);
        let (conn, _events) = Connection::spawn(local, &ConnectionConfig::default());

        conn.close();
        let frame = Frame::new(true, OpCode::Ping, None, Bytes::new());
        let result = timeout(Duration::from_secs(1), conn.write_and_flush(frame))
            .await
            .unwrap();
        assert!(matches!(result, Err(PipelineError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_peer_eof_closes() {
        let (local, peer) = tokio::io::duplex(1024);
        let (conn, _events) = Connection::spawn(local, &ConnectionConfig::default());

        drop(peer);
        timeout(Duration::from_secs(1), conn.closed()).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_aborts_stalled_write() {
        // Peer never reads, so the 200 byte frame can't be flushed
        let (local, _peer) = tokio::io::duplex(16);
        let (conn, _events) = Connection::spawn(local, &ConnectionConfig::default());

        let sender = Arc::clone(&conn);
        let send = tokio::spawn(async move {
            let frame = Frame::new(true, OpCode::Binary, None, Bytes::from(vec![0u8; 200]));
            sender.send(frame).await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!send.is_finished());

        conn.close();
        let result = timeout(Duration::from_millis(500), send)
            .await
            .expect("write still pending after close")
            .unwrap();
        assert!(matches!(result, Err(PipelineError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_violation_from_stalled_peer_still_closes() {
        let config = ConnectionConfig {
            write_timeout: Duration::from_millis(100),
            ..ConnectionConfig::default()
        };
        let (local, mut peer) = tokio::io::duplex(16);
        let (conn, mut events) = Connection::spawn(local, &config);

        let sender = Arc::clone(&conn);
        let send = tokio::spawn(async move {
            let frame = Frame::new(true, OpCode::Binary, None, Bytes::from(vec![0u8; 200]));
            sender.send(frame).await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Reserved opcode, and the peer keeps not reading
        peer.write_all(&[0x83, 0x80, 0, 0, 0, 0]).await.unwrap();

        timeout(Duration::from_secs(2), conn.closed())
            .await
            .expect("connection was not closed");

        let result = send.await.unwrap();
        assert!(matches!(result, Err(PipelineError::WriteTimeout(_))));

        let event = timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            event,
            ConnectionEvent::Error(PipelineError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_violation_answered_without_observer() {
        let (local, mut peer) = tokio::io::duplex(1024);
        let (conn, events) = Connection::spawn(local, &ConnectionConfig::default());
        drop(events);

        // Empty masked Binary frame, then a reserved opcode
        peer.write_all(&[0x82, 0x80, 1, 2, 3, 4, 0x83, 0x80, 0, 0, 0, 0])
            .await
            .unwrap();

        let mut received = Vec::new();
        timeout(Duration::from_secs(1), peer.read_to_end(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, vec![0x88, 0x02, 0x03, 0xEA]);
        assert!(conn.is_closed());
    }
}
