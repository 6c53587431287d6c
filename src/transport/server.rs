//! TCP listener and per-connection drivers.
//!
//! The engine itself never opens sockets; this module is the boundary that
//! does. Each accepted stream gets its own task owning a
//! `Framed<TcpStream, MqttCodec>` and a [`Connection`] state machine, so
//! there is no shared mutable state between connections. Decoded events are
//! forwarded to collaborators over an mpsc channel supplied by the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use crate::auth::CredentialValidator;
use crate::config::GatewayConfig;
use crate::core::reader::FrameReader;
use crate::error::Result;
use crate::protocol::connection::{Action, Connection, Event};

/// Start the gateway listener with a ctrl-c shutdown handler.
pub async fn start_server(config: Arc<GatewayConfig>, events: mpsc::Sender<Event>) -> Result<()> {
    // Create internal shutdown channel
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    // Set up ctrl-c handler that sends to our internal shutdown channel
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    start_server_with_shutdown(config, events, shutdown_rx).await
}

/// Start the gateway listener with an external shutdown channel.
#[instrument(skip(config, events, shutdown_rx), fields(address = %config.server.address))]
pub async fn start_server_with_shutdown(
    config: Arc<GatewayConfig>,
    events: mpsc::Sender<Event>,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(&config.server.address).await?;
    info!("listening for device connections");

    let validator = CredentialValidator::new(config.auth.signature_key.clone());
    if !validator.verifies_signatures() {
        warn!("no signature key configured - password validation is disabled");
    }

    // Track active connections
    let active_connections = Arc::new(Mutex::new(0u32));

    loop {
        tokio::select! {
            // Check for shutdown signal from the provided shutdown_rx channel
            _ = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for connections to close...");

                let timeout = tokio::time::sleep(config.server.shutdown_timeout);
                tokio::pin!(timeout);

                loop {
                    tokio::select! {
                        _ = &mut timeout => {
                            warn!("Shutdown timeout reached, forcing exit");
                            break;
                        }
                        _ = tokio::time::sleep(Duration::from_millis(500)) => {
                            let connections = *active_connections.lock().await;
                            info!(connections = %connections, "Waiting for connections to close");
                            if connections == 0 {
                                info!("All connections closed, shutting down");
                                break;
                            }
                        }
                    }
                }

                return Ok(());
            }

            // Accept new device connections
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        {
                            let mut count = active_connections.lock().await;
                            if *count as usize >= config.server.max_connections {
                                warn!(peer = %peer, "connection limit reached, refusing");
                                drop(stream);
                                continue;
                            }
                            *count += 1;
                        }

                        let active_connections = active_connections.clone();
                        let validator = validator.clone();
                        let events = events.clone();
                        let max_packet_bytes = config.server.max_packet_bytes;

                        tokio::spawn(
                            async move {
                                drive_connection(stream, validator, max_packet_bytes, events)
                                    .await;

                                // Decrement connection counter when connection closes
                                let mut count = active_connections.lock().await;
                                *count -= 1;
                            }
                            .instrument(info_span!("connection", peer = %peer)),
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

/// Drive one device connection to completion.
///
/// Reads raw chunks, feeds them through a [`FrameReader`], and applies the
/// state machine's actions. Activity is recorded per inbound chunk, not per
/// completed frame, so a device trickling a large frame byte-by-byte never
/// looks idle to a keep-alive supervisor. Frames are handled strictly in
/// arrival order; a fatal error on this connection ends this task and
/// nothing else.
pub async fn drive_connection<S>(
    mut stream: S,
    validator: CredentialValidator,
    max_packet_bytes: usize,
    events: mpsc::Sender<Event>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = FrameReader::new(max_packet_bytes);
    let mut conn = Connection::new(validator);
    let mut chunk = BytesMut::with_capacity(4096);

    'session: loop {
        chunk.clear();
        match stream.read_buf(&mut chunk).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "read failed, dropping connection");
                break;
            }
        }

        conn.record_activity(Instant::now());

        let frames = match reader.feed(&chunk) {
            Ok(frames) => frames,
            Err(err) => {
                // Framing failures (malformed length, oversized declaration)
                // discard the buffer with the connection.
                debug!(error = %err, "framing error, dropping connection");
                let _ = events.send(Event::ProtocolError(err.to_string())).await;
                break;
            }
        };

        for frame in frames {
            for action in conn.handle_frame(&frame) {
                match action {
                    Action::Reply(bytes) => {
                        if let Err(err) = stream.write_all(&bytes).await {
                            debug!(error = %err, "write failed, dropping connection");
                            break 'session;
                        }
                    }
                    Action::Emit(event) => {
                        // A lagging collaborator must not corrupt protocol
                        // state; a closed event channel just means nobody is
                        // listening.
                        let _ = events.send(event).await;
                    }
                    Action::Close => break 'session,
                }
            }

            if conn.is_closed() {
                break 'session;
            }
        }
    }

    debug!("connection finished");
}
