use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use parley_types::events::{ClientCommand, ServerEvent};

use crate::error::ConnectError;
use crate::manager::{ChannelManager, CommandReceiver, Outbound, WeakChannelManager};
use crate::options::GatewayOptions;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Sink = SplitSink<Socket, WsMessage>;
type Stream = SplitStream<Socket>;

/// Floor for the heartbeat period and the reconnect pause.
const MIN_PERIOD: Duration = Duration::from_millis(10);

enum Exit {
    /// Connection lost; reconnect after backoff.
    Dropped,
    /// Shutdown fired or every manager handle is gone.
    Stop,
}

/// Keep one live connection open for `manager` until `shutdown` fires or
/// the last manager handle is dropped.
///
/// Buffers and join counts live in the manager, so they survive
/// reconnects. Each new connection re-asserts every joined chat first,
/// then flushes sends that were queued or failed mid-write while offline.
pub async fn run<F>(manager: ChannelManager, mut commands: CommandReceiver, shutdown: F)
where
    F: Future<Output = ()>,
{
    let options = manager.options().clone();
    let weak = manager.downgrade();
    drop(manager);

    tokio::pin!(shutdown);
    let mut backlog: VecDeque<Outbound> = VecDeque::new();
    let first_delay = options.reconnect_delay.max(MIN_PERIOD);
    let max_delay = options.max_reconnect_delay.max(first_delay);
    let mut delay = first_delay;

    loop {
        let Some(credential) = weak.upgrade().map(|m| m.socket_credential()) else {
            break;
        };

        let attempt = connect(&options.socket_url, credential);
        let Some(result) = offline(attempt, &mut commands, &mut backlog, &mut shutdown).await else {
            break;
        };

        match result {
            Ok(socket) => {
                delay = first_delay;
                match serve(socket, &weak, &options, &mut commands, &mut backlog, &mut shutdown).await {
                    Exit::Stop => break,
                    Exit::Dropped => {}
                }
            }
            Err(e) => warn!("Cannot reach {}: {}", options.socket_url, e),
        }

        debug!("Reconnecting in {:?}", delay);
        let pause = tokio::time::sleep(delay);
        if offline(pause, &mut commands, &mut backlog, &mut shutdown).await.is_none() {
            break;
        }
        delay = (delay * 2).min(max_delay);
    }

    info!("Live connection loop stopped");
}

async fn connect(url: &str, credential: Option<String>) -> Result<Socket, ConnectError> {
    let mut request = url.into_client_request()?;
    if let Some(token) = credential {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        request.headers_mut().insert(header::AUTHORIZATION, value);
    }

    let (socket, _) = connect_async(request).await?;
    Ok(socket)
}

/// Drive `work` while no connection is up. Sends are held for the next
/// connection; joins and leaves are dropped because the next connection
/// re-asserts join state from the manager. Returns `None` on stop.
async fn offline<T, W, F>(
    work: W,
    commands: &mut CommandReceiver,
    backlog: &mut VecDeque<Outbound>,
    shutdown: &mut Pin<&mut F>,
) -> Option<T>
where
    W: Future<Output = T>,
    F: Future<Output = ()>,
{
    tokio::pin!(work);
    loop {
        tokio::select! {
            _ = shutdown.as_mut() => return None,
            outbound = commands.recv() => match outbound {
                Some(outbound) if outbound.is_send() => backlog.push_back(outbound),
                Some(outbound) => trace!("Offline, dropping {:?}", outbound.command),
                None => return None,
            },
            result = &mut work => return Some(result),
        }
    }
}

async fn serve<F>(
    socket: Socket,
    weak: &WeakChannelManager,
    options: &GatewayOptions,
    commands: &mut CommandReceiver,
    backlog: &mut VecDeque<Outbound>,
    shutdown: &mut Pin<&mut F>,
) -> Exit
where
    F: Future<Output = ()>,
{
    let conn_id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();

    let Some(rejoin) = weak.upgrade().map(|m| m.on_connected(conn_id)) else {
        return Exit::Stop;
    };
    info!("Connected to {} ({}), re-joining {} chats", options.socket_url, conn_id, rejoin.len());

    let exit = drive(&mut sink, &mut stream, rejoin, weak, options, commands, backlog, shutdown).await;

    if matches!(exit, Exit::Stop) {
        let _ = sink.send(WsMessage::Close(None)).await;
    }
    if let Some(manager) = weak.upgrade() {
        manager.on_disconnected(conn_id);
    }
    info!("Disconnected from {} ({})", options.socket_url, conn_id);
    exit
}

#[allow(clippy::too_many_arguments)]
async fn drive<F>(
    sink: &mut Sink,
    stream: &mut Stream,
    rejoin: Vec<ClientCommand>,
    weak: &WeakChannelManager,
    options: &GatewayOptions,
    commands: &mut CommandReceiver,
    backlog: &mut VecDeque<Outbound>,
    shutdown: &mut Pin<&mut F>,
) -> Exit
where
    F: Future<Output = ()>,
{
    for command in &rejoin {
        if let Err(e) = write(sink, command).await {
            warn!("Re-join failed: {}", e);
            return Exit::Dropped;
        }
    }

    while let Some(outbound) = backlog.pop_front() {
        if outbound.is_abandoned() {
            debug!("Skipping abandoned send for chat {}", outbound.command.chat_id());
            continue;
        }
        if let Err(e) = write(sink, &outbound.command).await {
            warn!("Queued send failed: {}", e);
            backlog.push_front(outbound);
            return Exit::Dropped;
        }
        outbound.acknowledge();
    }

    let mut heartbeat = tokio::time::interval(options.heartbeat_interval.max(MIN_PERIOD));
    heartbeat.tick().await;
    let mut pong_received = true;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            _ = shutdown.as_mut() => return Exit::Stop,

            outbound = commands.recv() => {
                let Some(outbound) = outbound else {
                    return Exit::Stop;
                };
                if outbound.is_abandoned() {
                    debug!("Skipping abandoned send for chat {}", outbound.command.chat_id());
                    continue;
                }
                match write(sink, &outbound.command).await {
                    Ok(()) => outbound.acknowledge(),
                    Err(e) => {
                        warn!("Write failed: {}", e);
                        if outbound.is_send() {
                            backlog.push_front(outbound);
                        }
                        return Exit::Dropped;
                    }
                }
            }

            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => {
                        let Some(manager) = weak.upgrade() else {
                            return Exit::Stop;
                        };
                        manager.handle_event(event);
                    }
                    Err(e) => {
                        let raw: String = text.chars().take(200).collect();
                        warn!("Skipping malformed frame: {} -- raw: {}", e, raw);
                    }
                },
                Some(Ok(WsMessage::Pong(_))) => pong_received = true,
                Some(Ok(WsMessage::Close(_))) | None => return Exit::Dropped,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Socket error: {}", e);
                    return Exit::Dropped;
                }
            },

            _ = heartbeat.tick() => {
                if pong_received {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                        return Exit::Dropped;
                    }
                }
                pong_received = false;
                if sink.send(WsMessage::Ping(Vec::new())).await.is_err() {
                    return Exit::Dropped;
                }
            }
        }
    }
}

async fn write(sink: &mut Sink, command: &ClientCommand) -> Result<(), ConnectError> {
    let text = serde_json::to_string(command)?;
    sink.send(WsMessage::Text(text)).await?;
    trace!("Wrote {:?}", command);
    Ok(())
}
