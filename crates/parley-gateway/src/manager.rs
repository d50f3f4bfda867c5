use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use parley_api::{ApiClient, SessionStore, messages};
use parley_types::ChatId;
use parley_types::api::SendMessageRequest;
use parley_types::events::{ClientCommand, ServerEvent};
use parley_types::models::Message;

use crate::buffer::{ConversationBuffers, HolderId, Mark};
use crate::error::SendError;
use crate::options::{GatewayOptions, SendRoute};

/// A command on its way to the live connection. Socket-routed sends carry
/// an ack that fires once the frame is written.
#[derive(Debug)]
pub struct Outbound {
    pub command: ClientCommand,
    ack: Option<oneshot::Sender<()>>,
}

impl Outbound {
    fn new(command: ClientCommand) -> Self {
        Self { command, ack: None }
    }

    pub fn is_send(&self) -> bool {
        matches!(self.command, ClientCommand::SendMessage { .. })
    }

    /// The caller stopped waiting, so the frame must not be written.
    pub fn is_abandoned(&self) -> bool {
        self.ack.as_ref().is_some_and(|ack| ack.is_closed())
    }

    pub fn acknowledge(self) {
        if let Some(ack) = self.ack {
            let _ = ack.send(());
        }
    }
}

/// Consumed by the connection loop. Closes once every manager handle is
/// dropped.
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<Outbound>,
}

impl CommandReceiver {
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.rx.recv().await
    }
}

/// Owns the per-conversation live buffers and join state shared by every
/// conversation view. Cloning hands out another reference to the same
/// manager.
#[derive(Clone)]
pub struct ChannelManager {
    inner: Arc<ManagerInner>,
}

/// Handle held by the connection loop so it does not keep the manager alive.
#[derive(Clone)]
pub struct WeakChannelManager {
    inner: Weak<ManagerInner>,
}

impl WeakChannelManager {
    pub fn upgrade(&self) -> Option<ChannelManager> {
        self.inner.upgrade().map(|inner| ChannelManager { inner })
    }
}

struct ManagerInner {
    state: Mutex<ManagerState>,

    /// Ordered outbound queue drained by the connection loop
    commands: mpsc::UnboundedSender<Outbound>,

    /// Chat ids whose buffer changed
    updates: broadcast::Sender<ChatId>,

    session: SessionStore,

    /// Client rooted at the live-transport host, for the REST send route
    relay: ApiClient,

    options: GatewayOptions,
}

#[derive(Default)]
struct ManagerState {
    buffers: ConversationBuffers,

    /// Id of the live connection, if one is up
    connection: Option<Uuid>,

    /// Chats joined on the current connection
    asserted: HashSet<ChatId>,

    /// Bumped by `leave_all`; subscriptions from an older generation no
    /// longer own a join.
    generation: u64,
}

impl ChannelManager {
    pub fn new(session: SessionStore, relay: ApiClient, options: GatewayOptions) -> (Self, CommandReceiver) {
        let (commands, rx) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(256);

        let manager = Self {
            inner: Arc::new(ManagerInner {
                state: Mutex::new(ManagerState::default()),
                commands,
                updates,
                session,
                relay,
                options,
            }),
        };
        (manager, CommandReceiver { rx })
    }

    pub fn downgrade(&self) -> WeakChannelManager {
        WeakChannelManager {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.inner.options
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Change feed: one chat id per buffer change.
    pub fn updates(&self) -> broadcast::Receiver<ChatId> {
        self.inner.updates.subscribe()
    }

    /// Register interest in a chat. Every call counts as one join and
    /// re-sends the subscribe signal.
    pub fn join_chat(&self, chat_id: &str) {
        let mut state = self.lock();
        state.buffers.join(chat_id);
        self.assert_join(&mut state, chat_id);
    }

    fn assert_join(&self, state: &mut ManagerState, chat_id: &str) {
        let user_id = self.inner.session.claims().ok().map(|c| c.user_id);
        let joins = state.buffers.join_count(chat_id);
        if state.connection.is_some() {
            state.asserted.insert(chat_id.to_string());
            self.enqueue(Outbound::new(ClientCommand::JoinChat {
                chat_id: chat_id.to_string(),
                user_id,
            }));
        }
        info!("Joined chat {} ({} holders)", chat_id, joins);
    }

    /// Drop one join. The leave signal goes out only when the last holder
    /// leaves. Returns the remaining join count.
    pub fn leave_chat(&self, chat_id: &str) -> usize {
        let mut state = self.lock();
        self.leave_locked(&mut state, chat_id).unwrap_or(0)
    }

    fn leave_locked(&self, state: &mut ManagerState, chat_id: &str) -> Option<usize> {
        let Some(remaining) = state.buffers.leave(chat_id) else {
            debug!("Leave for chat {} that was not joined", chat_id);
            return None;
        };

        if remaining == 0 {
            let was_asserted = state.asserted.remove(chat_id);
            if was_asserted && state.connection.is_some() {
                self.enqueue(Outbound::new(ClientCommand::LeaveChat {
                    chat_id: chat_id.to_string(),
                }));
            }
            info!("Left chat {}", chat_id);
        }
        Some(remaining)
    }

    /// Join and return a guard that leaves again when dropped. The last
    /// guard for a chat also clears its buffer.
    ///
    /// Each guard keeps its own refetch floor, so one view clearing what
    /// its history covers never hides live entries from another view.
    pub fn subscribe(&self, chat_id: impl Into<ChatId>) -> ChatSubscription {
        let chat_id = chat_id.into();
        let mut state = self.lock();
        let holder = state.buffers.hold(&chat_id);
        self.assert_join(&mut state, &chat_id);
        let generation = state.generation;
        drop(state);

        ChatSubscription {
            manager: self.clone(),
            chat_id,
            holder,
            generation,
        }
    }

    fn release(&self, chat_id: &str, holder: HolderId, generation: u64) {
        let changed = {
            let mut state = self.lock();
            if state.generation != generation {
                debug!("Subscription to chat {} outlived its session", chat_id);
                return;
            }
            match self.leave_locked(&mut state, chat_id) {
                Some(0) => state.buffers.clear(chat_id),
                Some(_) => state.buffers.release(chat_id, holder),
                None => false,
            }
        };
        if changed {
            self.notify(chat_id);
        }
    }

    pub fn messages_for_chat(&self, chat_id: &str) -> Arc<[Message]> {
        self.lock().buffers.messages(chat_id)
    }

    pub fn clear_messages_for_chat(&self, chat_id: &str) {
        let cleared = self.lock().buffers.clear(chat_id);
        if cleared {
            self.notify(chat_id);
        }
    }

    /// Take before a history refetch; pass to [`ChannelManager::clear_through`]
    /// once the fetch succeeds.
    pub fn refetch_mark(&self, chat_id: &str) -> Mark {
        self.lock().buffers.mark(chat_id)
    }

    pub fn clear_through(&self, chat_id: &str, mark: Mark) {
        let cleared = self.lock().buffers.clear_through(chat_id, mark);
        if cleared {
            self.notify(chat_id);
        }
    }

    pub fn join_count(&self, chat_id: &str) -> usize {
        self.lock().buffers.join_count(chat_id)
    }

    /// True only for chats joined on the live connection that is up now.
    pub fn is_subscribed(&self, chat_id: &str) -> bool {
        let state = self.lock();
        state.connection.is_some() && state.asserted.contains(chat_id)
    }

    pub fn connection_id(&self) -> Option<Uuid> {
        self.lock().connection
    }

    /// Drop every join and buffer, e.g. when the session ends.
    pub fn leave_all(&self) {
        let left = {
            let mut state = self.lock();
            state.generation += 1;
            let left = state.buffers.leave_all();
            let connected = state.connection.is_some();
            for chat_id in state.asserted.drain() {
                if connected {
                    self.enqueue(Outbound::new(ClientCommand::LeaveChat { chat_id }));
                }
            }
            left
        };

        info!("Left all {} chats", left.len());
        for chat_id in &left {
            self.notify(chat_id);
        }
    }

    // -- Connection hooks --

    /// A new connection is up. Returns the joins to re-assert on it.
    pub fn on_connected(&self, conn_id: Uuid) -> Vec<ClientCommand> {
        let user_id = self.inner.session.claims().ok().map(|c| c.user_id);
        let mut state = self.lock();
        state.connection = Some(conn_id);

        let joined = state.buffers.joined();
        state.asserted = joined.iter().cloned().collect();

        joined
            .into_iter()
            .map(|chat_id| ClientCommand::JoinChat {
                chat_id,
                user_id: user_id.clone(),
            })
            .collect()
    }

    /// Forget join state for `conn_id`, unless a newer connection already
    /// took over.
    pub fn on_disconnected(&self, conn_id: Uuid) {
        let mut state = self.lock();
        if state.connection != Some(conn_id) {
            debug!("Ignoring disconnect of stale connection {}", conn_id);
            return;
        }
        state.connection = None;
        state.asserted.clear();
    }

    /// Route one server event into the buffers.
    pub fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::Message(payload) => {
                let message = Message::from(payload);
                let chat_id = message.chat_id.clone();
                let appended = self.lock().buffers.append(message);
                if appended {
                    debug!("Live message for chat {}", chat_id);
                    self.notify(&chat_id);
                } else {
                    debug!("Dropping live message for unjoined chat {}", chat_id);
                }
            }
            ServerEvent::Error(body) => {
                warn!(
                    "Server refused a command: {}",
                    body.info().or(body.message.as_deref()).unwrap_or("no detail")
                );
            }
        }
    }

    /// Post a message as the session user. Nothing is added locally; the
    /// message arrives back over the live stream.
    pub async fn send_message(
        &self,
        chat_id: &str,
        content: &str,
        guild_id: Option<&str>,
    ) -> Result<(), SendError> {
        if content.trim().is_empty() {
            return Err(SendError::Empty);
        }

        let claims = self.inner.session.claims().map_err(parley_api::ApiError::from)?;
        let timeout = self.inner.options.send_timeout;

        match self.inner.options.send_route {
            SendRoute::Rest => {
                let req = SendMessageRequest {
                    chat_id: chat_id.to_string(),
                    sender_id: claims.user_id,
                    message: content.to_string(),
                };
                let relay = messages::relay_send(&self.inner.relay, &req, guild_id, claims.token.as_deref());
                tokio::time::timeout(timeout, relay)
                    .await
                    .map_err(|_| SendError::Timeout(timeout))??;
            }
            SendRoute::Socket => {
                let (ack, written) = oneshot::channel();
                let outbound = Outbound {
                    command: ClientCommand::SendMessage {
                        chat_id: chat_id.to_string(),
                        sender_id: claims.user_id,
                        message: content.to_string(),
                        guild_id: guild_id.map(str::to_string),
                    },
                    ack: Some(ack),
                };
                self.inner
                    .commands
                    .send(outbound)
                    .map_err(|_| SendError::Closed)?;

                tokio::time::timeout(timeout, written)
                    .await
                    .map_err(|_| SendError::Timeout(timeout))?
                    .map_err(|_| SendError::Closed)?;
            }
        }

        debug!("Sent message to chat {}", chat_id);
        Ok(())
    }

    /// Credential presented when opening the live connection.
    pub fn socket_credential(&self) -> Option<String> {
        let session = &self.inner.session;
        session
            .claims()
            .ok()
            .and_then(|c| c.token)
            .or_else(|| session.token())
    }

    fn enqueue(&self, outbound: Outbound) {
        if self.inner.commands.send(outbound).is_err() {
            warn!("Connection loop is gone, dropping command");
        }
    }

    fn notify(&self, chat_id: &str) {
        let _ = self.inner.updates.send(chat_id.to_string());
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped join for one view. Dropping it leaves the chat, on every exit
/// path including unwinding.
pub struct ChatSubscription {
    manager: ChannelManager,
    chat_id: ChatId,
    holder: HolderId,
    generation: u64,
}

impl ChatSubscription {
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn manager(&self) -> &ChannelManager {
        &self.manager
    }

    /// Live entries past this subscription's floor.
    pub fn messages(&self) -> Arc<[Message]> {
        self.manager.lock().buffers.messages_for(&self.chat_id, self.holder)
    }

    pub fn refetch_mark(&self) -> Mark {
        self.manager.refetch_mark(&self.chat_id)
    }

    /// Hide everything at or before `mark` from this subscription. Entries
    /// are dropped from the shared buffer once no holder still shows them.
    pub fn clear_through(&self, mark: Mark) {
        let changed = self.manager.lock().buffers.advance(&self.chat_id, self.holder, mark);
        if changed {
            self.manager.notify(&self.chat_id);
        }
    }
}

impl Drop for ChatSubscription {
    fn drop(&mut self) {
        self.manager.release(&self.chat_id, self.holder, self.generation);
    }
}
