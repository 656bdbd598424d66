//! Connection hub: a single coordinator task that owns the client table.
//!
//! All mutations of the clients set and the user index flow through the
//! hub's mailbox, so no lock guards them. Each client has a bounded send
//! queue; the per-connection writer drains it. A queue that fills up
//! during a broadcast marks its client a slow consumer and the hub
//! unregisters it, which closes the queue and tears the connection down.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::game::UserId;
use crate::room::{RoomId, RoomRegistry};

use super::messages::ServerMessage;

/// Per-client outbound queue depth. Filling it is the back-pressure
/// escape valve: the client is disconnected rather than stalling peers.
pub const SEND_QUEUE_CAPACITY: usize = 256;

const MAILBOX_CAPACITY: usize = 1024;

/// Hub-side record of one connection.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    pub client_id: Uuid,
    pub user_id: UserId,
    sender: mpsc::Sender<ServerMessage>,
}

impl ClientHandle {
    /// Build the handle plus the receiving half of its send queue; the
    /// connection's writer task owns the receiver.
    pub fn new(user_id: UserId) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (sender, receiver) = mpsc::channel(SEND_QUEUE_CAPACITY);
        (
            Self {
                client_id: Uuid::new_v4(),
                user_id,
                sender,
            },
            receiver,
        )
    }
}

#[derive(Debug)]
enum HubCommand {
    Register(ClientHandle),
    Unregister(Uuid),
    Broadcast(ServerMessage),
    SendToUser(UserId, ServerMessage),
    SendToRoom(RoomId, ServerMessage),
}

/// Cloneable handle for submitting commands to the hub coordinator.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn register(&self, client: ClientHandle) {
        self.submit(HubCommand::Register(client)).await;
    }

    pub async fn unregister(&self, client_id: Uuid) {
        self.submit(HubCommand::Unregister(client_id)).await;
    }

    pub async fn broadcast(&self, message: ServerMessage) {
        self.submit(HubCommand::Broadcast(message)).await;
    }

    pub async fn send_to_user(&self, user_id: UserId, message: ServerMessage) {
        self.submit(HubCommand::SendToUser(user_id, message)).await;
    }

    pub async fn send_to_room(&self, room_id: RoomId, message: ServerMessage) {
        self.submit(HubCommand::SendToRoom(room_id, message)).await;
    }

    async fn submit(&self, command: HubCommand) {
        if self.commands.send(command).await.is_err() {
            tracing::warn!("hub coordinator is gone; dropping command");
        }
    }
}

pub struct Hub {
    clients: HashMap<Uuid, ClientHandle>,
    by_user: HashMap<UserId, Uuid>,
    inbox: mpsc::Receiver<HubCommand>,
    rooms: Arc<RoomRegistry>,
}

impl Hub {
    pub fn new(rooms: Arc<RoomRegistry>) -> (Self, HubHandle) {
        let (commands, inbox) = mpsc::channel(MAILBOX_CAPACITY);
        (
            Self {
                clients: HashMap::new(),
                by_user: HashMap::new(),
                inbox,
                rooms,
            },
            HubHandle { commands },
        )
    }

    /// Coordinator loop. Runs until every `HubHandle` is dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.inbox.recv().await {
            match command {
                HubCommand::Register(client) => self.register(client),
                HubCommand::Unregister(client_id) => self.unregister(client_id),
                HubCommand::Broadcast(message) => self.broadcast(message),
                HubCommand::SendToUser(user_id, message) => self.send_to_user(user_id, message),
                HubCommand::SendToRoom(room_id, message) => {
                    self.send_to_room(room_id, message).await;
                }
            }
        }
        tracing::debug!("hub coordinator stopped");
    }

    /// Insert a client, evicting any earlier connection for the same
    /// user: the latest registration wins.
    fn register(&mut self, client: ClientHandle) {
        if let Some(previous) = self.by_user.insert(client.user_id, client.client_id) {
            tracing::info!(
                user_id = client.user_id,
                "evicting superseded connection for user"
            );
            self.clients.remove(&previous);
        }
        let hello = ServerMessage::Connected {
            client_id: client.client_id,
            user_id: client.user_id,
        };
        if client.sender.try_send(hello).is_err() {
            tracing::warn!(user_id = client.user_id, "hello undeliverable at register");
        }
        tracing::info!(
            client_id = %client.client_id,
            user_id = client.user_id,
            "client connected"
        );
        self.clients.insert(client.client_id, client);
    }

    /// Idempotent removal; dropping the handle closes the send queue,
    /// which is what stops the connection's writer.
    fn unregister(&mut self, client_id: Uuid) {
        if let Some(client) = self.clients.remove(&client_id) {
            if self.by_user.get(&client.user_id) == Some(&client_id) {
                self.by_user.remove(&client.user_id);
            }
            tracing::info!(
                client_id = %client_id,
                user_id = client.user_id,
                "client disconnected"
            );
        }
    }

    fn broadcast(&mut self, message: ServerMessage) {
        let mut slow: Vec<Uuid> = Vec::new();
        for client in self.clients.values() {
            match client.sender.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        client_id = %client.client_id,
                        "send queue full during broadcast; disconnecting slow consumer"
                    );
                    slow.push(client.client_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => slow.push(client.client_id),
            }
        }
        for client_id in slow {
            self.unregister(client_id);
        }
    }

    fn send_to_user(&mut self, user_id: UserId, message: ServerMessage) {
        let Some(client_id) = self.by_user.get(&user_id).copied() else {
            return;
        };
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };
        match client.sender.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id, "send queue full; dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => self.unregister(client_id),
        }
    }

    async fn send_to_room(&mut self, room_id: RoomId, message: ServerMessage) {
        for user_id in self.rooms.seated_users(room_id).await {
            self.send_to_user(user_id, message.clone());
        }
    }
}
