//! Game service: routes decoded client messages to the owning room,
//! fans fresh snapshots out through the hub, settles chips against the
//! store, and runs the per-room turn clock.
//!
//! Room mutations happen on the calling task under the room's lock; the
//! lock is never held across a store call or a hub send.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

use holdem_core::db::ChipStore;
use holdem_core::game::{PlayerAction, UserId};
use holdem_core::net::{ClientMessage, HubHandle, RejectReason, RevealedHand, ServerMessage};
use holdem_core::room::{HandSettlement, RoomId, RoomRegistry, SharedRoom};

pub struct GameService {
    rooms: Arc<RoomRegistry>,
    hub: HubHandle,
    store: Option<ChipStore>,
    turn_clock: Duration,
    /// user -> room they are seated in; rooms hold at most one seat per
    /// user and users sit at one table at a time.
    seated: Mutex<HashMap<UserId, RoomId>>,
    /// Monotonic per-room epochs; a pending turn timer only fires if no
    /// newer room activity bumped the epoch.
    turn_epochs: Mutex<HashMap<RoomId, Arc<AtomicU64>>>,
}

impl GameService {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        hub: HubHandle,
        store: Option<ChipStore>,
        turn_clock: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            rooms,
            hub,
            store,
            turn_clock,
            seated: Mutex::new(HashMap::new()),
            turn_epochs: Mutex::new(HashMap::new()),
        })
    }

    /// Entry point for every decoded frame from a client's reader.
    pub async fn handle_message(self: &Arc<Self>, user_id: UserId, message: ClientMessage) {
        match message {
            ClientMessage::Ping => {
                self.hub
                    .send_to_user(user_id, ServerMessage::Pong(unix_now()))
                    .await;
            }
            ClientMessage::GameAction {
                room_id,
                action,
                amount,
            } => self.game_action(user_id, room_id, action, amount).await,
            ClientMessage::JoinRoom { room_id, buy_in } => {
                self.join_room(user_id, room_id, buy_in).await;
            }
            ClientMessage::LeaveRoom { room_id } => self.leave_room(user_id, room_id).await,
            ClientMessage::StartHand { room_id } => self.start_hand(user_id, room_id).await,
        }
    }

    /// A dropped connection folds and unseats its player, ending the
    /// hand for the table if the seat was live.
    pub async fn handle_disconnect(self: &Arc<Self>, user_id: UserId) {
        let room_id = self.seated.lock().await.get(&user_id).copied();
        if let Some(room_id) = room_id {
            tracing::info!(user_id, room_id, "connection lost; removing player");
            self.leave_room(user_id, room_id).await;
        }
    }

    async fn game_action(
        self: &Arc<Self>,
        user_id: UserId,
        room_id: RoomId,
        action: PlayerAction,
        amount: u32,
    ) {
        let Some(room) = self.rooms.get(room_id).await else {
            self.reject_unknown_room(user_id, room_id).await;
            return;
        };
        let (result, settlement) = {
            let mut room = room.lock().await;
            let result = room.process_action(user_id, action, amount);
            let settlement = room.take_settlement();
            (result, settlement)
        };
        match result {
            Ok(()) => {
                self.after_mutation(room_id, &room, settlement).await;
            }
            Err(error) => {
                self.hub
                    .send_to_user(user_id, ServerMessage::rejection(&error))
                    .await;
            }
        }
    }

    async fn join_room(self: &Arc<Self>, user_id: UserId, room_id: RoomId, buy_in: u32) {
        let Some(room) = self.rooms.get(room_id).await else {
            self.reject_unknown_room(user_id, room_id).await;
            return;
        };

        // Pull the buy-in out of the stored balance first; a failed seat
        // claim credits it straight back.
        if let Some(store) = &self.store {
            if let Err(error) = store.debit(user_id, buy_in).await {
                tracing::warn!(user_id, %error, "buy-in debit refused");
                self.hub
                    .send_to_user(
                        user_id,
                        ServerMessage::ActionRejected {
                            reason: RejectReason::PreconditionFailed,
                            detail: error.to_string(),
                        },
                    )
                    .await;
                return;
            }
        }

        let display_name = format!("player-{user_id}");
        let result = {
            let mut room = room.lock().await;
            room.add_player(user_id, display_name, buy_in)
        };
        match result {
            Ok(()) => {
                self.seated.lock().await.insert(user_id, room_id);
                self.after_mutation(room_id, &room, None).await;
            }
            Err(error) => {
                if let Some(store) = &self.store {
                    if let Err(refund_error) = store.credit(user_id, buy_in).await {
                        tracing::error!(user_id, %refund_error, "buy-in refund failed");
                    }
                }
                self.hub
                    .send_to_user(user_id, ServerMessage::rejection(&error))
                    .await;
            }
        }
    }

    async fn leave_room(self: &Arc<Self>, user_id: UserId, room_id: RoomId) {
        let Some(room) = self.rooms.get(room_id).await else {
            self.seated.lock().await.remove(&user_id);
            return;
        };
        let (result, settlement) = {
            let mut room = room.lock().await;
            let result = room.remove_player(user_id);
            let settlement = room.take_settlement();
            (result, settlement)
        };
        match result {
            Ok(outcome) => {
                self.seated.lock().await.remove(&user_id);
                if let Some(store) = &self.store {
                    if let Err(error) = store.credit(user_id, outcome.refunded).await {
                        tracing::error!(user_id, %error, "stack write-back failed");
                    }
                }
                self.after_mutation(room_id, &room, settlement).await;
            }
            Err(error) => {
                self.hub
                    .send_to_user(user_id, ServerMessage::rejection(&error))
                    .await;
            }
        }
    }

    async fn start_hand(self: &Arc<Self>, user_id: UserId, room_id: RoomId) {
        let Some(room) = self.rooms.get(room_id).await else {
            self.reject_unknown_room(user_id, room_id).await;
            return;
        };
        let result = room.lock().await.start_hand();
        match result {
            Ok(()) => self.after_mutation(room_id, &room, None).await,
            Err(error) => {
                self.hub
                    .send_to_user(user_id, ServerMessage::rejection(&error))
                    .await;
            }
        }
    }

    /// Post-mutation fan-out: per-viewer snapshots to every seated user,
    /// settlement persistence and result broadcast when a hand ended,
    /// and a fresh turn timer.
    async fn after_mutation(
        self: &Arc<Self>,
        room_id: RoomId,
        room: &SharedRoom,
        settlement: Option<HandSettlement>,
    ) {
        let snapshots: Vec<(UserId, ServerMessage)> = {
            let room = room.lock().await;
            room.seated_users()
                .into_iter()
                .map(|viewer| {
                    (
                        viewer,
                        ServerMessage::RoomSnapshot(room.snapshot_for(viewer)),
                    )
                })
                .collect()
        };
        for (viewer, snapshot) in snapshots {
            self.hub.send_to_user(viewer, snapshot).await;
        }

        if let Some(settlement) = settlement {
            self.persist_settlement(&settlement).await;
            let result = ServerMessage::HandResult {
                room_id,
                hand_id: settlement.hand_id,
                payouts: settlement.payouts,
                revealed: settlement
                    .revealed
                    .into_iter()
                    .map(|(user_id, rank)| RevealedHand { user_id, rank })
                    .collect(),
            };
            self.hub.send_to_room(room_id, result).await;
        }

        self.arm_turn_clock(room_id, room).await;
    }

    async fn persist_settlement(&self, settlement: &HandSettlement) {
        let Some(store) = &self.store else {
            return;
        };
        for payout in &settlement.payouts {
            match store
                .record_settlement(settlement.hand_id, payout.user_id, payout.amount as i64)
                .await
            {
                Ok(_applied) => {}
                Err(error) => {
                    tracing::error!(
                        hand_id = %settlement.hand_id,
                        user_id = payout.user_id,
                        %error,
                        "settlement write failed"
                    );
                }
            }
        }
        for &user_id in &settlement.participants {
            let won = settlement.payouts.iter().any(|p| p.user_id == user_id);
            if let Err(error) = store.record_hand_played(user_id, won).await {
                tracing::warn!(user_id, %error, "hand counter update failed");
            }
        }
    }

    /// Start (or restart) the turn timer for whoever is now up. Any
    /// earlier pending timer for this room is invalidated by the epoch
    /// bump, including when nobody is to act.
    async fn arm_turn_clock(self: &Arc<Self>, room_id: RoomId, room: &SharedRoom) {
        let epoch_counter = {
            let mut epochs = self.turn_epochs.lock().await;
            epochs.entry(room_id).or_default().clone()
        };
        let epoch = epoch_counter.fetch_add(1, Ordering::SeqCst) + 1;

        let actor = room.lock().await.current_actor();
        let Some(actor) = actor else {
            return;
        };

        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(service.turn_clock).await;
            if epoch_counter.load(Ordering::SeqCst) != epoch {
                return;
            }
            service.force_timeout_action(room_id, actor).await;
        });
    }

    /// The to-act seat ran out its clock: check when legal, fold
    /// otherwise.
    ///
    /// Boxed because this call participates in a recursive cycle
    /// (force_timeout_action -> after_mutation -> arm_turn_clock ->
    /// force_timeout_action) that the compiler cannot otherwise size or
    /// prove `Send` for.
    fn force_timeout_action(
        self: &Arc<Self>,
        room_id: RoomId,
        actor: UserId,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let Some(room) = self.rooms.get(room_id).await else {
                return;
            };
            let (result, settlement) = {
                let mut room = room.lock().await;
                if room.current_actor() != Some(actor) {
                    return;
                }
                let action = if room.current_bet() == 0 {
                    PlayerAction::Check
                } else {
                    PlayerAction::Fold
                };
                tracing::info!(room_id, user_id = actor, ?action, "turn clock expired");
                let result = room.process_action(actor, action, 0);
                let settlement = room.take_settlement();
                (result, settlement)
            };
            if let Err(error) = result {
                tracing::warn!(room_id, user_id = actor, %error, "synthetic action rejected");
                return;
            }
            self.after_mutation(room_id, &room, settlement).await;
        })
    }

    async fn reject_unknown_room(&self, user_id: UserId, room_id: RoomId) {
        self.hub
            .send_to_user(
                user_id,
                ServerMessage::ActionRejected {
                    reason: RejectReason::PreconditionFailed,
                    detail: format!("room {room_id} does not exist"),
                },
            )
            .await;
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
