//! The authoritative per-table aggregate.
//!
//! A room owns its seats, deck, board, pot, betting round, and hand state
//! machine as one consistency unit. The registry hands rooms out behind
//! an exclusive async lock; every method here is synchronous and never
//! suspends, so callers hold the lock only for the duration of the call.

use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::game::{
    ActionError, BettingRound, Card, Chips, Deck, DeckError, GameEvent, HandPhase, HandRank,
    PhaseMachine, PlayerAction, RoundEntrant, RoundEvent, TransitionError, UserId,
};

use super::seat::{Seat, SeatStatus};
use super::settlement::{settle, Contender, Payout};
use super::snapshot::{RoomSnapshot, SeatView};

pub type RoomId = i64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Closed,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.small, self.big)
    }
}

#[derive(Clone, Debug)]
pub struct RoomOptions {
    pub name: String,
    pub blinds: Blinds,
    pub min_buyin: Chips,
    pub max_seats: usize,
    pub visibility: Visibility,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            name: "table".to_string(),
            blinds: Blinds { small: 10, big: 20 },
            min_buyin: 400,
            max_seats: 6,
            visibility: Visibility::Public,
        }
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum RoomError {
    #[error("room is full")]
    RoomFull,
    #[error("already seated at this table")]
    AlreadySeated,
    #[error("buy-in below the table minimum of {min}")]
    BelowMinBuyin { min: Chips },
    #[error("no seat available")]
    NoSeatAvailable,
    #[error("not seated at this table")]
    NotSeated,
    #[error("need at least 2 players to start a hand")]
    NotEnoughPlayers,
    #[error("a hand is already in progress")]
    HandInProgress,
    #[error("no hand is running")]
    NotPlaying,
    #[error("no betting round is active")]
    NoBettingRound,
    #[error("room is closed")]
    RoomClosed,
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("state entry failed, hand aborted: {0}")]
    HandAborted(String),
}

/// What a hand paid out, recorded at settlement for chip write-back and
/// result broadcasts. Write-back is idempotent by (hand_id, user_id).
#[derive(Clone, Debug)]
pub struct HandSettlement {
    pub hand_id: Uuid,
    /// Everyone who contributed to or contested this hand.
    pub participants: Vec<UserId>,
    pub payouts: Vec<Payout>,
    pub revealed: Vec<(UserId, HandRank)>,
}

#[derive(Clone, Debug)]
pub struct RemoveOutcome {
    /// Chips the player takes away from the table.
    pub refunded: Chips,
    /// Removing the player ended a running hand.
    pub hand_ended: bool,
}

pub struct Room {
    id: RoomId,
    name: String,
    blinds: Blinds,
    min_buyin: Chips,
    max_seats: usize,
    visibility: Visibility,
    status: RoomStatus,
    seats: HashMap<UserId, Seat>,
    board: Vec<Card>,
    pot: Chips,
    dealer_seat: usize,
    deck: Deck,
    machine: PhaseMachine,
    round: Option<BettingRound>,
    hand_id: Option<Uuid>,
    hand_log: Vec<String>,
    rng: StdRng,
    settlement: Option<HandSettlement>,
    /// Contributions of players who left mid-hand after folding. Their
    /// chips stay in the pot as dead money until settlement.
    departed: Vec<(UserId, Chips)>,
}

impl Room {
    pub fn new(id: RoomId, options: RoomOptions, rng: StdRng) -> Self {
        Self {
            id,
            name: options.name,
            blinds: options.blinds,
            min_buyin: options.min_buyin,
            max_seats: options.max_seats.clamp(2, 10),
            visibility: options.visibility,
            status: RoomStatus::Waiting,
            seats: HashMap::new(),
            board: Vec::with_capacity(5),
            pot: 0,
            dealer_seat: 0,
            deck: Deck::new(),
            machine: PhaseMachine::new(),
            round: None,
            hand_id: None,
            hand_log: Vec::new(),
            rng,
            settlement: None,
            departed: Vec::new(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn phase(&self) -> HandPhase {
        self.machine.current()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn blinds(&self) -> Blinds {
        self.blinds
    }

    pub fn pot(&self) -> Chips {
        self.pot
    }

    pub fn board(&self) -> &[Card] {
        &self.board
    }

    pub fn hand_id(&self) -> Option<Uuid> {
        self.hand_id
    }

    pub fn hand_log(&self) -> &[String] {
        &self.hand_log
    }

    pub fn dealer_seat(&self) -> usize {
        self.dealer_seat
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn seat(&self, user_id: UserId) -> Option<&Seat> {
        self.seats.get(&user_id)
    }

    /// Seated user ids in seat order.
    pub fn seated_users(&self) -> Vec<UserId> {
        let mut seats: Vec<&Seat> = self.seats.values().collect();
        seats.sort_unstable_by_key(|s| s.seat_index);
        seats.iter().map(|s| s.user_id).collect()
    }

    /// The seat whose action the table is waiting on.
    pub fn current_actor(&self) -> Option<UserId> {
        self.round.as_ref().and_then(|r| r.current_player())
    }

    pub fn current_bet(&self) -> Chips {
        self.round.as_ref().map_or(0, |r| r.current_bet())
    }

    /// Consume the settlement of the hand that just finished, if any.
    pub fn take_settlement(&mut self) -> Option<HandSettlement> {
        self.settlement.take()
    }

    pub fn add_player(
        &mut self,
        user_id: UserId,
        display_name: String,
        buyin: Chips,
    ) -> Result<(), RoomError> {
        if self.status == RoomStatus::Closed {
            return Err(RoomError::RoomClosed);
        }
        if self.seats.len() >= self.max_seats {
            return Err(RoomError::RoomFull);
        }
        if self.seats.contains_key(&user_id) {
            return Err(RoomError::AlreadySeated);
        }
        if buyin < self.min_buyin {
            return Err(RoomError::BelowMinBuyin {
                min: self.min_buyin,
            });
        }
        let seat_index = self
            .free_seat_index()
            .ok_or(RoomError::NoSeatAvailable)?;

        let mut seat = Seat::new(user_id, display_name, buyin, seat_index);
        if self.status == RoomStatus::Playing {
            seat.status = SeatStatus::Waiting;
        }
        self.seats.insert(user_id, seat);
        Ok(())
    }

    /// Remove a player, auto-folding them first when a hand is live. A
    /// live seat leaving ends the hand and settles the pot.
    pub fn remove_player(&mut self, user_id: UserId) -> Result<RemoveOutcome, RoomError> {
        let seat = self.seats.get_mut(&user_id).ok_or(RoomError::NotSeated)?;

        let mut hand_ended = false;
        if self.status == RoomStatus::Playing && seat.in_hand() {
            seat.status = SeatStatus::Folded;
            seat.last_action = Some(PlayerAction::Fold);
            if let Some(round) = &mut self.round {
                round.mark_folded(user_id);
            }
            self.log(format!("player {user_id} left mid-hand, auto-folded"));
            self.fire(GameEvent::PlayerLeft)?;
            hand_ended = true;
        }

        let seat = self
            .seats
            .remove(&user_id)
            .ok_or(RoomError::NotSeated)?;
        if self.status == RoomStatus::Playing && seat.hand_contribution > 0 {
            // A folded seat leaving does not end the hand; its chips
            // remain in the pot as dead money.
            self.departed.push((user_id, seat.hand_contribution));
        }
        if self.seats.is_empty() {
            self.machine.reset();
            self.round = None;
            self.board.clear();
            self.pot = 0;
            if self.status != RoomStatus::Closed {
                self.status = RoomStatus::Waiting;
            }
        }
        Ok(RemoveOutcome {
            refunded: seat.stack,
            hand_ended,
        })
    }

    /// Deal a fresh hand: new deck, new hand id, blinds posted, hole
    /// cards out, pre-flop betting open.
    pub fn start_hand(&mut self) -> Result<(), RoomError> {
        if self.status == RoomStatus::Closed {
            return Err(RoomError::RoomClosed);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::HandInProgress);
        }
        if self.seats.len() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }

        let hand_id = Uuid::new_v4();
        self.hand_id = Some(hand_id);
        self.hand_log.clear();
        self.settlement = None;
        self.departed.clear();
        self.board.clear();
        self.pot = 0;
        self.deck = Deck::new();
        self.deck.shuffle(&mut self.rng);
        for seat in self.seats.values_mut() {
            seat.reset_for_hand();
        }

        // The button must sit on an occupied seat.
        if !self.seats.values().any(|s| s.seat_index == self.dealer_seat) {
            self.dealer_seat = self.next_occupied_after(self.dealer_seat);
        }

        // Heads-up, the dealer posts the small blind and the other seat
        // the big blind; otherwise blinds go to the two seats after the
        // button.
        let (sb_index, bb_index) = if self.seats.len() == 2 {
            (self.dealer_seat, self.next_occupied_after(self.dealer_seat))
        } else {
            let sb = self.next_occupied_after(self.dealer_seat);
            (sb, self.next_occupied_after(sb))
        };

        if let Some(seat) = self.seat_at_mut(self.dealer_seat) {
            seat.is_dealer = true;
        }
        let small = self.blinds.small;
        let big = self.blinds.big;
        self.post_blind(sb_index, small, false);
        self.post_blind(bb_index, big, true);
        self.log(format!(
            "hand {hand_id} started, blinds {} posted",
            self.blinds
        ));

        self.status = RoomStatus::Playing;
        self.fire(GameEvent::StartGame)
    }

    /// Forward a player action to the active betting round and advance
    /// the hand if the street closes. Rejected actions mutate nothing.
    pub fn process_action(
        &mut self,
        user_id: UserId,
        action: PlayerAction,
        amount: Chips,
    ) -> Result<(), RoomError> {
        match self.status {
            RoomStatus::Closed => return Err(RoomError::RoomClosed),
            RoomStatus::Waiting => return Err(RoomError::NotPlaying),
            RoomStatus::Playing => {}
        }
        let stack = self
            .seats
            .get(&user_id)
            .ok_or(RoomError::NotSeated)?
            .stack;
        let round = self.round.as_mut().ok_or(RoomError::NoBettingRound)?;
        let outcome = round.process_action(user_id, action, amount, stack)?;

        let seat = self
            .seats
            .get_mut(&user_id)
            .ok_or(RoomError::NotSeated)?;
        seat.commit(outcome.chips);
        seat.last_action = Some(action);
        if action == PlayerAction::Fold {
            seat.status = SeatStatus::Folded;
        } else if outcome.went_all_in {
            seat.status = SeatStatus::AllIn;
        }
        self.pot += outcome.chips;
        self.log(format!("player {user_id} {action:?} {}", outcome.chips));

        if let Some(event) = outcome.event {
            self.fire(event.into())?;
        }
        Ok(())
    }

    /// Per-viewer fan-out record. Only the viewer's own hole cards are
    /// included.
    pub fn snapshot_for(&self, viewer: UserId) -> RoomSnapshot {
        let mut seats: Vec<SeatView> = self
            .seats
            .values()
            .map(|seat| SeatView::for_viewer(seat, viewer))
            .collect();
        seats.sort_unstable_by_key(|s| s.seat_index);

        RoomSnapshot {
            room_id: self.id,
            name: self.name.clone(),
            status: self.status,
            phase: self.machine.current(),
            hand_id: self.hand_id,
            blinds: self.blinds,
            board: self.board.clone(),
            pot: self.pot,
            dealer_seat: self.dealer_seat,
            to_act: self.current_actor(),
            seats,
        }
    }

    /// Collapse any running hand and refuse all further play. Used when
    /// the registry tears the room down.
    pub fn close(&mut self) {
        if self.status == RoomStatus::Playing {
            self.abort_hand();
        }
        self.status = RoomStatus::Closed;
        self.machine.reset();
        self.round = None;
    }

    fn free_seat_index(&self) -> Option<usize> {
        (0..self.max_seats).find(|i| !self.seats.values().any(|s| s.seat_index == *i))
    }

    fn seat_at(&self, index: usize) -> Option<&Seat> {
        self.seats.values().find(|s| s.seat_index == index)
    }

    fn seat_at_mut(&mut self, index: usize) -> Option<&mut Seat> {
        self.seats.values_mut().find(|s| s.seat_index == index)
    }

    /// Next occupied seat index clockwise, excluding `from` itself.
    fn next_occupied_after(&self, from: usize) -> usize {
        for step in 1..=self.max_seats {
            let index = (from + step) % self.max_seats;
            if self.seat_at(index).is_some() {
                return index;
            }
        }
        from
    }

    /// Next seat clockwise from `from` that is still contesting the
    /// hand, excluding `from` itself.
    fn next_in_hand_after(&self, from: usize) -> Option<usize> {
        (1..=self.max_seats).find_map(|step| {
            let index = (from + step) % self.max_seats;
            self.seat_at(index)
                .filter(|s| s.in_hand())
                .map(|s| s.seat_index)
        })
    }

    /// In-hand user ids clockwise starting at seat index `start`.
    fn in_hand_from(&self, start: usize) -> Vec<UserId> {
        let mut users = Vec::with_capacity(self.seats.len());
        for step in 0..self.max_seats {
            let index = (start + step) % self.max_seats;
            if let Some(seat) = self.seat_at(index) {
                if seat.in_hand() {
                    users.push(seat.user_id);
                }
            }
        }
        users
    }

    fn post_blind(&mut self, seat_index: usize, amount: Chips, big: bool) {
        let pot = &mut self.pot;
        if let Some(seat) = self
            .seats
            .values_mut()
            .find(|s| s.seat_index == seat_index)
        {
            let posted = amount.min(seat.stack);
            seat.commit(posted);
            if seat.stack == 0 {
                seat.status = SeatStatus::AllIn;
            }
            if big {
                seat.is_big_blind = true;
            } else {
                seat.is_small_blind = true;
            }
            *pot += posted;
        }
    }

    fn log(&mut self, entry: String) {
        tracing::debug!(room_id = self.id, "{entry}");
        self.hand_log.push(entry);
    }

    /// Drive the state machine through `event` and any follow-up events
    /// produced by state entry. A failed entry reverts the transition and
    /// aborts the hand: deck errors here mean the room dealt more cards
    /// than a 52-card hand can need, which is unrecoverable mid-hand.
    fn fire(&mut self, event: GameEvent) -> Result<(), RoomError> {
        let mut pending = Some(event);
        while let Some(ev) = pending.take() {
            let prior = self.machine.current();
            let entered = self.machine.apply(ev)?;
            match self.enter_phase(entered) {
                Ok(follow_up) => pending = follow_up,
                Err(e) => {
                    self.machine.revert(prior);
                    self.abort_hand();
                    return Err(RoomError::HandAborted(e.to_string()));
                }
            }
        }
        if self.status == RoomStatus::Playing {
            let contributed: Chips = self.seats.values().map(|s| s.hand_contribution).sum();
            let dead: Chips = self.departed.iter().map(|(_, chips)| chips).sum();
            debug_assert_eq!(
                self.pot,
                contributed + dead,
                "pot must equal the sum of seat contributions"
            );
        }
        Ok(())
    }

    fn enter_phase(&mut self, phase: HandPhase) -> Result<Option<GameEvent>, DeckError> {
        match phase {
            HandPhase::Waiting => Ok(None),
            HandPhase::PreFlop => self.enter_pre_flop(),
            HandPhase::Flop => self.enter_street(3),
            HandPhase::Turn | HandPhase::River => self.enter_street(1),
            HandPhase::Showdown => Ok(Some(GameEvent::DetermineWinner)),
            HandPhase::End => {
                self.settle_hand();
                Ok(Some(GameEvent::NextRound))
            }
        }
    }

    fn enter_pre_flop(&mut self) -> Result<Option<GameEvent>, DeckError> {
        // Two hole cards each, dealt one at a time around the table
        // starting left of the button.
        let order = self.in_hand_from((self.dealer_seat + 1) % self.max_seats);
        for _ in 0..2 {
            for user_id in &order {
                let card = self.deck.deal()?;
                if let Some(seat) = self.seats.get_mut(user_id) {
                    seat.hole_cards.push(card);
                }
            }
        }

        // First to act sits left of the big blind; heads-up that is the
        // small blind, who is also the dealer.
        let bb_index = self
            .seats
            .values()
            .find(|s| s.is_big_blind)
            .map(|s| s.seat_index)
            .unwrap_or(self.dealer_seat);
        Ok(self.open_round(bb_index, self.blinds.big))
    }

    fn enter_street(&mut self, cards: usize) -> Result<Option<GameEvent>, DeckError> {
        self.deck.burn()?;
        for _ in 0..cards {
            let card = self.deck.deal()?;
            self.board.push(card);
        }
        for seat in self.seats.values_mut() {
            if seat.in_hand() {
                seat.open_street();
            }
        }
        Ok(self.open_round(self.dealer_seat, 0))
    }

    /// Open a betting round whose first actor is the next in-hand seat
    /// after `after_index`, then fall through immediately if nobody can
    /// act (for instance when every remaining player is all-in).
    fn open_round(&mut self, after_index: usize, opening_bet: Chips) -> Option<GameEvent> {
        let start = match self.next_in_hand_after(after_index) {
            Some(index) => index,
            None => return Some(GameEvent::ShowCards),
        };
        let entrants: Vec<RoundEntrant> = self
            .in_hand_from(start)
            .into_iter()
            .map(|user_id| {
                let seat = &self.seats[&user_id];
                RoundEntrant {
                    user_id,
                    posted: seat.street_contribution,
                    all_in: seat.status == SeatStatus::AllIn,
                }
            })
            .collect();
        let mut round = BettingRound::new(entrants, opening_bet);
        let event = round.close_if_settled();
        self.round = Some(round);
        event.map(GameEvent::from)
    }

    /// Award the pot and park the table back in Waiting.
    fn settle_hand(&mut self) {
        let mut contenders: Vec<Contender> = self
            .seats
            .values()
            .filter(|s| s.hand_contribution > 0 || s.in_hand())
            .map(|s| Contender::from_seat(s, &self.board, self.button_distance(s.seat_index)))
            .collect();
        // Dead money from players who already left joins the sweep as
        // folded stakes.
        for &(user_id, contributed) in &self.departed {
            contenders.push(Contender {
                user_id,
                contributed,
                eligible: false,
                cards: Vec::new(),
                button_distance: self.max_seats + 1,
            });
        }
        let result = settle(&contenders);
        for payout in &result.payouts {
            if let Some(seat) = self.seats.get_mut(&payout.user_id) {
                seat.stack += payout.amount;
            }
        }
        for payout in &result.payouts {
            self.log(format!(
                "player {} wins {} chips",
                payout.user_id, payout.amount
            ));
        }
        if let Some(hand_id) = self.hand_id {
            self.settlement = Some(HandSettlement {
                hand_id,
                participants: contenders.iter().map(|c| c.user_id).collect(),
                payouts: result.payouts,
                revealed: result.revealed,
            });
        }

        self.pot = 0;
        self.round = None;
        self.departed.clear();
        self.dealer_seat = self.next_occupied_after(self.dealer_seat);
        for seat in self.seats.values_mut() {
            seat.status = SeatStatus::Sitting;
        }
        if self.status != RoomStatus::Closed {
            self.status = RoomStatus::Waiting;
        }
    }

    /// Abandon the hand without awarding the pot: contributions return
    /// to their stacks and the machine collapses to Waiting.
    fn abort_hand(&mut self) {
        for seat in self.seats.values_mut() {
            seat.stack += seat.hand_contribution;
            seat.hand_contribution = 0;
            seat.street_contribution = 0;
            seat.status = SeatStatus::Sitting;
        }
        self.pot = 0;
        self.board.clear();
        self.round = None;
        self.departed.clear();
        self.machine.reset();
        if self.status != RoomStatus::Closed {
            self.status = RoomStatus::Waiting;
        }
        self.log("hand aborted".to_string());
    }

    /// Clockwise distance from the dealer; the seat directly after the
    /// button is 1, the button itself last.
    fn button_distance(&self, seat_index: usize) -> usize {
        ((seat_index + self.max_seats - self.dealer_seat - 1) % self.max_seats) + 1
    }
}

impl From<RoundEvent> for GameEvent {
    fn from(event: RoundEvent) -> Self {
        match event {
            RoundEvent::BettingComplete => GameEvent::BettingComplete,
            RoundEvent::ShowCards => GameEvent::ShowCards,
        }
    }
}
