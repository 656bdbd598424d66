//! End-to-end hand flows against the public room API.

use rand::rngs::StdRng;
use rand::SeedableRng;

use holdem_core::game::{Chips, HandPhase, PlayerAction, UserId};
use holdem_core::room::{Blinds, Room, RoomOptions, RoomStatus, Visibility};

fn heads_up_room(seed: u64) -> Room {
    let mut room = Room::new(
        1,
        RoomOptions {
            name: "heads-up".to_string(),
            blinds: Blinds { small: 10, big: 20 },
            min_buyin: 400,
            max_seats: 6,
            visibility: Visibility::Public,
        },
        StdRng::seed_from_u64(seed),
    );
    room.add_player(1, "alice".to_string(), 1000).unwrap();
    room.add_player(2, "bob".to_string(), 1000).unwrap();
    room
}

fn total_stacks(room: &Room, users: &[UserId]) -> Chips {
    users.iter().map(|u| room.seat(*u).unwrap().stack).sum()
}

/// Call if facing a bet, otherwise check, until the hand ends.
fn check_down(room: &mut Room) {
    while room.status() == RoomStatus::Playing {
        let actor = room.current_actor().expect("someone must be up");
        let facing_bet = room.current_bet() > 0;
        let action = if facing_bet {
            PlayerAction::Call
        } else {
            PlayerAction::Check
        };
        room.process_action(actor, action, 0).unwrap();
    }
}

#[test]
fn deal_and_fold_awards_blinds_to_big_blind() {
    let mut room = heads_up_room(1);
    room.start_hand().unwrap();

    // Heads-up the dealer is the small blind and acts first pre-flop.
    let sb = room.current_actor().unwrap();
    assert!(room.seat(sb).unwrap().is_small_blind);
    assert!(room.seat(sb).unwrap().is_dealer);
    let bb = [1, 2].into_iter().find(|u| *u != sb).unwrap();

    room.process_action(sb, PlayerAction::Fold, 0).unwrap();

    let settlement = room.take_settlement().unwrap();
    assert_eq!(settlement.payouts.len(), 1);
    assert_eq!(settlement.payouts[0].user_id, bb);
    assert_eq!(settlement.payouts[0].amount, 30);

    assert_eq!(room.seat(sb).unwrap().stack, 990);
    assert_eq!(room.seat(bb).unwrap().stack, 1010);
    assert_eq!(room.status(), RoomStatus::Waiting);
    assert_eq!(room.phase(), HandPhase::Waiting);
}

#[test]
fn check_down_to_showdown_moves_only_the_blinds() {
    let mut room = heads_up_room(23);
    room.start_hand().unwrap();
    check_down(&mut room);

    let settlement = room.take_settlement().unwrap();
    let paid: Chips = settlement.payouts.iter().map(|p| p.amount).sum();
    assert_eq!(paid, 40, "pot holds exactly both completed blinds");
    assert_eq!(settlement.revealed.len(), 2);

    // The evaluator's verdict and the chips agree.
    let best = settlement
        .revealed
        .iter()
        .map(|r| &r.1)
        .max()
        .unwrap()
        .clone();
    for (user_id, rank) in &settlement.revealed {
        let won = settlement.payouts.iter().any(|p| p.user_id == *user_id);
        if *rank == best {
            assert!(won);
        }
    }
    assert_eq!(total_stacks(&room, &[1, 2]), 2000);
}

#[test]
fn raise_and_call_builds_the_pot() {
    let mut room = heads_up_room(5);
    room.start_hand().unwrap();

    let sb = room.current_actor().unwrap();
    room.process_action(sb, PlayerAction::Raise, 60).unwrap();
    let bb = room.current_actor().unwrap();
    room.process_action(bb, PlayerAction::Call, 0).unwrap();
    assert_eq!(room.phase(), HandPhase::Flop);
    assert_eq!(room.pot(), 120);

    check_down(&mut room);
    let settlement = room.take_settlement().unwrap();
    let paid: Chips = settlement.payouts.iter().map(|p| p.amount).sum();
    assert_eq!(paid, 120);
    assert_eq!(total_stacks(&room, &[1, 2]), 2000);
}

#[test]
fn both_all_in_preflop_runs_out_the_board() {
    let mut room = heads_up_room(99);
    room.start_hand().unwrap();

    let sb = room.current_actor().unwrap();
    room.process_action(sb, PlayerAction::AllIn, 0).unwrap();
    let bb = room.current_actor().unwrap();
    room.process_action(bb, PlayerAction::AllIn, 0).unwrap();

    // No further decisions: every street falls through to showdown.
    assert_eq!(room.status(), RoomStatus::Waiting);
    let settlement = room.take_settlement().unwrap();
    let paid: Chips = settlement.payouts.iter().map(|p| p.amount).sum();
    assert_eq!(paid, 2000);
    assert_eq!(total_stacks(&room, &[1, 2]), 2000);
}

#[test]
fn short_stack_all_in_leaves_two_live_seats_acting_once_per_street() {
    let mut room = Room::new(
        4,
        RoomOptions {
            min_buyin: 50,
            ..RoomOptions::default()
        },
        StdRng::seed_from_u64(8),
    );
    room.add_player(1, "a".to_string(), 1000).unwrap();
    room.add_player(2, "b".to_string(), 50).unwrap();
    room.add_player(3, "c".to_string(), 1000).unwrap();
    room.start_hand().unwrap();

    // Seats fill in join order, so the first hand's button is player 1:
    // player 2 posts the small blind, player 3 the big blind, and the
    // button opens the pre-flop action.
    assert_eq!(room.current_actor(), Some(1));
    room.process_action(1, PlayerAction::Call, 0).unwrap();
    room.process_action(2, PlayerAction::AllIn, 0).unwrap();
    room.process_action(3, PlayerAction::Call, 0).unwrap();
    assert_eq!(room.phase(), HandPhase::PreFlop);
    room.process_action(1, PlayerAction::Call, 0).unwrap();
    assert_eq!(room.phase(), HandPhase::Flop);
    assert_eq!(room.pot(), 150);

    // The all-in seat sits first clockwise from the button but cannot
    // act; each post-flop street goes to the two live seats exactly
    // once, in clockwise order.
    for expected_phase in [HandPhase::Turn, HandPhase::River, HandPhase::Waiting] {
        assert_eq!(room.current_actor(), Some(3));
        room.process_action(3, PlayerAction::Check, 0).unwrap();
        assert_eq!(room.current_actor(), Some(1));
        room.process_action(1, PlayerAction::Check, 0).unwrap();
        assert_eq!(room.phase(), expected_phase);
    }

    let settlement = room.take_settlement().unwrap();
    let paid: Chips = settlement.payouts.iter().map(|p| p.amount).sum();
    assert_eq!(paid, 150);
    assert_eq!(total_stacks(&room, &[1, 2, 3]), 2050);
}

#[test]
fn dealer_button_rotates_across_hands() {
    let mut room = heads_up_room(7);
    let mut dealers = Vec::new();
    for _ in 0..4 {
        room.start_hand().unwrap();
        dealers.push(room.dealer_seat());
        let actor = room.current_actor().unwrap();
        room.process_action(actor, PlayerAction::Fold, 0).unwrap();
    }
    assert_eq!(dealers[0], dealers[2]);
    assert_eq!(dealers[1], dealers[3]);
    assert_ne!(dealers[0], dealers[1]);
}

#[test]
fn chips_conserve_over_many_hands() {
    let mut room = Room::new(
        2,
        RoomOptions::default(),
        StdRng::seed_from_u64(1234),
    );
    for user in 1..=4 {
        room.add_player(user, format!("p{user}"), 1000).unwrap();
    }

    for _ in 0..10 {
        room.start_hand().unwrap();
        check_down(&mut room);
        room.take_settlement().unwrap();
        assert_eq!(total_stacks(&room, &[1, 2, 3, 4]), 4000);
        assert_eq!(room.status(), RoomStatus::Waiting);
    }
}

#[test]
fn seeded_rooms_replay_identical_hands() {
    let mut a = heads_up_room(321);
    let mut b = heads_up_room(321);
    a.start_hand().unwrap();
    b.start_hand().unwrap();

    for user in [1, 2] {
        assert_eq!(
            a.seat(user).unwrap().hole_cards,
            b.seat(user).unwrap().hole_cards
        );
    }

    check_down(&mut a);
    check_down(&mut b);
    assert_eq!(a.board(), b.board());
    assert_eq!(
        a.seat(1).unwrap().stack,
        b.seat(1).unwrap().stack
    );
}

#[test]
fn mid_hand_disconnect_settles_and_play_continues() {
    let mut room = Room::new(3, RoomOptions::default(), StdRng::seed_from_u64(42));
    for user in 1..=3 {
        room.add_player(user, format!("p{user}"), 1000).unwrap();
    }
    room.start_hand().unwrap();

    // Everyone sees the flop.
    while room.phase() == HandPhase::PreFlop {
        let actor = room.current_actor().unwrap();
        room.process_action(actor, PlayerAction::Call, 0).unwrap();
    }
    assert_eq!(room.phase(), HandPhase::Flop);

    let leaver = room.current_actor().unwrap();
    let outcome = room.remove_player(leaver).unwrap();
    assert!(outcome.hand_ended);
    assert_eq!(outcome.refunded, 980);

    let settlement = room.take_settlement().unwrap();
    let paid: Chips = settlement.payouts.iter().map(|p| p.amount).sum();
    assert_eq!(paid, 60);
    assert!(settlement.payouts.iter().all(|p| p.user_id != leaver));

    // The table seats two and can deal again.
    assert_eq!(room.player_count(), 2);
    room.start_hand().unwrap();
    assert_eq!(room.status(), RoomStatus::Playing);
}
