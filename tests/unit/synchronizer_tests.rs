//! Unit tests for the game synchronizer against a recording channel

use std::sync::Arc;

use duet::{
    ChannelMessage, DuetError, GameState, GameSynchronizer, Marker, MoveOutcome,
    OriginationPolicy, ParticipantId, Phase, Square, Winner,
};
use duet::game::MoveRejection;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::mocks::RecordingChannel;

fn id(value: &str) -> ParticipantId {
    ParticipantId::new(value).unwrap()
}

/// Synchronizer for participant "1" with a known game against "2" already adopted
fn setup_with_game(using_x: &str, using_o: &str) -> (GameSynchronizer<Arc<RecordingChannel>>, Arc<RecordingChannel>) {
    let channel = RecordingChannel::new();
    let mut sync = GameSynchronizer::new(id("1"), channel.clone(), OriginationPolicy::EitherPeer)
        .with_rng(StdRng::seed_from_u64(42));
    let state = GameState::new(id(using_x), id(using_o)).unwrap();
    assert!(sync.on_remote_message(ChannelMessage::Start(state)));
    (sync, channel)
}

/// Play a fixed sequence where X ("1") wins the top row
fn finish_game_won_by_local(sync: &mut GameSynchronizer<Arc<RecordingChannel>>) {
    let mut state = sync.state().unwrap().clone();
    for (player, square) in [
        ("1", Square::TopLeft),
        ("2", Square::MidLeft),
        ("1", Square::TopMid),
        ("2", Square::MidMid),
    ] {
        state = state.apply_move(&id(player), square).unwrap();
    }
    sync.on_remote_message(ChannelMessage::Move(state));
    sync.apply_local_move(Square::TopRight).unwrap();
}

#[cfg(test)]
mod origination_tests {
    use super::*;

    #[test]
    fn test_originate_publishes_start_and_adopts() {
        let channel = RecordingChannel::new();
        let mut sync = GameSynchronizer::new(id("1"), channel.clone(), OriginationPolicy::EitherPeer);

        let state = sync.originate(&id("2")).unwrap();

        assert_ne!(state.using_x, state.using_o);
        assert_eq!(state.whose_turn, state.using_x);
        assert!(state.board.empty_squares().count() == 9);
        assert_eq!(state.winner, Winner::None);
        assert_eq!(sync.state(), Some(&state));
        assert_eq!(channel.messages(), vec![ChannelMessage::Start(state)]);
    }

    #[test]
    fn test_pair_formed_while_game_exists_does_nothing() {
        let (mut sync, channel) = setup_with_game("1", "2");
        let before = sync.state().cloned();

        assert_eq!(sync.on_pair_formed(&id("2")).unwrap(), None);

        assert_eq!(sync.state().cloned(), before);
        assert_eq!(channel.publish_count(), 0);
    }

    #[test]
    fn test_peer_left_then_new_pair_originates_again() {
        let (mut sync, channel) = setup_with_game("1", "2");

        sync.on_peer_left();
        assert_eq!(sync.phase(), Phase::Idle);
        assert!(sync.state().is_none());

        let state = sync.on_pair_formed(&id("3")).unwrap().unwrap();
        assert!(state.marker_of(&id("3")).is_some());
        assert!(state.marker_of(&id("1")).is_some());
        assert_eq!(channel.publish_count(), 1);
    }
}

#[cfg(test)]
mod local_move_tests {
    use super::*;

    #[test]
    fn test_move_on_opponents_turn_is_ignored() {
        let (mut sync, channel) = setup_with_game("2", "1");
        let before = sync.state().cloned();

        let outcome = sync.request_move(4).unwrap();

        assert_eq!(outcome, MoveOutcome::Ignored(MoveRejection::NotYourTurn));
        assert_eq!(sync.state().cloned(), before);
        assert_eq!(channel.publish_count(), 0);
    }

    #[test]
    fn test_move_without_game_is_ignored() {
        let channel = RecordingChannel::new();
        let mut sync = GameSynchronizer::new(id("1"), channel.clone(), OriginationPolicy::EitherPeer);

        assert_eq!(
            sync.apply_local_move(Square::MidMid).unwrap(),
            MoveOutcome::Ignored(MoveRejection::NoGame)
        );
        assert_eq!(channel.publish_count(), 0);
    }

    #[test]
    fn test_accepted_move_flips_turn_and_publishes_full_state() {
        let (mut sync, channel) = setup_with_game("1", "2");

        let outcome = sync.apply_local_move(Square::MidMid).unwrap();

        let MoveOutcome::Applied(state) = outcome else {
            panic!("move should have been applied");
        };
        assert_eq!(state.board.get(Square::MidMid), Some(Marker::X));
        assert_eq!(state.whose_turn, id("2"));
        assert_eq!(channel.last_message(), Some(ChannelMessage::Move(state.clone())));
        assert_eq!(sync.state(), Some(&state));
    }

    #[test]
    fn test_occupied_square_is_ignored() {
        let (mut sync, channel) = setup_with_game("1", "2");
        let state = sync.state().unwrap().clone()
            .apply_move(&id("1"), Square::TopLeft).unwrap()
            .apply_move(&id("2"), Square::MidMid).unwrap();
        sync.on_remote_message(ChannelMessage::Move(state));

        assert_eq!(
            sync.apply_local_move(Square::MidMid).unwrap(),
            MoveOutcome::Ignored(MoveRejection::SquareOccupied(Square::MidMid))
        );
        assert_eq!(channel.publish_count(), 0);
    }

    #[test]
    fn test_move_after_game_finished_is_ignored() {
        let (mut sync, channel) = setup_with_game("1", "2");
        finish_game_won_by_local(&mut sync);
        assert_eq!(sync.phase(), Phase::Finished);
        channel.clear();

        let outcome = sync.apply_local_move(Square::BottomRight).unwrap();
        assert_eq!(outcome, MoveOutcome::Ignored(MoveRejection::GameFinished));
        assert_eq!(channel.publish_count(), 0);
    }
}

#[cfg(test)]
mod remote_message_tests {
    use super::*;

    #[test]
    fn test_same_move_payload_twice_is_idempotent() {
        let (mut sync, _channel) = setup_with_game("2", "1");
        let moved = sync.state().unwrap().apply_move(&id("2"), Square::TopLeft).unwrap();

        sync.on_remote_message(ChannelMessage::Move(moved.clone()));
        let after_first = sync.state().cloned();
        sync.on_remote_message(ChannelMessage::Move(moved));

        assert_eq!(sync.state().cloned(), after_first);
    }

    #[test]
    fn test_start_dropped_while_game_in_progress() {
        let (mut sync, _channel) = setup_with_game("1", "2");
        let before = sync.state().cloned();

        let competing = GameState::new(id("2"), id("1")).unwrap();
        assert!(!sync.on_remote_message(ChannelMessage::Start(competing)));
        assert_eq!(sync.state().cloned(), before);
    }

    #[test]
    fn test_start_adopted_after_game_finished() {
        let (mut sync, _channel) = setup_with_game("1", "2");
        finish_game_won_by_local(&mut sync);

        let rematch = GameState::new(id("2"), id("1")).unwrap();
        assert!(sync.on_remote_message(ChannelMessage::Start(rematch.clone())));
        assert_eq!(sync.state(), Some(&rematch));
        assert_eq!(sync.phase(), Phase::InProgress);
    }

    #[test]
    fn test_move_replaces_state_unconditionally() {
        let (mut sync, _channel) = setup_with_game("1", "2");
        let foreign = GameState::new(id("2"), id("1")).unwrap();

        assert!(sync.on_remote_message(ChannelMessage::Move(foreign.clone())));
        assert_eq!(sync.state(), Some(&foreign));
    }
}

#[cfg(test)]
mod play_again_tests {
    use super::*;

    #[test]
    fn test_play_again_without_game_is_missing_opponent() {
        let channel = RecordingChannel::new();
        let mut sync = GameSynchronizer::new(id("1"), channel, OriginationPolicy::EitherPeer);

        assert!(matches!(sync.play_again(), Err(DuetError::MissingOpponent)));
    }

    #[test]
    fn test_play_again_during_game_is_ignored() {
        let (mut sync, channel) = setup_with_game("1", "2");
        assert_eq!(sync.play_again().unwrap(), None);
        assert_eq!(channel.publish_count(), 0);
    }

    #[test]
    fn test_play_again_after_finish_restarts_against_same_opponent() {
        let (mut sync, channel) = setup_with_game("1", "2");
        finish_game_won_by_local(&mut sync);
        channel.clear();

        let state = sync.play_again().unwrap().unwrap();

        assert_eq!(state.opponent_of(&id("1")), Some(&id("2")));
        assert_eq!(state.winner, Winner::None);
        assert_eq!(channel.messages(), vec![ChannelMessage::Start(state)]);
    }
}

#[cfg(test)]
mod notification_tests {
    use super::*;

    #[test]
    fn test_outcome_emitted_once_per_finished_game() {
        let (mut sync, _channel) = setup_with_game("1", "2");
        let mut outcomes = sync.outcomes();

        finish_game_won_by_local(&mut sync);
        let finished = sync.state().unwrap().clone();
        // echo of the same final state must not re-announce
        sync.on_remote_message(ChannelMessage::Move(finished));

        assert_eq!(outcomes.try_recv().unwrap(), Winner::Player(id("1")));
        assert!(outcomes.try_recv().is_err());
    }

    #[test]
    fn test_snapshots_follow_every_change() {
        let (mut sync, _channel) = setup_with_game("1", "2");
        let snapshots = sync.subscribe();
        assert_eq!(snapshots.borrow().as_ref().map(|v| v.status), Some(duet::Status::YourTurn));

        sync.apply_local_move(Square::MidMid).unwrap();
        assert_eq!(snapshots.borrow().as_ref().map(|v| v.status), Some(duet::Status::OpponentsTurn));

        sync.on_peer_left();
        assert!(snapshots.borrow().is_none());
    }
}
