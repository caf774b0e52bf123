//! End-to-end tests: two replicas playing over a local relay

use duet::{LocalRelay, OriginationPolicy, Square, Status, Winner};

use super::harness::{barrier, by_marker, id, join, play_move, wait_for_game, wait_for_view};

#[cfg(test)]
mod pairing_tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_forms_and_replicas_agree() {
        let relay = LocalRelay::new();
        let alice = join(&relay, "alice", OriginationPolicy::LowestId);
        let bob = join(&relay, "bob", OriginationPolicy::LowestId);

        let alice_view = wait_for_game(&alice).await;
        let bob_view = wait_for_game(&bob).await;

        assert_eq!(alice_view.board, bob_view.board);
        assert_eq!(alice_view.whose_turn, bob_view.whose_turn);
        assert_ne!(alice_view.your_marker, bob_view.your_marker);

        let mut statuses = [alice_view.status, bob_view.status];
        statuses.sort_by_key(|s| *s == Status::YourTurn);
        assert_eq!(statuses, [Status::OpponentsTurn, Status::YourTurn]);

        alice.leave().await.unwrap();
        bob.leave().await.unwrap();
    }

    #[tokio::test]
    async fn test_single_participant_waits() {
        let relay = LocalRelay::new();
        let alice = join(&relay, "alice", OriginationPolicy::LowestId);

        barrier(&alice).await;
        assert!(alice.current().is_none());

        alice.leave().await.unwrap();
    }
}

#[cfg(test)]
mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn test_moves_propagate_and_turns_alternate() {
        let relay = LocalRelay::new();
        let alice = join(&relay, "alice", OriginationPolicy::LowestId);
        let bob = join(&relay, "bob", OriginationPolicy::LowestId);
        let (x, o) = by_marker(&alice, &bob).await;

        play_move(x, o, 4).await;
        let o_view = wait_for_view(o, |v| v.map_or(false, |v| v.status == Status::YourTurn)).await.unwrap();
        assert_eq!(o_view.whose_turn, *o.id());
        assert!(!o_view.is_enabled(Square::MidMid));

        play_move(o, x, 0).await;
        let x_view = wait_for_view(x, |v| v.map_or(false, |v| v.status == Status::YourTurn)).await.unwrap();
        assert_eq!(x_view.whose_turn, *x.id());

        alice.leave().await.unwrap();
        bob.leave().await.unwrap();
    }

    #[tokio::test]
    async fn test_out_of_turn_request_changes_nothing() {
        let relay = LocalRelay::new();
        let alice = join(&relay, "alice", OriginationPolicy::LowestId);
        let bob = join(&relay, "bob", OriginationPolicy::LowestId);
        let (x, o) = by_marker(&alice, &bob).await;

        o.request_move(4).unwrap();
        barrier(o).await;
        barrier(x).await;

        assert!(o.current().unwrap().board.is_empty_at(Square::MidMid));
        assert!(x.current().unwrap().board.is_empty_at(Square::MidMid));
        assert_eq!(x.current().unwrap().status, Status::YourTurn);

        alice.leave().await.unwrap();
        bob.leave().await.unwrap();
    }

    #[tokio::test]
    async fn test_full_game_announces_winner_on_both_sides() {
        let relay = LocalRelay::new();
        let alice = join(&relay, "alice", OriginationPolicy::LowestId);
        let bob = join(&relay, "bob", OriginationPolicy::LowestId);
        let (x, o) = by_marker(&alice, &bob).await;
        let mut x_outcomes = x.outcomes();
        let mut o_outcomes = o.outcomes();

        play_move(x, o, 0).await;
        play_move(o, x, 3).await;
        play_move(x, o, 1).await;
        play_move(o, x, 4).await;
        play_move(x, o, 2).await;

        let x_view = wait_for_view(x, |v| v.map_or(false, |v| v.is_finished())).await.unwrap();
        let o_view = wait_for_view(o, |v| v.map_or(false, |v| v.is_finished())).await.unwrap();
        assert_eq!(x_view.status, Status::Won);
        assert_eq!(o_view.status, Status::Lost);
        assert!(!Square::ALL.iter().any(|s| o_view.is_enabled(*s)));

        let winner = Winner::Player(x.id().clone());
        assert_eq!(x_outcomes.recv().await.unwrap(), winner);
        assert_eq!(o_outcomes.recv().await.unwrap(), winner);

        alice.leave().await.unwrap();
        bob.leave().await.unwrap();
    }

    #[tokio::test]
    async fn test_tie_game() {
        let relay = LocalRelay::new();
        let alice = join(&relay, "alice", OriginationPolicy::LowestId);
        let bob = join(&relay, "bob", OriginationPolicy::LowestId);
        let (x, o) = by_marker(&alice, &bob).await;

        // X O X / X O O / O X X
        for (mover, watcher, cell) in [
            (x, o, 0), (o, x, 1), (x, o, 2),
            (o, x, 4), (x, o, 3), (o, x, 5),
            (x, o, 7), (o, x, 6), (x, o, 8),
        ] {
            play_move(mover, watcher, cell).await;
        }

        for handle in [x, o] {
            let view = wait_for_view(handle, |v| v.map_or(false, |v| v.is_finished())).await.unwrap();
            assert_eq!(view.winner, Winner::Tie);
            assert_eq!(view.status, Status::Tie);
        }

        alice.leave().await.unwrap();
        bob.leave().await.unwrap();
    }

    #[tokio::test]
    async fn test_play_again_restarts_both_replicas() {
        let relay = LocalRelay::new();
        let alice = join(&relay, "alice", OriginationPolicy::LowestId);
        let bob = join(&relay, "bob", OriginationPolicy::LowestId);
        let (x, o) = by_marker(&alice, &bob).await;

        assert!(!o.request_play_again().await.unwrap());

        for (mover, watcher, cell) in [(x, o, 6), (o, x, 0), (x, o, 7), (o, x, 1), (x, o, 8)] {
            play_move(mover, watcher, cell).await;
        }
        wait_for_view(o, |v| v.map_or(false, |v| v.is_finished())).await;

        assert!(o.request_play_again().await.unwrap());

        let fresh = |v: Option<&duet::GameView>| {
            v.map_or(false, |v| !v.is_finished() && v.board.empty_squares().count() == 9)
        };
        let o_view = wait_for_view(o, fresh).await.unwrap();
        let x_view = wait_for_view(x, fresh).await.unwrap();
        assert_eq!(o_view.whose_turn, x_view.whose_turn);
        assert_ne!(o_view.your_marker, x_view.your_marker);

        alice.leave().await.unwrap();
        bob.leave().await.unwrap();
    }
}

#[cfg(test)]
mod teardown_tests {
    use super::*;
    use super::super::harness::wait_for_presence;

    #[tokio::test]
    async fn test_leave_retracts_presence() {
        let relay = LocalRelay::new();
        let alice = join(&relay, "alice", OriginationPolicy::LowestId);
        let bob = join(&relay, "bob", OriginationPolicy::LowestId);
        wait_for_presence(&relay, 2).await;

        bob.leave().await.unwrap();

        assert!(!relay.presence_state("game").contains_key(&id("bob")));
        assert_eq!(relay.subscriber_count("game"), 1);

        alice.leave().await.unwrap();
        assert_eq!(relay.subscriber_count("game"), 0);
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_replica() {
        let relay = LocalRelay::new();
        let alice = join(&relay, "alice", OriginationPolicy::LowestId);
        wait_for_presence(&relay, 1).await;

        drop(alice);

        wait_for_presence(&relay, 0).await;
    }
}
