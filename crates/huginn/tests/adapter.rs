use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use huginn::adapter::{Blackboard, GameControllerInfo, PerceptionFrame, TEAM_SIZE};
use huginn::types::{
    AbsCoord, BallInfo, BroadcastData, EstimatorInfoInit, GameState, Odometry, RrCoord,
    SharedStateEstimationBundle,
};
use huginn::{StateEstimationAdapter, StateEstimationConfig};
use nalgebra::{Matrix3, vector};

fn adapter() -> StateEstimationAdapter {
    StateEstimationAdapter::new(
        EstimatorInfoInit::default(),
        &StateEstimationConfig::default(),
    )
}

fn ready_frame(cycle: i64) -> PerceptionFrame {
    PerceptionFrame {
        game: GameControllerInfo {
            state: GameState::Ready,
            ..Default::default()
        },
        timestamp_us: 1_000_000 + cycle * 33_000,
        ..Default::default()
    }
}

fn precise(mut coord: AbsCoord, variance: f32) -> AbsCoord {
    coord.var = Matrix3::from_diagonal(&vector![variance, variance, 0.0001]);
    coord
}

#[test]
fn player_one_starts_on_the_sideline() {
    let mut adapter = adapter();
    let blackboard = Blackboard::new();

    adapter.tick_frame(&ready_frame(0), &blackboard);

    let out = blackboard.snapshot().out;
    assert_eq!(out.all_robot_pos.len(), 1);
    assert!((out.robot_pos.x() + 3500.0).abs() < 1e-3);
    assert!((out.robot_pos.y() - 3000.0).abs() < 1e-3);
    assert!((out.robot_pos.theta() + FRAC_PI_2).abs() < 1e-5);
    // No odometry yet, so the reset covariance is reported unchanged.
    assert!((out.robot_pos.var[(0, 0)] - 100_000.0).abs() < 1e-2);
    assert!((out.robot_pos.var[(1, 1)] - 100_000.0).abs() < 1e-2);
    assert!((out.robot_pos.var[(2, 2)] - 0.5).abs() < 1e-6);
    assert!(out.robot_pos_uncertainty > 0.0);
}

#[test]
fn walking_forward_moves_the_pose() {
    let mut adapter = adapter();
    let blackboard = Blackboard::new();

    // Player 1 faces along -y, so walking forward decreases y.
    for cycle in 0..10 {
        let mut frame = ready_frame(cycle);
        frame.odometry = Odometry::new(cycle as f32 * 10.0, 0.0, 0.0);
        adapter.tick_frame(&frame, &blackboard);
    }

    let out = blackboard.snapshot().out;
    assert!((out.robot_pos.x() + 3500.0).abs() < 1.0);
    assert!((out.robot_pos.y() - 2910.0).abs() < 1.0);
}

#[test]
fn seen_ball_is_shared_with_the_team() {
    let mut adapter = adapter();
    let blackboard = Blackboard::new();

    let mut frame = ready_frame(0);
    frame.balls = vec![BallInfo::new(RrCoord::new(1000.0, 0.0, 0.0))];
    adapter.tick_frame(&frame, &blackboard);
    // Not sent yet, so the update stays latched.
    frame.balls.clear();
    adapter.tick_frame(&frame, &blackboard);

    let bundle = blackboard
        .take_outgoing_bundle()
        .expect("a bundle is published every cycle");
    assert!(bundle.have_ball_update);
    // The unseen ball starts pushed out of the robot at 100 mm. Walking observation noise of
    // 20 + 0.5 * 1000 mm against the unknown prior of 1e6 gives a gain of about 0.787.
    let gain = 1_000_000.0 / (1_000_000.0 + 520.0 * 520.0);
    let expected = 100.0 + gain * 900.0;
    assert!((bundle.ball_pos_rrc.x() - expected).abs() < 1.0);
    assert!(bundle.ball_pos_rrc.y().abs() < 1e-3);
    assert!((bundle.robot_pos.x() + 3500.0).abs() < 1e-3);
}

#[test]
fn teammate_ball_is_fused_once() {
    let mut adapter = adapter();
    let blackboard = Arc::new(Blackboard::new());

    let teammate = BroadcastData {
        player_num: 2,
        shared_state_estimation_bundle: SharedStateEstimationBundle {
            robot_pos: precise(AbsCoord::new(0.0, 0.0, 0.0), 100.0),
            ball_pos_rrc: precise(AbsCoord::new(1000.0, 500.0, 0.0), 100.0),
            ball_vel_rrc: precise(AbsCoord::new(0.0, 0.0, 0.0), 100.0),
            have_ball_update: true,
        },
        ..Default::default()
    };
    let mut frame = ready_frame(0);
    frame.received = vec![BroadcastData::default(); TEAM_SIZE];
    frame.received[1] = teammate;

    let receiver = {
        let blackboard = Arc::clone(&blackboard);
        std::thread::spawn(move || blackboard.mark_incoming(2))
    };
    receiver.join().expect("receiver thread panicked");

    adapter.tick_frame(&frame, &blackboard);
    let out = blackboard.snapshot().out;
    assert!(out.had_team_ball_update);
    assert!((out.team_ball_pos.x() - 1000.0).abs() < 50.0);
    assert!((out.team_ball_pos.y() - 500.0).abs() < 50.0);

    // The same broadcast is not fused again until the receiver marks a new one.
    adapter.tick_frame(&ready_frame(1), &blackboard);
    assert!(!blackboard.snapshot().out.had_team_ball_update);
}

#[test]
fn leaving_the_field_stops_localisation() {
    let mut adapter = adapter();
    let blackboard = Blackboard::new();
    adapter.tick_frame(&ready_frame(0), &blackboard);

    let mut frame = ready_frame(1);
    frame.game.state = GameState::Finished;
    frame.odometry = Odometry::new(500.0, 0.0, 0.0);
    adapter.tick_frame(&frame, &blackboard);

    let out = blackboard.snapshot().out;
    assert!((out.robot_pos.y() - 3000.0).abs() < 1e-3);
}
