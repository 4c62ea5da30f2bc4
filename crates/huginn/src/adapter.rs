//! Runs the estimators once per perception cycle and publishes their results.
//!
//! On the robot, [`StateEstimationAdapter::tick_frame`] assembles the input from the latest
//! readings of the other modules and publishes the output to the [`Blackboard`] shared with the
//! transmitter and receiver threads. The replay tool instead feeds recorded inputs to
//! [`StateEstimationAdapter::tick`].
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::codec::Encode;
use crate::config::{AdapterConfig, StateEstimationConfig};
use crate::error::Result;
use crate::estimator::Estimators;
use crate::types::{
    AbsCoord, ActionCommand, BallInfo, BehaviourSharedData, BroadcastData, CompetitionType,
    EstimatorInfoIn, EstimatorInfoInit, EstimatorInfoMiddle, EstimatorInfoOut, FieldFeatureInfo,
    GamePhase, GameState, InitialPoseType, Odometry, Penalty, RobotVisionInfo, SensorValues,
    SetPlay, SharedStateEstimationBundle,
};

/// Number of robots in a team, including ourselves.
pub const TEAM_SIZE: usize = 5;

/// What the game controller tells us this cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GameControllerInfo {
    pub competition_type: CompetitionType,
    pub state: GameState,
    pub game_phase: GamePhase,
    pub set_play: SetPlay,
    pub kicking_team: i32,
    /// Our own penalty
    pub penalty: Penalty,
}

/// The latest readings of the other modules, taken at the start of a cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerceptionFrame {
    pub field_features: Vec<FieldFeatureInfo>,
    pub balls: Vec<BallInfo>,
    pub visual_robots: Vec<RobotVisionInfo>,
    pub game: GameControllerInfo,
    pub behaviour_shared_data: BehaviourSharedData,
    pub active: ActionCommand,
    /// Per teammate
    pub incapacitated: Vec<bool>,
    /// The last broadcast of every teammate, indexed by player number minus one
    pub received: Vec<BroadcastData>,
    /// Odometry accumulated since boot
    pub odometry: Odometry,
    /// Timestamp of the camera images, in microseconds
    pub timestamp_us: i64,
    pub sensor_values: SensorValues,
}

/// The published state estimate and the handshake flags of the team communication.
#[derive(Clone, Debug, PartialEq)]
pub struct StateEstimationBlackboard {
    pub out: EstimatorInfoOut,
    /// Set when a new bundle is published, cleared by the transmitter once it has been sent.
    pub have_pending_outgoing_shared_bundle: bool,
    /// Set by the receiver per teammate, cleared once the estimators have seen the broadcast.
    pub have_pending_incoming_shared_bundle: Vec<bool>,
}

impl Default for StateEstimationBlackboard {
    fn default() -> Self {
        Self {
            out: EstimatorInfoOut::default(),
            have_pending_outgoing_shared_bundle: false,
            have_pending_incoming_shared_bundle: vec![false; TEAM_SIZE],
        }
    }
}

/// State estimation's part of the blackboard, guarded by a single lock.
#[derive(Debug, Default)]
pub struct Blackboard {
    inner: Mutex<StateEstimationBlackboard>,
}

impl Blackboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic while holding the lock cannot leave the data half written, so poisoning is
    /// ignored.
    fn lock(&self) -> MutexGuard<'_, StateEstimationBlackboard> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> StateEstimationBlackboard {
        self.lock().clone()
    }

    /// Writes every output of a cycle at once, so readers never see a mix of two cycles.
    pub fn publish(&self, out: &EstimatorInfoOut) {
        let mut blackboard = self.lock();
        blackboard.out.clone_from(out);
        blackboard.have_pending_outgoing_shared_bundle = true;
        blackboard.have_pending_incoming_shared_bundle = vec![false; TEAM_SIZE];
    }

    /// Takes the bundle for the transmitter, if one was published since the last call.
    pub fn take_outgoing_bundle(&self) -> Option<SharedStateEstimationBundle> {
        let mut blackboard = self.lock();
        if !blackboard.have_pending_outgoing_shared_bundle {
            return None;
        }
        blackboard.have_pending_outgoing_shared_bundle = false;
        Some(blackboard.out.shared_state_estimation_bundle)
    }

    /// Marks the broadcast of player `player_number` as not yet seen by the estimators.
    pub fn mark_incoming(&self, player_number: usize) {
        let mut blackboard = self.lock();
        match player_number
            .checked_sub(1)
            .and_then(|index| blackboard.have_pending_incoming_shared_bundle.get_mut(index))
        {
            Some(pending) => *pending = true,
            None => tracing::warn!(player_number, "broadcast from unknown player"),
        }
    }
}

impl EstimatorInfoInit {
    /// Builds the startup record from the robot configuration and the game controller.
    #[must_use]
    pub fn from_config(
        player_number: i32,
        team_number: i32,
        game: &GameControllerInfo,
        config: &AdapterConfig,
    ) -> Self {
        Self {
            player_number,
            team_number,
            initial_pose_type: InitialPoseType::parse_or_game(&config.initial_pose_type),
            specified_initial_pose: AbsCoord::new(
                config.specified_initial_x as f32,
                config.specified_initial_y as f32,
                (config.specified_initial_theta as f32).to_radians(),
            ),
            skill: config.skill.clone(),
            competition_type: game.competition_type,
            state: game.state,
            game_phase: game.game_phase,
            set_play: game.set_play,
            handle_referee_mistakes: config.handle_referee_mistakes,
        }
    }
}

/// Writes the inputs of every cycle, so they can be replayed off the robot.
struct Recorder {
    write: Box<dyn Write + Send>,
}

impl Recorder {
    fn new(mut write: Box<dyn Write + Send>, init: &EstimatorInfoInit) -> Result<Self> {
        init.encode(&mut write)?;
        Ok(Self { write })
    }

    fn record(&mut self, input: &EstimatorInfoIn, timestamp_us: i64) -> Result<()> {
        input.encode(&mut self.write)?;
        timestamp_us.encode(&mut self.write)?;
        self.write.flush()?;
        Ok(())
    }
}

pub struct StateEstimationAdapter {
    init: EstimatorInfoInit,
    estimators: Estimators,
    prev_odometry: Option<Odometry>,
    prev_timestamp_us: i64,
    cycle_budget: Duration,
    recorder: Option<Recorder>,
}

impl StateEstimationAdapter {
    #[must_use]
    pub fn new(init: EstimatorInfoInit, config: &StateEstimationConfig) -> Self {
        tracing::debug!(
            player = init.player_number,
            pose = %init.initial_pose_type,
            multi_ball = config.adapter.use_multi_ball,
            "starting state estimation"
        );

        Self {
            estimators: Estimators::new(&init, config),
            init,
            prev_odometry: None,
            prev_timestamp_us: -1,
            cycle_budget: Duration::from_millis(config.adapter.cycle_budget_ms),
            recorder: None,
        }
    }

    /// Records the startup record now and the input of every later cycle to `write`.
    pub fn with_recorder(mut self, write: impl Write + Send + 'static) -> Result<Self> {
        self.recorder = Some(Recorder::new(Box::new(write), &self.init)?);
        Ok(self)
    }

    #[must_use]
    pub fn init(&self) -> &EstimatorInfoInit {
        &self.init
    }

    #[must_use]
    pub fn estimators(&self) -> &Estimators {
        &self.estimators
    }

    /// Runs every estimator on an already assembled input.
    pub fn tick(
        &mut self,
        input: &EstimatorInfoIn,
        middle: &mut EstimatorInfoMiddle,
        out: &mut EstimatorInfoOut,
    ) {
        self.estimators.tick(input, middle, out);
    }

    /// Runs one cycle on the robot: assemble the input, run the estimators and publish.
    pub fn tick_frame(&mut self, frame: &PerceptionFrame, blackboard: &Blackboard) {
        let start = Instant::now();

        let input = self.create_input(frame, &blackboard.snapshot());
        let mut middle = EstimatorInfoMiddle::default();
        let mut out = EstimatorInfoOut::default();
        self.tick(&input, &mut middle, &mut out);
        blackboard.publish(&out);

        if let Some(recorder) = &mut self.recorder {
            if let Err(error) = recorder.record(&input, frame.timestamp_us) {
                tracing::warn!(?error, "failed to record state estimation input, stop recording");
                self.recorder = None;
            }
        }

        let elapsed = start.elapsed();
        if elapsed > self.cycle_budget {
            tracing::warn!(
                elapsed_ms = elapsed.as_secs_f32() * 1000.0,
                budget_ms = self.cycle_budget.as_secs_f32() * 1000.0,
                "state estimation cycle took too long"
            );
        }
    }

    fn create_input(
        &mut self,
        frame: &PerceptionFrame,
        blackboard: &StateEstimationBlackboard,
    ) -> EstimatorInfoIn {
        let pending = &blackboard.have_pending_incoming_shared_bundle;
        let incoming_broadcast_data = frame
            .received
            .iter()
            .zip(pending)
            .filter(|(_, pending)| **pending)
            .map(|(broadcast, _)| *broadcast)
            .collect();

        EstimatorInfoIn {
            field_features: frame.field_features.clone(),
            balls: frame.balls.clone(),
            competition_type: frame.game.competition_type,
            state: frame.game.state,
            game_phase: frame.game.game_phase,
            set_play: frame.game.set_play,
            kicking_team: frame.game.kicking_team,
            behaviour_shared_data: frame.behaviour_shared_data,
            penalty: frame.game.penalty,
            active: frame.active,
            incapacitated: frame.incapacitated.clone(),
            have_pending_outgoing_shared_bundle: blackboard.have_pending_outgoing_shared_bundle,
            have_pending_incoming_shared_bundle: pending.clone(),
            incoming_broadcast_data,
            visual_robots: frame.visual_robots.clone(),
            head_yaw: frame.sensor_values.head_yaw,
            is_incapacitated: frame.active.body.action_type.is_incapacitated(),
            odometry_diff: self.odometry_diff(frame.odometry),
            dt_in_seconds: self.dt_in_seconds(frame.timestamp_us),
            action_command_body: frame.active.body,
            sensor_values: frame.sensor_values,
        }
    }

    /// Odometry walked since the previous cycle, zero on the first one.
    fn odometry_diff(&mut self, odometry: Odometry) -> Odometry {
        let diff = self
            .prev_odometry
            .map_or_else(Odometry::default, |prev| odometry - prev);
        self.prev_odometry = Some(odometry);
        diff
    }

    /// Seconds since the previous cycle, zero until a valid previous timestamp exists.
    fn dt_in_seconds(&mut self, timestamp_us: i64) -> f32 {
        let dt = if self.prev_timestamp_us > 0 {
            (timestamp_us - self.prev_timestamp_us) as f32 / 1_000_000.0
        } else {
            0.0
        };
        self.prev_timestamp_us = timestamp_us;
        dt
    }
}

impl std::fmt::Debug for StateEstimationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateEstimationAdapter")
            .field("init", &self.init)
            .field("estimators", &self.estimators)
            .field("recording", &self.recorder.is_some())
            .finish_non_exhaustive()
    }
}
