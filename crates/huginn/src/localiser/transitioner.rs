//! Game controller driven resets of the pose hypotheses.
use std::f32::consts::FRAC_PI_2;

use crate::field::{FIELD_LENGTH, FIELD_WIDTH, PENALTY_CROSS_ABS_X};
use crate::timer::CycleTimer;
use crate::types::{
    AbsCoord, ActionType, CompetitionType, EstimatorInfoIn, EstimatorInfoInit, GamePhase,
    GameState, InitialPoseType, Penalty,
};

/// Minimum time the robot has to be held up before the placement counts as manual.
const REF_PICKUP_TIMER_MIN_MS: f32 = 500.0;
/// Minimum time the robot has to be penalised before it is reset when unpenalised.
const PENALISED_TIMER_MIN_MS: f32 = 20_000.0;
/// Window after unpenalising in which a pickup means the referee turned the robot around late.
const REF_FORGOT_TO_TURN_ROBOT_AROUND_MS: f32 = 15_000.0;

/// The named resets of the pose hypotheses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseReset {
    /// Depends on the configured [`InitialPoseType`].
    Initial,
    Unpenalised,
    ManualPlacementOffense,
    ManualPlacementDefense,
    PenaltyShootOffense,
    PenaltyShootDefense,
    PenaltyShootSelected,
}

impl PoseReset {
    /// The hypotheses a reset places the robot on, all with equal weight.
    #[must_use]
    pub fn poses(self, init: &EstimatorInfoInit) -> Vec<AbsCoord> {
        match self {
            PoseReset::Initial => match init.initial_pose_type {
                InitialPoseType::Game => vec![game_initial_pose(init.player_number)],
                InitialPoseType::OneVsOne => vec![
                    AbsCoord::new(-3500.0, 3000.0, -FRAC_PI_2),
                    AbsCoord::new(-3500.0, -3000.0, FRAC_PI_2),
                ],
                InitialPoseType::Specified => vec![init.specified_initial_pose],
                InitialPoseType::Unpenalised => unpenalised_poses(),
            },
            PoseReset::Unpenalised => unpenalised_poses(),
            PoseReset::ManualPlacementOffense => manual_placement_poses(init.player_number, true),
            PoseReset::ManualPlacementDefense => manual_placement_poses(init.player_number, false),
            PoseReset::PenaltyShootOffense => vec![AbsCoord::new(2200.0, 0.0, 0.0)],
            PoseReset::PenaltyShootDefense => vec![AbsCoord::new(-FIELD_LENGTH / 2.0, 0.0, 0.0)],
            PoseReset::PenaltyShootSelected => vec![AbsCoord::new(-4000.0, -2000.0, FRAC_PI_2)],
        }
    }
}

/// Sideline pose each player walks in from.
fn game_initial_pose(player_number: i32) -> AbsCoord {
    match player_number {
        1 => AbsCoord::new(-3500.0, 3000.0, -FRAC_PI_2),
        2 => AbsCoord::new(-2000.0, -3000.0, FRAC_PI_2),
        3 => AbsCoord::new(-2700.0, 3000.0, -FRAC_PI_2),
        4 => AbsCoord::new(-1000.0, -3000.0, FRAC_PI_2),
        5 => AbsCoord::new(-1500.0, 3000.0, -FRAC_PI_2),
        6 => AbsCoord::new(-3000.0, -3000.0, FRAC_PI_2),
        _ => AbsCoord::new(-4000.0, -3000.0, FRAC_PI_2),
    }
}

fn unpenalised_poses() -> Vec<AbsCoord> {
    vec![
        AbsCoord::new(-PENALTY_CROSS_ABS_X, FIELD_WIDTH / 2.0, -FRAC_PI_2),
        AbsCoord::new(-PENALTY_CROSS_ABS_X, -FIELD_WIDTH / 2.0, FRAC_PI_2),
        AbsCoord::new(-FIELD_LENGTH / 6.0, -FIELD_WIDTH / 2.0, FRAC_PI_2),
        AbsCoord::new(-FIELD_LENGTH / 6.0, FIELD_WIDTH / 2.0, -FRAC_PI_2),
    ]
}

fn manual_placement_poses(player_number: i32, offense: bool) -> Vec<AbsCoord> {
    if player_number == 1 {
        return vec![AbsCoord::new(-4250.0, 0.0, 0.0)];
    }

    let mut poses = vec![
        AbsCoord::new(-3666.0, -464.0, 0.0),
        AbsCoord::new(-3666.0, 464.0, 0.0),
        AbsCoord::new(-3666.0, -1998.0, 0.0),
        AbsCoord::new(-3666.0, 1998.0, 0.0),
    ];
    if offense {
        poses.push(AbsCoord::new(-910.0, 0.0, 0.0));
    }
    poses
}

/// Tracks the game controller and pickup state between cycles and decides when the pose
/// hypotheses have to be replaced.
#[derive(Debug, Clone)]
pub struct LocaliserTransitioner {
    prev_competition_type: CompetitionType,
    prev_state: GameState,
    prev_penalty: Penalty,
    prev_picked_up: bool,
    picked_up_during_penalised: bool,
    ref_pickup_timer: CycleTimer,
    penalised_timer: CycleTimer,
    unpenalised_timer: CycleTimer,
}

impl LocaliserTransitioner {
    #[must_use]
    pub fn new(init: &EstimatorInfoInit) -> Self {
        Self {
            prev_competition_type: init.competition_type,
            prev_state: init.state,
            prev_penalty: Penalty::None,
            prev_picked_up: false,
            picked_up_during_penalised: false,
            ref_pickup_timer: CycleTimer::default(),
            penalised_timer: CycleTimer::default(),
            unpenalised_timer: CycleTimer::default(),
        }
    }

    /// Returns the reset to apply this cycle, if any. When several transitions fire in the same
    /// cycle, the last one wins.
    pub fn handle_transition(
        &mut self,
        init: &EstimatorInfoInit,
        input: &EstimatorInfoIn,
    ) -> Option<PoseReset> {
        for timer in [
            &mut self.ref_pickup_timer,
            &mut self.penalised_timer,
            &mut self.unpenalised_timer,
        ] {
            timer.advance(input.dt_in_seconds);
        }

        let state = input.state;
        let penalty = input.penalty;
        let picked_up = input.active.body.action_type == ActionType::RefPickup;
        let kicking = input.kicking_team == init.team_number;
        let penalty_changed = self.prev_penalty != penalty;
        let back_on_field = |state: GameState| {
            if state == GameState::Initial {
                PoseReset::Initial
            } else {
                PoseReset::Unpenalised
            }
        };

        let mut reset = None;

        if self.prev_competition_type != input.competition_type {
            reset = Some(PoseReset::Initial);
        }

        if input.competition_type.has_game_resets() {
            if input.game_phase == GamePhase::PenaltyShoot {
                if self.prev_state != state && state == GameState::Playing {
                    reset = Some(if kicking {
                        PoseReset::PenaltyShootOffense
                    } else {
                        PoseReset::PenaltyShootDefense
                    });
                }

                // Lets the coach see who the selected taker is.
                if penalty_changed {
                    reset = Some(if penalty.is_penalised() {
                        PoseReset::Initial
                    } else {
                        PoseReset::PenaltyShootSelected
                    });
                }
            } else {
                if !self.prev_picked_up && picked_up {
                    self.ref_pickup_timer.restart();
                }

                if self.prev_picked_up
                    && !picked_up
                    && self.ref_pickup_timer.elapsed_ms() > REF_PICKUP_TIMER_MIN_MS
                {
                    if state == GameState::Set {
                        reset = Some(manual_placement(kicking));
                    } else if penalty.is_penalised() {
                        self.picked_up_during_penalised = true;
                    } else if self.unpenalised_timer.elapsed_ms()
                        < REF_FORGOT_TO_TURN_ROBOT_AROUND_MS
                        && init.handle_referee_mistakes
                    {
                        // Referees often turn the robot towards the field after unpenalising it.
                        reset = Some(back_on_field(state));
                    }
                }

                if penalty_changed && penalty.is_penalised() {
                    self.penalised_timer.restart();
                    self.picked_up_during_penalised = false;
                }

                if penalty_changed && !penalty.is_penalised() {
                    if self.prev_penalty == Penalty::IllegalMotionInSet {
                        // Only moved if it was placed by hand.
                        if self.picked_up_during_penalised {
                            reset = Some(manual_placement(kicking));
                        }
                    } else if !init.handle_referee_mistakes
                        || self.penalised_timer.elapsed_ms() > PENALISED_TIMER_MIN_MS
                        || self.picked_up_during_penalised
                    {
                        reset = Some(back_on_field(state));
                        self.unpenalised_timer.restart();
                    }
                }
            }
        }

        if self.prev_state != state && state == GameState::Initial {
            reset = Some(PoseReset::Initial);
        }

        self.prev_competition_type = input.competition_type;
        self.prev_state = state;
        self.prev_penalty = penalty;
        self.prev_picked_up = picked_up;

        if let Some(reset) = reset {
            tracing::debug!(?reset, ?state, ?penalty, "resetting pose hypotheses");
        }
        reset
    }
}

fn manual_placement(kicking: bool) -> PoseReset {
    if kicking {
        PoseReset::ManualPlacementOffense
    } else {
        PoseReset::ManualPlacementDefense
    }
}
