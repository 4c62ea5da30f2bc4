use std::ops::{Add, Sub};

use strum::{Display, FromRepr};

/// Body actions of the motion module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum ActionType {
    #[default]
    None = 0,
    Stand,
    Walk,
    TurnDribble,
    GetupFront,
    GetupBack,
    TipOver,
    Kick,
    Initial,
    Limp,
    RefPickup,
    GoalieSit,
    GoalieDiveRight,
    GoalieDiveLeft,
    GoalieCentre,
    GoalieUncentre,
    GoalieInitial,
    GoalieAftersitInitial,
    DefenderCentre,
    GoalieFastSit,
    MotionCalibrate,
    StandStraight,
    LineUp,
    TestArms,
    RaiseArm,
    UkemiFront,
    UkemiBack,
    GoalieStand,
    Sit,
    SignalKickInRight,
    SignalKickInLeft,
    SignalGoalKickRight,
    SignalGoalKickLeft,
    SignalCornerKickRight,
    SignalCornerKickLeft,
    SignalGoalRight,
    SignalGoalLeft,
    SignalPushingFreeKickRight,
    SignalPushingFreeKickLeft,
    SignalFullTime,
}

impl ActionType {
    /// Picked up by the referee or diving: the robot cannot see or move reliably.
    #[must_use]
    pub fn is_incapacitated(self) -> bool {
        matches!(
            self,
            Self::RefPickup | Self::GoalieDiveRight | Self::GoalieDiveLeft
        )
    }

    /// Actions during which vision observations are not trusted for localisation.
    #[must_use]
    pub fn disturbs_observations(self) -> bool {
        matches!(
            self,
            Self::RefPickup
                | Self::GoalieDiveRight
                | Self::GoalieDiveLeft
                | Self::Limp
                | Self::GetupFront
                | Self::GetupBack
                | Self::TipOver
        )
    }
}

/// The body part of an action command.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BodyCommand {
    pub action_type: ActionType,
    /// mm, negative for backwards
    pub forward: i32,
    /// mm, negative for rightwards
    pub left: i32,
    /// rad, anti-clockwise
    pub turn: f32,
}

impl BodyCommand {
    /// Standing, or walking on the spot.
    #[must_use]
    pub fn is_stationary(&self) -> bool {
        match self.action_type {
            ActionType::Walk => self.forward == 0 && self.left == 0 && self.turn == 0.0,
            ActionType::Stand | ActionType::GoalieStand => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeadCommand {
    /// rad, positive is left
    pub yaw: f32,
    /// rad, positive is down
    pub pitch: f32,
}

/// The command the motion module is currently executing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionCommand {
    pub head: HeadCommand,
    pub body: BodyCommand,
}

/// The subset of raw sensor readings used by the ball filters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorValues {
    /// rad/s
    pub gyroscope_x: f32,
    /// rad/s
    pub gyroscope_y: f32,
    /// rad
    pub head_yaw: f32,
}

/// Accumulated walk odometry, or the difference between two readings of it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Odometry {
    pub forward: f32,
    pub left: f32,
    pub turn: f32,
}

impl Odometry {
    #[must_use]
    pub fn new(forward: f32, left: f32, turn: f32) -> Self {
        Self {
            forward,
            left,
            turn,
        }
    }
}

impl Add for Odometry {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.forward + rhs.forward,
            self.left + rhs.left,
            self.turn + rhs.turn,
        )
    }
}

impl Sub for Odometry {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.forward - rhs.forward,
            self.left - rhs.left,
            self.turn - rhs.turn,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_type_repr_matches_motion_numbering() {
        assert_eq!(ActionType::from_repr(10), Some(ActionType::RefPickup));
        assert_eq!(ActionType::from_repr(27), Some(ActionType::GoalieStand));
        assert_eq!(ActionType::SignalFullTime as u8, 39);
        assert_eq!(ActionType::from_repr(40), None);
    }

    #[test]
    fn walking_on_the_spot_is_stationary() {
        let mut body = BodyCommand {
            action_type: ActionType::Walk,
            ..Default::default()
        };
        assert!(body.is_stationary());

        body.forward = 100;
        assert!(!body.is_stationary());
    }

    #[test]
    fn odometry_difference() {
        let diff = Odometry::new(10.0, 5.0, 0.5) - Odometry::new(4.0, 5.0, 0.25);
        assert_eq!(diff, Odometry::new(6.0, 0.0, 0.25));
    }
}
