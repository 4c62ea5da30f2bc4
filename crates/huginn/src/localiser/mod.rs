//! Robot pose estimation against the field lines.
mod cmkf;
mod multi_modal;
mod transitioner;

pub use cmkf::Cmkf;
pub use multi_modal::MultiModalCmkf;
pub use transitioner::{LocaliserTransitioner, PoseReset};

use crate::config::LocaliserConfig;
use crate::estimator::Estimator;
use crate::types::{EstimatorInfoIn, EstimatorInfoInit, EstimatorInfoMiddle, EstimatorInfoOut};

/// Decides whether this cycle may be used for localisation and runs the pose hypotheses.
///
/// It is the first estimator of a cycle: the gating flags it writes into the middle record are
/// read by every estimator after it.
#[derive(Debug, Clone)]
pub struct Localiser {
    init: EstimatorInfoInit,
    mmcmkf: MultiModalCmkf,
}

impl Localiser {
    #[must_use]
    pub fn new(init: &EstimatorInfoInit, config: LocaliserConfig) -> Self {
        Self {
            init: init.clone(),
            mmcmkf: MultiModalCmkf::new(init, config),
        }
    }

    #[must_use]
    pub fn hypotheses(&self) -> &[Cmkf] {
        self.mmcmkf.hypotheses()
    }

    /// Outside of ready, set and playing the robot is not on the field, unless the behaviour is
    /// not driven by the game controller.
    fn can_localise_in_state(&self, input: &EstimatorInfoIn) -> bool {
        !self.init.is_game_skill() || input.state.is_on_field()
    }
}

impl Estimator for Localiser {
    fn tick(
        &mut self,
        input: &EstimatorInfoIn,
        middle: &mut EstimatorInfoMiddle,
        out: &mut EstimatorInfoOut,
    ) {
        middle.can_localise_in_state = self.can_localise_in_state(input);
        middle.can_do_observations = !input.active.body.action_type.disturbs_observations();

        self.mmcmkf.tick(&self.init, input, middle, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionType, GameState};

    #[test]
    fn gating_flags() {
        let mut localiser =
            Localiser::new(&EstimatorInfoInit::default(), LocaliserConfig::default());
        let mut middle = EstimatorInfoMiddle::default();
        let mut out = EstimatorInfoOut::default();

        let mut input = EstimatorInfoIn {
            state: GameState::Initial,
            ..Default::default()
        };
        localiser.tick(&input, &mut middle, &mut out);
        assert!(!middle.can_localise_in_state);
        assert!(middle.can_do_observations);

        input.state = GameState::Playing;
        input.active.body.action_type = ActionType::GoalieDiveLeft;
        localiser.tick(&input, &mut middle, &mut out);
        assert!(middle.can_localise_in_state);
        assert!(!middle.can_do_observations);
    }

    #[test]
    fn non_game_skills_always_localise() {
        let init = EstimatorInfoInit {
            skill: "Penalty".to_string(),
            ..Default::default()
        };
        let mut localiser = Localiser::new(&init, LocaliserConfig::default());
        let mut middle = EstimatorInfoMiddle::default();

        localiser.tick(
            &EstimatorInfoIn::default(),
            &mut middle,
            &mut EstimatorInfoOut::default(),
        );
        assert!(middle.can_localise_in_state);
    }
}
