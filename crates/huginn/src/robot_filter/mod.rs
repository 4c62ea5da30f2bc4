//! Tracking of the robots around us as obstacles.
mod grouped;
mod observation;

pub use grouped::{GroupedRobots, ROBOT_WIDTH};
pub use observation::RobotObservation;

use ordered_float::OrderedFloat;

use crate::estimator::Estimator;
use crate::types::{EstimatorInfoIn, EstimatorInfoMiddle, EstimatorInfoOut, RobotObstacle};

/// Groups robot detections over time and reports the groups that are likely to be real robots.
#[derive(Debug, Clone, Default)]
pub struct RobotFilter {
    groups: Vec<GroupedRobots>,
}

impl RobotFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn groups(&self) -> &[GroupedRobots] {
        &self.groups
    }

    fn update(&mut self, input: &EstimatorInfoIn, out: &EstimatorInfoOut) {
        for group in &mut self.groups {
            group.tick(&input.odometry_diff, input.head_yaw, out.robot_pos);
        }
        self.groups.retain(|group| !group.is_empty());

        // Greedy: every group takes its closest mergeable detection that no earlier group took.
        let robots = &input.visual_robots;
        let mut merged: Vec<bool> = robots
            .iter()
            .map(|robot| {
                let finite = robot.rr.is_finite();
                if !finite {
                    tracing::warn!(?robot, "ignoring non-finite robot detection");
                }
                !finite
            })
            .collect();
        for group in &mut self.groups {
            let closest = robots
                .iter()
                .enumerate()
                .filter(|(index, robot)| !merged[*index] && group.can_merge(robot))
                .map(|(index, robot)| (index, group.distance_to(robot)))
                .min_by_key(|(_, distance)| OrderedFloat(*distance));

            if let Some((index, _)) = closest {
                group.merge(&robots[index]);
                merged[index] = true;
            }
        }

        let new_groups: Vec<GroupedRobots> = robots
            .iter()
            .zip(&merged)
            .filter(|(_, merged)| !**merged)
            .map(|(robot, _)| GroupedRobots::new(robot, out.robot_pos))
            .collect();
        self.groups.extend(new_groups);
    }

    fn obstacles(&self) -> Vec<RobotObstacle> {
        self.groups
            .iter()
            .filter(|group| group.is_on_field() && group.is_important_obstacle())
            .map(GroupedRobots::obstacle)
            .collect()
    }
}

impl Estimator for RobotFilter {
    fn tick(
        &mut self,
        input: &EstimatorInfoIn,
        _middle: &mut EstimatorInfoMiddle,
        out: &mut EstimatorInfoOut,
    ) {
        if input.is_incapacitated {
            tracing::trace!("incapacitated, not updating robot obstacles");
        } else {
            self.update(input, out);
        }

        out.robot_obstacles = self.obstacles();
        tracing::trace!(
            groups = self.groups.len(),
            obstacles = out.robot_obstacles.len(),
            "tracked robots"
        );
    }
}
