//! Boundary to the external pose/GPS subsystem.

use serde::{Deserialize, Serialize};

/// Position/motion sample captured at the consumer at packet arrival time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub velocity: f32,
    pub latitude: f64,
    pub longitude: f64,
}

/// Source of pose/GPS samples.
///
/// The actual pose subsystem is an external collaborator; the consumer only
/// needs the latest sample on demand. Implementations must be cheap and
/// non-blocking relative to packet arrival rate.
pub trait PoseSource: Send + Sync + 'static {
    fn sample(&self) -> PoseSample;
}

/// Fixed pose source for bench setups without a pose subsystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPose(pub PoseSample);

impl PoseSource for StaticPose {
    fn sample(&self) -> PoseSample {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_pose_returns_configured_sample() {
        let pose = StaticPose(PoseSample { x: 1.5, latitude: 59.35, ..PoseSample::default() });
        let sample = pose.sample();
        assert_eq!(sample.x, 1.5);
        assert_eq!(sample.latitude, 59.35);
        assert_eq!(sample.velocity, 0.0);
    }
}
