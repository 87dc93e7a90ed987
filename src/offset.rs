//! One-time gyroscope bias estimation

use core::time::Duration;

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::calibration::GyroBias;
use crate::types::CalibrationSettings;

/// Progress of a [`BiasCalibrator`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStatus {
    /// Waiting for the device to settle
    Settling,
    /// Averaging stationary readings
    Collecting,
    /// Stationary window complete, waiting for the finish mark
    Holding,
    /// Routine finished
    Complete(CalibrationOutcome),
}

/// Result of a finished calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    /// Averaged residual was large enough; this is the new total bias
    Updated(GyroBias),
    /// Existing bias is already good enough
    Unchanged,
}

/// Stationary gyroscope bias calibration
///
/// Feed it bias-corrected gyroscope readings with their timestamps. The
/// device must stay still: any step between consecutive readings above the
/// motion threshold restarts the stationary window. Readings between the
/// settle time and the end of the collection window are averaged; once the
/// finish time is reached the average residual is folded into the existing
/// bias if it is worth correcting.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use nalgebra::Vector3;
/// use gesture_ahrs::{BiasCalibrator, CalibrationOutcome, CalibrationSettings, CalibrationStatus, GyroBias};
///
/// let mut calibrator = BiasCalibrator::new(GyroBias::zero(), CalibrationSettings::default());
/// let residual = Vector3::new(0.02, 0.0, -0.01);
///
/// let mut status = CalibrationStatus::Settling;
/// for ms in (0..=36_000).step_by(10) {
///     status = calibrator.update(residual, Duration::from_millis(ms));
/// }
///
/// match status {
///     CalibrationStatus::Complete(CalibrationOutcome::Updated(bias)) => {
///         assert!((bias.bias() - residual).norm() < 1e-4);
///     }
///     other => panic!("unexpected status {other:?}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BiasCalibrator {
    settings: CalibrationSettings,
    /// Bias the incoming readings were already corrected with
    current: GyroBias,
    /// Start of the current stationary window
    window_start: Option<Duration>,
    /// Previous reading, for motion detection
    previous: Option<Vector3<f32>>,
    /// Accumulated readings (f64 to keep precision over ~25k samples)
    sum: Vector3<f64>,
    count: u32,
    /// Result once finished; further updates are ignored
    outcome: Option<CalibrationOutcome>,
}

impl BiasCalibrator {
    pub fn new(current: GyroBias, settings: CalibrationSettings) -> Self {
        Self {
            settings,
            current,
            window_start: None,
            previous: None,
            sum: Vector3::zeros(),
            count: 0,
            outcome: None,
        }
    }

    /// Feed one reading taken at `timestamp`
    pub fn update(&mut self, gyroscope: Vector3<f32>, timestamp: Duration) -> CalibrationStatus {
        if let Some(outcome) = self.outcome {
            return CalibrationStatus::Complete(outcome);
        }

        let moved = self.previous.is_some_and(|previous| {
            let step = gyroscope - previous;
            step.iter()
                .zip(self.settings.motion_threshold)
                .any(|(delta, threshold)| delta.abs() > threshold)
        });
        self.previous = Some(gyroscope);

        if moved {
            if self.count > 0 {
                debug!(samples = self.count, "Motion detected, restarting gyroscope calibration");
            }
            self.restart(timestamp);
            return CalibrationStatus::Settling;
        }

        let start = *self.window_start.get_or_insert(timestamp);
        let stationary = timestamp.saturating_sub(start);

        if stationary > self.settings.finish_after {
            let outcome = self.finish();
            self.outcome = Some(outcome);
            return CalibrationStatus::Complete(outcome);
        }

        if stationary > self.settings.settle_time && stationary < self.settings.collect_until {
            self.sum += gyroscope.cast::<f64>();
            self.count += 1;
            return CalibrationStatus::Collecting;
        }

        if stationary <= self.settings.settle_time {
            CalibrationStatus::Settling
        } else {
            CalibrationStatus::Holding
        }
    }

    /// Number of readings averaged so far in the current window
    pub fn samples(&self) -> u32 {
        self.count
    }

    /// Result once the routine has finished
    pub fn outcome(&self) -> Option<CalibrationOutcome> {
        self.outcome
    }

    fn restart(&mut self, timestamp: Duration) {
        self.window_start = Some(timestamp);
        self.sum = Vector3::zeros();
        self.count = 0;
    }

    fn finish(&self) -> CalibrationOutcome {
        if self.count == 0 {
            return CalibrationOutcome::Unchanged;
        }

        let mean = (self.sum / f64::from(self.count)).cast::<f32>();
        if mean.iter().any(|c| c.abs() > self.settings.min_correction) {
            let updated = GyroBias::new(self.current.bias() + mean);
            info!(
                x = updated.bias().x,
                y = updated.bias().y,
                z = updated.bias().z,
                samples = self.count,
                "Gyroscope calibration complete"
            );
            CalibrationOutcome::Updated(updated)
        } else {
            info!(samples = self.count, "Gyroscope calibration not needed");
            CalibrationOutcome::Unchanged
        }
    }
}
