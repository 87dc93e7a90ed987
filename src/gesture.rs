//! Gesture recognition front-end
//!
//! Turns the published [`Estimate`] stream into fixed-width feature rows,
//! keeps a bounded window of them, and periodically hands the window to an
//! opaque [`GestureModel`]. Predictions are smoothed by majority vote before
//! a [`Gesture`] is reported.

use std::collections::VecDeque;
use std::fmt;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::estimate::Estimate;
use crate::scheduler::TaskHandle;
use crate::types::{GRAVITY, GestureSettings};

/// Floats per feature row
pub const FEATURES_PER_SAMPLE: usize = 8;

/// Motion classes the model distinguishes
///
/// Class indices 0 to 9 come from the model; [`Gesture::Unrecognized`] is
/// the sentinel for low-confidence or unknown motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gesture {
    Unrecognized,
    FlipOver,
    LongVibration,
    RotateClockwise,
    RotateCounterclockwise,
    ShakeBackward,
    ShakeForward,
    ShortVibration,
    TiltLeft,
    TiltRight,
    Still,
}

impl Gesture {
    const CLASSES: [Gesture; 10] = [
        Gesture::FlipOver,
        Gesture::LongVibration,
        Gesture::RotateClockwise,
        Gesture::RotateCounterclockwise,
        Gesture::ShakeBackward,
        Gesture::ShakeForward,
        Gesture::ShortVibration,
        Gesture::TiltLeft,
        Gesture::TiltRight,
        Gesture::Still,
    ];

    /// Map a model class index; out-of-range indices are unrecognized
    pub fn from_class_index(index: usize) -> Self {
        Self::CLASSES
            .get(index)
            .copied()
            .unwrap_or(Gesture::Unrecognized)
    }

    /// Model class index, `None` for the sentinel
    pub fn class_index(self) -> Option<usize> {
        Self::CLASSES.iter().position(|&class| class == self)
    }

    pub fn label(self) -> &'static str {
        match self {
            Gesture::Unrecognized => "Unrecognized",
            Gesture::FlipOver => "Flip Over",
            Gesture::LongVibration => "Long Vibration",
            Gesture::RotateClockwise => "Rotate Clockwise",
            Gesture::RotateCounterclockwise => "Rotate Counterclockwise",
            Gesture::ShakeBackward => "Shake Backward",
            Gesture::ShakeForward => "Shake Forward",
            Gesture::ShortVibration => "Short Vibration",
            Gesture::TiltLeft => "Tilt Left",
            Gesture::TiltRight => "Tilt Right",
            Gesture::Still => "Still",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Opaque classifier over a feature window
///
/// The window is `window_len() * 8` floats, oldest row first, laid out as
/// described on [`feature_row`].
pub trait GestureModel {
    /// Rows the model expects per inference
    fn window_len(&self) -> usize;

    /// Class index of the window, or `None` if nothing was recognized
    fn classify(&mut self, window: &[f32]) -> Option<usize>;
}

/// Feature row for one estimate
///
/// `[pitch, roll, gyro.x, gyro.y, gyro.z, accel.x/g, accel.y/g, accel.z/g]`
/// with the yaw-free pitch/roll in canonical `[0, 2π)` radians, the
/// bias-corrected gyroscope in rad/s and the gravity-free acceleration in
/// units of g.
pub fn feature_row(estimate: &Estimate) -> [f32; FEATURES_PER_SAMPLE] {
    let gyro = estimate.gyroscope;
    let accel = estimate.gravity_free_acceleration / GRAVITY;
    [
        estimate.yaw_free_euler.pitch.radians(),
        estimate.yaw_free_euler.roll.radians(),
        gyro.x,
        gyro.y,
        gyro.z,
        accel.x,
        accel.y,
        accel.z,
    ]
}

/// Bounded history of feature rows; the oldest row drops first
#[derive(Debug, Clone)]
pub struct FeatureWindow {
    rows: usize,
    buffer: VecDeque<f32>,
}

impl FeatureWindow {
    /// Window holding up to `rows` feature rows
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            buffer: VecDeque::with_capacity(rows * FEATURES_PER_SAMPLE),
        }
    }

    pub fn push(&mut self, row: [f32; FEATURES_PER_SAMPLE]) {
        self.buffer.extend(row);
        while self.buffer.len() > self.rows * FEATURES_PER_SAMPLE {
            self.buffer.pop_front();
        }
    }

    /// Number of complete rows held
    pub fn len(&self) -> usize {
        self.buffer.len() / FEATURES_PER_SAMPLE
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.rows
    }

    /// Flattened contents, oldest first
    pub fn as_slice(&mut self) -> &[f32] {
        self.buffer.make_contiguous()
    }
}

/// Feeds estimates through a [`GestureModel`] and votes on the results
///
/// # Example
/// ```
/// use gesture_ahrs::{Estimate, Gesture, GestureModel, GestureRecognizer, GestureSettings};
///
/// struct AlwaysStill;
///
/// impl GestureModel for AlwaysStill {
///     fn window_len(&self) -> usize { 10 }
///     fn classify(&mut self, _window: &[f32]) -> Option<usize> { Some(9) }
/// }
///
/// let mut recognizer = GestureRecognizer::new(AlwaysStill, GestureSettings::default());
/// let events: Vec<Gesture> = (0..40)
///     .filter_map(|_| recognizer.push(&Estimate::default()))
///     .collect();
///
/// assert_eq!(events, vec![Gesture::Still]);
/// ```
#[derive(Debug)]
pub struct GestureRecognizer<M> {
    model: M,
    settings: GestureSettings,
    window: FeatureWindow,
    /// Samples between inferences
    stride: usize,
    since_inference: usize,
    predictions: VecDeque<Gesture>,
    last_reported: Gesture,
}

impl<M: GestureModel> GestureRecognizer<M> {
    pub fn new(model: M, settings: GestureSettings) -> Self {
        let rows = model.window_len();
        // Truncation matches the model's integer stride
        let stride = ((rows as f32 * settings.update_ratio) as usize).max(1);
        Self {
            model,
            settings,
            window: FeatureWindow::new(rows),
            stride,
            since_inference: 0,
            predictions: VecDeque::with_capacity(settings.history_size),
            last_reported: Gesture::Unrecognized,
        }
    }

    /// Add one estimate; returns a gesture when a new one is confirmed
    pub fn push(&mut self, estimate: &Estimate) -> Option<Gesture> {
        self.window.push(feature_row(estimate));

        self.since_inference += 1;
        if self.since_inference < self.stride || !self.window.is_full() {
            return None;
        }
        self.since_inference = 0;

        let predicted = self
            .model
            .classify(self.window.as_slice())
            .map_or(Gesture::Unrecognized, Gesture::from_class_index);
        self.predictions.push_back(predicted);
        while self.predictions.len() > self.settings.history_size {
            self.predictions.pop_front();
        }

        let consensus = self.consensus();
        debug!(%predicted, %consensus, "Gesture inference");

        if consensus != Gesture::Unrecognized && consensus != self.last_reported {
            self.last_reported = consensus;
            return Some(consensus);
        }
        None
    }

    /// Majority vote over the recent predictions
    ///
    /// Ties go to the lowest class, with the sentinel lowest of all.
    fn consensus(&self) -> Gesture {
        let mut best = (Gesture::Unrecognized, 0usize);
        let mut candidates: Vec<Gesture> = self.predictions.iter().copied().collect();
        candidates.sort_unstable();
        candidates.dedup();

        for candidate in candidates {
            let votes = self.predictions.iter().filter(|&&p| p == candidate).count();
            if votes > best.1 {
                best = (candidate, votes);
            }
        }

        if best.1 >= self.settings.min_consensus_votes {
            best.0
        } else {
            Gesture::Unrecognized
        }
    }

    /// Most recently reported gesture
    pub fn last_reported(&self) -> Gesture {
        self.last_reported
    }

    pub fn window(&self) -> &FeatureWindow {
        &self.window
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

/// Run a recognizer as a background task fed by the estimate channel
///
/// The task wakes on every estimate change; like the filter gate, changes
/// that arrive while it is busy coalesce into the newest one. Confirmed
/// gestures are sent on `events`; if that channel is full the gesture is
/// dropped with a warning. The task ends on shutdown or when the estimate
/// publisher goes away, and hands the recognizer back.
pub fn spawn_recognizer<M>(
    mut recognizer: GestureRecognizer<M>,
    mut estimates: watch::Receiver<Estimate>,
    events: mpsc::Sender<Gesture>,
) -> TaskHandle<GestureRecognizer<M>>
where
    M: GestureModel + Send + 'static,
{
    let (shutdown_tx, mut shutdown) = oneshot::channel::<()>();

    let join = tokio::spawn(async move {
        info!("Gesture recognizer started");
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                changed = estimates.changed() => {
                    if changed.is_err() {
                        debug!("Estimate publisher closed");
                        break;
                    }
                    let estimate = *estimates.borrow_and_update();
                    if let Some(gesture) = recognizer.push(&estimate) {
                        info!(%gesture, "New gesture");
                        if let Err(e) = events.try_send(gesture) {
                            warn!(%gesture, error = %e, "Dropping gesture event");
                        }
                    }
                }
            }
        }
        info!("Gesture recognizer stopped");
        recognizer
    });

    TaskHandle::new(shutdown_tx, join)
}

/// Event channel sized from the settings
pub fn gesture_channel(
    settings: &GestureSettings,
) -> (mpsc::Sender<Gesture>, mpsc::Receiver<Gesture>) {
    mpsc::channel(settings.event_capacity.max(1))
}
