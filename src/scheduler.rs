//! Gate-paced filter task
//!
//! Sensors publish into a single-slot mailbox. Gyroscope updates bump the
//! mailbox version, which is the readiness gate; accelerometer updates are
//! stored silently. The filter task sleeps until the version moves, copies
//! the latest sample pair, runs one [`OrientationPipeline`] cycle and
//! republishes the [`Estimate`] on a latest-value channel.
//!
//! The gate is binary: any number of gyroscope updates since the last cycle,
//! whether the task was busy or already parked, release exactly one cycle on
//! the newest sample. No backlog builds up.

use std::sync::Arc;

use nalgebra::Vector3;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::TaskError;
use crate::estimate::{Estimate, OrientationPipeline};
use crate::types::{ImuSample, SchedulerSettings};

/// Producer side of the sensor mailbox
///
/// Cheap to clone; every clone writes into the same slot.
#[derive(Debug, Clone)]
pub struct SensorLink {
    samples: Arc<watch::Sender<ImuSample>>,
}

impl SensorLink {
    /// Store a new accelerometer reading without starting a cycle
    pub fn publish_accel(&self, accelerometer: Vector3<f32>) {
        // Stored without a version bump, so the filter task stays asleep
        self.samples.send_if_modified(|sample| {
            sample.accelerometer = accelerometer;
            false
        });
    }

    /// Store a new gyroscope reading and release the gate
    pub fn publish_gyro(&self, gyroscope: Vector3<f32>) {
        self.samples.send_modify(|sample| sample.gyroscope = gyroscope);
    }

    /// Store both readings at once and release the gate
    pub fn publish(&self, sample: ImuSample) {
        self.samples.send_replace(sample);
    }

    /// Latest sample pair in the mailbox
    pub fn latest(&self) -> ImuSample {
        *self.samples.borrow()
    }
}

/// Handle to a stoppable background task
///
/// [`shutdown`](Self::shutdown) asks the task to stop after its current
/// cycle and returns what it owned. Dropping the handle also stops it.
#[derive(Debug)]
pub struct TaskHandle<T> {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(shutdown: oneshot::Sender<()>, join: JoinHandle<T>) -> Self {
        Self {
            shutdown: Some(shutdown),
            join,
        }
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(mut self) -> Result<T, TaskError> {
        if let Some(shutdown) = self.shutdown.take() {
            // Err only means the task already stopped on its own
            let _ = shutdown.send(());
        }
        Ok((&mut self.join).await?)
    }

    /// True once the task has returned
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Paces an [`OrientationPipeline`] to gyroscope arrivals
///
/// # Example
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use nalgebra::Vector3;
/// use gesture_ahrs::{ImuSample, OrientationPipeline, SampleScheduler};
///
/// let scheduler = SampleScheduler::new(OrientationPipeline::new());
/// let sensors = scheduler.sensor_link();
/// let mut estimates = scheduler.subscribe();
/// let task = scheduler.spawn();
///
/// sensors.publish(ImuSample::new(Vector3::new(0.0, 0.0, 9.84), Vector3::zeros()));
/// estimates.changed().await.unwrap();
/// assert_eq!(estimates.borrow().sequence, 1);
///
/// let pipeline = task.shutdown().await.unwrap();
/// assert_eq!(pipeline.cycles(), 1);
/// # }
/// ```
pub struct SampleScheduler<C> {
    pipeline: OrientationPipeline<C>,
    settings: SchedulerSettings,
    samples_tx: Arc<watch::Sender<ImuSample>>,
    samples_rx: watch::Receiver<ImuSample>,
    estimates: watch::Sender<Estimate>,
    last_cycle: Option<core::time::Duration>,
}

impl<C: Clock> SampleScheduler<C> {
    pub fn new(pipeline: OrientationPipeline<C>) -> Self {
        Self::with_settings(pipeline, SchedulerSettings::default())
    }

    pub fn with_settings(pipeline: OrientationPipeline<C>, settings: SchedulerSettings) -> Self {
        let (samples_tx, samples_rx) = watch::channel(ImuSample::default());
        let (estimates, _) = watch::channel(Estimate::default());
        Self {
            pipeline,
            settings,
            samples_tx: Arc::new(samples_tx),
            samples_rx,
            estimates,
            last_cycle: None,
        }
    }

    /// Producer handle for sensor drivers
    pub fn sensor_link(&self) -> SensorLink {
        SensorLink {
            samples: Arc::clone(&self.samples_tx),
        }
    }

    /// Latest-value subscription to published estimates
    pub fn subscribe(&self) -> watch::Receiver<Estimate> {
        self.estimates.subscribe()
    }

    /// Run one cycle on the latest mailbox contents
    ///
    /// Returns the published estimate, or `None` if the filter rejected the
    /// sample (logged, nothing published).
    pub fn run_cycle(&mut self) -> Option<Estimate> {
        let sample = *self.samples_rx.borrow_and_update();

        let now = self.pipeline.filter().clock().now();
        let delta_time = match self.last_cycle {
            Some(previous) => now.saturating_sub(previous),
            None => self.settings.nominal_period,
        };
        self.last_cycle = Some(now);

        match self.pipeline.process(sample, delta_time.as_secs_f32()) {
            Ok(estimate) => {
                self.estimates.send_replace(estimate);
                if self.settings.heartbeat_cycles > 0
                    && estimate.sequence % self.settings.heartbeat_cycles == 0
                {
                    debug!(
                        cycles = estimate.sequence,
                        rejected = self.pipeline.rejected_samples(),
                        "Orientation filter running"
                    );
                }
                Some(estimate)
            }
            Err(e) => {
                warn!(error = %e, ?sample, "Rejected IMU sample");
                None
            }
        }
    }

    pub fn pipeline(&self) -> &OrientationPipeline<C> {
        &self.pipeline
    }

    /// Start the filter task on the current tokio runtime
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> TaskHandle<OrientationPipeline<C>>
    where
        C: Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(self.run(shutdown_rx));
        TaskHandle::new(shutdown_tx, join)
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> OrientationPipeline<C> {
        info!("Orientation filter task started");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                released = self.samples_rx.changed() => {
                    if released.is_err() {
                        break;
                    }
                    self.run_cycle();
                }
            }
        }

        info!(
            cycles = self.pipeline.cycles(),
            rejected = self.pipeline.rejected_samples(),
            "Orientation filter task stopped"
        );
        self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::filter::OrientationFilter;
    use crate::types::FilterSettings;
    use core::time::Duration;

    fn manual_scheduler() -> (SampleScheduler<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let filter = OrientationFilter::with_clock(FilterSettings::default(), clock.clone());
        (SampleScheduler::new(OrientationPipeline::with_filter(filter)), clock)
    }

    #[test]
    fn test_accel_update_alone_is_stored_but_not_signalled() {
        let (scheduler, _clock) = manual_scheduler();
        let link = scheduler.sensor_link();

        link.publish_accel(Vector3::new(0.0, 0.0, 9.84));
        assert_eq!(link.latest().accelerometer, Vector3::new(0.0, 0.0, 9.84));
        assert_eq!(link.latest().gyroscope, Vector3::zeros());
        assert!(!scheduler.samples_rx.has_changed().unwrap());

        link.publish_gyro(Vector3::new(0.0, 0.0, 0.1));
        assert!(scheduler.samples_rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_signals_to_parked_task_release_one_cycle() {
        let (scheduler, clock) = manual_scheduler();
        let link = scheduler.sensor_link();
        let mut estimates = scheduler.subscribe();
        let task = scheduler.spawn();

        // Let the task park on the gate
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        clock.advance(Duration::from_millis(1));
        link.publish(ImuSample::new(Vector3::new(0.0, 0.0, 9.84), Vector3::new(0.0, 0.0, 0.1)));
        link.publish(ImuSample::new(Vector3::new(0.0, 0.0, 9.84), Vector3::new(0.0, 0.0, 0.2)));
        link.publish_gyro(Vector3::new(0.0, 0.0, 0.3));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let estimate = *estimates.borrow_and_update();
        assert_eq!(estimate.sequence, 1);
        assert_eq!(estimate.gyroscope, Vector3::new(0.0, 0.0, 0.3));
        assert!(!estimates.has_changed().unwrap());

        let pipeline = task.shutdown().await.unwrap();
        assert_eq!(pipeline.cycles(), 1);
    }

    #[test]
    fn test_time_step_is_measured_between_cycles() {
        let (mut scheduler, clock) = manual_scheduler();
        let link = scheduler.sensor_link();
        link.publish(ImuSample::new(Vector3::new(0.0, 0.0, 9.84), Vector3::zeros()));

        let first = scheduler.run_cycle().unwrap();
        assert!((first.delta_time - 0.001).abs() < 1e-9);

        clock.advance(Duration::from_micros(2500));
        let second = scheduler.run_cycle().unwrap();
        assert!((second.delta_time - 0.0025).abs() < 1e-7);
    }

    #[test]
    fn test_rejected_cycle_publishes_nothing() {
        let (mut scheduler, _clock) = manual_scheduler();
        let estimates = scheduler.subscribe();
        let link = scheduler.sensor_link();

        link.publish(ImuSample::new(Vector3::new(0.0, f32::NAN, 9.84), Vector3::zeros()));
        assert!(scheduler.run_cycle().is_none());
        assert_eq!(estimates.borrow().sequence, 0);
        assert_eq!(scheduler.pipeline().rejected_samples(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_returns_pipeline() {
        let (scheduler, _clock) = manual_scheduler();
        let task = scheduler.spawn();
        tokio::task::yield_now().await;

        let pipeline = task.shutdown().await.unwrap();
        assert_eq!(pipeline.cycles(), 0);
    }
}
