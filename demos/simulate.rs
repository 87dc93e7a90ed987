//! Simulated device: feeds a synthetic motion script through the filter
//! task and a toy gesture model, printing every recognized gesture.
//!
//! ```text
//! RUST_LOG=gesture_ahrs=debug cargo run --example simulate
//! ```

use std::time::Duration;

use gesture_ahrs::gesture::{FEATURES_PER_SAMPLE, gesture_channel};
use gesture_ahrs::{
    GRAVITY, Gesture, GestureModel, GestureRecognizer, GestureSettings, GyroBias, OrientationPipeline,
    SampleScheduler, spawn_recognizer,
};
use nalgebra::Vector3;
use tracing::info;

const SAMPLE_PERIOD: Duration = Duration::from_millis(1);

/// Classifies by mean yaw rate over the window
struct YawRateModel;

impl GestureModel for YawRateModel {
    fn window_len(&self) -> usize {
        200
    }

    fn classify(&mut self, window: &[f32]) -> Option<usize> {
        let rows = window.len() / FEATURES_PER_SAMPLE;
        let mean_rate = window
            .chunks_exact(FEATURES_PER_SAMPLE)
            .map(|row| row[4])
            .sum::<f32>()
            / rows as f32;

        let gesture = if mean_rate > 0.5 {
            Gesture::RotateCounterclockwise
        } else if mean_rate < -0.5 {
            Gesture::RotateClockwise
        } else if mean_rate.abs() < 0.05 {
            Gesture::Still
        } else {
            return None;
        };
        gesture.class_index()
    }
}

/// Angular rate for each millisecond of the script
fn motion_script() -> impl Iterator<Item = Vector3<f32>> {
    let still = std::iter::repeat_n(Vector3::zeros(), 1500);
    let left = std::iter::repeat_n(Vector3::new(0.0, 0.0, 1.5), 1000);
    let settle = std::iter::repeat_n(Vector3::zeros(), 1000);
    let right = std::iter::repeat_n(Vector3::new(0.0, 0.0, -1.5), 1000);
    still.chain(left).chain(settle.clone()).chain(right).chain(settle)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simulate=info,gesture_ahrs=info".into()),
        )
        .init();

    let calibration_path = std::env::temp_dir().join("gesture-ahrs-simulate.bin");
    let gyro_bias = GyroBias::load_or_default(&calibration_path);

    let scheduler = SampleScheduler::new(OrientationPipeline::new().with_gyro_bias(gyro_bias));
    let sensors = scheduler.sensor_link();

    let settings = GestureSettings::default();
    let (events_tx, mut events_rx) = gesture_channel(&settings);
    let recognizer = spawn_recognizer(
        GestureRecognizer::new(YawRateModel, settings),
        scheduler.subscribe(),
        events_tx,
    );
    let filter = scheduler.spawn();

    let printer = tokio::spawn(async move {
        while let Some(gesture) = events_rx.recv().await {
            println!("gesture: {gesture}");
        }
    });

    let mut ticker = tokio::time::interval(SAMPLE_PERIOD);
    for gyroscope in motion_script() {
        ticker.tick().await;
        sensors.publish_accel(Vector3::new(0.0, 0.0, GRAVITY) + gyroscope * 0.01);
        sensors.publish_gyro(gyroscope + gyro_bias.bias());
    }

    let pipeline = filter.shutdown().await?;
    info!(
        cycles = pipeline.cycles(),
        rejected = pipeline.rejected_samples(),
        yaw = %pipeline.filter().euler().yaw,
        "Simulation finished"
    );

    // Stopping the recognizer drops the event sender and ends the printer
    recognizer.shutdown().await?;
    printer.await?;

    gyro_bias.save(&calibration_path)?;
    Ok(())
}
