use core::f32::consts::{PI, TAU};
use std::time::Duration;

use gesture_ahrs::{
    CyclicAngle, EulerAngles, FilterSettings, GRAVITY, GravityCompensator, ImuSample, ManualClock,
    OrientationFilter, OrientationPipeline, QuaternionExt, strip_yaw,
};
use nalgebra::{UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

const EPSILON: f32 = 1e-5;
const DT: f32 = 0.001;

fn manual_filter() -> (OrientationFilter<ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    (OrientationFilter::with_clock(FilterSettings::default(), clock.clone()), clock)
}

fn random_vector(rng: &mut Pcg64, range: f32) -> Vector3<f32> {
    Vector3::new(
        rng.random_range(-range..range),
        rng.random_range(-range..range),
        rng.random_range(-range..range),
    )
}

/// The estimate stays a unit quaternion for arbitrary finite input
#[test]
fn test_quaternion_stays_normalised() {
    let (mut filter, clock) = manual_filter();
    let mut rng = Pcg64::seed_from_u64(42);

    for _ in 0..5000 {
        clock.advance(Duration::from_millis(1));
        let accelerometer = random_vector(&mut rng, 20.0);
        let gyroscope = random_vector(&mut rng, 10.0);
        filter.update(accelerometer, gyroscope, DT).unwrap();

        let norm = filter.quaternion().as_ref().norm();
        assert!((norm - 1.0).abs() < EPSILON, "norm drifted to {norm}");
    }
}

/// Starting tilted, a level device at rest converges to zero pitch and roll
#[test]
fn test_converges_to_gravity_at_rest() {
    let (mut filter, clock) = manual_filter();
    filter.set_quaternion(UnitQuaternion::from_euler_angles(0.4, -0.3, 0.0));

    let level = Vector3::new(0.0, 0.0, GRAVITY);
    for _ in 0..3000 {
        clock.advance(Duration::from_millis(1));
        filter.update(level, Vector3::zeros(), DT).unwrap();
    }

    let euler = filter.euler();
    assert!(euler.pitch.signed().abs() < 0.05, "pitch {}", euler.pitch);
    assert!(euler.roll.signed().abs() < 0.05, "roll {}", euler.roll);
}

/// Gain is the start-up value up to and including one second
#[test]
fn test_initialisation_gain_boundary() {
    let (mut filter, clock) = manual_filter();
    let level = Vector3::new(0.0, 0.0, GRAVITY);

    clock.set(Duration::from_secs(1));
    filter.update(level, Vector3::zeros(), DT).unwrap();
    assert_eq!(filter.applied_gain(), 10.0);

    clock.set(Duration::from_secs(1) + Duration::from_micros(1));
    filter.update(level, Vector3::zeros(), DT).unwrap();
    assert_eq!(filter.applied_gain(), 0.07);

    filter.reset();
    assert_eq!(filter.gain(), 10.0);
}

/// Rejected samples leave every piece of state untouched
#[test]
fn test_rejected_sample_leaves_state() {
    let (mut filter, clock) = manual_filter();
    clock.advance(Duration::from_millis(1));
    filter
        .update(Vector3::new(0.3, 0.1, 9.8), Vector3::new(0.1, 0.0, 0.2), DT)
        .unwrap();
    let before = (filter.quaternion(), filter.accelerometer(), filter.gyroscope(), filter.last_update());

    clock.advance(Duration::from_millis(1));
    assert!(filter.update(Vector3::new(f32::INFINITY, 0.0, 0.0), Vector3::zeros(), DT).is_err());
    assert!(filter.update(Vector3::zeros(), Vector3::zeros(), -DT).is_err());

    let after = (filter.quaternion(), filter.accelerometer(), filter.gyroscope(), filter.last_update());
    assert_eq!(before, after);
}

#[test]
fn test_cyclic_angle_always_canonical() {
    let mut rng = Pcg64::seed_from_u64(7);

    for _ in 0..1000 {
        let a = CyclicAngle::new(rng.random_range(-100.0..100.0));
        let b = CyclicAngle::new(rng.random_range(-100.0..100.0));

        for value in [a, b, a + b, a + 37.5, -a] {
            assert!((0.0..TAU).contains(&value.radians()), "{value:?} out of range");
        }
        let difference = a - b;
        assert!((-PI..PI).contains(&difference), "{difference} out of range");
    }
}

#[test]
fn test_strip_yaw_keeps_tilt() {
    let mut rng = Pcg64::seed_from_u64(11);

    for _ in 0..200 {
        let euler = EulerAngles::new(
            rng.random_range(0.0..TAU),
            rng.random_range(-1.4..1.4),
            rng.random_range(-3.0..3.0),
        );
        let (stripped, quaternion) = strip_yaw(&euler);

        assert_eq!(stripped.yaw, CyclicAngle::ZERO);
        assert_eq!(stripped.pitch, euler.pitch);
        assert_eq!(stripped.roll, euler.roll);
        assert_eq!(strip_yaw(&stripped).0, stripped);

        let recovered = quaternion.euler();
        assert!((recovered.pitch - euler.pitch).abs() < 1e-4);
        assert!((recovered.roll - euler.roll).abs() < 1e-4);
    }
}

#[test]
fn test_gravity_removed_for_any_static_tilt() {
    let compensator = GravityCompensator::default();
    let mut rng = Pcg64::seed_from_u64(3);

    for _ in 0..200 {
        let orientation = UnitQuaternion::from_euler_angles(
            rng.random_range(-PI..PI),
            rng.random_range(-1.5..1.5),
            rng.random_range(-PI..PI),
        );
        // What a motionless sensor reads in that orientation
        let reading = orientation.inverse_transform_vector(&Vector3::new(0.0, 0.0, GRAVITY));
        let linear = compensator.remove_gravity(&orientation, &reading);
        assert!(linear.norm() < 1e-4, "residual {linear:?}");
    }
}

/// One second at rest, then one second turning at 1 rad/s about z
#[test]
fn test_end_to_end_yaw_rotation() {
    let clock = ManualClock::new();
    let filter = OrientationFilter::with_clock(FilterSettings::default(), clock.clone());
    let mut pipeline = OrientationPipeline::with_filter(filter);
    let level = Vector3::new(0.0, 0.0, GRAVITY);

    let mut settled = None;
    for _ in 0..1000 {
        clock.advance(Duration::from_millis(1));
        let estimate = pipeline.process(ImuSample::new(level, Vector3::zeros()), DT).unwrap();
        assert_eq!(estimate.yaw_free_euler.yaw.radians(), 0.0);
        assert_eq!(estimate.yaw_free_euler.pitch, estimate.euler.pitch);
        assert_eq!(estimate.yaw_free_euler.roll, estimate.euler.roll);
        settled = Some(estimate);
    }
    let settled = settled.unwrap();
    assert_eq!(settled.sequence, 1000);
    assert!(settled.gravity_free_acceleration.norm() < EPSILON);

    let mut last = settled;
    for _ in 0..1000 {
        clock.advance(Duration::from_millis(1));
        last = pipeline
            .process(ImuSample::new(level, Vector3::new(0.0, 0.0, 1.0)), DT)
            .unwrap();

        assert_eq!(last.yaw_free_euler.yaw.radians(), 0.0);
        assert_eq!(last.yaw_free_euler.pitch, last.euler.pitch);
        assert_eq!(last.yaw_free_euler.roll, last.euler.roll);
    }

    let turned = last.euler.yaw - settled.euler.yaw;
    assert!((turned - 1.0).abs() < 0.1, "turned {turned} rad");
    assert!(last.euler.pitch.signed().abs() < 1e-3);
    assert!(last.euler.roll.signed().abs() < 1e-3);

    assert_eq!(last.sequence, 2000);
}
