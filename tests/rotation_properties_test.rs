//! Property tests for the rotation conversions and the linear solver

use approx::{assert_abs_diff_eq, assert_relative_eq};
use head_pose_pnp::{
    linalg::solve_6x6,
    rotation::{euler_to_rotation_matrix, rotation_matrix_to_euler, rotation_vector_to_matrix, EulerAngles},
};
use nalgebra::{Matrix3, Matrix6, Rotation3, Vector3, Vector6};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;

#[test]
fn test_rodrigues_zero_is_exact_identity() {
    assert_eq!(rotation_vector_to_matrix(&Vector3::zeros()), Matrix3::identity());
    assert_eq!(rotation_vector_to_matrix(&Vector3::new(1e-12, 0.0, -1e-12)), Matrix3::identity());
}

#[test]
fn test_rodrigues_orthonormal() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let rvec = Vector3::new(rng.gen_range(-PI..PI), rng.gen_range(-PI..PI), rng.gen_range(-PI..PI));
        let r = rotation_vector_to_matrix(&rvec);

        assert_abs_diff_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r, *Rotation3::new(rvec).matrix(), epsilon = 1e-12);
    }
}

#[test]
fn test_rodrigues_small_angles() {
    // Just above the identity shortcut the formula must stay well-behaved
    let rvec = Vector3::new(1e-9, -2e-9, 3e-9);
    let r = rotation_vector_to_matrix(&rvec);
    assert_abs_diff_eq!(r, Matrix3::identity(), epsilon = 1e-8);
    assert_abs_diff_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
}

#[test]
fn test_euler_inverse_consistency() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let angles = EulerAngles::new(
            rng.gen_range(-170.0..170.0),
            rng.gen_range(-85.0..85.0),
            rng.gen_range(-170.0..170.0),
        );
        let recovered = rotation_matrix_to_euler(&euler_to_rotation_matrix(&angles));

        assert_abs_diff_eq!(recovered.pitch, angles.pitch, epsilon = 1e-8);
        assert_abs_diff_eq!(recovered.yaw, angles.yaw, epsilon = 1e-8);
        assert_abs_diff_eq!(recovered.roll, angles.roll, epsilon = 1e-8);
    }
}

#[test]
fn test_euler_gimbal_lock_sets_roll_to_zero() {
    for yaw in [90.0, -90.0] {
        for (pitch, roll) in [(0.0, 0.0), (20.0, 35.0), (-40.0, 10.0)] {
            let original = euler_to_rotation_matrix(&EulerAngles::new(pitch, yaw, roll));
            let decomposed = rotation_matrix_to_euler(&original);

            assert_eq!(decomposed.roll, 0.0);
            assert_abs_diff_eq!(decomposed.yaw, yaw, epsilon = 1e-6);
            // The degenerate angles still describe the same rotation
            assert_abs_diff_eq!(euler_to_rotation_matrix(&decomposed), original, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_euler_of_solved_rotation_vector() {
    // Pure rotation about the camera X axis is pure pitch
    let angles = rotation_matrix_to_euler(&rotation_vector_to_matrix(&Vector3::new(0.3, 0.0, 0.0)));
    assert_relative_eq!(angles.pitch, 0.3_f64.to_degrees(), epsilon = 1e-10);
    assert_abs_diff_eq!(angles.yaw, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(angles.roll, 0.0, epsilon = 1e-12);
}

#[test]
fn test_solve_6x6_random_systems() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..200 {
        let mut a = Matrix6::from_fn(|_, _| rng.gen_range(-1.0..1.0));
        // Diagonal dominance keeps the system well conditioned
        for i in 0..6 {
            a[(i, i)] += 8.0;
        }
        let x = Vector6::from_fn(|_, _| rng.gen_range(-100.0..100.0));
        let b = a * x;

        let solved = solve_6x6(&a, &b).unwrap();
        assert_abs_diff_eq!(solved, x, epsilon = 1e-9);
    }
}

#[test]
fn test_solve_6x6_analytic() {
    let a = Matrix6::from_diagonal(&Vector6::new(2.0, 4.0, 5.0, 8.0, 10.0, 16.0));
    let b = Vector6::new(1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
    let x = solve_6x6(&a, &b).unwrap();
    assert_eq!(x, Vector6::new(0.5, 0.25, 0.2, 0.125, 0.1, 0.0625));
}

#[test]
fn test_solve_6x6_singular() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut a = Matrix6::from_fn(|_, _| rng.gen_range(-1.0..1.0));
    a.set_row(2, &nalgebra::RowVector6::zeros());
    assert!(solve_6x6(&a, &Vector6::repeat(1.0)).is_none());

    assert!(solve_6x6(&Matrix6::zeros(), &Vector6::zeros()).is_none());
}
