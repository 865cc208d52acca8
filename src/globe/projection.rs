use glam::DVec3;

/// Places a point given in degrees on a sphere of `radius` around the origin.
///
/// Latitude lifts the point towards the poles along +Y, longitude turns it
/// around the polar axis starting from +Z towards +X. NaN in, NaN out.
pub fn to_cartesian(radius: f64, longitude: f64, latitude: f64) -> DVec3 {
    let phi = longitude.to_radians();
    let theta = latitude.to_radians();

    DVec3::new(
        phi.sin() * theta.cos(),
        theta.sin(),
        phi.cos() * theta.cos(),
    ) * radius
}

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use rstest::rstest;

    use super::to_cartesian;

    const EPSILON: f64 = 1e-9;

    #[rstest]
    #[case(6.0, 0.0, 0.0)]
    #[case(6.0, 180.0, 0.0)]
    #[case(6.0, -73.5, 41.2)]
    #[case(6.02, 12.25, -89.9)]
    #[case(1.0, 359.0, 90.0)]
    #[case(100.0, -180.0, -45.0)]
    fn preserves_radius(#[case] radius: f64, #[case] longitude: f64, #[case] latitude: f64) {
        let p = to_cartesian(radius, longitude, latitude);
        assert!((p.length() - radius).abs() < EPSILON);
    }

    #[test]
    fn axes_follow_longitude_and_latitude() {
        assert!(to_cartesian(2.0, 0.0, 0.0).abs_diff_eq(DVec3::new(0.0, 0.0, 2.0), EPSILON));
        assert!(to_cartesian(2.0, 90.0, 0.0).abs_diff_eq(DVec3::new(2.0, 0.0, 0.0), EPSILON));
        assert!(to_cartesian(2.0, 0.0, 90.0).abs_diff_eq(DVec3::new(0.0, 2.0, 0.0), EPSILON));
        assert!(to_cartesian(2.0, 42.0, -90.0).abs_diff_eq(DVec3::new(0.0, -2.0, 0.0), EPSILON));
    }

    #[test]
    fn nan_propagates() {
        assert!(to_cartesian(6.0, f64::NAN, 0.0).is_nan());
    }
}
