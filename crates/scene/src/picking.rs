use foundation::math::Vec2;
use foundation::math::precision::stable_total_cmp_f64;

/// Whether `check` lies within `radius` pixels of `center` (inclusive).
pub fn pixel_in_circle(center: Vec2, check: Vec2, radius: f64) -> bool {
    let d = check - center;
    d.dot(d) <= radius * radius
}

/// Distance from `p` to the segment `a..b`, clamped to the segment ends.
///
/// Works in whatever planar space the inputs share; line picking feeds it
/// `[lng, lat]` degrees. A zero-length segment measures to `a`.
pub fn point_segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let cx = a[0] + t * dx;
    let cy = a[1] + t * dy;
    ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt()
}

/// Returns the item with the smallest `distance`.
///
/// Ordering contract:
/// - On equal distance the earlier item wins.
/// - NaN distances sort after every finite distance.
pub fn closest<T, I, F>(items: I, mut distance: F) -> Option<(T, f64)>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> f64,
{
    let mut best: Option<(T, f64)> = None;
    for item in items {
        let d = distance(&item);
        let better = match &best {
            None => true,
            Some((_, bd)) => stable_total_cmp_f64(d, *bd).is_lt(),
        };
        if better {
            best = Some((item, d));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{closest, pixel_in_circle, point_segment_distance};
    use foundation::math::Vec2;

    #[test]
    fn circle_test_is_inclusive() {
        let c = Vec2::new(10.0, 10.0);
        assert!(pixel_in_circle(c, Vec2::new(13.0, 14.0), 5.0));
        assert!(!pixel_in_circle(c, Vec2::new(13.0, 14.1), 5.0));
    }

    #[test]
    fn segment_distance_is_perpendicular_inside_segment() {
        let d = point_segment_distance([5.0, 3.0], [0.0, 0.0], [10.0, 0.0]);
        assert_eq!(d, 3.0);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let before = point_segment_distance([-3.0, 4.0], [0.0, 0.0], [10.0, 0.0]);
        let after = point_segment_distance([13.0, 4.0], [0.0, 0.0], [10.0, 0.0]);
        assert_eq!(before, 5.0);
        assert_eq!(after, 5.0);
        assert_eq!(point_segment_distance([3.0, 4.0], [0.0, 0.0], [0.0, 0.0]), 5.0);
    }

    #[test]
    fn closest_prefers_first_on_tie_and_skips_nan() {
        let items = vec![("a", 2.0), ("b", 1.0), ("c", 1.0), ("d", f64::NAN)];
        let (best, d) = closest(items.iter(), |(_, d)| *d).expect("non-empty");
        assert_eq!(best.0, "b");
        assert_eq!(d, 1.0);

        let nan_first = vec![f64::NAN, 3.0];
        let (best, _) = closest(nan_first.iter(), |d| **d).expect("non-empty");
        assert_eq!(*best, 3.0);

        let empty: Vec<f64> = Vec::new();
        assert!(closest(empty.iter(), |d| **d).is_none());
    }
}
