/// Mean inter-arrival gaps at or below this are treated as clock duplicates.
const MIN_MEAN_GAP: f64 = 1e-9;

/// Arrival frequency estimate in events per second: the reciprocal of the
/// mean gap between successive timestamps (oldest first).
///
/// Returns 0.0 with fewer than two timestamps or a degenerate mean gap.
pub fn update_rate<I>(timestamps: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut iter = timestamps.into_iter();
    let Some(mut prev) = iter.next() else {
        return 0.0;
    };

    let mut total_gap = 0.0;
    let mut gaps = 0usize;
    for ts in iter {
        total_gap += ts - prev;
        gaps += 1;
        prev = ts;
    }

    if gaps == 0 {
        return 0.0;
    }
    let mean_gap = total_gap / gaps as f64;
    if mean_gap <= MIN_MEAN_GAP {
        return 0.0;
    }
    1.0 / mean_gap
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_until_two_timestamps() {
        assert_eq!(update_rate(Vec::<f64>::new()), 0.0);
        assert_eq!(update_rate([3.0]), 0.0);
    }

    #[test]
    fn uniform_spacing_gives_reciprocal() {
        let ts: Vec<f64> = (0..10).map(|i| i as f64 * 0.25).collect();
        assert!((update_rate(ts) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_timestamps_are_neutral() {
        assert_eq!(update_rate([5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn mean_of_uneven_gaps() {
        // gaps 1 and 3 -> mean 2 -> 0.5 events/s
        assert!((update_rate([0.0, 1.0, 4.0]) - 0.5).abs() < 1e-12);
    }
}
