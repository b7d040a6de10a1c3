use common::{BookSnapshot, Level};

/// Denominators at or below this are treated as an empty book.
const MIN_DEPTH_VOLUME: f64 = 1e-12;

/// Total quantity across the first `depth` levels of one side.
pub fn depth_volume(levels: &[Level], depth: usize) -> f64 {
    levels.iter().take(depth).map(|l| l.qty).sum()
}

/// Depth imbalance over the top `depth` levels:
/// `(bid_vol - ask_vol) / (bid_vol + ask_vol)`.
///
/// Always in [-1, 1]. Returns 0.0 when both sides together hold no
/// meaningful volume.
pub fn imbalance(snapshot: &BookSnapshot, depth: usize) -> f64 {
    let bid_vol = depth_volume(snapshot.bids(), depth);
    let ask_vol = depth_volume(snapshot.asks(), depth);
    let total = bid_vol + ask_vol;
    if total <= MIN_DEPTH_VOLUME {
        return 0.0;
    }
    (bid_vol - ask_vol) / total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(bids: &[[f64; 2]], asks: &[[f64; 2]]) -> BookSnapshot {
        BookSnapshot::new(
            0.0,
            bids.iter().copied().map(Level::from).collect(),
            asks.iter().copied().map(Level::from).collect(),
        )
        .unwrap()
    }

    #[test]
    fn balanced_book_is_zero() {
        let s = snap(&[[100.0, 5.0], [99.0, 5.0]], &[[101.0, 5.0], [102.0, 5.0]]);
        assert!(imbalance(&s, 2).abs() < 1e-9);
    }

    #[test]
    fn only_top_levels_count() {
        // The deep bid level would flip the sign if it were included.
        let s = snap(&[[100.0, 1.0], [99.0, 100.0]], &[[101.0, 3.0], [102.0, 1.0]]);
        assert!((imbalance(&s, 1) - (1.0 - 3.0) / 4.0).abs() < 1e-12);
        assert!(imbalance(&s, 2) > 0.0);
    }

    #[test]
    fn one_sided_book_hits_bounds() {
        let bids_only = snap(&[[100.0, 2.0]], &[]);
        assert_eq!(imbalance(&bids_only, 5), 1.0);
        let asks_only = snap(&[], &[[101.0, 2.0]]);
        assert_eq!(imbalance(&asks_only, 5), -1.0);
    }

    #[test]
    fn empty_volume_is_neutral() {
        let s = snap(&[[100.0, 0.0]], &[[101.0, 0.0]]);
        assert_eq!(imbalance(&s, 5), 0.0);
        let empty = snap(&[], &[]);
        assert_eq!(imbalance(&empty, 5), 0.0);
    }
}
