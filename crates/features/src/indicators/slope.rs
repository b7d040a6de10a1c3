use common::Level;

const MIN_MEAN_QTY: f64 = 1e-12;

/// Concentration of size at the top of one book side.
///
/// Quantity at the best level divided by the mean quantity of the first
/// `depth` levels. Values above 1 mean the side is front-loaded, below 1
/// that size sits deeper in the book. An empty side, or one whose mean
/// quantity is effectively zero, yields 0.0.
pub fn side_slope(levels: &[Level], depth: usize) -> f64 {
    let top = &levels[..depth.min(levels.len())];
    let Some(best) = top.first() else {
        return 0.0;
    };
    let mean = top.iter().map(|l| l.qty).sum::<f64>() / top.len() as f64;
    if mean <= MIN_MEAN_QTY {
        return 0.0;
    }
    best.qty / mean
}
