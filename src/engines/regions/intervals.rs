use serde::{Deserialize, Serialize};

/// A `[low, high)` stretch of one feature axis carrying a signed score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedSegment {
    pub low: f64,
    pub high: f64,
    pub weight: f64,
}

impl WeightedSegment {
    pub fn new(low: f64, high: f64, weight: f64) -> Self {
        Self { low, high, weight }
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.low && x < self.high
    }
}

impl From<(f64, f64, f64)> for WeightedSegment {
    fn from((low, high, weight): (f64, f64, f64)) -> Self {
        Self::new(low, high, weight)
    }
}

/// Merge overlapping weighted segments into adjacent, non-overlapping ones.
///
/// Every input endpoint becomes an output boundary. Each output segment carries
/// the summed weight of all input segments covering it; gaps between inputs are
/// kept as zero-weight segments. Output is sorted by `low`.
pub fn merge_weighted_segments(segments: &[WeightedSegment]) -> Vec<WeightedSegment> {
    // (a, b, w) becomes +w at a and -w at b
    let mut deltas: Vec<(f64, f64)> = segments
        .iter()
        .flat_map(|s| [(s.low, s.weight), (s.high, -s.weight)])
        .collect();

    deltas.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged = Vec::new();
    let mut running_weight = 0.0;

    for window in deltas.windows(2) {
        let (point, delta) = window[0];
        let next_point = window[1].0;
        running_weight += delta;

        // Same-position deltas are all summed before a segment is emitted
        if point != next_point {
            merged.push(WeightedSegment::new(point, next_point, running_weight));
        }
    }

    merged
}

/// Summed weight of every segment covering `x`.
pub fn weight_at(segments: &[WeightedSegment], x: f64) -> f64 {
    segments
        .iter()
        .filter(|s| s.contains(x))
        .map(|s| s.weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(raw: &[(f64, f64, f64)]) -> Vec<WeightedSegment> {
        raw.iter().copied().map(WeightedSegment::from).collect()
    }

    #[test]
    fn test_disjoint_segments_keep_gap() {
        let merged = merge_weighted_segments(&segs(&[(1.0, 2.0, 3.0), (3.0, 4.0, 2.0)]));
        assert_eq!(merged, segs(&[(1.0, 2.0, 3.0), (2.0, 3.0, 0.0), (3.0, 4.0, 2.0)]));
    }

    #[test]
    fn test_adjoining_segments() {
        let merged = merge_weighted_segments(&segs(&[(1.0, 2.0, 3.0), (2.0, 3.0, 2.0)]));
        assert_eq!(merged, segs(&[(1.0, 2.0, 3.0), (2.0, 3.0, 2.0)]));
    }

    #[test]
    fn test_simple_overlap() {
        let merged = merge_weighted_segments(&segs(&[(1.0, 3.0, 3.0), (2.0, 4.0, 2.0)]));
        assert_eq!(merged, segs(&[(1.0, 2.0, 3.0), (2.0, 3.0, 5.0), (3.0, 4.0, 2.0)]));
    }

    #[test]
    fn test_identical_endpoints() {
        let merged = merge_weighted_segments(&segs(&[(1.0, 3.0, 1.0), (1.0, 3.0, 2.0)]));
        assert_eq!(merged, segs(&[(1.0, 3.0, 3.0)]));
    }

    #[test]
    fn test_nested_segment() {
        let merged = merge_weighted_segments(&segs(&[(1.0, 4.0, 1.0), (2.0, 3.0, 2.0)]));
        assert_eq!(merged, segs(&[(1.0, 2.0, 1.0), (2.0, 3.0, 3.0), (3.0, 4.0, 1.0)]));
    }

    #[test]
    fn test_three_way_overlap() {
        let merged = merge_weighted_segments(&segs(&[
            (1.0, 4.0, 1.0),
            (2.0, 5.0, 2.0),
            (3.0, 6.0, 3.0),
        ]));
        assert_eq!(
            merged,
            segs(&[
                (1.0, 2.0, 1.0),
                (2.0, 3.0, 3.0),
                (3.0, 4.0, 6.0),
                (4.0, 5.0, 5.0),
                (5.0, 6.0, 3.0),
            ])
        );
    }

    #[test]
    fn test_empty_and_single() {
        assert!(merge_weighted_segments(&[]).is_empty());
        let single = segs(&[(0.5, 0.75, -2.0)]);
        assert_eq!(merge_weighted_segments(&single), single);
    }

    #[test]
    fn test_negative_weights_cancel() {
        let merged = merge_weighted_segments(&segs(&[(0.0, 2.0, 4.0), (1.0, 2.0, -4.0)]));
        assert_eq!(merged, segs(&[(0.0, 1.0, 4.0), (1.0, 2.0, 0.0)]));
    }
}
