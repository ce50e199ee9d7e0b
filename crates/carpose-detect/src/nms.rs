use carpose_3d::ops::euclidean_distance;
use carpose_pose::CarPose;

/// Remove detections that have a more confident neighbour closer than `dist_thresh` meters.
///
/// Every pair is compared on the confidences the detections arrived with, so
/// the result does not depend on the input order. Suppression is not
/// transitive: a detection suppressed by a stronger one still suppresses its own
/// weaker neighbours. Detections with equal confidence never suppress each other.
///
/// A pass that lowers confidences while it walks the list gives different,
/// order-dependent results; this one never modifies a confidence.
///
/// # Arguments
///
/// * `detections` - The decoded detections; a missing confidence counts as 0.
/// * `dist_thresh` - Distance between car centers below which two detections are duplicates.
///
/// # Returns
///
/// The surviving detections in their input order.
pub fn remove_neighbors(detections: Vec<CarPose>, dist_thresh: f64) -> Vec<CarPose> {
    let confidences = detections
        .iter()
        .map(|d| d.confidence.unwrap_or(0.0))
        .collect::<Vec<_>>();
    let centers = detections
        .iter()
        .map(|d| d.position.to_array())
        .collect::<Vec<_>>();

    let suppressed = (0..detections.len())
        .map(|i| {
            (0..detections.len()).any(|j| {
                i != j
                    && confidences[i] < confidences[j]
                    && euclidean_distance(&centers[i], &centers[j]) < dist_thresh
            })
        })
        .collect::<Vec<_>>();

    detections
        .into_iter()
        .zip(suppressed)
        .filter_map(|(d, s)| (!s).then_some(d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use carpose_pose::{Orientation, Position};

    fn det(x: f64, z: f64, confidence: f64) -> CarPose {
        CarPose::detection(Position::new(x, 1.0, z), Orientation::default(), confidence)
    }

    fn confidences(detections: &[CarPose]) -> Vec<f64> {
        detections.iter().filter_map(|d| d.confidence).collect()
    }

    #[test]
    fn test_close_pair_keeps_stronger() {
        let kept = remove_neighbors(vec![det(0.0, 20.0, 0.3), det(1.0, 20.0, 0.9)], 2.0);
        assert_eq!(confidences(&kept), vec![0.9]);
    }

    #[test]
    fn test_distant_pair_keeps_both() {
        let kept = remove_neighbors(vec![det(0.0, 20.0, 0.9), det(5.0, 20.0, 0.3)], 2.0);
        assert_eq!(confidences(&kept), vec![0.9, 0.3]);
    }

    #[test]
    fn test_equal_confidence_keeps_both() {
        let kept = remove_neighbors(vec![det(0.0, 20.0, 0.5), det(0.5, 20.0, 0.5)], 2.0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_chain_is_not_transitive() {
        // b is suppressed by a, and c is still suppressed by b
        let a = det(0.0, 20.0, 0.9);
        let b = det(1.5, 20.0, 0.5);
        let c = det(3.0, 20.0, 0.3);
        let kept = remove_neighbors(vec![c, b, a], 2.0);
        assert_eq!(confidences(&kept), vec![0.9]);
    }

    #[test]
    fn test_order_independent() {
        let detections = vec![
            det(0.0, 20.0, 0.4),
            det(1.0, 20.5, 0.8),
            det(10.0, 40.0, 0.6),
            det(10.5, 41.0, 0.7),
            det(-8.0, 15.0, 0.2),
        ];
        let forward = remove_neighbors(detections.clone(), 2.0);
        let mut reversed_input = detections;
        reversed_input.reverse();
        let mut backward = remove_neighbors(reversed_input, 2.0);
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(confidences(&forward), vec![0.8, 0.7, 0.2]);
    }

    #[test]
    fn test_empty() {
        assert!(remove_neighbors(Vec::new(), 2.0).is_empty());
    }
}
