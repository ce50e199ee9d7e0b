use crate::{
    error::LabelError,
    pose::{CarPose, Orientation, Position},
};

/// Number of tokens per instance in a label string.
pub const LABEL_WIDTH: usize = 7;

fn parse_tokens(s: &str) -> Result<Vec<f64>, LabelError> {
    let tokens = s.split_whitespace().collect::<Vec<_>>();
    if tokens.len() % LABEL_WIDTH != 0 {
        return Err(LabelError::InvalidTokenCount {
            count: tokens.len(),
            width: LABEL_WIDTH,
        });
    }
    tokens
        .iter()
        .enumerate()
        .map(|(position, token)| match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(LabelError::InvalidNumber {
                token: token.to_string(),
                position,
            }),
        })
        .collect()
}

/// Parse a ground-truth label string.
///
/// The string holds runs of 7 whitespace separated tokens
/// `id yaw pitch roll x y z`, one run per car. The id is read as a number and
/// truncated to an integer.
///
/// # Errors
///
/// Any malformed token rejects the whole string.
///
/// # Example
///
/// ```
/// use carpose_pose::parse_labels;
///
/// let poses = parse_labels("1 0.1 0.2 0.05 3.0 -1.5 20.0").unwrap();
/// assert_eq!(poses[0].id, Some(1));
/// assert_eq!(poses[0].position.z, 20.0);
/// ```
pub fn parse_labels(s: &str) -> Result<Vec<CarPose>, LabelError> {
    let values = parse_tokens(s)?;
    Ok(values
        .chunks_exact(LABEL_WIDTH)
        .map(|c| {
            CarPose::ground_truth(
                c[0] as i64,
                Position::new(c[4], c[5], c[6]),
                Orientation::new(c[1], c[2], c[3]),
            )
        })
        .collect())
}

/// Parse a prediction string written by [`format_detections`].
///
/// Runs of 7 tokens `yaw pitch roll x y z confidence`.
pub fn parse_detections(s: &str) -> Result<Vec<CarPose>, LabelError> {
    let values = parse_tokens(s)?;
    Ok(values
        .chunks_exact(LABEL_WIDTH)
        .map(|c| {
            CarPose::detection(
                Position::new(c[3], c[4], c[5]),
                Orientation::new(c[0], c[1], c[2]),
                c[6],
            )
        })
        .collect())
}

/// Format detections as a prediction string.
///
/// Each pose is written as `yaw pitch roll x y z confidence`, all poses
/// space-joined on one line. A missing confidence is written as `0`.
///
/// # Example
///
/// ```
/// use carpose_pose::{format_detections, CarPose, Orientation, Position};
///
/// let pose = CarPose::detection(Position::new(1.5, 2.0, 30.0), Orientation::new(0.5, 0.0, -3.0), 0.75);
/// assert_eq!(format_detections(&[pose]), "0.5 0 -3 1.5 2 30 0.75");
/// ```
pub fn format_detections(poses: &[CarPose]) -> String {
    poses
        .iter()
        .flat_map(|p| {
            [
                p.orientation.yaw,
                p.orientation.pitch,
                p.orientation.roll,
                p.position.x,
                p.position.y,
                p.position.z,
                p.confidence.unwrap_or(0.0),
            ]
        })
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single() -> Result<(), LabelError> {
        let poses = parse_labels("1 0.1 0.2 0.05 3.0 -1.5 20.0")?;
        assert_eq!(
            poses,
            vec![CarPose::ground_truth(
                1,
                Position::new(3.0, -1.5, 20.0),
                Orientation::new(0.1, 0.2, 0.05)
            )]
        );
        Ok(())
    }

    #[test]
    fn test_parse_multiple_and_whitespace() -> Result<(), LabelError> {
        let s = "16 0.254839 -2.57534 -3.10256 7.96539 3.20066 11.0225\n\
                 56  0.181647 -1.46947 -3.12159 9.60332 4.66632 19.339 ";
        let poses = parse_labels(s)?;
        assert_eq!(poses.len(), 2);
        assert_eq!(poses[1].id, Some(56));
        assert_eq!(poses[1].orientation.pitch, -1.46947);
        assert_eq!(poses[1].position.z, 19.339);
        Ok(())
    }

    #[test]
    fn test_parse_empty() -> Result<(), LabelError> {
        assert!(parse_labels("")?.is_empty());
        assert!(parse_labels("  \n ")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_bad_count() {
        assert_eq!(
            parse_labels("1 0.1 0.2 0.05 3.0 -1.5"),
            Err(LabelError::InvalidTokenCount { count: 6, width: 7 })
        );
    }

    #[test]
    fn test_parse_bad_number() {
        assert_eq!(
            parse_labels("1 0.1 0.2 0.05 3.0 -1.5 20.0 2 0.1 abc 0.05 3.0 -1.5 20.0"),
            Err(LabelError::InvalidNumber {
                token: "abc".to_string(),
                position: 9
            })
        );
        assert!(parse_labels("1 0.1 0.2 0.05 3.0 -1.5 inf").is_err());
    }

    #[test]
    fn test_format_parse_detections() -> Result<(), LabelError> {
        let poses = vec![
            CarPose::detection(
                Position::new(-3.25, 4.0, 17.5),
                Orientation::new(0.125, -0.5, 3.0),
                0.9,
            ),
            CarPose::detection(
                Position::new(1.0, 2.0, 30.0),
                Orientation::new(0.0, 0.25, -3.0),
                0.6,
            ),
        ];
        let s = format_detections(&poses);
        assert_eq!(s, "0.125 -0.5 3 -3.25 4 17.5 0.9 0 0.25 -3 1 2 30 0.6");
        assert_eq!(parse_detections(&s)?, poses);
        assert_eq!(format_detections(&[]), "");
        Ok(())
    }
}
