use crate::template::grid::GridMap;

/// Grid dimension along which distinct poses advance.
///
/// The other dimension holds copies of the same pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseAxis {
    /// Pose `i` fills row `i`; every column is a copy.
    Rows,
    /// Pose `i` fills column `i`; every row is a copy.
    Cols,
}

/// Decide the pose axis of a multi-pose template.
///
/// A non-square grid decides by shape: the dimension equal to `pose_count` wins, else the larger
/// one. A square grid falls back to the template name ("portrait" -> rows, "landscape" -> cols),
/// defaulting to rows.
pub fn resolve_pose_axis(template_name: &str, pose_count: u32, grid: &GridMap) -> PoseAxis {
    let per_strip = pose_count.max(1) as usize;
    let (rows, cols) = (grid.num_rows(), grid.num_cols());

    if rows != cols {
        if rows == per_strip {
            return PoseAxis::Rows;
        }
        if cols == per_strip {
            return PoseAxis::Cols;
        }
        return if rows > cols {
            PoseAxis::Rows
        } else {
            PoseAxis::Cols
        };
    }

    let name = template_name.trim().to_lowercase();
    if name.contains("portrait") {
        PoseAxis::Rows
    } else if name.contains("landscape") {
        PoseAxis::Cols
    } else {
        PoseAxis::Rows
    }
}
