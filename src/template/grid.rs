use crate::template::slots::Slot;

/// Logical grid recovered from a set of slots.
///
/// `cells` is indexed `[column][row]`; a cell without an assigned slot is `None`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct GridMap {
    /// Ascending column centers (x).
    pub column_centers: Vec<f64>,
    /// Ascending row centers (y).
    pub row_centers: Vec<f64>,
    /// Slot assigned to each `[column][row]` cell.
    pub cells: Vec<Vec<Option<Slot>>>,
}

impl GridMap {
    /// Number of columns.
    pub fn num_cols(&self) -> usize {
        self.column_centers.len()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.row_centers.len()
    }

    /// Slot at `(col, row)`, if any.
    pub fn cell(&self, col: usize, row: usize) -> Option<&Slot> {
        self.cells.get(col)?.get(row)?.as_ref()
    }
}

/// 1-D clustering with a running-mean group center.
///
/// Values are visited in ascending order; a value joins the current group when it lies within
/// `tolerance` of the group's mean, otherwise it starts a new group.
pub fn cluster_centers(values: &[f64], tolerance: f64) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    struct Group {
        sum: f64,
        n: u32,
        center: f64,
    }

    let mut groups: Vec<Group> = Vec::new();
    for v in sorted {
        match groups.last_mut() {
            Some(g) if (v - g.center).abs() <= tolerance => {
                g.sum += v;
                g.n += 1;
                g.center = g.sum / f64::from(g.n);
            }
            _ => groups.push(Group {
                sum: v,
                n: 1,
                center: v,
            }),
        }
    }

    let mut centers: Vec<f64> = groups.into_iter().map(|g| g.center).collect();
    centers.sort_by(f64::total_cmp);
    centers
}

/// Cluster slot centers into columns and rows and place every slot into its nearest cell.
///
/// Two slots landing in the same cell keep the later one in input order.
pub fn build_grid(slots: &[Slot]) -> GridMap {
    if slots.is_empty() {
        return GridMap::default();
    }

    let n = slots.len() as f64;
    let mean_w = slots.iter().map(|s| f64::from(s.w)).sum::<f64>() / n;
    let mean_h = slots.iter().map(|s| f64::from(s.h)).sum::<f64>() / n;

    let xs: Vec<f64> = slots.iter().map(Slot::center_x).collect();
    let ys: Vec<f64> = slots.iter().map(Slot::center_y).collect();

    let column_centers = cluster_centers(&xs, (mean_w * 0.45).max(12.0));
    let row_centers = cluster_centers(&ys, (mean_h * 0.45).max(12.0));

    let mut cells = vec![vec![None; row_centers.len()]; column_centers.len()];
    for s in slots {
        let ci = nearest_index(&column_centers, s.center_x());
        let ri = nearest_index(&row_centers, s.center_y());
        if cells[ci][ri].is_some() {
            tracing::debug!(col = ci, row = ri, "grid cell collision; later slot wins");
        }
        cells[ci][ri] = Some(*s);
    }

    GridMap {
        column_centers,
        row_centers,
        cells,
    }
}

/// Index of the closest center; ties keep the lowest index.
fn nearest_index(centers: &[f64], v: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let d = (c - v).abs();
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

#[cfg(test)]
#[path = "../../tests/unit/template/grid.rs"]
mod tests;
