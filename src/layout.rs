use serde::{Deserialize, Serialize};

/// Width every column is assumed to render at, in display units.
pub const BASE_COLUMN_WIDTH: f64 = 200.0;
/// Vertical gap added beneath every card.
pub const GAP: f64 = 8.0;
/// Used for any missing, non-finite or non-positive dimension.
pub const FALLBACK_DIMENSION: f64 = 200.0;

/// Intrinsic size as declared by the remote API. Either side may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimator {
    column_width: f64,
    gap: f64,
}

impl Default for Estimator {
    fn default() -> Self {
        Self {
            column_width: BASE_COLUMN_WIDTH,
            gap: GAP,
        }
    }
}

impl Estimator {
    pub fn new(column_width: f64, gap: f64) -> Self {
        let column_width = if column_width.is_finite() && column_width > 0.0 {
            column_width
        } else {
            BASE_COLUMN_WIDTH
        };
        let gap = if gap.is_finite() && gap >= 0.0 { gap } else { GAP };
        Self { column_width, gap }
    }

    pub fn column_width(&self) -> f64 {
        self.column_width
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    /// Projected rendered height of a card. Always finite and strictly positive.
    pub fn estimate(&self, dims: Dimensions) -> f64 {
        let width = sanitize(dims.width);
        let height = sanitize(dims.height);
        let projected = (height / width) * self.column_width + self.gap;
        if projected.is_finite() && projected > 0.0 {
            projected
        } else {
            self.column_width + self.gap
        }
    }
}

fn sanitize(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => FALLBACK_DIMENSION,
    }
}

/// How incoming items are distributed over the columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Greedy: each item goes to the currently shortest column.
    #[default]
    #[serde(alias = "shortest")]
    ShortestColumn,
    /// Position `(placed + i) % columns`, ignoring heights.
    RoundRobin,
}

impl Placement {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "shortest" | "shortest_column" => Some(Placement::ShortestColumn),
            "round_robin" | "roundrobin" | "rr" => Some(Placement::RoundRobin),
            _ => None,
        }
    }
}

/// Running estimated-height totals, one per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Columns {
    heights: Vec<f64>,
    placed: usize,
}

impl Columns {
    pub fn new(count: usize) -> Self {
        Self {
            heights: vec![0.0; count.max(1)],
            placed: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.heights.len()
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn total(&self) -> f64 {
        self.heights.iter().sum()
    }

    pub fn spread(&self) -> f64 {
        let max = self.heights.iter().copied().fold(f64::MIN, f64::max);
        let min = self.heights.iter().copied().fold(f64::MAX, f64::min);
        max - min
    }

    pub fn reset(&mut self) {
        self.heights.iter_mut().for_each(|h| *h = 0.0);
        self.placed = 0;
    }

    /// Lowest accumulator; ties go to the lowest index.
    pub fn shortest(&self) -> usize {
        let mut index = 0;
        let mut best = self.heights[0];
        for (i, height) in self.heights.iter().enumerate().skip(1) {
            if *height < best {
                best = *height;
                index = i;
            }
        }
        index
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balancer {
    pub estimator: Estimator,
    pub placement: Placement,
}

impl Balancer {
    pub fn new(estimator: Estimator, placement: Placement) -> Self {
        Self {
            estimator,
            placement,
        }
    }

    /// Assigns each item, in input order, to a column index and updates the
    /// accumulators. Rendering surfaces are left to the caller.
    pub fn place<I>(&self, items: I, columns: &mut Columns) -> Vec<usize>
    where
        I: IntoIterator<Item = Dimensions>,
    {
        items
            .into_iter()
            .map(|dims| {
                let column = match self.placement {
                    Placement::ShortestColumn => columns.shortest(),
                    Placement::RoundRobin => columns.placed % columns.count(),
                };
                columns.heights[column] += self.estimator.estimate(dims);
                columns.placed += 1;
                column
            })
            .collect()
    }
}

impl Default for Balancer {
    fn default() -> Self {
        Self::new(Estimator::default(), Placement::default())
    }
}
