//! Chart datasets for a grid: levels, positions and the current price

use serde::Serialize;

use crate::api::types::{BotType, GridSnapshot, PositionEntry};
use crate::format::{format_number, format_optional};

/// Absolute price tolerance when matching a position to its level
pub const LEVEL_MATCH_TOLERANCE: f64 = 0.0001;

/// Share of the level range added above and below the y-axis
pub const AXIS_PADDING_RATIO: f64 = 0.05;

/// Index of the level equal to `price` within tolerance, or -1 when none matches
pub fn level_index(levels: &[f64], price: f64) -> i64 {
    levels
        .iter()
        .position(|level| (level - price).abs() < LEVEL_MATCH_TOLERANCE)
        .map(|i| i as i64)
        .unwrap_or(-1)
}

/// Index of the level nearest to `price`; the first one wins ties, 0 for no levels
pub fn closest_level_index(levels: &[f64], price: f64) -> usize {
    let mut closest = 0;
    let mut closest_diff = match levels.first() {
        Some(first) => (first - price).abs(),
        None => return 0,
    };

    for (i, level) in levels.iter().enumerate().skip(1) {
        let diff = (level - price).abs();
        if diff < closest_diff {
            closest_diff = diff;
            closest = i;
        }
    }
    closest
}

/// One plotted point; x is a level index, not a price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: i64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled: Option<bool>,
}

/// The four series of a grid chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    GridLevels,
    LongPositions,
    ShortPositions,
    CurrentPrice,
}

/// Drawing attributes of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStyle {
    pub border_color: &'static str,
    pub background_color: &'static str,
    pub border_width: u8,
    pub point_radius: u8,
    pub point_hover_radius: u8,
    pub show_line: bool,
}

impl SeriesKind {
    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::GridLevels => "Grid Levels",
            SeriesKind::LongPositions => "Long Positions",
            SeriesKind::ShortPositions => "Short Positions",
            SeriesKind::CurrentPrice => "Current Price",
        }
    }

    pub fn style(&self) -> SeriesStyle {
        match self {
            SeriesKind::GridLevels => SeriesStyle {
                border_color: "rgba(75, 192, 192, 0.5)",
                background_color: "rgba(75, 192, 192, 0.1)",
                border_width: 1,
                point_radius: 0,
                point_hover_radius: 0,
                show_line: true,
            },
            SeriesKind::LongPositions => SeriesStyle {
                border_color: "rgba(46, 204, 113, 1)",
                background_color: "rgba(46, 204, 113, 0.8)",
                border_width: 1,
                point_radius: 5,
                point_hover_radius: 7,
                show_line: false,
            },
            SeriesKind::ShortPositions => SeriesStyle {
                border_color: "rgba(231, 76, 60, 1)",
                background_color: "rgba(231, 76, 60, 0.8)",
                border_width: 1,
                point_radius: 5,
                point_hover_radius: 7,
                show_line: false,
            },
            SeriesKind::CurrentPrice => SeriesStyle {
                border_color: "rgba(241, 196, 15, 1)",
                background_color: "rgba(241, 196, 15, 0.8)",
                border_width: 1,
                point_radius: 6,
                point_hover_radius: 8,
                show_line: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub kind: SeriesKind,
    pub label: &'static str,
    pub points: Vec<ChartPoint>,
    pub hidden: bool,
    pub style: SeriesStyle,
}

impl Dataset {
    pub fn new(kind: SeriesKind) -> Self {
        Self {
            kind,
            label: kind.label(),
            points: Vec::new(),
            hidden: false,
            style: kind.style(),
        }
    }

    /// Hover text for a point of this series
    pub fn tooltip(&self, point: &ChartPoint) -> String {
        let filled = if point.filled == Some(true) { " - Filled" } else { "" };
        match self.kind {
            SeriesKind::GridLevels => format!("{}: {}", self.label, point.y),
            SeriesKind::LongPositions => format!("{}: Price: {} (Long){}", self.label, point.y, filled),
            SeriesKind::ShortPositions => format!("{}: Price: {} (Short){}", self.label, point.y, filled),
            SeriesKind::CurrentPrice => format!("{}: Current: {}", self.label, point.y),
        }
    }
}

fn position_points(levels: &[f64], positions: &[PositionEntry]) -> Vec<ChartPoint> {
    positions
        .iter()
        .map(|p| ChartPoint {
            x: level_index(levels, p.price_level),
            y: p.price_level,
            filled: Some(p.is_filled),
        })
        .collect()
}

/// Chart of one grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridChart {
    /// Categorical x labels "0".."N-1"
    pub labels: Vec<String>,
    pub grid_levels: Dataset,
    pub long_positions: Dataset,
    pub short_positions: Dataset,
    pub current_price: Dataset,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

impl Default for GridChart {
    fn default() -> Self {
        Self::new()
    }
}

impl GridChart {
    pub fn new() -> Self {
        Self {
            labels: Vec::new(),
            grid_levels: Dataset::new(SeriesKind::GridLevels),
            long_positions: Dataset::new(SeriesKind::LongPositions),
            short_positions: Dataset::new(SeriesKind::ShortPositions),
            current_price: Dataset::new(SeriesKind::CurrentPrice),
            y_min: None,
            y_max: None,
        }
    }

    pub fn datasets(&self) -> [&Dataset; 4] {
        [&self.grid_levels, &self.long_positions, &self.short_positions, &self.current_price]
    }

    /// Redraw every series from a snapshot
    ///
    /// Returns false and leaves the chart untouched when the snapshot has no levels.
    pub fn apply_snapshot(&mut self, snapshot: &GridSnapshot) -> bool {
        let levels = &snapshot.grid_levels;
        if levels.is_empty() {
            return false;
        }
        let bot_type = snapshot.bot_type();

        self.labels = (0..levels.len()).map(|i| i.to_string()).collect();
        self.grid_levels.points = levels
            .iter()
            .enumerate()
            .map(|(i, level)| ChartPoint { x: i as i64, y: *level, filled: None })
            .collect();

        self.long_positions.points = if bot_type.shows_long() {
            position_points(levels, &snapshot.long_positions)
        } else {
            Vec::new()
        };
        self.short_positions.points = if bot_type.shows_short() {
            position_points(levels, &snapshot.short_positions)
        } else {
            Vec::new()
        };

        self.current_price.points = match snapshot.live_price() {
            Some(price) => vec![ChartPoint {
                x: closest_level_index(levels, price) as i64,
                y: price,
                filled: None,
            }],
            None => Vec::new(),
        };

        self.long_positions.hidden = !bot_type.shows_long();
        self.short_positions.hidden = !bot_type.shows_short();

        let min = levels.iter().copied().fold(f64::INFINITY, f64::min);
        let max = levels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let padding = (max - min) * AXIS_PADDING_RATIO;
        self.y_min = Some(min - padding);
        self.y_max = Some(max + padding);

        true
    }
}

/// Bot type and price header of a grid card
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridInfo {
    pub bot_type: BotType,
    pub bot_type_label: String,
    pub bot_type_class: String,
    /// Last reported price; kept when a snapshot carries none
    pub current_price: Option<String>,
}

impl GridInfo {
    pub fn apply_snapshot(&mut self, snapshot: &GridSnapshot) {
        let bot_type = snapshot.bot_type();
        self.bot_type = bot_type;
        self.bot_type_label = bot_type.label().to_string();
        self.bot_type_class = format!("bot-type {}", bot_type.css_class());
        if let Some(price) = snapshot.live_price() {
            self.current_price = Some(format_number(price, 6));
        }
    }
}

/// Bounds, step and width of a grid, derived from its levels
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridStatsDisplay {
    pub lower_bound: String,
    pub upper_bound: String,
    pub grid_step: String,
    /// Range as a percentage of the current price; kept when no price is known
    pub range_percent: Option<String>,
}

impl GridStatsDisplay {
    /// Recompute from a snapshot; returns false when the snapshot has no levels
    pub fn apply_snapshot(&mut self, snapshot: &GridSnapshot) -> bool {
        let levels = &snapshot.grid_levels;
        if levels.is_empty() {
            return false;
        }

        let min = levels.iter().copied().fold(f64::INFINITY, f64::min);
        let max = levels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let step = (levels.len() > 1).then(|| (max - min) / (levels.len() - 1) as f64);

        self.lower_bound = format_number(min, 6);
        self.upper_bound = format_number(max, 6);
        self.grid_step = format_optional(step, 6);

        let current_price = snapshot.current_price.unwrap_or(0.0);
        if current_price > 0.0 {
            self.range_percent = Some(format!("{}%", format_number((max - min) / current_price * 100.0, 2)));
        }
        true
    }
}
