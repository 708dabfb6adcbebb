use crate::form::codec::dehydrate;
use crate::form::path::Path;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

pub const DEFAULT_CAPACITY: usize = 36;
const LABEL_WIDTH: usize = 5;
const EXPONENTIAL_FROM: f64 = 10_000.0;

pub type Snapshot = BTreeMap<Path, Value>;

/// What a trend indicator shows for one path: the latest value as a fixed-width
/// label and, for numbers, a polyline normalized into the unit square.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSummary {
    pub label: String,
    pub points: Vec<[f32; 2]>,
}

/// Recent parameter snapshots, oldest first.
#[derive(Debug, Clone)]
pub struct ValuesHistory {
    capacity: usize,
    snapshots: VecDeque<Snapshot>,
}

impl Default for ValuesHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ValuesHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            snapshots: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn update(&mut self, params: &Value) {
        while self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(dehydrate(params).into_iter().collect());
    }

    pub fn latest(&self, path: &Path) -> Option<&Value> {
        self.snapshots.iter().rev().find_map(|snapshot| snapshot.get(path))
    }

    /// Numeric samples at `path` across the retained window.
    pub fn series(&self, path: &Path) -> Vec<f64> {
        self.snapshots
            .iter()
            .filter_map(|snapshot| snapshot.get(path).and_then(Value::as_f64))
            .collect()
    }

    pub fn trend(&self, path: &Path) -> TrendSummary {
        let latest = self.snapshots.back().and_then(|snapshot| snapshot.get(path));
        let points = match latest {
            Some(value) if value.is_number() => polyline(&self.series(path)),
            _ => Vec::new(),
        };
        TrendSummary {
            label: format_label(latest),
            points,
        }
    }
}

pub fn format_label(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => " ".repeat(LABEL_WIDTH),
        Some(Value::Number(number)) => match number.as_f64() {
            Some(number) => format_number(number),
            None => pad(&number.to_string()),
        },
        Some(Value::String(text)) => pad(text),
        Some(other) => pad(&other.to_string()),
    }
}

fn format_number(value: f64) -> String {
    if value.abs() >= EXPONENTIAL_FROM {
        return format!("{value:>width$.2e}", width = LABEL_WIDTH);
    }
    let magnitude = if value == 0.0 {
        1
    } else {
        value.abs().log10().floor() as i32 + 1
    };
    let decimals = (LABEL_WIDTH as i32 - magnitude).max(0) as usize;
    let mut text = format!("{value:.decimals$}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    pad(&text)
}

fn pad(text: &str) -> String {
    let clipped: String = text.chars().take(LABEL_WIDTH).collect();
    format!("{clipped:>width$}", width = LABEL_WIDTH)
}

/// x spreads samples evenly over [0, 1]; y is min-max normalized, with a flat
/// series drawn through the middle.
pub fn polyline(series: &[f64]) -> Vec<[f32; 2]> {
    let Some(min) = series.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = series.iter().copied().fold(min, f64::max);
    let span = max - min;
    let last = series.len().saturating_sub(1);

    series
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let x = if last == 0 {
                0.0
            } else {
                index as f64 / last as f64
            };
            let y = if span > 0.0 { (value - min) / span } else { 0.5 };
            [x as f32, y as f32]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(raw: &str) -> Path {
        raw.parse().expect("test path should parse")
    }

    #[test]
    fn keeps_only_the_most_recent_snapshots() {
        let mut history = ValuesHistory::default();
        for n in 0..40 {
            history.update(&json!({"n": n as f64}));
        }
        assert_eq!(history.len(), DEFAULT_CAPACITY);
        assert_eq!(history.series(&p(".n")).first(), Some(&4.0));
        assert_eq!(history.series(&p(".n")).last(), Some(&39.0));
    }

    #[test]
    fn snapshots_are_keyed_by_flattened_paths() {
        let mut history = ValuesHistory::new(4);
        history.update(&json!({"shape": {"r": 2.0}, "offset": [1.0, 3.0], "name": "wave"}));
        assert_eq!(history.latest(&p(".shape.r")), Some(&json!(2.0)));
        assert_eq!(history.latest(&p(".offset.1")), Some(&json!(3.0)));
        assert_eq!(history.latest(&p(".name")), Some(&json!("wave")));
    }

    #[test]
    fn labels_have_fixed_width() {
        assert_eq!(format_label(None), "     ");
        assert_eq!(format_label(Some(&json!(0.0))), "    0");
        assert_eq!(format_label(Some(&json!(1.5))), "  1.5");
        assert_eq!(format_label(Some(&json!(-2.0))), "   -2");
        assert_eq!(format_label(Some(&json!(3.14159))), "3.141");
        assert_eq!(format_label(Some(&json!(1234.5))), "1234.");
        assert_eq!(format_label(Some(&json!(12345.0))), "1.23e4");
        assert_eq!(format_label(Some(&json!("circle"))), "circl");
        assert_eq!(format_label(Some(&json!(true))), " true");
    }

    #[test]
    fn polyline_is_normalized_and_tolerates_short_windows() {
        assert!(polyline(&[]).is_empty());
        assert_eq!(polyline(&[7.0]), vec![[0.0, 0.5]]);
        assert_eq!(polyline(&[1.0, 1.0]), vec![[0.0, 0.5], [1.0, 0.5]]);
        assert_eq!(
            polyline(&[0.0, 4.0, 2.0]),
            vec![[0.0, 0.0], [0.5, 1.0], [1.0, 0.5]]
        );
    }

    #[test]
    fn trend_draws_polylines_for_numbers_only() {
        let mut history = ValuesHistory::new(8);
        history.update(&json!({"x": 1.0, "tag": "a"}));
        history.update(&json!({"x": 3.0, "tag": "b"}));

        let numeric = history.trend(&p(".x"));
        assert_eq!(numeric.label, "    3");
        assert_eq!(numeric.points.len(), 2);

        let text = history.trend(&p(".tag"));
        assert_eq!(text.label, "    b");
        assert!(text.points.is_empty());

        let missing = history.trend(&p(".nope"));
        assert_eq!(missing.label, "     ");
        assert!(missing.points.is_empty());
    }
}
