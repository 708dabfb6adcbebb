//! Conversion between the rendered widget tree, flat `(path, value)` records and
//! nested JSON values.

use crate::form::path::{Path, Segment};
use crate::form::widget::{Leaf, LeafInput, Widget};
use serde_json::{Map, Number, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LeafValue {
    /// Integers stay integers so values round-trip unchanged.
    Number(Number),
    Bool(bool),
    Text(String),
    /// A collection that is present but has no elements.
    EmptyList,
    /// A slot that exists but carries no data; rendered with schema defaults.
    Vacant,
}

impl LeafValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(value) => Value::Number(value.clone()),
            Self::Bool(value) => Value::Bool(*value),
            Self::Text(value) => Value::String(value.clone()),
            Self::EmptyList => Value::Array(Vec::new()),
            Self::Vacant => Value::Null,
        }
    }
}

impl fmt::Display for LeafValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
            Self::EmptyList => f.write_str("[]"),
            Self::Vacant => f.write_str("null"),
        }
    }
}

/// One flattened leaf. `value: None` means "no data yet" and writes nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub path: Path,
    pub value: Option<LeafValue>,
}

impl FlatRecord {
    pub fn new(path: Path, value: LeafValue) -> Self {
        Self {
            path,
            value: Some(value),
        }
    }
}

pub type FlatRecordSet = Vec<FlatRecord>;

/// A leaf whose text cannot be read as the type its schema demands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("field `{path}` expects {expected}, got `{raw}`")]
pub struct FieldError {
    pub path: Path,
    pub expected: &'static str,
    pub raw: String,
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(Number::from(value));
    }
    if let Ok(value) = text.parse::<u64>() {
        return Some(Number::from(value));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Current value of a leaf. Unparseable numbers are carried as text so the raw
/// input is never lost; [`check_leaves`] reports them.
pub fn read_leaf(leaf: &Leaf) -> LeafValue {
    match &leaf.input {
        LeafInput::Number(text) => match parse_number(text) {
            Some(value) => LeafValue::Number(value),
            None => LeafValue::Text(text.clone()),
        },
        LeafInput::Toggle(value) => LeafValue::Bool(*value),
        LeafInput::Text(text) | LeafInput::MultilineText(text) => LeafValue::Text(text.clone()),
        LeafInput::Choice { selected, .. } => LeafValue::Text(selected.clone()),
    }
}

/// Walks active leaves in schema order. Side-effect free.
pub fn flatten(widget: &Widget) -> FlatRecordSet {
    let mut records = Vec::new();
    flatten_into(widget, &mut records);
    records
}

fn flatten_into(widget: &Widget, records: &mut FlatRecordSet) {
    match widget {
        Widget::Struct(structure) => {
            for field in &structure.fields {
                flatten_into(&field.widget, records);
            }
        }
        Widget::Enum(enumeration) => {
            if enumeration.selector.active {
                records.push(FlatRecord::new(
                    enumeration.selector.path.clone(),
                    read_leaf(&enumeration.selector),
                ));
            }
            for alternative in &enumeration.alternatives {
                if let Some(payload) = &alternative.payload {
                    flatten_into(payload, records);
                }
            }
        }
        Widget::List(list) => {
            // Elements vivify a non-empty list on their own.
            if list.active && list.items.is_empty() {
                records.push(FlatRecord::new(list.path.clone(), LeafValue::EmptyList));
            }
            for item in &list.items {
                flatten_into(item, records);
            }
        }
        Widget::Value(value) => {
            for leaf in value.leaves.iter().filter(|leaf| leaf.active) {
                records.push(FlatRecord::new(leaf.path.clone(), read_leaf(leaf)));
            }
        }
    }
}

/// Active number leaves whose text does not parse.
pub fn check_leaves(widget: &Widget) -> Vec<FieldError> {
    widget
        .leaves()
        .into_iter()
        .filter(|leaf| leaf.active)
        .filter_map(|leaf| match &leaf.input {
            LeafInput::Number(text) if parse_number(text).is_none() => Some(FieldError {
                path: leaf.path.clone(),
                expected: "a finite number",
                raw: text.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Rebuilds a nested value from flat records, in input order.
///
/// Intermediate containers are created on demand: a list when the next segment
/// is an index, a map otherwise. A record at the root path replaces the whole
/// value. Later writes to the same path win.
pub fn rehydrate(records: &[FlatRecord]) -> Value {
    let mut root = Value::Object(Map::new());
    for record in records {
        write_record(&mut root, record.path.segments(), record.value.as_ref());
    }
    root
}

fn write_record(root: &mut Value, segments: &[Segment], value: Option<&LeafValue>) {
    let Some((last, parents)) = segments.split_last() else {
        if let Some(value) = value {
            *root = value.to_json();
        }
        return;
    };

    let mut current = root;
    for (position, segment) in parents.iter().enumerate() {
        let next_is_index = matches!(
            segments.get(position + 1),
            Some(Segment::Index(_))
        );
        current = descend(current, segment, next_is_index);
    }

    if let Some(value) = value {
        assign(current, last, value.to_json());
    }
}

fn empty_container(list: bool) -> Value {
    if list {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn ensure_array(node: &mut Value) -> &mut Vec<Value> {
    match node {
        Value::Array(items) => items,
        other => {
            *other = Value::Array(Vec::new());
            ensure_array(other)
        }
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    match node {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            ensure_object(other)
        }
    }
}

fn descend<'a>(node: &'a mut Value, segment: &Segment, next_is_index: bool) -> &'a mut Value {
    let child = match segment {
        Segment::Index(index) => {
            let items = ensure_array(node);
            while items.len() <= *index {
                items.push(empty_container(next_is_index));
            }
            &mut items[*index]
        }
        Segment::Field(name) => ensure_object(node)
            .entry(name.clone())
            .or_insert_with(|| empty_container(next_is_index)),
    };

    let fits = if next_is_index {
        child.is_array()
    } else {
        child.is_object()
    };
    if !fits {
        *child = empty_container(next_is_index);
    }
    child
}

fn assign(node: &mut Value, segment: &Segment, value: Value) {
    match segment {
        Segment::Index(index) => {
            let items = ensure_array(node);
            while items.len() <= *index {
                items.push(Value::Null);
            }
            items[*index] = value;
        }
        Segment::Field(name) => {
            ensure_object(node).insert(name.clone(), value);
        }
    }
}

/// Flattens an arbitrary nested value into `(path, scalar)` pairs. Empty
/// containers contribute nothing.
pub fn dehydrate(value: &Value) -> Vec<(Path, Value)> {
    let mut out = Vec::new();
    dehydrate_into(value, Path::root(), &mut out);
    out
}

fn dehydrate_into(value: &Value, path: Path, out: &mut Vec<(Path, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                dehydrate_into(child, path.field(key), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                dehydrate_into(child, path.index(index), out);
            }
        }
        scalar => out.push((path, scalar.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::schema::{Schema, ValueKind};
    use crate::form::widget::{ListWidget, ValueWidget};
    use serde_json::json;

    fn p(raw: &str) -> Path {
        raw.parse().expect("test path should parse")
    }

    fn record(path: &str, value: LeafValue) -> FlatRecord {
        FlatRecord::new(p(path), value)
    }

    fn int(value: i64) -> LeafValue {
        LeafValue::Number(value.into())
    }

    fn float(value: f64) -> LeafValue {
        LeafValue::Number(Number::from_f64(value).expect("test number should be finite"))
    }

    #[test]
    fn rehydrate_builds_maps_and_lists() {
        let records = vec![
            record(".x", int(5)),
            record(".items.0", int(1)),
            record(".items.1", float(2.0)),
            record(".shape.type", LeafValue::Text("Circle".to_string())),
            record(".shape.r", float(0.5)),
        ];
        assert_eq!(
            rehydrate(&records),
            json!({
                "x": 5,
                "items": [1, 2.0],
                "shape": {"type": "Circle", "r": 0.5}
            })
        );
    }

    #[test]
    fn rehydrate_keeps_present_but_empty_lists() {
        let records = vec![record(".items", LeafValue::EmptyList)];
        assert_eq!(rehydrate(&records), json!({"items": []}));
    }

    #[test]
    fn rehydrate_vivifies_nested_lists_and_pads_gaps() {
        let records = vec![
            record(".grid.1.0", int(3)),
            record(".grid.0.1.z", LeafValue::Bool(true)),
        ];
        assert_eq!(
            rehydrate(&records),
            json!({"grid": [[{}, {"z": true}], [3]]})
        );
    }

    #[test]
    fn absent_values_write_nothing() {
        let records = vec![
            FlatRecord {
                path: p(".a.b"),
                value: None,
            },
            record(".c", int(1)),
        ];
        assert_eq!(rehydrate(&records), json!({"a": {}, "c": 1}));
    }

    #[test]
    fn later_writes_win() {
        let records = vec![
            record(".a", int(1)),
            record(".a", float(2.5)),
        ];
        assert_eq!(rehydrate(&records), json!({"a": 2.5}));
    }

    #[test]
    fn root_record_replaces_the_whole_value() {
        let records = vec![
            record("", LeafValue::EmptyList),
            record(".0", float(4.0)),
            record(".2", LeafValue::Vacant),
        ];
        assert_eq!(rehydrate(&records), json!([4.0, null, null]));
    }

    #[test]
    fn scalar_roots_give_way_to_containers() {
        let records = vec![record("", LeafValue::EmptyList), record(".x", int(1))];
        assert_eq!(rehydrate(&records), json!({"x": 1}));

        let records = vec![
            record("", LeafValue::Text("Off".to_string())),
            record(".1", int(2)),
        ];
        assert_eq!(rehydrate(&records), json!([null, 2]));
    }

    #[test]
    fn digit_only_keys_parsed_from_wire_become_indices() {
        let records = vec![record(".table.7", LeafValue::Bool(false))];
        let value = rehydrate(&records);
        assert!(value["table"].is_array());
        assert_eq!(value["table"][7], json!(false));
    }

    #[test]
    fn dehydrate_lists_every_scalar() {
        let flat = dehydrate(&json!({"x": 1.0, "v": [2.0, 3.0], "s": {"ok": true}, "e": []}));
        let rendered: Vec<_> = flat
            .iter()
            .map(|(path, value)| format!("{path}={value}"))
            .collect();
        assert_eq!(rendered, vec![".s.ok=true", ".v.0=2.0", ".v.1=3.0", ".x=1.0"]);
    }

    #[test]
    fn read_leaf_keeps_unparseable_numbers_as_text() {
        let leaf = Leaf::new(p(".x"), LeafInput::Number("1.5e".to_string()));
        assert_eq!(read_leaf(&leaf), LeafValue::Text("1.5e".to_string()));
        let leaf = Leaf::new(p(".x"), LeafInput::Number(" 2.5 ".to_string()));
        assert_eq!(read_leaf(&leaf), float(2.5));
        let leaf = Leaf::new(p(".x"), LeafInput::Number("-7".to_string()));
        assert_eq!(read_leaf(&leaf), int(-7));
        let leaf = Leaf::new(p(".x"), LeafInput::Number("7.0".to_string()));
        assert_eq!(read_leaf(&leaf), float(7.0));
        let leaf = Leaf::new(p(".x"), LeafInput::Number("NaN".to_string()));
        assert_eq!(read_leaf(&leaf), LeafValue::Text("NaN".to_string()));
    }

    #[test]
    fn non_empty_lists_flatten_without_a_marker() {
        let list = |items: Vec<Widget>| {
            Widget::List(ListWidget {
                path: p(".items"),
                element: Schema::Value(ValueKind::Num),
                active: true,
                items,
            })
        };
        let number = Widget::Value(ValueWidget {
            kind: ValueKind::Num,
            path: p(".items.0"),
            leaves: vec![Leaf::new(p(".items.0"), LeafInput::Number("3".to_string()))],
        });

        assert_eq!(flatten(&list(vec![number])), vec![record(".items.0", int(3))]);
        assert_eq!(
            flatten(&list(Vec::new())),
            vec![record(".items", LeafValue::EmptyList)]
        );
    }
}
