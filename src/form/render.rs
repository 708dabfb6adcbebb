use crate::form::path::Path;
use crate::form::schema::{Alternative, Schema, StructField, ValueKind};
use crate::form::widget::{
    AlternativeWidget, EnumWidget, FieldWidget, Leaf, LeafInput, ListWidget, StructWidget,
    ValueWidget, Widget,
};
use serde_json::Value;

const VEC2_DEFAULT: [f64; 2] = [0.0, 0.0];
const VEC2_CAPTIONS: [&str; 2] = ["x", "y"];
const COLOR_DEFAULT: [f64; 4] = [0.0, 0.0, 1.0, 1.0];
const COLOR_CAPTIONS: [&str; 4] = ["h", "s", "v", "a"];
const REF_DEFAULT: &str = "a";

/// Builds the editable tree for `schema`, seeded from `init` where it has data.
///
/// Returns `None` when nothing at the root is renderable.
pub fn render(schema: &Schema, init: Option<&Value>) -> Option<Widget> {
    render_at(schema, Path::root(), init)
}

/// Renders a subtree rooted at `path`. Used directly when a list is rebuilt.
pub fn render_at(schema: &Schema, path: Path, init: Option<&Value>) -> Option<Widget> {
    let init = init.filter(|value| !value.is_null());
    match schema {
        Schema::Struct { name, fields } => Some(render_struct(name, fields, path, init)),
        Schema::Enum {
            name,
            alternatives,
            untagged,
        } => render_enum(name, alternatives, *untagged, path, init),
        Schema::List(element) => Some(Widget::List(render_list(element, path, init))),
        Schema::Value(kind) => render_value(kind, path, init),
        Schema::Skip => None,
        Schema::Unknown(kind) => {
            tracing::error!(path = %path, kind = %kind, "unknown schema variant; field dropped");
            None
        }
    }
}

fn render_struct(name: &str, fields: &[StructField], path: Path, init: Option<&Value>) -> Widget {
    let mut rendered = Vec::with_capacity(fields.len());
    for field in fields {
        if matches!(field.schema, Schema::Skip) {
            continue;
        }
        let field_init = init.and_then(|value| value.get(field.name.as_str()));
        if let Some(widget) = render_at(&field.schema, path.field(&field.name), field_init) {
            rendered.push(FieldWidget {
                name: field.name.clone(),
                widget,
            });
        }
    }

    Widget::Struct(StructWidget {
        name: name.to_string(),
        path,
        fields: rendered,
    })
}

/// Initial alternative: the value's discriminant when it names a declared tag,
/// otherwise the first declared alternative. The flag tells whether `init`
/// actually selected it, and therefore whether it may seed the payload.
fn resolve_discriminant<'a>(
    alternatives: &'a [Alternative],
    untagged: bool,
    init: Option<&Value>,
) -> Option<(&'a str, bool)> {
    let declared = |tag: &str| {
        alternatives
            .iter()
            .find(|alternative| alternative.tag == tag)
            .map(|alternative| alternative.tag.as_str())
    };

    let from_init = init.and_then(|value| {
        if untagged {
            if let Some(tag) = value.as_str().and_then(declared) {
                return Some(tag);
            }
            alternatives
                .iter()
                .find(|alternative| {
                    alternative
                        .payload
                        .as_ref()
                        .is_some_and(|payload| payload.accepts(value))
                })
                .map(|alternative| alternative.tag.as_str())
        } else {
            value.get("type").and_then(Value::as_str).and_then(declared)
        }
    });

    match from_init {
        Some(tag) => Some((tag, true)),
        None => alternatives
            .first()
            .map(|alternative| (alternative.tag.as_str(), false)),
    }
}

fn render_enum(
    name: &str,
    alternatives: &[Alternative],
    untagged: bool,
    path: Path,
    init: Option<&Value>,
) -> Option<Widget> {
    let Some((selected, seeded)) = resolve_discriminant(alternatives, untagged, init) else {
        tracing::warn!(path = %path, name, "enum without alternatives; field dropped");
        return None;
    };
    let selected = selected.to_string();
    let init = if seeded { init } else { None };

    let selector_path = if untagged {
        path.clone()
    } else {
        path.field("type")
    };
    let selector = Leaf::new(
        selector_path,
        LeafInput::Choice {
            options: alternatives
                .iter()
                .map(|alternative| alternative.tag.clone())
                .collect(),
            selected: selected.clone(),
        },
    );

    let rendered = alternatives
        .iter()
        .map(|alternative| {
            let payload_init = if alternative.tag == selected { init } else { None };
            AlternativeWidget {
                tag: alternative.tag.clone(),
                payload: alternative
                    .payload
                    .as_ref()
                    .and_then(|payload| render_at(payload, path.clone(), payload_init)),
            }
        })
        .collect();

    let mut widget = Widget::Enum(EnumWidget {
        name: name.to_string(),
        path,
        untagged,
        active: true,
        selector,
        alternatives: rendered,
    });
    widget.set_active(true);
    Some(widget)
}

pub(crate) fn render_list(element: &Schema, path: Path, init: Option<&Value>) -> ListWidget {
    let items = init
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| render_at(element, path.index(index), Some(item)))
                .collect()
        })
        .unwrap_or_default();

    ListWidget {
        path,
        element: element.clone(),
        active: true,
        items,
    }
}

pub(crate) fn number_text(value: Option<&Value>, default: f64) -> String {
    match value {
        // `Number`'s own formatting keeps `5` and `5.0` apart.
        Some(Value::Number(number)) => number.to_string(),
        // Raw text captured from a half-edited field.
        Some(Value::String(text)) => text.clone(),
        _ => default.to_string(),
    }
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn components(path: &Path, init: Option<&Value>, defaults: &[f64], captions: &[&'static str]) -> Vec<Leaf> {
    defaults
        .iter()
        .zip(captions)
        .enumerate()
        .map(|(index, (default, caption))| {
            let component = init.and_then(|value| value.get(index));
            Leaf::new(
                path.index(index),
                LeafInput::Number(number_text(component, *default)),
            )
            .with_caption(*caption)
        })
        .collect()
}

fn render_value(kind: &ValueKind, path: Path, init: Option<&Value>) -> Option<Widget> {
    let leaves = match kind {
        ValueKind::Num => vec![
            Leaf::new(path.clone(), LeafInput::Number(number_text(init, 0.0))).with_trend()
        ],
        ValueKind::Bool => {
            let value = match init {
                Some(Value::Bool(value)) => *value,
                Some(Value::String(text)) => text == "true",
                _ => false,
            };
            vec![Leaf::new(path.clone(), LeafInput::Toggle(value))]
        }
        ValueKind::Vec2 => components(&path, init, &VEC2_DEFAULT, &VEC2_CAPTIONS),
        ValueKind::Angle => vec![Leaf::new(
            path.clone(),
            LeafInput::Number(number_text(init, 0.0)),
        )],
        ValueKind::Color => components(&path, init, &COLOR_DEFAULT, &COLOR_CAPTIONS),
        ValueKind::Defs => vec![Leaf::new(
            path.clone(),
            LeafInput::MultilineText(text_or(init, "")),
        )],
        ValueKind::Ref(_) => vec![Leaf::new(
            path.clone(),
            LeafInput::Text(text_or(init, REF_DEFAULT)),
        )],
        ValueKind::Unknown(raw) => {
            tracing::warn!(path = %path, kind = %raw, "no editor for value kind; field omitted");
            return None;
        }
    };

    Some(Widget::Value(ValueWidget {
        kind: kind.clone(),
        path,
        leaves,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::codec::{flatten, rehydrate, LeafValue};
    use serde_json::json;

    fn num() -> Schema {
        Schema::Value(ValueKind::Num)
    }

    fn leaf_paths(widget: &Widget) -> Vec<String> {
        widget
            .leaves()
            .into_iter()
            .filter(|leaf| leaf.active)
            .map(|leaf| leaf.path.to_string())
            .collect()
    }

    fn drawing_schema() -> Schema {
        Schema::structure(
            "Drawing",
            vec![
                ("x", num()),
                ("visible", Schema::Value(ValueKind::Bool)),
                ("offset", Schema::Value(ValueKind::Vec2)),
                ("turn", Schema::Value(ValueKind::Angle)),
                ("tint", Schema::Value(ValueKind::Color)),
                ("defs", Schema::Value(ValueKind::Defs)),
                ("target", Schema::Value(ValueKind::Ref("shape".to_string()))),
                (
                    "shape",
                    Schema::tagged(
                        "Shape",
                        vec![
                            (
                                "Circle",
                                Some(Schema::structure("Circle", vec![("r", num())])),
                            ),
                            (
                                "Rect",
                                Some(Schema::structure("Rect", vec![("w", num()), ("h", num())])),
                            ),
                            ("Empty", None),
                        ],
                    ),
                ),
                (
                    "layers",
                    Schema::list(Schema::structure(
                        "Layer",
                        vec![("weights", Schema::list(num())), ("scratch", Schema::Skip)],
                    )),
                ),
            ],
        )
    }

    #[test]
    fn scenario_struct_with_number_list() {
        let schema = Schema::structure("root", vec![("x", num()), ("items", Schema::list(num()))]);
        let init = json!({"x": 5, "items": [1, 2]});
        let widget = render(&schema, Some(&init)).expect("root should render");

        assert_eq!(leaf_paths(&widget), vec![".x", ".items.0", ".items.1"]);

        let records = flatten(&widget);
        let pairs: Vec<_> = records
            .iter()
            .map(|record| (record.path.to_string(), record.value.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (".x".to_string(), Some(LeafValue::Number(5.into()))),
                (".items.0".to_string(), Some(LeafValue::Number(1.into()))),
                (".items.1".to_string(), Some(LeafValue::Number(2.into()))),
            ]
        );
        assert_eq!(rehydrate(&records), init);
    }

    #[test]
    fn integers_and_floats_keep_their_kind() {
        let schema = Schema::structure("root", vec![("x", num()), ("items", Schema::list(num()))]);
        let init = json!({"x": 5.0, "items": [1, 2.5, -3, 4.0]});
        let widget = render(&schema, Some(&init)).expect("root should render");
        assert_eq!(rehydrate(&flatten(&widget)), init);
    }

    #[test]
    fn full_round_trip_reproduces_value() {
        let init = json!({
            "x": 1.5,
            "visible": true,
            "offset": [3.0, -4.0],
            "turn": 0.25,
            "tint": [0.5, 0.2, 0.9, 1.0],
            "defs": "a = 1\nb = 2",
            "target": "b",
            "shape": {"type": "Rect", "w": 2.0, "h": 3.0},
            "layers": [
                {"weights": [0.1, 0.2]},
                {"weights": []}
            ]
        });
        let widget = render(&drawing_schema(), Some(&init)).expect("root should render");
        assert_eq!(rehydrate(&flatten(&widget)), init);
    }

    #[test]
    fn missing_init_uses_schema_defaults() {
        let widget = render(&drawing_schema(), None).expect("root should render");
        assert_eq!(
            rehydrate(&flatten(&widget)),
            json!({
                "x": 0,
                "visible": false,
                "offset": [0, 0],
                "turn": 0,
                "tint": [0, 0, 1, 1],
                "defs": "",
                "target": "a",
                "shape": {"type": "Circle", "r": 0},
                "layers": []
            })
        );
    }

    #[test]
    fn skip_fields_never_render_even_with_data() {
        let init = json!({"layers": [{"weights": [1.0], "scratch": 9.0}]});
        let widget = render(&drawing_schema(), Some(&init)).expect("root should render");
        assert!(widget
            .leaves()
            .iter()
            .all(|leaf| !leaf.path.to_string().contains("scratch")));
        let value = rehydrate(&flatten(&widget));
        assert_eq!(value["layers"], json!([{"weights": [1.0]}]));
    }

    #[test]
    fn tagged_enum_falls_back_to_first_alternative_for_unknown_tag() {
        let init = json!({"shape": {"type": "Hexagon", "r": 2.0}});
        let widget = render(&drawing_schema(), Some(&init)).expect("root should render");
        let value = rehydrate(&flatten(&widget));
        assert_eq!(value["shape"], json!({"type": "Circle", "r": 0}));
    }

    #[test]
    fn tagged_unit_alternative_serializes_only_its_tag() {
        let init = json!({"shape": {"type": "Empty"}});
        let widget = render(&drawing_schema(), Some(&init)).expect("root should render");
        let value = rehydrate(&flatten(&widget));
        assert_eq!(value["shape"], json!({"type": "Empty"}));
    }

    #[test]
    fn untagged_enum_resolves_by_tag_string_or_shape() {
        let schema = Schema::structure(
            "S",
            vec![(
                "mode",
                Schema::untagged(
                    "Mode",
                    vec![
                        ("Off", None),
                        ("Fixed", Some(num())),
                        ("Pair", Some(Schema::Value(ValueKind::Vec2))),
                    ],
                ),
            )],
        );

        let widget = render(&schema, Some(&json!({"mode": "Off"}))).expect("should render");
        assert_eq!(rehydrate(&flatten(&widget)), json!({"mode": "Off"}));

        let widget = render(&schema, Some(&json!({"mode": 2.5}))).expect("should render");
        assert_eq!(rehydrate(&flatten(&widget)), json!({"mode": 2.5}));

        let widget = render(&schema, Some(&json!({"mode": [1.0, 2.0]}))).expect("should render");
        assert_eq!(rehydrate(&flatten(&widget)), json!({"mode": [1.0, 2.0]}));
    }

    #[test]
    fn unknown_value_kind_is_omitted_and_siblings_survive() {
        let schema = Schema::structure(
            "S",
            vec![
                ("q", Schema::Value(ValueKind::Unknown("Quaternion".to_string()))),
                ("m", Schema::Unknown("Map".to_string())),
                ("x", num()),
            ],
        );
        let widget = render(&schema, Some(&json!({"q": [1.0], "x": 2.0}))).expect("should render");
        assert_eq!(leaf_paths(&widget), vec![".x"]);
        assert_eq!(rehydrate(&flatten(&widget)), json!({"x": 2.0}));
    }

    #[test]
    fn number_leaves_carry_trend_indicator() {
        let widget = render(&drawing_schema(), None).expect("root should render");
        let trended: Vec<_> = widget
            .leaves()
            .into_iter()
            .filter(|leaf| leaf.trend && leaf.active)
            .map(|leaf| leaf.path.to_string())
            .collect();
        assert_eq!(trended, vec![".x", ".shape.r"]);
    }
}
