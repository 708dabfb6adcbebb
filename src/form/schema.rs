use crate::form::path::Path;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeSet;

/// Shape a configuration value must have, as published by the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Struct {
        name: String,
        fields: Vec<StructField>,
    },
    Enum {
        name: String,
        alternatives: Vec<Alternative>,
        untagged: bool,
    },
    List(Box<Schema>),
    Value(ValueKind),
    Skip,
    /// Node kind this build does not understand. Rejected by [`validate_schema`].
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub tag: String,
    pub payload: Option<Schema>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Num,
    Bool,
    Vec2,
    Angle,
    Color,
    Defs,
    Ref(String),
    Unknown(String),
}

impl ValueKind {
    fn from_wire(raw: &Value, at: &Path) -> Result<Self, SchemaError> {
        match raw {
            Value::String(kind) => Ok(match kind.as_str() {
                "Num" => Self::Num,
                "Bool" => Self::Bool,
                "Vec2" => Self::Vec2,
                "Angle" => Self::Angle,
                "Color" => Self::Color,
                "Defs" => Self::Defs,
                _ => Self::Unknown(kind.clone()),
            }),
            Value::Object(map) if map.len() == 1 => {
                let (kind, body) = map.iter().next().ok_or_else(|| malformed(at, "empty value kind"))?;
                if kind != "Name" {
                    return Ok(Self::Unknown(kind.clone()));
                }
                let name = match body {
                    Value::String(name) => name.clone(),
                    Value::Array(items) => items
                        .first()
                        .and_then(Value::as_str)
                        .map(ToString::to_string)
                        .ok_or_else(|| malformed(at, "`Name` needs a reference name"))?,
                    _ => return Err(malformed(at, "`Name` needs a reference name")),
                };
                Ok(Self::Ref(name))
            }
            _ => Err(malformed(at, "value kind must be a string or a single-key object")),
        }
    }
}

impl Schema {
    pub fn structure(name: impl Into<String>, fields: Vec<(&str, Schema)>) -> Self {
        Self::Struct {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, schema)| StructField {
                    name: name.to_string(),
                    schema,
                })
                .collect(),
        }
    }

    pub fn tagged(name: impl Into<String>, alternatives: Vec<(&str, Option<Schema>)>) -> Self {
        Self::enumeration(name, alternatives, false)
    }

    pub fn untagged(name: impl Into<String>, alternatives: Vec<(&str, Option<Schema>)>) -> Self {
        Self::enumeration(name, alternatives, true)
    }

    fn enumeration(
        name: impl Into<String>,
        alternatives: Vec<(&str, Option<Schema>)>,
        untagged: bool,
    ) -> Self {
        Self::Enum {
            name: name.into(),
            alternatives: alternatives
                .into_iter()
                .map(|(tag, payload)| Alternative {
                    tag: tag.to_string(),
                    payload,
                })
                .collect(),
            untagged,
        }
    }

    pub fn list(element: Schema) -> Self {
        Self::List(Box::new(element))
    }

    /// Parses the model's wire representation.
    pub fn from_wire(raw: &Value) -> Result<Self, SchemaError> {
        Self::parse_node(raw, &Path::root())
    }

    fn parse_node(raw: &Value, at: &Path) -> Result<Self, SchemaError> {
        let map = match raw {
            Value::String(kind) if kind == "Skip" => return Ok(Self::Skip),
            Value::String(kind) => return Ok(Self::Unknown(kind.clone())),
            Value::Object(map) if map.len() == 1 => map,
            _ => return Err(malformed(at, "schema node must be a string or a single-key object")),
        };
        let Some((kind, body)) = map.iter().next() else {
            return Err(malformed(at, "empty schema node"));
        };

        match kind.as_str() {
            "Struct" => {
                let parts = body
                    .as_array()
                    .ok_or_else(|| malformed(at, "`Struct` body must be [name, fields]"))?;
                let name = string_at(parts, 0, at, "`Struct` name")?;
                let raw_fields = parts
                    .get(1)
                    .and_then(Value::as_array)
                    .ok_or_else(|| malformed(at, "`Struct` fields must be a list"))?;

                let mut fields = Vec::with_capacity(raw_fields.len());
                for raw_field in raw_fields {
                    let pair = raw_field
                        .as_array()
                        .ok_or_else(|| malformed(at, "struct field must be [name, schema]"))?;
                    let field_name = string_at(pair, 0, at, "struct field name")?;
                    let field_schema = pair
                        .get(1)
                        .ok_or_else(|| malformed(at, "struct field is missing its schema"))?;
                    let schema = Self::parse_node(field_schema, &at.field(&field_name))?;
                    fields.push(StructField {
                        name: field_name,
                        schema,
                    });
                }
                Ok(Self::Struct { name, fields })
            }
            "Enum" => {
                let parts = body
                    .as_array()
                    .ok_or_else(|| malformed(at, "`Enum` body must be [name, alternatives, untagged]"))?;
                let name = string_at(parts, 0, at, "`Enum` name")?;
                let raw_alternatives = parts
                    .get(1)
                    .and_then(Value::as_array)
                    .ok_or_else(|| malformed(at, "`Enum` alternatives must be a list"))?;
                let untagged = parts.get(2).and_then(Value::as_bool).unwrap_or(false);

                let mut alternatives = Vec::with_capacity(raw_alternatives.len());
                for raw_alternative in raw_alternatives {
                    alternatives.push(Self::parse_alternative(raw_alternative, at)?);
                }
                Ok(Self::Enum {
                    name,
                    alternatives,
                    untagged,
                })
            }
            "List" => Ok(Self::List(Box::new(Self::parse_node(body, &at.index(0))?))),
            "Val" => Ok(Self::Value(ValueKind::from_wire(body, at)?)),
            "Skip" => Ok(Self::Skip),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }

    fn parse_alternative(raw: &Value, at: &Path) -> Result<Alternative, SchemaError> {
        if let Some(tag) = raw.get("Unit") {
            let tag = tag
                .as_str()
                .ok_or_else(|| malformed(at, "`Unit` alternative needs a tag"))?;
            return Ok(Alternative {
                tag: tag.to_string(),
                payload: None,
            });
        }
        if let Some(body) = raw.get("Unnamed").and_then(Value::as_array) {
            let tag = string_at(body, 0, at, "`Unnamed` alternative tag")?;
            let payload = body
                .get(1)
                .ok_or_else(|| malformed(at, "`Unnamed` alternative is missing its payload"))?;
            let payload = Self::parse_node(payload, at)?;
            return Ok(Alternative {
                tag,
                payload: Some(payload),
            });
        }
        Err(malformed(at, "enum alternative must be `Unit` or `Unnamed`"))
    }

    /// Loose shape check used to pick an untagged alternative from a value.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Struct { .. } => value.is_object(),
            Self::List(_) => value.is_array(),
            Self::Enum {
                alternatives,
                untagged,
                ..
            } => {
                if *untagged {
                    alternatives.iter().any(|alternative| match &alternative.payload {
                        Some(payload) => payload.accepts(value),
                        None => value.as_str() == Some(alternative.tag.as_str()),
                    })
                } else {
                    value.get("type").and_then(Value::as_str).is_some()
                }
            }
            Self::Value(kind) => match kind {
                ValueKind::Num | ValueKind::Angle => value.is_number(),
                ValueKind::Bool => value.is_boolean(),
                ValueKind::Vec2 | ValueKind::Color => value.is_array(),
                ValueKind::Defs | ValueKind::Ref(_) => value.is_string(),
                ValueKind::Unknown(_) => false,
            },
            Self::Skip | Self::Unknown(_) => false,
        }
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Schema::from_wire(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("malformed schema at `{at}`: {reason}")]
    Malformed { at: String, reason: String },
    #[error("unknown schema variant `{kind}` at `{at}`")]
    UnknownVariant { at: String, kind: String },
    #[error("enum `{name}` at `{at}` declares no alternatives")]
    EmptyEnum { at: String, name: String },
    #[error("struct `{name}` declares field `{field}` twice")]
    DuplicateField { name: String, field: String },
    #[error("enum `{name}` declares tag `{tag}` twice")]
    DuplicateTag { name: String, tag: String },
}

fn malformed(at: &Path, reason: &str) -> SchemaError {
    SchemaError::Malformed {
        at: at.to_string(),
        reason: reason.to_string(),
    }
}

fn string_at(parts: &[Value], index: usize, at: &Path, what: &str) -> Result<String, SchemaError> {
    parts
        .get(index)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| malformed(at, &format!("{what} must be a string")))
}

/// Rejects schemas the renderer cannot honor. Unknown value kinds pass: the
/// renderer omits those fields on its own.
pub fn validate_schema(schema: &Schema) -> Result<(), SchemaError> {
    validate_node(schema, &Path::root())
}

fn validate_node(schema: &Schema, at: &Path) -> Result<(), SchemaError> {
    match schema {
        Schema::Struct { name, fields } => {
            let mut seen = BTreeSet::new();
            for field in fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        name: name.clone(),
                        field: field.name.clone(),
                    });
                }
                validate_node(&field.schema, &at.field(&field.name))?;
            }
            Ok(())
        }
        Schema::Enum {
            name, alternatives, ..
        } => {
            if alternatives.is_empty() {
                return Err(SchemaError::EmptyEnum {
                    at: at.to_string(),
                    name: name.clone(),
                });
            }
            let mut seen = BTreeSet::new();
            for alternative in alternatives {
                if !seen.insert(alternative.tag.as_str()) {
                    return Err(SchemaError::DuplicateTag {
                        name: name.clone(),
                        tag: alternative.tag.clone(),
                    });
                }
                if let Some(payload) = &alternative.payload {
                    validate_node(payload, at)?;
                }
            }
            Ok(())
        }
        Schema::List(element) => validate_node(element, &at.index(0)),
        Schema::Value(_) | Schema::Skip => Ok(()),
        Schema::Unknown(kind) => Err(SchemaError::UnknownVariant {
            at: at.to_string(),
            kind: kind.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> Schema {
        Schema::from_wire(&raw).expect("schema should parse")
    }

    #[test]
    fn parses_every_node_kind() {
        let schema = parse(json!({
            "Struct": ["Drawing", [
                ["x", {"Val": "Num"}],
                ["hidden", "Skip"],
                ["items", {"List": {"Val": "Vec2"}}],
                ["target", {"Val": {"Name": ["shape", false]}}],
                ["shape", {"Enum": ["Shape", [
                    {"Unnamed": ["Circle", {"Struct": ["Circle", [["r", {"Val": "Num"}]]]}]},
                    {"Unit": "Empty"}
                ], false]}]
            ]]
        }));

        let Schema::Struct { name, fields } = schema else {
            panic!("expected struct");
        };
        assert_eq!(name, "Drawing");
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0].schema, Schema::Value(ValueKind::Num));
        assert_eq!(fields[1].schema, Schema::Skip);
        assert_eq!(
            fields[2].schema,
            Schema::list(Schema::Value(ValueKind::Vec2))
        );
        assert_eq!(
            fields[3].schema,
            Schema::Value(ValueKind::Ref("shape".to_string()))
        );
        let Schema::Enum {
            alternatives,
            untagged,
            ..
        } = &fields[4].schema
        else {
            panic!("expected enum");
        };
        assert!(!untagged);
        assert_eq!(alternatives[1].tag, "Empty");
        assert!(alternatives[1].payload.is_none());
    }

    #[test]
    fn unknown_value_kind_parses_and_validates() {
        let schema = parse(json!({"Struct": ["S", [["w", {"Val": "Quaternion"}]]]}));
        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn unknown_node_kind_is_rejected_by_validation() {
        let schema = parse(json!({"Struct": ["S", [["m", {"Map": {"Val": "Num"}}]]]}));
        assert!(matches!(
            validate_schema(&schema),
            Err(SchemaError::UnknownVariant { kind, at }) if kind == "Map" && at == ".m"
        ));
    }

    #[test]
    fn malformed_struct_body_fails_to_parse() {
        let result = Schema::from_wire(&json!({"Struct": "oops"}));
        assert!(matches!(result, Err(SchemaError::Malformed { .. })));
    }

    #[test]
    fn duplicate_fields_and_empty_enums_are_rejected() {
        let dup = Schema::structure(
            "S",
            vec![
                ("a", Schema::Value(ValueKind::Num)),
                ("a", Schema::Value(ValueKind::Bool)),
            ],
        );
        assert!(matches!(
            validate_schema(&dup),
            Err(SchemaError::DuplicateField { .. })
        ));

        let empty = Schema::tagged("E", vec![]);
        assert!(matches!(
            validate_schema(&empty),
            Err(SchemaError::EmptyEnum { .. })
        ));
    }

    #[test]
    fn deserializes_through_serde() {
        let schema: Schema =
            serde_json::from_value(json!({"List": {"Val": "Color"}})).expect("should deserialize");
        assert_eq!(schema, Schema::list(Schema::Value(ValueKind::Color)));
    }
}
