use crate::form::path::Path;
use crate::form::schema::{Schema, ValueKind};

/// Editable control state. Numbers keep their raw text so a half-typed value
/// survives re-renders; coercion happens at extraction time.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafInput {
    Number(String),
    Toggle(bool),
    Text(String),
    MultilineText(String),
    Choice {
        options: Vec<String>,
        selected: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub path: Path,
    pub input: LeafInput,
    /// Leaves of unselected enum alternatives stay in the tree but are skipped
    /// by `flatten`.
    pub active: bool,
    /// Short caption for multi-component values (`x`, `h`, ...).
    pub caption: Option<&'static str>,
    /// Whether a live trend indicator is bound to this leaf's path.
    pub trend: bool,
}

impl Leaf {
    pub fn new(path: Path, input: LeafInput) -> Self {
        Self {
            path,
            input,
            active: true,
            caption: None,
            trend: false,
        }
    }

    pub fn with_caption(mut self, caption: &'static str) -> Self {
        self.caption = Some(caption);
        self
    }

    pub fn with_trend(mut self) -> Self {
        self.trend = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Struct(StructWidget),
    Enum(EnumWidget),
    List(ListWidget),
    Value(ValueWidget),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructWidget {
    pub name: String,
    pub path: Path,
    pub fields: Vec<FieldWidget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldWidget {
    pub name: String,
    pub widget: Widget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumWidget {
    pub name: String,
    pub path: Path,
    pub untagged: bool,
    pub active: bool,
    /// Discriminator bound to `path.type` (tagged) or `path` itself (untagged).
    pub selector: Leaf,
    pub alternatives: Vec<AlternativeWidget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeWidget {
    pub tag: String,
    /// Rendered at the enum's own path so the active payload flattens in place.
    pub payload: Option<Widget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListWidget {
    pub path: Path,
    pub element: Schema,
    /// The list's own presence marker; flattens to an empty collection when
    /// the list has no elements.
    pub active: bool,
    pub items: Vec<Widget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueWidget {
    pub kind: ValueKind,
    pub path: Path,
    pub leaves: Vec<Leaf>,
}

impl EnumWidget {
    pub fn selected(&self) -> &str {
        match &self.selector.input {
            LeafInput::Choice { selected, .. } => selected.as_str(),
            _ => "",
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.alternatives.iter().map(|alternative| alternative.tag.as_str())
    }

    /// Switches the active alternative. Returns `false` for unknown tags.
    pub fn select(&mut self, tag: &str) -> bool {
        if !self.alternatives.iter().any(|alternative| alternative.tag == tag) {
            return false;
        }
        if let LeafInput::Choice { selected, .. } = &mut self.selector.input {
            *selected = tag.to_string();
        }
        self.set_active(self.active);
        true
    }

    pub fn active_alternative(&self) -> Option<&AlternativeWidget> {
        let selected = self.selected();
        self.alternatives
            .iter()
            .find(|alternative| alternative.tag == selected)
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
        let selected = self.selected().to_string();

        let selected_is_unit = self
            .alternatives
            .iter()
            .find(|alternative| alternative.tag == selected)
            .map(|alternative| alternative.payload.is_none())
            .unwrap_or(true);
        // An untagged payload alternative is identified by its shape alone.
        self.selector.active = active && (!self.untagged || selected_is_unit);

        for alternative in &mut self.alternatives {
            let alternative_active = active && alternative.tag == selected;
            if let Some(payload) = &mut alternative.payload {
                payload.set_active(alternative_active);
            }
        }
    }
}

impl Widget {
    /// Recomputes activity flags for this subtree, honoring nested enum selections.
    pub fn set_active(&mut self, active: bool) {
        match self {
            Self::Struct(widget) => {
                for field in &mut widget.fields {
                    field.widget.set_active(active);
                }
            }
            Self::Enum(widget) => widget.set_active(active),
            Self::List(widget) => {
                widget.active = active;
                for item in &mut widget.items {
                    item.set_active(active);
                }
            }
            Self::Value(widget) => {
                for leaf in &mut widget.leaves {
                    leaf.active = active;
                }
            }
        }
    }

    /// Every leaf in schema order, active or not. List markers are not leaves.
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Self::Struct(widget) => {
                for field in &widget.fields {
                    field.widget.collect_leaves(out);
                }
            }
            Self::Enum(widget) => {
                out.push(&widget.selector);
                for alternative in &widget.alternatives {
                    if let Some(payload) = &alternative.payload {
                        payload.collect_leaves(out);
                    }
                }
            }
            Self::List(widget) => {
                for item in &widget.items {
                    item.collect_leaves(out);
                }
            }
            Self::Value(widget) => out.extend(widget.leaves.iter()),
        }
    }

    pub fn leaf_mut(&mut self, path: &Path) -> Option<&mut Leaf> {
        match self {
            Self::Struct(widget) => widget
                .fields
                .iter_mut()
                .find_map(|field| field.widget.leaf_mut(path)),
            Self::Enum(widget) => {
                if widget.selector.path == *path && widget.selector.active {
                    return Some(&mut widget.selector);
                }
                widget
                    .alternatives
                    .iter_mut()
                    .filter_map(|alternative| alternative.payload.as_mut())
                    .filter(|payload| payload.is_active())
                    .find_map(|payload| payload.leaf_mut(path))
            }
            Self::List(widget) => widget
                .items
                .iter_mut()
                .find_map(|item| item.leaf_mut(path)),
            Self::Value(widget) => widget
                .leaves
                .iter_mut()
                .find(|leaf| leaf.path == *path && leaf.active),
        }
    }

    /// Finds the list rendered at `path`, searching only active subtrees.
    pub fn list_mut(&mut self, path: &Path) -> Option<&mut ListWidget> {
        match self {
            Self::List(widget) => {
                if widget.path == *path && widget.active {
                    Some(widget)
                } else {
                    widget.items.iter_mut().find_map(|item| item.list_mut(path))
                }
            }
            Self::Struct(widget) => widget
                .fields
                .iter_mut()
                .find_map(|field| field.widget.list_mut(path)),
            Self::Enum(widget) => widget
                .alternatives
                .iter_mut()
                .filter_map(|alternative| alternative.payload.as_mut())
                .filter(|payload| payload.is_active())
                .find_map(|payload| payload.list_mut(path)),
            Self::Value(_) => None,
        }
    }

    /// Finds the enum rendered at `path`, searching only active subtrees.
    pub fn enum_mut(&mut self, path: &Path) -> Option<&mut EnumWidget> {
        match self {
            Self::Enum(widget) => {
                if widget.path == *path && widget.active {
                    Some(widget)
                } else {
                    widget
                        .alternatives
                        .iter_mut()
                        .filter_map(|alternative| alternative.payload.as_mut())
                        .filter(|payload| payload.is_active())
                        .find_map(|payload| payload.enum_mut(path))
                }
            }
            Self::Struct(widget) => widget
                .fields
                .iter_mut()
                .find_map(|field| field.widget.enum_mut(path)),
            Self::List(widget) => widget.items.iter_mut().find_map(|item| item.enum_mut(path)),
            Self::Value(_) => None,
        }
    }

    /// A subtree is active when any of its leaves or markers would be flattened.
    pub fn is_active(&self) -> bool {
        match self {
            Self::Struct(widget) => widget.fields.iter().any(|field| field.widget.is_active()),
            Self::Enum(widget) => widget.active,
            Self::List(widget) => widget.active,
            Self::Value(widget) => widget.leaves.iter().any(|leaf| leaf.active),
        }
    }
}
