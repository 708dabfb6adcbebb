use crate::form::codec::{check_leaves, flatten, rehydrate, FieldError};
use crate::form::event::{FormEvent, FormEventLog};
use crate::form::list::{self, ListEditError};
use crate::form::path::Path;
use crate::form::render::render;
use crate::form::schema::{validate_schema, Schema, SchemaError};
use crate::form::view::FormView;
use crate::form::widget::{LeafInput, Widget};
use crate::history::values::ValuesHistory;
use crate::theme::Theme;
use eframe::egui::{self, RichText};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("schema validation error: {0}")]
    Schema(#[from] SchemaError),
    #[error("no form has been built")]
    NoForm,
    #[error(transparent)]
    ListEdit(#[from] ListEditError),
    #[error("no active enum at `{0}`")]
    UnknownEnum(Path),
    #[error("`{tag}` is not an alternative of the enum at `{path}`")]
    UnknownAlternative { path: Path, tag: String },
    #[error("no active field at `{0}`")]
    UnknownField(Path),
}

/// Owns the schema and the rendered tree for one editor, and applies the
/// interactions the view reports.
pub struct FormRuntime {
    schema: Option<Schema>,
    tree: Option<Widget>,
    runtime_error: Option<RuntimeError>,
    event_log: FormEventLog,
}

impl Default for FormRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FormRuntime {
    pub fn new() -> Self {
        Self {
            schema: None,
            tree: None,
            runtime_error: None,
            event_log: FormEventLog::default(),
        }
    }

    /// Parses and validates a wire schema. A rejected schema clears the form.
    pub fn load_schema_value(&mut self, raw_schema: &Value) -> Result<(), RuntimeError> {
        self.schema = None;
        self.tree = None;
        self.runtime_error = None;
        self.event_log.clear();

        let loaded = Schema::from_wire(raw_schema).and_then(|schema| {
            validate_schema(&schema)?;
            Ok(schema)
        });
        match loaded {
            Ok(schema) => {
                self.schema = Some(schema);
                Ok(())
            }
            Err(err) => {
                let error = RuntimeError::Schema(err);
                self.runtime_error = Some(error.clone());
                Err(error)
            }
        }
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        self.runtime_error.as_ref()
    }

    pub fn event_log(&self) -> &FormEventLog {
        &self.event_log
    }

    /// Replaces the rendered tree with one seeded from `init`.
    pub fn build_form(&mut self, init: Option<&Value>) -> Result<(), RuntimeError> {
        let schema = self.schema.as_ref().ok_or(RuntimeError::NoForm)?;
        self.tree = render(schema, init);
        if self.tree.is_none() {
            tracing::warn!("schema root rendered nothing");
        }
        Ok(())
    }

    /// The config value the form currently represents. Fails when any active
    /// number field holds text that does not parse.
    pub fn extract_current_value(&self) -> Result<Value, Vec<FieldError>> {
        let Some(tree) = &self.tree else {
            return Ok(Value::Object(serde_json::Map::new()));
        };
        let errors = check_leaves(tree);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(rehydrate(&flatten(tree)))
    }

    pub fn apply_event(&mut self, event: FormEvent) -> Result<(), RuntimeError> {
        let tree = self.tree.as_mut().ok_or(RuntimeError::NoForm)?;
        match &event {
            FormEvent::FieldEdited { path, value } => {
                let leaf = tree
                    .leaf_mut(path)
                    .ok_or_else(|| RuntimeError::UnknownField(path.clone()))?;
                match &mut leaf.input {
                    LeafInput::Number(text)
                    | LeafInput::Text(text)
                    | LeafInput::MultilineText(text) => *text = value.clone(),
                    LeafInput::Toggle(checked) => *checked = value == "true",
                    LeafInput::Choice { .. } => {
                        return Err(RuntimeError::UnknownField(path.clone()));
                    }
                }
            }
            FormEvent::VariantSelected { path, tag } => {
                let enumeration = tree
                    .enum_mut(path)
                    .ok_or_else(|| RuntimeError::UnknownEnum(path.clone()))?;
                if !enumeration.select(tag) {
                    return Err(RuntimeError::UnknownAlternative {
                        path: path.clone(),
                        tag: tag.clone(),
                    });
                }
            }
            FormEvent::ListInsert { path, index } => list::insert_at(tree, path, *index)?,
            FormEvent::ListDelete { path, index } => list::delete_at(tree, path, *index)?,
        }
        tracing::debug!(event = %event.to_log_line(), "form event applied");
        self.event_log.push(event);
        Ok(())
    }

    pub fn render_form(
        &mut self,
        ui: &mut egui::Ui,
        theme: &Theme,
        values: Option<&ValuesHistory>,
    ) {
        if let Some(error) = &self.runtime_error {
            let frame = theme.card_frame();
            frame.show(ui, |ui| {
                ui.label(
                    RichText::new("Schema rejected")
                        .color(theme.danger)
                        .size(13.0),
                );
                ui.add_space(theme.spacing_8);
                ui.label(
                    RichText::new(error.to_string())
                        .color(theme.text_muted)
                        .size(12.0),
                );
            });
            return;
        }

        let Some(tree) = &self.tree else {
            ui.label(RichText::new("No form loaded").color(theme.text_muted));
            return;
        };

        let invalid: BTreeSet<Path> = check_leaves(tree)
            .into_iter()
            .map(|error| error.path)
            .collect();
        let view = FormView::new(theme, values, &invalid);
        let mut pending = Vec::new();
        view.show(tree, ui, &mut |event| pending.push(event));

        for event in pending {
            if let Err(err) = self.apply_event(event) {
                tracing::warn!(error = %err, "form event dropped");
            }
        }
    }
}
