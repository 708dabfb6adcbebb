use crate::form::event::FormEvent;
use crate::form::path::Path;
use crate::form::widget::{EnumWidget, Leaf, LeafInput, ListWidget, Widget};
use crate::history::values::ValuesHistory;
use crate::theme::Theme;
use eframe::egui::{self, RichText};
use std::collections::BTreeSet;

const NUMBER_WIDTH: f32 = 64.0;
const TEXT_WIDTH: f32 = 140.0;
const SPARK_SIZE: [f32; 2] = [36.0, 14.0];

/// Draws a widget tree. Nothing is mutated while drawing: every interaction is
/// reported through `emit` and applied by the runtime once the frame is done.
pub struct FormView<'a> {
    theme: &'a Theme,
    values: Option<&'a ValuesHistory>,
    invalid: &'a BTreeSet<Path>,
}

impl<'a> FormView<'a> {
    pub fn new(
        theme: &'a Theme,
        values: Option<&'a ValuesHistory>,
        invalid: &'a BTreeSet<Path>,
    ) -> Self {
        Self {
            theme,
            values,
            invalid,
        }
    }

    pub fn show(&self, widget: &Widget, ui: &mut egui::Ui, emit: &mut dyn FnMut(FormEvent)) {
        self.widget(widget, None, ui, emit);
    }

    fn widget(
        &self,
        widget: &Widget,
        label: Option<&str>,
        ui: &mut egui::Ui,
        emit: &mut dyn FnMut(FormEvent),
    ) {
        match widget {
            Widget::Struct(structure) => {
                let Some(label) = label else {
                    // Root structs and enum payloads draw their fields inline.
                    for field in &structure.fields {
                        self.widget(&field.widget, Some(&field.name), ui, emit);
                    }
                    return;
                };
                egui::CollapsingHeader::new(self.heading(label))
                    .id_salt(("struct", structure.path.to_string()))
                    .default_open(true)
                    .show(ui, |ui| {
                        for field in &structure.fields {
                            self.widget(&field.widget, Some(&field.name), ui, emit);
                        }
                    });
            }
            Widget::Enum(enumeration) => {
                let label = label.unwrap_or(&enumeration.name);
                egui::CollapsingHeader::new(self.heading(label))
                    .id_salt(("enum", enumeration.path.to_string()))
                    .default_open(true)
                    .show(ui, |ui| self.enumeration(enumeration, ui, emit));
            }
            Widget::List(list) => {
                let label = format!("{} [{}]", label.unwrap_or("items"), list.items.len());
                egui::CollapsingHeader::new(self.heading(&label))
                    .id_salt(("list", list.path.to_string()))
                    .default_open(true)
                    .show(ui, |ui| self.list(list, ui, emit));
            }
            Widget::Value(value) => {
                ui.horizontal(|ui| {
                    if let Some(label) = label {
                        ui.label(
                            RichText::new(label)
                                .color(self.theme.text_muted)
                                .size(12.0),
                        );
                    }
                    for leaf in &value.leaves {
                        self.leaf(leaf, ui, emit);
                    }
                });
            }
        }
    }

    fn heading(&self, label: &str) -> RichText {
        RichText::new(label).color(self.theme.text_primary).size(13.0)
    }

    fn enumeration(
        &self,
        enumeration: &EnumWidget,
        ui: &mut egui::Ui,
        emit: &mut dyn FnMut(FormEvent),
    ) {
        let mut selected = enumeration.selected().to_string();
        let mut changed = false;
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(&enumeration.name)
                    .color(self.theme.text_muted)
                    .size(12.0),
            );
            egui::ComboBox::from_id_salt(("variant", enumeration.path.to_string()))
                .selected_text(selected.clone())
                .show_ui(ui, |ui| {
                    for tag in enumeration.tags() {
                        if ui
                            .selectable_value(&mut selected, tag.to_string(), tag)
                            .changed()
                        {
                            changed = true;
                        }
                    }
                });
        });
        if changed {
            emit(FormEvent::VariantSelected {
                path: enumeration.path.clone(),
                tag: selected,
            });
        }

        if let Some(payload) = enumeration
            .active_alternative()
            .and_then(|alternative| alternative.payload.as_ref())
        {
            self.widget(payload, None, ui, emit);
        }
    }

    fn list(&self, list: &ListWidget, ui: &mut egui::Ui, emit: &mut dyn FnMut(FormEvent)) {
        for (index, item) in list.items.iter().enumerate() {
            self.insert_button(list, index, ui, emit);
            ui.horizontal(|ui| {
                if ui
                    .small_button(RichText::new("×").color(self.theme.danger))
                    .on_hover_text("Remove element")
                    .clicked()
                {
                    emit(FormEvent::ListDelete {
                        path: list.path.clone(),
                        index,
                    });
                }
                ui.vertical(|ui| self.widget(item, Some(&index.to_string()), ui, emit));
            });
        }
        self.insert_button(list, list.items.len(), ui, emit);
    }

    fn insert_button(
        &self,
        list: &ListWidget,
        index: usize,
        ui: &mut egui::Ui,
        emit: &mut dyn FnMut(FormEvent),
    ) {
        if ui
            .small_button(RichText::new("+").color(self.theme.accent_primary))
            .on_hover_text("Insert element here")
            .clicked()
        {
            emit(FormEvent::ListInsert {
                path: list.path.clone(),
                index,
            });
        }
    }

    fn leaf(&self, leaf: &Leaf, ui: &mut egui::Ui, emit: &mut dyn FnMut(FormEvent)) {
        if let Some(caption) = leaf.caption {
            ui.label(
                RichText::new(caption)
                    .color(self.theme.text_muted)
                    .size(11.0),
            );
        }

        let edited = match &leaf.input {
            LeafInput::Number(text) => {
                let mut value = text.clone();
                let mut edit = egui::TextEdit::singleline(&mut value).desired_width(NUMBER_WIDTH);
                if self.invalid.contains(&leaf.path) {
                    edit = edit.text_color(self.theme.danger);
                }
                let changed = ui.add(edit).changed();
                if leaf.trend {
                    self.trend(&leaf.path, ui);
                }
                changed.then_some(value)
            }
            LeafInput::Toggle(checked) => {
                let mut value = *checked;
                ui.checkbox(&mut value, "")
                    .changed()
                    .then(|| value.to_string())
            }
            LeafInput::Text(text) => {
                let mut value = text.clone();
                ui.add(egui::TextEdit::singleline(&mut value).desired_width(TEXT_WIDTH))
                    .changed()
                    .then_some(value)
            }
            LeafInput::MultilineText(text) => {
                let mut value = text.clone();
                ui.add(
                    egui::TextEdit::multiline(&mut value)
                        .code_editor()
                        .desired_rows(3)
                        .desired_width(f32::INFINITY),
                )
                .changed()
                .then_some(value)
            }
            LeafInput::Choice { selected, .. } => {
                ui.label(RichText::new(selected).color(self.theme.text_primary));
                None
            }
        };

        if let Some(value) = edited {
            emit(FormEvent::FieldEdited {
                path: leaf.path.clone(),
                value,
            });
        }
    }

    fn trend(&self, path: &Path, ui: &mut egui::Ui) {
        let Some(values) = self.values else {
            return;
        };
        let summary = values.trend(path);
        let (rect, _) = ui.allocate_exact_size(SPARK_SIZE.into(), egui::Sense::hover());
        let points: Vec<egui::Pos2> = summary
            .points
            .iter()
            .map(|[x, y]| {
                egui::pos2(
                    rect.left() + x * rect.width(),
                    rect.bottom() - y * rect.height(),
                )
            })
            .collect();
        let painter = ui.painter();
        match points.len() {
            0 => {}
            1 => {
                painter.circle_filled(points[0], 1.5, self.theme.accent_primary);
            }
            _ => {
                painter.add(egui::Shape::line(
                    points,
                    egui::Stroke::new(1.0, self.theme.accent_primary),
                ));
            }
        }
        ui.label(
            RichText::new(summary.label)
                .monospace()
                .color(self.theme.text_muted)
                .size(11.0),
        );
    }
}
