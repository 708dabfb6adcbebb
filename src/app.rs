use crate::config::EditorOptions;
use crate::event::AppEvent;
use crate::model::ModelClient;
use crate::session::EditorSession;
use crate::theme::Theme;
use chrono::Local;
use eframe::egui::{self, RichText, ScrollArea};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

const FLASH_DURATION: Duration = Duration::from_millis(600);
const PARAMS_INTERVAL: Duration = Duration::from_millis(250);
const DIAGNOSTICS_LIMIT: usize = 500;

enum HistoryAction {
    Load(String),
    Rename(String, String),
    Clear,
}

pub struct EditorApp {
    rx: Receiver<AppEvent>,
    client: ModelClient,
    session: EditorSession,
    options: EditorOptions,
    theme: Theme,
    theme_applied: bool,
    awaiting_model: bool,
    error_message: Option<String>,
    flash: Option<(bool, Instant)>,
    rename_buffers: BTreeMap<String, String>,
    diagnostics_log: VecDeque<String>,
    next_form_event: u64,
    last_params_request: Option<Instant>,
}

impl EditorApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        client: ModelClient,
        session: EditorSession,
        options: EditorOptions,
    ) -> Self {
        client.request_schema(options.schema_hints.clone());
        let mut app = Self {
            rx,
            client,
            session,
            options,
            theme: Theme::default(),
            theme_applied: false,
            awaiting_model: false,
            error_message: None,
            flash: None,
            rename_buffers: BTreeMap::new(),
            diagnostics_log: VecDeque::new(),
            next_form_event: 0,
            last_params_request: None,
        };
        app.log_diagnostic("requested schema from model");
        app
    }

    fn timestamp() -> String {
        Local::now().format("%H:%M:%S").to_string()
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push_back(format!("[{}] {}", Self::timestamp(), message.into()));
        while self.diagnostics_log.len() > DIAGNOSTICS_LIMIT {
            self.diagnostics_log.pop_front();
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event, ctx),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent, ctx: &egui::Context) {
        match event {
            AppEvent::SchemaLoaded(raw_schema) => {
                match self.session.load_schema(&raw_schema) {
                    Ok(()) => self.log_diagnostic("schema loaded"),
                    Err(err) => {
                        tracing::error!(error = %err, "schema rejected");
                        self.log_diagnostic(format!("schema rejected: {err}"));
                    }
                }
                ctx.request_repaint();
            }
            AppEvent::ValidationFinished {
                conf,
                result,
                record,
            } => {
                self.awaiting_model = false;
                match self.session.finish_submission(conf, result, record) {
                    Ok(_) => {
                        self.error_message = None;
                        self.flash = Some((true, Instant::now()));
                        let verb = if record { "accepted" } else { "reloaded" };
                        self.log_diagnostic(format!("configuration {verb}"));
                    }
                    Err(err) => {
                        self.error_message = Some(err.to_string());
                        self.flash = Some((false, Instant::now()));
                        self.log_diagnostic(format!("configuration rejected: {err}"));
                    }
                }
                ctx.request_repaint();
            }
            AppEvent::ParamsUpdated(params) => self.session.update_values(&params),
            AppEvent::ModelFailed(message) => {
                self.awaiting_model = false;
                tracing::warn!(%message, "model request failed");
                self.log_diagnostic(format!("model error: {message}"));
                self.error_message = Some(message);
            }
        }
    }

    fn submit(&mut self) {
        if self.awaiting_model {
            return;
        }
        match self.session.prepare_submission() {
            Ok(conf) => {
                self.awaiting_model = true;
                self.client.request_validation(conf, true);
            }
            Err(err) => {
                self.error_message = Some(err.to_string());
                self.flash = Some((false, Instant::now()));
            }
        }
    }

    fn undo(&mut self) {
        if self.awaiting_model {
            return;
        }
        match self.session.undo() {
            Some(conf) => {
                self.awaiting_model = true;
                self.client.request_validation(conf, false);
            }
            None => self.log_diagnostic("nothing to undo"),
        }
    }

    fn poll_params(&mut self, ctx: &egui::Context) {
        if self.session.values().is_none() {
            return;
        }
        let due = self
            .last_params_request
            .map_or(true, |last| last.elapsed() >= PARAMS_INTERVAL);
        if due {
            self.client.request_params();
            self.last_params_request = Some(Instant::now());
        }
        ctx.request_repaint_after(PARAMS_INTERVAL);
    }

    /// Copies newly applied structural form events into the diagnostics log;
    /// individual keystrokes stay out of it.
    fn log_form_events(&mut self) {
        let log = self.session.form().event_log();
        let lines: Vec<String> = log
            .structural_since(self.next_form_event)
            .map(|(_, event)| event.to_log_line())
            .collect();
        self.next_form_event = log.next_seq();
        for line in lines {
            self.log_diagnostic(line);
        }
    }

    fn active_flash(&self) -> Option<bool> {
        self.flash
            .filter(|(_, started)| started.elapsed() < FLASH_DURATION)
            .map(|(accepted, _)| accepted)
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let mut submit = false;
        let mut undo = false;
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Dovekie");
                if let Some(sketch) = &self.options.sketch_name {
                    ui.separator();
                    ui.label(RichText::new(sketch).color(self.theme.text_muted));
                }
                ui.separator();
                submit = ui
                    .add_enabled(!self.awaiting_model, egui::Button::new("Submit"))
                    .on_hover_text("Ctrl+Enter")
                    .clicked();
                undo = ui
                    .add_enabled(
                        !self.awaiting_model && self.session.history_len() > 0,
                        egui::Button::new("Undo"),
                    )
                    .clicked();
                if self.awaiting_model {
                    ui.spinner();
                }
            });
        });

        submit |= ctx.input(|input| input.modifiers.command && input.key_pressed(egui::Key::Enter));
        if submit {
            self.submit();
        }
        if undo {
            self.undo();
        }
    }

    fn render_history_panel(&mut self, ctx: &egui::Context) {
        let live: BTreeSet<&str> = self
            .session
            .history()
            .into_iter()
            .map(|entry| entry.id.as_str())
            .collect();
        self.rename_buffers.retain(|id, _| live.contains(id.as_str()));

        let mut action = None;
        egui::SidePanel::right("history_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("History");
                ui.separator();
                ScrollArea::vertical()
                    .id_salt("history_entries")
                    .show(ui, |ui| {
                        for entry in self.session.history() {
                            let buffer = self
                                .rename_buffers
                                .entry(entry.id.clone())
                                .or_insert_with(|| entry.name.clone().unwrap_or_default());
                            self.theme.history_row_frame().show(ui, |ui| {
                                let title = entry
                                    .name
                                    .as_deref()
                                    .filter(|name| !name.trim().is_empty())
                                    .unwrap_or(&entry.id);
                                if ui
                                    .link(RichText::new(title).color(self.theme.text_primary))
                                    .clicked()
                                {
                                    action = Some(HistoryAction::Load(entry.id.clone()));
                                }
                                ui.label(
                                    RichText::new(
                                        entry
                                            .time
                                            .with_timezone(&Local)
                                            .format("%Y-%m-%d %H:%M:%S")
                                            .to_string(),
                                    )
                                    .color(self.theme.text_muted)
                                    .size(11.0),
                                );
                                ui.horizontal(|ui| {
                                    let response = ui.add(
                                        egui::TextEdit::singleline(buffer)
                                            .desired_width(150.0)
                                            .hint_text("name"),
                                    );
                                    let commit = response.lost_focus()
                                        && ui.input(|input| input.key_pressed(egui::Key::Enter));
                                    if ui.small_button("Rename").clicked() || commit {
                                        action = Some(HistoryAction::Rename(
                                            entry.id.clone(),
                                            buffer.clone(),
                                        ));
                                    }
                                });
                            });
                            ui.add_space(self.theme.spacing_4);
                        }
                    });
                ui.separator();
                if ui
                    .add_enabled(self.session.history_len() > 0, egui::Button::new("Clear history"))
                    .clicked()
                {
                    action = Some(HistoryAction::Clear);
                }
            });

        match action {
            Some(HistoryAction::Load(id)) => {
                if self.session.load_history_entry(&id).is_some() {
                    self.log_diagnostic(format!("loaded history entry {id}"));
                }
            }
            Some(HistoryAction::Rename(id, name)) => {
                if self.session.rename_history(&id, &name) {
                    self.log_diagnostic(format!("renamed history entry {id}"));
                }
            }
            Some(HistoryAction::Clear) => {
                self.session.clear_history();
                self.rename_buffers.clear();
                self.log_diagnostic("history cleared");
            }
            None => {}
        }
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) {
        let flash = self.active_flash();
        if flash.is_some() {
            ctx.request_repaint_after(FLASH_DURATION);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(message) = &self.error_message {
                ui.label(RichText::new(message).color(self.theme.danger));
                ui.add_space(self.theme.spacing_8);
            }

            let form_height = (ui.available_height() - 140.0).max(160.0);
            ScrollArea::vertical()
                .id_salt("form")
                .max_height(form_height)
                .show(ui, |ui| {
                    self.theme.flash_frame(flash).show(ui, |ui| {
                        self.session.render_form(ui, &self.theme);
                    });
                });

            ui.separator();
            egui::CollapsingHeader::new("Diagnostics")
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(90.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(entry);
                            }
                        });
                });
        });
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            self.theme.apply_visuals(ctx);
            self.theme_applied = true;
        }
        self.drain_events(ctx);
        self.poll_params(ctx);
        self.render_top_bar(ctx);
        self.render_history_panel(ctx);
        self.render_center_panel(ctx);
        self.log_form_events();
    }
}
