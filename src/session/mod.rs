use crate::config::EditorOptions;
use crate::form::codec::FieldError;
use crate::form::runtime::{FormRuntime, RuntimeError};
use crate::history::config::{ConfigHistory, HistoryEntry};
use crate::history::store::HistoryStorage;
use crate::history::values::ValuesHistory;
use crate::model::{ConfigModel, ModelError};
use crate::theme::Theme;
use eframe::egui;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("{} field(s) hold values of the wrong type", .0.len())]
    Extraction(Vec<FieldError>),
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// How the last submission ended; drives the form's flash and message line.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(String),
    Invalid(Vec<FieldError>),
}

/// One editing session: the live form, the accepted-config history and the
/// recent parameter window.
pub struct EditorSession {
    form: FormRuntime,
    history: ConfigHistory,
    values: Option<ValuesHistory>,
    last_outcome: Option<SubmitOutcome>,
}

impl EditorSession {
    pub fn new(options: &EditorOptions, storage: Box<dyn HistoryStorage>) -> Self {
        Self {
            form: FormRuntime::new(),
            history: ConfigHistory::open(storage),
            values: options
                .keep_values_history
                .then(|| ValuesHistory::new(options.values_capacity)),
            last_outcome: None,
        }
    }

    pub fn form(&self) -> &FormRuntime {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormRuntime {
        &mut self.form
    }

    pub fn values(&self) -> Option<&ValuesHistory> {
        self.values.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&SubmitOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn render_form(&mut self, ui: &mut egui::Ui, theme: &Theme) {
        self.form.render_form(ui, theme, self.values.as_ref());
    }

    /// Loads a wire schema and renders it, seeded from the most recent accepted
    /// configuration when there is one.
    pub fn load_schema(&mut self, raw_schema: &Value) -> Result<(), RuntimeError> {
        self.form.load_schema_value(raw_schema)?;
        let init = self.history.last().map(|entry| entry.conf.clone());
        self.form.build_form(init.as_ref())
    }

    pub fn build_form(&mut self, init: Option<&Value>) -> Result<(), RuntimeError> {
        self.form.build_form(init)
    }

    pub fn extract_current_value(&self) -> Result<Value, Vec<FieldError>> {
        self.form.extract_current_value()
    }

    /// First half of a submission: the value to hand to the model.
    pub fn prepare_submission(&mut self) -> Result<Value, SubmitError> {
        self.form.extract_current_value().map_err(|errors| {
            tracing::info!(fields = errors.len(), "submission blocked by invalid fields");
            self.last_outcome = Some(SubmitOutcome::Invalid(errors.clone()));
            SubmitError::Extraction(errors)
        })
    }

    /// Second half of a submission, once the model has answered. Accepted
    /// values are recorded when `record` is set; rejections leave the history
    /// and the form untouched.
    pub fn finish_submission(
        &mut self,
        conf: Value,
        result: Result<(), String>,
        record: bool,
    ) -> Result<Value, SubmitError> {
        match result {
            Ok(()) => {
                if record {
                    self.history.push(conf.clone());
                }
                self.last_outcome = Some(SubmitOutcome::Accepted);
                Ok(conf)
            }
            Err(message) => {
                tracing::info!(%message, "configuration rejected by model");
                self.last_outcome = Some(SubmitOutcome::Rejected(message.clone()));
                Err(SubmitError::Rejected(message))
            }
        }
    }

    pub async fn submit(&mut self, model: &dyn ConfigModel) -> Result<Value, SubmitError> {
        let conf = self.prepare_submission()?;
        let result = model.validate(&conf).await;
        if result.is_ok() {
            model.advance_frame().await;
        }
        self.finish_submission(conf, result, true)
    }

    /// Pops the latest accepted configuration and rebuilds the form from it.
    /// The caller hands the returned value to the model without recording it.
    pub fn undo(&mut self) -> Option<Value> {
        let entry = self.history.pop()?;
        if let Err(err) = self.form.build_form(Some(&entry.conf)) {
            tracing::warn!(error = %err, "undo could not rebuild the form");
        }
        Some(entry.conf)
    }

    pub async fn undo_with(&mut self, model: &dyn ConfigModel) -> Option<Value> {
        let conf = self.undo()?;
        let result = model.validate(&conf).await;
        // A rejected reload still leaves the popped value in the form.
        if let Err(err) = self.finish_submission(conf.clone(), result, false) {
            tracing::warn!(error = %err, "model rejected the restored configuration");
        }
        Some(conf)
    }

    pub fn history(&self) -> Vec<&HistoryEntry> {
        self.history.view()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn rename_history(&mut self, id: &str, name: &str) -> bool {
        self.history.rename(id, name)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Rebuilds the form from a recorded entry without touching the history.
    pub fn load_history_entry(&mut self, id: &str) -> Option<Value> {
        let conf = self.history.get(id)?.conf.clone();
        if let Err(err) = self.form.build_form(Some(&conf)) {
            tracing::warn!(error = %err, id, "history entry could not be loaded");
            return None;
        }
        Some(conf)
    }

    pub fn update_values(&mut self, params: &Value) {
        if let Some(values) = &mut self.values {
            values.update(params);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::event::FormEvent;
    use crate::history::store::MemoryHistoryStore;
    use crate::model::DemoModel;
    use serde_json::json;

    fn options() -> EditorOptions {
        EditorOptions {
            storage_dir: std::env::temp_dir(),
            ..EditorOptions::default()
        }
    }

    fn wire_schema() -> Value {
        json!({"Struct": ["root", [
            ["speed", {"Val": "Num"}],
            ["items", {"List": {"Val": "Num"}}]
        ]]})
    }

    fn session_with(store: &MemoryHistoryStore) -> EditorSession {
        let mut session = EditorSession::new(&options(), Box::new(store.clone()));
        session
            .load_schema(&wire_schema())
            .expect("schema should load");
        session
    }

    fn edit(session: &mut EditorSession, path: &str, value: &str) {
        session
            .form_mut()
            .apply_event(FormEvent::FieldEdited {
                path: path.parse().expect("test path should parse"),
                value: value.to_string(),
            })
            .expect("edit should apply");
    }

    #[tokio::test]
    async fn accepted_submission_is_recorded_and_advances_model() {
        let store = MemoryHistoryStore::new();
        let mut session = session_with(&store);
        let model = DemoModel::new();

        edit(&mut session, ".speed", "2");
        let conf = session.submit(&model).await.expect("submission should pass");

        assert_eq!(conf, json!({"speed": 2, "items": []}));
        assert_eq!(session.history_len(), 1);
        assert_eq!(store.entries()[0].conf, conf);
        assert_eq!(session.last_outcome(), Some(&SubmitOutcome::Accepted));
        assert_eq!(model.frame().await, 1);
    }

    #[tokio::test]
    async fn rejected_submission_leaves_history_and_form_alone() {
        let store = MemoryHistoryStore::new();
        let mut session = session_with(&store);
        let model = DemoModel::new();

        edit(&mut session, ".speed", "-3");
        let err = session
            .submit(&model)
            .await
            .expect_err("negative speed should be rejected");

        assert!(matches!(err, SubmitError::Rejected(ref message) if message.contains("negative")));
        assert_eq!(session.history_len(), 0);
        assert_eq!(
            session.extract_current_value().expect("form stays valid"),
            json!({"speed": -3, "items": []})
        );
        assert_eq!(model.frame().await, 0);
    }

    #[tokio::test]
    async fn invalid_fields_block_submission_before_the_model() {
        let mut session = session_with(&MemoryHistoryStore::new());
        let model = DemoModel::new();

        edit(&mut session, ".speed", "fast");
        let err = session.submit(&model).await.expect_err("text is not a number");
        assert!(matches!(err, SubmitError::Extraction(ref errors) if errors.len() == 1));
        assert!(matches!(session.last_outcome(), Some(SubmitOutcome::Invalid(_))));
        assert!(model.params().await.is_none());
    }

    #[tokio::test]
    async fn undo_restores_previous_configurations_in_order() {
        let mut session = session_with(&MemoryHistoryStore::new());
        let model = DemoModel::new();

        edit(&mut session, ".speed", "1");
        session.submit(&model).await.expect("first submission");
        edit(&mut session, ".speed", "2");
        session.submit(&model).await.expect("second submission");

        let undone = session.undo_with(&model).await.expect("history has entries");
        assert_eq!(undone["speed"], json!(2));
        assert_eq!(session.history_len(), 1);

        let undone = session.undo_with(&model).await.expect("history has entries");
        assert_eq!(undone["speed"], json!(1));
        assert_eq!(
            session.extract_current_value().expect("form should be valid"),
            json!({"speed": 1, "items": []})
        );
        assert_eq!(session.history_len(), 0);

        assert!(session.undo_with(&model).await.is_none());
    }

    #[test]
    fn schema_load_seeds_form_from_latest_history_entry() {
        let store = MemoryHistoryStore::new();
        {
            let mut session = session_with(&store);
            session
                .finish_submission(json!({"speed": 4.0, "items": [1.0]}), Ok(()), true)
                .expect("accepted");
        }
        let session = session_with(&store);
        assert_eq!(
            session.extract_current_value().expect("form should be valid"),
            json!({"speed": 4.0, "items": [1.0]})
        );
    }

    #[test]
    fn history_rename_load_and_clear() {
        let mut session = session_with(&MemoryHistoryStore::new());
        session
            .finish_submission(json!({"speed": 1.0, "items": []}), Ok(()), true)
            .expect("accepted");
        session
            .finish_submission(json!({"speed": 9.0, "items": []}), Ok(()), true)
            .expect("accepted");

        let oldest = session.history()[1].id.clone();
        assert!(session.rename_history(&oldest, "slow"));
        assert_eq!(session.history()[1].name.as_deref(), Some("slow"));

        let loaded = session.load_history_entry(&oldest).expect("entry should load");
        assert_eq!(loaded["speed"], json!(1.0));
        assert_eq!(
            session.extract_current_value().expect("form should be valid")["speed"],
            json!(1.0)
        );
        assert_eq!(session.history_len(), 2);

        session.clear_history();
        assert!(session.history().is_empty());
        assert!(session.load_history_entry(&oldest).is_none());
    }

    #[test]
    fn values_history_follows_options() {
        let mut session = session_with(&MemoryHistoryStore::new());
        session.update_values(&json!({"speed": 1.0}));
        assert_eq!(session.values().map(ValuesHistory::len), Some(1));

        let disabled = EditorOptions {
            keep_values_history: false,
            ..options()
        };
        let mut session = EditorSession::new(&disabled, Box::new(MemoryHistoryStore::new()));
        session.update_values(&json!({"speed": 1.0}));
        assert!(session.values().is_none());
    }
}
