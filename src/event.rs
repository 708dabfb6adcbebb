use serde_json::Value;

/// Results of model requests, posted from the async runtime to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    SchemaLoaded(Value),
    /// `record` is false when the model reloads an undone configuration.
    ValidationFinished {
        conf: Value,
        result: Result<(), String>,
        record: bool,
    },
    ParamsUpdated(Value),
    ModelFailed(String),
}
