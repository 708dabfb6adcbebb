use crate::event::AppEvent;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{mpsc, Arc};
use tokio::runtime::Handle;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Unavailable(String),
    #[error("model failed: {0}")]
    Failed(String),
}

/// The external model whose configuration is being edited.
#[async_trait]
pub trait ConfigModel: Send + Sync {
    /// Schema in wire form. Hints only affect cosmetic choices.
    async fn gui_schema(&self, hints: &Value) -> Result<Value, ModelError>;
    /// Accepts or rejects a complete configuration; rejections carry a
    /// user-facing message.
    async fn validate(&self, conf: &Value) -> Result<(), String>;
    async fn advance_frame(&self);
    /// The model's current resolved parameters, when it has any.
    async fn params(&self) -> Option<Value>;
}

const MAX_SHAPES: usize = 16;

#[derive(Debug, Default)]
struct DemoState {
    conf: Option<Value>,
    frame: u64,
}

/// In-process model with a schema that uses every kind of node.
#[derive(Debug, Default)]
pub struct DemoModel {
    state: Mutex<DemoState>,
}

impl DemoModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn frame(&self) -> u64 {
        self.state.lock().await.frame
    }

    fn check(conf: &Value) -> Result<(), String> {
        let Some(map) = conf.as_object() else {
            return Err("configuration must be an object".to_string());
        };
        match map.get("speed").and_then(Value::as_f64) {
            Some(speed) if speed < 0.0 => {
                return Err(format!("speed must not be negative (got {speed})"));
            }
            Some(_) => {}
            None => return Err("missing field `speed`".to_string()),
        }
        let shapes = map
            .get("shapes")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if shapes > MAX_SHAPES {
            return Err(format!("at most {MAX_SHAPES} shapes are supported (got {shapes})"));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigModel for DemoModel {
    async fn gui_schema(&self, hints: &Value) -> Result<Value, ModelError> {
        let title = hints
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Scene");
        Ok(json!({"Struct": [title, [
            ["speed", {"Val": "Num"}],
            ["paused", {"Val": "Bool"}],
            ["origin", {"Val": "Vec2"}],
            ["rotation", {"Val": "Angle"}],
            ["background", {"Val": "Color"}],
            ["defs", {"Val": "Defs"}],
            ["focus", {"Val": {"Name": "shape"}}],
            ["seed", "Skip"],
            ["shapes", {"List": {"Struct": ["ShapeConf", [
                ["shape", {"Enum": ["Shape", [
                    {"Unnamed": ["Circle", {"Struct": ["Circle", [["radius", {"Val": "Num"}]]]}]},
                    {"Unnamed": ["Rect", {"Struct": ["Rect", [["size", {"Val": "Vec2"}]]]}]},
                    {"Unit": "Dot"}
                ], false]}],
                ["tint", {"Val": "Color"}]
            ]]}}],
            ["easing", {"Enum": ["Easing", [
                {"Unit": "Linear"},
                {"Unnamed": ["Power", {"Val": "Num"}]}
            ], true]}]
        ]]}))
    }

    async fn validate(&self, conf: &Value) -> Result<(), String> {
        Self::check(conf)?;
        self.state.lock().await.conf = Some(conf.clone());
        Ok(())
    }

    async fn advance_frame(&self) {
        self.state.lock().await.frame += 1;
    }

    async fn params(&self) -> Option<Value> {
        let state = self.state.lock().await;
        let mut params = state.conf.clone()?;
        // Speed breathes with the frame so the trend indicators have motion.
        if let Some(speed) = params.get("speed").and_then(Value::as_f64) {
            let phase = state.frame as f64 / 6.0;
            params["speed"] = json!(speed * (1.0 + 0.25 * phase.sin()));
        }
        Some(params)
    }
}

/// Runs model requests on the tokio runtime and reports back to the UI thread
/// as [`AppEvent`]s.
#[derive(Clone)]
pub struct ModelClient {
    model: Arc<dyn ConfigModel>,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
}

impl ModelClient {
    pub fn new(model: Arc<dyn ConfigModel>, tx: mpsc::Sender<AppEvent>) -> Result<Self, ModelError> {
        let runtime_handle = Handle::try_current()
            .map_err(|err| ModelError::Unavailable(format!("tokio runtime unavailable: {err}")))?;
        Ok(Self {
            model,
            tx,
            runtime_handle,
        })
    }

    pub fn request_schema(&self, hints: Value) {
        let model = Arc::clone(&self.model);
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            let event = match model.gui_schema(&hints).await {
                Ok(schema) => AppEvent::SchemaLoaded(schema),
                Err(err) => AppEvent::ModelFailed(format!("failed to load schema: {err}")),
            };
            let _ = tx.send(event);
        });
    }

    /// Validates `conf` and advances the model on success. `record` is carried
    /// through to the resulting event.
    pub fn request_validation(&self, conf: Value, record: bool) {
        let model = Arc::clone(&self.model);
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            let result = model.validate(&conf).await;
            if result.is_ok() {
                model.advance_frame().await;
            }
            let _ = tx.send(AppEvent::ValidationFinished {
                conf,
                result,
                record,
            });
        });
    }

    pub fn request_params(&self) {
        let model = Arc::clone(&self.model);
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            model.advance_frame().await;
            if let Some(params) = model.params().await {
                let _ = tx.send(AppEvent::ParamsUpdated(params));
            }
        });
    }
}
