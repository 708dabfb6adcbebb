pub mod codec;
pub mod event;
pub mod list;
pub mod path;
pub mod render;
pub mod runtime;
pub mod schema;
pub mod view;
pub mod widget;

pub use codec::{dehydrate, flatten, rehydrate, FieldError, FlatRecord, FlatRecordSet, LeafValue};
pub use event::FormEvent;
pub use path::{Path, Segment};
pub use runtime::{FormRuntime, RuntimeError};
pub use schema::{Schema, SchemaError, ValueKind};
pub use widget::Widget;
