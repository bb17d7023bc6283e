use serde::Serialize;
use serde_json::Value;

use crate::error::HttpError;
use crate::render::RenderTarget;

/// What a handler hands back to the response resolver.
///
/// `Value::Null` and `Value::String` are normalized to [`Reply::Absent`]
/// and [`Reply::Text`] by [`Reply::normalize`], so a JSON null behaves like
/// returning nothing and a JSON string like returning text.
#[derive(Debug)]
pub enum Reply {
    Absent,
    Text(String),
    View(RenderTarget),
    Value(Value),
}

impl Reply {
    /// Serialize `value` into a [`Reply::Value`].
    ///
    /// # Errors
    ///
    /// `HttpError::Internal` when `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, HttpError> {
        serde_json::to_value(value)
            .map(Reply::from)
            .map_err(|e| HttpError::Internal(format!("response serialization failed: {e}")))
    }

    pub fn normalize(self) -> Self {
        match self {
            Reply::Value(Value::Null) => Reply::Absent,
            Reply::Value(Value::String(text)) => Reply::Text(text),
            other => other,
        }
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Absent
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_owned())
    }
}

impl From<RenderTarget> for Reply {
    fn from(target: RenderTarget) -> Self {
        Reply::View(target)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value).normalize()
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Reply::Absent, Into::into)
    }
}
