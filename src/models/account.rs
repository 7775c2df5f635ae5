use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Account fields returned by the session endpoint
///
/// Only `uid` is interpreted; everything else is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccountInfo {
    /// Build from the envelope `data` of a session response
    ///
    /// The uid keeps its JSON type so it is echoed back unchanged. A missing,
    /// null or empty-string uid leaves `uid` unset.
    pub fn from_data(data: Value) -> Self {
        let mut extra = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let uid = match extra.remove("uid") {
            Some(Value::String(s)) if s.is_empty() => None,
            Some(uid @ (Value::String(_) | Value::Number(_))) => Some(uid),
            _ => None,
        };

        Self { uid, extra }
    }

    pub fn uid(&self) -> Option<&Value> {
        self.uid.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.uid.is_none() && self.extra.is_empty()
    }

    pub fn clear(&mut self) {
        self.uid = None;
        self.extra.clear();
    }
}
