use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request id used by every caller; the services do not correlate on it
pub const DEFAULT_REQUEST_ID: &str = "dontcare";

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<P> {
    pub jsonrpc: &'static str,
    pub id: &'static str,
    pub method: String,
    pub params: P,
}

impl<P: Serialize> JsonRpcRequest<P> {
    pub fn new(method: impl Into<String>, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id: DEFAULT_REQUEST_ID,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<R> {
    pub result: Option<R>,

    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// Error member of a JSON-RPC response. NEAR nodes add `name` and `cause`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub cause: Option<ErrorCause>,

    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorCause {
    pub name: String,

    #[serde(default)]
    pub info: Option<Value>,
}

impl JsonRpcError {
    /// Most specific error name available
    pub fn kind(&self) -> String {
        self.cause
            .as_ref()
            .map(|c| c.name.clone())
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| self.code.to_string())
    }

    pub fn detail(&self) -> String {
        match &self.data {
            Some(Value::String(s)) => format!("{}: {}", self.message, s),
            Some(other) => format!("{}: {}", self.message, other),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope() {
        let req = JsonRpcRequest::new("quote", vec![json!({"a": 1})]);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "id": "dontcare", "method": "quote", "params": [{"a": 1}]})
        );
    }

    #[test]
    fn test_near_error_kind_prefers_cause() {
        let resp: JsonRpcResponse<Value> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "error": {
                "name": "HANDLER_ERROR",
                "cause": {"name": "TIMEOUT_ERROR", "info": {}},
                "code": -32000,
                "message": "Server error",
                "data": "Timeout"
            }
        }))
        .unwrap();

        let err = resp.error.unwrap();
        assert_eq!(err.kind(), "TIMEOUT_ERROR");
        assert_eq!(err.detail(), "Server error: Timeout");
        assert!(resp.result.is_none());
    }

    #[test]
    fn test_plain_error_kind_falls_back_to_code() {
        let err: JsonRpcError =
            serde_json::from_value(json!({"code": -32601, "message": "Method not found"})).unwrap();
        assert_eq!(err.kind(), "-32601");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Receipt {
        hash: String,
    }

    #[test]
    fn test_result_type_without_default() {
        let ok: JsonRpcResponse<Receipt> =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": "dontcare", "result": {"hash": "H"}}))
                .unwrap();
        assert_eq!(ok.result, Some(Receipt { hash: "H".into() }));

        let failed: JsonRpcResponse<Receipt> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "error": {"code": -32000, "message": "Server error"}
        }))
        .unwrap();
        assert!(failed.result.is_none());
        assert!(failed.error.is_some());
    }
}
