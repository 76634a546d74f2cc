use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use fluxfolio_rpc::{
    ContractViewer, ExecutionStatus, FunctionCall, FunctionCaller, InMemorySigner, NearAccount,
    NearRpcClient, RpcError, TxStatusProvider,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> NearRpcClient {
    NearRpcClient::new(server.uri(), Duration::from_secs(2))
}

fn view_result(value: Value) -> Value {
    let bytes: Vec<u8> = serde_json::to_vec(&value).unwrap();
    json!({
        "jsonrpc": "2.0",
        "id": "dontcare",
        "result": {"result": bytes, "logs": [], "block_height": 1, "block_hash": "x"}
    })
}

#[tokio::test]
async fn test_view_function_round_trip() {
    let server = MockServer::start().await;
    let args = json!({"nonce": "abc", "account_id": "0xsigner"});

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "query",
            "params": {
                "request_type": "call_function",
                "finality": "final",
                "account_id": "intents.near",
                "method_name": "is_nonce_used",
                "args_base64": STANDARD.encode(serde_json::to_vec(&args).unwrap()),
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(view_result(json!(true))))
        .expect(1)
        .mount(&server)
        .await;

    let used: bool = client(&server)
        .view_function("intents.near", "is_nonce_used", args)
        .await
        .unwrap();
    assert!(used);
}

#[tokio::test]
async fn test_view_contract_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": {"error": "wasm execution failed", "logs": []}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .view("proxy.near", "get_user_info", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::ViewFailed { .. }));
}

#[tokio::test]
async fn test_view_empty_result_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": {"result": [], "logs": []}
        })))
        .mount(&server)
        .await;

    let value: Option<Value> = client(&server)
        .view_function("proxy.near", "get_user_info", json!({"user_id": "a.near"}))
        .await
        .unwrap();
    assert!(value.is_none());
}

#[tokio::test]
async fn test_rpc_error_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "error": {
                "name": "HANDLER_ERROR",
                "cause": {"name": "UNKNOWN_TRANSACTION"},
                "code": -32000,
                "message": "Server error"
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server).tx_status("hash", "agent.near").await.unwrap_err();
    match err {
        RpcError::Rpc { name, .. } => assert_eq!(name, "UNKNOWN_TRANSACTION"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(view_result(json!(false))),
        )
        .mount(&server)
        .await;

    let client = NearRpcClient::new(server.uri(), Duration::from_millis(50));
    let err = client
        .view("intents.near", "is_nonce_used", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err, RpcError::Timeout(50));
}

#[tokio::test]
async fn test_tx_status_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "tx",
            "params": {"tx_hash": "H1", "sender_account_id": "agent.near", "wait_until": "FINAL"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": {"status": {"SuccessValue": ""}, "transaction": {"hash": "H1"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server).tx_status("H1", "agent.near").await.unwrap();
    assert_eq!(outcome.status, ExecutionStatus::SuccessValue(String::new()));
}

async fn mount_access_key(server: &MockServer, nonce: u64) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "query",
            "params": {"request_type": "view_access_key"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": {
                "nonce": nonce,
                "block_hash": bs58::encode([1u8; 32]).into_string(),
                "block_height": 10,
                "permission": "FullAccess"
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_function_call_success() {
    let server = MockServer::start().await;
    mount_access_key(&server, 41).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "broadcast_tx_commit"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": {"status": {"SuccessValue": STANDARD.encode(b"\"ok\"")}, "transaction": {"hash": "T"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let account = NearAccount::new(
        Arc::new(client(&server)),
        InMemorySigner::generate("agent.near"),
    );
    assert_eq!(account.account_id(), "agent.near");

    let outcome = account
        .function_call(FunctionCall::new("proxy.near", "balance_portfolio", json!({})))
        .await
        .unwrap();
    assert_eq!(outcome.success_bytes().unwrap().unwrap(), b"\"ok\"");
}

#[tokio::test]
async fn test_function_call_timeout_carries_hash() {
    let server = MockServer::start().await;
    mount_access_key(&server, 1).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "broadcast_tx_commit"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "error": {
                "name": "HANDLER_ERROR",
                "cause": {"name": "TIMEOUT_ERROR"},
                "code": -32000,
                "message": "Server error"
            }
        })))
        .mount(&server)
        .await;

    let account = NearAccount::new(
        Arc::new(client(&server)),
        InMemorySigner::generate("agent.near"),
    );
    let err = account
        .function_call(FunctionCall::new("proxy.near", "withdraw_funds", json!({})))
        .await
        .unwrap_err();

    let hash = err.tx_hash().expect("hash should be preserved").to_string();
    assert_eq!(bs58::decode(&hash).into_vec().unwrap().len(), 32);
}

#[tokio::test]
async fn test_function_call_rejection_has_no_hash() {
    let server = MockServer::start().await;
    mount_access_key(&server, 1).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "broadcast_tx_commit"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "error": {
                "name": "HANDLER_ERROR",
                "cause": {"name": "INVALID_TRANSACTION"},
                "code": -32000,
                "message": "Server error"
            }
        })))
        .mount(&server)
        .await;

    let account = NearAccount::new(
        Arc::new(client(&server)),
        InMemorySigner::generate("agent.near"),
    );
    let err = account
        .function_call(FunctionCall::new("proxy.near", "withdraw_funds", json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.tx_hash(), None);
}
