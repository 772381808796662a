//! End-to-end tests: the full router on an ephemeral port, driven over
//! HTTP and WebSocket.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use vault_portfolio_gateway::app::build_app;
use vault_portfolio_gateway::app_state::AppState;
use vault_portfolio_gateway::source::InMemoryMarketStore;

const USER: &str = "zv5zm-zyhmm-na6rs";
const EPS: f64 = 1e-9;

async fn spawn_app() -> SocketAddr {
    let state = AppState::in_memory(
        Arc::new(InMemoryMarketStore::new()),
        chrono::Duration::minutes(5),
        1024,
        100,
    );
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_app(state)).await;
    });
    addr
}

fn snapshot_body() -> Value {
    json!({
        "strategies": [
            {
                "id": 1,
                "name": "PANDA/ICP",
                "total_shares": 1000,
                "user_shares": [[USER, 100]],
                "initial_deposit": [[USER, 8_000_000]],
                "current_pool": "pool-a",
                "pools": [{
                    "id": "pool-a",
                    "provider": "KongSwap",
                    "token0": {"ledger": "panda", "symbol": "PANDA", "decimals": 8},
                    "token1": {"ledger": "icp", "symbol": "ICP", "decimals": 8},
                    "price0": 1.0,
                    "price1": 5.0
                }]
            },
            {
                "id": 2,
                "name": "ckBTC/ICP",
                "total_shares": 500,
                "user_shares": [[USER, 0], ["someone-else", 500]],
                "current_pool": "pool-b",
                "pools": [{
                    "id": "pool-b",
                    "token0": {"symbol": "ckBTC", "decimals": 8},
                    "token1": {"symbol": "ICP", "decimals": 8},
                    "price0": 60000.0
                }]
            }
        ]
    })
}

async fn get_json(url: &str) -> (u16, Value) {
    let Ok(response) = reqwest::get(url).await else {
        panic!("GET {url} failed");
    };
    let status = response.status().as_u16();
    let Ok(body) = response.json::<Value>().await else {
        panic!("GET {url} returned non-JSON");
    };
    (status, body)
}

async fn send_json(method: reqwest::Method, url: &str, body: &Value) -> (u16, Value) {
    let client = reqwest::Client::new();
    let Ok(response) = client.request(method, url).json(body).send().await else {
        panic!("request to {url} failed");
    };
    let status = response.status().as_u16();
    let Ok(body) = response.json::<Value>().await else {
        panic!("{url} returned non-JSON");
    };
    (status, body)
}

async fn seed_market(addr: SocketAddr) {
    let base = format!("http://{addr}/api/v1");
    let (status, _) = send_json(
        reqwest::Method::PUT,
        &format!("{base}/market/snapshot"),
        &snapshot_body(),
    )
    .await;
    assert_eq!(status, 200);

    let metrics = json!({"metrics": {"pool-a": {"tvl": 100_000_000, "apy": 10.0}}});
    let (status, body) = send_json(
        reqwest::Method::PUT,
        &format!("{base}/market/pool-metrics"),
        &metrics,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["pool_ids"], json!(["pool-a"]));
}

#[tokio::test]
async fn health_reports_version() {
    let addr = spawn_app().await;
    let (status, body) = get_json(&format!("http://{addr}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn event_kind_catalog_has_eighteen_entries() {
    let addr = spawn_app().await;
    let (status, body) = get_json(&format!("http://{addr}/config/event-kinds")).await;
    assert_eq!(status, 200);
    let Some(kinds) = body.as_array() else {
        panic!("expected array");
    };
    assert_eq!(kinds.len(), 18);
    assert!(
        kinds
            .iter()
            .any(|k| k["kind"] == "StrategyDepositFailed" && k["failure"] == true)
    );
}

#[tokio::test]
async fn reads_before_first_snapshot_are_unavailable() {
    let addr = spawn_app().await;
    let (status, body) = get_json(&format!("http://{addr}/api/v1/users/{USER}/portfolio")).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"]["code"], 3002);
}

#[tokio::test]
async fn portfolio_summary_end_to_end() {
    let addr = spawn_app().await;
    seed_market(addr).await;

    let (status, body) = get_json(&format!(
        "http://{addr}/api/v1/users/{}/portfolio",
        USER.to_uppercase()
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["user"], USER);
    assert_eq!(body["position_count"], 1);
    assert_eq!(body["pricing"], "priced");
    let value = body["portfolio_value_usd"].as_f64().unwrap_or(f64::NAN);
    let deposited = body["deposited_usd"].as_f64().unwrap_or(f64::NAN);
    let apy = body["current_apy"].as_f64().unwrap_or(f64::NAN);
    let yield_usd = body["total_yield_usd"].as_f64().unwrap_or(f64::NAN);
    assert!((value - 0.10).abs() < EPS);
    assert!((deposited - 0.08).abs() < EPS);
    assert!((apy - 10.0).abs() < EPS);
    assert!((yield_usd - 0.02).abs() < EPS);

    let (status, body) = get_json(&format!("http://{addr}/api/v1/users/{USER}/positions")).await;
    assert_eq!(status, 200);
    let Some(positions) = body["data"].as_array() else {
        panic!("expected positions array");
    };
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0]["strategy_id"], 1);
}

#[tokio::test]
async fn portfolio_without_pool_metrics_is_unpriced() {
    let addr = spawn_app().await;
    let (status, _) = send_json(
        reqwest::Method::PUT,
        &format!("http://{addr}/api/v1/market/snapshot"),
        &snapshot_body(),
    )
    .await;
    assert_eq!(status, 200);

    let (status, body) = get_json(&format!("http://{addr}/api/v1/users/{USER}/portfolio")).await;
    assert_eq!(status, 200);
    assert_eq!(body["position_count"], 1);
    assert_eq!(body["unpriced_positions"], 1);
    assert_eq!(body["pricing"], "unavailable");
}

#[tokio::test]
async fn user_stats_end_to_end() {
    let addr = spawn_app().await;
    seed_market(addr).await;

    let (status, body) = get_json(&format!("http://{addr}/api/v1/users/{USER}/stats")).await;
    assert_eq!(status, 200);
    assert_eq!(body["strategy_count"], 1);
    assert_eq!(body["total_tvl"], "100000000");
}

#[tokio::test]
async fn malformed_principal_is_rejected() {
    let addr = spawn_app().await;
    seed_market(addr).await;
    let (status, body) = get_json(&format!("http://{addr}/api/v1/users/bad%20principal/portfolio")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], 1002);
}

#[tokio::test]
async fn strategies_listing_and_lookup() {
    let addr = spawn_app().await;
    seed_market(addr).await;

    let (status, body) = get_json(&format!("http://{addr}/api/v1/strategies")).await;
    assert_eq!(status, 200);
    let Some(list) = body["data"].as_array() else {
        panic!("expected strategy array");
    };
    assert_eq!(list.len(), 2);
    let first = list.iter().find(|s| s["id"] == 1);
    let Some(first) = first else {
        panic!("strategy 1 listed");
    };
    assert_eq!(first["tvl"], "100000000");
    assert_eq!(first["profit_level"], "LOW");
    assert_eq!(first["holders"], 1);

    let (status, body) = get_json(&format!("http://{addr}/api/v1/strategies/42")).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], 2001);
}

#[tokio::test]
async fn history_rejects_unknown_period() {
    let addr = spawn_app().await;
    let (status, body) = get_json(&format!(
        "http://{addr}/api/v1/strategies/history?ids=1&period=1y"
    ))
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], 1003);

    let (status, body) = get_json(&format!(
        "http://{addr}/api/v1/strategies/history?ids=1,2&period=1w"
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["period"], "1w");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn events_are_grouped_by_correlation() {
    let addr = spawn_app().await;
    let events = json!({"events": [
        {"id": 3, "timestamp_ns": 1_700_000_000_000_000_003u64, "kind": "StrategyDepositStarted",
         "correlation_id": "c2", "user": USER, "details": {"strategy_id": 1, "amount0": 5}},
        {"id": 4, "timestamp_ns": 1_700_000_000_000_000_004u64, "kind": "StrategyDepositStarted",
         "correlation_id": "c1", "user": USER},
        {"id": 5, "timestamp_ns": 1_700_000_000_000_000_005u64, "kind": "StrategyDepositFailed",
         "correlation_id": "c1", "user": USER,
         "details": {"strategy_id": 1, "error": {"message": "insufficient balance"}}},
        {"id": 6, "timestamp_ns": 1_700_000_000_000_000_006u64, "kind": "SwapTokenCompleted",
         "correlation_id": "c9", "user": "someone-else"}
    ]});
    let (status, body) = send_json(
        reqwest::Method::POST,
        &format!("http://{addr}/api/v1/events"),
        &events,
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["accepted"], 4);

    let (status, body) = get_json(&format!("http://{addr}/api/v1/events?user={USER}")).await;
    assert_eq!(status, 200);
    let Some(groups) = body["data"].as_array() else {
        panic!("expected groups array");
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["correlation_id"], "c1");
    assert_eq!(groups[0]["has_failed_event"], true);
    assert_eq!(
        groups[0]["summary"],
        "Failed to deposit into strategy 1: insufficient balance"
    );
    assert_eq!(groups[0]["events"][0]["id"], 5);
    assert_eq!(groups[0]["events"][1]["id"], 4);
    assert_eq!(groups[1]["correlation_id"], "c2");
    assert_eq!(groups[1]["has_failed_event"], false);
    assert_eq!(groups[1]["events"][0]["details"]["amount0"], "5");
    assert_eq!(body["pagination"]["total"], 4);
    assert_eq!(body["pagination"]["total_pages"], 1);

    let (status, _) = send_json(
        reqwest::Method::POST,
        &format!("http://{addr}/api/v1/events"),
        &json!({"events": [{"id": 3, "timestamp_ns": 1, "kind": "SwapTokenStarted",
                            "correlation_id": "dup"}]}),
    )
    .await;
    assert_eq!(status, 400);
}

async fn next_text<S>(ws: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), ws.next()).await;
        let Ok(Some(Ok(message))) = next else {
            panic!("no websocket message within timeout");
        };
        if let Message::Text(text) = message {
            let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("websocket message is not JSON");
            };
            return value;
        }
    }
}

#[tokio::test]
async fn websocket_pushes_events_of_followed_users() {
    let addr = spawn_app().await;
    let Ok((mut ws, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("websocket connect failed");
    };

    let subscribe = json!({
        "id": "sub-1",
        "type": "command",
        "timestamp": chrono::Utc::now(),
        "payload": {"command": "subscribe", "principals": [USER]}
    });
    let Ok(()) = ws.send(Message::text(subscribe.to_string())).await else {
        panic!("send subscribe failed");
    };
    let reply = next_text(&mut ws).await;
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["id"], "sub-1");
    assert_eq!(reply["payload"]["count"], 1);

    let events = json!({"events": [
        {"id": 1, "timestamp_ns": 1, "kind": "SwapTokenCompleted",
         "correlation_id": "other", "user": "someone-else"},
        {"id": 2, "timestamp_ns": 2, "kind": "StrategyWithdrawStarted",
         "correlation_id": "mine", "user": USER}
    ]});
    let (status, _) = send_json(
        reqwest::Method::POST,
        &format!("http://{addr}/api/v1/events"),
        &events,
    )
    .await;
    assert_eq!(status, 201);

    let pushed = next_text(&mut ws).await;
    assert_eq!(pushed["type"], "event");
    assert_eq!(pushed["payload"]["event_type"], "event_recorded");
    assert_eq!(pushed["payload"]["record"]["correlation_id"], "mine");
}

#[tokio::test]
async fn websocket_rejects_unknown_commands() {
    let addr = spawn_app().await;
    let Ok((mut ws, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("websocket connect failed");
    };
    let command = json!({
        "id": "x-1",
        "type": "command",
        "timestamp": chrono::Utc::now(),
        "payload": {"command": "swap"}
    });
    let Ok(()) = ws.send(Message::text(command.to_string())).await else {
        panic!("send failed");
    };
    let reply = next_text(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["code"], 404);
}
