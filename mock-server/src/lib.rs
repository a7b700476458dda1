//! In-memory stand-in for the remote payment gateway.
//!
//! Serves every path the client registry knows with deterministic answers,
//! using the same status conventions as the real service: `status` 0 or 2,
//! `ok`, `success`, or only the HTTP status line for uploads. A few inputs
//! trigger failures on purpose so the client's failure paths can be driven
//! over real HTTP:
//!
//! - prime `prime_declined` is refused with a non-zero status;
//! - refunds and history lookups for unknown trades answer HTTP 400;
//! - currency lookups for unknown pairs answer plain text;
//! - orders and redirect payments with a non-positive amount are refused;
//! - uploads with platform key `maintenance` answer HTTP 503.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DECLINED_PRIME: &str = "prime_declined";
pub const MAINTENANCE_KEY: &str = "maintenance";

#[derive(Debug, Default)]
pub struct Store {
    pub trades: HashMap<String, Trade>,
    pub merchants: HashMap<String, HashMap<String, String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trade {
    pub rec_trade_id: String,
    pub amount: i64,
    pub refunded: i64,
    pub channel: String,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/tappay/{action}", post(tappay))
        .route("/atm/{action}", post(atm))
        .route("/merchant/create", post(merchant_upsert))
        .route("/merchant/update", post(merchant_upsert))
        .route("/merchant/query", get(merchant_query))
        .route("/platform/card/bind", post(platform_bind_card))
        .route("/platform/pay-by-prime", post(platform_pay))
        .route("/platform/pay-by-token", post(platform_pay))
        .route("/currency/exchange", get(currency_exchange))
        .route("/order/create", post(create_order))
        .route("/third-party/redirect-payment", post(redirect_payment))
        .route("/qualification/upload", post(upload))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn int_field(body: &Value, key: &str) -> i64 {
    body.get(key).and_then(Value::as_i64).unwrap_or_default()
}

async fn record_trade(db: &Db, amount: i64, channel: &str) -> String {
    let rec_trade_id = format!("D{}", Uuid::new_v4().simple());
    let trade = Trade {
        rec_trade_id: rec_trade_id.clone(),
        amount,
        refunded: 0,
        channel: channel.to_string(),
    };
    db.write().await.trades.insert(rec_trade_id.clone(), trade);
    rec_trade_id
}

// ---------------------------------------------------------------------------
// Card gateway
// ---------------------------------------------------------------------------

async fn tappay(State(db): State<Db>, Path(action): Path<String>, Json(body): Json<Value>) -> Response {
    tracing::info!(%action, "tappay request");
    match action.as_str() {
        "pay-by-prime" => {
            if str_field(&body, "prime") == DECLINED_PRIME {
                return ok(json!({"status": 10003, "msg": "Card declined"}));
            }
            let amount = int_field(&body, "amount");
            let rec_trade_id = record_trade(&db, amount, "card").await;
            let mut answer = json!({"status": 0, "msg": "Success", "rec_trade_id": rec_trade_id, "amount": amount});
            if body.get("remember").and_then(Value::as_bool) == Some(true) {
                answer["card_secret"] = json!({"card_key": "key_1", "card_token": "token_1"});
            }
            ok(answer)
        }
        "pay-by-token" => {
            if str_field(&body, "card_key").is_empty() || str_field(&body, "card_token").is_empty() {
                return ok(json!({"status": 4, "msg": "Missing card key or token"}));
            }
            let amount = int_field(&body, "amount");
            let rec_trade_id = record_trade(&db, amount, "token").await;
            ok(json!({"status": 0, "msg": "Success", "rec_trade_id": rec_trade_id, "amount": amount}))
        }
        "bind" => ok(json!({
            "status": 0,
            "msg": "Success",
            "card_secret": {"card_key": "key_1", "card_token": "token_1"},
        })),
        "remove" => ok(json!({"status": 0, "msg": "Success"})),
        "query" => {
            let store = db.read().await;
            let wanted = str_field(&body, "rec_trade_id");
            let records: Vec<&Trade> = store
                .trades
                .values()
                .filter(|t| wanted.is_empty() || t.rec_trade_id == wanted)
                .collect();
            ok(json!({
                "status": 2,
                "msg": "Success",
                "number_of_transactions": records.len(),
                "trade_records": records,
            }))
        }
        "history" => {
            let store = db.read().await;
            match store.trades.get(str_field(&body, "rec_trade_id")) {
                Some(trade) => ok(json!({"status": 0, "msg": "Success", "trade_history": [trade]})),
                None => unknown_trade(),
            }
        }
        "refund" => {
            let mut store = db.write().await;
            match store.trades.get_mut(str_field(&body, "rec_trade_id")) {
                Some(trade) => {
                    let amount = body
                        .get("amount")
                        .and_then(Value::as_i64)
                        .unwrap_or(trade.amount - trade.refunded);
                    trade.refunded += amount;
                    ok(json!({
                        "status": 0,
                        "msg": "Success",
                        "refund_id": format!("R{}", Uuid::new_v4().simple()),
                        "refund_amount": amount,
                        "is_captured": true,
                    }))
                }
                None => unknown_trade(),
            }
        }
        _ => (StatusCode::NOT_FOUND, "unknown action").into_response(),
    }
}

fn unknown_trade() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"status": 421, "msg": "Trade not found"}))).into_response()
}

// ---------------------------------------------------------------------------
// ATM
// ---------------------------------------------------------------------------

async fn atm(State(db): State<Db>, Path(action): Path<String>, Json(body): Json<Value>) -> Response {
    tracing::info!(%action, "atm request");
    match action.as_str() {
        "pay-by-prime" => {
            let amount = int_field(&body, "amount");
            let rec_trade_id = record_trade(&db, amount, "atm").await;
            ok(json!({
                "status": 0,
                "msg": "Success",
                "rec_trade_id": rec_trade_id,
                "bank_code": "812",
                "vacc_no": "9981000012345678",
                "expire_days": body.get("expire_days").cloned().unwrap_or(json!(3)),
            }))
        }
        // Records come back with status 2, as the real service does for
        // pending virtual accounts.
        "record" => {
            let store = db.read().await;
            let records: Vec<&Trade> = store.trades.values().filter(|t| t.channel == "atm").collect();
            ok(json!({"status": 2, "msg": "Pending", "trade_records": records}))
        }
        "trade-history" => {
            let store = db.read().await;
            match store.trades.get(str_field(&body, "rec_trade_id")) {
                Some(trade) => ok(json!({"status": 0, "trade_history": [trade]})),
                None => ok(json!({"status": 421, "msg": "Trade not found"})),
            }
        }
        "reconciliation" => ok(json!({
            "status": 0,
            "start_date": str_field(&body, "start_date"),
            "end_date": str_field(&body, "end_date"),
            "items": [],
        })),
        "simulate-paid" => ok(json!({"status": 0, "msg": "Paid"})),
        _ => (StatusCode::NOT_FOUND, "unknown action").into_response(),
    }
}

// ---------------------------------------------------------------------------
// Merchant onboarding
// ---------------------------------------------------------------------------

async fn merchant_upsert(State(db): State<Db>, Form(form): Form<HashMap<String, String>>) -> Response {
    let Some(account) = form.get("partner_account").cloned() else {
        return ok(json!({"status": 1, "msg": "partner_account is required"}));
    };
    db.write().await.merchants.insert(account.clone(), form);
    ok(json!({"status": 0, "msg": "Success", "partner_account": account}))
}

async fn merchant_query(State(db): State<Db>, Query(query): Query<HashMap<String, String>>) -> Response {
    let account = query.get("partner_account").cloned().unwrap_or_default();
    match db.read().await.merchants.get(&account) {
        Some(profile) => ok(json!({"status": 0, "merchant": profile})),
        None => ok(json!({"status": 3, "msg": "Merchant not found"})),
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

async fn platform_bind_card(Json(body): Json<Value>) -> Response {
    if str_field(&body, "partner_account").is_empty() {
        return ok(json!({"status": 1, "msg": "partner_account is required"}));
    }
    ok(json!({"status": 0, "card_secret": {"card_key": "pkey_1", "card_token": "ptoken_1"}}))
}

async fn platform_pay(State(db): State<Db>, Json(body): Json<Value>) -> Response {
    if str_field(&body, "prime") == DECLINED_PRIME {
        return ok(json!({"status": 10003, "msg": "Card declined"}));
    }
    let rec_trade_id = record_trade(&db, int_field(&body, "amount"), "platform").await;
    ok(json!({"status": 0, "rec_trade_id": rec_trade_id}))
}

// ---------------------------------------------------------------------------
// Currency lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExchangeQuery {
    pub from: String,
    pub to: String,
    pub from_amount: f64,
    #[serde(rename = "type", default = "default_rounding")]
    pub rounding: String,
    #[serde(default = "default_point")]
    pub point: u32,
}

fn default_rounding() -> String {
    "up".to_string()
}

fn default_point() -> u32 {
    3
}

fn rate(from: &str, to: &str) -> Option<f64> {
    match (from, to) {
        (a, b) if a == b => Some(1.0),
        ("USD", "TWD") => Some(31.5),
        ("JPY", "TWD") => Some(0.21),
        ("TWD", "USD") => Some(0.0317),
        _ => None,
    }
}

async fn currency_exchange(Query(query): Query<ExchangeQuery>) -> Response {
    let Some(rate) = rate(&query.from, &query.to) else {
        return (StatusCode::OK, format!("unsupported pair {}/{}", query.from, query.to)).into_response();
    };
    let scale = 10f64.powi(query.point as i32);
    // Trim float noise so exact results are not pushed over a rounding edge.
    let raw = (query.from_amount * rate * scale * 1e6).round() / 1e6;
    let scaled = if query.rounding == "down" { raw.floor() } else { raw.ceil() };
    ok(json!({
        "from": query.from,
        "to": query.to,
        "rate": rate,
        "from_amount": query.from_amount,
        "to_amount": format!("{:.*}", query.point as usize, scaled / scale),
    }))
}

// ---------------------------------------------------------------------------
// Orders and redirect payment
// ---------------------------------------------------------------------------

async fn create_order(Json(body): Json<Value>) -> Response {
    if int_field(&body, "amount") <= 0 {
        return ok(json!({"ok": false, "error": "amount must be positive"}));
    }
    ok(json!({"ok": true, "order_id": format!("O{}", Uuid::new_v4().simple())}))
}

async fn redirect_payment(Form(form): Form<HashMap<String, String>>) -> Response {
    let amount: i64 = form.get("amount").and_then(|a| a.parse().ok()).unwrap_or_default();
    if amount <= 0 {
        return ok(json!({"success": false, "message": "amount must be positive"}));
    }
    let order_number = form.get("order_number").cloned().unwrap_or_default();
    ok(json!({
        "success": true,
        "payment_url": format!("https://pay.example.test/redirect/{order_number}"),
    }))
}

// ---------------------------------------------------------------------------
// Qualification upload
// ---------------------------------------------------------------------------

async fn upload(mut multipart: Multipart) -> Response {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut files = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        };
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        };
        match filename {
            Some(filename) => files.push(json!({
                "field": name,
                "filename": filename,
                "content_type": content_type,
                "size": data.len(),
            })),
            None => {
                fields.insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
    }

    let platform_key = fields.get("platform_key").cloned().unwrap_or_default();
    if platform_key == MAINTENANCE_KEY {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }
    if platform_key.is_empty() || !fields.contains_key("partner_account") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": 1, "msg": "platform_key and partner_account are required"})),
        )
            .into_response();
    }
    ok(json!({
        "status": 0,
        "partner_account": fields["partner_account"],
        "files": files,
    }))
}
