use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn multipart_request(platform_key: &str) -> Request<String> {
    let body = format!(
        "--B\r\nContent-Disposition: form-data; name=\"platform_key\"\r\n\r\n{platform_key}\r\n\
         --B\r\nContent-Disposition: form-data; name=\"partner_account\"\r\n\r\nacct-1\r\n\
         --B\r\nContent-Disposition: form-data; name=\"license\"; filename=\"license.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF\r\n--B--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/qualification/upload")
        .header(http::header::CONTENT_TYPE, "multipart/form-data; boundary=B")
        .body(body)
        .unwrap()
}

// --- card gateway ---

#[tokio::test]
async fn pay_by_prime_succeeds_with_status_zero() {
    let resp = app()
        .oneshot(json_request("/tappay/pay-by-prime", r#"{"prime":"p1","amount":100,"remember":true}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], 0);
    assert_eq!(body["amount"], 100);
    assert_eq!(body["card_secret"]["card_key"], "key_1");
}

#[tokio::test]
async fn declined_prime_has_non_zero_status() {
    let resp = app()
        .oneshot(json_request("/tappay/pay-by-prime", r#"{"prime":"prime_declined","amount":1}"#))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["status"], 10003);
}

#[tokio::test]
async fn query_reports_status_two() {
    let resp = app().oneshot(json_request("/tappay/query", "{}")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["status"], 2);
    assert_eq!(body["number_of_transactions"], 0);
}

#[tokio::test]
async fn refund_of_unknown_trade_is_400_with_json_body() {
    let resp = app()
        .oneshot(json_request("/tappay/refund", r#"{"rec_trade_id":"missing"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["status"], 421);
}

#[tokio::test]
async fn unknown_gateway_action_is_plain_404() {
    let resp = app().oneshot(json_request("/tappay/capture", "{}")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(&body_bytes(resp).await[..], b"unknown action");
}

// --- atm ---

#[tokio::test]
async fn atm_record_reports_status_two() {
    let resp = app().oneshot(json_request("/atm/record", "{}")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["status"], 2);
}

#[tokio::test]
async fn atm_pay_by_prime_returns_virtual_account() {
    let resp = app()
        .oneshot(json_request("/atm/pay-by-prime", r#"{"prime":"p","amount":500}"#))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["status"], 0);
    assert_eq!(body["bank_code"], "812");
    assert_eq!(body["expire_days"], 3);
}

// --- merchant ---

#[tokio::test]
async fn merchant_create_requires_partner_account() {
    let resp = app().oneshot(form_request("/merchant/create", "name=Shop")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["status"], 1);
}

#[tokio::test]
async fn merchant_query_unknown_account() {
    let resp = app().oneshot(get("/merchant/query?partner_account=nobody")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["status"], 3);
}

// --- currency ---

#[tokio::test]
async fn currency_exchange_rounds_up_by_default() {
    let resp = app()
        .oneshot(get("/currency/exchange?from=TWD&to=USD&from_amount=100"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["to_amount"], "3.170");
}

#[tokio::test]
async fn currency_exchange_unknown_pair_is_plain_text() {
    let resp = app()
        .oneshot(get("/currency/exchange?from=EUR&to=XYZ&from_amount=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_bytes(resp).await;
    assert_eq!(&body[..], b"unsupported pair EUR/XYZ");
}

// --- orders ---

#[tokio::test]
async fn create_order_uses_ok_flag() {
    let resp = app()
        .oneshot(json_request("/order/create", r#"{"amount":10}"#))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["ok"], true);

    let resp = app()
        .oneshot(json_request("/order/create", r#"{"amount":0}"#))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["ok"], false);
}

#[tokio::test]
async fn redirect_payment_uses_success_flag() {
    let resp = app()
        .oneshot(form_request("/third-party/redirect-payment", "order_number=A1&amount=300"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["payment_url"], "https://pay.example.test/redirect/A1");
}

// --- upload ---

#[tokio::test]
async fn upload_lists_received_files() {
    let resp = app().oneshot(multipart_request("pk-1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["partner_account"], "acct-1");
    assert_eq!(body["files"][0]["field"], "license");
    assert_eq!(body["files"][0]["content_type"], "application/pdf");
    assert_eq!(body["files"][0]["size"], 4);
}

#[tokio::test]
async fn upload_in_maintenance_is_503() {
    let resp = app().oneshot(multipart_request("maintenance")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// --- stateful flow ---

#[tokio::test]
async fn pay_then_refund_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("/tappay/pay-by-prime", r#"{"prime":"p","amount":250}"#))
        .await
        .unwrap();
    let paid = body_json(resp).await;
    let id = paid["rec_trade_id"].as_str().unwrap().to_string();

    // history finds the trade
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("/tappay/history", &format!(r#"{{"rec_trade_id":"{id}"}}"#)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let history = body_json(resp).await;
    assert_eq!(history["trade_history"][0]["amount"], 250);

    // partial refund
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "/tappay/refund",
            &format!(r#"{{"rec_trade_id":"{id}","amount":100}}"#),
        ))
        .await
        .unwrap();
    let refund = body_json(resp).await;
    assert_eq!(refund["status"], 0);
    assert_eq!(refund["refund_amount"], 100);

    // remaining balance refunded when amount is omitted
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("/tappay/refund", &format!(r#"{{"rec_trade_id":"{id}"}}"#)))
        .await
        .unwrap();
    let refund = body_json(resp).await;
    assert_eq!(refund["refund_amount"], 150);
}
