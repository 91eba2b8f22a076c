use super::*;
use price_sentinel::Runner;
use price_sentinel::models::{CapturedItem, Snapshot};
use price_sentinel::plugins::TelegramNotifier;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn telegram_server(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123456:integration-token/sendMessage"))
        .and(body_partial_json(json!({"chat_id": -100200300, "parse_mode": "HTML"})))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_run_sends_single_telegram_message() -> anyhow::Result<()> {
    let server = telegram_server(200, json!({"ok": true, "result": {"message_id": 501}})).await;

    let dir = TempDir::new()?;
    let mut config = get_test_config(vec![test_source("Alpha"), test_source("Beta")], &dir);
    config.telegram.api_base = server.uri();
    let store = create_store(&config);
    store.save("Alpha", &Snapshot::new(vec![CapturedItem::new("Widget", 100.0)]))?;
    store.save("Beta", &Snapshot::new(vec![CapturedItem::new("Fish & Chips", 8.0)]))?;

    let renderer = FakeRenderer::default();
    renderer.serve(&source_url("Alpha"), catalog_page(&[("Widget", "90")]));
    renderer.serve(&source_url("Beta"), catalog_page(&[("Fish &amp; Chips", "10")]));
    let notifier = TelegramNotifier::new(config.telegram.clone());

    let summary = Runner::new(&config, &renderer, &store, &notifier).run().await?;

    let notification = summary.notification.expect("a notification was sent");
    assert_eq!(notification.message_id.as_deref(), Some("501"));
    assert_eq!(notification.records_sent, 2);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body)?;
    let text = body["text"].as_str().unwrap();
    assert!(text.contains("<b>Alpha</b>"));
    assert!(text.contains("📉 <b>Widget</b>\n   100.00 → 90.00 (-10.0 %)"));
    assert!(text.contains("📈 <b>Fish &amp; Chips</b>\n   8.00 → 10.00 (+25.0 %)"));
    assert!(text.find("Alpha").unwrap() < text.find("Beta").unwrap());

    Ok(())
}

#[tokio::test]
async fn test_no_changes_sends_nothing() -> anyhow::Result<()> {
    let server = telegram_server(200, json!({"ok": true, "result": {"message_id": 1}})).await;

    let dir = TempDir::new()?;
    let mut config = get_test_config(vec![test_source("Alpha")], &dir);
    config.telegram.api_base = server.uri();
    let store = create_store(&config);
    store.save("Alpha", &Snapshot::new(vec![CapturedItem::new("Widget", 100.0)]))?;

    let renderer = FakeRenderer::default();
    renderer.serve(&source_url("Alpha"), catalog_page(&[("Widget", "101")]));
    let notifier = TelegramNotifier::new(config.telegram.clone());

    let summary = Runner::new(&config, &renderer, &store, &notifier).run().await?;

    assert!(summary.notification.is_none());
    assert!(server.received_requests().await.unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rejected_message_fails_run_but_keeps_snapshots() -> anyhow::Result<()> {
    let server = telegram_server(
        403,
        json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        }),
    )
    .await;

    let dir = TempDir::new()?;
    let mut config = get_test_config(vec![test_source("Alpha")], &dir);
    config.telegram.api_base = server.uri();
    let store = create_store(&config);
    store.save("Alpha", &Snapshot::new(vec![CapturedItem::new("Widget", 100.0)]))?;

    let renderer = FakeRenderer::default();
    renderer.serve(&source_url("Alpha"), catalog_page(&[("Widget", "200")]));
    let notifier = TelegramNotifier::new(config.telegram.clone());

    let result = Runner::new(&config, &renderer, &store, &notifier).run().await;

    let err = result.unwrap_err();
    assert!(matches!(err, AppError::Notification(_)));
    assert!(err.to_string().contains("bot was blocked"));
    assert_eq!(store.load("Alpha")?.unwrap().items()[0].price, 200.0);

    Ok(())
}
