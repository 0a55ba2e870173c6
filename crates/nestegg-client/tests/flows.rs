#![allow(deprecated)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use httpmock::prelude::*;
use nestegg_client::app::{REGISTERED, SESSION_EXPIRED};
use nestegg_client::view::{BadgeTone, CREATED_UNKNOWN, HISTORY_EMPTY};
use nestegg_client::{
    Action, AlertLevel, ApiClient, App, AuthTab, CalculationKind, ClientConfig, Credentials,
    HistoryView, MemoryTokenStore, Screen, TokenStore,
};
use serde_json::{Value, json};
use url::Url;

const PREFIX: &str = "/blackrock/challenge/v1";

fn path(endpoint: &str) -> String {
    format!("{PREFIX}{endpoint}")
}

fn app_for(server: &MockServer, store: Arc<MemoryTokenStore>) -> Result<App> {
    let config = ClientConfig::new(Url::parse(&server.base_url())?);
    Ok(App::new(ApiClient::new(config)?, store))
}

fn record(investment_type: &str, total: f64) -> Value {
    json!({
        "id": "0d9b6c1e-3f7a-4b8e-9a51-2f4c8e7d6a10",
        "created_at": "2024-03-05T14:07:09.123456",
        "investment_type": investment_type,
        "payload": {"age": 29, "wage": 50000},
        "result": {"totalTransactionAmount": total, "totalCeiling": 1300.0, "savingsByDates": []}
    })
}

fn alert_message(app: &App) -> Option<String> {
    app.view().alert.map(|alert| alert.message)
}

#[tokio::test]
async fn login_persists_token_and_loads_history() -> Result<()> {
    let server = MockServer::start_async().await;
    let login = server.mock(|when, then| {
        when.method(POST)
            .path(path("/login"))
            .body_includes("username=a%40b.com")
            .body_includes("password=x");
        then.status(200).json_body(json!({"access_token": "T"}));
    });
    let history = server.mock(|when, then| {
        when.method(GET)
            .path(path("/history"))
            .header("authorization", "Bearer T");
        then.status(200).json_body(json!([]));
    });

    let store = Arc::new(MemoryTokenStore::new());
    let app = app_for(&server, Arc::clone(&store))?;
    app.dispatch(Action::Load).await?;
    assert_eq!(app.view().screen, Screen::Auth);

    app.dispatch(Action::Login(Credentials::new("a@b.com", "x")))
        .await?;

    login.assert();
    history.assert();
    assert_eq!(store.load()?, Some("T".to_string()));
    let view = app.view();
    assert_eq!(view.screen, Screen::Home);
    assert!(view.logout_visible());
    assert!(view.alert.is_none());
    assert_eq!(view.history, HistoryView::Empty);
    assert_eq!(view.history.placeholder(), Some(HISTORY_EMPTY));
    Ok(())
}

#[tokio::test]
async fn login_rejection_surfaces_server_detail() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path(path("/login"));
        then.status(401)
            .json_body(json!({"detail": "Incorrect email or password"}));
    });

    let store = Arc::new(MemoryTokenStore::new());
    let app = app_for(&server, Arc::clone(&store))?;
    app.dispatch(Action::Login(Credentials::new("a@b.com", "bad")))
        .await?;

    assert_eq!(
        alert_message(&app).as_deref(),
        Some("Incorrect email or password")
    );
    assert_eq!(app.view().alerts_raised(), 1);
    assert_eq!(store.load()?, None);
    assert_eq!(app.view().screen, Screen::Auth);
    Ok(())
}

#[tokio::test]
async fn register_success_switches_to_login_tab() -> Result<()> {
    let server = MockServer::start_async().await;
    let register = server.mock(|when, then| {
        when.method(POST)
            .path(path("/register"))
            .json_body(json!({"email": "a@b.com", "password": "x"}));
        then.status(201)
            .json_body(json!({"id": "0d9b6c1e-3f7a-4b8e-9a51-2f4c8e7d6a10", "email": "a@b.com"}));
    });

    let app = app_for(&server, Arc::new(MemoryTokenStore::new()))?;
    app.dispatch(Action::SwitchTab(AuthTab::Register)).await?;
    app.dispatch(Action::Register(Credentials::new("a@b.com", "x")))
        .await?;

    register.assert();
    let view = app.view();
    assert_eq!(view.auth_tab, AuthTab::Login);
    let alert = view.alert.as_ref();
    assert_eq!(alert.map(|a| a.level), Some(AlertLevel::Success));
    assert_eq!(alert.map(|a| a.message.as_str()), Some(REGISTERED));
    Ok(())
}

#[tokio::test]
async fn register_failure_uses_detail_or_fallback() -> Result<()> {
    let server = MockServer::start_async().await;
    let mut duplicate = server.mock(|when, then| {
        when.method(POST).path(path("/register"));
        then.status(400)
            .json_body(json!({"detail": "Email already registered"}));
    });

    let app = app_for(&server, Arc::new(MemoryTokenStore::new()))?;
    app.dispatch(Action::Register(Credentials::new("a@b.com", "x")))
        .await?;
    assert_eq!(
        alert_message(&app).as_deref(),
        Some("Email already registered")
    );

    duplicate.delete();
    server.mock(|when, then| {
        when.method(POST).path(path("/register"));
        then.status(500).json_body(json!({}));
    });
    app.dispatch(Action::Register(Credentials::new("a@b.com", "x")))
        .await?;
    assert_eq!(alert_message(&app).as_deref(), Some("Registration failed"));
    Ok(())
}

#[tokio::test]
async fn valid_payload_issues_exactly_one_calculation_call() -> Result<()> {
    let server = MockServer::start_async().await;
    let result = json!({
        "totalTransactionAmount": 1245.0,
        "totalCeiling": 1300.0,
        "savingsByDates": []
    });
    let calc = server.mock(|when, then| {
        when.method(POST)
            .path(path("/returns:nps"))
            .header("authorization", "Bearer T")
            .json_body(json!({"age": 40}));
        then.status(200).json_body(result.clone());
    });
    let history = server.mock(|when, then| {
        when.method(GET).path(path("/history"));
        then.status(200).json_body(json!([record("nps", 1245.0)]));
    });

    let app = app_for(&server, Arc::new(MemoryTokenStore::with_token("T")))?;
    app.dispatch(Action::Load).await?;
    app.dispatch(Action::EditPayload(r#"{"age": 40}"#.into()))
        .await?;
    app.dispatch(Action::SubmitCalculation(CalculationKind::Nps))
        .await?;

    assert_eq!(calc.hits(), 1);
    assert_eq!(history.hits(), 2);
    let view = app.view();
    assert_eq!(
        view.alert.as_ref().map(|a| a.message.as_str()),
        Some("Calculation for NPS successful!")
    );
    assert_eq!(
        view.result_panel.as_deref(),
        Some(serde_json::to_string_pretty(&result)?.as_str())
    );
    let HistoryView::Populated(rows) = view.history else {
        panic!("expected populated history");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total, "₹1245");
    assert_eq!(rows[0].badge.tone, BadgeTone::Success);
    Ok(())
}

#[tokio::test]
async fn invalid_payload_issues_no_calls() -> Result<()> {
    let server = MockServer::start_async().await;
    let calc = server.mock(|when, then| {
        when.method(POST).path(path("/returns:index"));
        then.status(200).json_body(json!({}));
    });

    let app = app_for(&server, Arc::new(MemoryTokenStore::with_token("T")))?;
    app.dispatch(Action::EditPayload("{\"age\": ".into())).await?;
    app.dispatch(Action::SubmitCalculation(CalculationKind::Index))
        .await?;

    assert_eq!(calc.hits(), 0);
    assert_eq!(
        alert_message(&app).as_deref(),
        Some("Invalid JSON format in the input box.")
    );
    Ok(())
}

#[tokio::test]
async fn validation_errors_are_joined() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path(path("/returns:nps"));
        then.status(422).json_body(json!({
            "detail": [{"loc": ["body", "age"], "msg": "field required", "type": "missing"}]
        }));
    });

    let app = app_for(&server, Arc::new(MemoryTokenStore::with_token("T")))?;
    app.dispatch(Action::EditPayload(r#"{"wage": 50000}"#.into()))
        .await?;
    app.dispatch(Action::SubmitCalculation(CalculationKind::Nps))
        .await?;

    let view = app.view();
    let alert = view.alert.as_ref();
    assert_eq!(alert.map(|a| a.level), Some(AlertLevel::Danger));
    assert_eq!(
        alert.map(|a| a.message.as_str()),
        Some("body.age: field required")
    );
    assert!(view.result_panel.is_none());
    Ok(())
}

#[tokio::test]
async fn expired_session_on_calculation_notifies_once() -> Result<()> {
    let server = MockServer::start_async().await;
    let calc = server.mock(|when, then| {
        when.method(POST)
            .path(path("/returns:nps"))
            .header("authorization", "Bearer T");
        then.status(401)
            .json_body(json!({"detail": "Could not validate credentials"}));
    });

    let store = Arc::new(MemoryTokenStore::with_token("T"));
    let app = app_for(&server, Arc::clone(&store))?;
    let before = app.view().alerts_raised();
    app.dispatch(Action::SubmitCalculation(CalculationKind::Nps))
        .await?;

    calc.assert();
    let view = app.view();
    assert_eq!(view.alerts_raised(), before + 1);
    assert_eq!(
        view.alert.as_ref().map(|a| a.message.as_str()),
        Some(SESSION_EXPIRED)
    );
    assert_eq!(view.screen, Screen::Auth);
    assert_eq!(store.load()?, None);
    assert!(!app.session().is_authenticated());
    Ok(())
}

#[tokio::test]
async fn expired_session_on_history_notifies_once() -> Result<()> {
    let server = MockServer::start_async().await;
    let history = server.mock(|when, then| {
        when.method(GET).path(path("/history"));
        then.status(401).json_body(json!({"detail": "Not authenticated"}));
    });

    let store = Arc::new(MemoryTokenStore::with_token("T"));
    let app = app_for(&server, Arc::clone(&store))?;
    app.dispatch(Action::Load).await?;

    history.assert();
    let view = app.view();
    assert_eq!(view.alerts_raised(), 1);
    assert_eq!(
        view.alert.as_ref().map(|a| a.message.as_str()),
        Some(SESSION_EXPIRED)
    );
    assert_eq!(view.screen, Screen::Auth);
    assert_eq!(view.history, HistoryView::Loading);
    assert_eq!(store.load()?, None);
    Ok(())
}

#[tokio::test]
async fn history_render_is_idempotent() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path(path("/history"));
        then.status(200)
            .json_body(json!([record("nps", 1725.0), record("index", 310.5)]));
    });

    let app = app_for(&server, Arc::new(MemoryTokenStore::with_token("T")))?;
    app.dispatch(Action::RefreshHistory).await?;
    let first = app.view().history;
    app.dispatch(Action::RefreshHistory).await?;
    let second = app.view().history;

    assert_eq!(first, second);
    let HistoryView::Populated(rows) = first else {
        panic!("expected populated history");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].badge.label, "INDEX");
    assert_eq!(rows[1].badge.tone, BadgeTone::Warning);
    assert_eq!(rows[1].total, "₹310.5");
    Ok(())
}

#[tokio::test]
async fn history_failure_shows_error_placeholder() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path(path("/history"));
        then.status(500).json_body(json!({"detail": "database unavailable"}));
    });

    let app = app_for(&server, Arc::new(MemoryTokenStore::with_token("T")))?;
    app.dispatch(Action::Load).await?;
    let view = app.view();
    assert_eq!(view.history, HistoryView::Failed);
    assert!(view.alert.is_none());
    Ok(())
}

#[tokio::test]
async fn view_details_resolves_cached_record_by_position() -> Result<()> {
    let server = MockServer::start_async().await;
    let history = server.mock(|when, then| {
        when.method(GET).path(path("/history"));
        then.status(200)
            .json_body(json!([record("nps", 1.0), record("index", 2.0)]));
    });

    let app = app_for(&server, Arc::new(MemoryTokenStore::with_token("T")))?;
    app.dispatch(Action::Load).await?;
    app.dispatch(Action::ViewDetails(1)).await?;

    history.assert();
    let modal = app.view().modal;
    let Some(modal) = modal else {
        panic!("expected detail modal");
    };
    assert_eq!(modal.index, 1);
    let result: Value = serde_json::from_str(&modal.result)?;
    assert_eq!(result["totalTransactionAmount"], json!(2.0));
    let payload: Value = serde_json::from_str(&modal.payload)?;
    assert_eq!(payload["age"], json!(29));

    let before = app.view();
    app.dispatch(Action::ViewDetails(2)).await?;
    assert_eq!(app.view(), before);

    app.dispatch(Action::CloseDetails).await?;
    assert!(app.view().modal.is_none());
    Ok(())
}

#[tokio::test]
async fn superseded_history_response_is_dropped() -> Result<()> {
    let server = MockServer::start_async().await;
    let slow = server.mock(|when, then| {
        when.method(GET)
            .path(path("/history"))
            .header("authorization", "Bearer A");
        then.status(200)
            .delay(Duration::from_millis(400))
            .json_body(json!([record("index", 9.0)]));
    });
    let fast = server.mock(|when, then| {
        when.method(GET)
            .path(path("/history"))
            .header("authorization", "Bearer B");
        then.status(200)
            .json_body(json!([record("nps", 1.0), record("nps", 2.0)]));
    });

    let store = Arc::new(MemoryTokenStore::with_token("A"));
    let app = app_for(&server, Arc::clone(&store))?;
    let later = app.clone();
    let later_store = Arc::clone(&store);

    let (first, second) = tokio::join!(app.check_auth_status(), async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        later_store.save("B")?;
        later.check_auth_status().await
    });
    first?;
    second?;

    slow.assert();
    fast.assert();
    let records = app.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.investment_type == "nps"));
    let HistoryView::Populated(rows) = app.view().history else {
        panic!("expected populated history");
    };
    assert_eq!(rows.len(), 2);
    Ok(())
}

#[tokio::test]
async fn superseded_expiry_keeps_newer_session() -> Result<()> {
    let server = MockServer::start_async().await;
    let rejected = server.mock(|when, then| {
        when.method(GET)
            .path(path("/history"))
            .header("authorization", "Bearer A");
        then.status(401)
            .delay(Duration::from_millis(400))
            .json_body(json!({"detail": "Could not validate credentials"}));
    });
    let accepted = server.mock(|when, then| {
        when.method(GET)
            .path(path("/history"))
            .header("authorization", "Bearer B");
        then.status(200).json_body(json!([]));
    });

    let store = Arc::new(MemoryTokenStore::with_token("A"));
    let app = app_for(&server, Arc::clone(&store))?;
    let later = app.clone();
    let later_store = Arc::clone(&store);

    let (first, second) = tokio::join!(app.check_auth_status(), async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        later_store.save("B")?;
        later.check_auth_status().await
    });
    first?;
    second?;

    rejected.assert();
    accepted.assert();
    assert_eq!(store.load()?, Some("B".to_string()));
    let view = app.view();
    assert_eq!(view.screen, Screen::Home);
    assert_eq!(view.history, HistoryView::Empty);
    assert!(view.alert.is_none());
    assert_eq!(view.alerts_raised(), 0);
    Ok(())
}

#[tokio::test]
async fn expiry_of_replaced_token_keeps_stored_one() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path(path("/history"));
        then.status(200).json_body(json!([]));
    });
    let calc = server.mock(|when, then| {
        when.method(POST)
            .path(path("/returns:nps"))
            .header("authorization", "Bearer A");
        then.status(401)
            .delay(Duration::from_millis(400))
            .json_body(json!({"detail": "Could not validate credentials"}));
    });

    let store = Arc::new(MemoryTokenStore::with_token("A"));
    let app = app_for(&server, Arc::clone(&store))?;
    app.dispatch(Action::Load).await?;
    let later_store = Arc::clone(&store);

    let (submitted, saved) = tokio::join!(
        app.dispatch(Action::SubmitCalculation(CalculationKind::Nps)),
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            later_store.save("B")
        }
    );
    submitted?;
    saved?;

    calc.assert();
    assert_eq!(store.load()?, Some("B".to_string()));
    let view = app.view();
    assert_eq!(view.screen, Screen::Home);
    assert_eq!(view.alerts_raised(), 0);
    Ok(())
}

#[tokio::test]
async fn history_tolerates_odd_record_fields() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path(path("/history"));
        then.status(200).json_body(json!([
            {
                "id": 7,
                "created_at": "2024-03-05",
                "investment_type": "nps",
                "payload": {"age": 29},
                "result": {"totalTransactionAmount": 12.0}
            },
            {
                "id": "not-a-uuid",
                "created_at": "last tuesday",
                "investment_type": "index",
                "payload": {},
                "result": {"totalTransactionAmount": 3.5}
            }
        ]));
    });

    let app = app_for(&server, Arc::new(MemoryTokenStore::with_token("T")))?;
    app.dispatch(Action::Load).await?;

    assert_eq!(app.records().len(), 2);
    let HistoryView::Populated(rows) = app.view().history else {
        panic!("expected populated history");
    };
    assert_eq!(rows.len(), 2);
    assert_ne!(rows[0].created, CREATED_UNKNOWN);
    assert_eq!(rows[0].total, "₹12");
    assert_eq!(rows[1].created, CREATED_UNKNOWN);
    assert_eq!(rows[1].total, "₹3.5");
    Ok(())
}

#[tokio::test]
async fn network_failure_on_calculation_is_generic() -> Result<()> {
    let config = ClientConfig::new(Url::parse("http://127.0.0.1:9")?);
    let app = App::new(
        ApiClient::new(config)?,
        Arc::new(MemoryTokenStore::with_token("T")),
    );
    app.dispatch(Action::SubmitCalculation(CalculationKind::Nps))
        .await?;
    assert_eq!(alert_message(&app).as_deref(), Some("Failed to calculate."));
    assert_eq!(app.view().alerts_raised(), 1);
    Ok(())
}
