//! The app driven against a real HTTP store (wiremock).

use dailybrief::app::{App, QuoteState};
use dailybrief::config::Config;
use dailybrief::content::{ContentStore, FetchErrorKind, RestStore};
use dailybrief::menu::Selection;
use dailybrief::playback::NoSpeech;
use dailybrief::sync::{FeedPhase, FeedSynchronizer};
use dailybrief::ui::render_view;
use std::sync::Arc;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn app_for(server: &MockServer, toml: &str) -> App {
    let config: Config = toml::from_str(toml).unwrap();
    let menu = config.to_menu().unwrap();
    let initial = config.initial_selection(&menu);
    let uri = server.uri();
    let settings = config
        .store_settings_with(|name| (name == "DAILYBRIEF_STORE_URL").then(|| uri.clone()))
        .unwrap();
    let store: Arc<dyn ContentStore> = Arc::new(RestStore::new(settings).unwrap());
    let feed = FeedSynchronizer::new(menu, initial).unwrap();
    App::new(store, feed, Box::new(NoSpeech))
}

#[tokio::test]
async fn test_start_loads_quote_and_brief_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_quotes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[{"content":"学而时习之","author":"孔子"}]"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_briefs"))
        .and(query_param("main_menu", "eq.国际"))
        .and(query_param("sub_menu", "eq.AI"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"date":"2024-05-01","content":"国际AI综述",
                "links":[{"title":"来源","url":"https://example.com/a"}]}]"#,
        ))
        .mount(&server)
        .await;

    let mut app = app_for(&server, "default_main = \"国际\"\ndefault_sub = \"AI\"\n").await;
    let (tx, mut rx) = mpsc::channel(8);
    app.start(&tx);

    while app.feed.is_loading() || app.quote == QuoteState::Loading {
        let event = rx.recv().await.unwrap();
        app.handle_event(event);
    }

    let view = app.view();
    assert_eq!(view.phase, FeedPhase::Loaded);
    assert_eq!(view.content.map(|c| c.content.as_str()), Some("国际AI综述"));
    assert_eq!(view.quote.map(|q| q.author.as_str()), Some("孔子"));

    let printed = render_view(&app);
    assert!(printed.contains("== 国际 / AI =="));
    assert!(printed.contains("国际AI综述"));
    assert!(printed.contains("[1] 来源"));
}

#[tokio::test]
async fn test_empty_result_and_server_error_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_briefs"))
        .and(query_param("category", "eq.段子"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_briefs"))
        .and(query_param("category", "eq.AI"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut app = app_for(&server, "[menu]\ncategories = [\"AI\", \"段子\"]\n").await;
    let (tx, mut rx) = mpsc::channel(8);

    app.select(Selection::category("段子"), &tx);
    while app.feed.is_loading() {
        app.handle_event(rx.recv().await.unwrap());
    }
    assert_eq!(app.view().phase, FeedPhase::Empty);
    assert!(render_view(&app).contains("No content"));

    app.select(Selection::category("AI"), &tx);
    while app.feed.is_loading() {
        app.handle_event(rx.recv().await.unwrap());
    }
    assert_eq!(app.view().error, Some(FetchErrorKind::Status(500)));
    assert!(render_view(&app).contains("Failed to load"));
}
