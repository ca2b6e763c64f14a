use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::Instant;

use fourteeners_widgets_lib::host::{InMemoryHost, SessionStore, ToolResponse};
use fourteeners_widgets_lib::{HostCapabilities, HostCapability};
use fourteeners_widgets_lib::model::{Route, WeatherBundle};
use fourteeners_widgets_lib::{
    TransitionOutcome, ViewMode, ViewState, Widget, WidgetError, WidgetKind, WidgetPhase,
    WidgetsConfig,
};

const SLOT: &str = "mountain-info";

fn elbert_payload() -> Value {
    json!({
        "content": [{"type": "text", "text": "Mt. Elbert: 14,433ft, Sawatch Range"}],
        "structuredContent": {
            "mountain": {
                "name": "Mt. Elbert",
                "rank": 1,
                "elevation": 14433,
                "range": "Sawatch Range",
                "latitude": 39.1178,
                "longitude": -106.4454
            },
            "route_count": 5
        }
    })
}

fn elbert_weather() -> Value {
    json!({
        "mountain_name": "Mt. Elbert",
        "location": {"latitude": 39.1178, "longitude": -106.4454},
        "current_conditions": {
            "name": "This Afternoon",
            "temperature": 41,
            "temperatureUnit": "F",
            "wind_speed": "15 to 25 mph",
            "wind_direction": "W",
            "short_forecast": "Mostly Sunny"
        },
        "forecast": [
            {"name": "Tonight", "temperature": 18, "temperatureUnit": "F", "short_forecast": "Clear"},
            {"name": "Saturday", "temperature": 39, "temperatureUnit": "F", "short_forecast": "Sunny"}
        ]
    })
}

fn elbert_routes() -> Value {
    json!({"routes": [
        {"mountain_name": "Mt. Elbert", "route_name": "Northeast Ridge", "route_difficulty": "Class 1", "standard": true},
        {"mountain_name": "Mt. Elbert", "route_name": "East Ridge", "route_difficulty": "Class 1"},
        {"mountain_name": "Mt. Elbert", "route_name": "Black Cloud Gulch", "route_difficulty": "Class 2"}
    ]})
}

fn info_widget(host: InMemoryHost, config: WidgetsConfig) -> (Arc<InMemoryHost>, Arc<Widget>) {
    let host = Arc::new(host);
    let widget = Arc::new(Widget::new(WidgetKind::MountainInfo, host.clone(), config));
    (host, widget)
}

#[tokio::test(start_paused = true)]
async fn poller_gives_up_after_exact_budget() {
    for kind in WidgetKind::ALL {
        let config = WidgetsConfig::default();
        let budget = config.poll_policy(kind).budget();
        let widget = Widget::new(kind, Arc::new(InMemoryHost::new()), config);

        let start = Instant::now();
        assert_eq!(widget.mount().await, WidgetPhase::Empty);
        assert_eq!(start.elapsed(), budget, "{} gave up early or late", kind);
        assert_eq!(
            widget.notice().map(|n| n.error_kind.code()),
            Some("E_DATA_UNAVAILABLE")
        );
    }
}

#[tokio::test(start_paused = true)]
async fn late_initial_data_is_picked_up() {
    let host = InMemoryHost::new().with_initial_data_after(elbert_payload(), Duration::from_secs(3));
    let (_, widget) = info_widget(host, WidgetsConfig::default());

    let start = Instant::now();
    assert_eq!(widget.mount().await, WidgetPhase::Ready);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn data_delivered_after_mount_starts_is_used() {
    let (host, widget) = info_widget(InMemoryHost::new(), WidgetsConfig::default());

    let mount = tokio::spawn({
        let widget = widget.clone();
        async move { widget.mount().await }
    });
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(widget.phase(), WidgetPhase::Mounting);
    host.deliver(elbert_payload());

    assert_eq!(mount.await.unwrap(), WidgetPhase::Ready);
    assert_eq!(
        widget.output().and_then(|o| o.focus_mountain_name().map(str::to_string)),
        Some("Mt. Elbert".to_string())
    );
}

#[tokio::test]
async fn remount_restores_non_empty_routes() {
    let store = SessionStore::new();
    let persisted = json!({
        "mode": "routes",
        "routes": [
            {"mountain_name": "Mt. Elbert", "route_name": "Northeast Ridge"},
            {"mountain_name": "Mt. Elbert", "route_name": "East Ridge"}
        ]
    });
    store.put(SLOT, persisted.clone());

    let host = InMemoryHost::in_session(store, SLOT).with_initial_data(elbert_payload());
    let (host, widget) = info_widget(host, WidgetsConfig::default());
    widget.mount().await;

    let expected: Vec<Route> = serde_json::from_value(persisted["routes"].clone()).unwrap();
    assert_eq!(widget.view(), ViewState::Routes { routes: expected });
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn remount_with_empty_or_absent_routes_starts_in_info() {
    for persisted in [Some(json!({"mode": "routes", "routes": []})), Some(json!({"mode": "routes"})), None] {
        let store = SessionStore::new();
        if let Some(state) = persisted {
            store.put(SLOT, state);
        }
        let host = InMemoryHost::in_session(store, SLOT).with_initial_data(elbert_payload());
        let (_, widget) = info_widget(host, WidgetsConfig::default());
        widget.mount().await;
        assert_eq!(widget.view(), ViewState::Info);
    }
}

#[tokio::test]
async fn restore_can_be_disabled() {
    let store = SessionStore::new();
    store.put(SLOT, json!({"mode": "weather", "weather": elbert_weather()}));

    let mut config = WidgetsConfig::default();
    config.persistence.restore = false;
    let host = InMemoryHost::in_session(store, SLOT).with_initial_data(elbert_payload());
    let (_, widget) = info_widget(host, config);
    widget.mount().await;

    assert_eq!(widget.view(), ViewState::Info);
}

#[tokio::test]
async fn host_without_persisted_view_state_starts_in_info() {
    let store = SessionStore::new();
    store.put(SLOT, json!({"mode": "routes", "routes": elbert_routes()["routes"].clone()}));

    let host = InMemoryHost::in_session(store, SLOT)
        .with_capabilities(HostCapabilities::all().without(HostCapability::PersistedViewState))
        .with_initial_data(elbert_payload());
    let (host, widget) = info_widget(host, WidgetsConfig::default());

    assert_eq!(widget.mount().await, WidgetPhase::Ready);
    assert_eq!(widget.view(), ViewState::Info);
    assert_eq!(host.store().get(SLOT).unwrap()["mode"], "routes");
}

#[tokio::test]
async fn host_without_save_view_state_still_switches_views() {
    let host = InMemoryHost::in_session(SessionStore::new(), SLOT)
        .with_capabilities(HostCapabilities::all().without(HostCapability::SaveViewState))
        .with_initial_data(elbert_payload())
        .with_tool_response("get_routes", ToolResponse::ok(elbert_routes()));
    let (host, widget) = info_widget(host, WidgetsConfig::default());
    widget.mount().await;

    assert_eq!(
        widget.show_routes().await,
        TransitionOutcome::Applied(ViewMode::Routes)
    );
    assert_eq!(widget.back(), TransitionOutcome::Applied(ViewMode::Info));
    assert!(host.saved_states().is_empty());
    assert!(host.store().is_empty());
}

#[tokio::test]
async fn repeated_show_routes_fetches_once() {
    let host = InMemoryHost::new()
        .with_initial_data(elbert_payload())
        .with_tool_response("get_routes", ToolResponse::ok(elbert_routes()));
    let (host, widget) = info_widget(host, WidgetsConfig::default());
    widget.mount().await;

    assert_eq!(
        widget.show_routes().await,
        TransitionOutcome::Applied(ViewMode::Routes)
    );
    let shown = widget.view();
    assert_eq!(
        widget.show_routes().await,
        TransitionOutcome::Unchanged(WidgetError::InvalidTransition {
            from: ViewMode::Routes,
            to: ViewMode::Routes,
        })
    );
    assert_eq!(widget.view(), shown);
    assert_eq!(host.calls_to("get_routes"), 1);
    assert_eq!(host.saved_states().len(), 1);
}

#[tokio::test]
async fn rejected_call_leaves_view_state_identical() {
    let host = InMemoryHost::new()
        .with_initial_data(elbert_payload())
        .with_tool_response("get_routes", ToolResponse::rejected("database unavailable"));
    let (host, widget) = info_widget(host, WidgetsConfig::default());
    widget.mount().await;

    let before = serde_json::to_vec(&widget.view()).unwrap();
    let outcome = widget.show_routes().await;
    let after = serde_json::to_vec(&widget.view()).unwrap();

    assert_eq!(before, after);
    assert_eq!(
        outcome,
        TransitionOutcome::Unchanged(WidgetError::ToolCallFailed {
            tool: "get_routes".to_string(),
            message: "host rejected the call: database unavailable".to_string(),
        })
    );
    assert!(host.saved_states().is_empty());
}

#[tokio::test]
async fn error_envelope_and_missing_payload_keep_view() {
    let host = InMemoryHost::new()
        .with_initial_data(elbert_payload())
        .with_tool_response(
            "get_weather",
            ToolResponse::ok(json!({
                "content": [{"type": "text", "text": "Error: No mountain found matching 'Mt. Elbert'."}],
                "isError": true
            })),
        )
        .with_tool_response(
            "get_weather",
            ToolResponse::ok(json!({"content": [{"type": "text", "text": "sunny"}]})),
        );
    let (_, widget) = info_widget(host, WidgetsConfig::default());
    widget.mount().await;

    assert!(matches!(
        widget.show_weather().await,
        TransitionOutcome::Unchanged(WidgetError::ToolCallFailed { ref message, .. })
            if message.contains("No mountain found")
    ));
    assert!(matches!(
        widget.show_weather().await,
        TransitionOutcome::Unchanged(WidgetError::MalformedResult { .. })
    ));
    assert_eq!(widget.view(), ViewState::Info);
}

#[tokio::test(start_paused = true)]
async fn result_after_unmount_is_ignored() {
    let host = InMemoryHost::new()
        .with_initial_data(elbert_payload())
        .with_tool_response(
            "get_weather",
            ToolResponse::ok(json!({"weather": elbert_weather()})).after(Duration::from_secs(1)),
        );
    let (host, widget) = info_widget(host, WidgetsConfig::default());
    widget.mount().await;
    let mut events = widget.subscribe();

    let call = tokio::spawn({
        let widget = widget.clone();
        async move { widget.show_weather().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    widget.unmount();
    let before = widget.snapshot();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(call.await.unwrap(), TransitionOutcome::Ignored);
    let after = widget.snapshot();
    assert_eq!(after.view, before.view);
    assert_eq!(after.phase, WidgetPhase::Unmounted);
    assert_eq!(after.view, ViewState::Info);
    assert!(host.saved_states().is_empty());

    // Busy event, then the unmount event, and nothing after.
    assert_eq!(events.recv().await.unwrap().phase, WidgetPhase::Ready);
    assert_eq!(events.recv().await.unwrap().phase, WidgetPhase::Unmounted);
    assert!(events.try_recv().is_err());

    assert_eq!(widget.show_routes().await, TransitionOutcome::Ignored);
    assert_eq!(widget.back(), TransitionOutcome::Ignored);
}

#[tokio::test(start_paused = true)]
async fn unmount_during_poll_stops_reading_the_slot() {
    let (host, widget) = info_widget(InMemoryHost::new(), WidgetsConfig::default());

    let mount = tokio::spawn({
        let widget = widget.clone();
        async move { widget.mount().await }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    widget.unmount();

    assert_eq!(mount.await.unwrap(), WidgetPhase::Unmounted);
    let reads = host.initial_reads();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(host.initial_reads(), reads);
    assert!(widget.notice().is_none());
}

#[tokio::test]
async fn saved_view_states_round_trip_through_remount() {
    let weather: WeatherBundle = serde_json::from_value(elbert_weather()).unwrap();
    let routes: Vec<Route> = serde_json::from_value(elbert_routes()["routes"].clone()).unwrap();
    let states = [
        ViewState::Info,
        ViewState::Routes { routes },
        ViewState::Weather { weather },
    ];

    for state in states {
        let store = SessionStore::new();
        let first = InMemoryHost::in_session(store.clone(), SLOT);
        fourteeners_widgets_lib::HostBridge::save_view_state(&first, state.to_value().unwrap());

        let host = InMemoryHost::in_session(store, SLOT).with_initial_data(elbert_payload());
        let (_, widget) = info_widget(host, WidgetsConfig::default());
        widget.mount().await;
        assert_eq!(widget.view(), state);
    }
}

#[tokio::test]
async fn mt_elbert_weather_scenario() {
    let store = SessionStore::new();
    let mut config = WidgetsConfig::default();
    config.tools.weather = "get_mountain_weather".to_string();

    let host = InMemoryHost::in_session(store.clone(), SLOT)
        .with_initial_data(json!({
            "mountain": {"name": "Mt. Elbert", "elevation": 14433},
            "route_count": 5
        }))
        .with_tool_response(
            "get_mountain_weather",
            ToolResponse::ok(json!({"weather": elbert_weather()})),
        );
    let (host, widget) = info_widget(host, config.clone());

    assert_eq!(widget.mount().await, WidgetPhase::Ready);
    assert_eq!(widget.view(), ViewState::Info);
    assert_eq!(widget.output().and_then(|o| o.route_count()), Some(5));

    assert_eq!(
        widget.show_weather().await,
        TransitionOutcome::Applied(ViewMode::Weather)
    );
    let calls = host.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_mountain_weather");
    assert_eq!(calls[0].args, json!({"mountain_name": "Mt. Elbert"}));

    let expected: WeatherBundle = serde_json::from_value(elbert_weather()).unwrap();
    assert_eq!(widget.view(), ViewState::Weather { weather: expected.clone() });
    let saved = host.saved_states();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["mode"], "weather");
    widget.unmount();

    // Remount in the same session: straight to weather, no re-fetch.
    let remount_host = InMemoryHost::in_session(store, SLOT).with_initial_data(json!({
        "mountain": {"name": "Mt. Elbert", "elevation": 14433},
        "route_count": 5
    }));
    let (remount_host, remounted) = info_widget(remount_host, config);
    remounted.mount().await;

    assert_eq!(remounted.view(), ViewState::Weather { weather: expected });
    assert!(remount_host.calls().is_empty());

    let current = match remounted.view() {
        ViewState::Weather { weather } => weather.current_conditions,
        other => panic!("unexpected view {:?}", other),
    };
    let current = current.unwrap_or_default();
    assert_eq!(current.temperature_label().as_deref(), Some("41°F"));
    assert_eq!(current.wind_label().as_deref(), Some("15 to 25 mph W"));
}

#[tokio::test]
async fn widgets_share_one_host_without_interference() {
    let store = SessionStore::new();
    let host: Arc<InMemoryHost> = Arc::new(
        InMemoryHost::in_session(store, SLOT)
            .with_initial_data(elbert_payload())
            .with_tool_response("get_routes", ToolResponse::ok(elbert_routes())),
    );
    let first = Widget::new(WidgetKind::MountainInfo, host.clone(), WidgetsConfig::default());
    let second = Widget::new(WidgetKind::MountainInfo, host.clone(), WidgetsConfig::default());
    first.mount().await;
    second.mount().await;

    assert_eq!(
        first.show_routes().await,
        TransitionOutcome::Applied(ViewMode::Routes)
    );
    assert_eq!(second.view(), ViewState::Info);
    assert_ne!(first.id(), second.id());
}
