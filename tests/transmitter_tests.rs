//! Transmitter Tests
//!
//! Drives `HttpTransmitter` and the uploader against an in-process axum
//! collector bound to an ephemeral localhost port.

use beltwatch::config::PlantConfig;
use beltwatch::pipeline::{Machine, Plant, Scheduler};
use beltwatch::transmit::{
    run_uploader, HttpTransmitter, Outbox, SharedStats, TransmitError, Transmitter, UploadSettings,
};
use beltwatch::types::{MachineKind, OperatingParams};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Received = Arc<Mutex<Vec<(String, Value)>>>;

/// Start a collector that records every POST and answers with `status`.
async fn collector(status: StatusCode) -> (String, Received) {
    let received = Received::default();
    let app = Router::new()
        .route("/api/:kind", post(record))
        .with_state((received.clone(), status));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api"), received)
}

async fn record(
    State((received, status)): State<(Received, StatusCode)>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    received.lock().unwrap().push((kind, body));
    status
}

fn count(received: &Received, kind: &str) -> usize {
    received.lock().unwrap().iter().filter(|(k, _)| k == kind).count()
}

fn ticked_machine() -> Machine {
    let mut machine = Machine::with_defaults("elevator_1", MachineKind::BucketElevator, Some(11)).unwrap();
    let params = OperatingParams {
        drive_speed: 1.0,
        load_proxy: 0.6,
        operating_hours: 0.01,
    };
    let t0 = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
    machine.tick(&params, t0).unwrap();
    machine
}

#[tokio::test]
async fn test_posts_each_payload_kind() {
    let (base_url, received) = collector(StatusCode::CREATED).await;
    let transmitter = HttpTransmitter::new(&base_url, Duration::from_secs(5)).unwrap();
    let machine = ticked_machine();
    let snapshot = machine.get_snapshot();

    tokio_test::assert_ok!(transmitter.send_sensor_data("elevator_1", &snapshot).await);
    tokio_test::assert_ok!(transmitter.send_alarms("elevator_1", &machine.alarm_log()).await);
    tokio_test::assert_ok!(
        transmitter
            .send_health("elevator_1", snapshot.timestamp, machine.health(), &machine.performance())
            .await
    );
    tokio_test::assert_ok!(
        transmitter
            .send_recommendations("elevator_1", snapshot.timestamp, machine.recommendations())
            .await
    );

    let received = received.lock().unwrap();
    let kinds: Vec<&str> = received.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(kinds, ["sensor-data", "alarms", "health", "recommendations"]);
    for (_, body) in received.iter() {
        assert_eq!(body["machine_id"], "elevator_1");
    }
    assert!(received[0].1["channels"]["temperature_c"]["value"].is_number());
    assert!(received[2].1["health_score"].is_number());
    assert!(received[2].1["performance"].is_object());
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (base_url, received) = collector(StatusCode::SERVICE_UNAVAILABLE).await;
    let transmitter = HttpTransmitter::new(&base_url, Duration::from_secs(5)).unwrap();
    let snapshot = ticked_machine().get_snapshot();

    let err = tokio_test::assert_err!(transmitter.send_sensor_data("elevator_1", &snapshot).await);
    assert!(matches!(err, TransmitError::ServerError(s) if s.as_u16() == 503));
    assert_eq!(count(&received, "sensor-data"), 1);
}

#[tokio::test]
async fn test_unreachable_collector_is_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transmitter = HttpTransmitter::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let snapshot = ticked_machine().get_snapshot();
    let err = tokio_test::assert_err!(transmitter.send_sensor_data("elevator_1", &snapshot).await);
    assert!(matches!(err, TransmitError::Http(_)));
}

/// Scheduler -> outbox -> uploader -> collector, with health every second tick.
#[tokio::test]
async fn test_scheduler_feeds_collector() {
    let (base_url, received) = collector(StatusCode::OK).await;

    let mut config = PlantConfig::default();
    config.simulation.seed = Some(5);
    config.transmitter.enabled = true;
    config.transmitter.base_url.clone_from(&base_url);
    config.transmitter.report_every_ticks = 2;

    let plant = Arc::new(Plant::from_config(&config).unwrap());
    let stats = SharedStats::new(true);
    let (outbox, rx) = Outbox::channel(config.transmitter.outbox_capacity, stats.clone());
    let scheduler = Scheduler::new(Arc::clone(&plant), &config, Some(outbox));

    let start = Utc::now();
    for i in 0..4 {
        scheduler.tick_once(start + ChronoDuration::seconds(i)).unwrap();
    }
    // Dropping the scheduler closes the outbox so the uploader drains and exits
    drop(scheduler);

    let transmitter = Arc::new(HttpTransmitter::new(&base_url, Duration::from_secs(5)).unwrap());
    tokio::time::timeout(
        Duration::from_secs(10),
        run_uploader(rx, transmitter, UploadSettings::from(&config.transmitter), stats.clone(), CancellationToken::new()),
    )
    .await
    .expect("uploader should finish once the outbox closes");

    let machines = plant.len();
    assert_eq!(count(&received, "sensor-data"), 4 * machines);
    assert_eq!(count(&received, "health"), 2 * machines);

    let snap = stats.snapshot();
    assert_eq!(snap.failed_requests, 0);
    assert_eq!(snap.dropped_messages, 0);
    assert_eq!(snap.successful_requests, snap.total_requests);
    assert!((snap.success_rate - 1.0).abs() < f64::EPSILON);
    assert!(snap.online);
}

/// A collector that keeps failing puts the uploader offline.
#[tokio::test]
async fn test_failing_collector_goes_offline() {
    let (base_url, received) = collector(StatusCode::INTERNAL_SERVER_ERROR).await;
    let transmitter = Arc::new(HttpTransmitter::new(&base_url, Duration::from_secs(5)).unwrap());
    let stats = SharedStats::new(true);
    let (outbox, rx) = Outbox::channel(16, stats.clone());

    let machine = ticked_machine();
    for _ in 0..3 {
        outbox.push(beltwatch::transmit::OutboundMessage::SensorData {
            machine_id: "elevator_1".to_string(),
            snapshot: machine.get_snapshot(),
        });
    }
    drop(outbox);

    let settings = UploadSettings {
        max_retries: 1,
        backoff: Duration::from_millis(5),
        offline_cooldown: Duration::from_secs(60),
    };
    run_uploader(rx, transmitter, settings, stats.clone(), CancellationToken::new()).await;

    // One message tried twice, the other two dropped while offline
    assert_eq!(count(&received, "sensor-data"), 2);
    let snap = stats.snapshot();
    assert_eq!(snap.failed_requests, 2);
    assert_eq!(snap.dropped_messages, 3);
    assert!(!snap.online);
    assert!(snap.last_error.unwrap().contains("500"));
}
