//! Session behavior against a scripted board
//!
//! The state machine is driven directly, without a socket; the last test runs
//! the real event loop against a local WebSocket server.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use colorbridge::message::Outbound;
use colorbridge::session::{self, Completion, SessionCore, SessionSettings, TimerEvent};
use colorbridge_device::{Color, Device};
use colorbridge_transport::{Bus, MockLink};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;

const COLOR_GET: u8 = 0x43;
const COLOR_SET: u8 = 0xC3;
const TEMP_AVG: u8 = 0x02;

fn settings() -> SessionSettings {
    SessionSettings {
        name: "lamp".into(),
        serial: "CB-1".into(),
        passphrase: "pw".into(),
        telemetry_interval: Duration::from_secs(300),
        sensor_name: "shelf".into(),
    }
}

fn device(mock: &MockLink) -> Device<Completion> {
    Device::new(Bus::with_byte_delay(Box::new(mock.clone()), Duration::ZERO))
}

fn connected_core(mock: &MockLink) -> SessionCore {
    let mut core = SessionCore::new(device(mock), settings());
    core.start();
    core.take_actions();
    core.on_connected();
    core.on_connect_sent();
    core.take_outbox();
    core
}

fn push_color(mock: &MockLink, raw: u32) {
    mock.push_reply(COLOR_GET, &raw.to_le_bytes());
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[tokio::test(start_paused = true)]
async fn changed_color_is_pushed_once() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);

    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    assert_eq!(core.state().color, Some(0x01_80_FF_FF));
    assert_eq!(
        core.take_outbox(),
        vec![Outbound::color(Some(Color::from_raw(0x01_80_FF_FF)))]
    );

    // Same value again: nothing new upstream
    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    assert!(core.take_outbox().is_empty());
}

#[tokio::test(start_paused = true)]
async fn polling_updates_cache_while_disconnected() {
    let mock = MockLink::new();
    let mut core = SessionCore::new(device(&mock), settings());
    core.start();
    core.take_actions();
    core.on_disconnected();

    push_color(&mock, 0x00_FF_00_00);
    core.on_timer(TimerEvent::Poll).await;
    assert_eq!(core.state().color, Some(0x00_FF_00_00));
    assert!(core.take_outbox().is_empty());
}

#[tokio::test(start_paused = true)]
async fn offline_board_clears_cached_color() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);

    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    core.take_outbox();

    mock.unplug();
    core.on_timer(TimerEvent::Poll).await;
    assert_eq!(core.state().color, None);
    assert!(core.take_outbox().is_empty());

    // A later good read is a change again
    mock.replug();
    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    assert_eq!(core.take_outbox().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn corrupt_poll_leaves_cache_untouched() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);

    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    mock.push_corrupt_reply(COLOR_GET, &0x00_00_00_00u32.to_le_bytes());
    core.on_timer(TimerEvent::Poll).await;
    assert_eq!(core.state().color, Some(0x01_80_FF_FF));
}

const HSV_HALF: &str = r#"{"message":"actuator","name":"color","value":{"mode":"hsv","hue":0.5,"saturation":1.0,"value":1.0}}"#;

#[tokio::test(start_paused = true)]
async fn color_command_is_written_and_speeds_up_polling() {
    let mock = MockLink::new();
    // Not connected: no telemetry timer in the way
    let mut core = SessionCore::new(device(&mock), settings());
    core.start();
    core.take_actions();
    let t0 = Instant::now();

    // Initial poll at t0 finds the board silent
    core.run_due(t0).await;
    mock.clear_written();

    core.on_text(HSV_HALF);
    assert_eq!(core.device().queue().pending_raw("color"), Some(0x01_80_FF_FF));

    // Drain fires one interval after the command
    tokio::time::advance(Duration::from_millis(149)).await;
    core.run_due(Instant::now()).await;
    assert!(!mock.written().contains(&COLOR_SET));

    tokio::time::advance(Duration::from_millis(1)).await;
    let now = Instant::now();
    core.run_due(now).await;

    let written = mock.written();
    let at = written
        .windows(6)
        .position(|w| w[0] == COLOR_SET && w[1..5] == 0x01_80_FF_FFu32.to_le_bytes())
        .expect("color frame written");
    assert_eq!(written.len(), at + 6);

    assert_eq!(core.state().color, Some(0x01_80_FF_FF));
    assert_eq!(core.state().last_change, now);
    assert!(core.device().queue().is_empty());
    // Stale poll replaced by one right after the write
    assert_eq!(core.next_deadline(), Some(now + Duration::from_millis(100)));
}

#[tokio::test(start_paused = true)]
async fn applied_color_is_not_echoed_upstream() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);

    core.on_text(HSV_HALF);
    core.on_timer(TimerEvent::DrainQueue).await;
    assert_eq!(core.state().color, Some(0x01_80_FF_FF));

    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    assert!(core.take_outbox().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rapid_color_commands_collapse() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);

    for hue in [0.1, 0.2, 0.3] {
        core.on_text(&format!(
            r#"{{"message":"actuator","name":"color","value":{{"mode":"hsv","hue":{hue},"saturation":1.0,"value":1.0}}}}"#
        ));
    }
    assert_eq!(core.device().queue().len(), 1);

    core.on_timer(TimerEvent::DrainQueue).await;
    let expected = Color::hsv(0.3, 1.0, 1.0).raw();
    let written = mock.written();
    // One frame: opcode, four payload bytes, CRC
    assert_eq!(written.len(), 6);
    assert_eq!(written[0], COLOR_SET);
    assert_eq!(written[1..5], expected.to_le_bytes());
    assert_eq!(core.state().color, Some(expected));
}

#[tokio::test(start_paused = true)]
async fn telemetry_requires_verified_time() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);

    mock.push_reply(TEMP_AVG, &7750u16.to_le_bytes());
    core.on_timer(TimerEvent::Telemetry).await;
    assert!(core.take_outbox().is_empty());

    core.on_text(&format!(r#"{{"message":"time","timestamp":{}}}"#, now_ms()));
    assert!(core.state().verified_time);

    mock.push_reply(TEMP_AVG, &7750u16.to_le_bytes());
    core.on_timer(TimerEvent::Telemetry).await;
    let outbox = core.take_outbox();
    assert_eq!(outbox.len(), 1);
    let Outbound::SensorLog {
        name,
        value,
        time,
        kind,
        interval,
    } = &outbox[0]
    else {
        panic!("expected sensorLog, got {:?}", outbox[0]);
    };
    assert_eq!(name, "shelf");
    assert_eq!(*value, 22.5);
    assert_eq!(kind, "temperature");
    assert_eq!(*interval, 300);
    assert!((time - now_ms()).abs() < 5_000);

    // A stale clock suspends telemetry again
    core.on_text(r#"{"message":"time","timestamp":0}"#);
    mock.push_reply(TEMP_AVG, &7750u16.to_le_bytes());
    core.on_timer(TimerEvent::Telemetry).await;
    assert!(core.take_outbox().is_empty());
}

#[tokio::test(start_paused = true)]
async fn telemetry_skips_implausible_average() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);
    core.on_text(&format!(r#"{{"message":"time","timestamp":{}}}"#, now_ms()));

    mock.push_reply(TEMP_AVG, &60_000u16.to_le_bytes());
    core.on_timer(TimerEvent::Telemetry).await;
    assert!(core.take_outbox().is_empty());
}

#[tokio::test(start_paused = true)]
async fn poll_backs_off_with_time_since_last_change() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);

    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    let changed_at = core.state().last_change;
    assert_eq!(
        core.timer_deadline(TimerEvent::Poll),
        Some(Instant::now() + Duration::from_millis(100))
    );

    // Unchanged for 10 s: 0.1 + 10 / 5
    tokio::time::advance(Duration::from_secs(10)).await;
    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    assert_eq!(core.state().last_change, changed_at);
    assert_eq!(
        core.timer_deadline(TimerEvent::Poll),
        Some(Instant::now() + Duration::from_millis(2_100))
    );

    // Capped at 5 s
    tokio::time::advance(Duration::from_secs(30)).await;
    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    assert_eq!(
        core.timer_deadline(TimerEvent::Poll),
        Some(Instant::now() + Duration::from_secs(5))
    );
}

#[tokio::test(start_paused = true)]
async fn failed_poll_still_schedules_the_next_one() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);

    push_color(&mock, 0x01_80_FF_FF);
    core.on_timer(TimerEvent::Poll).await;
    tokio::time::advance(Duration::from_secs(10)).await;

    mock.unplug();
    core.on_timer(TimerEvent::Poll).await;
    assert_eq!(core.state().color, None);
    assert_eq!(
        core.timer_deadline(TimerEvent::Poll),
        Some(Instant::now() + Duration::from_millis(2_100))
    );

    // Corrupt replies keep the loop going too
    mock.replug();
    mock.push_corrupt_reply(COLOR_GET, &0u32.to_le_bytes());
    core.on_timer(TimerEvent::Poll).await;
    assert!(core.timer_deadline(TimerEvent::Poll).is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_telemetry_still_schedules_the_next_report() {
    let mock = MockLink::new();
    let mut core = connected_core(&mock);
    core.on_text(&format!(r#"{{"message":"time","timestamp":{}}}"#, now_ms()));
    let interval = Duration::from_secs(300);

    // Implausible average
    mock.push_reply(TEMP_AVG, &60_000u16.to_le_bytes());
    core.on_timer(TimerEvent::Telemetry).await;
    assert!(core.take_outbox().is_empty());
    let next = core
        .timer_deadline(TimerEvent::Telemetry)
        .expect("telemetry rescheduled");
    assert!(next > Instant::now() && next <= Instant::now() + interval);

    // Board unreachable
    mock.unplug();
    core.on_timer(TimerEvent::Telemetry).await;
    assert!(core.take_outbox().is_empty());
    let next = core
        .timer_deadline(TimerEvent::Telemetry)
        .expect("telemetry rescheduled");
    assert!(next > Instant::now() && next <= Instant::now() + interval);

    // Stops for good once the socket is gone
    core.on_disconnected();
    assert_eq!(core.timer_deadline(TimerEvent::Telemetry), None);
    assert!(core.timer_deadline(TimerEvent::Reconnect).is_some());
}

#[tokio::test(start_paused = true)]
async fn backoff_grows_until_a_connect_is_written() {
    let mock = MockLink::new();
    let mut core = SessionCore::new(device(&mock), settings());
    core.start();
    core.take_actions();

    for expected in [1u64, 2, 4, 8, 16] {
        core.on_disconnected();
        let deadline = Instant::now() + Duration::from_secs(expected);
        // Reconnect is the latest timer; run everything up to it
        tokio::time::advance(Duration::from_secs(expected) - Duration::from_millis(1)).await;
        core.run_due(Instant::now()).await;
        assert!(core.take_actions().is_empty(), "too early for {expected}s");
        tokio::time::advance(Duration::from_millis(1)).await;
        core.run_due(deadline).await;
        assert_eq!(core.take_actions(), vec![session::Action::Connect]);
    }

    core.on_connected();
    core.on_connect_sent();
    assert_eq!(core.state().attempt, 0);
    core.on_disconnected();
    assert_eq!(core.state().attempt, 1);
}

#[tokio::test]
async fn runner_authenticates_and_stops_on_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (done_tx, mut done_rx) = mpsc::channel::<()>(1);
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut received = Vec::new();
        while received.len() < 2 {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    received.push(serde_json::from_str::<Value>(&text).unwrap())
                }
                Some(Ok(_)) => {}
                other => panic!("connection ended early: {other:?}"),
            }
        }
        ws.send(Message::Text(format!(
            r#"{{"message":"time","timestamp":{}}}"#,
            now_ms()
        )))
        .await
        .unwrap();
        // Hold the socket open until the client is told to stop
        let _ = done_rx.recv().await;
        received
    });

    // Board never answers: polls see it offline
    let mock = MockLink::new();
    let core = SessionCore::new(device(&mock), settings());
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let runner = tokio::spawn(session::run(core, format!("ws://{addr}"), shutdown_rx));

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown_tx.send(()).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("runner stops")
        .unwrap();
    assert!(result.is_ok());

    done_tx.send(()).await.unwrap();
    let received = server.await.unwrap();
    assert_eq!(
        received[0],
        json!({"message": "connect", "name": "lamp", "serial": "CB-1", "passphrase": "pw"})
    );
    assert_eq!(
        received[1],
        json!({"message": "actuator", "name": "color", "value": null})
    );
    // Polling ran against the board
    assert!(mock.written().contains(&COLOR_GET));
}
