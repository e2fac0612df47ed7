//! Session logic, independent of the WebSocket
//!
//! `SessionCore` owns the device, the session state and every timer. The
//! runner feeds it socket events and due timers; the core answers with
//! messages in its outbox and connect/close requests in its action queue.
//! Nothing here touches the network.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

use colorbridge_device::{Color, Device, DeviceError, DRAIN_INTERVAL};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::scheduler::{Scheduler, TimerHandle};
use super::state::{
    backoff_delay, check_time, next_grid_delay, poll_interval, unix_millis, ConnectionState,
    SessionState,
};
use crate::config::Config;
use crate::message::{self, Inbound, Outbound, COLOR_ACTUATOR};

/// `type` reported with temperature samples
pub const TEMPERATURE_KIND: &str = "temperature";

/// Timer kinds owned by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Send one queued board write
    DrainQueue,
    /// Read the color register
    Poll,
    /// Report the average temperature
    Telemetry,
    /// Open a new upstream connection
    Reconnect,
}

/// Follow-up attached to a queued board write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// This color word is now on the board
    ColorApplied(u32),
}

/// Request from the core to the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start connecting upstream
    Connect,
    /// Close the upstream socket
    Close,
}

/// Identity and telemetry settings for one session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub name: String,
    pub serial: String,
    pub passphrase: String,
    pub telemetry_interval: Duration,
    pub sensor_name: String,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            name: config.upstream.name.clone(),
            serial: config.upstream.serial.clone(),
            passphrase: config.upstream.passphrase.clone(),
            telemetry_interval: config.telemetry.interval(),
            sensor_name: config.telemetry.sensor_name.clone(),
        }
    }
}

/// Session state machine
pub struct SessionCore {
    device: Device<Completion>,
    settings: SessionSettings,
    state: SessionState,
    timers: Scheduler<TimerEvent>,
    poll_timer: Option<TimerHandle>,
    telemetry_timer: Option<TimerHandle>,
    reconnect_timer: Option<TimerHandle>,
    outbox: VecDeque<Outbound>,
    actions: VecDeque<Action>,
}

impl SessionCore {
    pub fn new(device: Device<Completion>, settings: SessionSettings) -> Self {
        Self {
            device,
            settings,
            state: SessionState::new(),
            timers: Scheduler::new(),
            poll_timer: None,
            telemetry_timer: None,
            reconnect_timer: None,
            outbox: VecDeque::new(),
            actions: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn device(&self) -> &Device<Completion> {
        &self.device
    }

    /// Start polling and request the first connection
    pub fn start(&mut self) {
        info!("Session starting on {}", self.device.describe());
        self.schedule_poll(Duration::ZERO);
        self.begin_connect();
    }

    // === Runner interface ===

    /// Messages waiting to be sent upstream
    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        self.outbox.drain(..).collect()
    }

    /// Pending connect/close requests
    pub fn take_actions(&mut self) -> Vec<Action> {
        self.actions.drain(..).collect()
    }

    /// When the next timer is due
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// When the tracked timer for `event` fires next
    ///
    /// Queue drains are not tracked and always report `None`.
    pub fn timer_deadline(&self, event: TimerEvent) -> Option<Instant> {
        let handle = match event {
            TimerEvent::Poll => self.poll_timer,
            TimerEvent::Telemetry => self.telemetry_timer,
            TimerEvent::Reconnect => self.reconnect_timer,
            TimerEvent::DrainQueue => None,
        }?;
        self.timers.deadline(handle)
    }

    /// Run every timer due at `now`
    pub async fn run_due(&mut self, now: Instant) {
        while let Some(event) = self.timers.pop_due(now) {
            self.on_timer(event).await;
        }
    }

    // === Connection lifecycle ===

    fn begin_connect(&mut self) {
        if self.state.is_shutting_down() {
            return;
        }
        self.state.connection = ConnectionState::Connecting;
        self.actions.push_back(Action::Connect);
    }

    /// The socket is open: authenticate, report color, start telemetry
    pub fn on_connected(&mut self) {
        info!("Upstream connected");
        self.state.connection = ConnectionState::Connected;
        self.outbox.push_back(Outbound::Connect {
            name: self.settings.name.clone(),
            serial: self.settings.serial.clone(),
            passphrase: self.settings.passphrase.clone(),
        });
        self.outbox
            .push_back(Outbound::color(self.state.color.map(Color::from_raw)));
        self.schedule_telemetry();
    }

    /// The `connect` message made it onto the socket
    pub fn on_connect_sent(&mut self) {
        if self.state.attempt > 0 {
            debug!("Reconnected after {} failed attempts", self.state.attempt);
        }
        self.state.attempt = 0;
    }

    /// The socket closed, failed, or never opened
    pub fn on_disconnected(&mut self) {
        if self.state.is_shutting_down() {
            return;
        }
        self.state.connection = ConnectionState::Disconnected;
        self.outbox.clear();
        self.cancel_timer(TimerSlot::Telemetry);
        self.cancel_timer(TimerSlot::Reconnect);

        self.state.attempt = self.state.attempt.saturating_add(1);
        let delay = backoff_delay(self.state.attempt);
        warn!(
            "Upstream disconnected, reconnect attempt {} in {:?}",
            self.state.attempt, delay
        );
        self.reconnect_timer = Some(self.timers.schedule_in(delay, TimerEvent::Reconnect));
    }

    /// Stop reconnecting and close the socket; polling is left alone
    pub fn shutdown(&mut self) {
        if self.state.is_shutting_down() {
            return;
        }
        info!("Session shutting down");
        self.state.connection = ConnectionState::ShuttingDown;
        self.cancel_timer(TimerSlot::Telemetry);
        self.cancel_timer(TimerSlot::Reconnect);
        self.actions.push_back(Action::Close);
    }

    // === Inbound messages ===

    /// Handle one text frame from upstream
    pub fn on_text(&mut self, text: &str) {
        match Inbound::parse(text) {
            Ok(Inbound::Time { timestamp }) => self.on_server_time(timestamp),
            Ok(Inbound::Actuator { name, value }) if name == COLOR_ACTUATOR => {
                match message::parse_color(&value) {
                    Ok(color) => self.apply_color(color),
                    Err(e) => warn!("Dropping color command: {}", e),
                }
            }
            Ok(Inbound::Actuator { name, .. }) => debug!("Ignoring actuator {:?}", name),
            Ok(Inbound::Unknown(kind)) => debug!("Ignoring upstream message {:?}", kind),
            Err(e) => warn!("Dropping upstream message: {}", e),
        }
    }

    fn on_server_time(&mut self, server_ms: i64) {
        match check_time(server_ms, unix_millis(SystemTime::now())) {
            Ok(()) => {
                if !self.state.verified_time {
                    info!("Server time verified");
                }
                self.state.verified_time = true;
            }
            Err(e) => {
                warn!("{}, telemetry suspended", e);
                self.state.verified_time = false;
            }
        }
    }

    /// Queue a color for the board
    pub fn apply_color(&mut self, color: Color) {
        debug!("Color command: {}", color);
        let completion = Completion::ColorApplied(color.raw());
        if self.device.enqueue_color(color, Some(completion)) {
            self.timers.schedule_in(DRAIN_INTERVAL, TimerEvent::DrainQueue);
        }
    }

    // === Timers ===

    /// Handle one timer event
    pub async fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::DrainQueue => {
                let tick = self.device.drain_tick().await;
                if let Some(completion) = tick.completed {
                    self.complete(completion);
                }
                if tick.more {
                    self.timers.schedule_in(DRAIN_INTERVAL, TimerEvent::DrainQueue);
                }
            }
            TimerEvent::Poll => {
                self.cancel_timer(TimerSlot::Poll);
                if let Err(e) = self.poll_color().await {
                    warn!("Color poll failed: {}", e);
                }
                let since_change = Instant::now().saturating_duration_since(self.state.last_change);
                self.schedule_poll(poll_interval(since_change));
            }
            TimerEvent::Telemetry => {
                self.cancel_timer(TimerSlot::Telemetry);
                if let Err(e) = self.report_temperature().await {
                    warn!("Telemetry skipped: {}", e);
                }
                if self.state.is_connected() {
                    self.schedule_telemetry();
                }
            }
            TimerEvent::Reconnect => {
                self.cancel_timer(TimerSlot::Reconnect);
                self.begin_connect();
            }
        }
    }

    fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::ColorApplied(raw) => {
                debug!("Color 0x{:08X} applied", raw);
                self.state.color = Some(raw);
                self.state.last_change = Instant::now();
                // Look again soon in case the board adjusted it
                self.cancel_timer(TimerSlot::Poll);
                self.schedule_poll(poll_interval(Duration::ZERO));
            }
        }
    }

    async fn poll_color(&mut self) -> Result<(), DeviceError> {
        let reading = self.device.read_color(1).await?;
        if !reading.online {
            if self.state.color.take().is_some() {
                warn!("Board offline, color unknown");
            }
            return Ok(());
        }
        let Some(color) = reading.value else {
            return Ok(());
        };

        let raw = color.raw();
        if self.state.color != Some(raw) {
            debug!("Board color is now {}", color);
            self.state.color = Some(raw);
            self.state.last_change = Instant::now();
            if self.state.is_connected() {
                self.outbox.push_back(Outbound::color(Some(color)));
            }
        }
        Ok(())
    }

    async fn report_temperature(&mut self) -> Result<(), DeviceError> {
        let celsius = self.device.read_temperature_avg().await?.into_result()?;
        if !self.state.verified_time {
            info!("Server time not verified, not reporting {:.2} °C", celsius);
            return Ok(());
        }
        self.outbox.push_back(Outbound::SensorLog {
            name: self.settings.sensor_name.clone(),
            value: celsius,
            time: unix_millis(SystemTime::now()),
            kind: TEMPERATURE_KIND.to_string(),
            interval: self.settings.telemetry_interval.as_secs(),
        });
        Ok(())
    }

    fn schedule_poll(&mut self, delay: Duration) {
        self.poll_timer = Some(self.timers.schedule_in(delay, TimerEvent::Poll));
    }

    fn schedule_telemetry(&mut self) {
        self.cancel_timer(TimerSlot::Telemetry);
        let delay = next_grid_delay(SystemTime::now(), self.settings.telemetry_interval);
        debug!("Next telemetry in {:?}", delay);
        self.telemetry_timer = Some(self.timers.schedule_in(delay, TimerEvent::Telemetry));
    }

    fn cancel_timer(&mut self, slot: TimerSlot) {
        let handle = match slot {
            TimerSlot::Poll => self.poll_timer.take(),
            TimerSlot::Telemetry => self.telemetry_timer.take(),
            TimerSlot::Reconnect => self.reconnect_timer.take(),
        };
        if let Some(handle) = handle {
            self.timers.cancel(handle);
        }
    }
}

#[derive(Clone, Copy)]
enum TimerSlot {
    Poll,
    Telemetry,
    Reconnect,
}
