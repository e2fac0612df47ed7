//! High-level interface for the colorbridge light/sensor board
//!
//! This crate turns the frame-level [`Bus`] into typed operations: register
//! reads with retry, temperature probing with fault filtering, the packed
//! color word, and a coalescing write queue.

pub mod color;
pub mod error;
pub mod minifloat;
pub mod queue;
pub mod registry;
pub mod temperature;

pub use color::{Color, ColorFields, ColorMode};
pub use error::DeviceError;
pub use queue::{CommandQueue, PendingCommand, DRAIN_INTERVAL};
pub use registry::{describe, Parameter};
pub use temperature::calc_temperature;

use std::time::Duration;

use colorbridge_transport::protocol::{pack_le, unpack_le};
use colorbridge_transport::{Bus, TransportError};
use tracing::{debug, warn};

/// Pause between two attempts of a failed read
pub const RETRY_BACKOFF: Duration = Duration::from_millis(110);

/// Default number of tries for a single register read
pub const DEFAULT_TRIES: usize = 3;

/// Outcome of a read: the value if one could be trusted, and whether the
/// board answered at all
///
/// `value == None && online` means the board responded but every frame was
/// corrupt; `!online` means it could not be reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading<T> {
    pub value: Option<T>,
    pub online: bool,
}

impl<T> Reading<T> {
    pub fn online(value: T) -> Self {
        Self {
            value: Some(value),
            online: true,
        }
    }

    pub fn no_data() -> Self {
        Self {
            value: None,
            online: true,
        }
    }

    pub fn offline() -> Self {
        Self {
            value: None,
            online: false,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        Reading {
            value: self.value.map(f),
            online: self.online,
        }
    }

    /// Convert into a result, for callers that only care about the value
    pub fn into_result(self) -> Result<T, DeviceError> {
        match (self.value, self.online) {
            (Some(v), _) => Ok(v),
            (None, true) => Err(DeviceError::NoData),
            (None, false) => Err(DeviceError::Offline),
        }
    }
}

/// Result of one drain tick
#[derive(Debug)]
pub struct DrainTick<T> {
    /// Register taken off the queue this tick, if any
    pub sent: Option<&'static str>,
    /// Completion of the command, present only if its write succeeded
    pub completed: Option<T>,
    /// Whether another tick must be scheduled
    pub more: bool,
}

/// Typed board interface
///
/// `T` is the completion value attached to queued writes.
pub struct Device<T = ()> {
    bus: Bus,
    queue: CommandQueue<T>,
}

impl<T> Device<T> {
    /// Create a device on top of a bus
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            queue: CommandQueue::new(),
        }
    }

    /// Description of the underlying link
    pub fn describe(&self) -> String {
        self.bus.describe()
    }

    /// Pending writes
    pub fn queue(&self) -> &CommandQueue<T> {
        &self.queue
    }

    // === Reads ===

    /// Read a register, retrying checksum failures up to `tries` times
    pub async fn read_value(&mut self, name: &str, tries: usize) -> Result<Reading<u32>, DeviceError> {
        let param = registry::describe(name)?;

        for attempt in 0..tries {
            if attempt > 0 {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            match self
                .bus
                .read_frame(param.getter(), param.width.bytes())
                .await
            {
                Ok(payload) => return Ok(Reading::online(unpack_le(&payload))),
                Err(TransportError::Link(e)) => {
                    debug!("Read {} failed, board unreachable: {}", name, e);
                    return Ok(Reading::offline());
                }
                Err(e) => {
                    debug!("Read {} attempt {}/{} failed: {}", name, attempt + 1, tries, e);
                }
            }
        }

        Ok(Reading::no_data())
    }

    /// Instantaneous temperature: median of [`temperature::PROBE_COUNT`] probes
    ///
    /// The whole read is dropped if any probe is implausible or if more than
    /// [`temperature::MAX_PROBE_ATTEMPTS`] attempts were needed.
    pub async fn read_temperature_now(&mut self) -> Result<Reading<f64>, DeviceError> {
        let mut probes = Vec::with_capacity(temperature::PROBE_COUNT);
        let mut attempts = 0;

        while probes.len() < temperature::PROBE_COUNT {
            if attempts >= temperature::MAX_PROBE_ATTEMPTS {
                warn!(
                    "Temperature read abandoned after {} attempts ({} good probes)",
                    attempts,
                    probes.len()
                );
                return Ok(Reading::no_data());
            }
            attempts += 1;

            let reading = self.read_value("temp", 1).await?;
            if !reading.online {
                return Ok(Reading::offline());
            }
            let Some(raw) = reading.value else {
                continue;
            };
            match calc_temperature(raw) {
                Some(celsius) => probes.push(celsius),
                None => {
                    warn!("Temperature probe out of range (raw {}), discarding read", raw);
                    return Ok(Reading::no_data());
                }
            }
        }

        Ok(match temperature::median(&probes) {
            Some(celsius) => Reading::online(celsius),
            None => Reading::no_data(),
        })
    }

    /// Raw probes as an instantaneous read would see them, unfiltered
    pub async fn read_temperature_probes(&mut self) -> Result<Reading<Vec<u32>>, DeviceError> {
        let mut probes = Vec::with_capacity(temperature::PROBE_COUNT);
        for _ in 0..temperature::MAX_PROBE_ATTEMPTS {
            if probes.len() >= temperature::PROBE_COUNT {
                break;
            }
            let reading = self.read_value("temp", 1).await?;
            if !reading.online {
                return Ok(Reading::offline());
            }
            probes.extend(reading.value);
        }
        Ok(Reading::online(probes))
    }

    /// Firmware-side rolling average temperature
    pub async fn read_temperature_avg(&mut self) -> Result<Reading<f64>, DeviceError> {
        let reading = self.read_value("tempavg", DEFAULT_TRIES).await?;
        Ok(Reading {
            value: reading.value.and_then(calc_temperature),
            online: reading.online,
        })
    }

    /// Current color register
    pub async fn read_color(&mut self, tries: usize) -> Result<Reading<Color>, DeviceError> {
        Ok(self.read_value("color", tries).await?.map(Color::from_raw))
    }

    // === Writes ===

    async fn write_raw(&mut self, param: &Parameter, raw: u32) -> Result<(), DeviceError> {
        debug!("Write {} = {} (0x{:X})", param.name, raw, raw);
        self.bus
            .write_checked(param.setter(), &pack_le(raw, param.width))
            .await?;
        Ok(())
    }

    /// Write a register immediately, bypassing the queue
    pub async fn send_command(&mut self, name: &str, value: f64, scaled: bool) -> Result<(), DeviceError> {
        let param = registry::describe(name)?;
        let raw = param.raw_value(value, scaled)?;
        self.write_raw(param, raw).await
    }

    /// Write a color immediately
    pub async fn write_color(&mut self, color: Color) -> Result<(), DeviceError> {
        let param = registry::describe("color")?;
        self.write_raw(param, color.raw()).await
    }

    /// Queue a register write
    ///
    /// Returns `true` when the drain loop was idle and the caller must
    /// schedule a [`Device::drain_tick`].
    pub fn enqueue(
        &mut self,
        name: &str,
        value: f64,
        scaled: bool,
        completion: Option<T>,
    ) -> Result<bool, DeviceError> {
        let param = registry::describe(name)?;
        let raw = param.raw_value(value, scaled)?;
        Ok(self.queue.enqueue(param.name, raw, completion))
    }

    /// Queue a color write
    pub fn enqueue_color(&mut self, color: Color, completion: Option<T>) -> bool {
        self.queue.enqueue("color", color.raw(), completion)
    }

    /// Send one queued write
    ///
    /// A failed write is logged and dropped; its completion is discarded.
    pub async fn drain_tick(&mut self) -> DrainTick<T> {
        let Some(command) = self.queue.take_next() else {
            return DrainTick {
                sent: None,
                completed: None,
                more: false,
            };
        };

        let completed = match registry::describe(command.name) {
            Ok(param) => match self.write_raw(param, command.raw).await {
                Ok(()) => command.completion,
                Err(e) => {
                    warn!("Queued write of {} lost: {}", command.name, e);
                    None
                }
            },
            Err(e) => {
                warn!("Queued write of {} lost: {}", command.name, e);
                None
            }
        };

        DrainTick {
            sent: Some(command.name),
            completed,
            more: self.queue.wants_tick(),
        }
    }

    /// Reset the board's frame parser
    pub async fn resync(&mut self) -> Result<(), DeviceError> {
        self.bus.resync().await?;
        Ok(())
    }
}
