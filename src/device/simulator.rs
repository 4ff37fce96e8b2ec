//! Simulated EMU-2.
//!
//! Behaves like the serial device without the hardware: every read yields one
//! multi-line `InstantaneousDemand` fragment stamped with the current device
//! time and a pseudo-random demand below 200. Reads are paced so consecutive
//! fragments are at least `interval` apart.

use super::{Connector, DeviceWriter, LineDevice, LoggingWriter, ReadOutcome};
use crate::error::Result;
use crate::time;
use std::time::{Duration, Instant};

pub const DEFAULT_DEVICE_MAC_ID: &str = "0xd8d5b9000000014b";
pub const DEFAULT_METER_MAC_ID: &str = "0x000781000028c07d";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(4);

/// Upper bound (exclusive) of simulated demand values
const MAX_DEMAND: u64 = 200;

/// Settings shared by every simulator instance a connector opens.
#[derive(Debug, Clone)]
pub struct SimulatorConnector {
    interval: Duration,
    device_mac_id: String,
    meter_mac_id: String,
    seed: u64,
}

impl SimulatorConnector {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn with_mac_ids(mut self, device: impl Into<String>, meter: impl Into<String>) -> Self {
        self.device_mac_id = device.into();
        self.meter_mac_id = meter.into();
        self
    }

    /// Fix the demand sequence (tests).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed.max(1);
        self
    }
}

impl Default for SimulatorConnector {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            device_mac_id: DEFAULT_DEVICE_MAC_ID.to_string(),
            meter_mac_id: DEFAULT_METER_MAC_ID.to_string(),
            seed: 12345,
        }
    }
}

impl Connector for SimulatorConnector {
    type Device = SimulatorDevice;

    fn open(&self) -> Result<SimulatorDevice> {
        tracing::info!("Starting simulated EMU-2 (interval {:?})", self.interval);
        Ok(SimulatorDevice {
            settings: self.clone(),
            rng: XorShift(self.seed),
            last_emit: None,
            emitted: 0,
        })
    }

    fn name(&self) -> String {
        "simulator".to_string()
    }
}

/// One running simulated device.
pub struct SimulatorDevice {
    settings: SimulatorConnector,
    rng: XorShift,
    last_emit: Option<Instant>,
    emitted: u64,
}

impl SimulatorDevice {
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn pace(&self) {
        if let Some(last) = self.last_emit {
            let elapsed = last.elapsed();
            if elapsed < self.settings.interval {
                std::thread::sleep(self.settings.interval - elapsed);
            }
        }
    }

    fn fragment(&mut self) -> String {
        let demand = self.rng.next() % MAX_DEMAND;
        format!(
            "<InstantaneousDemand>\n\
             \x20 <DeviceMacId>{}</DeviceMacId>\n\
             \x20 <MeterMacId>{}</MeterMacId>\n\
             \x20 <TimeStamp>{}</TimeStamp>\n\
             \x20 <Demand>{:#x}</Demand>\n\
             \x20 <Multiplier>0x00000001</Multiplier>\n\
             \x20 <Divisor>0x000003e8</Divisor>\n\
             \x20 <DigitsRight>0x03</DigitsRight>\n\
             \x20 <DigitsLeft>0x06</DigitsLeft>\n\
             \x20 <SuppressLeadingZero>Y</SuppressLeadingZero>\n\
             </InstantaneousDemand>\n",
            self.settings.device_mac_id,
            self.settings.meter_mac_id,
            time::device_hex_now(),
            demand,
        )
    }
}

impl LineDevice for SimulatorDevice {
    fn read(&mut self) -> Result<ReadOutcome> {
        self.pace();
        let fragment = self.fragment();
        self.last_emit = Some(Instant::now());
        self.emitted += 1;
        Ok(ReadOutcome::Line(fragment))
    }

    fn writer(&mut self) -> Result<Option<Box<dyn DeviceWriter>>> {
        Ok(Some(Box::new(LoggingWriter::new("simulator"))))
    }

    fn close(&mut self) {
        tracing::info!("Simulated EMU-2 stopped after {} fragments", self.emitted);
    }

    fn describe(&self) -> String {
        "simulator".to_string()
    }
}

/// Small xorshift generator; statistical quality is irrelevant here.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}
