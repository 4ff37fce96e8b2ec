//! Typed EMU-2 records.
//!
//! A decoded [`Fragment`] is turned into one [`Record`] variant by looking its
//! root name up in a static handler table. Names without a handler, and known
//! names whose required fields are missing or malformed, become
//! [`Record::Unrecognized`] so the pipeline keeps moving.

pub mod fragment;

pub use fragment::{parse_number, Fragment};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Periodic power demand report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantaneousDemand {
    pub timestamp: u64,
    pub demand: u64,
    pub multiplier: u64,
    pub divisor: Option<u64>,
    pub device_mac_id: String,
    pub meter_mac_id: String,
}

impl InstantaneousDemand {
    /// Demand scaled by the multiplier, in the meter's base unit.
    pub fn value(&self) -> u64 {
        self.demand.saturating_mul(self.multiplier)
    }
}

/// Cumulative energy counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSummation {
    pub timestamp: u64,
    pub delivered: u64,
    pub received: u64,
    pub multiplier: u64,
    pub device_mac_id: String,
    pub meter_mac_id: String,
}

impl CurrentSummation {
    // Meters report a multiplier of 0 when none is configured.
    fn effective_multiplier(&self) -> u64 {
        self.multiplier.max(1)
    }

    pub fn delivered_value(&self) -> u64 {
        self.delivered.saturating_mul(self.effective_multiplier())
    }

    pub fn received_value(&self) -> u64 {
        self.received.saturating_mul(self.effective_multiplier())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCluster {
    pub utc_time: u64,
    pub local_time: u64,
    pub device_mac_id: String,
    pub meter_mac_id: String,
}

/// Network link status. Every field is optional on the wire; the record is
/// stamped with the device time at which it was decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub stamped_at: u64,
    pub link_strength: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub status_code: Option<String>,
    pub ext_pan_id: Option<String>,
    pub channel: Option<String>,
    pub short_addr: Option<String>,
    pub device_mac_id: Option<String>,
    pub meter_mac_id: Option<String>,
}

/// One decoded fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Record {
    InstantaneousDemand(InstantaneousDemand),
    CurrentSummationDelivered(CurrentSummation),
    TimeCluster(TimeCluster),
    ConnectionStatus(ConnectionStatus),
    Unrecognized { tag: String },
}

type Handler = fn(&Fragment, u64) -> Result<Record>;

/// Root element name to handler.
const HANDLERS: &[(&str, Handler)] = &[
    ("InstantaneousDemand", instantaneous_demand as Handler),
    ("CurrentSummationDelivered", current_summation as Handler),
    ("TimeCluster", time_cluster as Handler),
    ("ConnectionStatus", connection_status as Handler),
];

impl Record {
    /// Decode using the current device time for records that need stamping.
    pub fn from_fragment(fragment: &Fragment) -> Record {
        Self::decode(fragment, crate::time::device_seconds_now())
    }

    /// Decode with an explicit "now" in device seconds.
    pub fn decode(fragment: &Fragment, now: u64) -> Record {
        let tag = fragment.tag();
        let Some((_, handler)) = HANDLERS.iter().find(|(name, _)| *name == tag) else {
            return Record::Unrecognized {
                tag: tag.to_string(),
            };
        };
        match handler(fragment, now) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Treating {} as unrecognized: {}", tag, e);
                Record::Unrecognized {
                    tag: tag.to_string(),
                }
            }
        }
    }

    /// Root element name this record came from.
    pub fn tag(&self) -> &str {
        match self {
            Record::InstantaneousDemand(_) => "InstantaneousDemand",
            Record::CurrentSummationDelivered(_) => "CurrentSummationDelivered",
            Record::TimeCluster(_) => "TimeCluster",
            Record::ConnectionStatus(_) => "ConnectionStatus",
            Record::Unrecognized { tag } => tag,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Record::Unrecognized { .. })
    }

    /// Names with a dedicated decoder.
    pub fn known_tags() -> impl Iterator<Item = &'static str> {
        HANDLERS.iter().map(|(name, _)| *name)
    }
}

fn instantaneous_demand(f: &Fragment, _now: u64) -> Result<Record> {
    Ok(Record::InstantaneousDemand(InstantaneousDemand {
        timestamp: f.number("TimeStamp")?,
        demand: f.number("Demand")?,
        multiplier: f.number_opt("Multiplier").unwrap_or(1),
        divisor: f.number_opt("Divisor"),
        device_mac_id: f.text("DeviceMacId")?,
        meter_mac_id: f.text("MeterMacId")?,
    }))
}

fn current_summation(f: &Fragment, _now: u64) -> Result<Record> {
    Ok(Record::CurrentSummationDelivered(CurrentSummation {
        timestamp: f.number("TimeStamp")?,
        delivered: f.number("SummationDelivered")?,
        received: f.number("SummationReceived")?,
        multiplier: f.number_opt("Multiplier").unwrap_or(1),
        device_mac_id: f.text("DeviceMacId")?,
        meter_mac_id: f.text("MeterMacId")?,
    }))
}

fn time_cluster(f: &Fragment, _now: u64) -> Result<Record> {
    Ok(Record::TimeCluster(TimeCluster {
        utc_time: f.number("UTCTime")?,
        local_time: f.number("LocalTime")?,
        device_mac_id: f.text("DeviceMacId")?,
        meter_mac_id: f.text("MeterMacId")?,
    }))
}

fn connection_status(f: &Fragment, now: u64) -> Result<Record> {
    let opt = |name: &str| f.field(name).map(str::to_string);
    Ok(Record::ConnectionStatus(ConnectionStatus {
        stamped_at: now,
        link_strength: opt("LinkStrength"),
        status: opt("Status"),
        description: opt("Description"),
        status_code: opt("StatusCode"),
        ext_pan_id: opt("ExtPanId"),
        channel: opt("Channel"),
        short_addr: opt("ShortAddr"),
        device_mac_id: opt("DeviceMacId"),
        meter_mac_id: opt("MeterMacId"),
    }))
}
