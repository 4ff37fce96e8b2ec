//! CsvFormatter node - one `", "`-separated line per record.
//!
//! Line layouts:
//!
//! ```text
//! <timestamp>, InstantaneousDemand, <demand>, <device_mac>, <meter_mac>
//! <timestamp>, CurrentSummationDelivered, <delivered>, <received>, <device_mac>, <meter_mac>
//! <utc_time>, TimeCluster, <local_time>, <device_mac>, <meter_mac>
//! <now>, ConnectionStatus, <link_strength>, <status>, <description>, <status_code>,
//!        <ext_pan_id>, <channel>, <short_addr>, <device_mac>, <meter_mac>
//! <tag>, (unrecognized)
//! ```
//!
//! Times are device seconds in decimal; values are already scaled by their
//! multiplier.

use crate::error::Result;
use crate::pipeline::broadcast::{Broadcaster, Listener, Producer};
use crate::record::Record;

/// Render one record as a CSV line.
pub fn csv_line(record: &Record) -> String {
    match record {
        Record::InstantaneousDemand(d) => format!(
            "{}, {}, {}, {}, {}",
            d.timestamp,
            record.tag(),
            d.value(),
            d.device_mac_id,
            d.meter_mac_id
        ),
        Record::CurrentSummationDelivered(s) => format!(
            "{}, {}, {}, {}, {}, {}",
            s.timestamp,
            record.tag(),
            s.delivered_value(),
            s.received_value(),
            s.device_mac_id,
            s.meter_mac_id
        ),
        Record::TimeCluster(t) => format!(
            "{}, {}, {}, {}, {}",
            t.utc_time,
            record.tag(),
            t.local_time,
            t.device_mac_id,
            t.meter_mac_id
        ),
        Record::ConnectionStatus(c) => {
            let fields = [
                &c.link_strength,
                &c.status,
                &c.description,
                &c.status_code,
                &c.ext_pan_id,
                &c.channel,
                &c.short_addr,
                &c.device_mac_id,
                &c.meter_mac_id,
            ];
            let mut line = format!("{}, {}", c.stamped_at, record.tag());
            for field in fields {
                line.push_str(", ");
                line.push_str(field.as_deref().unwrap_or(""));
            }
            line
        }
        Record::Unrecognized { tag } => format!("{}, (unrecognized)", tag),
    }
}

/// Formats records as CSV lines and broadcasts them.
#[derive(Default)]
pub struct CsvFormatter {
    output: Broadcaster<String>,
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Listener<Record> for CsvFormatter {
    fn receive(&mut self, record: &Record) -> Result<()> {
        self.output.broadcast(&csv_line(record))
    }

    fn name(&self) -> &str {
        "CsvFormatter"
    }
}

impl Producer<String> for CsvFormatter {
    fn output(&self) -> &Broadcaster<String> {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ConnectionStatus, CurrentSummation, InstantaneousDemand, TimeCluster};

    #[test]
    fn test_demand_line() {
        let record = Record::InstantaneousDemand(InstantaneousDemand {
            timestamp: 100,
            demand: 7,
            multiplier: 2,
            divisor: Some(1000),
            device_mac_id: "0xd8".into(),
            meter_mac_id: "0x07".into(),
        });
        assert_eq!(csv_line(&record), "100, InstantaneousDemand, 14, 0xd8, 0x07");
    }

    #[test]
    fn test_summation_line() {
        let record = Record::CurrentSummationDelivered(CurrentSummation {
            timestamp: 5,
            delivered: 10,
            received: 1,
            multiplier: 0,
            device_mac_id: "d".into(),
            meter_mac_id: "m".into(),
        });
        assert_eq!(
            csv_line(&record),
            "5, CurrentSummationDelivered, 10, 1, d, m"
        );
    }

    #[test]
    fn test_time_cluster_line() {
        let record = Record::TimeCluster(TimeCluster {
            utc_time: 1,
            local_time: 2,
            device_mac_id: "d".into(),
            meter_mac_id: "m".into(),
        });
        assert_eq!(csv_line(&record), "1, TimeCluster, 2, d, m");
    }

    #[test]
    fn test_connection_status_line_with_gaps() {
        let record = Record::ConnectionStatus(ConnectionStatus {
            stamped_at: 9,
            status: Some("Connected".into()),
            channel: Some("0x14".into()),
            ..ConnectionStatus::default()
        });
        assert_eq!(
            csv_line(&record),
            "9, ConnectionStatus, , Connected, , , , 0x14, , , "
        );
    }

    #[test]
    fn test_unrecognized_line() {
        let record = Record::Unrecognized {
            tag: "PriceCluster".into(),
        };
        assert_eq!(csv_line(&record), "PriceCluster, (unrecognized)");
    }
}
