//! Test data builders for device output

/// Builder for raw `InstantaneousDemand` fragments as the device prints them
pub struct DemandBuilder {
    timestamp: u64,
    demand: u64,
    multiplier: u64,
    device_mac_id: String,
    meter_mac_id: String,
}

impl DemandBuilder {
    pub fn new(demand: u64) -> Self {
        Self {
            timestamp: 0x1c8a_2b3f,
            demand,
            multiplier: 1,
            device_mac_id: "0xd8d5b9000000014b".to_string(),
            meter_mac_id: "0x000781000028c07d".to_string(),
        }
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn multiplier(mut self, multiplier: u64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// One element per line, the way the EMU-2 writes it.
    pub fn lines(&self) -> Vec<String> {
        vec![
            "<InstantaneousDemand>".to_string(),
            format!("  <DeviceMacId>{}</DeviceMacId>", self.device_mac_id),
            format!("  <MeterMacId>{}</MeterMacId>", self.meter_mac_id),
            format!("  <TimeStamp>{:#x}</TimeStamp>", self.timestamp),
            format!("  <Demand>{:#08x}</Demand>", self.demand),
            format!("  <Multiplier>{:#010x}</Multiplier>", self.multiplier),
            "  <Divisor>0x000003e8</Divisor>".to_string(),
            "</InstantaneousDemand>".to_string(),
        ]
    }

    pub fn build(&self) -> String {
        self.lines().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demand_builder() {
        let lines = DemandBuilder::new(0x4b0).multiplier(2).lines();
        assert_eq!(lines.first().map(String::as_str), Some("<InstantaneousDemand>"));
        assert!(lines.iter().any(|l| l.contains("<Demand>0x0004b0</Demand>")));
        assert!(lines.iter().any(|l| l.contains("<Multiplier>0x00000002</Multiplier>")));
    }
}
