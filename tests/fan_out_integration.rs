//! Fan-out and fan-in topologies built from shared stages

mod common;

use common::builders::DemandBuilder;
use common::mock_helpers::{channel_sink, drain, TagDemandFormatter};
use common::temp_capture;
use emu_telemetry::device::FileConnector;
use emu_telemetry::pipeline::nodes::{csv_line, ChannelSink, FragmentDecoder};
use emu_telemetry::pipeline::{lock, shared, Coalescer, ExitReason, Pipe};
use emu_telemetry::record::Record;
use emu_telemetry::Source;

#[test]
fn test_one_source_feeds_independent_chains() {
    let capture = DemandBuilder::new(5).lines();
    let file = temp_capture(&(capture.join("\n") + "\n"));

    let (raw_sink, raw_rx) = channel_sink::<String>();
    let (record_sink, record_rx) = channel_sink::<Record>();
    let (line_sink, line_rx) = channel_sink::<String>();

    let source = shared(Source::new(FileConnector::new(file.path())));
    source.pipe(shared(raw_sink));
    let records = source
        .pipe(shared(Coalescer::new()))
        .pipe(shared(FragmentDecoder::new()));
    records.pipe(shared(record_sink));
    records
        .pipe(shared(TagDemandFormatter::default()))
        .pipe(shared(line_sink));

    let exit = lock(&source).start().unwrap().join();
    assert_eq!(exit.reason, ExitReason::EndOfInput);

    assert_eq!(drain(&raw_rx), capture);
    let decoded = drain(&record_rx);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].tag(), "InstantaneousDemand");
    assert!(csv_line(&decoded[0]).contains(", InstantaneousDemand, 5, "));
    assert_eq!(drain(&line_rx), vec!["InstantaneousDemand,5".to_string()]);
}

#[test]
fn test_two_sources_share_one_sink() {
    let first: String = (1..=3)
        .map(|n| DemandBuilder::new(n).build() + "\n")
        .collect();
    let second: String = (101..=103)
        .map(|n| DemandBuilder::new(n).build() + "\n")
        .collect();
    let first = temp_capture(&first);
    let second = temp_capture(&second);

    let (sink, rx) = ChannelSink::<String>::unbounded();
    let sink = shared(sink);

    let mut sources = Vec::new();
    for file in [&first, &second] {
        let source = shared(Source::new(FileConnector::new(file.path())));
        source
            .pipe(shared(Coalescer::new()))
            .pipe(shared(FragmentDecoder::new()))
            .pipe(shared(TagDemandFormatter::default()))
            .pipe(sink.clone());
        sources.push(source);
    }

    let handles: Vec<_> = sources
        .iter()
        .map(|source| lock(source).start().unwrap())
        .collect();
    for handle in handles {
        assert_eq!(handle.join().reason, ExitReason::EndOfInput);
    }

    let values: Vec<u64> = drain(&rx)
        .iter()
        .filter_map(|line| line.split(',').nth(1))
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(values.len(), 6);

    // Interleaving is arbitrary; each source keeps its own order.
    let low: Vec<u64> = values.iter().copied().filter(|v| *v < 100).collect();
    let high: Vec<u64> = values.iter().copied().filter(|v| *v > 100).collect();
    assert_eq!(low, vec![1, 2, 3]);
    assert_eq!(high, vec![101, 102, 103]);
}
