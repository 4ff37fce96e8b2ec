//! End-to-end tests: replay file -> framer -> decoder -> formatter -> sinks

mod common;

use common::builders::DemandBuilder;
use common::mock_helpers::{channel_sink, drain, TagDemandFormatter};
use common::{temp_capture, test_timeout};
use emu_telemetry::device::FileConnector;
use emu_telemetry::pipeline::nodes::{CsvFormatter, FileLogger, FragmentDecoder, LogRotation};
use emu_telemetry::pipeline::{lock, shared, Coalescer, ExitReason, Pipe, SourceState};
use emu_telemetry::Source;

#[test]
fn test_replay_two_demand_fragments() {
    let mut capture = DemandBuilder::new(0x4b0).lines();
    capture.extend(DemandBuilder::new(0x12c).multiplier(2).lines());
    let file = temp_capture(&(capture.join("\n") + "\n"));

    let (sink, rx) = channel_sink::<String>();
    let source = shared(Source::new(FileConnector::new(file.path())));
    source
        .pipe(shared(Coalescer::new()))
        .pipe(shared(FragmentDecoder::new()))
        .pipe(shared(TagDemandFormatter::default()))
        .pipe(shared(sink));

    let handle = lock(&source).start().unwrap();
    let exit = handle.join();

    assert_eq!(exit.reason, ExitReason::EndOfInput);
    assert_eq!(exit.delivered, capture.len() as u64);
    assert_eq!(lock(&source).state(), SourceState::Stopped);
    assert_eq!(
        drain(&rx),
        vec![
            "InstantaneousDemand,1200".to_string(),
            "InstantaneousDemand,600".to_string()
        ]
    );
    assert!(rx.recv_timeout(test_timeout() / 50).is_err());
}

#[test]
fn test_noise_between_fragments_is_ignored() {
    let capture = format!(
        "garbage before\n{}\nstray text\n<Unknown><A>1</A></Unknown>\n",
        DemandBuilder::new(10).build()
    );
    let file = temp_capture(&capture);

    let (sink, rx) = channel_sink::<String>();
    let source = shared(Source::new(FileConnector::new(file.path())));
    source
        .pipe(shared(Coalescer::new()))
        .pipe(shared(FragmentDecoder::new()))
        .pipe(shared(TagDemandFormatter::default()))
        .pipe(shared(sink));

    let exit = lock(&source).start().unwrap().join();

    assert_eq!(exit.reason, ExitReason::EndOfInput);
    assert_eq!(
        drain(&rx),
        vec!["InstantaneousDemand,10".to_string(), "Unknown,".to_string()]
    );
}

#[test]
fn test_csv_chain_writes_log_file() {
    let capture = DemandBuilder::new(0x4b0).timestamp(0x1c8a_2b3f).build() + "\n";
    let file = temp_capture(&capture);
    let dir = tempfile::tempdir().unwrap();

    let source = shared(Source::new(FileConnector::new(file.path())));
    source
        .pipe(shared(Coalescer::new()))
        .pipe(shared(FragmentDecoder::new()))
        .pipe(shared(CsvFormatter::new()))
        .pipe(shared(
            FileLogger::rolling(dir.path(), "house.log", LogRotation::Never).unwrap(),
        ));

    let exit = lock(&source).start().unwrap().join();
    assert_eq!(exit.reason, ExitReason::EndOfInput);

    let logged = std::fs::read_to_string(dir.path().join("house.log")).unwrap();
    assert_eq!(
        logged,
        format!(
            "{}, InstantaneousDemand, 1200, 0xd8d5b9000000014b, 0x000781000028c07d\n",
            0x1c8a_2b3fu64
        )
    );
}

#[test]
fn test_missing_replay_file_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = Source::new(FileConnector::new(dir.path().join("absent.log")));

    assert!(source.start().is_err());
    assert_eq!(source.state(), SourceState::NotStarted);
}
