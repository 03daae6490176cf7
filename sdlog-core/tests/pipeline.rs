//! Integration tests for sdlog-core

use std::io::Write;

use sdlog_core::*;

const CAPTURE: &str = "\
Temperature: 21.8 C
Humidity: 48.2 %
Pressure: 1009.7 hPa
Gas: 88.1 KOhms
ADC72 Values:
Channel 0: 120
Channel 1: 64
Channel 2: 12
Channel 3: 30
ADC73 Values:
Channel 0: 900
Channel 1: 15
Channel 2: 0
Channel 3: 0

Temperature: 23.4 C
Humidity: 51.0 %
Pressure: 1010.1 hPa
Gas: 91.7 KOhms
ADC72 Values:
Channel 0: 65535
Channel 1: 70
Channel 2: 11
Channel 3: 31
ADC73 Values:
Channel 0: 880
Channel 1: 14
Channel 2: 0
Channel 3: 0
";

#[test]
fn test_capture_with_default_config() {
    let pipeline = Pipeline::from_config(&ConfigBundle::default()).unwrap();
    let report = pipeline.run(CAPTURE.lines(), ScoringContext::DAY, TruncationPolicy::Discard);

    assert_eq!(report.manifest.lines_read, CAPTURE.lines().count());
    assert_eq!(report.readings.len(), 2);
    assert!(report.manifest.warnings.is_empty());
    assert!(report.manifest.failed_rows.is_empty());

    // Full scale hits the calibrated max exactly
    assert_eq!(report.readings[1].bank_a.concentration[0], Some(1000.0));
    assert_eq!(report.score(1).unwrap().breakdown[0].metric, "co");
    assert_eq!(report.score(1).unwrap().breakdown[0].label, "Red");

    // Unconnected channels read zero whatever the count
    assert_eq!(report.readings[0].bank_b.concentration[2], Some(0.0));
}

#[test]
fn test_incremental_feed_matches_batch() {
    let mut parser = LogParser::new(BankAliases::default());
    for line in CAPTURE.lines() {
        parser.feed(line);
    }
    assert_eq!(parser.lines_read(), CAPTURE.lines().count());
    let incremental = parser.finish().unwrap();

    let batch = parse_str(CAPTURE, &BankAliases::default()).unwrap();
    assert_eq!(incremental, batch);
}

#[test]
fn test_noise_lines_do_not_stop_the_run() {
    let noisy = format!("boot v1.2\n{CAPTURE}Gas: --\nADC99 Values:\nADC1 Channel 7: 3\n");
    let pipeline = Pipeline::from_config(&ConfigBundle::default()).unwrap();
    let report = pipeline.run(noisy.lines(), ScoringContext::DAY, TruncationPolicy::Discard);

    assert_eq!(report.readings.len(), 2);
    let errors: Vec<_> = report.manifest.warnings.iter().map(|w| &w.error).collect();
    assert_eq!(
        errors,
        vec![
            &ParseError::UnrecognizedLine,
            &ParseError::NoNumericLiteral("--".into()),
            &ParseError::UnknownBank("ADC99".into()),
            &ParseError::ChannelOutOfRange("7".into()),
        ]
    );
    assert_eq!(report.manifest.warnings[0].line, 1);
}

#[test]
fn test_night_context_changes_temperature_grade() {
    let pipeline = Pipeline::from_config(&ConfigBundle::default()).unwrap();
    let day = pipeline.run(CAPTURE.lines(), ScoringContext::DAY, TruncationPolicy::Discard);
    let night = pipeline.run(CAPTURE.lines(), ScoringContext::NIGHT, TruncationPolicy::Discard);

    let grade = |report: &RunReport| {
        report
            .score(1)
            .unwrap()
            .breakdown
            .iter()
            .find(|m| m.metric == "temperature")
            .map(|m| m.label.clone())
            .unwrap()
    };
    assert_eq!(grade(&day), "Green");
    assert_eq!(grade(&night), "Yellow");
}

#[test]
fn test_truncated_tail_in_manifest() {
    let text = format!("{CAPTURE}ADC73 Values:\nChannel 0: 5\n");
    let pipeline = Pipeline::from_config(&ConfigBundle::default()).unwrap();

    let discard = pipeline.run(text.lines(), ScoringContext::DAY, TruncationPolicy::Discard);
    assert_eq!(discard.readings.len(), 2);
    let note = discard.manifest.truncated.as_ref().unwrap();
    assert_eq!(note.bank, Bank::B);
    assert_eq!(note.channels_received, 1);

    let padded = pipeline.run(text.lines(), ScoringContext::DAY, TruncationPolicy::ZeroPad);
    assert_eq!(padded.readings.len(), 3);
    assert_eq!(padded.readings[2].bank_b.raw, [Some(5), Some(0), Some(0), Some(0)]);
    assert!(padded.scores[2].is_none());
}

#[test]
fn test_pipeline_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[banks]
a = ["LEFT"]
b = ["RIGHT"]

[[channels]]
name = "co"
bank = "a"
channel = 0
min = 0.0
max = 100.0

[weights]
co = 1.0

[rubrics.co]
bands = [{{ low = 0.0, high = 50.0, label = "Green", score = 10.0 }}]
"#
    )
    .unwrap();

    let pipeline = Pipeline::from_config_file(file.path()).unwrap();
    assert_eq!(pipeline.aliases().resolve("LEFT"), Some(Bank::A));
    assert_eq!(pipeline.aliases().resolve("ADC72"), None);

    let report = pipeline.run(
        ["LEFT Channel 0: 0", "RIGHT Channel 0: 1"],
        ScoringContext::DAY,
        TruncationPolicy::Discard,
    );
    assert_eq!(report.score(0).unwrap().total, 10.0);
}

#[test]
fn test_bad_config_file_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[weights]\nco = 1.0").unwrap();
    let err = Pipeline::from_config_file(file.path()).unwrap_err();
    assert!(matches!(
        err,
        SdlogError::Configuration(ConfigurationError::UnknownMetric(_))
    ));
}

#[test]
fn test_report_json_shape() {
    let pipeline = Pipeline::from_config(&ConfigBundle::default()).unwrap();
    let report = pipeline.run(CAPTURE.lines(), ScoringContext::DAY, TruncationPolicy::Discard);
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["readings"].as_array().unwrap().len(), 2);
    assert_eq!(json["series"].as_array().unwrap().len(), 12);
    assert_eq!(json["series"][4]["key"], "a_channel_0");
    assert!(json["manifest"]["truncated"].is_null());
}
