use spread_series::aggregation::{aggregate_files, run_stream, Aggregator};
use spread_series::output::OutputWriter;
use spread_series::sources::{open_input, CsvFeed, SyntheticParams, SyntheticSource};
use spread_series::types::{CacheSettings, Config, GapMode, TimestampUnit};
use std::fs;
use std::io::Cursor;

const SCENARIO: &str = "\
800200000,:b,1.50
800200000,:a,1.60
800600000,:b,1.75
800600000,:a,1.95
801500000,:b,1.80
801500000,:a,1.90
803300000,:b,1.13
803300000,:a,1.28
804200000,:b,1.01
804200000,:a,1.11
";

const EXPECTED: &str = "\
801000000,0.15000000
802000000,0.15000000
803000000,0.15000000
804000000,0.13500000
";

/// Run text through the whole pipeline and return what would go to stdout
fn aggregate_text(text: &str, config: &Config) -> (String, spread_series::RunSummary) {
    let feed = CsvFeed::new(
        Cursor::new(text.as_bytes().to_vec()),
        config.delimiter,
        config.has_header,
    );
    let mut writer = OutputWriter::new(Vec::new(), config.cache.precision, config.timestamp_unit);
    let summary = run_stream(Aggregator::new(config), feed, &mut writer).unwrap();
    (String::from_utf8(writer.into_inner()).unwrap(), summary)
}

#[test]
fn test_end_to_end_scenario() {
    let (output, summary) = aggregate_text(SCENARIO, &Config::default());
    assert_eq!(output, EXPECTED);
    assert_eq!(summary.records, 10);
    assert_eq!(summary.dropped.map(|d| d.records), Some(1));
}

#[test]
fn test_duplicate_lines_are_skipped() {
    let noisy = SCENARIO
        .replace("801500000,:a,1.90\n", "801500000,:a,1.90\n801500000,:a,1.90\n")
        .replace("803300000,:b,1.13\n", "803300000,:b,1.13\n803300000,:b,1.14\n");

    let (output, summary) = aggregate_text(&noisy, &Config::default());
    assert_eq!(summary.records, 12);
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.spreads, 5);
    assert_eq!(output, EXPECTED);
}

#[test]
fn test_orphaned_side_blocks_until_paired() {
    // a bid at 801.5 whose ask never comes: later instants are refused
    let text = "\
800200000,:b,1.50
800200000,:a,1.60
801500000,:b,1.80
803300000,:b,1.13
803300000,:a,1.28
";
    let (output, summary) = aggregate_text(text, &Config::default());
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.spreads, 1);
    assert_eq!(output, "");
    assert_eq!(summary.dropped.map(|d| d.records), Some(1));
}

#[test]
fn test_header_delimiter_and_units() {
    let text = format!(
        "timestamp|side|price\n{}",
        SCENARIO
            .lines()
            .map(|line| {
                let fields: Vec<&str> = line.split(',').collect();
                let millis = fields[0].parse::<i64>().unwrap() / 1_000;
                format!("{}|{}|{}\n", millis, fields[1], fields[2])
            })
            .collect::<String>()
    );
    let config = Config {
        delimiter: b'|',
        has_header: true,
        timestamp_unit: TimestampUnit::Millis,
        ..Config::default()
    };

    let (output, _) = aggregate_text(&text, &config);
    let expected = EXPECTED.replace("000000,", "000,");
    assert_eq!(output, expected);
}

#[test]
fn test_malformed_line_aborts() {
    let text = SCENARIO.replace("801500000,:b,1.80", "801500000,:x,1.80");
    let feed = CsvFeed::new(Cursor::new(text.into_bytes()), b',', false);
    let mut writer = OutputWriter::new(Vec::new(), 8, TimestampUnit::Micros);
    let result = run_stream(Aggregator::new(&Config::default()), feed, &mut writer);
    assert!(result.is_err());

    // the bad line comes before any second closed
    let written = String::from_utf8(writer.into_inner()).unwrap();
    assert!(written.is_empty());
}

#[test]
fn test_per_second_mode_end_to_end() {
    let config = Config {
        cache: CacheSettings {
            gap_mode: GapMode::PerSecond,
            ..CacheSettings::default()
        },
        ..Config::default()
    };
    let (output, _) = aggregate_text(SCENARIO, &config);
    assert_eq!(
        output,
        "801000000,0.15000000\n802000000,0.15000000\n803000000,0.10000000\n804000000,0.13500000\n"
    );
}

#[test]
fn test_synthetic_stream_emits_consecutive_seconds() {
    for gap_mode in [GapMode::CarryForward, GapMode::PerSecond] {
        let params = SyntheticParams {
            seed: Some(123),
            ..SyntheticParams::default()
        };
        let source = SyntheticSource::new(params, 1_469_404_800_000_000).unwrap();
        let settings = CacheSettings {
            gap_mode,
            ..CacheSettings::default()
        };
        let mut aggregator = Aggregator::with_settings(TimestampUnit::Micros, settings);

        let mut seconds = Vec::new();
        for record in source.take(4_000) {
            for row in aggregator.push(&record.unwrap()).unwrap() {
                assert!(row.spread >= 0.0001 - 1e-9 && row.spread <= 0.01 + 1e-5);
                seconds.push(row.second);
            }
        }

        assert!(seconds.len() > 100);
        for window in seconds.windows(2) {
            assert_eq!(window[1] - window[0], 1, "seconds must be consecutive");
        }

        let summary = aggregator.finalize();
        assert_eq!(summary.rejected, 0);
        assert_eq!(summary.seconds_emitted as usize, seconds.len());
    }
}

#[test]
fn test_batch_mode_matches_stream_mode() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    fs::write(&first, SCENARIO).unwrap();
    fs::write(&second, SCENARIO.lines().take(6).collect::<Vec<_>>().join("\n")).unwrap();

    let output_dir = dir.path().join("out");
    let config = Config {
        inputs: vec![first.clone(), second.clone()],
        output_dir: Some(output_dir.clone()),
        ..Config::default()
    };
    assert!(config.is_batch());

    let reports = aggregate_files(&config, &output_dir).unwrap();
    assert_eq!(reports.len(), 2);

    let first_out = fs::read_to_string(output_dir.join("first.twa.csv")).unwrap();
    assert_eq!(first_out, EXPECTED);
    let second_out = fs::read_to_string(output_dir.join("second.twa.csv")).unwrap();
    assert_eq!(second_out, "801000000,0.15000000\n");

    assert_eq!(reports[0].input, first);
    assert_eq!(reports[1].summary.seconds_emitted, 1);

    // a single file through open_input gives the same series
    let records = open_input(Some(first.as_path()), &config).unwrap();
    let mut writer = OutputWriter::new(Vec::new(), 8, TimestampUnit::Micros);
    run_stream(Aggregator::new(&config), records, &mut writer).unwrap();
    assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), EXPECTED);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    assert!(open_input(Some(dir.path().join("absent.csv").as_path()), &config).is_err());
}

#[test]
fn test_batch_inputs_with_same_stem_keep_both_series() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = (dir.path().join("a"), dir.path().join("b"));
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();
    // same quotes, 100 seconds later
    let later = shift_seconds(SCENARIO);
    fs::write(a.join("quotes.csv"), SCENARIO).unwrap();
    fs::write(b.join("quotes.csv"), &later).unwrap();

    let output_dir = dir.path().join("out");
    let config = Config {
        inputs: vec![a.join("quotes.csv"), b.join("quotes.csv")],
        output_dir: Some(output_dir.clone()),
        ..Config::default()
    };
    let reports = aggregate_files(&config, &output_dir).unwrap();

    assert_ne!(reports[0].output, reports[1].output);
    assert_eq!(fs::read_to_string(&reports[0].output).unwrap(), EXPECTED);
    assert_eq!(
        fs::read_to_string(&reports[1].output).unwrap(),
        shift_seconds(EXPECTED)
    );
    assert_eq!(reports[1].output, output_dir.join("quotes-2.twa.csv"));
}

fn shift_seconds(text: &str) -> String {
    text.lines().map(|line| format!("9{}\n", &line[1..])).collect()
}
