//! CLI orchestration tests.
//!
//! Tests cover:
//! - Config loading and defaults (build_backtest_config)
//! - Validation failures and their exit codes
//! - Symbol resolution
//! - Single-symbol and screening pipelines with MockDataPort
//! - CSV data directories on disk

mod common;

use common::*;
use std::fs;
use std::io::Write;
use trendsim::adapters::csv_adapter::CsvAdapter;
use trendsim::adapters::file_config_adapter::FileConfigAdapter;
use trendsim::cli;
use trendsim::domain::error::TrendsimError;
use trendsim::domain::signal::ExternalSignal;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[indicators]
atr_period = 10
supertrend_multiplier = 2.0
adx_period = 10

[signals]
adx_threshold = 20
external_column = 2

[backtest]
initial_capital = 50000
position_size_pct = 20
max_exposure_pct = 50
commission_fixed = 0
commission_pct = 0
slippage_pct = 0
allow_short = false
equity_curve_points = 100
"#;

mod config_loading {
    use super::*;

    #[test]
    fn reads_every_section() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();

        assert_eq!(config.indicators.atr_period, 10);
        assert_eq!(config.indicators.adx_period, 10);
        assert_eq!(config.indicators.supertrend_multiplier, 2.0);
        assert_eq!(config.signals.adx_threshold, 20.0);
        assert_eq!(config.execution.initial_capital, 50_000.0);
        assert_eq!(config.execution.position_size_pct, 20.0);
        assert!(!config.execution.allow_short);
        assert_eq!(config.equity_curve_points, 100);
        assert_eq!(cli::external_column(&adapter), 2);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let adapter = FileConfigAdapter::from_string("").unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();
        assert_eq!(config, trendsim::domain::backtest::BacktestConfig::default());
        assert_eq!(cli::external_column(&adapter), 1);
    }

    #[test]
    fn invalid_value_is_config_error() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nposition_size_pct = -5\n").unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, TrendsimError::ConfigInvalid { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = cli::load_config(std::path::Path::new("/nonexistent/trendsim.ini"))
            .err()
            .unwrap();
        assert!(matches!(err, TrendsimError::ConfigParse { .. }));
    }
}

mod symbol_resolution {
    use super::*;

    #[test]
    fn override_is_split_and_uppercased() {
        let port = MockDataPort::new();
        let symbols = cli::resolve_symbols(Some(" bhp, cba ,,wbc"), &port).unwrap();
        assert_eq!(symbols, vec!["BHP", "CBA", "WBC"]);
    }

    #[test]
    fn falls_back_to_data_port() {
        let port = MockDataPort::new()
            .with_bars("ZZZ", flat_bars(5, 10.0))
            .with_bars("AAA", flat_bars(5, 10.0));
        let symbols = cli::resolve_symbols(None, &port).unwrap();
        assert_eq!(symbols, vec!["AAA", "ZZZ"]);
    }
}

mod backtest_pipeline {
    use super::*;
    use trendsim::domain::backtest::BacktestConfig;

    #[test]
    fn runs_one_symbol() {
        let port = MockDataPort::new().with_bars(
            "UP",
            bars_from_closes(&linear_closes(100, 20.0, 0.2), 0.1),
        );
        let result =
            cli::run_backtest_pipeline(&port, &BacktestConfig::default(), "UP", None).unwrap();
        assert_eq!(result.symbol, "UP");
        assert_eq!(result.bars, 100);
        assert!(result.metrics.total_trades > 0);
    }

    #[test]
    fn short_series_is_rejected_before_running() {
        let port = MockDataPort::new().with_bars("TINY", flat_bars(10, 10.0));
        let err = cli::run_backtest_pipeline(&port, &BacktestConfig::default(), "TINY", None)
            .unwrap_err();
        assert!(matches!(
            err,
            TrendsimError::InsufficientData {
                bars: 10,
                minimum: 28,
                ..
            }
        ));
        assert!(err.is_validation());
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn missing_symbol_is_no_data() {
        let port = MockDataPort::new();
        let err = cli::run_backtest_pipeline(&port, &BacktestConfig::default(), "NONE", None)
            .unwrap_err();
        assert!(matches!(err, TrendsimError::NoData { .. }));
    }

    #[test]
    fn bearish_external_signals_veto_every_entry() {
        let bars = bars_from_closes(&linear_closes(100, 20.0, 0.2), 0.1);
        let dated: Vec<_> = bars
            .iter()
            .map(|b| {
                (
                    b.date,
                    ExternalSignal {
                        bullish_probability: 0.05,
                    },
                )
            })
            .collect();
        let port = MockDataPort::new()
            .with_bars("UP", bars)
            .with_signals("UP", dated);
        let config = BacktestConfig {
            execution: trendsim::domain::execution::ExecutionConfig {
                allow_short: false,
                ..Default::default()
            },
            ..Default::default()
        };

        let without = cli::run_backtest_pipeline(&port, &config, "UP", None).unwrap();
        let with = cli::run_backtest_pipeline(&port, &config, "UP", Some(1)).unwrap();
        assert!(without.metrics.total_trades > 0);
        assert_eq!(with.metrics.total_trades, 0);
    }

    #[test]
    fn data_error_maps_to_exit_code_3() {
        let port = MockDataPort::new().with_error("BAD", "connection reset");
        let err = cli::run_backtest_pipeline(&port, &BacktestConfig::default(), "BAD", None)
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}

mod screen_pipeline {
    use super::*;
    use trendsim::domain::backtest::BacktestConfig;

    #[test]
    fn keeps_input_order_and_reports_failures() {
        let port = MockDataPort::new()
            .with_bars("AAA", bars_from_closes(&linear_closes(80, 30.0, 0.3), 0.1))
            .with_bars("TINY", flat_bars(8, 5.0))
            .with_error("BAD", "unreadable")
            .with_bars("ZZZ", bars_from_closes(&zigzag_closes(80, 60.0, 1.0, 10), 0.2));
        let symbols: Vec<String> = ["ZZZ", "BAD", "AAA", "TINY"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let outcomes = cli::run_screen_pipeline(&port, &BacktestConfig::default(), &symbols, None);
        let order: Vec<&str> = outcomes.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(order, vec!["ZZZ", "BAD", "AAA", "TINY"]);

        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(TrendsimError::Data { .. })));
        assert!(outcomes[2].result.is_ok());
        assert!(matches!(
            outcomes[3].result,
            Err(TrendsimError::InsufficientData { .. })
        ));
    }
}

mod csv_directory {
    use super::*;
    use tempfile::TempDir;
    use trendsim::domain::backtest::BacktestConfig;

    fn write_symbol(dir: &TempDir, symbol: &str, closes: &[f64]) {
        let mut content = String::from("date,open,high,low,close,volume\n");
        for bar in bars_from_closes(closes, 0.5) {
            content.push_str(&format!(
                "{},{},{},{},{},{}\n",
                bar.date.format("%Y-%m-%d"),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume
            ));
        }
        fs::write(dir.path().join(format!("{}.csv", symbol)), content).unwrap();
    }

    #[test]
    fn backtests_from_disk() {
        let dir = TempDir::new().unwrap();
        write_symbol(&dir, "BHP", &linear_closes(90, 40.0, 0.5));
        write_symbol(&dir, "CBA", &zigzag_closes(90, 80.0, 1.0, 12));

        let port = CsvAdapter::new(dir.path().to_path_buf());
        let symbols = cli::resolve_symbols(None, &port).unwrap();
        assert_eq!(symbols, vec!["BHP", "CBA"]);

        let outcomes = cli::run_screen_pipeline(&port, &BacktestConfig::default(), &symbols, None);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }

    #[test]
    fn signal_column_out_of_range_is_validation_error() {
        let dir = TempDir::new().unwrap();
        write_symbol(&dir, "BHP", &linear_closes(40, 40.0, 0.5));
        fs::write(
            dir.path().join("BHP_signals.csv"),
            "date,p\n2024-01-01,0.5\n",
        )
        .unwrap();

        let port = CsvAdapter::new(dir.path().to_path_buf());
        let err = cli::run_backtest_pipeline(&port, &BacktestConfig::default(), "BHP", Some(4))
            .unwrap_err();
        assert!(matches!(
            err,
            TrendsimError::SignalColumnOutOfRange {
                column: 4,
                columns: 2
            }
        ));
        assert_eq!(err.exit_code(), 5);
    }
}
