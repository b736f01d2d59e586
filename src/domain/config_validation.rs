//! Configuration validation.
//!
//! Every key is optional. A key that is present must parse and fall in range;
//! otherwise the run is refused before any data is loaded.

use crate::domain::error::TrendsimError;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    validate_indicator_config(config)?;
    validate_signal_config(config)?;
    validate_backtest_config(config)?;
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    validate_period(config, "atr_period")?;
    validate_period(config, "adx_period")?;
    validate_multiplier(config)?;
    validate_psar(config)?;
    Ok(())
}

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    let threshold = number(config, "signals", "adx_threshold", 25.0)?;
    let strong = number(config, "signals", "adx_strong_threshold", 40.0)?;
    in_range("signals", "adx_threshold", threshold, 0.0, 100.0)?;
    in_range("signals", "adx_strong_threshold", strong, 0.0, 100.0)?;
    if strong < threshold {
        return Err(invalid(
            "signals",
            "adx_strong_threshold",
            "adx_strong_threshold must not be below adx_threshold",
        ));
    }

    let extreme = number(config, "signals", "momentum_extreme", 0.6)?;
    if extreme <= 0.0 || extreme > 1.0 {
        return Err(invalid(
            "signals",
            "momentum_extreme",
            "momentum_extreme must be in (0, 1]",
        ));
    }

    let veto = number(config, "signals", "external_veto", 0.35)?;
    let confirm = number(config, "signals", "external_confirm", 0.65)?;
    in_range("signals", "external_veto", veto, 0.0, 1.0)?;
    in_range("signals", "external_confirm", confirm, 0.0, 1.0)?;
    if confirm < veto {
        return Err(invalid(
            "signals",
            "external_confirm",
            "external_confirm must not be below external_veto",
        ));
    }

    let column = number(config, "signals", "external_column", 1.0)?;
    if column < 0.0 || column.fract() != 0.0 {
        return Err(invalid(
            "signals",
            "external_column",
            "external_column must be a non-negative integer",
        ));
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    validate_initial_capital(config)?;
    validate_sizing(config)?;
    validate_protective_levels(config)?;
    validate_costs(config)?;
    validate_volume_model(config)?;
    validate_risk_free_rate(config)?;
    validate_flag(config, "backtest", "allow_short")?;

    let points = number(config, "backtest", "equity_curve_points", 500.0)?;
    if points < 0.0 || points.fract() != 0.0 || points == 1.0 {
        return Err(invalid(
            "backtest",
            "equity_curve_points",
            "equity_curve_points must be 0 (keep all) or an integer >= 2",
        ));
    }
    Ok(())
}

/// Parsed value of `[section] key`, or `default` when absent.
fn number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TrendsimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(invalid(section, key, &format!("'{}' is not a number", raw))),
        },
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> TrendsimError {
    TrendsimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn in_range(section: &str, key: &str, value: f64, lo: f64, hi: f64) -> Result<(), TrendsimError> {
    if value < lo || value > hi {
        return Err(invalid(
            section,
            key,
            &format!("{} must be between {} and {}", key, lo, hi),
        ));
    }
    Ok(())
}

fn validate_flag(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), TrendsimError> {
    match config.get_string(section, key) {
        None => Ok(()),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "false" | "no" | "0" => Ok(()),
            _ => Err(invalid(section, key, &format!("'{}' is not a boolean", raw))),
        },
    }
}

fn validate_period(config: &dyn ConfigPort, key: &str) -> Result<(), TrendsimError> {
    let value = number(config, "indicators", key, 14.0)?;
    if value < 1.0 || value.fract() != 0.0 {
        return Err(invalid(
            "indicators",
            key,
            &format!("{} must be a positive integer", key),
        ));
    }
    Ok(())
}

fn validate_multiplier(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    let value = number(config, "indicators", "supertrend_multiplier", 3.0)?;
    if value <= 0.0 {
        return Err(invalid(
            "indicators",
            "supertrend_multiplier",
            "supertrend_multiplier must be positive",
        ));
    }
    Ok(())
}

fn validate_psar(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    let start = number(config, "indicators", "psar_af_start", 0.02)?;
    let step = number(config, "indicators", "psar_af_increment", 0.02)?;
    let max = number(config, "indicators", "psar_af_max", 0.20)?;
    if start <= 0.0 {
        return Err(invalid(
            "indicators",
            "psar_af_start",
            "psar_af_start must be positive",
        ));
    }
    if step < 0.0 {
        return Err(invalid(
            "indicators",
            "psar_af_increment",
            "psar_af_increment must be non-negative",
        ));
    }
    if max < start || max > 1.0 {
        return Err(invalid(
            "indicators",
            "psar_af_max",
            "psar_af_max must be between psar_af_start and 1",
        ));
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    let value = number(config, "backtest", "initial_capital", 100_000.0)?;
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    let size = number(config, "backtest", "position_size_pct", 10.0)?;
    if size <= 0.0 || size > 100.0 {
        return Err(invalid(
            "backtest",
            "position_size_pct",
            "position_size_pct must be in (0, 100]",
        ));
    }
    let exposure = number(config, "backtest", "max_exposure_pct", 25.0)?;
    in_range("backtest", "max_exposure_pct", exposure, 0.0, 100.0)
}

fn validate_protective_levels(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    let stop = number(config, "backtest", "stop_loss_pct", 5.0)?;
    if !(0.0..100.0).contains(&stop) {
        return Err(invalid(
            "backtest",
            "stop_loss_pct",
            "stop_loss_pct must be in [0, 100)",
        ));
    }
    let target = number(config, "backtest", "take_profit_pct", 10.0)?;
    if target < 0.0 {
        return Err(invalid(
            "backtest",
            "take_profit_pct",
            "take_profit_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_costs(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    for (key, default) in [
        ("commission_pct", 0.1),
        ("commission_fixed", 1.0),
        ("slippage_pct", 0.05),
    ] {
        if number(config, "backtest", key, default)? < 0.0 {
            return Err(invalid(
                "backtest",
                key,
                &format!("{} must be non-negative", key),
            ));
        }
    }
    Ok(())
}

fn validate_volume_model(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    let lookback = number(config, "backtest", "volume_lookback", 20.0)?;
    if lookback < 0.0 || lookback.fract() != 0.0 {
        return Err(invalid(
            "backtest",
            "volume_lookback",
            "volume_lookback must be a non-negative integer",
        ));
    }
    let ratio = number(config, "backtest", "volume_spike_ratio", 2.0)?;
    if ratio <= 0.0 {
        return Err(invalid(
            "backtest",
            "volume_spike_ratio",
            "volume_spike_ratio must be positive",
        ));
    }
    let max = number(config, "backtest", "max_volume_multiplier", 3.0)?;
    if max < 1.0 {
        return Err(invalid(
            "backtest",
            "max_volume_multiplier",
            "max_volume_multiplier must be at least 1",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), TrendsimError> {
    let value = number(config, "backtest", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}
