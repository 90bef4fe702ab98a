//! Build script for fathom-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates sensor.toml at compile time
//! - Generates the `SensorConfig` constant the firmware runs with

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Electrodes on one MPR121
const MAX_ELECTRODES: i64 = 12;

fn main() {
    setup_linker();
    let config = load_config();
    let sensor = validate_config(&config);
    generate_config(&sensor);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read and parse sensor.toml
fn load_config() -> toml::Value {
    println!("cargo:rerun-if-changed=sensor.toml");

    let config_path = Path::new("sensor.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: sensor.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a sensor.toml configuration file.         ║\n\
            ║  Please create one in the fathom-firmware directory.             ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read sensor.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in sensor.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Report every collected error at once
fn fail(section: &str, errors: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: Invalid sensor configuration ({:<27}) ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        section,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Values pulled out of sensor.toml, ready for code generation
struct Sensor {
    electrodes: usize,
    max_height_mm: i64,
    threshold: i64,
    scales: Vec<i64>,
    weights: Vec<i64>,
    clock_divider: i64,
    modulation_current: i64,
    compensation_current: Vec<i64>,
    fast_ms: i64,
    slow_ms: i64,
    nominal_hz: i64,
    tolerance_pct: i64,
    scan_timeout_wakes: i64,
    motion_hold_cycles: i64,
    telemetry: &'static str,
    calibration_offset: i64,
    mpr121_address: i64,
    first_filter: &'static str,
    second_filter: &'static str,
    sample_interval: i64,
}

fn table<'a>(config: &'a toml::Value, name: &str, errors: &mut Vec<String>) -> Option<&'a toml::Table> {
    match config.get(name) {
        Some(toml::Value::Table(t)) => Some(t),
        Some(_) => {
            errors.push(format!("[{}] must be a table", name));
            None
        }
        None => {
            errors.push(format!("Missing [{}] section", name));
            None
        }
    }
}

fn int_in(
    t: Option<&toml::Table>,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> i64 {
    let Some(t) = t else { return *range.start() };
    match t.get(key) {
        Some(toml::Value::Integer(v)) if range.contains(v) => *v,
        Some(toml::Value::Integer(_)) => {
            errors.push(format!(
                "[{}] {} must be {}-{}",
                section,
                key,
                range.start(),
                range.end()
            ));
            *range.start()
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            *range.start()
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            *range.start()
        }
    }
}

/// An integer array of `len` entries, or one integer repeated `len` times
fn int_list(
    t: Option<&toml::Table>,
    section: &str,
    key: &str,
    len: usize,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> Option<Vec<i64>> {
    let value = t?.get(key)?;
    let values = match value {
        toml::Value::Integer(v) => vec![*v; len],
        toml::Value::Array(items) => {
            if items.len() != len {
                errors.push(format!("[{}] {} needs {} entries", section, key, len));
                return None;
            }
            let mut out = Vec::with_capacity(len);
            for item in items {
                match item.as_integer() {
                    Some(v) => out.push(v),
                    None => {
                        errors.push(format!("[{}] {} entries must be integers", section, key));
                        return None;
                    }
                }
            }
            out
        }
        _ => {
            errors.push(format!("[{}] {} must be an integer or array", section, key));
            return None;
        }
    };

    if values.iter().any(|v| !range.contains(v)) {
        errors.push(format!(
            "[{}] {} entries must be {}-{}",
            section,
            key,
            range.start(),
            range.end()
        ));
    }
    Some(values)
}

/// Validate sensor.toml and collect the values
fn validate_config(config: &toml::Value) -> Sensor {
    let mut errors = Vec::new();

    let strip = table(config, "strip", &mut errors);
    let electrodes = int_in(strip, "strip", "electrodes", 2..=MAX_ELECTRODES, &mut errors) as usize;
    let max_height_mm = int_in(strip, "strip", "max_height_mm", 1..=u16::MAX as i64, &mut errors);
    let threshold = int_in(strip, "strip", "threshold", 0..=i32::MAX as i64, &mut errors);
    let scales = int_list(strip, "strip", "scales", electrodes, 1..=i16::MAX as i64, &mut errors);
    if scales.is_none() && strip.map_or(false, |t| !t.contains_key("scales")) {
        errors.push("[strip] missing 'scales'".to_string());
    }
    // Ends of the strip count once, interior electrodes twice
    let weights = int_list(strip, "strip", "weights", electrodes, 0..=u8::MAX as i64, &mut errors)
        .unwrap_or_else(|| {
            (0..electrodes)
                .map(|i| if i == 0 || i == electrodes - 1 { 1 } else { 2 })
                .collect()
        });
    if weights.iter().sum::<i64>() == 0 {
        errors.push("[strip] weights must not all be zero".to_string());
    }

    let tuning = table(config, "tuning", &mut errors);
    let clock_divider = int_in(tuning, "tuning", "clock_divider", 0..=7, &mut errors);
    let modulation_current = int_in(tuning, "tuning", "modulation_current", 1..=63, &mut errors);
    let compensation_current =
        int_list(tuning, "tuning", "compensation_current", electrodes, 0..=63, &mut errors)
            .unwrap_or_else(|| vec![0; electrodes]);

    let cadence = table(config, "cadence", &mut errors);
    let fast_ms = int_in(cadence, "cadence", "fast_ms", 1..=u16::MAX as i64, &mut errors);
    let slow_ms = int_in(cadence, "cadence", "slow_ms", 1..=u16::MAX as i64, &mut errors);
    if fast_ms > slow_ms {
        errors.push("[cadence] fast_ms must not exceed slow_ms".to_string());
    }

    let oscillator = table(config, "oscillator", &mut errors);
    let nominal_hz = int_in(oscillator, "oscillator", "nominal_hz", 1..=u32::MAX as i64, &mut errors);
    let tolerance_pct = int_in(oscillator, "oscillator", "tolerance_pct", 0..=99, &mut errors);

    let controller = table(config, "controller", &mut errors);
    let scan_timeout_wakes =
        int_in(controller, "controller", "scan_timeout_wakes", 1..=u16::MAX as i64, &mut errors);
    let motion_hold_cycles =
        int_in(controller, "controller", "motion_hold_cycles", 0..=u16::MAX as i64, &mut errors);

    let telemetry = match config.get("telemetry").and_then(|t| t.get("mode")) {
        Some(toml::Value::String(mode)) => match mode.as_str() {
            "off" => "Off",
            "summary" => "Summary",
            "full" => "Full",
            _ => {
                errors.push("[telemetry] mode must be 'off', 'summary', or 'full'".to_string());
                "Off"
            }
        },
        Some(_) => {
            errors.push("[telemetry] mode must be a string".to_string());
            "Off"
        }
        None => "Summary",
    };

    let calibration_offset = match config.get("calibration") {
        Some(toml::Value::Table(t)) => {
            int_in(Some(t), "calibration", "offset", 0..=u32::MAX as i64, &mut errors)
        }
        _ => 0,
    };

    let mpr121 = table(config, "mpr121", &mut errors);
    let mpr121_address = int_in(mpr121, "mpr121", "address", 0x5A..=0x5D, &mut errors);
    let first_filter = match int_in(mpr121, "mpr121", "first_filter", 6..=34, &mut errors) {
        6 => "Samples6",
        10 => "Samples10",
        18 => "Samples18",
        34 => "Samples34",
        _ => {
            errors.push("[mpr121] first_filter must be 6, 10, 18, or 34".to_string());
            "Samples6"
        }
    };
    let second_filter = match int_in(mpr121, "mpr121", "second_filter", 4..=18, &mut errors) {
        4 => "Samples4",
        6 => "Samples6",
        10 => "Samples10",
        18 => "Samples18",
        _ => {
            errors.push("[mpr121] second_filter must be 4, 6, 10, or 18".to_string());
            "Samples4"
        }
    };
    let sample_interval_ms = int_in(mpr121, "mpr121", "sample_interval_ms", 1..=128, &mut errors);
    if !(sample_interval_ms as u64).is_power_of_two() {
        errors.push("[mpr121] sample_interval_ms must be a power of two".to_string());
    }

    if !errors.is_empty() {
        fail("sensor.toml", &errors);
    }

    println!("cargo:warning=sensor.toml validated successfully");

    Sensor {
        electrodes,
        max_height_mm,
        threshold,
        scales: scales.unwrap_or_default(),
        weights,
        clock_divider,
        modulation_current,
        compensation_current,
        fast_ms,
        slow_ms,
        nominal_hz,
        tolerance_pct,
        scan_timeout_wakes,
        motion_hold_cycles,
        telemetry,
        calibration_offset,
        mpr121_address,
        first_filter,
        second_filter,
        sample_interval: (sample_interval_ms as u64).trailing_zeros() as i64,
    }
}

fn join(values: &[i64], wrap: impl Fn(i64) -> String) -> String {
    values.iter().map(|v| wrap(*v)).collect::<Vec<_>>().join(", ")
}

/// Write `sensor_config.rs` into OUT_DIR
fn generate_config(s: &Sensor) {
    let code = format!(
        "// Generated from sensor.toml by build.rs\n\
        \n\
        pub const ELECTRODES: usize = {electrodes};\n\
        \n\
        pub const SENSOR: SensorConfig<ELECTRODES> = SensorConfig {{\n\
        \x20   scales: [{scales}],\n\
        \x20   weights: ElectrodeWeights::new([{weights}]),\n\
        \x20   threshold: {threshold},\n\
        \x20   max_height_mm: {max_height_mm},\n\
        \x20   tuning: ScanTuning {{\n\
        \x20       clock_divider: {clock_divider},\n\
        \x20       modulation_current: {modulation_current},\n\
        \x20       compensation_current: [{compensation}],\n\
        \x20   }},\n\
        \x20   cadence: CadenceConfig {{ fast_ms: {fast_ms}, slow_ms: {slow_ms} }},\n\
        \x20   oscillator: OscillatorConfig {{ nominal_hz: {nominal_hz}, tolerance_pct: {tolerance_pct} }},\n\
        \x20   scan_timeout_wakes: {scan_timeout_wakes},\n\
        \x20   motion_hold_cycles: {motion_hold_cycles},\n\
        \x20   telemetry: TelemetryMode::{telemetry},\n\
        \x20   calibration_offset: {calibration_offset},\n\
        }};\n\
        \n\
        pub const MPR121: Mpr121Config = Mpr121Config {{\n\
        \x20   address: {address:#04X},\n\
        \x20   electrodes: ELECTRODES as u8,\n\
        \x20   first_filter: FirstFilter::{first_filter},\n\
        \x20   second_filter: SecondFilter::{second_filter},\n\
        \x20   sample_interval: {sample_interval},\n\
        }};\n",
        electrodes = s.electrodes,
        scales = join(&s.scales, |v| format!("Q8_8::from_bits({})", v)),
        weights = join(&s.weights, |v| v.to_string()),
        threshold = s.threshold,
        max_height_mm = s.max_height_mm,
        clock_divider = s.clock_divider,
        modulation_current = s.modulation_current,
        compensation = join(&s.compensation_current, |v| v.to_string()),
        fast_ms = s.fast_ms,
        slow_ms = s.slow_ms,
        nominal_hz = s.nominal_hz,
        tolerance_pct = s.tolerance_pct,
        scan_timeout_wakes = s.scan_timeout_wakes,
        motion_hold_cycles = s.motion_hold_cycles,
        telemetry = s.telemetry,
        calibration_offset = s.calibration_offset,
        address = s.mpr121_address,
        first_filter = s.first_filter,
        second_filter = s.second_filter,
        sample_interval = s.sample_interval,
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("sensor_config.rs"), code).unwrap();
}
