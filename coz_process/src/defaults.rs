//! Default values for coz-process configuration.
//!
//! These are used as fallback values when neither the command line nor a
//! configuration file provides a setting.

use coz_process_cli_types::OutputFormat;

/// Default minimum number of distinct speedups (baseline included) a
/// progress point needs to be reported.
pub const DEFAULT_MIN_SPEEDUPS: u16 = 1;

/// Default share of all samples a location needs to be listed as a hotspot.
pub const DEFAULT_HOTSPOT_THRESHOLD: f64 = 0.01;

/// Locations are reported by file name and line, without their directory.
pub const DEFAULT_ABBREVIATE_LOCATIONS: bool = true;

/// Count-based error bounds are a legacy report extension and off unless requested.
pub const DEFAULT_ERROR_BOUNDS: bool = false;

pub const DEFAULT_OUTPUT_FORMAT: OutputFormat = OutputFormat::Csv;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_MIN_SPEEDUPS, 1);
        assert_eq!(DEFAULT_HOTSPOT_THRESHOLD, 0.01);
        assert_eq!(DEFAULT_OUTPUT_FORMAT, OutputFormat::Csv);
    }
}
