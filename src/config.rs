// Adaptor-level CLI/env parity flags
//
// These are not part of the synchronization core's contract; they
// only seed the Config handed to Controller::initialize at startup.
//
// DALi Adaptor Contributors
use clap::Parser;

use crate::error::{AdaptorError, Result};

const DEFAULT_RENDER_REFRESH_RATE_VAR: &str = "DALI_ADAPTOR_RENDER_REFRESH_RATE";

#[derive(Parser, Debug, Clone)]
#[command(name = "dali-adaptor", about = "DALi adaptor thread-synchronization core")]
pub struct Config {
    /// Initial surface width. 0 means "let the platform choose".
    #[arg(long, default_value_t = 0)]
    pub width: u32,

    /// Initial surface height. 0 means "let the platform choose".
    #[arg(long, default_value_t = 0)]
    pub height: u32,

    /// Display DPI as "WxH", e.g. "220x220". Empty means "query the platform".
    #[arg(long, default_value = "")]
    pub dpi: String,

    /// Force the VSyncNotifier into timer-fallback mode even if a
    /// hardware monitor is available.
    #[arg(long)]
    pub no_vsync: bool,
}

impl Config {
    /// Parses `std::env::args`, following clap's usual conventions
    /// (this also implements `--help`/`-h` and `--version`).
    pub fn from_args() -> Config {
        Config::parse()
    }

    /// Parses the DPI string into an (x, y) pair, or `None` when the
    /// caller should query the platform instead.
    pub fn parsed_dpi(&self) -> Result<Option<(f32, f32)>> {
        if self.dpi.is_empty() {
            return Ok(None);
        }

        let mut parts = self.dpi.splitn(2, 'x');
        let x = parts.next().unwrap_or("");
        let y = parts.next().unwrap_or("");

        let x: f32 = x
            .parse()
            .map_err(|_| AdaptorError::ConfigInvalid(format!("invalid dpi string: {}", self.dpi)))?;
        let y: f32 = y
            .parse()
            .map_err(|_| AdaptorError::ConfigInvalid(format!("invalid dpi string: {}", self.dpi)))?;

        Ok(Some((x, y)))
    }

    /// Reads the initial `vsyncs_per_render` value from
    /// `DALI_ADAPTOR_RENDER_REFRESH_RATE`, defaulting to 1.
    pub fn initial_render_refresh_rate(&self) -> Result<u32> {
        match std::env::var(DEFAULT_RENDER_REFRESH_RATE_VAR) {
            Ok(val) => val.parse::<u32>().ok().filter(|n| *n >= 1).ok_or_else(|| {
                AdaptorError::ConfigInvalid(format!(
                    "{} must be a positive integer, got {:?}",
                    DEFAULT_RENDER_REFRESH_RATE_VAR, val
                ))
            }),
            Err(_) => Ok(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(dpi: &str) -> Config {
        Config {
            width: 0,
            height: 0,
            dpi: dpi.to_string(),
            no_vsync: false,
        }
    }

    #[test]
    fn empty_dpi_is_none() {
        assert_eq!(cfg("").parsed_dpi().unwrap(), None);
    }

    #[test]
    fn parses_wxh_dpi() {
        assert_eq!(cfg("220x220").parsed_dpi().unwrap(), Some((220.0, 220.0)));
        assert_eq!(cfg("4x5").parsed_dpi().unwrap(), Some((4.0, 5.0)));
    }

    #[test]
    fn rejects_malformed_dpi() {
        assert!(cfg("garbage").parsed_dpi().is_err());
        assert!(cfg("4x").parsed_dpi().is_err());
    }
}
