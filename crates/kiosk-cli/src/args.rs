//! Command-line switches.
//!
//! ```text
//! kiosk [-c|--config <path>] [-l|--url <url>] [-t|--timeout <seconds>]
//!       [-p|--popups] [-e|--allow-external] [-n|--no-navigation] [-d|--debug]
//! ```
//!
//! The underscore spellings `--allow_external` and `--no_navigation` are
//! accepted as aliases.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Overrides;

/// Lock-down policy shell for public-access kiosks.
#[derive(Debug, Parser)]
#[command(name = "kiosk", version)]
pub struct CliArgs {
    /// Read configuration from PATH instead of the default locations.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Start the kiosk at URL.
    #[arg(short = 'l', long = "url", value_name = "URL")]
    pub start_url: Option<String>,

    /// Inactivity timeout in seconds, 0 disables it.
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Allow popup windows.
    #[arg(short, long)]
    pub popups: bool,

    /// Allow external (non-HTML) content.
    #[arg(short = 'e', long, alias = "allow_external")]
    pub allow_external: bool,

    /// Run without the navigation bar.
    #[arg(short = 'n', long, alias = "no_navigation")]
    pub no_navigation: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub debug: bool,
}

impl CliArgs {
    /// Switches that override the file and environment.  Flags that were
    /// not given leave the lower layers untouched.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            start_url: self.start_url.clone(),
            timeout: self.timeout,
            allow_popups: self.popups.then_some(true),
            allow_external_content: self.allow_external.then_some(true),
            navigation: self.no_navigation.then_some(false),
        }
    }
}
