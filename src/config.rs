// src/config.rs

//! Invocation configuration
//!
//! Built once in `main` from the command line and passed by reference to the
//! repository and every command handler.

use std::io::IsTerminal;
use std::path::PathBuf;

const COLON_PLAIN: &str = ":: ";
const COLON_COLOR: &str = "\x1b[1;34m::\x1b[0m\x1b[1m ";
const NOCOLOR: &str = "\x1b[0m";

/// When to colorize section headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorMode {
    Never,
    Always,
    #[default]
    Auto,
}

impl ColorMode {
    /// Resolve against the actual stdout
    pub fn enabled(self) -> bool {
        match self {
            ColorMode::Never => false,
            ColorMode::Always => true,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }
}

/// Settings for one invocation
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary architecture of the repository
    pub arch: String,
    /// Directory holding the package archives; defaults to the database's directory
    pub pool: Option<PathBuf>,
    /// GnuPG key used for signing
    pub key: Option<String>,
    pub sign: bool,
    /// Maintain a files database next to the descriptor database
    pub files: bool,
    /// Ignore any existing database and rebuild from the pool
    pub rebuild: bool,
    /// 0 keeps every archive, 1 deletes removed and superseded archives,
    /// 2 also deletes archives that lose a version comparison
    pub clean: u8,
    /// Detailed query output
    pub info: bool,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arch: default_arch().to_string(),
            pool: None,
            key: None,
            sign: false,
            files: false,
            rebuild: false,
            clean: 0,
            info: false,
            color: false,
        }
    }
}

impl Config {
    /// Print a `:: ` prefixed section header
    pub fn colon(&self, message: &str) {
        if self.color {
            println!("{}{}{}", COLON_COLOR, message, NOCOLOR);
        } else {
            println!("{}{}", COLON_PLAIN, message);
        }
    }
}

/// Architecture of the running machine, as uname(2) reports it
pub fn default_arch() -> &'static str {
    std::env::consts::ARCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.arch, std::env::consts::ARCH);
        assert_eq!(cfg.clean, 0);
        assert!(!cfg.sign && !cfg.files && !cfg.rebuild);
    }

    #[test]
    fn test_color_modes() {
        assert!(!ColorMode::Never.enabled());
        assert!(ColorMode::Always.enabled());
        assert_eq!(ColorMode::default(), ColorMode::Auto);
    }
}
