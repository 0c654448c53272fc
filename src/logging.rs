use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Error,
            2 => Self::Warn,
            4 => Self::Debug,
            _ => Self::Info,
        }
    }
}

fn level_cell() -> &'static AtomicU8 {
    static CELL: OnceLock<AtomicU8> = OnceLock::new();
    CELL.get_or_init(|| AtomicU8::new(LogLevel::Info as u8))
}

pub fn set_level(level: LogLevel) {
    level_cell().store(level as u8, Ordering::Relaxed);
}

/// Apply the first level that parses: CLI flag, then config value.
/// Unknown names are reported and leave the current level untouched.
pub fn configure(cli_level: Option<&str>, config_level: Option<&str>) {
    for candidate in [cli_level, config_level].into_iter().flatten() {
        match LogLevel::parse(candidate) {
            Some(level) => {
                set_level(level);
                return;
            }
            None => warn(&format!("Unknown log level '{}', ignoring", candidate)),
        }
    }
}

pub fn enabled(level: LogLevel) -> bool {
    level <= LogLevel::from_u8(level_cell().load(Ordering::Relaxed))
}

pub fn error(message: &str) {
    if enabled(LogLevel::Error) {
        eprintln!("ERROR: {}", message);
    }
}

pub fn warn(message: &str) {
    if enabled(LogLevel::Warn) {
        eprintln!("Warning: {}", message);
    }
}

pub fn info(message: &str) {
    if enabled(LogLevel::Info) {
        println!("{}", message);
    }
}

pub fn debug(message: &str) {
    if enabled(LogLevel::Debug) {
        eprintln!("DEBUG: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!(LogLevel::parse("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" debug "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert_eq!(LogLevel::from_u8(LogLevel::Warn as u8), LogLevel::Warn);
    }
}
