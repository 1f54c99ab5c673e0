//! Process-wide logging with leveled macros and text or JSON output.
//!
//! Call [`init`] once at startup. Records below the configured level are
//! dropped before their message is ever formatted; everything else goes
//! to stderr, one line per record.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Log severity, most severe first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl Level {
    const ALL: [Level; 5] = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    pub fn as_str(self) -> &'static str {
        const NAMES: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];
        NAMES[self as usize - 1]
    }

    /// Case-insensitive; "warning" is accepted for [`Level::Warn`].
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("warning") {
            return Some(Self::Warn);
        }
        Self::ALL
            .into_iter()
            .find(|level| raw.eq_ignore_ascii_case(level.as_str()))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("text") {
            Some(Self::Text)
        } else if raw.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// Runtime logging settings, applied process-wide by [`init`].
#[derive(Clone, Copy, Debug)]
pub struct LogConfig {
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Text,
            timestamps: true,
        }
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static JSON_OUTPUT: AtomicBool = AtomicBool::new(false);
static WITH_TIMESTAMPS: AtomicBool = AtomicBool::new(true);

pub fn init(config: LogConfig) {
    MAX_LEVEL.store(config.level as u8, Ordering::Relaxed);
    JSON_OUTPUT.store(config.format == Format::Json, Ordering::Relaxed);
    WITH_TIMESTAMPS.store(config.timestamps, Ordering::Relaxed);
}

pub fn enabled(level: Level) -> bool {
    level as u8 <= MAX_LEVEL.load(Ordering::Relaxed)
}

/// Writes one record to stderr. Callers go through the level macros,
/// which skip disabled levels without formatting anything.
pub fn log(
    level: Level,
    target: &'static str,
    file: &'static str,
    line: u32,
    args: fmt::Arguments<'_>,
) {
    if !enabled(level) {
        return;
    }
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let mut out = io::stderr().lock();
    if JSON_OUTPUT.load(Ordering::Relaxed) {
        emit_json(&mut out, elapsed, level, target, file, line, args);
    } else {
        emit_text(&mut out, elapsed, level, target, args);
    }
}

fn emit_text(
    out: &mut impl Write,
    elapsed: Duration,
    level: Level,
    target: &'static str,
    args: fmt::Arguments<'_>,
) {
    if WITH_TIMESTAMPS.load(Ordering::Relaxed) {
        let _ = write!(out, "{} ", Timestamp(elapsed));
    }
    let _ = writeln!(out, "{} {}: {}", level.as_str(), target, args);
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    ts_ms: u64,
    level: &'static str,
    target: &'static str,
    file: &'static str,
    line: u32,
    msg: &'a str,
}

fn emit_json(
    out: &mut impl Write,
    elapsed: Duration,
    level: Level,
    target: &'static str,
    file: &'static str,
    line: u32,
    args: fmt::Arguments<'_>,
) {
    let msg = args.to_string();
    let record = JsonRecord {
        ts_ms: elapsed.as_millis().try_into().unwrap_or(u64::MAX),
        level: level.as_str(),
        target,
        file,
        line,
        msg: &msg,
    };
    if serde_json::to_writer(&mut *out, &record).is_ok() {
        let _ = out.write_all(b"\n");
    }
}

#[macro_export]
macro_rules! log_at {
    ($level:ident, $($arg:tt)*) => {{
        let level = $crate::Level::$level;
        if $crate::enabled(level) {
            $crate::log(level, module_path!(), file!(), line!(), format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log_at!(Error, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log_at!(Warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log_at!(Info, $($arg)*) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log_at!(Debug, $($arg)*) };
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => { $crate::log_at!(Trace, $($arg)*) };
}

/// UTC wall-clock time derived from a duration since the Unix epoch.
struct Timestamp(Duration);

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        let (year, month, day) = date_from_days(secs / 86_400);
        let clock = secs % 86_400;
        write!(
            f,
            "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
            clock / 3600,
            clock % 3600 / 60,
            clock % 60,
            self.0.subsec_millis(),
        )
    }
}

fn date_from_days(mut days: u64) -> (u64, u32, u32) {
    const MONTH_DAYS: [u64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut year = 1970u64;
    let mut year_len = days_in_year(year);
    while days >= year_len {
        days -= year_len;
        year += 1;
        year_len = days_in_year(year);
    }
    let mut month = 0usize;
    loop {
        let mut month_len = MONTH_DAYS[month];
        if month == 1 && is_leap_year(year) {
            month_len += 1;
        }
        if days < month_len {
            break;
        }
        days -= month_len;
        month += 1;
    }
    (year, month as u32 + 1, days as u32 + 1)
}

fn days_in_year(year: u64) -> u64 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

fn is_leap_year(year: u64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}
