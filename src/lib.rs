//! # LogSlicer
//!
//! LogSlicer is a leveled file logger that keeps every log file under a
//! configured size limit. Instead of renaming or deleting anything, it slices
//! output across timestamp-named files: each target is
//! `<dir>/<base>.<stamp>.<ext>`, where the stamp starts as coarse as a
//! two-digit year and gains calendar fields (month, day, hour, minute) only
//! when the coarser file has filled up. A quiet service accumulates one small
//! file per year; a busy one escalates to per-minute files on its own, and
//! nobody has to predict traffic to pick a rotation schedule. Messages carry
//! one of the eight standard severities (`debug` through `emergency`);
//! anything below the configured threshold is dropped before any file-system
//! work happens. The slicer also implements [`std::io::Write`], so it can sit
//! behind `tracing_appender::non_blocking` as a size-capped sink for the
//! `tracing` stack.
//!
//!
//! ## Example
//!
//! ```rust
//! use logslicer::{LogSlicerBuilder, Severity};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let slicer = LogSlicerBuilder::new("./logs/app.log")
//!         .level(Severity::Warning) // accept warning and above
//!         .max_size_mb(25.0) // slice whenever the active file reaches 25 MB
//!         .build()?;
//!
//!     slicer.error("database connection lost")?;
//!     slicer.warning("retrying in 5s")?;
//!     slicer.debug("not written: below the warning threshold")?;
//!
//!     println!("writing to {}", slicer.current_path().display());
//!     Ok(())
//! }
//! ```
use {
    chrono::{DateTime, FixedOffset, Local, Utc},
    regex::Regex,
    std::{
        fmt,
        fs::{self, OpenOptions},
        io::{self, Write as _},
        path::{Path, PathBuf},
        sync::{
            atomic::{AtomicU8, Ordering},
            Mutex, MutexGuard, PoisonError,
        },
    },
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Default maximum size of a single log file, in megabytes.
pub const DEFAULT_MAX_MEGABYTES: f64 = 50.0;

/// Environment variable consulted by [`LogSlicer::from_env`] for the initial
/// log destination.
pub const LOG_PATH_ENV: &str = "ERROR_LOG";

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Byte lengths are compared in units of 1/10_000 byte so a float-rounded
/// limit cannot flip the inclusive boundary at exact equality.
const SIZE_COMPARE_SCALE: i128 = 10_000;

/// Named severity of a log message, ordered from [`Severity::Debug`] (lowest)
/// to [`Severity::Emergency`] (highest).
///
/// The vocabulary and ordering follow the standard eight syslog levels. Each
/// severity carries a numeric rank from 1 (debug) to 8 (emergency); a message
/// is written only when its rank is at least the slicer's threshold.
///
/// # Examples
/// ```
/// use logslicer::Severity;
///
/// assert!(Severity::Error.rank() > Severity::Warning.rank());
/// assert_eq!(Severity::parse("notice"), Some(Severity::Notice));
/// assert_eq!(Severity::parse("verbose"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    /// Detailed debug information.
    Debug = 1,
    /// Interesting events.
    Info = 2,
    /// Normal but significant events.
    Notice = 3,
    /// Exceptional occurrences that are not errors.
    Warning = 4,
    /// Runtime errors that do not require immediate action.
    Error = 5,
    /// Critical conditions.
    Critical = 6,
    /// Action must be taken immediately.
    Alert = 7,
    /// The system is unusable.
    Emergency = 8,
}

/// Severity names in rank order. Filtering walks this table rather than
/// encoding the ordering in control flow.
const LEVELS: [(&str, Severity); 8] = [
    ("debug", Severity::Debug),
    ("info", Severity::Info),
    ("notice", Severity::Notice),
    ("warning", Severity::Warning),
    ("error", Severity::Error),
    ("critical", Severity::Critical),
    ("alert", Severity::Alert),
    ("emergency", Severity::Emergency),
];

impl Severity {
    /// Numeric rank used for threshold comparison, 1 (debug) to 8 (emergency).
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Look up a severity by its lowercase name.
    ///
    /// Returns `None` for anything outside the eight-name vocabulary,
    /// including differently-cased spellings.
    pub fn parse(name: &str) -> Option<Self> {
        LEVELS
            .iter()
            .find(|(level_name, _)| *level_name == name)
            .map(|(_, severity)| *severity)
    }

    /// The lowercase name of this severity.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
            Severity::Alert => "alert",
            Severity::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank of a severity name for filtering. Unrecognized names rank 0, below
/// every threshold, so they are dropped on the same path as low-severity
/// messages.
fn severity_rank(name: &str) -> u8 {
    Severity::parse(name).map_or(0, Severity::rank)
}

/// One rung of calendar granularity used to build file-name stamps.
///
/// Collision resolution walks the ladder from [`Precision::Year`] down to
/// [`Precision::Minute`], escalating one rung each time the coarser file has
/// already reached the size limit. Formats are cumulative: each rung appends
/// one calendar field to the previous format, so `Day` stamps as `yymmdd`
/// (six digits), never as a bare day number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Two-digit year, e.g. `26`.
    Year,
    /// Year and month, e.g. `2608`.
    Month,
    /// Year, month and day, e.g. `260825`.
    Day,
    /// Down to the hour, e.g. `26082514`.
    Hour,
    /// Down to the minute, e.g. `2608251430`.
    Minute,
}

impl Precision {
    /// All rungs, coarsest first. Collision resolution consumes this left to
    /// right.
    pub const LADDER: [Precision; 5] = [
        Precision::Year,
        Precision::Month,
        Precision::Day,
        Precision::Hour,
        Precision::Minute,
    ];

    /// The cumulative `chrono` format string for this rung.
    fn format_str(self) -> &'static str {
        match self {
            Precision::Year => "%y",
            Precision::Month => "%y%m",
            Precision::Day => "%y%m%d",
            Precision::Hour => "%y%m%d%H",
            Precision::Minute => "%y%m%d%H%M",
        }
    }

    /// Position of this rung in [`Precision::LADDER`].
    fn ladder_index(self) -> usize {
        match self {
            Precision::Year => 0,
            Precision::Month => 1,
            Precision::Day => 2,
            Precision::Hour => 3,
            Precision::Minute => 4,
        }
    }

    /// The tail of [`Precision::LADDER`] starting at this rung.
    fn ladder_from(self) -> &'static [Precision] {
        let ladder: &'static [Precision] = &Self::LADDER;
        &ladder[self.ladder_index()..]
    }
}

/// Specifies the time zone used when formatting file-name stamps.
///
/// # Examples
/// ```
/// use chrono::FixedOffset;
/// use logslicer::TimeZone;
///
/// // Consistent naming when several hosts write to shared storage
/// let utc = TimeZone::UTC;
///
/// // Follow the system time zone (the default)
/// let local = TimeZone::Local;
///
/// // Pin the stamps to one region, e.g. UTC+2
/// let fixed = TimeZone::Fix(FixedOffset::east_opt(2 * 3600).unwrap());
/// ```
#[derive(Debug, Clone)]
pub enum TimeZone {
    /// Coordinated universal time.
    UTC,
    /// The system's local time zone.
    Local,
    /// A fixed offset, regardless of where the process runs.
    Fix(FixedOffset),
}

/// Per-call options for [`LogSlicer::log_with`].
///
/// Mirrors the context argument of conventional leveled-logging interfaces;
/// the only recognized field is a destination override.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    /// When set, retarget the slicer to this path, exactly as
    /// [`LogSlicer::set_location`] would, before the message is written.
    /// The new destination stays active for subsequent calls.
    pub destination: Option<PathBuf>,
}

/// Build-time configuration of a slicer.
#[derive(Clone)]
struct LogSlicerMeta {
    /// Time zone stamps are formatted in, normalized to a fixed offset when
    /// the builder is configured.
    time_zone: FixedOffset,
    /// Precision rungs available for collision resolution, coarsest first.
    precisions: &'static [Precision],
    /// Unix permission bits applied to created log files.
    file_mode: Option<u32>,
}

/// Mutable state of a slicer. One mutex guards all of it so the
/// check-resolve-activate-append sequence can never interleave between
/// callers.
struct LogSlicerState {
    /// The file family currently being written to.
    target: LogTarget,
    /// Append handle on the resolved target file, reopened on every
    /// retarget.
    file: fs::File,
    /// Size limit in megabytes applied to every subsequent check.
    max_megabytes: f64,
}

/// The file the slicer is currently writing to, kept as its parts so a new
/// stamp can be resolved against the same directory, base name and extension.
#[derive(Debug, Clone)]
struct LogTarget {
    directory: PathBuf,
    base_name: String,
    extension: String,
    /// Resolved timestamp stamp. Picking a new stamp is the rotation; files
    /// carrying superseded stamps are left on disk untouched.
    stamp: String,
}

impl LogTarget {
    /// Split a plain log path (no stamp) into directory, base name and
    /// extension: `/var/log/app.log` becomes `/var/log` + `app` + `log`.
    /// A path without a usable file name is rejected.
    fn split(path: &Path) -> Result<(PathBuf, String, String), LogSlicerError> {
        let base_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| LogSlicerError::InvalidLogPath(path.to_path_buf()))?
            .to_string();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_string();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok((directory, base_name, extension))
    }

    /// Full path of the resolved target file.
    fn path(&self) -> PathBuf {
        stamped_path(&self.directory, &self.base_name, &self.stamp, &self.extension)
    }
}

/// `<directory>/<base>.<stamp>.<extension>`, the on-disk naming scheme.
fn stamped_path(directory: &Path, base_name: &str, stamp: &str, extension: &str) -> PathBuf {
    directory.join(format!("{base_name}.{stamp}.{extension}"))
}

/// Scaled inclusive comparison of a byte length against a megabyte limit.
///
/// Both sides are taken to units of 1/10_000 byte and compared as 128-bit
/// integers. A limit floating point cannot represent exactly (0.1 MB is
/// 104857.6 bytes) then still compares correctly at the boundary, matching a
/// decimal comparison at four digits.
fn threshold_reached(len: u64, max_megabytes: f64) -> bool {
    let threshold =
        (max_megabytes * BYTES_PER_MEGABYTE * SIZE_COMPARE_SCALE as f64).round() as i128;
    (len as i128) * SIZE_COMPARE_SCALE >= threshold
}

/// Whether the file at `path` has reached the size limit.
///
/// A missing file is created empty first, so the size read below is
/// well-defined rather than an error. The length comes from a fresh stat on
/// every call, never from a cached counter: other processes may be appending
/// to the same resolved file. A zero-length file is never too big, even for
/// a zero or negative limit (otherwise a zero limit would rotate forever
/// without writing anything).
fn is_too_big(path: &Path, max_megabytes: f64) -> Result<bool, LogSlicerError> {
    if !path.exists() {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| LogSlicerError::CreateFileFailed(path.to_path_buf(), err.to_string()))?;
    }

    let len = fs::metadata(path)?.len();
    if len == 0 {
        return Ok(false);
    }
    Ok(threshold_reached(len, max_megabytes))
}

impl LogSlicerMeta {
    /// Get the current time in the configured time zone.
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.time_zone)
    }

    /// Resolve the coarsest stamp whose target file still has room.
    ///
    /// Walks the precision ladder and returns the first stamp whose
    /// candidate file either does not exist or has not reached
    /// `max_megabytes`. Existence is checked before the size probe, so
    /// resolution never creates candidate files. When the finest rung is
    /// reached the stamp is returned regardless of size: there is no finer
    /// name to escalate to, and the file may keep growing within that
    /// minute.
    fn resolve_stamp(
        &self,
        directory: &Path,
        base_name: &str,
        extension: &str,
        max_megabytes: f64,
    ) -> Result<String, LogSlicerError> {
        let mut stamp = String::new();
        for (rung, precision) in self.precisions.iter().enumerate() {
            stamp = self.now().format(precision.format_str()).to_string();
            let candidate = stamped_path(directory, base_name, &stamp, extension);
            let exhausted = rung + 1 == self.precisions.len();
            if exhausted || !candidate.exists() || !is_too_big(&candidate, max_megabytes)? {
                return Ok(stamp);
            }
        }
        Ok(stamp) // unreachable while the ladder is non-empty
    }

    /// Run the whole activation sequence for `path`: split it into its
    /// parts, create the directory tree, resolve a stamp and open the
    /// append handle on the resulting file.
    fn activate(
        &self,
        path: &Path,
        max_megabytes: f64,
    ) -> Result<(LogTarget, fs::File), LogSlicerError> {
        let (directory, base_name, extension) = LogTarget::split(path)?;
        fs::create_dir_all(&directory).map_err(|err| {
            LogSlicerError::CreateDirectoryFailed(directory.clone(), err.to_string())
        })?;

        let stamp = self.resolve_stamp(&directory, &base_name, &extension, max_megabytes)?;
        let target = LogTarget {
            directory,
            base_name,
            extension,
            stamp,
        };
        let file = self.open_log_file(&target.path())?;
        Ok((target, file))
    }

    /// Open an append handle on `path`, creating the file if needed, and
    /// apply the configured permissions.
    fn open_log_file(&self, path: &Path) -> Result<fs::File, LogSlicerError> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| LogSlicerError::CreateFileFailed(path.to_path_buf(), err.to_string()))?;
        self.set_permissions(path)?;
        Ok(file)
    }

    /// Apply the configured file mode to `path` (Unix-like systems only).
    fn set_permissions(&self, path: &Path) -> Result<(), LogSlicerError> {
        if let Some(mode) = self.file_mode {
            #[cfg(unix)]
            {
                let perms = fs::Permissions::from_mode(mode);
                fs::set_permissions(path, perms).map_err(|err| {
                    LogSlicerError::SetPermissionsFailed {
                        path: path.to_path_buf(),
                        error: err.to_string(),
                    }
                })?;
            }
            #[cfg(not(unix))]
            {
                let _ = mode;
                eprintln!(
                    "Warning: setting file permissions is not supported on non-Unix platforms"
                );
            }
        }
        Ok(())
    }
}

/// A leveled file logger that slices output into size-bounded,
/// timestamp-named files.
///
/// All operations take `&self`, so one slicer can be shared across threads
/// directly or behind an `Arc`. The active target, its append handle and the
/// size limit live behind a single mutex: concurrent callers cannot race the
/// check-then-rotate sequence into two different targets. The severity
/// threshold is atomic and is consulted before the lock, so filtered-out
/// messages cost neither a lock acquisition nor a stat call.
///
/// Appends go through an append-mode handle, relying on the operating
/// system's atomic append guarantee; independent processes that resolve the
/// same file name interleave whole lines without corrupting them.
pub struct LogSlicer {
    meta: LogSlicerMeta,
    /// Minimum accepted severity rank.
    min_rank: AtomicU8,
    state: Mutex<LogSlicerState>,
}

impl LogSlicer {
    /// Build a slicer whose destination comes from the `ERROR_LOG`
    /// environment variable ([`LOG_PATH_ENV`]), with default settings.
    ///
    /// This is the process-wide fallback destination, the moral equivalent
    /// of an interpreter's "error log path" setting. A missing or empty
    /// variable is [`LogSlicerError::MissingDestination`]: fatal at
    /// initialization and deliberately not retried, since a logger with
    /// nowhere to write cannot report its own failure.
    ///
    /// ```no_run
    /// let slicer = logslicer::LogSlicer::from_env()?;
    /// slicer.error("boom")?;
    /// # Ok::<(), logslicer::LogSlicerError>(())
    /// ```
    pub fn from_env() -> Result<Self, LogSlicerError> {
        match std::env::var(LOG_PATH_ENV) {
            Ok(path) if !path.is_empty() => LogSlicerBuilder::new(path).build(),
            _ => Err(LogSlicerError::MissingDestination),
        }
    }

    /// Write `message` at the severity named by `level`.
    ///
    /// Returns immediately with `Ok(())` when `level` ranks below the
    /// current threshold; unrecognized names rank 0 and are dropped the same
    /// way. An accepted message re-checks the active file against the size
    /// limit, rotates to a freshly resolved target if it has filled up, and
    /// only then appends the message with a trailing newline.
    pub fn log(&self, level: &str, message: &str) -> Result<(), LogSlicerError> {
        self.log_with(level, message, LogContext::default())
    }

    /// [`LogSlicer::log`] with per-call options, e.g. a destination
    /// override.
    pub fn log_with(
        &self,
        level: &str,
        message: &str,
        context: LogContext,
    ) -> Result<(), LogSlicerError> {
        if severity_rank(level) < self.min_rank.load(Ordering::Relaxed) {
            return Ok(());
        }

        let mut state = self.lock_state();
        if let Some(destination) = context.destination {
            self.retarget(&mut state, &destination)?;
        }
        self.append(&mut state, message)
    }

    /// Write an emergency message: the system is unusable.
    pub fn emergency(&self, message: &str) -> Result<(), LogSlicerError> {
        self.log(Severity::Emergency.as_str(), message)
    }

    /// Write an alert message: action must be taken immediately.
    pub fn alert(&self, message: &str) -> Result<(), LogSlicerError> {
        self.log(Severity::Alert.as_str(), message)
    }

    /// Write a critical message.
    pub fn critical(&self, message: &str) -> Result<(), LogSlicerError> {
        self.log(Severity::Critical.as_str(), message)
    }

    /// Write an error message.
    pub fn error(&self, message: &str) -> Result<(), LogSlicerError> {
        self.log(Severity::Error.as_str(), message)
    }

    /// Write a warning message.
    pub fn warning(&self, message: &str) -> Result<(), LogSlicerError> {
        self.log(Severity::Warning.as_str(), message)
    }

    /// Write a notice message: normal but significant.
    pub fn notice(&self, message: &str) -> Result<(), LogSlicerError> {
        self.log(Severity::Notice.as_str(), message)
    }

    /// Write an info message.
    pub fn info(&self, message: &str) -> Result<(), LogSlicerError> {
        self.log(Severity::Info.as_str(), message)
    }

    /// Write a debug message.
    pub fn debug(&self, message: &str) -> Result<(), LogSlicerError> {
        self.log(Severity::Debug.as_str(), message)
    }

    /// Lower or raise the severity threshold by name.
    ///
    /// Unrecognized names are ignored; the prior threshold is retained.
    pub fn set_level(&self, level: &str) {
        if let Some(severity) = Severity::parse(level) {
            self.min_rank.store(severity.rank(), Ordering::Relaxed);
        }
    }

    /// Change the size limit, in megabytes, for all future checks.
    pub fn set_max_size(&self, megabytes: f64) {
        self.lock_state().max_megabytes = megabytes;
    }

    /// Point the slicer at a new log path.
    ///
    /// The path is split into directory, base name and extension; the
    /// directory tree is created if absent; a fresh stamp is resolved and
    /// the resulting target becomes active immediately.
    pub fn set_location<P: AsRef<Path>>(&self, path: P) -> Result<(), LogSlicerError> {
        let mut state = self.lock_state();
        self.retarget(&mut state, path.as_ref())
    }

    /// Full path of the file the next accepted message will land in, barring
    /// a rotation in between.
    pub fn current_path(&self) -> PathBuf {
        self.lock_state().target.path()
    }

    /// List every file of the active target family, `<base>.<stamp>.<ext>`
    /// for any ladder precision, sorted by name.
    ///
    /// Superseded files are never deleted, so this is the family's full
    /// history in the current directory.
    pub fn log_files(&self) -> Result<Vec<PathBuf>, LogSlicerError> {
        let (directory, base_name, extension) = {
            let state = self.lock_state();
            (
                state.target.directory.clone(),
                state.target.base_name.clone(),
                state.target.extension.clone(),
            )
        };

        let pattern = format!(
            r"^{}\.\d{{2}}(?:\d{{2}}){{0,4}}\.{}$",
            regex::escape(&base_name),
            regex::escape(&extension)
        );
        let matcher =
            Regex::new(&pattern).map_err(|err| LogSlicerError::Internal(err.to_string()))?;

        let mut files = Vec::new();
        for entry in fs::read_dir(&directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if matcher.is_match(name) {
                    files.push(entry.path());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn lock_state(&self) -> MutexGuard<'_, LogSlicerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Activate the target family of `path`. Runs under the state lock.
    fn retarget(&self, state: &mut LogSlicerState, path: &Path) -> Result<(), LogSlicerError> {
        let (target, file) = self.meta.activate(path, state.max_megabytes)?;
        state.target = target;
        state.file = file;
        Ok(())
    }

    /// Size-check the active target, rotate if it has filled up, then append
    /// `message` and a trailing newline. Runs under the state lock.
    fn append(&self, state: &mut LogSlicerState, message: &str) -> Result<(), LogSlicerError> {
        self.rotate_if_full(state)?;
        state.file.write_all(format!("{message}\n").as_bytes())?;
        Ok(())
    }

    /// The rotation decision: when the resolved file has reached the limit,
    /// resolve a new stamp for the same directory, base name and extension
    /// and reopen the append handle. Resolution may land on the same stamp
    /// again once the finest rung is full; the append then proceeds anyway.
    fn rotate_if_full(&self, state: &mut LogSlicerState) -> Result<(), LogSlicerError> {
        if !is_too_big(&state.target.path(), state.max_megabytes)? {
            return Ok(());
        }

        state.target.stamp = self.meta.resolve_stamp(
            &state.target.directory,
            &state.target.base_name,
            &state.target.extension,
            state.max_megabytes,
        )?;
        state.file = self.meta.open_log_file(&state.target.path())?;
        Ok(())
    }
}

/// Errors that can occur while slicing logs.
#[derive(Debug, thiserror::Error)]
pub enum LogSlicerError {
    /// No destination was configured for [`LogSlicer::from_env`]. Fatal at
    /// initialization: a logger without a sink has nowhere to report
    /// anything, so this is deliberately not retried.
    #[error("No log destination configured: the ERROR_LOG environment variable is unset or empty")]
    MissingDestination,
    #[error("Log path '{0}' has no usable file name")]
    InvalidLogPath(PathBuf),
    #[error("Failed to create directory '{0}': {1}")]
    CreateDirectoryFailed(PathBuf, String),
    #[error("Failed to create file '{0}': {1}")]
    CreateFileFailed(PathBuf, String),
    #[error("Failed to set file permissions for '{path}': {error}")]
    SetPermissionsFailed { path: PathBuf, error: String },
    #[error("File IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Provides a fluent interface for configuring [`LogSlicer`] instances.
///
/// # Default Configuration
///
/// If not explicitly configured, a slicer uses these defaults:
/// * Severity threshold `error`
/// * 50 MB size limit per file
/// * Local system time zone for stamps
/// * Collision resolution starting at the two-digit year
/// * Standard file permissions
///
/// # Examples
///
/// Basic configuration:
/// ```rust
/// use logslicer::LogSlicerBuilder;
///
/// let slicer = LogSlicerBuilder::new("./logs/app.log")
///     .max_size_mb(100.0)
///     .build()
///     .unwrap();
/// ```
///
/// Advanced configuration with multiple options:
/// ```rust
/// use logslicer::{LogSlicerBuilder, Precision, Severity, TimeZone};
///
/// let slicer = LogSlicerBuilder::new("./logs/api.log")
///     .level(Severity::Notice)            // accept notice and above
///     .max_size_mb(8.0)                   // slice at 8 MB
///     .time_zone(TimeZone::UTC)           // stamp in UTC
///     .coarsest_precision(Precision::Day) // first candidate is api.yymmdd.log
///     .build()
///     .unwrap();
/// ```
pub struct LogSlicerBuilder {
    path: PathBuf,
    level: Severity,
    max_megabytes: f64,
    meta: LogSlicerMeta,
}

impl LogSlicerBuilder {
    /// Start building a slicer for the file family of `path`.
    ///
    /// `path` is the plain destination, e.g. `/var/log/app.log`; the
    /// resolved stamp is inserted between its base name and extension when
    /// the slicer is built.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        LogSlicerBuilder {
            path: path.as_ref().to_path_buf(),
            level: Severity::Error,
            max_megabytes: DEFAULT_MAX_MEGABYTES,
            meta: LogSlicerMeta {
                time_zone: Local::now().offset().to_owned(),
                precisions: &Precision::LADDER,
                file_mode: None,
            },
        }
    }

    /// Set the initial severity threshold.
    pub fn level(self, level: Severity) -> Self {
        Self { level, ..self }
    }

    /// Set the initial size limit in megabytes.
    pub fn max_size_mb(self, megabytes: f64) -> Self {
        Self {
            max_megabytes: megabytes,
            ..self
        }
    }

    /// Set the time zone used for file-name stamps.
    pub fn time_zone(self, time_zone: TimeZone) -> Self {
        Self {
            meta: LogSlicerMeta {
                time_zone: match time_zone {
                    TimeZone::UTC => Utc::now().fixed_offset().offset().to_owned(),
                    TimeZone::Local => Local::now().offset().to_owned(),
                    TimeZone::Fix(fixed_offset) => fixed_offset,
                },
                ..self.meta
            },
            ..self
        }
    }

    /// Start collision resolution at a finer rung than the two-digit year.
    ///
    /// Stamps stay cumulative: with `Precision::Day` the first candidate is
    /// already `yymmdd`. Useful when a deployment knows it will fill a
    /// yearly or monthly file within hours anyway.
    pub fn coarsest_precision(self, precision: Precision) -> Self {
        Self {
            meta: LogSlicerMeta {
                precisions: precision.ladder_from(),
                ..self.meta
            },
            ..self
        }
    }

    /// Set the file permissions for created log files (Unix-like systems
    /// only), in octal notation as with chmod, e.g. `0o640`.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            meta: LogSlicerMeta {
                file_mode: Some(mode),
                ..self.meta
            },
            ..self
        }
    }

    /// Build the slicer: split the path, create its directory tree, resolve
    /// the initial stamp and open the append handle.
    pub fn build(self) -> Result<LogSlicer, LogSlicerError> {
        let (target, file) = self.meta.activate(&self.path, self.max_megabytes)?;
        Ok(LogSlicer {
            meta: self.meta,
            min_rank: AtomicU8::new(self.level.rank()),
            state: Mutex::new(LogSlicerState {
                target,
                file,
                max_megabytes: self.max_megabytes,
            }),
        })
    }
}

/// Raw, severity-agnostic sink: bytes pass through the same size check and
/// rotation as leveled messages, with no separator added. This is what lets
/// a slicer serve as the writer behind `tracing_appender::non_blocking`,
/// with the formatting layer owning levels and line breaks.
impl io::Write for LogSlicer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock_state();
        self.rotate_if_full(&mut state)
            .map_err(|err| io::Error::other(err.to_string()))?;
        state.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock_state().file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, len: usize) {
        fs::write(path, vec![b'x'; len]).unwrap();
    }

    fn utc_meta() -> LogSlicerMeta {
        LogSlicerMeta {
            time_zone: Utc::now().fixed_offset().offset().to_owned(),
            precisions: &Precision::LADDER,
            file_mode: None,
        }
    }

    #[test]
    fn severity_ranks_match_the_syslog_order() {
        assert_eq!(severity_rank("debug"), 1);
        assert_eq!(severity_rank("info"), 2);
        assert_eq!(severity_rank("notice"), 3);
        assert_eq!(severity_rank("warning"), 4);
        assert_eq!(severity_rank("error"), 5);
        assert_eq!(severity_rank("critical"), 6);
        assert_eq!(severity_rank("alert"), 7);
        assert_eq!(severity_rank("emergency"), 8);
    }

    #[test]
    fn severity_ranks_increase_monotonically() {
        let ranks: Vec<u8> = LEVELS.iter().map(|(_, severity)| severity.rank()).collect();
        for pair in ranks.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn unknown_severities_rank_zero() {
        assert_eq!(severity_rank("fatal"), 0);
        assert_eq!(severity_rank("ERROR"), 0);
        assert_eq!(severity_rank(""), 0);
    }

    #[test]
    fn severity_names_round_trip() {
        for (name, severity) in LEVELS {
            assert_eq!(Severity::parse(name), Some(severity));
            assert_eq!(severity.to_string(), name);
        }
    }

    #[test]
    fn stamp_formats_are_cumulative() {
        let now = Utc::now().fixed_offset();
        let mut previous = String::new();
        for precision in Precision::LADDER {
            let stamp = now.format(precision.format_str()).to_string();
            assert!(stamp.starts_with(&previous));
            assert_eq!(stamp.len(), previous.len() + 2);
            previous = stamp;
        }
    }

    #[test]
    fn ladder_from_keeps_the_tail() {
        assert_eq!(Precision::Year.ladder_from(), &Precision::LADDER[..]);
        assert_eq!(Precision::Day.ladder_from(), &Precision::LADDER[2..]);
        assert_eq!(Precision::Minute.ladder_from(), &Precision::LADDER[4..]);
    }

    #[test]
    fn threshold_comparison_is_inclusive_and_decimal_safe() {
        assert!(threshold_reached(52_428_800, 50.0));
        assert!(!threshold_reached(52_428_799, 50.0));
        // 0.0001 MB is 104.8576 bytes
        assert!(threshold_reached(105, 0.0001));
        assert!(!threshold_reached(104, 0.0001));
        // a fractional-megabyte limit that lands on exactly 2048 bytes
        let exact = 2048.0 / (1024.0 * 1024.0);
        assert!(threshold_reached(2048, exact));
        assert!(!threshold_reached(2047, exact));
        // nonzero lengths always reach a zero or negative limit
        assert!(threshold_reached(1, 0.0));
        assert!(threshold_reached(1, -1.0));
    }

    #[test]
    fn size_guard_creates_missing_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.log");
        assert!(!is_too_big(&path, 1.0).unwrap());
        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn empty_files_are_never_too_big() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.log");
        fs::write(&path, b"").unwrap();
        assert!(!is_too_big(&path, 50.0).unwrap());
        assert!(!is_too_big(&path, 0.0).unwrap());
        assert!(!is_too_big(&path, -3.0).unwrap());
    }

    #[test]
    fn size_guard_boundary_is_inclusive_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sized.log");
        let max = 2048.0 / (1024.0 * 1024.0); // exactly 2048 bytes
        write_bytes(&path, 2047);
        assert!(!is_too_big(&path, max).unwrap());
        write_bytes(&path, 2048);
        assert!(is_too_big(&path, max).unwrap());
        write_bytes(&path, 2049);
        assert!(is_too_big(&path, max).unwrap());
    }

    #[test]
    fn size_guard_propagates_create_failures() {
        let unreachable = Path::new("/nonexistent-logslicer-dir/x.log");
        assert!(is_too_big(unreachable, 1.0).is_err());
    }

    #[test]
    fn namer_returns_the_coarsest_stamp_in_a_fresh_directory() {
        let dir = TempDir::new().unwrap();
        let meta = utc_meta();
        let before = meta.now().format("%y").to_string();
        let stamp = meta.resolve_stamp(dir.path(), "app", "log", 50.0).unwrap();
        let after = meta.now().format("%y").to_string();
        assert!(stamp == before || stamp == after);
    }

    #[test]
    fn namer_probes_without_creating_candidate_files() {
        let dir = TempDir::new().unwrap();
        utc_meta()
            .resolve_stamp(dir.path(), "app", "log", 50.0)
            .unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn namer_keeps_a_coarse_file_that_still_has_room() {
        let dir = TempDir::new().unwrap();
        let meta = utc_meta();
        let year = meta.now().format("%y").to_string();
        fs::write(dir.path().join(format!("app.{year}.log")), b"tiny").unwrap();
        let stamp = meta.resolve_stamp(dir.path(), "app", "log", 50.0).unwrap();
        assert_eq!(stamp, year);
    }

    #[test]
    fn namer_escalates_past_a_full_file() {
        let dir = TempDir::new().unwrap();
        let meta = utc_meta();
        let max = 2048.0 / (1024.0 * 1024.0);
        let year = meta.now().format("%y").to_string();
        write_bytes(&dir.path().join(format!("app.{year}.log")), 4096);
        let before = meta.now().format("%y%m").to_string();
        let stamp = meta.resolve_stamp(dir.path(), "app", "log", max).unwrap();
        let after = meta.now().format("%y%m").to_string();
        assert!(stamp == before || stamp == after);
    }

    #[test]
    fn namer_commits_to_the_finest_stamp_when_every_rung_is_full() {
        let dir = TempDir::new().unwrap();
        let meta = utc_meta();
        let max = 1.0 / (1024.0 * 1024.0); // one byte
        let now = meta.now();
        for precision in Precision::LADDER {
            let stamp = now.format(precision.format_str()).to_string();
            write_bytes(&dir.path().join(format!("app.{stamp}.log")), 64);
        }
        let stamp = meta.resolve_stamp(dir.path(), "app", "log", max).unwrap();
        assert_eq!(stamp.len(), 10);
        assert!(stamp.bytes().all(|byte| byte.is_ascii_digit()));
    }

    #[test]
    fn builder_defaults_filter_below_error() {
        let dir = TempDir::new().unwrap();
        let slicer = LogSlicerBuilder::new(dir.path().join("app.log"))
            .build()
            .unwrap();
        slicer.log("warning", "dropped").unwrap();
        slicer.log("error", "written").unwrap();
        let contents = fs::read_to_string(slicer.current_path()).unwrap();
        assert_eq!(contents, "written\n");
    }

    #[test]
    fn set_level_ignores_unknown_names() {
        let dir = TempDir::new().unwrap();
        let slicer = LogSlicerBuilder::new(dir.path().join("app.log"))
            .build()
            .unwrap();
        slicer.set_level("debug");
        slicer.set_level("chatty"); // unknown: prior threshold retained
        slicer.log("debug", "still accepted").unwrap();
        let contents = fs::read_to_string(slicer.current_path()).unwrap();
        assert_eq!(contents, "still accepted\n");
    }

    #[test]
    fn writes_keep_landing_once_the_ladder_is_exhausted() {
        let dir = TempDir::new().unwrap();
        let slicer = LogSlicerBuilder::new(dir.path().join("app.log"))
            .max_size_mb(1.0 / (1024.0 * 1024.0)) // one byte
            .build()
            .unwrap();
        for i in 0..8 {
            slicer.error(&format!("message {i}")).unwrap();
        }
        // one slice per rung, then the finest file absorbs the rest
        assert!(slicer.log_files().unwrap().len() >= 5);
        let last = fs::read_to_string(slicer.current_path()).unwrap();
        assert!(last.contains("message 7"));
    }

    #[cfg(unix)]
    #[test]
    fn file_mode_applies_to_created_files() {
        let dir = TempDir::new().unwrap();
        let slicer = LogSlicerBuilder::new(dir.path().join("app.log"))
            .file_mode(0o600)
            .build()
            .unwrap();
        let mode = fs::metadata(slicer.current_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn log_files_lists_only_the_target_family() {
        let dir = TempDir::new().unwrap();
        let slicer = LogSlicerBuilder::new(dir.path().join("app.log"))
            .build()
            .unwrap();
        slicer.error("one").unwrap();
        fs::write(dir.path().join("app.log"), b"no stamp").unwrap();
        fs::write(dir.path().join("other.25.log"), b"different base").unwrap();
        fs::write(dir.path().join("app.31.txt"), b"different extension").unwrap();
        fs::write(dir.path().join("app.123.log"), b"odd stamp width").unwrap();
        fs::write(dir.path().join("app.9912.log"), b"an older slice").unwrap();
        let files = slicer.log_files().unwrap();
        assert_eq!(
            files,
            vec![slicer.current_path(), dir.path().join("app.9912.log")]
        );
    }

    #[test]
    fn log_files_escapes_dotted_base_names() {
        let dir = TempDir::new().unwrap();
        let slicer = LogSlicerBuilder::new(dir.path().join("my.app.log"))
            .build()
            .unwrap();
        slicer.error("hit").unwrap();
        fs::write(
            dir.path().join("myxapp.25.log"),
            b"the dot must not match any byte",
        )
        .unwrap();
        let files = slicer.log_files().unwrap();
        assert_eq!(files, vec![slicer.current_path()]);
    }

    #[test]
    fn split_rejects_paths_without_a_file_name() {
        assert!(matches!(
            LogTarget::split(Path::new("/")),
            Err(LogSlicerError::InvalidLogPath(_))
        ));
        assert!(matches!(
            LogTarget::split(Path::new("..")),
            Err(LogSlicerError::InvalidLogPath(_))
        ));
    }

    #[test]
    fn split_handles_bare_and_dotted_names() {
        let (dir, base, ext) = LogTarget::split(Path::new("app.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(base, "app");
        assert_eq!(ext, "log");

        let (_, base, ext) = LogTarget::split(Path::new("/var/log/my.app.log")).unwrap();
        assert_eq!(base, "my.app");
        assert_eq!(ext, "log");

        let (_, base, ext) = LogTarget::split(Path::new("/var/log/noext")).unwrap();
        assert_eq!(base, "noext");
        assert_eq!(ext, "");
    }
}
