use crate::error::ConfigError;
use crate::format::RecordFormatter;
use crate::handler::RecordHandler;
use crate::record::LogRecord;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE_NAME: &str = "app.log";
pub const DEFAULT_MAX_BYTES: u64 = 4 * 1024 * 1024;
pub const DEFAULT_BACKUP_COUNT: usize = 10;

/// Parse a byte size such as `"512"`, `"64KiB"`, `"4MiB"` or `"1GiB"`.
/// Unit suffixes are case-insensitive.
pub fn parse_size(text: &str) -> Result<u64, ConfigError> {
    let trimmed = text.trim();
    let invalid = || ConfigError::InvalidSize(text.to_string());

    let (digits, multiplier) = match trimmed.len().checked_sub(3).and_then(|at| trimmed.get(at..)) {
        Some(unit) if unit.eq_ignore_ascii_case("kib") => (&trimmed[..trimmed.len() - 3], 1024),
        Some(unit) if unit.eq_ignore_ascii_case("mib") => (&trimmed[..trimmed.len() - 3], 1024 * 1024),
        Some(unit) if unit.eq_ignore_ascii_case("gib") => (&trimmed[..trimmed.len() - 3], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };
    digits
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid())?
        .checked_mul(multiplier)
        .ok_or_else(invalid)
}

struct FileState {
    path: PathBuf,
    /// `None` between closing the live file and reopening it after a rename.
    file: Option<File>,
    size: u64,
}

/// Appends formatted records to a file and rotates it by size.
///
/// When a write would take the file to `max_bytes` or beyond, `app.log`
/// becomes `app.log.1`, `app.log.1` becomes `app.log.2` and so on up to
/// `backup_count`; the oldest backup is discarded. A `max_bytes` or
/// `backup_count` of zero disables rotation and the file grows unbounded.
pub struct RotatingFileHandler {
    formatter: RecordFormatter,
    max_bytes: u64,
    backup_count: usize,
    state: Mutex<FileState>,
}

impl RotatingFileHandler {
    /// Open (or create) `dir/name`, creating `dir` when missing.
    pub fn open(
        dir: impl AsRef<Path>,
        name: &str,
        max_bytes: u64,
        backup_count: usize,
        formatter: RecordFormatter,
    ) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(name);
        let file = open_append(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            formatter,
            max_bytes,
            backup_count,
            state: Mutex::new(FileState { path, file: Some(file), size }),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.state.lock().path.clone()
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut state = self.state.lock();
        let len = line.len() as u64;
        if self.rotates() && state.size > 0 && state.size + len >= self.max_bytes {
            self.rollover(&mut state)?;
        }
        let state = &mut *state;
        let file = match state.file.as_mut() {
            Some(file) => file,
            None => {
                let opened = open_append(&state.path)?;
                state.file.insert(opened)
            }
        };
        file.write_all(line.as_bytes())?;
        file.flush()?;
        state.size += len;
        Ok(())
    }

    fn rotates(&self) -> bool {
        self.max_bytes > 0 && self.backup_count > 0
    }

    /// The live file is closed before it is renamed; some platforms refuse
    /// to rename a file with an open handle.
    fn rollover(&self, state: &mut FileState) -> io::Result<()> {
        drop(state.file.take());

        for i in (1..self.backup_count).rev() {
            let src = backup_path(&state.path, i);
            if src.exists() {
                let dst = backup_path(&state.path, i + 1);
                if dst.exists() {
                    fs::remove_file(&dst)?;
                }
                fs::rename(&src, &dst)?;
            }
        }
        let first = backup_path(&state.path, 1);
        if first.exists() {
            fs::remove_file(&first)?;
        }
        fs::rename(&state.path, &first)?;

        state.file = Some(open_append(&state.path)?);
        state.size = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

impl RecordHandler for RotatingFileHandler {
    fn emit(&self, record: LogRecord) {
        let mut line = self.formatter.format(&record);
        line.push('\n');
        if let Err(e) = self.write_line(&line) {
            eprintln!("file log handler write failed: {}", e);
        }
    }
}
