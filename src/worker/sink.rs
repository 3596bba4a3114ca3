use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crossterm::{cursor, queue, terminal};

use crate::{config::FileSinkConfig, error::LogError};

pub type BoxedWriter = Box<dyn Write + Send>;

/// Terminal output. Only the consumer thread writes here.
pub struct ConsoleSink {
    out: BoxedWriter,
    err: BoxedWriter,
    /// The last line on screen is an animation frame.
    frame_visible: bool,
}

impl ConsoleSink {
    pub fn new(out: BoxedWriter, err: BoxedWriter) -> Self {
        Self {
            out,
            err,
            frame_visible: false,
        }
    }

    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Write an ordinary line. A visible animation frame is erased first so
    /// the frame never gets stranded between regular lines.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.frame_visible {
            self.erase_previous()?;
            self.frame_visible = false;
        }
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    /// Write an animation frame. With `continuation` set, the previous frame
    /// is replaced in place.
    pub fn write_frame(&mut self, line: &str, continuation: bool) -> io::Result<()> {
        if continuation && self.frame_visible {
            self.erase_previous()?;
        }
        writeln!(self.out, "{}", line)?;
        self.frame_visible = true;
        self.out.flush()
    }

    /// Remove a visible animation frame, if any.
    pub fn clear_frame(&mut self) -> io::Result<()> {
        if self.frame_visible {
            self.erase_previous()?;
            self.frame_visible = false;
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn frame_visible(&self) -> bool {
        self.frame_visible
    }

    /// Report on the error writer. Failures here have nowhere left to go.
    pub fn report(&mut self, message: &str) {
        let _ = writeln!(self.err, "{}", message);
        let _ = self.err.flush();
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn erase_previous(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            cursor::MoveToPreviousLine(1),
            terminal::Clear(terminal::ClearType::CurrentLine)
        )
    }
}

/// Size-bounded log file with numbered backups: `app.log`, `app.log.1`, ...
pub struct RotatingFileSink {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: File,
    written: u64,
}

impl RotatingFileSink {
    pub fn open(config: &FileSinkConfig) -> Result<Self, LogError> {
        let file = open_append(&config.path).map_err(|source| LogError::FileSink {
            path: config.path.clone(),
            source,
        })?;
        let written = file.metadata().map(|meta| meta.len()).unwrap_or(0);
        Ok(Self {
            path: config.path.clone(),
            max_bytes: config.max_bytes,
            backups: config.backups,
            file,
            written,
        })
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let len = line.len() as u64 + 1;
        if self.max_bytes > 0 && self.written > 0 && self.written + len > self.max_bytes {
            self.rotate()?;
        }
        writeln!(self.file, "{}", line)?;
        self.written += len;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.backups == 0 {
            self.file = File::create(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        for index in (1..self.backups).rev() {
            let from = backup_path(&self.path, index);
            if from.exists() {
                fs::rename(&from, backup_path(&self.path, index + 1))?;
            }
        }
        fs::rename(&self.path, backup_path(&self.path, 1))?;
        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}
