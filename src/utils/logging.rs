use chrono::Local;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub trait Logger: Send + Sync {
    fn log(&mut self, message: &str);
    fn debug_log(&mut self, message: &str);
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Writes progress lines to stdout. Debug lines are dropped unless enabled.
#[derive(Debug, Default)]
pub struct ConsoleLogger {
    debug: bool,
}

impl ConsoleLogger {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl Logger for ConsoleLogger {
    fn log(&mut self, message: &str) {
        println!("{}: {}", timestamp(), message);
    }

    fn debug_log(&mut self, message: &str) {
        if self.debug {
            println!("{}: [DEBUG] {}", timestamp(), message);
        }
    }
}

#[derive(Debug)]
pub struct FileLogger {
    log_file: PathBuf,
    debug: bool,
}

impl FileLogger {
    pub fn new(log_file: impl AsRef<Path>, debug: bool) -> std::io::Result<Self> {
        let log_file = log_file.as_ref().to_path_buf();
        if let Some(parent) = log_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(FileLogger { log_file, debug })
    }

    fn write_to_file(&self, message: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        writeln!(file, "{}: {}", timestamp(), message)
    }
}

impl Logger for FileLogger {
    fn log(&mut self, message: &str) {
        if let Err(e) = self.write_to_file(message) {
            eprintln!("Failed to write to log file: {}", e);
        }
    }

    fn debug_log(&mut self, message: &str) {
        if self.debug {
            if let Err(e) = self.write_to_file(&format!("[DEBUG] {}", message)) {
                eprintln!("Failed to write debug log: {}", e);
            }
        }
    }
}

// MultiLogger allows logging to multiple destinations
#[derive(Default)]
pub struct MultiLogger {
    loggers: Vec<Box<dyn Logger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, logger: Box<dyn Logger>) -> Self {
        self.loggers.push(logger);
        self
    }
}

impl Logger for MultiLogger {
    fn log(&mut self, message: &str) {
        for logger in &mut self.loggers {
            logger.log(message);
        }
    }

    fn debug_log(&mut self, message: &str) {
        for logger in &mut self.loggers {
            logger.debug_log(message);
        }
    }
}

/// Keeps every line in memory. Debug lines are stored with a `[DEBUG] ` prefix.
#[derive(Debug, Default, Clone)]
pub struct BufferLogger {
    pub lines: Vec<String>,
}

impl BufferLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for BufferLogger {
    fn log(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }

    fn debug_log(&mut self, message: &str) {
        self.lines.push(format!("[DEBUG] {}", message));
    }
}
