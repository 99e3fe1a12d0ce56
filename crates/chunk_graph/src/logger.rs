use std::sync::Mutex;

pub trait Logger: Send + Sync + Copy {
    fn log(&self, message: impl Into<String>);
}

/// Logs to stderr, leaving stdout free for the result JSON.
pub struct StdioLogger {}

impl StdioLogger {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for StdioLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for &StdioLogger {
    fn log(&self, message: impl Into<String>) {
        eprintln!("{}", message.into());
    }
}

/// Collects log lines in memory, for tests.
#[derive(Default)]
pub struct VecLogger {
    logs: Mutex<Vec<String>>,
}

impl VecLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs
            .lock()
            .expect("locking the logger array should not fail!")
            .clone()
    }
}

impl Logger for &VecLogger {
    fn log(&self, message: impl Into<String>) {
        self.logs
            .lock()
            .expect("locking the logger array should not fail!")
            .push(message.into());
    }
}
