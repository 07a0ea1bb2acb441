//! Training metric loggers.
//!
//! All backends are best-effort: a failing sink never interrupts training.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Sink for named training metrics.
pub trait TrainingLogger: Send {
    fn log_scalar(&mut self, name: &str, value: f32, step: usize);

    /// Record a distribution; backends without histogram support log summary stats.
    fn log_histogram(&mut self, name: &str, values: &[f32], step: usize) {
        if values.is_empty() {
            return;
        }
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        self.log_scalar(&format!("{name}/mean"), mean, step);
        self.log_scalar(&format!("{name}/min"), min, step);
        self.log_scalar(&format!("{name}/max"), max, step);
    }

    /// Flush any buffered output.
    fn flush(&mut self) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl TrainingLogger for NullLogger {
    fn log_scalar(&mut self, _name: &str, _value: f32, _step: usize) {}
}

/// Collects scalars per step and emits one `log::info!` line per logged step.
pub struct ConsoleLogger {
    log_interval: usize,
    pending_step: Option<usize>,
    pending: BTreeMap<String, f32>,
    start_time: Instant,
}

impl ConsoleLogger {
    /// # Arguments
    ///
    /// * `log_interval` - only steps divisible by this are printed
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
            pending_step: None,
            pending: BTreeMap::new(),
            start_time: Instant::now(),
        }
    }

    fn emit(&mut self) {
        let Some(step) = self.pending_step.take() else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }
        let fields: Vec<String> = self
            .pending
            .iter()
            .map(|(name, value)| format!("{name}={value:.4}"))
            .collect();
        log::info!(
            "step {step} ({:.1}s): {}",
            self.start_time.elapsed().as_secs_f32(),
            fields.join(" ")
        );
        self.pending.clear();
    }
}

impl TrainingLogger for ConsoleLogger {
    fn log_scalar(&mut self, name: &str, value: f32, step: usize) {
        if step % self.log_interval != 0 {
            return;
        }
        if self.pending_step != Some(step) {
            self.emit();
            self.pending_step = Some(step);
        }
        self.pending.insert(name.to_string(), value);
    }

    fn flush(&mut self) {
        self.emit();
    }
}

impl Drop for ConsoleLogger {
    fn drop(&mut self) {
        self.emit();
    }
}

/// Long-format CSV: `step,name,value`.
pub struct CsvLogger {
    writer: BufWriter<File>,
    failed: bool,
}

impl CsvLogger {
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "step,name,value")?;
        Ok(Self {
            writer,
            failed: false,
        })
    }

    fn record_failure(&mut self, err: std::io::Error) {
        if !self.failed {
            log::warn!("csv logger disabled after write error: {err}");
            self.failed = true;
        }
    }
}

impl TrainingLogger for CsvLogger {
    fn log_scalar(&mut self, name: &str, value: f32, step: usize) {
        if self.failed {
            return;
        }
        if let Err(err) = writeln!(self.writer, "{step},{name},{value}") {
            self.record_failure(err);
        }
    }

    fn flush(&mut self) {
        if self.failed {
            return;
        }
        if let Err(err) = self.writer.flush() {
            self.record_failure(err);
        }
    }
}

impl Drop for CsvLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Fans every record out to several backends.
#[derive(Default)]
pub struct MultiLogger {
    loggers: Vec<Box<dyn TrainingLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<L: TrainingLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl TrainingLogger for MultiLogger {
    fn log_scalar(&mut self, name: &str, value: f32, step: usize) {
        for logger in &mut self.loggers {
            logger.log_scalar(name, value, step);
        }
    }

    fn log_histogram(&mut self, name: &str, values: &[f32], step: usize) {
        for logger in &mut self.loggers {
            logger.log_histogram(name, values, step);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<(String, f32, usize)>>>);

    impl TrainingLogger for Recording {
        fn log_scalar(&mut self, name: &str, value: f32, step: usize) {
            self.0.lock().unwrap().push((name.to_string(), value, step));
        }
    }

    #[test]
    fn test_csv_logger_writes_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        {
            let mut logger = CsvLogger::new(&path).unwrap();
            logger.log_scalar("train/Q1 loss", 0.5, 10);
            logger.log_scalar("train_alpha/value", 0.1, 10);
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "step,name,value");
        assert_eq!(lines[1], "10,train/Q1 loss,0.5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_histogram_defaults_to_summary() {
        let recording = Recording::default();
        let mut logger = recording.clone();
        logger.log_histogram("grads", &[1.0, 2.0, 3.0], 4);
        logger.log_histogram("empty", &[], 4);

        let records = recording.0.lock().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], ("grads/mean".to_string(), 2.0, 4));
        assert_eq!(records[1].1, 1.0);
        assert_eq!(records[2].1, 3.0);
    }

    #[test]
    fn test_multi_logger_fans_out() {
        let a = Recording::default();
        let b = Recording::default();
        let mut multi = MultiLogger::new().add(a.clone()).add(b.clone()).add(NullLogger);
        multi.log_scalar("train/batch_reward", 1.5, 2);
        multi.flush();

        assert_eq!(multi.len(), 3);
        assert_eq!(a.0.lock().unwrap().len(), 1);
        assert_eq!(b.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_console_logger_skips_off_interval_steps() {
        let mut logger = ConsoleLogger::new(10);
        logger.log_scalar("train/Q1 loss", 1.0, 3);
        assert!(logger.pending.is_empty());
        logger.log_scalar("train/Q1 loss", 1.0, 20);
        assert_eq!(logger.pending.len(), 1);
        logger.flush();
        assert!(logger.pending.is_empty());
    }
}
