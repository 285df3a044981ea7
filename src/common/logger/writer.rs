use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
    sync::Arc,
};

use parking_lot::Mutex;

/// Appends log lines to a file and drops the oldest ones once the file grows
/// past `max_lines`.
#[derive(Clone)]
pub(crate) struct LineBoundedWriter {
    path: String,
    max_lines: u32,
    pending: Arc<Mutex<u32>>,
}

impl LineBoundedWriter {
    pub fn new(path: String, max_lines: u32) -> Self {
        Self {
            path,
            max_lines: max_lines.max(1),
            pending: Arc::new(Mutex::new(0)),
        }
    }

    fn truncate_head(&self) -> io::Result<()> {
        if !Path::new(&self.path).exists() {
            return Ok(());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
        let max = self.max_lines as usize;

        if lines.len() > max {
            let mut file = File::create(&self.path)?;
            for line in &lines[lines.len() - max..] {
                writeln!(file, "{}", line)?;
            }
        }
        Ok(())
    }
}

impl io::Write for LineBoundedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(buf)?;

        let mut pending = self.pending.lock();
        *pending += buf.iter().filter(|&&b| b == b'\n').count() as u32;

        // truncating on every line would rewrite the file constantly
        if *pending >= (self.max_lines / 10).max(50) {
            if let Err(e) = self.truncate_head() {
                eprintln!("Failed to truncate log file: {}", e);
            }
            *pending = 0;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LineBoundedWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_lines() {
        let path = std::env::temp_dir().join(format!("tubex-log-{}.log", std::process::id()));
        let path_str = path.to_string_lossy().to_string();
        let _ = std::fs::remove_file(&path);

        let mut writer = LineBoundedWriter::new(path_str.clone(), 10);
        for i in 0..50 {
            writeln!(writer, "line {}", i).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines.last(), Some(&"line 49"));
        let _ = std::fs::remove_file(&path);
    }
}
