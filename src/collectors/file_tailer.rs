use crate::error::TailError;
use crate::events::LogLine;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default wait between unsuccessful read attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Follows a file that another process keeps appending to
///
/// On creation the tailer seeks to the current end of the file, so anything
/// written before that point is never observed. Afterwards it yields one
/// [`LogLine`] per newline-terminated line, in file order. Bytes written
/// without a trailing newline are held back until the newline arrives and
/// are then yielded once, as part of the complete line.
///
/// The tailer polls: when no complete line is available it sleeps for the
/// poll interval and tries again, forever. It never rewinds, so the tracked
/// position only grows.
#[derive(Debug)]
pub struct FileTailer<R = File> {
    reader: BufReader<R>,
    path: Option<PathBuf>,
    /// Offset just past the last complete line handed out
    position: u64,
    /// Bytes of a line whose newline has not been written yet
    pending: Vec<u8>,
    poll_interval: Duration,
}

impl FileTailer<File> {
    /// Open `path` and position the tailer at its current end
    ///
    /// # Errors
    ///
    /// Returns `TailError::NotAFile` for directories and `TailError::Open`
    /// if the file cannot be opened. Both are fatal at startup.
    pub fn open(path: impl AsRef<Path>, poll_interval: Duration) -> Result<Self, TailError> {
        let path = path.as_ref();

        if path.is_dir() {
            return Err(TailError::NotAFile(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|source| TailError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut tailer = Self::from_reader(file, poll_interval)?;
        tailer.path = Some(path.to_path_buf());
        info!(
            "Tailing {} from offset {} (poll interval {:?})",
            path.display(),
            tailer.position,
            poll_interval
        );
        Ok(tailer)
    }
}

impl<R: Read + Seek> FileTailer<R> {
    /// Wrap an already-open handle, seeking it to its end
    pub fn from_reader(mut reader: R, poll_interval: Duration) -> Result<Self, TailError> {
        let position = reader.seek(SeekFrom::End(0))?;

        Ok(Self {
            reader: BufReader::new(reader),
            path: None,
            position,
            pending: Vec::new(),
            poll_interval,
        })
    }

    /// Try to complete one line without waiting
    ///
    /// Returns `Ok(None)` when the file holds no further complete line yet.
    /// A trailing partial line stays buffered across calls.
    ///
    /// # Errors
    ///
    /// Returns `TailError::Io` if reading the handle fails.
    pub fn poll_line(&mut self) -> Result<Option<LogLine>, TailError> {
        let read = self.reader.read_until(b'\n', &mut self.pending)?;

        if read == 0 || self.pending.last() != Some(&b'\n') {
            if read > 0 {
                debug!(
                    "Holding partial line at offset {} ({} bytes buffered)",
                    self.position,
                    self.pending.len()
                );
            }
            return Ok(None);
        }

        let mut bytes = std::mem::take(&mut self.pending);
        let offset = self.position;
        self.position += bytes.len() as u64;

        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!("Line at offset {} is not valid UTF-8, decoding lossily", offset);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        Ok(Some(LogLine::new(text, offset)))
    }

    /// Wait for the next complete line, polling indefinitely
    pub async fn next_line(&mut self) -> Result<LogLine, TailError> {
        loop {
            if let Some(line) = self.poll_line()? {
                return Ok(line);
            }
            self.idle().await;
        }
    }

    /// Wait for the next complete line while `running` stays set
    ///
    /// Returns `Ok(None)` once `running` is cleared. The flag is checked
    /// once per poll interval.
    pub async fn next_line_until(
        &mut self,
        running: &AtomicBool,
    ) -> Result<Option<LogLine>, TailError> {
        while running.load(Ordering::SeqCst) {
            if let Some(line) = self.poll_line()? {
                return Ok(Some(line));
            }
            self.idle().await;
        }
        Ok(None)
    }

    /// Offset just past the last complete line yielded
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of bytes of an unfinished line currently held back
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Back off after an empty poll; a zero interval only yields
    async fn idle(&self) {
        if self.poll_interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn idle_blocking(&self) {
        if self.poll_interval.is_zero() {
            std::thread::yield_now();
        } else {
            std::thread::sleep(self.poll_interval);
        }
    }
}

/// Blocking view of the tailer for synchronous consumers
///
/// Never yields `None`; each item is either the next line or the read error
/// that ended tailing.
impl<R: Read + Seek> Iterator for FileTailer<R> {
    type Item = Result<LogLine, TailError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.poll_line() {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => self.idle_blocking(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// A batch of lines plus the points at which the writer flushes
    #[derive(Debug, Clone)]
    struct ChunkedWrite {
        lines: Vec<String>,
        cuts: Vec<usize>,
    }

    impl Arbitrary for ChunkedWrite {
        fn arbitrary(g: &mut Gen) -> Self {
            let count = usize::arbitrary(g) % 8 + 1;
            let lines: Vec<String> = (0..count)
                .map(|i| format!("{{\"seq\":{},\"tag\":\"{}\"}}", i, u16::arbitrary(g)))
                .collect();
            let total: usize = lines.iter().map(|l| l.len() + 1).sum();
            let mut cuts: Vec<usize> = (0..usize::arbitrary(g) % 6)
                .map(|_| usize::arbitrary(g) % total)
                .collect();
            cuts.sort_unstable();
            cuts.dedup();
            ChunkedWrite { lines, cuts }
        }
    }

    // Lines are yielded exactly once and whole, however the writer splits them
    #[quickcheck]
    fn prop_chunked_writes_yield_whole_lines_in_order(input: ChunkedWrite) -> bool {
        let temp = match NamedTempFile::new() {
            Ok(file) => file,
            Err(_) => return true,
        };
        let mut tailer = FileTailer::open(temp.path(), Duration::from_millis(1)).unwrap();
        let mut writer = OpenOptions::new().append(true).open(temp.path()).unwrap();

        let data: Vec<u8> = input
            .lines
            .iter()
            .flat_map(|l| l.bytes().chain(std::iter::once(b'\n')))
            .collect();

        let mut seen = Vec::new();
        let mut start = 0;
        for &cut in input.cuts.iter().chain(std::iter::once(&data.len())) {
            writer.write_all(&data[start..cut]).unwrap();
            writer.flush().unwrap();
            start = cut;
            while let Some(line) = tailer.poll_line().unwrap() {
                seen.push(line.text);
            }
        }

        seen == input.lines && tailer.position() == data.len() as u64
    }

    // Content present before the tailer opened is never yielded
    #[quickcheck]
    fn prop_backlog_never_replayed(backlog: Vec<String>) -> bool {
        let temp = match NamedTempFile::new() {
            Ok(file) => file,
            Err(_) => return true,
        };
        {
            let mut writer = OpenOptions::new().append(true).open(temp.path()).unwrap();
            for line in &backlog {
                writeln!(writer, "{}", line.replace('\n', " ")).unwrap();
            }
        }

        let mut tailer = FileTailer::open(temp.path(), Duration::from_millis(1)).unwrap();
        tailer.poll_line().unwrap().is_none() && tailer.pending_len() == 0
    }
}
