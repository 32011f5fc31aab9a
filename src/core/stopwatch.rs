use std::{
    io::{self, Write},
    time::{Duration, Instant},
};

pub struct Split {
    pub name: String,
    pub duration: Duration,
}

impl Split {
    pub fn display<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{}: {:?}", self.name, self.duration)
    }
}

/// Wall-clock timing for one image, split by pipeline stage.
pub struct Stopwatch {
    splits: Vec<Split>,
    name: String,
    start_total: Instant,
    start_split: Instant,
}

impl Stopwatch {
    pub fn new(name: String) -> Stopwatch {
        let now = Instant::now();
        Stopwatch {
            splits: Vec::default(),
            name,
            start_total: now,
            start_split: now,
        }
    }

    pub fn total_elapsed(&self) -> Duration {
        self.start_total.elapsed()
    }

    pub fn split_elapsed(&self) -> Duration {
        self.start_split.elapsed()
    }

    pub fn record_split(&mut self, name: &str) -> Duration {
        let duration = self.split_elapsed();
        self.start_split = Instant::now();
        self.splits.push(Split {
            name: name.to_owned(),
            duration,
        });
        duration
    }

    pub fn split(&self, name: &str) -> Option<Duration> {
        self.splits
            .iter()
            .find(|split| split.name == name)
            .map(|split| split.duration)
    }

    pub fn display<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(
            writer,
            "{}: total {:?}",
            self.name,
            self.total_elapsed()
        )?;
        for split in self.splits.iter() {
            write!(writer, ";  ")?;
            split.display(writer)?;
        }
        Ok(())
    }

    /// One-line summary, suitable for a log record.
    pub fn summary(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.display(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::Stopwatch;

    #[test]
    fn test_stopwatch_splits() {
        let mut stopwatch = Stopwatch::new("clouds.png".to_owned());
        stopwatch.record_split("load");
        stopwatch.record_split("equalize");

        assert!(stopwatch.split("load").is_some());
        assert!(stopwatch.split("equalize").is_some());
        assert!(stopwatch.split("save").is_none());
        let load = stopwatch.split("load").unwrap();
        assert!(stopwatch.total_elapsed() >= load);

        let summary = stopwatch.summary();
        assert!(summary.starts_with("clouds.png: total"));
        assert!(summary.contains("load: "));
        assert!(summary.contains("equalize: "));
    }
}
