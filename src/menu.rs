use crate::commands;
use crate::config;
use crate::csv_processor;
use crate::index;
use crate::persistence;
use crate::query;
use crate::record;

const MENU: &str = "\
==== Energy data menu ====
1. Load CSV file
2. Save to binary snapshot
3. Load binary snapshot
4. Sum over range
5. Average over range
6. Compare two ranges
7. Search with tolerance
0. Exit";

/// Interactive session over any line-oriented input and output.
///
/// Each loaded CSV file is added to the current index; loading a snapshot
/// replaces it.
pub struct Menu<'a, R, W> {
    input: R,
    out: W,
    settings: &'a config::Settings,
    index: index::TimeIndex,
}

impl<'a, R: std::io::BufRead, W: std::io::Write> Menu<'a, R, W> {
    pub fn new(input: R, out: W, settings: &'a config::Settings, index: index::TimeIndex) -> Self {
        Menu { input, out, settings, index }
    }

    pub fn index(&self) -> &index::TimeIndex {
        &self.index
    }

    /// Runs until the user picks `0` or input ends.
    pub fn run(&mut self) -> anyhow::Result<()> {
        loop {
            writeln!(self.out, "{}", MENU)?;
            let Some(choice) = self.prompt("Choice")? else {
                break;
            };
            let result = match choice.as_str() {
                "0" => break,
                "1" => self.load_csv(),
                "2" => self.save_snapshot(),
                "3" => self.load_snapshot(),
                "4" => self.sum(),
                "5" => self.average(),
                "6" => self.compare(),
                "7" => self.search(),
                other => Err(anyhow::anyhow!("Unknown option '{}'", other)),
            };
            if let Err(e) = result {
                if e.is::<EndOfInput>() {
                    break;
                }
                log::debug!("menu action failed: {:#}", e);
                writeln!(self.out, "❌ {}", e)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Prints `label` and reads one trimmed line; `None` at end of input.
    fn prompt(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        write!(self.out, "{}: ", label)?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask(&mut self, label: &str) -> anyhow::Result<String> {
        self.prompt(label)?.ok_or_else(|| anyhow::Error::new(EndOfInput))
    }

    fn ask_channel(&mut self) -> anyhow::Result<record::Channel> {
        let raw = self.ask("Channel (empty = default)")?;
        if raw.is_empty() {
            return Ok(self.settings.default_channel);
        }
        Ok(raw.parse::<record::Channel>()?)
    }

    fn ask_interval(&mut self, which: &str) -> anyhow::Result<query::Interval> {
        let start = self.ask(&format!("{} start (YYYY-MM-DD HH:MM)", which))?;
        let end = self.ask(&format!("{} end (YYYY-MM-DD HH:MM)", which))?;
        Ok(query::Interval::parse(&start, &end)?)
    }

    fn ask_f64(&mut self, label: &str) -> anyhow::Result<f64> {
        let raw = self.ask(label)?;
        raw.parse::<f64>()
            .map_err(|e| anyhow::anyhow!("'{}' is not a number: {}", raw, e))
    }

    fn load_csv(&mut self) -> anyhow::Result<()> {
        let path = self.ask("CSV file")?;
        let report = csv_processor::load_csv(&path, self.settings, &mut self.index)?;
        commands::write_load_report(&mut self.out, &report)
    }

    fn save_snapshot(&mut self) -> anyhow::Result<()> {
        let path = self.ask("Snapshot file")?;
        persistence::save_snapshot(&self.index, &path)?;
        writeln!(self.out, "Saved {} records to {}", self.index.len(), path)?;
        Ok(())
    }

    fn load_snapshot(&mut self) -> anyhow::Result<()> {
        let path = self.ask("Snapshot file")?;
        self.index = persistence::load_snapshot(&path)?;
        writeln!(self.out, "Loaded {} records from {}", self.index.len(), path)?;
        Ok(())
    }

    fn sum(&mut self) -> anyhow::Result<()> {
        let interval = self.ask_interval("Range")?;
        let channel = self.ask_channel()?;
        let sum = query::calculate_sum(&self.index, &interval, channel);
        commands::write_sum(&mut self.out, &interval, channel, sum)
    }

    fn average(&mut self) -> anyhow::Result<()> {
        let interval = self.ask_interval("Range")?;
        let channel = self.ask_channel()?;
        let avg = query::calculate_average(&self.index, &interval, channel);
        commands::write_average(&mut self.out, &interval, channel, avg)
    }

    fn compare(&mut self) -> anyhow::Result<()> {
        let first = self.ask_interval("First range")?;
        let second = self.ask_interval("Second range")?;
        let channel = self.ask_channel()?;
        let diff = query::compare_ranges(&self.index, &first, &second, channel);
        commands::write_compare(&mut self.out, &first, &second, channel, diff)
    }

    fn search(&mut self) -> anyhow::Result<()> {
        let value = self.ask_f64("Value")?;
        let tolerance = self.ask_f64("Tolerance")?;
        if tolerance < 0.0 {
            return Err(anyhow::anyhow!("Tolerance must be non-negative"));
        }
        let interval = self.ask_interval("Range")?;
        let channel = self.ask_channel()?;
        let found = query::search_records(&self.index, value, tolerance, &interval, channel);
        commands::write_search(&mut self.out, &found, channel, value, tolerance)
    }
}

/// Input ended in the middle of a dialog.
#[derive(Debug, thiserror::Error)]
#[error("input ended")]
struct EndOfInput;
