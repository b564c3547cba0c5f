use crate::config;
use crate::error;
use crate::index;
use crate::record;
use crate::validity_log;

use rayon::prelude::*;

/// Date format used by some inverter exports; normalized before indexing.
const DOTTED_DATE_FORMAT: &str = "%d.%m.%Y";

/// Number of valid and invalid lines seen while loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub valid: usize,
    pub invalid: usize,
}

impl std::ops::AddAssign for LoadReport {
    fn add_assign(&mut self, rhs: LoadReport) {
        self.valid += rhs.valid;
        self.invalid += rhs.invalid;
    }
}

/// Classification of one input line.
#[derive(Debug)]
enum LineOutcome {
    Valid { line: String, record: record::Record },
    Invalid { line_no: u64, line: String, reason: String },
}

fn parse_date_any(s: &str) -> error::Result<chrono::NaiveDate> {
    if s.contains('.') {
        chrono::NaiveDate::parse_from_str(s, DOTTED_DATE_FORMAT)
            .map_err(|_| error::Error::InvalidDate(s.to_string()))
    } else {
        record::parse_date(s)
    }
}

fn parse_value(channel: record::Channel, s: &str) -> error::Result<f64> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| error::Error::InvalidValue {
            channel: channel.name(),
            value: s.to_string(),
        })
}

/// Builds a record from the fields of one line.
///
/// Accepted layouts:
/// * 7 fields - date, time, five channel values.
/// * 6 fields - combined "date time", five channel values.
///
/// Dates may be `YYYY-MM-DD` or `DD.MM.YYYY`; times are `HH:MM`.
fn parse_fields(fields: &[&str]) -> error::Result<record::Record> {
    let (date, time, values) = match fields.len() {
        7 => (fields[0], fields[1], &fields[2..]),
        6 => {
            let (date, time) = fields[0]
                .split_once(char::is_whitespace)
                .ok_or_else(|| error::Error::InvalidTimestamp(fields[0].to_string()))?;
            (date, time, &fields[1..])
        }
        found => return Err(error::Error::ColumnCount { expected: "6 or 7", found }),
    };
    let date = parse_date_any(date.trim())?;
    let time = record::parse_time(time)?;

    let mut parsed = [0.0f64; 5];
    for ((slot, channel), raw) in parsed.iter_mut().zip(record::Channel::ALL).zip(values) {
        *slot = parse_value(channel, raw)?;
    }
    let [self_consumption, export, import, load, production] = parsed;
    Ok(record::Record::new(date, time, self_consumption, export, import, load, production))
}

/// Reads one delimited file and classifies every line.
///
/// # Arguments
/// * `path` - Input CSV/TXT file.
/// * `settings` - Delimiter and header settings.
///
/// # Returns
/// * `anyhow::Result<Vec<LineOutcome>>` - One outcome per data line, in file order.
///
/// # Errors
/// * If the file cannot be opened.
fn parse_file(path: &std::path::Path, settings: &config::Settings) -> anyhow::Result<Vec<LineOutcome>> {
    let delimiter = settings.delimiter_byte()?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(settings.has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| anyhow::anyhow!("Cannot open file {}: {}", path.display(), e))?;

    let join_with = (delimiter as char).to_string();
    let mut outcomes = Vec::new();

    for (i, result) in reader.byte_records().enumerate() {
        let fallback_line_no = i as u64 + 1 + settings.has_headers as u64;
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                let line_no = e.position().map(|p| p.line()).unwrap_or(fallback_line_no);
                outcomes.push(LineOutcome::Invalid {
                    line_no,
                    line: String::new(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let line_no = raw.position().map(|p| p.line()).unwrap_or(fallback_line_no);
        let row = match csv::StringRecord::from_byte_record(raw) {
            Ok(row) => row,
            Err(e) => {
                let reason = e.utf8_error().to_string();
                let line = e
                    .into_byte_record()
                    .iter()
                    .map(String::from_utf8_lossy)
                    .collect::<Vec<_>>()
                    .join(join_with.as_str());
                outcomes.push(LineOutcome::Invalid { line_no, line, reason });
                continue;
            }
        };
        // runs of spaces produce empty fields
        let fields: Vec<&str> = row.iter().filter(|f| delimiter != b' ' || !f.is_empty()).collect();
        let line = fields.join(join_with.as_str());

        match parse_fields(&fields) {
            Ok(record) => outcomes.push(LineOutcome::Valid { line, record }),
            Err(e) => outcomes.push(LineOutcome::Invalid {
                line_no,
                line,
                reason: e.to_string(),
            }),
        }
    }

    anyhow::Ok(outcomes)
}

/// Expands an input path into the list of files to load.
///
/// A directory yields its `.csv` and `.txt` entries sorted by name; a file yields itself.
pub fn collect_inputs<P: AsRef<std::path::Path>>(input: P) -> anyhow::Result<Vec<std::path::PathBuf>> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(anyhow::anyhow!("Input path does not exist: {}", input.display()));
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut paths = std::fs::read_dir(input)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("txt"))
        })
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

/// Loads several files into `index`.
///
/// Files are parsed in parallel on the current rayon pool; records are then
/// inserted one file at a time in the given order, so the resulting index does
/// not depend on thread scheduling. If any file fails to parse, `index` is
/// left unchanged.
///
/// # Arguments
/// * `paths` - Files to load.
/// * `settings` - CSV settings.
/// * `index` - Destination index.
/// * `validity` - Validity log receiving every line.
///
/// # Returns
/// * `anyhow::Result<LoadReport>` - Totals over all files.
pub fn load_files(
    paths: &[std::path::PathBuf],
    settings: &config::Settings,
    index: &mut index::TimeIndex,
    validity: &mut validity_log::ValidityLog,
) -> anyhow::Result<LoadReport> {
    let progress = if paths.len() > 1 {
        let pb = indicatif::ProgressBar::new(paths.len() as u64);
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} files {msg}")?
                .progress_chars("=> "),
        );
        pb
    } else {
        indicatif::ProgressBar::hidden()
    };

    // every file must parse before the index is touched
    let parsed = paths
        .par_iter()
        .map(|path| {
            let outcomes = parse_file(path, settings);
            progress.inc(1);
            outcomes
        })
        .collect::<anyhow::Result<Vec<_>>>();
    progress.finish_with_message("parsed");
    let parsed = parsed?;

    let mut total = LoadReport::default();
    for (path, outcomes) in paths.iter().zip(parsed) {
        let mut report = LoadReport::default();
        for outcome in outcomes {
            match outcome {
                LineOutcome::Valid { line, record } => {
                    index.add_record(record);
                    validity.record_valid(&line)?;
                    report.valid += 1;
                }
                LineOutcome::Invalid { line_no, line, reason } => {
                    log::warn!("{}:{}: {}", path.display(), line_no, reason);
                    validity.record_invalid(line_no, &line, &reason)?;
                    report.invalid += 1;
                }
            }
        }
        log::info!(
            "Loaded {}: valid: {}, invalid: {}",
            path.display(),
            report.valid,
            report.invalid
        );
        total += report;
    }
    validity.flush()?;

    anyhow::Ok(total)
}

/// Loads a single file or a directory of files into `index`, logging
/// line validity to the paths named in `settings`.
pub fn load_csv<P: AsRef<std::path::Path>>(
    input: P,
    settings: &config::Settings,
    index: &mut index::TimeIndex,
) -> anyhow::Result<LoadReport> {
    let paths = collect_inputs(input)?;
    let mut validity = validity_log::ValidityLog::from_settings(settings)?;
    load_files(&paths, settings, index, &mut validity)
}
