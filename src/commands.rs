use crate::cli;
use crate::config;
use crate::csv_processor;
use crate::index;
use crate::persistence;
use crate::query;
use crate::record;
use crate::rollup;
use crate::utils;
use crate::validity_log;

/// Executes one parsed subcommand, writing human-readable results to `out`.
///
/// `Menu` is handled by the caller, since it needs the terminal.
pub fn run<W: std::io::Write>(
    command: &cli::Command,
    settings: &config::Settings,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        cli::Command::Import { input, output } => {
            let start = std::time::Instant::now();
            let paths = csv_processor::collect_inputs(input)?;
            if paths.is_empty() {
                return Err(anyhow::anyhow!("No CSV/TXT files found in {}", input.display()));
            }
            let mut index = index::TimeIndex::new();
            let mut validity = validity_log::ValidityLog::from_settings(settings)?;
            let report = csv_processor::load_files(&paths, settings, &mut index, &mut validity)?;
            write_load_report(out, &report)?;
            persistence::save_snapshot(&index, output)?;
            writeln!(
                out,
                "✅ Saved {} records to {} in {:?} seconds",
                index.len(),
                output.display(),
                start.elapsed().as_secs_f64()
            )?;
        }
        cli::Command::Sum(q) => {
            let index = utils::load_data(&q.data, settings)?;
            if q.all_channels {
                let sums = query::calculate_sums(&index, &q.interval);
                write_channel_values(out, &format!("Sums over {}", q.interval), &sums)?;
            } else {
                let channel = q.channel.unwrap_or(settings.default_channel);
                let sum = query::calculate_sum(&index, &q.interval, channel);
                write_sum(out, &q.interval, channel, sum)?;
            }
        }
        cli::Command::Average(q) => {
            let index = utils::load_data(&q.data, settings)?;
            if q.all_channels {
                match query::calculate_averages(&index, &q.interval) {
                    Some(avgs) => write_channel_values(out, &format!("Averages over {}", q.interval), &avgs)?,
                    None => writeln!(out, "No records in {}", q.interval)?,
                }
            } else {
                let channel = q.channel.unwrap_or(settings.default_channel);
                let avg = query::calculate_average(&index, &q.interval, channel);
                write_average(out, &q.interval, channel, avg)?;
            }
        }
        cli::Command::Compare { query: q, second } => {
            let index = utils::load_data(&q.data, settings)?;
            if q.all_channels {
                let diff = query::compare_all(&index, &q.interval, second);
                write_channel_values(out, &format!("Difference {} - {}", second, q.interval), &diff)?;
            } else {
                let channel = q.channel.unwrap_or(settings.default_channel);
                let diff = query::compare_ranges(&index, &q.interval, second, channel);
                write_compare(out, &q.interval, second, channel, diff)?;
            }
        }
        cli::Command::Search { query: q, value, tolerance } => {
            let index = utils::load_data(&q.data, settings)?;
            let channel = q.channel.unwrap_or(settings.default_channel);
            let found = query::search_records(&index, *value, *tolerance, &q.interval, channel);
            write_search(out, &found, channel, *value, *tolerance)?;
        }
        cli::Command::Summary { query: q, granularity } => {
            let index = utils::load_data(&q.data, settings)?;
            let channel = q.channel.unwrap_or(settings.default_channel);
            let bars = rollup::rollup(&index, &q.interval, channel, *granularity);
            writeln!(out, "📈 {} per {:?} over {}", channel, granularity, q.interval)?;
            if bars.is_empty() {
                writeln!(out, "No records in range")?;
            }
            for bar in &bars {
                writeln!(out, "{}", bar)?;
            }
        }
        cli::Command::Menu { .. } => {
            return Err(anyhow::anyhow!("The interactive menu is not a batch command"));
        }
    }
    anyhow::Ok(())
}

pub fn write_load_report<W: std::io::Write>(out: &mut W, report: &csv_processor::LoadReport) -> anyhow::Result<()> {
    writeln!(out, "Loading finished. Valid: {}, invalid: {}", report.valid, report.invalid)?;
    Ok(())
}

pub fn write_sum<W: std::io::Write>(
    out: &mut W,
    interval: &query::Interval,
    channel: record::Channel,
    sum: f64,
) -> anyhow::Result<()> {
    writeln!(out, "Sum of {} over {}: {:.2}", channel, interval, sum)?;
    Ok(())
}

pub fn write_average<W: std::io::Write>(
    out: &mut W,
    interval: &query::Interval,
    channel: record::Channel,
    average: Option<f64>,
) -> anyhow::Result<()> {
    match average {
        Some(avg) => writeln!(out, "Average of {} over {}: {:.2}", channel, interval, avg)?,
        None => writeln!(out, "Average of {} over {}: no records in range", channel, interval)?,
    }
    Ok(())
}

pub fn write_compare<W: std::io::Write>(
    out: &mut W,
    first: &query::Interval,
    second: &query::Interval,
    channel: record::Channel,
    diff: f64,
) -> anyhow::Result<()> {
    writeln!(out, "Difference of {} sums, {} - {}: {:.2}", channel, second, first, diff)?;
    Ok(())
}

pub fn write_search<W: std::io::Write>(
    out: &mut W,
    found: &[&record::Record],
    channel: record::Channel,
    value: f64,
    tolerance: f64,
) -> anyhow::Result<()> {
    writeln!(
        out,
        "Found {} record(s) with {} in [{:.2}, {:.2}]",
        found.len(),
        channel,
        value - tolerance,
        value + tolerance
    )?;
    for r in found {
        writeln!(out, " - {}", r)?;
    }
    Ok(())
}

pub fn write_channel_values<W: std::io::Write>(
    out: &mut W,
    title: &str,
    values: &record::ChannelValues,
) -> anyhow::Result<()> {
    writeln!(out, "{}:", title)?;
    for channel in record::Channel::ALL {
        writeln!(out, " - {}: {:.2}", channel, values.get(channel))?;
    }
    Ok(())
}
