use crate::query;
use crate::record;
use crate::rollup;

/// Range arguments shared by every query subcommand.
#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub data: std::path::PathBuf,
    /// `None` falls back to the configured default channel.
    pub channel: Option<record::Channel>,
    pub all_channels: bool,
    pub interval: query::Interval,
}

#[derive(Debug, Clone)]
pub enum Command {
    Import {
        input: std::path::PathBuf,
        output: std::path::PathBuf,
    },
    Sum(QueryArgs),
    Average(QueryArgs),
    Compare {
        query: QueryArgs,
        second: query::Interval,
    },
    Search {
        query: QueryArgs,
        value: f64,
        tolerance: f64,
    },
    Summary {
        query: QueryArgs,
        granularity: rollup::Granularity,
    },
    Menu {
        data: Option<std::path::PathBuf>,
    },
}

/// Structure representing command-line arguments.
#[derive(Debug, Clone)]
pub struct Args {
    pub config: Option<std::path::PathBuf>,
    pub threads: Option<usize>,
    pub command: Command,
}

impl Args {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> anyhow::Result<Self> {
        Self::from_matches(&command().get_matches())
    }

    pub fn try_parse_from<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &clap::ArgMatches) -> anyhow::Result<Self> {
        let command = match matches.subcommand() {
            Some(("import", m)) => Command::Import {
                input: std::path::PathBuf::from(required::<String>(m, "input")?),
                output: std::path::PathBuf::from(required::<String>(m, "output")?),
            },
            Some(("sum", m)) => Command::Sum(query_args(m)?),
            Some(("average", m)) => Command::Average(query_args(m)?),
            Some(("compare", m)) => Command::Compare {
                query: query_args(m)?,
                second: query::Interval::new(
                    required::<chrono::NaiveDateTime>(m, "from2")?,
                    required::<chrono::NaiveDateTime>(m, "to2")?,
                ),
            },
            Some(("search", m)) => Command::Search {
                query: query_args(m)?,
                value: required::<f64>(m, "value")?,
                tolerance: required::<f64>(m, "tolerance")?,
            },
            Some(("summary", m)) => Command::Summary {
                query: query_args(m)?,
                granularity: required::<String>(m, "by")?.parse()?,
            },
            Some(("menu", m)) => Command::Menu {
                data: m.get_one::<String>("data").map(std::path::PathBuf::from),
            },
            _ => return Err(anyhow::anyhow!("No subcommand given, see --help")),
        };

        // global flags may be given before or after the subcommand
        let sub = matches.subcommand().map(|(_, m)| m);
        let config = sub
            .and_then(|m| m.get_one::<String>("config"))
            .or_else(|| matches.get_one::<String>("config"))
            .map(std::path::PathBuf::from);
        let threads = sub
            .and_then(|m| m.get_one::<usize>("threads"))
            .or_else(|| matches.get_one::<usize>("threads"))
            .cloned();

        Ok(Args { config, threads, command })
    }
}

fn required<T: Clone + Send + Sync + 'static>(m: &clap::ArgMatches, id: &str) -> anyhow::Result<T> {
    m.get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Missing required argument --{}", id))
}

fn query_args(m: &clap::ArgMatches) -> anyhow::Result<QueryArgs> {
    Ok(QueryArgs {
        data: std::path::PathBuf::from(required::<String>(m, "data")?),
        channel: m.get_one::<record::Channel>("channel").cloned(),
        // `--all` exists only on sum, average and compare
        all_channels: m
            .try_get_one::<bool>("all")
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false),
        interval: query::Interval::new(
            required::<chrono::NaiveDateTime>(m, "from")?,
            required::<chrono::NaiveDateTime>(m, "to")?,
        ),
    })
}

fn query_command(name: &'static str, about: &'static str) -> clap::Command {
    clap::Command::new(name)
        .about(about)
        .arg(
            clap::Arg::new("data")
                .short('d')
                .long("data")
                .help("CSV/TXT file, directory of CSV files, or .bin snapshot")
                .required(true)
                .num_args(1),
        )
        .arg(
            clap::Arg::new("channel")
                .short('c')
                .long("channel")
                .help("Channel: self-consumption, export, import, load, production (Polish names accepted)")
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_channel)),
        )
        .arg(
            clap::Arg::new("from")
                .long("from")
                .help("Range start, \"YYYY-MM-DD HH:MM\" (inclusive)")
                .required(true)
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_timestamp)),
        )
        .arg(
            clap::Arg::new("to")
                .long("to")
                .help("Range end, \"YYYY-MM-DD HH:MM\" (inclusive)")
                .required(true)
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_timestamp)),
        )
}

fn all_flag() -> clap::Arg {
    clap::Arg::new("all")
        .short('a')
        .long("all")
        .help("Report all five channels")
        .action(clap::ArgAction::SetTrue)
        .conflicts_with("channel")
}

/// Command-line definition using the Clap builder.
pub fn command() -> clap::Command {
    clap::Command::new("energy-tree")
        .version("0.1.0")
        .about("Index energy measurements by year/month/day/quarter and run range queries")
        .subcommand_required(true)
        .arg(
            clap::Arg::new("config")
                .long("config")
                .help("JSON settings file")
                .global(true)
                .num_args(1),
        )
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of threads used to parse input files (default: all available)")
                .global(true)
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .subcommand(
            clap::Command::new("import")
                .about("Load CSV/TXT files and save them as a binary snapshot")
                .arg(
                    clap::Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("Input CSV/TXT file or directory")
                        .required(true)
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output snapshot (.bin)")
                        .required(true)
                        .num_args(1),
                ),
        )
        .subcommand(query_command("sum", "Sum of a channel over a range").arg(all_flag()))
        .subcommand(query_command("average", "Average of a channel over a range").arg(all_flag()))
        .subcommand(
            query_command("compare", "Difference of sums: second range minus first range")
                .arg(all_flag())
                .arg(
                    clap::Arg::new("from2")
                        .long("from2")
                        .help("Second range start, \"YYYY-MM-DD HH:MM\"")
                        .required(true)
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_timestamp)),
                )
                .arg(
                    clap::Arg::new("to2")
                        .long("to2")
                        .help("Second range end, \"YYYY-MM-DD HH:MM\"")
                        .required(true)
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_timestamp)),
                ),
        )
        .subcommand(
            query_command("search", "Records whose value lies within value ± tolerance")
                .arg(
                    clap::Arg::new("value")
                        .short('v')
                        .long("value")
                        .required(true)
                        .num_args(1)
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    clap::Arg::new("tolerance")
                        .long("tolerance")
                        .required(true)
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_tolerance)),
                ),
        )
        .subcommand(
            query_command("summary", "Per-day or per-quarter totals of a channel").arg(
                clap::Arg::new("by")
                    .long("by")
                    .help("Bucket size")
                    .value_parser(["day", "quarter"])
                    .default_value("day")
                    .num_args(1),
            ),
        )
        .subcommand(
            clap::Command::new("menu").about("Interactive menu").arg(
                clap::Arg::new("data")
                    .short('d')
                    .long("data")
                    .help("Data to load on start")
                    .num_args(1),
            ),
        )
}

/// Validates that the number of threads is a positive integer.
fn parse_usize_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

fn parse_tolerance(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(t) if t >= 0.0 && t.is_finite() => Ok(t),
        Ok(_) => Err("Tolerance must be a non-negative number".to_string()),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

fn parse_channel(s: &str) -> Result<record::Channel, String> {
    s.parse::<record::Channel>().map_err(|e| e.to_string())
}

fn parse_timestamp(s: &str) -> Result<chrono::NaiveDateTime, String> {
    query::parse_timestamp(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sum_command() {
        let args = Args::try_parse_from([
            "energy-tree", "sum", "-d", "data.csv", "-c", "autokonsumpcja",
            "--from", "2023-01-01 12:00", "--to", "2023-01-01 14:00",
        ])
        .unwrap();
        match args.command {
            Command::Sum(q) => {
                assert_eq!(q.channel, Some(record::Channel::SelfConsumption));
                assert!(!q.all_channels);
                assert_eq!(q.interval, query::Interval::parse("2023-01-01 12:00", "2023-01-01 14:00").unwrap());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_compare_and_search() {
        let args = Args::try_parse_from([
            "energy-tree", "--threads", "2", "compare", "-d", "tree.bin", "--all",
            "--from", "2023-01-01 12:00", "--to", "2023-01-01 13:00",
            "--from2", "2023-01-01 13:00", "--to2", "2023-01-01 14:00",
        ])
        .unwrap();
        assert_eq!(args.threads, Some(2));
        assert!(matches!(args.command, Command::Compare { ref query, .. } if query.all_channels));

        let args = Args::try_parse_from([
            "energy-tree", "search", "-d", "tree.bin", "-c", "export", "-v", "52",
            "--tolerance", "3", "--from", "2023-01-01 00:00", "--to", "2023-01-02 00:00",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Search { value, tolerance, .. } if value == 52.0 && tolerance == 3.0));
    }

    #[test]
    fn search_and_summary_have_no_all_flag() {
        let args = Args::try_parse_from([
            "energy-tree", "summary", "-d", "x.csv", "--by", "quarter",
            "--from", "2023-01-01 00:00", "--to", "2023-01-02 00:00",
        ])
        .unwrap();
        match args.command {
            Command::Summary { query, granularity } => {
                assert!(!query.all_channels);
                assert_eq!(granularity, rollup::Granularity::Quarter);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::try_parse_from([
            "energy-tree", "search", "-d", "x.csv", "-v", "1", "--tolerance", "0",
            "--from", "2023-01-01 00:00", "--to", "2023-01-02 00:00",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Search { ref query, .. } if !query.all_channels));

        assert!(Args::try_parse_from([
            "energy-tree", "summary", "-d", "x.csv", "--all",
            "--from", "2023-01-01 00:00", "--to", "2023-01-02 00:00",
        ])
        .is_err());
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Args::try_parse_from(["energy-tree", "sum", "-d", "x", "--from", "01.01.2023 12:00", "--to", "2023-01-01 14:00"]).is_err());
        assert!(Args::try_parse_from(["energy-tree", "sum", "-d", "x", "-c", "voltage", "--from", "2023-01-01 12:00", "--to", "2023-01-01 14:00"]).is_err());
        assert!(Args::try_parse_from(["energy-tree", "--threads", "0", "menu"]).is_err());
        assert!(Args::try_parse_from(["energy-tree", "search", "-d", "x", "-v", "1", "--tolerance", "-1", "--from", "2023-01-01 12:00", "--to", "2023-01-01 14:00"]).is_err());
        assert!(Args::try_parse_from(["energy-tree"]).is_err());
    }

    #[test]
    fn definition_is_consistent() {
        command().debug_assert();
    }
}
