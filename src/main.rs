use energy_tree::{cli, commands, config, index, menu, utils};

/// Main entry point of the application.
///
/// This function orchestrates the workflow:
/// 1. Initializes logging (`RUST_LOG`, default `info`).
/// 2. Parses command-line arguments and loads settings.
/// 3. Determines the number of threads used for parsing input files.
/// 4. Runs the selected subcommand or the interactive menu.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Success or an error if any step fails.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let total_start = std::time::Instant::now();
    let args = cli::Args::parse()?;
    let settings = config::load_settings(args.config.as_ref())?;

    let effective_threads = utils::effective_threads(args.threads)?;
    log::info!("Using {} thread(s)", effective_threads);
    let pool = utils::configure_thread_pool(effective_threads)?;

    match &args.command {
        cli::Command::Menu { data } => {
            let index = match data {
                Some(path) => pool.install(|| utils::load_data(path, &settings))?,
                None => index::TimeIndex::new(),
            };
            let input = std::io::BufReader::new(std::io::stdin());
            let mut session = menu::Menu::new(input, std::io::stdout(), &settings, index);
            pool.install(|| session.run())?;
        }
        command => {
            let mut out = std::io::stdout();
            pool.install(|| commands::run(command, &settings, &mut out))?;
        }
    }

    log::debug!("Finished in {:?} seconds", total_start.elapsed().as_secs_f64());
    Ok(())
}
