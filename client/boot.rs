use clap::{Arg, ArgMatches, App, SubCommand};
use serde_json;
use std::path::Path;
use std::time::Duration;

use plotkeeper_core::config::Config;
use plotkeeper_core::env::{CONFIG_FILE, OUTLINES_FILE};
use plotkeeper_core::error::Error;
use plotkeeper_core::host::MemoryHost;
use plotkeeper_core::outline::OutlineStore;
use plotkeeper_core::primitives::{BoundingBox, Coord, OwnerId};
use plotkeeper_core::service::PlotService;
use plotkeeper_core::storage::{Encoding, Storage};
use plotkeeper_core::time::{ManualClock, Time};
use plotkeeper_core::timed::Timers;

use reporter;

/// Loads command line arguments, and returns them as a clap ArgMatches obj
pub fn parse_cmdline<'a>() -> ArgMatches<'a> {
    let workdir_arg = Arg::with_name("workdir")
        .short("w")
        .long("workdir")
        .value_name("DIR")
        .global(true)
        .help("Sets the directory where plotkeeper keeps its timers and outline records");

    let config_arg = Arg::with_name("config")
        .short("c")
        .long("config")
        .value_name("FILE")
        .global(true)
        .help("Configuration file to use instead of config.json in the work directory");

    App::new("Plotkeeper")
        .version(crate_version!())
        .author(crate_authors!("\n"))
        .about("Inspects and maintains the persisted state of the plot manager")
        .arg(workdir_arg)
        .arg(config_arg)
        .subcommand(SubCommand::with_name("status")
            .about("Lists active lifetimes, vertical expansions, flag rentals and outlines")
            .arg(Arg::with_name("plot")
                .help("Only show this plot")))
        .subcommand(SubCommand::with_name("purge")
            .about("Drops every timer and the outline record of a plot without touching the world")
            .arg(Arg::with_name("plot")
                .required(true)
                .help("Id of the plot, e.g. steve_1")))
        .subcommand(SubCommand::with_name("config")
            .about("Prints the effective configuration"))
        .subcommand(SubCommand::with_name("simulate")
            .about("Runs a flag rental against an in-memory world and prints what its owner is told")
            .arg(Arg::with_name("flag")
                .long("flag")
                .value_name("NAME")
                .default_value("pvp"))
            .arg(Arg::with_name("seconds")
                .long("seconds")
                .value_name("NUM")
                .default_value("600")))
        .get_matches()
}

/// The configuration named on the command line, else the one in the work directory, else the
/// defaults.
pub fn load_config(cmdline: &ArgMatches, workdir: &Path) -> Result<Config, Error> {
    if let Some(path) = cmdline.value_of("config") {
        return Config::load(Path::new(path))
    }

    let path = workdir.join(CONFIG_FILE);
    if path.is_file() {
        info!("Loading configuration from {}", path.display());
        Config::load(&path)
    } else {
        debug!("No {} in {}, using defaults", CONFIG_FILE, workdir.display());
        Ok(Config::default())
    }
}

pub fn purge(workdir: &Path, plot: &str) -> Result<(), Error> {
    let storage = Storage::Directory(workdir.to_owned());
    let mut timers = Timers::open(&storage)?;
    let mut outlines = OutlineStore::open(storage.table(OUTLINES_FILE, Encoding::Bincode))?;

    let dropped = timers.forget_plot(plot);
    let record = outlines.take(plot);
    info!("Purged plot {}: {} timer(s), outline record {}", plot, dropped,
        if record.is_some() { "removed" } else { "absent" });

    println!("Dropped {} timer(s) of {}.", dropped, plot);
    if let Some(record) = record {
        println!("Forgot the outline record of {} ({} voxel(s)); its markers are left in the world.",
            plot, record.len());
    }
    Ok(())
}

pub fn print_config(config: &Config) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Rent a flag on a fresh plot in an in-memory world and let it run out, minute by minute.
pub fn simulate(config: &Config, cmdline: &ArgMatches) -> Result<(), Error> {
    let flag = cmdline.value_of("flag").unwrap_or("pvp");
    let seconds = cmdline.value_of("seconds").unwrap_or("600").parse::<u64>()
        .map_err(|e| Error::Config(format!("Invalid value for seconds: {}", e)))?;

    let steve: OwnerId = "steve".into();
    let mut host = MemoryHost::new(-64, 319);
    host.grid.fill(BoundingBox::new(Coord(-64, 62, -64), Coord(64, 62, 64)), &"minecraft:grass_block".into());
    host.identity.join(&steve, "Steve");
    host.economy.set_balance(&steve, config.creation_price + seconds * 100);

    let clock = ManualClock::new(Time::current());
    let mut service = PlotService::open(config.clone(), host, Box::new(clock.clone()), &Storage::Volatile)?;

    let plot = service.create_plot(&steve, Coord(0, 64, 0))?;
    println!("Claimed {} at {}", plot.id, plot.bounds);
    let expires_at = service.activate_flag(&steve, &plot.id, flag, seconds)?;
    println!("Rented '{}' until {:?}", flag, expires_at);

    let mut seen = 0;
    service.tick();
    while service.remaining_flag(&plot.id, flag).is_some() {
        clock.advance(Duration::from_secs(60).min(service.remaining_flag(&plot.id, flag).unwrap_or_default()));
        service.tick();

        let notices = service.host().notices_for(&steve);
        for notice in &notices[seen..] {
            reporter::notice(service.now(), notice);
        }
        seen = notices.len();
    }
    Ok(())
}
