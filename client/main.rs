#![allow(unknown_lints, dangerous_implicit_autorefs)]

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;
extern crate colored;
extern crate pretty_env_logger;
extern crate serde_json;

extern crate plotkeeper_core;

mod boot;
mod reporter;

use std::process;

use plotkeeper_core::env;

use boot::*;

fn main() {
    pretty_env_logger::init();

    // Parse cmdline
    let cmdline = parse_cmdline();
    println!("{}", env::get_client_name());

    let workdir = match cmdline.value_of("workdir") {
        Some(d) => d.into(),
        None => env::get_storage_dir()
            .unwrap_or_else(|| fail("Could not automatically find a work directory for plotkeeper! Please pass --workdir."))
    };
    if let Err(e) = env::prepare_storage_dir(&workdir) {
        fail(&format!("Could not prepare work directory {}: {}", workdir.display(), e));
    }

    let config = load_config(&cmdline, &workdir).unwrap_or_else(|e| fail(&e.to_string()));
    debug!("Using work directory {}", workdir.display());

    let res = match cmdline.subcommand() {
        ("status", Some(sub)) => reporter::status(&workdir, &config, sub.value_of("plot")),
        ("purge", Some(sub)) => purge(&workdir, sub.value_of("plot").unwrap_or_default()),
        ("config", _) => print_config(&config),
        ("simulate", Some(sub)) => simulate(&config, sub),
        _ => {
            println!("{}", cmdline.usage());
            Ok(())
        }
    };

    if let Err(e) = res {
        fail(&e.to_string());
    }
}

fn fail(msg: &str) -> ! {
    error!("{}", msg);
    eprintln!("{}", msg);
    process::exit(1)
}
