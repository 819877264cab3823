use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{crate_version, App, Arg};
use folio::build::{build_site, Options};
use folio::config::{read_last_run, write_last_run, Config};
use folio::scaffold::create_site;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let matches = App::new("folio")
        .version(crate_version!())
        .about("Builds a static site from a directory of plain-text posts")
        .arg(
            Arg::with_name("source")
                .short("s")
                .long("source")
                .value_name("DIR")
                .takes_value(true)
                .default_value(".")
                .help("The site directory (or any directory under it)"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("DIR")
                .takes_value(true)
                .default_value("_site")
                .help("The directory to write the built site to"),
        )
        .arg(
            Arg::with_name("create")
                .short("c")
                .long("create")
                .value_name("DIR")
                .takes_value(true)
                .help("Scaffolds a new site in an existing directory and exits"),
        )
        .arg(
            Arg::with_name("dry-run")
                .short("d")
                .long("dry-run")
                .help("Parses and renders everything but writes nothing"),
        )
        .arg(
            Arg::with_name("updated")
                .short("u")
                .long("updated")
                .help("Only rewrites post pages changed since the last build"),
        )
        .get_matches();

    if let Some(dir) = matches.value_of("create") {
        create_site(Path::new(dir), Utc::now())?;
        log::info!("created a new site in `{}`", dir);
        return Ok(());
    }

    let source = PathBuf::from(matches.value_of("source").unwrap_or("."));
    let output = PathBuf::from(matches.value_of("output").unwrap_or("_site"));
    if !source.is_dir() {
        return Err(anyhow!(
            "Source directory `{}` does not exist",
            source.display()
        ));
    }

    let dry_run = matches.is_present("dry-run");
    if !dry_run {
        std::fs::create_dir_all(&output)?;
    }
    let config = Config::from_directory(&source.canonicalize()?, &output)?;

    let updated_since = if matches.is_present("updated") {
        let last_run = read_last_run(&config.site_directory)?;
        if last_run.is_none() {
            log::info!("no previous build recorded; rebuilding every page");
        }
        last_run
    } else {
        None
    };

    let started = Utc::now();
    let summary = build_site(
        &config,
        &Options {
            dry_run,
            updated_since,
        },
    )?;
    if summary.pages_skipped > 0 {
        log::warn!(
            "{} pages were skipped; see the warnings above",
            summary.pages_skipped
        );
    }
    if dry_run {
        log::info!("dry run complete; no files written");
    } else {
        write_last_run(&config.site_directory, started)?;
    }
    Ok(())
}
