use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use nomad_bff::BffArchive;
use nomad_inspect::report;
use nomad_save::{ParsedSave, ENGINE_VERSION};

enum Command {
    Bff(PathBuf),
    Ngd(PathBuf),
}

fn usage() {
    eprintln!("Usage: nomad-inspect <bff|ngd> <file> [OPTIONS]");
    eprintln!("  bff <file>    List the header and chunk table of an asset archive");
    eprintln!("  ngd <file>    List the metadata, sections and fields of a save");
    eprintln!("  --json        Print the report as JSON");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut json = false;
    let mut command: Option<Command> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => json = true,
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            kind @ ("bff" | "ngd") if command.is_none() => {
                i += 1;
                let Some(path) = args.get(i) else {
                    eprintln!("Missing file argument for '{kind}'");
                    process::exit(1);
                };
                let path = PathBuf::from(path);
                command = Some(if kind == "bff" {
                    Command::Bff(path)
                } else {
                    Command::Ngd(path)
                });
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let Some(command) = command else {
        usage();
        process::exit(1);
    };

    let result = match command {
        Command::Bff(path) => inspect_bff(&path, json),
        Command::Ngd(path) => inspect_ngd(&path, json),
    };
    if let Err(err) = result {
        eprintln!("ERROR: {err}");
        process::exit(1);
    }
}

fn inspect_bff(path: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    let archive = BffArchive::open(path)?;
    let report = report::bff_report(&archive);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::format_bff(&report));
    }
    Ok(())
}

fn inspect_ngd(path: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    log::debug!("reading save {}", path.display());
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let save = ParsedSave::parse(&path.display().to_string(), bytes, ENGINE_VERSION)?;

    let report = report::ngd_report(&save);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::format_ngd(&report));
    }
    Ok(())
}
