use crate::CLAP_STYLING;
use clap::{arg, command};

fn source_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"local" <PATH>)
            .required(false)
            .help("Read the GeoJSON dataset from a file path or URL instead of the API")
            .conflicts_with("api"),
    )
    .arg(
        arg!(--"api" <URL>)
            .required(false)
            .help("Base URL of the GeoFeedback API (falls back to the local dataset)")
            .conflicts_with("local"),
    )
}

fn filter_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"risk" <LEVEL>)
            .required(false)
            .help("Risk level filter: all, 0, 1, 2 or 3")
            .default_value("all"),
    )
    .arg(
        arg!(--"category" <NAME>)
            .required(false)
            .help("Category filter: all, Educación, Salud, Emergencias, Gobierno, Comercio")
            .default_value("all"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("geofeedback")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("geofeedback")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("Configuration file (default: ~/.config/geofeedback/config.toml)"),
        )
        .subcommand_required(false)
        .subcommand(source_args(
            command!("view").about("Open the interactive risk map in the terminal"),
        ))
        .subcommand(filter_args(source_args(
            command!("stats").about("Print facility counts per risk level"),
        )))
        .subcommand(source_args(
            command!("search")
                .about("Search facilities by name or category")
                .arg(arg!(<QUERY>).help("At least two characters")),
        ))
        .subcommand(filter_args(source_args(
            command!("report")
                .about("Generate an infrastructure risk report")
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )))
        .subcommand(
            command!("init")
                .about("Writes the default GeoFeedback configuration file")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location of the configuration file (default: --config or ~/.config/geofeedback/config.toml)"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing configuration file without asking")
                        .required(false),
                ),
        )
}
