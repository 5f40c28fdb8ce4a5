use commands::command_argument_builder;
use geofeedback::handlers::{
    handle_init, handle_report, handle_search, handle_stats, handle_view, load_config,
};
use geofeedback_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let config_path = chosen_command.get_one::<String>("config").map(String::as_str);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(config_path, primary_command),
        Some((name, primary_command)) => {
            let config = load_config(config_path, primary_command);
            match name {
                "view" => handle_view(config).await,
                "stats" => handle_stats(config, primary_command, quiet).await,
                "search" => handle_search(config, primary_command, quiet).await,
                "report" => handle_report(config, primary_command, quiet).await,
                _ => unreachable!("clap should ensure we don't get here"),
            }
        }
        None => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
