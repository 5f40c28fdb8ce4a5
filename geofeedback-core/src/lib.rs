pub mod cluster;
pub mod config;
pub mod controller;
pub mod filter;
pub mod layers;
pub mod load;
pub mod map;
pub mod report;
pub mod search;
pub mod stats;
pub mod style;
pub mod zones;

use colored::Colorize;

pub use config::AppConfig;
pub use controller::MapController;
pub use filter::{CategoryFilter, FilterState, RiskFilter};

pub fn print_banner() {
    let banner = r#"
   ____           _____            _ _                _
  / ___| ___  ___|  ___|__  ___  __| | |__   __ _  ___| | __
 | |  _ / _ \/ _ \ |_ / _ \/ _ \/ _` | '_ \ / _` |/ __| |/ /
 | |_| |  __/ (_) |  _|  __/  __/ (_| | |_) | (_| | (__|   <
  \____|\___|\___/|_|  \___|\___|\__,_|_.__/ \__,_|\___|_|\_\
"#;
    eprintln!("{}", banner.cyan());
    eprintln!(
        "  {} {}\n",
        "infraestructura y riesgo de inundación · Papudo".dimmed(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
}
