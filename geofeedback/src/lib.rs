// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    filtered_statistics, format_search_rows, init_target, is_affirmative, parse_filters,
    read_config,
};
