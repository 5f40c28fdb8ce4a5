use geofeedback_loader::{DataLoader, DataSource, LoadError, LoadOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

/// Options for a single dataset load
pub struct LoadOptions {
    pub source: DataSource,
    /// No timeout unless set.
    pub timeout: Option<Duration>,
    /// Show a spinner as the loading indicator (CLI only).
    pub show_progress_bars: bool,
}

impl LoadOptions {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            timeout: None,
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting load progress
pub type LoadProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Load the dataset, showing a spinner while the fetch is pending.
///
/// On success the spinner is cleared. On failure it stays on screen with the
/// error message.
pub async fn execute_load(
    options: LoadOptions,
    progress_callback: Option<LoadProgressCallback>,
) -> Result<LoadOutcome, LoadError> {
    let LoadOptions {
        source,
        timeout,
        show_progress_bars,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Cargando datos...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let pb_clone = progress_bar.clone();
    let loader_callback: geofeedback_loader::ProgressCallback = Arc::new(move |message: String| {
        if let Some(ref pb) = pb_clone {
            pb.set_message(message.clone());
        }
        if let Some(ref callback) = progress_callback {
            callback(message);
        }
    });

    let loader = DataLoader::with_timeout(source, timeout)?.with_progress_callback(loader_callback);
    let result = loader.load().await;

    if let Some(pb) = progress_bar {
        match &result {
            Ok(_) => pb.finish_and_clear(),
            Err(e) => pb.abandon_with_message(format!("✗ {}", e)),
        }
    }

    result
}
