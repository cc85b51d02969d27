use std::sync::{Arc, Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};

use crate::downloader::ProgressFn;

const BAR_TEMPLATE: &str = "{msg} [{bar:30}] {bytes}/{total_bytes}";
const SPINNER_TEMPLATE: &str = "{spinner} {msg} {bytes}";

/// Returns the default progress function, which draws a progress bar on stderr.
///
/// A spinner is shown instead when the server does not announce a length.
pub fn default_progress_fn() -> ProgressFn {
    let slot: Mutex<Option<ProgressBar>> = Mutex::new(None);
    Arc::new(
        move |src: &str, current: u64, total: u64, mib_per_sec: f64, complete: bool| {
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            let bar = slot.get_or_insert_with(|| new_bar(total));
            bar.set_message(format!("downloading {src} ({mib_per_sec:.2} MiB/s)"));
            bar.set_position(current);
            if complete {
                bar.finish();
                *slot = None;
            }
        },
    )
}

fn new_bar(total: u64) -> ProgressBar {
    let (bar, template) = if total > 0 {
        (ProgressBar::new(total), BAR_TEMPLATE)
    } else {
        (ProgressBar::new_spinner(), SPINNER_TEMPLATE)
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}
