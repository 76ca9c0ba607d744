//! Progress bar for long link operations.
//!
//! The link work runs on a scoped worker thread and reports over an MPSC
//! channel; the calling thread drains the channel into an `indicatif` bar.

use std::sync::mpsc::{self, Sender};

use gba_link_core::TransferProgress;
use indicatif::{ProgressBar, ProgressStyle};

/// What the bar counts.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BarUnit {
    Words,
    Bytes,
}

fn bar_style(unit: BarUnit) -> ProgressStyle {
    let template = match unit {
        BarUnit::Words => "  {spinner:.cyan} {msg:<18} [{bar:30.cyan/blue}] {pos}/{len} words",
        BarUnit::Bytes => {
            "  {spinner:.cyan} {msg:<18} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})"
        }
    };
    ProgressStyle::with_template(template)
        .expect("static pattern")
        .progress_chars("=> ")
        .tick_chars("/-\\|")
}

/// Run `work` on a worker thread while drawing its progress.
///
/// The bar is hidden when `quiet` is set. `label` is shown until the first
/// phase update replaces it.
pub(crate) fn run_with_bar<T, F>(quiet: bool, unit: BarUnit, label: &str, work: F) -> T
where
    T: Send,
    F: FnOnce(&Sender<TransferProgress>) -> T + Send,
{
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(bar_style(unit));
    pb.set_message(label.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let (tx, rx) = mpsc::channel();

    let result = std::thread::scope(|s| {
        let worker = s.spawn(move || work(&tx));

        for update in rx {
            apply(&pb, &update);
        }

        match worker.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    });

    pb.finish_and_clear();
    result
}

fn apply(pb: &ProgressBar, update: &TransferProgress) {
    match update {
        TransferProgress::Phase { name } => pb.set_message(name.to_string()),
        TransferProgress::Words { sent, total } => {
            pb.set_length(*total);
            pb.set_position(*sent);
        }
        TransferProgress::Bytes { done, total } => {
            pb.set_length(*total);
            pb.set_position(*done);
        }
        TransferProgress::Completed => pb.set_message("done"),
        TransferProgress::Failed { message } => {
            pb.abandon_with_message(message.clone());
        }
    }
}
