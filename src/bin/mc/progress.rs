/// Progress bar for the `mc` executable, fed by the simulations' progress reports
pub (super) struct Progress(Mutex<Inner>);

struct Inner {
    photons_requested: u64,
    photons_done: u64,
    bar: ProgressBar,
}

impl Progress {

    pub (super) fn new(photons_requested: u64) -> Self {
        let bar = ProgressBar::new(photons_requested);
        bar.set_style(ProgressStyle::default_bar()
                      .template("[{elapsed_precise}] {wide_bar} {pos}/{len} photons ({eta_precise})")
                      .unwrap_or_else(|_| ProgressStyle::default_bar())
        );
        bar.tick();
        Self(Mutex::new(Inner { photons_requested, photons_done: 0, bar }))
    }

    pub (super) fn photons_done(&self, n: u64) {
        if let Ok(mut inner) = self.0.lock() {
            inner.photons_done += n;
            inner.bar.inc(n);
        }
    }

    pub (super) fn final_report(&self) {
        if let Ok(inner) = self.0.lock() {
            inner.bar.finish_and_clear();
            println!("{} / {} photons transported",
                     group_digits(inner.photons_done),
                     group_digits(inner.photons_requested));
        }
    }
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::sync::Mutex;
use indicatif::{ProgressBar, ProgressStyle};
use mcphoton::utils::group_digits;
