//! Periodic peak sampling around a synchronous unit of work.
//!
//! Readings are taken at t=0 and then once per period until the work returns,
//! so spikes shorter than a period can be missed and the reported peak is a
//! lower bound.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::common::time;

use super::domain::{bytes_to_mb, Measurement, UsageProbe};

/// Run `work` while polling `probe` every `period`; report the highest reading.
///
/// The sampling thread is always stopped and joined before this returns,
/// whether `work` succeeds, fails or panics. Errors from `work` are returned
/// unchanged and no measurement is produced for them.
pub fn measure<T, E, F>(probe: &dyn UsageProbe, period: Duration, work: F) -> Result<Measurement<T>, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let start = Instant::now();
    let peak = AtomicU64::new(probe.used_bytes());
    let samples = AtomicU64::new(1);
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let (peak_ref, samples_ref) = (&peak, &samples);
    let result = thread::scope(|scope| {
        let sampler = thread::Builder::new()
            .name("mem-sampler".to_string())
            .spawn_scoped(scope, move || loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        peak_ref.fetch_max(probe.used_bytes(), Ordering::Relaxed);
                        samples_ref.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });
        if let Err(e) = sampler {
            warn!(ev = "sampler_spawn_failed", error = %e);
        }

        // Dropped on return or unwind; the sampler exits on disconnect.
        let _stop = stop_tx;
        work()
    });

    let peak_mb = bytes_to_mb(peak.load(Ordering::Relaxed));
    let samples = samples.load(Ordering::Relaxed);
    debug!(
        ev = "measure_done",
        ok = result.is_ok(),
        peak_mb,
        samples,
        dur_ms = time::elapsed_ms(start)
    );
    result.map(|value| Measurement {
        value,
        peak_mb,
        samples,
    })
}
