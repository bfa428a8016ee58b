//! Background reporter that renders progress while a driver works.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use courier_core::{EngineConfig, ProgressSink, ProgressSurface, ThroughputSample};

/// Run `body` on the calling thread while a watchdog thread samples `sink`.
///
/// The watchdog pushes the percentage to `surface` whenever it changes and,
/// with `show_throughput`, a rate label once per throughput window. It stops
/// on its own when the sink reaches its total or the surface goes away, and
/// is always stopped and joined before this returns.
///
/// If the thread cannot be spawned the body still runs, just without live
/// progress.
pub fn run_watched<R>(
    config: &EngineConfig,
    sink: &ProgressSink,
    surface: &dyn ProgressSurface,
    show_throughput: bool,
    body: impl FnOnce() -> R,
) -> R {
    let stop = AtomicBool::new(false);

    thread::scope(|scope| {
        let spawned = thread::Builder::new()
            .name(config.watchdog_thread_name.clone())
            .stack_size(config.watchdog_stack_size)
            .spawn_scoped(scope, || watch(config, sink, surface, show_throughput, &stop));

        let watchdog = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!("watchdog thread could not be started, running without live progress: {err}");
                None
            }
        };

        let result = body();

        stop.store(true, Ordering::Release);
        if let Some(handle) = watchdog {
            handle.thread().unpark();
            if handle.join().is_err() {
                tracing::warn!("watchdog thread panicked");
            }
        }
        result
    })
}

fn watch(
    config: &EngineConfig,
    sink: &ProgressSink,
    surface: &dyn ProgressSurface,
    show_throughput: bool,
    stop: &AtomicBool,
) {
    tracing::debug!(total = sink.total(), show_throughput, "watchdog started");

    let mut shown = None;
    let mut sample = ThroughputSample::start(Instant::now(), sink.completed());

    while !stop.load(Ordering::Acquire) && surface.is_alive() {
        let state = sink.snapshot();

        let percent = state.percentage();
        if shown != Some(percent) {
            surface.set_percentage(percent);
            shown = Some(percent);
        }
        if state.is_complete() {
            break;
        }

        if show_throughput
            && let Some(rate) = sample.observe(Instant::now(), state.completed, config.throughput_window)
        {
            surface.set_throughput_label(&rate.to_string());
        }

        // Woken early by the driver once the body returns.
        thread::park_timeout(config.poll_interval);
    }

    tracing::debug!(completed = sink.completed(), "watchdog stopped");
}
