use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::Error;
use crate::geo::{Position, SingleFixListener};

/// Receives provider updates. Implemented by the crate's listeners; the
/// platform side only ever sees this trait.
pub trait LocationSink: Send + Sync {
    fn on_position(&self, position: Position);
    fn on_provider_disabled(&self, provider: &str);
}

/// The seam to the platform's location providers.
pub trait LocationSource: Send + Sync {
    fn providers(&self) -> Vec<String>;
    fn enabled_providers(&self) -> Vec<String>;
    /// Begin delivering updates to `sink` until `stop` is called for it.
    fn start(&self, sink: Arc<dyn LocationSink>) -> Result<(), Error>;
    fn stop(&self, sink: &Arc<dyn LocationSink>);
}

impl LocationSink for SingleFixListener {
    fn on_position(&self, position: Position) {
        self.offer(position);
    }

    fn on_provider_disabled(&self, _provider: &str) {
        self.provider_disabled();
    }
}

pub type UpdateCallback = Box<dyn Fn(Position) + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(Error) + Send + Sync>;

struct WatchState {
    on_update: Option<UpdateCallback>,
    on_error: Option<ErrorCallback>,
    last_timestamp: Option<DateTime<Utc>>,
    active_providers: usize,
}

/// Sink for a continuous watch. Dispatch happens with the state lock held,
/// which is what lets `cancel` promise no callback after it returns.
struct WatchSink {
    state: Mutex<WatchState>,
}

impl LocationSink for WatchSink {
    fn on_position(&self, position: Position) {
        let mut state = self.state.lock().unwrap();
        if state.on_update.is_none() {
            return;
        }
        // Per-subscription ordering: stale updates are dropped.
        if let Some(last) = state.last_timestamp {
            if position.timestamp < last {
                return;
            }
        }
        state.last_timestamp = Some(position.timestamp);
        if let Some(on_update) = &state.on_update {
            on_update(position);
        }
    }

    fn on_provider_disabled(&self, provider: &str) {
        let mut state = self.state.lock().unwrap();
        debug!(provider, "location provider disabled");
        state.active_providers = state.active_providers.saturating_sub(1);
        if state.active_providers == 0 {
            if let Some(on_error) = &state.on_error {
                on_error(Error::Unavailable);
            }
        }
    }
}

/// Handle to a running watch.
pub struct Subscription<S: LocationSource> {
    source: Arc<S>,
    sink: Arc<dyn LocationSink>,
    watch: Arc<WatchSink>,
}

impl<S: LocationSource> Subscription<S> {
    /// Stop the watch. Once this returns, no further callback runs.
    pub fn cancel(&self) {
        {
            let mut state = self.watch.state.lock().unwrap();
            state.on_update = None;
            state.on_error = None;
        }
        self.source.stop(&self.sink);
    }
}

/// Blocking single fixes and continuous watches over a location source.
pub struct Geolocator<S> {
    source: Arc<S>,
    /// Accuracy (meters) at which a single-fix request finishes early.
    pub desired_accuracy: f64,
}

impl<S: LocationSource + 'static> Geolocator<S> {
    pub fn new(source: S) -> Self {
        Self { source: Arc::new(source), desired_accuracy: 50.0 }
    }

    /// Whether the device has any location provider at all.
    pub fn is_available(&self) -> bool {
        !self.source.providers().is_empty()
    }

    /// Whether any provider is currently enabled.
    pub fn is_enabled(&self) -> bool {
        !self.source.enabled_providers().is_empty()
    }

    /// One blocking fix: best candidate wins, desired accuracy finishes
    /// early, the deadline caps the wait.
    pub fn position(&self, timeout: Duration) -> Result<Position, Error> {
        let enabled = self.source.enabled_providers();
        if enabled.is_empty() {
            return Err(Error::Unavailable);
        }

        let listener = Arc::new(SingleFixListener::new(self.desired_accuracy, enabled.len()));
        let sink: Arc<dyn LocationSink> = listener.clone();
        self.source.start(sink.clone())?;
        let result = listener.wait(timeout);
        self.source.stop(&sink);
        result
    }

    /// Continuous updates until the subscription is cancelled.
    pub fn watch(
        &self,
        on_update: impl Fn(Position) + Send + Sync + 'static,
        on_error: impl Fn(Error) + Send + Sync + 'static,
    ) -> Result<Subscription<S>, Error> {
        let enabled = self.source.enabled_providers();
        if enabled.is_empty() {
            return Err(Error::Unavailable);
        }

        let watch = Arc::new(WatchSink {
            state: Mutex::new(WatchState {
                on_update: Some(Box::new(on_update)),
                on_error: Some(Box::new(on_error)),
                last_timestamp: None,
                active_providers: enabled.len(),
            }),
        });
        let sink: Arc<dyn LocationSink> = watch.clone();
        self.source.start(sink.clone())?;
        Ok(Subscription { source: Arc::clone(&self.source), sink, watch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;

    struct FakeProviders {
        providers: Vec<String>,
        enabled: Vec<String>,
        sinks: StdMutex<Vec<Arc<dyn LocationSink>>>,
    }

    impl FakeProviders {
        fn new(enabled: &[&str]) -> Self {
            Self {
                providers: vec!["gps".into(), "network".into()],
                enabled: enabled.iter().map(|s| s.to_string()).collect(),
                sinks: StdMutex::new(Vec::new()),
            }
        }

        fn push(&self, position: Position) {
            for sink in self.sinks.lock().unwrap().iter() {
                sink.on_position(position.clone());
            }
        }
    }

    impl LocationSource for FakeProviders {
        fn providers(&self) -> Vec<String> {
            self.providers.clone()
        }

        fn enabled_providers(&self) -> Vec<String> {
            self.enabled.clone()
        }

        fn start(&self, sink: Arc<dyn LocationSink>) -> Result<(), Error> {
            self.sinks.lock().unwrap().push(sink);
            Ok(())
        }

        fn stop(&self, sink: &Arc<dyn LocationSink>) {
            self.sinks.lock().unwrap().retain(|s| !Arc::ptr_eq(s, sink));
        }
    }

    fn at(seconds: i64) -> Position {
        Position::new(52.5, 13.4, Utc.timestamp_opt(seconds, 0).unwrap())
    }

    #[test]
    fn no_enabled_providers_means_unavailable() {
        let locator = Geolocator::new(FakeProviders::new(&[]));
        assert!(locator.is_available());
        assert!(!locator.is_enabled());
        assert_eq!(locator.position(Duration::from_millis(1)), Err(Error::Unavailable));
        assert!(locator.watch(|_| {}, |_| {}).is_err());
    }

    #[test]
    fn position_returns_an_accurate_fix_and_stops_the_source() {
        let locator = Geolocator::new(FakeProviders::new(&["gps"]));
        let source = Arc::clone(&locator.source);
        let handle = std::thread::spawn(move || {
            // Wait for the sink to register, then feed it.
            while source.sinks.lock().unwrap().is_empty() {
                std::thread::yield_now();
            }
            source.push(at(1).with_accuracy(10.0));
        });
        let got = locator.position(Duration::from_secs(5)).unwrap();
        assert_eq!(got.accuracy, Some(10.0));
        handle.join().unwrap();
        assert!(locator.source.sinks.lock().unwrap().is_empty());
    }

    #[test]
    fn watch_delivers_updates_in_nondecreasing_timestamp_order() {
        let locator = Geolocator::new(FakeProviders::new(&["gps"]));
        let seen: Arc<StdMutex<Vec<i64>>> = Arc::default();
        let sink_log = Arc::clone(&seen);
        let sub = locator
            .watch(move |p| sink_log.lock().unwrap().push(p.timestamp.timestamp()), |_| {})
            .unwrap();

        locator.source.push(at(10));
        locator.source.push(at(5)); // stale, dropped
        locator.source.push(at(10)); // equal, kept
        locator.source.push(at(20));
        sub.cancel();

        assert_eq!(*seen.lock().unwrap(), vec![10, 10, 20]);
    }

    #[test]
    fn no_callback_runs_after_cancel_returns() {
        let locator = Geolocator::new(FakeProviders::new(&["gps"]));
        let seen: Arc<StdMutex<Vec<i64>>> = Arc::default();
        let sink_log = Arc::clone(&seen);
        let sub = locator
            .watch(move |p| sink_log.lock().unwrap().push(p.timestamp.timestamp()), |_| {})
            .unwrap();

        locator.source.push(at(1));
        sub.cancel();
        locator.source.push(at(2));
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn losing_every_provider_reports_unavailable_to_the_watch() {
        let locator = Geolocator::new(FakeProviders::new(&["gps"]));
        let errors: Arc<StdMutex<Vec<Error>>> = Arc::default();
        let sink_log = Arc::clone(&errors);
        let _sub = locator
            .watch(|_| {}, move |e| sink_log.lock().unwrap().push(e))
            .unwrap();

        let sinks = locator.source.sinks.lock().unwrap().clone();
        for sink in &sinks {
            sink.on_provider_disabled("gps");
        }
        assert_eq!(*errors.lock().unwrap(), vec![Error::Unavailable]);
    }
}
