//! The capture -> detect -> alert -> log -> render loop.
//!
//! Everything runs sequentially inside one task: a tick awaits each step before
//! starting the next, so notification attempts and log writes never overlap.
//! Per-step failures are reported and absorbed; only the frame source can end
//! the loop, along with the cancellation token checked between ticks.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::render::{FrameSink, NullSink};
use super::source::{FrameEvent, FrameSource};
use super::state::{AlertOutcome, LoopState, LoopStats, TickOutcome, TickReport};
use crate::alerting::{MailTransport, Notifier};
use crate::clock::{Clock, SystemClock};
use crate::config::defaults::DEFAULT_TICK_DELAY_MS;
use crate::detection::overlay::draw_people_count;
use crate::detection::PersonDetector;
use crate::storage::EventLog;
use crate::types::{Capacity, CrowdingEvent};

/// The vehicle being monitored.
#[derive(Debug, Clone)]
pub struct BusIdentity {
    pub id: String,
    pub capacity: Capacity,
}

/// Owns every component of the pipeline for the lifetime of a run.
///
/// Built with [`new()`](ProcessingLoop::new), optionally adjusted with the
/// `with_*` methods, then driven by [`run()`](ProcessingLoop::run) or one
/// [`tick()`](ProcessingLoop::tick) at a time.
pub struct ProcessingLoop<D, T, L>
where
    D: PersonDetector,
    T: MailTransport,
    L: EventLog,
{
    bus: BusIdentity,
    detector: D,
    notifier: Notifier<T>,
    event_log: L,
    sink: Box<dyn FrameSink>,
    clock: Arc<dyn Clock>,
    tick_delay: Duration,
    cancel_token: CancellationToken,
    state: LoopState,
    stats: LoopStats,
}

impl<D, T, L> ProcessingLoop<D, T, L>
where
    D: PersonDetector,
    T: MailTransport,
    L: EventLog,
{
    pub fn new(
        bus: BusIdentity,
        detector: D,
        notifier: Notifier<T>,
        event_log: L,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            bus,
            detector,
            notifier,
            event_log,
            sink: Box::new(NullSink),
            clock: Arc::new(SystemClock),
            tick_delay: Duration::from_millis(DEFAULT_TICK_DELAY_MS),
            cancel_token,
            state: LoopState::Running,
            stats: LoopStats::default(),
        }
    }

    /// Send annotated frames to `sink` instead of discarding them.
    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Pause between ticks. Zero disables the pause.
    pub fn with_tick_delay(mut self, delay: Duration) -> Self {
        self.tick_delay = delay;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn notifier(&self) -> &Notifier<T> {
        &self.notifier
    }

    pub fn event_log(&self) -> &L {
        &self.event_log
    }

    /// Run until the source ends or cancellation is observed at a tick boundary.
    ///
    /// Returns final loop statistics.
    pub async fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> LoopStats {
        info!(
            "🚌 Monitoring bus {} (capacity {}) from {} via {}...",
            self.bus.id,
            self.bus.capacity.get(),
            source.source_name(),
            self.detector.name()
        );
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        while self.state == LoopState::Running {
            if self.cancel_token.is_cancelled() {
                info!("[ProcessingLoop] Shutdown signal received");
                self.state = LoopState::Stopping;
                break;
            }

            self.tick(source).await;

            if self.state == LoopState::Running && !self.tick_delay.is_zero() {
                tokio::select! {
                    _ = self.cancel_token.cancelled() => {}
                    _ = tokio::time::sleep(self.tick_delay) => {}
                }
            }
        }

        self.stop(source).await;
        self.log_final_stats();
        self.stats
    }

    /// One pass of the pipeline. Moves the loop to `Stopping` when the source
    /// is exhausted or broken; every other failure leaves it `Running`.
    pub async fn tick<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> TickOutcome {
        let frame = match source.next_frame().await {
            Ok(FrameEvent::Frame(frame)) => frame,
            Ok(FrameEvent::Eof) => {
                info!(
                    "[ProcessingLoop] Source reached end ({} frames processed)",
                    self.stats.frames
                );
                self.state = LoopState::Stopping;
                return TickOutcome::EndOfStream;
            }
            Err(e) => {
                warn!("[ProcessingLoop] Source error: {}", e);
                self.state = LoopState::Stopping;
                return TickOutcome::CaptureFailed(e);
            }
        };
        self.stats.frames += 1;

        let detection = match self.detector.detect(&frame) {
            Ok(result) => result,
            Err(e) => {
                warn!(frame = frame.index, error = %e, "Detection failed, skipping frame");
                self.stats.detection_failures += 1;
                return TickOutcome::DetectionFailed(e);
            }
        };

        let now = self.clock.now();
        let event = CrowdingEvent::new(
            self.bus.id.as_str(),
            detection.person_count,
            self.bus.capacity,
            now,
        );
        debug!(
            frame = frame.index,
            people = event.passenger_count,
            occupancy = event.occupancy_rate,
            "Frame analysed"
        );

        let alert = self.alert_step(&event).await;

        let logged = match self.event_log.log(&event).await {
            Ok(id) => {
                self.stats.events_logged += 1;
                Some(id)
            }
            Err(e) => {
                warn!(backend = self.event_log.backend_name(), error = %e, "Failed to log crowding event");
                self.stats.storage_failures += 1;
                None
            }
        };

        let mut annotated = detection.annotated_frame;
        draw_people_count(&mut annotated, detection.person_count);
        let rendered = match self.sink.show(&annotated) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to render overlay");
                self.stats.render_failures += 1;
                false
            }
        };

        TickOutcome::Processed(TickReport {
            frame_index: frame.index,
            person_count: event.passenger_count,
            occupancy_rate: event.occupancy_rate,
            alert,
            logged,
            rendered,
        })
    }

    async fn alert_step(&mut self, event: &CrowdingEvent) -> AlertOutcome {
        if event.passenger_count == 0 {
            return AlertOutcome::NoPeople;
        }

        let now = event.timestamp;
        let throttler = self.notifier.throttler();
        if !throttler.should_notify(now) {
            let remaining_secs = throttler.remaining(now).map_or(0, |d| d.num_seconds());
            debug!(remaining_secs, "Alert suppressed, cooldown active");
            self.stats.alerts_suppressed += 1;
            return AlertOutcome::Suppressed { remaining_secs };
        }

        match self.notifier.send(event, now).await {
            Ok(sent) => {
                self.stats.alerts_sent += 1;
                info!(
                    "📧 ALERT #{}: {} people on bus {} ({:.1}% occupancy)",
                    self.stats.alerts_sent,
                    event.passenger_count,
                    event.bus_id,
                    event.occupancy_rate * 100.0
                );
                AlertOutcome::Sent {
                    attempts: sent.attempts,
                }
            }
            Err(e) => {
                warn!(error = %e, "Notification error");
                self.stats.alerts_failed += 1;
                AlertOutcome::Failed(e)
            }
        }
    }

    async fn stop<S: FrameSource + ?Sized>(&mut self, source: &mut S) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.state = LoopState::Stopping;
        source.release().await;
        self.state = LoopState::Stopped;
        info!("[ProcessingLoop] {} released, loop {}", source.source_name(), self.state);
    }

    fn log_final_stats(&self) {
        let s = &self.stats;
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📊 FINAL STATISTICS");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   Frames Processed:     {}", s.frames);
        info!("   Detection Failures:   {}", s.detection_failures);
        info!("   Alerts Sent:          {}", s.alerts_sent);
        info!("   Alerts Suppressed:    {}", s.alerts_suppressed);
        info!("   Alerts Failed:        {}", s.alerts_failed);
        info!("   Events Logged:        {}", s.events_logged);
        info!("   Storage Failures:     {}", s.storage_failures);
        info!("   Render Failures:      {}", s.render_failures);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}
