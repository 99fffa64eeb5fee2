// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracking service.
//!
//! One task owns the `LiveTracker`, the location subscription and the status
//! surface. Commands arrive over a queue and are answered over oneshot
//! channels; location updates and commands are handled one at a time, so the
//! session state has a single writer. Observers read snapshots from the
//! `SnapshotFeed` and never touch the tracker.

use std::future;
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};

use crate::db::ActivityDb;
use crate::error::AppError;
use crate::models::{CompletedActivity, LiveSessionState};
use crate::services::broadcast::{SessionSubscription, SnapshotFeed};
use crate::services::location::{
    LocationError, LocationRequest, LocationSource, LocationSubscription, LocationUpdate,
};
use crate::services::orchestrator::{
    FixOutcome, LiveTracker, SessionError, StartSession, TrackingConfig,
};
use crate::services::status::{StatusNotification, StatusSurface};
use crate::time_utils::Clock;

const COMMAND_QUEUE: usize = 32;

/// Errors returned by tracking commands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackerError {
    #[error("A tracking session is already in progress")]
    AlreadyTracking,

    #[error("Tracking was interrupted: {0}")]
    TrackingInterrupted(String),

    #[error("Location updates unavailable: {0}")]
    LocationUnavailable(LocationError),

    #[error("Failed to save activity: {0}")]
    Storage(String),

    #[error("Tracking service is not running")]
    ServiceStopped,
}

impl From<SessionError> for TrackerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AlreadyTracking => TrackerError::AlreadyTracking,
        }
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::AlreadyTracking => AppError::Conflict(err.to_string()),
            TrackerError::TrackingInterrupted(reason) => AppError::TrackingInterrupted(reason),
            TrackerError::LocationUnavailable(e) => AppError::LocationUnavailable(e.to_string()),
            TrackerError::Storage(msg) => AppError::Database(msg),
            TrackerError::ServiceStopped => {
                AppError::Internal(anyhow::anyhow!("tracking service stopped"))
            }
        }
    }
}

/// Options for ending a session.
#[derive(Debug, Clone, Default)]
pub struct StopSession {
    /// Persist the session as a completed activity
    pub save: bool,
    pub notes: String,
}

/// Result of a stop command.
#[derive(Debug, Clone)]
pub struct StopOutcome {
    pub state: Arc<LiveSessionState>,
    /// The saved activity when `save` was requested
    pub activity: Option<CompletedActivity>,
}

type Reply<T> = oneshot::Sender<Result<T, TrackerError>>;

enum Command {
    Start {
        session: StartSession,
        reply: Reply<Arc<LiveSessionState>>,
    },
    Pause {
        reply: Reply<Arc<LiveSessionState>>,
    },
    Resume {
        reply: Reply<Arc<LiveSessionState>>,
    },
    Stop {
        options: StopSession,
        reply: Reply<StopOutcome>,
    },
    Settle {
        reply: Reply<Arc<LiveSessionState>>,
    },
}

enum Event {
    Location(Option<LocationUpdate>),
    Command(Command),
}

/// Handle to the tracking task. Cheap to clone.
#[derive(Clone)]
pub struct TrackingService {
    commands: mpsc::Sender<Command>,
    feed: Arc<SnapshotFeed>,
}

impl TrackingService {
    /// Spawn the tracking task on the current runtime.
    pub fn spawn<S: LocationSource>(
        source: Arc<S>,
        status: Box<dyn StatusSurface>,
        db: ActivityDb,
        clock: Arc<dyn Clock>,
        config: TrackingConfig,
        request: LocationRequest,
    ) -> Self {
        let tracker = LiveTracker::new(config);
        let feed = Arc::new(SnapshotFeed::new(tracker.snapshot()));
        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE);

        let actor = Actor {
            source,
            tracker,
            subscription: None,
            status,
            db,
            clock,
            request,
            feed: Arc::clone(&feed),
            interruption: None,
        };
        tokio::spawn(actor.run(receiver));

        Self { commands, feed }
    }

    /// Begin a new session once location updates are flowing.
    pub async fn start(&self, session: StartSession) -> Result<Arc<LiveSessionState>, TrackerError> {
        self.call(|reply| Command::Start { session, reply }).await
    }

    /// Pause the session. A no-op returns the current snapshot.
    pub async fn pause(&self) -> Result<Arc<LiveSessionState>, TrackerError> {
        self.call(|reply| Command::Pause { reply }).await
    }

    /// Resume the session. A no-op returns the current snapshot.
    pub async fn resume(&self) -> Result<Arc<LiveSessionState>, TrackerError> {
        self.call(|reply| Command::Resume { reply }).await
    }

    pub async fn stop(&self, options: StopSession) -> Result<StopOutcome, TrackerError> {
        self.call(|reply| Command::Stop { options, reply }).await
    }

    /// Snapshot after every fix and command queued before this call has
    /// been applied.
    pub async fn settled(&self) -> Result<Arc<LiveSessionState>, TrackerError> {
        self.call(|reply| Command::Settle { reply }).await
    }

    /// Latest published snapshot.
    pub fn current(&self) -> Arc<LiveSessionState> {
        self.feed.latest()
    }

    /// Latest snapshot followed by every later one.
    pub fn subscribe(&self) -> SessionSubscription {
        self.feed.subscribe()
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, TrackerError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| TrackerError::ServiceStopped)?;
        response.await.map_err(|_| TrackerError::ServiceStopped)?
    }
}

struct Actor<S> {
    source: Arc<S>,
    tracker: LiveTracker,
    subscription: Option<LocationSubscription>,
    status: Box<dyn StatusSurface>,
    db: ActivityDb,
    clock: Arc<dyn Clock>,
    request: LocationRequest,
    feed: Arc<SnapshotFeed>,
    /// Set when the subscription failed; reported to the next command
    interruption: Option<String>,
}

async fn next_update(subscription: &mut Option<LocationSubscription>) -> Option<LocationUpdate> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => future::pending().await,
    }
}

impl<S: LocationSource> Actor<S> {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::debug!("Tracking service started");
        loop {
            let event = tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => Event::Command(command),
                    None => break,
                },
                update = next_update(&mut self.subscription) => Event::Location(update),
            };

            match event {
                Event::Location(update) => self.handle_location(update),
                Event::Command(command) => {
                    self.drain_queued();
                    self.handle_command(command).await;
                }
            }
        }
        tracing::debug!("Tracking service stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        // A dropped reply means the caller went away; nothing to do.
        match command {
            Command::Start { session, reply } => {
                let _ = reply.send(self.start(session).await);
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            Command::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            Command::Stop { options, reply } => {
                let _ = reply.send(self.stop(options).await);
            }
            Command::Settle { reply } => {
                let _ = reply.send(Ok(self.tracker.snapshot()));
            }
        }
    }

    /// Apply the updates queued before a command so it never overtakes them.
    ///
    /// Bounded by the queue length on entry; fixes keep arriving while the
    /// queue drains and must not hold the command back.
    fn drain_queued(&mut self) {
        let queued = self
            .subscription
            .as_ref()
            .map_or(0, LocationSubscription::queued);

        for _ in 0..=queued {
            let Some(subscription) = self.subscription.as_mut() else {
                return;
            };
            match subscription.try_recv() {
                Ok(update) => self.handle_location(Some(update)),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.handle_location(None);
                    return;
                }
            }
        }
    }

    fn handle_location(&mut self, update: Option<LocationUpdate>) {
        match update {
            Some(Ok(Some(fix))) => {
                let now = self.clock.now_millis();
                match self.tracker.process_fix(&fix, now) {
                    FixOutcome::Accepted(state) => self.publish(state),
                    FixOutcome::Rejected(reason) => {
                        tracing::debug!(?reason, accuracy = fix.accuracy, "Fix rejected");
                    }
                }
            }
            Some(Ok(None)) => tracing::trace!("No fix this cycle"),
            Some(Err(err)) => self.interrupt(err.to_string()),
            None => self.interrupt("Location updates ended".to_string()),
        }
    }

    async fn start(&mut self, session: StartSession) -> Result<Arc<LiveSessionState>, TrackerError> {
        if self.tracker.is_tracking() {
            return Err(TrackerError::AlreadyTracking);
        }

        let subscription = self
            .source
            .subscribe(&self.request)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Location subscription failed");
                TrackerError::LocationUnavailable(e)
            })?;

        let now = self.clock.now_millis();
        let state = self.tracker.start(session, now)?;
        self.subscription = Some(subscription);
        self.interruption = None;

        tracing::info!(
            activity_type = %state.activity_type,
            start_time = state.start_time,
            "Tracking started"
        );
        self.publish(Arc::clone(&state));
        Ok(state)
    }

    fn pause(&mut self) -> Result<Arc<LiveSessionState>, TrackerError> {
        self.check_interruption()?;
        let now = self.clock.now_millis();
        match self.tracker.pause(now) {
            Some(state) => {
                tracing::info!(duration_sec = state.duration_sec, "Tracking paused");
                self.publish(Arc::clone(&state));
                Ok(state)
            }
            None => Ok(self.tracker.snapshot()),
        }
    }

    fn resume(&mut self) -> Result<Arc<LiveSessionState>, TrackerError> {
        self.check_interruption()?;
        let now = self.clock.now_millis();
        match self.tracker.resume(now) {
            Some(state) => {
                tracing::info!(paused_ms = state.paused_time_ms, "Tracking resumed");
                self.publish(Arc::clone(&state));
                Ok(state)
            }
            None => Ok(self.tracker.snapshot()),
        }
    }

    async fn stop(&mut self, options: StopSession) -> Result<StopOutcome, TrackerError> {
        if let Some(reason) = self.interruption.take() {
            return Err(TrackerError::TrackingInterrupted(reason));
        }

        // No fix may land after the terminal snapshot.
        self.subscription = None;

        let now = self.clock.now_millis();
        let Some(state) = self.tracker.stop(now) else {
            return Ok(StopOutcome {
                state: self.tracker.snapshot(),
                activity: None,
            });
        };

        self.feed.publish(Arc::clone(&state));
        self.status.clear();
        tracing::info!(
            distance_km = state.distance_km,
            duration_sec = state.duration_sec,
            points = state.route.len(),
            "Tracking stopped"
        );

        let activity = if options.save {
            let activity = CompletedActivity::from_session(&state, options.notes);
            self.db
                .save(&activity)
                .await
                .map_err(|e| TrackerError::Storage(e.to_string()))?;
            Some(activity)
        } else {
            None
        };

        Ok(StopOutcome { state, activity })
    }

    fn check_interruption(&self) -> Result<(), TrackerError> {
        match &self.interruption {
            Some(reason) => Err(TrackerError::TrackingInterrupted(reason.clone())),
            None => Ok(()),
        }
    }

    fn interrupt(&mut self, reason: String) {
        self.subscription = None;
        let now = self.clock.now_millis();
        if let Some(state) = self.tracker.interrupt(&reason, now) {
            tracing::warn!(
                reason = %reason,
                distance_km = state.distance_km,
                "Location subscription lost; tracking interrupted"
            );
            self.feed.publish(state);
            self.status.clear();
            self.interruption = Some(reason);
        }
    }

    fn publish(&mut self, state: Arc<LiveSessionState>) {
        self.status.show(&StatusNotification::from_state(&state));
        self.feed.publish(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::status::TracingStatusSurface;
    use crate::time_utils::ManualClock;
    use std::future::Future;

    struct DeniedSource;

    impl LocationSource for DeniedSource {
        fn subscribe(
            &self,
            _request: &LocationRequest,
        ) -> impl Future<Output = Result<LocationSubscription, LocationError>> + Send {
            future::ready(Err(LocationError::PermissionDenied))
        }
    }

    #[tokio::test]
    async fn test_start_fails_without_location() {
        let service = TrackingService::spawn(
            Arc::new(DeniedSource),
            Box::new(TracingStatusSurface::new()),
            ActivityDb::new_in_memory(),
            Arc::new(ManualClock::new(0)),
            TrackingConfig::default(),
            LocationRequest::default(),
        );

        let err = service.start(StartSession::default()).await.unwrap_err();
        assert_eq!(
            err,
            TrackerError::LocationUnavailable(LocationError::PermissionDenied)
        );
        assert!(!service.current().is_tracking);
    }

    #[test]
    fn test_tracker_error_maps_to_app_error() {
        assert!(matches!(
            AppError::from(TrackerError::AlreadyTracking),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(TrackerError::TrackingInterrupted("gone".into())),
            AppError::TrackingInterrupted(r) if r == "gone"
        ));
    }
}
