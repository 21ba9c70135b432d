//! Display orchestrator implementation.
//!
//! Owns the current ticket and the last resolved reference:
//! - Request: enqueue a download, superseding any previous ticket
//! - Completion: resolve the current ticket on a blocking thread, then store and render
//! - Lifetime: one listener subscription per activation, cancelled on deactivate

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::attachment::AttachmentReference;
use crate::completion::{CompletionBroadcast, CompletionSubscription};
use crate::download::{extension_or, Destination, DownloadRequest, DownloadService, Ticket};
use crate::metrics;
use crate::presentation::PresentationSurface;
use crate::resolver::FileResolver;

use super::config::OrchestratorConfig;
use super::types::{
    CompletionOutcome, DisplayPhase, OrchestratorError, OrchestratorSnapshot, OrchestratorStatus,
};

/// Mutable orchestrator state. Never held across an await.
#[derive(Default)]
struct DisplayState {
    phase: DisplayPhase,
    ticket: Ticket,
    reference: AttachmentReference,
    /// Scope of the current visible lifetime, if any.
    scope: Option<CancellationToken>,
}

impl DisplayState {
    fn live_scope(&self) -> Option<CancellationToken> {
        self.scope.as_ref().filter(|t| !t.is_cancelled()).cloned()
    }
}

/// State shared between the orchestrator and its listener task.
struct Shared {
    resolver: Arc<FileResolver>,
    surface: Arc<dyn PresentationSurface>,
    state: Mutex<DisplayState>,
    /// Held for the whole of a resolution so only one is ever in flight.
    resolution_gate: tokio::sync::Mutex<()>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Re-check the current ticket and display whatever it resolves to.
    async fn handle_completion(&self, token: &CancellationToken) -> CompletionOutcome {
        let _gate = tokio::select! {
            _ = token.cancelled() => return CompletionOutcome::Cancelled,
            gate = self.resolution_gate.lock() => gate,
        };
        if token.is_cancelled() {
            return CompletionOutcome::Cancelled;
        }

        metrics::COMPLETION_EVENTS.inc();

        let (ticket, previous_phase) = {
            let mut state = self.state();
            let previous = state.phase;
            state.phase = DisplayPhase::Resolving;
            (state.ticket, previous)
        };
        debug!(%ticket, "Completion event received, resolving current ticket");

        let started = Instant::now();
        let resolver = Arc::clone(&self.resolver);
        let resolution = tokio::task::spawn_blocking(move || resolver.resolve(ticket));

        let joined = tokio::select! {
            _ = token.cancelled() => None,
            joined = resolution => Some(joined),
        };
        metrics::RESOLUTION_DURATION.observe(started.elapsed().as_secs_f64());

        let reference = match joined {
            None => {
                self.abandon(ticket, previous_phase);
                return CompletionOutcome::Cancelled;
            }
            Some(Err(e)) => {
                error!(%ticket, "Resolution task failed: {}", e);
                metrics::RESOLUTIONS.with_label_values(&["failed"]).inc();
                self.restore_phase(previous_phase);
                return CompletionOutcome::Failed;
            }
            Some(Ok(reference)) => reference,
        };

        let mut state = self.state();
        // Deactivation takes this lock too, so no render can follow it.
        if token.is_cancelled() {
            drop(state);
            self.abandon(ticket, previous_phase);
            return CompletionOutcome::Cancelled;
        }

        state.reference = reference.clone();
        if state.ticket == ticket {
            state.phase = if ticket.is_none() {
                DisplayPhase::Idle
            } else {
                DisplayPhase::Displayed
            };
        } else {
            debug!(%ticket, current = %state.ticket, "Ticket superseded during resolution");
        }

        if reference.is_empty() {
            debug!(%ticket, "Nothing to display");
            metrics::RESOLUTIONS.with_label_values(&["empty"]).inc();
        } else {
            info!(%ticket, reference = %reference, "Displaying downloaded image");
            metrics::RESOLUTIONS.with_label_values(&["displayed"]).inc();
            self.surface.render(&reference);
        }

        CompletionOutcome::Displayed(reference)
    }

    fn abandon(&self, ticket: Ticket, previous_phase: DisplayPhase) {
        debug!(%ticket, "Resolution cancelled");
        metrics::RESOLUTIONS.with_label_values(&["cancelled"]).inc();
        self.restore_phase(previous_phase);
    }

    fn restore_phase(&self, previous_phase: DisplayPhase) {
        let mut state = self.state();
        if state.phase == DisplayPhase::Resolving {
            state.phase = previous_phase;
        }
    }
}

/// Handle for one visible lifetime. Dropping it ends the lifetime too.
#[derive(Debug)]
pub struct Activation {
    token: CancellationToken,
}

impl Activation {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// The display orchestrator - turns a button press into a rendered image.
pub struct DisplayOrchestrator {
    config: OrchestratorConfig,
    service: Arc<dyn DownloadService>,
    completion: CompletionBroadcast,
    shared: Arc<Shared>,
}

impl DisplayOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        service: Arc<dyn DownloadService>,
        completion: CompletionBroadcast,
        resolver: FileResolver,
        surface: Arc<dyn PresentationSurface>,
    ) -> Self {
        Self {
            config,
            service,
            completion,
            shared: Arc::new(Shared {
                resolver: Arc::new(resolver),
                surface,
                state: Mutex::new(DisplayState::default()),
                resolution_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Subscribe to completion events for one visible lifetime.
    ///
    /// Must be paired with exactly one [`deactivate`](Self::deactivate).
    pub fn activate(&self) -> Result<Activation, OrchestratorError> {
        let token = CancellationToken::new();
        {
            let mut state = self.shared.state();
            if state.live_scope().is_some() {
                return Err(OrchestratorError::AlreadyActive);
            }
            state.scope = Some(token.clone());
        }

        let subscription = self.completion.subscribe();
        self.spawn_listener(subscription, token.clone());

        info!("Display orchestrator activated");
        Ok(Activation { token })
    }

    /// End the visible lifetime: unsubscribe and cancel any pending resolution.
    ///
    /// Does not wait for the background lookup to finish.
    pub fn deactivate(&self, activation: Activation) {
        {
            let mut state = self.shared.state();
            activation.token.cancel();
            state.scope = None;
        }
        info!("Display orchestrator deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.shared.state().live_scope().is_some()
    }

    fn spawn_listener(&self, mut subscription: CompletionSubscription, token: CancellationToken) {
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            debug!("Completion listener started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = subscription.recv() => {
                        if event.is_none() {
                            warn!("Completion broadcast closed");
                            break;
                        }
                        let coalesced = subscription.drain();
                        if coalesced > 0 {
                            debug!("Coalesced {} queued completion event(s)", coalesced);
                        }
                        shared.handle_completion(&token).await;
                    }
                }
            }
            debug!("Completion listener stopped");
        });
    }

    /// Ask the download service for `url`, superseding the current ticket.
    pub async fn request_download(&self, url: &str) -> Result<Ticket, OrchestratorError> {
        let source = Url::parse(url).map_err(|e| OrchestratorError::InvalidUrl(e.to_string()))?;

        let extension = extension_or(url, &self.config.default_extension);
        let file_name = self.config.file_name_for_extension(extension);
        let request = DownloadRequest::new(source, Destination::pictures(file_name))
            .with_title(self.config.title.clone())
            .with_allowed_networks(self.config.allowed_networks)
            .with_roaming(self.config.allow_roaming);
        let destination = request.destination.file_name.clone();

        let ticket = self.service.enqueue(request).await?;

        {
            let mut state = self.shared.state();
            if !state.ticket.is_none() && state.ticket != ticket {
                debug!(previous = %state.ticket, "Superseding previous ticket");
            }
            state.ticket = ticket;
            state.phase = DisplayPhase::Downloading;
        }

        metrics::DOWNLOADS_REQUESTED.inc();
        info!(%ticket, %destination, service = self.service.name(), "Download enqueued");
        Ok(ticket)
    }

    /// Handle one completion event within the current visible lifetime.
    pub async fn on_completion_event(&self) -> CompletionOutcome {
        let Some(token) = self.shared.state().live_scope() else {
            debug!("Completion event outside a visible lifetime ignored");
            return CompletionOutcome::Inactive;
        };
        self.shared.handle_completion(&token).await
    }

    /// Render the stored reference again without re-resolving.
    ///
    /// Returns whether anything was rendered.
    pub fn restore_display(&self) -> bool {
        let reference = self.shared.state().reference.clone();
        if reference.is_empty() {
            return false;
        }
        debug!(reference = %reference, "Restoring display");
        self.shared.surface.render(&reference);
        true
    }

    /// The {ticket, reference} pair to persist across re-creation.
    pub fn snapshot(&self) -> OrchestratorSnapshot {
        let state = self.shared.state();
        OrchestratorSnapshot {
            ticket: state.ticket,
            reference: state.reference.clone(),
        }
    }

    /// Adopt a previously saved snapshot.
    pub fn restore_snapshot(&self, snapshot: OrchestratorSnapshot) {
        let mut state = self.shared.state();
        state.phase = if !snapshot.reference.is_empty() {
            DisplayPhase::Displayed
        } else if !snapshot.ticket.is_none() {
            DisplayPhase::Downloading
        } else {
            DisplayPhase::Idle
        };
        state.ticket = snapshot.ticket;
        state.reference = snapshot.reference;
        debug!(ticket = %state.ticket, phase = state.phase.as_str(), "Snapshot restored");
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        let state = self.shared.state();
        OrchestratorStatus {
            phase: state.phase,
            ticket: state.ticket,
            reference: state.reference.clone(),
            active: state.live_scope().is_some(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::attachment::FileProvider;
    use crate::download::DownloadServiceError;
    use crate::testing::fixtures::{self, AUTHORITY, PICTURES_DIR};
    use crate::testing::{MockDownloadService, RecordingSurface};

    struct Fixture {
        orchestrator: DisplayOrchestrator,
        service: Arc<MockDownloadService>,
        surface: Arc<RecordingSurface>,
    }

    fn fixture() -> Fixture {
        let completion = CompletionBroadcast::default();
        let service = Arc::new(
            MockDownloadService::new()
                .with_pictures_dir(PICTURES_DIR)
                .with_completion(completion.clone()),
        );
        let surface = Arc::new(RecordingSurface::new());
        let resolver = FileResolver::new(
            Arc::clone(&service) as Arc<dyn DownloadService>,
            FileProvider::new(AUTHORITY).with_root("pictures", PICTURES_DIR),
        );
        let orchestrator = DisplayOrchestrator::new(
            OrchestratorConfig::default(),
            Arc::clone(&service) as Arc<dyn DownloadService>,
            completion,
            resolver,
            Arc::clone(&surface) as Arc<dyn PresentationSurface>,
        );
        Fixture {
            orchestrator,
            service,
            surface,
        }
    }

    #[tokio::test]
    async fn test_request_builds_destination_from_url() {
        let f = fixture();

        let ticket = f
            .orchestrator
            .request_download("https://example.com/photos/cat.png?size=large#top")
            .await
            .unwrap();

        let enqueued = f.service.enqueued();
        assert_eq!(enqueued.len(), 1);
        let request = &enqueued[0].request;
        assert_eq!(request.destination.file_name, "image_{ticket}.png");
        assert_eq!(request.title.as_deref(), Some("imagedrop"));
        assert!(request.allowed_networks.metered);
        assert!(request.allowed_networks.unmetered);
        assert!(!request.allow_roaming);

        let status = f.orchestrator.status();
        assert_eq!(status.ticket, ticket);
        assert_eq!(status.phase, DisplayPhase::Downloading);
    }

    #[tokio::test]
    async fn test_request_without_extension_uses_default() {
        let f = fixture();
        f.orchestrator
            .request_download("https://example.com/download")
            .await
            .unwrap();
        assert_eq!(
            f.service.enqueued()[0].request.destination.file_name,
            "image_{ticket}.jpg"
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_enqueue() {
        let f = fixture();
        let result = f.orchestrator.request_download("not a url").await;
        assert!(matches!(result, Err(OrchestratorError::InvalidUrl(_))));
        assert!(f.service.enqueued().is_empty());
        assert_eq!(f.orchestrator.status().phase, DisplayPhase::Idle);
    }

    #[tokio::test]
    async fn test_enqueue_failure_propagates_and_keeps_state() {
        let f = fixture();
        f.service
            .set_next_error(DownloadServiceError::Storage("no space".to_string()));

        let result = f.orchestrator.request_download("https://example.com/a.jpg").await;

        assert!(matches!(result, Err(OrchestratorError::Enqueue(_))));
        assert!(f.orchestrator.status().ticket.is_none());
    }

    #[tokio::test]
    async fn test_completion_outside_lifetime_is_ignored() {
        let f = fixture();
        assert_eq!(
            f.orchestrator.on_completion_event().await,
            CompletionOutcome::Inactive
        );
        assert_eq!(f.service.queries(), 0);
    }

    #[tokio::test]
    async fn test_completion_resolves_and_renders() {
        let f = fixture();
        let _activation = f.orchestrator.activate().unwrap();
        let ticket = f
            .orchestrator
            .request_download("https://example.com/a.jpg")
            .await
            .unwrap();
        f.service.set_record(fixtures::succeeded_record(ticket.id(), "image_1.jpg"));

        let outcome = f.orchestrator.on_completion_event().await;

        let CompletionOutcome::Displayed(reference) = outcome else {
            panic!("expected a displayed outcome, got {:?}", outcome);
        };
        assert_eq!(
            reference.to_string(),
            "content://org.imagedrop.provider/pictures/image_1.jpg"
        );
        assert_eq!(f.surface.renders(), vec![reference.clone()]);
        let status = f.orchestrator.status();
        assert_eq!(status.phase, DisplayPhase::Displayed);
        assert_eq!(status.reference, reference);
    }

    #[tokio::test]
    async fn test_failed_download_stores_empty_without_render() {
        let f = fixture();
        let _activation = f.orchestrator.activate().unwrap();
        let ticket = f
            .orchestrator
            .request_download("https://example.com/a.jpg")
            .await
            .unwrap();
        f.service.set_record(fixtures::failed_record(ticket.id()));

        let outcome = f.orchestrator.on_completion_event().await;

        assert_eq!(outcome, CompletionOutcome::Displayed(AttachmentReference::Empty));
        assert_eq!(f.surface.render_count(), 0);
        assert_eq!(f.orchestrator.status().phase, DisplayPhase::Displayed);
    }

    #[tokio::test]
    async fn test_spurious_event_overwrites_restored_reference() {
        let f = fixture();
        let restored = AttachmentReference::Uri(
            Url::parse("content://org.imagedrop.provider/pictures/old.jpg").unwrap(),
        );
        f.orchestrator.restore_snapshot(OrchestratorSnapshot {
            ticket: Ticket::NONE,
            reference: restored,
        });
        let _activation = f.orchestrator.activate().unwrap();

        let outcome = f.orchestrator.on_completion_event().await;

        assert_eq!(outcome, CompletionOutcome::Displayed(AttachmentReference::Empty));
        let status = f.orchestrator.status();
        assert!(status.reference.is_empty());
        assert_eq!(status.phase, DisplayPhase::Idle);
    }

    #[tokio::test]
    async fn test_activate_twice_fails() {
        let f = fixture();
        let activation = f.orchestrator.activate().unwrap();
        assert!(matches!(
            f.orchestrator.activate(),
            Err(OrchestratorError::AlreadyActive)
        ));

        f.orchestrator.deactivate(activation);
        assert!(!f.orchestrator.is_active());
        let again = f.orchestrator.activate().unwrap();
        assert!(f.orchestrator.is_active());
        drop(again);
        assert!(!f.orchestrator.is_active());
    }

    #[tokio::test]
    async fn test_deactivate_without_pending_work() {
        let f = fixture();
        let activation = f.orchestrator.activate().unwrap();
        f.orchestrator.deactivate(activation);
        assert_eq!(f.orchestrator.status().phase, DisplayPhase::Idle);
    }

    #[tokio::test]
    async fn test_deactivate_mid_resolution_cancels() {
        let f = Arc::new(fixture());
        let activation = f.orchestrator.activate().unwrap();
        let ticket = f
            .orchestrator
            .request_download("https://example.com/a.jpg")
            .await
            .unwrap();
        f.service.set_record(fixtures::succeeded_record(ticket.id(), "image_1.jpg"));
        f.service.set_query_delay(Duration::from_millis(300));

        let pending = {
            let f = Arc::clone(&f);
            tokio::spawn(async move { f.orchestrator.on_completion_event().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(f.orchestrator.status().phase, DisplayPhase::Resolving);

        f.orchestrator.deactivate(activation);

        assert_eq!(pending.await.unwrap(), CompletionOutcome::Cancelled);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(f.surface.render_count(), 0);
        let status = f.orchestrator.status();
        assert!(status.reference.is_empty());
        assert_eq!(status.phase, DisplayPhase::Downloading);
    }

    #[tokio::test]
    async fn test_restore_display_renders_without_resolving() {
        let f = fixture();
        let reference = AttachmentReference::Uri(
            Url::parse("content://org.imagedrop.provider/pictures/42.jpg").unwrap(),
        );
        f.orchestrator.restore_snapshot(OrchestratorSnapshot {
            ticket: Ticket::new(42),
            reference: reference.clone(),
        });
        let before = f.orchestrator.snapshot();

        assert!(f.orchestrator.restore_display());
        assert!(f.orchestrator.restore_display());

        assert_eq!(f.surface.renders(), vec![reference.clone(), reference]);
        assert_eq!(f.orchestrator.snapshot(), before);
        assert_eq!(f.service.queries(), 0);
    }

    #[tokio::test]
    async fn test_restore_display_with_empty_reference_is_noop() {
        let f = fixture();
        assert!(!f.orchestrator.restore_display());
        assert_eq!(f.surface.render_count(), 0);
    }

    #[test]
    fn test_restore_snapshot_phases() {
        let f = fixture();

        f.orchestrator.restore_snapshot(OrchestratorSnapshot {
            ticket: Ticket::new(3),
            reference: AttachmentReference::Empty,
        });
        assert_eq!(f.orchestrator.status().phase, DisplayPhase::Downloading);

        f.orchestrator.restore_snapshot(OrchestratorSnapshot::default());
        assert_eq!(f.orchestrator.status().phase, DisplayPhase::Idle);
    }
}
