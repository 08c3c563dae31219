//! Preview runtime: one tokio task that owns a [`PreviewSession`] and feeds
//! it host events, timer deadlines and finished lookups.
//!
//! Events arrive on an mpsc channel and are handled one at a time. A
//! resolution runs inside the same `select!` loop, so events (a scroll, say)
//! keep flowing while it is in flight; the session drops it on arrival if it
//! went stale.

use crate::document::{Host, Point};
use crate::error::{Error, Result};
use crate::highlights::SettingsStore;
use crate::hover::OpenRequest;
use crate::lookup::LookupService;
use crate::models::{Notice, Tab};
use crate::session::{KeyPress, PreviewSession};
use crate::supervisor::ServiceSupervisor;
use futures_util::future::BoxFuture;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEvent {
    /// The host finished rendering; mark references.
    Rendered,
    PointerMoved(Point),
    Scrolled(Point),
    Clicked(Point),
    Key(KeyPress),
    ClearHighlights,
    RestartService,
    Shutdown,
}

/// Sending side of a running preview.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    tx: mpsc::Sender<PreviewEvent>,
}

impl PreviewHandle {
    pub async fn send(&self, event: PreviewEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::RuntimeClosed)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(PreviewEvent::Shutdown).await
    }
}

type Resolution = BoxFuture<'static, (OpenRequest, Vec<Tab>)>;

pub struct PreviewRuntime<H, L: ?Sized, S> {
    session: PreviewSession<H, L, S>,
    events: mpsc::Receiver<PreviewEvent>,
    supervisor: Option<ServiceSupervisor>,
    pending: Option<Resolution>,
}

impl<H, L, S> PreviewRuntime<H, L, S>
where
    H: Host + Send + 'static,
    L: LookupService + ?Sized + 'static,
    S: SettingsStore + Send + 'static,
{
    pub fn new(
        session: PreviewSession<H, L, S>,
        supervisor: Option<ServiceSupervisor>,
    ) -> (Self, PreviewHandle) {
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        let runtime = Self {
            session,
            events,
            supervisor,
            pending: None,
        };
        (runtime, PreviewHandle { tx })
    }

    /// Run on a new task. The task hands the session back when it ends.
    pub fn spawn(
        session: PreviewSession<H, L, S>,
        supervisor: Option<ServiceSupervisor>,
    ) -> (PreviewHandle, JoinHandle<PreviewSession<H, L, S>>) {
        let (runtime, handle) = Self::new(session, supervisor);
        (handle, tokio::spawn(runtime.run()))
    }

    pub async fn run(mut self) -> PreviewSession<H, L, S> {
        if let Some(supervisor) = self.supervisor.as_mut() {
            if let Err(e) = supervisor.start().await {
                warn!("Bible server did not start: {}", e);
            }
        }

        loop {
            let deadline = self.session.next_deadline();
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        None | Some(PreviewEvent::Shutdown) => break,
                        Some(event) => self.handle(event).await,
                    }
                }
                _ = sleep_until(deadline) => {
                    let request = self.session.poll(Instant::now());
                    self.begin(request);
                }
                (request, tabs) = resolution(&mut self.pending) => {
                    self.pending = None;
                    self.session.finish_open(request, tabs);
                }
            }
        }

        self.session.close_popup();
        if let Some(supervisor) = self.supervisor.as_mut() {
            supervisor.stop().await;
        }
        info!("Preview runtime stopped");
        self.session
    }

    async fn handle(&mut self, event: PreviewEvent) {
        let now = Instant::now();
        let request = match event {
            PreviewEvent::Rendered => {
                self.session.annotate();
                None
            }
            PreviewEvent::PointerMoved(point) => self.session.pointer_moved(point, now),
            PreviewEvent::Scrolled(point) => self.session.scrolled(point, now),
            PreviewEvent::Clicked(point) => self.session.clicked(point),
            PreviewEvent::Key(press) => {
                self.session.key_pressed(&press);
                None
            }
            PreviewEvent::ClearHighlights => {
                self.session.clear_all_highlights();
                None
            }
            PreviewEvent::RestartService => {
                self.restart_service().await;
                None
            }
            PreviewEvent::Shutdown => None,
        };
        self.begin(request);
    }

    /// Start resolving `request`, replacing any resolution still in flight.
    fn begin(&mut self, request: Option<OpenRequest>) {
        let Some(request) = request else {
            return;
        };
        if self.pending.is_some() {
            debug!("superseding in-flight resolution");
        }
        let client = self.session.lookup().clone();
        self.pending = Some(Box::pin(async move {
            let tabs = client.resolve(&request.target.sub_references).await;
            (request, tabs)
        }));
    }

    async fn restart_service(&mut self) {
        let Some(supervisor) = self.supervisor.as_mut() else {
            self.session
                .notify(&Notice::ServiceFailed("no supervised server".to_string()));
            return;
        };
        let notice = match supervisor.restart().await {
            Ok(_) => Notice::ServiceRestarted,
            Err(e) => Notice::ServiceFailed(e.to_string()),
        };
        self.session.notify(&notice);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

async fn resolution(pending: &mut Option<Resolution>) -> (OpenRequest, Vec<Tab>) {
    match pending {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::testing::MemoryDocument;
    use crate::highlights::{HighlightStore, MemorySettingsStore};
    use crate::hover::HoverTimings;
    use crate::lookup::LookupClient;
    use crate::matcher::ReferenceMatcher;
    use crate::models::{SearchItem, SearchResponse};
    use crate::session::KeyBindings;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct SlowService {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LookupService for SlowService {
        async fn search(&self, query: &str) -> Result<SearchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(SearchResponse {
                items: vec![SearchItem {
                    title: query.to_string(),
                    subtitle: "Enter: 전체".to_string(),
                    arg: Some("In the beginning".to_string()),
                    pure_ref: Some(query.to_string()),
                    ..Default::default()
                }],
            })
        }
    }

    const LINE: &str = "see Gen 1:1 and Acts 2:38";

    fn timings() -> HoverTimings {
        HoverTimings {
            open_delay: Duration::from_millis(40),
            close_delay: Duration::from_millis(30),
            scroll_quiet: Duration::from_millis(30),
        }
    }

    fn spawn(
        delay_ms: u64,
    ) -> (
        PreviewHandle,
        JoinHandle<PreviewSession<MemoryDocument, SlowService, MemorySettingsStore>>,
        Arc<SlowService>,
    ) {
        let service = Arc::new(SlowService {
            delay: Duration::from_millis(delay_ms),
            calls: AtomicUsize::new(0),
        });
        let session = PreviewSession::new(
            MemoryDocument::new(&[LINE]),
            ReferenceMatcher::default(),
            LookupClient::new(Arc::clone(&service)),
            HighlightStore::load(MemorySettingsStore::new()),
            timings(),
            KeyBindings::default(),
        );
        let (handle, task) = PreviewRuntime::spawn(session, None);
        (handle, task, service)
    }

    async fn pause(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test]
    async fn test_dwell_opens_popup() {
        let (handle, task, service) = spawn(0);
        handle.send(PreviewEvent::Rendered).await.unwrap();
        handle
            .send(PreviewEvent::PointerMoved(MemoryDocument::point_at(0, 5)))
            .await
            .unwrap();
        pause(200).await;
        handle.shutdown().await.unwrap();

        let session = task.await.unwrap();
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.host().mounts, 1);
        assert_eq!(session.host().marked_texts().len(), 2);
        // Shutdown tears the popup down.
        assert!(session.host().popup.is_none());
    }

    #[tokio::test]
    async fn test_scroll_during_resolution_drops_result() {
        let (handle, task, service) = spawn(150);
        handle
            .send(PreviewEvent::PointerMoved(MemoryDocument::point_at(0, 5)))
            .await
            .unwrap();
        // Past the open delay, inside the lookup.
        pause(80).await;
        handle
            .send(PreviewEvent::Scrolled(MemoryDocument::point_at(3, 0)))
            .await
            .unwrap();
        pause(250).await;
        handle.shutdown().await.unwrap();

        let session = task.await.unwrap();
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.host().mounts, 0);
    }

    #[tokio::test]
    async fn test_restart_without_supervisor_notifies() {
        let (handle, task, _) = spawn(0);
        handle.send(PreviewEvent::RestartService).await.unwrap();
        handle.shutdown().await.unwrap();

        let session = task.await.unwrap();
        assert!(matches!(
            session.host().notices.as_slice(),
            [Notice::ServiceFailed(_)]
        ));
    }

    #[tokio::test]
    async fn test_handle_errors_after_shutdown() {
        let (handle, task, _) = spawn(0);
        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(matches!(
            handle.send(PreviewEvent::Rendered).await,
            Err(Error::RuntimeClosed)
        ));
    }
}
