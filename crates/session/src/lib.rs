use consent_banner::{BannerAction, BannerConfig, ConsentBanner, Page};
use consent_core::{ConsentError, Decision};
use consent_storage::{MemoryCookieJar, Storage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events the page's UI queue delivers to the consent logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// The document is ready for manipulation.
    Ready,
    /// A banner control was activated.
    Click(BannerAction),
    Unload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub banner_shown: bool,
    pub decision: Option<Decision>,
    pub events_handled: usize,
    pub events_ignored: usize,
    pub storage_errors: Vec<String>,
}

pub fn to_consent_error(e: impl std::fmt::Display, action: &str) -> ConsentError {
    ConsentError::Storage(format!("{} failed: {}", action, e))
}

/// One page load: a cookie jar, a page and the queue of events hitting them.
pub struct PageSession<P: Page, S: Storage> {
    banner: ConsentBanner<MemoryCookieJar, P>,
    storage: S,
    sender: Option<mpsc::Sender<PageEvent>>,
    ready_seen: bool,
}

impl<P: Page, S: Storage> PageSession<P, S> {
    pub fn new(
        banner: ConsentBanner<MemoryCookieJar, P>,
        storage: S,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<PageEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let session = Self {
            banner,
            storage,
            sender: Some(tx),
            ready_seen: false,
        };
        (session, rx)
    }

    /// Starts a page load with the jar left behind by previous loads.
    pub async fn open(
        config: BannerConfig,
        page: P,
        storage: S,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<PageEvent>), ConsentError> {
        let jar = storage
            .load_jar()
            .await
            .map_err(|e| to_consent_error(e, "LoadJar"))?;
        let banner = ConsentBanner::new(config, jar, page)?;
        Ok(Self::new(banner, storage, capacity))
    }

    pub fn banner(&self) -> &ConsentBanner<MemoryCookieJar, P> {
        &self.banner
    }

    /// Another handle for queueing events, e.g. for a click source.
    pub fn sender(&self) -> Option<mpsc::Sender<PageEvent>> {
        self.sender.clone()
    }

    pub fn dispatch(&self, event: PageEvent) -> Result<(), mpsc::error::TrySendError<PageEvent>> {
        match &self.sender {
            Some(tx) => tx.try_send(event),
            None => Err(mpsc::error::TrySendError::Closed(event)),
        }
    }

    /// Processes queued events in order until `Unload` or until every sender is gone.
    pub async fn run(&mut self, mut receiver: mpsc::Receiver<PageEvent>) -> SessionReport {
        // the session's own handle must not keep the queue open
        self.sender = None;
        let mut report = SessionReport::default();

        while let Some(event) = receiver.recv().await {
            match event {
                PageEvent::Ready if self.ready_seen => {
                    debug!("document ready fired twice, ignoring");
                    report.events_ignored += 1;
                }
                PageEvent::Ready => {
                    self.ready_seen = true;
                    report.banner_shown |= self.banner.initialize();
                    report.events_handled += 1;
                }
                PageEvent::Click(action) if !self.banner.is_shown() => {
                    debug!(?action, "click with no banner on the page, ignoring");
                    report.events_ignored += 1;
                }
                PageEvent::Click(action) => {
                    self.banner.on_action(action);
                    report.decision = self.banner.stored_consent().decision();
                    report.events_handled += 1;

                    if let Err(e) = self.storage.save_jar(self.banner.store()).await {
                        let err = to_consent_error(e, "SaveJar");
                        warn!(error = %err, "consent cookie not persisted; banner will return next load");
                        report.storage_errors.push(err.to_string());
                    }
                }
                PageEvent::Unload => {
                    report.events_handled += 1;
                    break;
                }
            }
        }

        info!(
            shown = report.banner_shown,
            decision = ?report.decision,
            handled = report.events_handled,
            "page session finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use consent_banner::InMemoryPage;
    use consent_core::CookieStore;
    use consent_storage::{JsonFileStorage, MemoryStorage};

    async fn open(
        storage: JsonFileStorage,
    ) -> (PageSession<InMemoryPage, JsonFileStorage>, mpsc::Receiver<PageEvent>) {
        PageSession::open(BannerConfig::default(), InMemoryPage::new(), storage, 8)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn refusal_persists_across_page_loads() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().to_string_lossy().into_owned();

        let (mut first, rx) = open(JsonFileStorage::new(&folder)).await;
        first.dispatch(PageEvent::Ready).unwrap();
        first.dispatch(PageEvent::Click(BannerAction::Refuse)).unwrap();
        let report = first.run(rx).await;
        assert!(report.banner_shown);
        assert_eq!(report.decision, Some(Decision::Refused));
        assert!(report.storage_errors.is_empty());
        assert!(!first.banner().is_shown());

        let (mut second, rx) = open(JsonFileStorage::new(&folder)).await;
        second.dispatch(PageEvent::Ready).unwrap();
        let report = second.run(rx).await;
        assert!(!report.banner_shown);
        assert_eq!(second.banner().read_record("_accept_cookies").as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn ready_fires_at_most_once() {
        let banner = ConsentBanner::new(BannerConfig::default(), MemoryCookieJar::new(), InMemoryPage::new())
            .unwrap();
        let (mut session, rx) = PageSession::new(banner, MemoryStorage::new(), 8);
        session.dispatch(PageEvent::Ready).unwrap();
        session.dispatch(PageEvent::Ready).unwrap();
        let report = session.run(rx).await;

        assert_eq!(report.events_handled, 1);
        assert_eq!(report.events_ignored, 1);
        assert_eq!(session.banner().page().count_by_class("cookie-consent"), 1);
    }

    #[tokio::test]
    async fn clicks_without_a_banner_are_ignored() {
        let mut jar = MemoryCookieJar::new();
        jar.set_entry("_accept_cookies", "true", 365);
        let banner = ConsentBanner::new(BannerConfig::default(), jar, InMemoryPage::new())
            .unwrap();
        let storage = MemoryStorage::new();
        let (mut session, rx) = PageSession::new(banner, storage, 8);

        session.dispatch(PageEvent::Ready).unwrap();
        session.dispatch(PageEvent::Click(BannerAction::Refuse)).unwrap();
        let report = session.run(rx).await;

        assert_eq!(report.decision, None);
        assert_eq!(report.events_ignored, 1);
        assert_eq!(session.banner().read_record("_accept_cookies").as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn unload_stops_the_queue() {
        let banner = ConsentBanner::new(BannerConfig::default(), MemoryCookieJar::new(), InMemoryPage::new())
            .unwrap();
        let (mut session, rx) = PageSession::new(banner, MemoryStorage::new(), 8);
        session.dispatch(PageEvent::Ready).unwrap();
        session.dispatch(PageEvent::Unload).unwrap();
        session.dispatch(PageEvent::Click(BannerAction::Accept)).unwrap();

        let report = session.run(rx).await;
        assert_eq!(report.decision, None);
        assert!(session.banner().is_shown());
        assert!(session.dispatch(PageEvent::Ready).is_err());
    }

    #[tokio::test]
    async fn extra_senders_feed_the_same_queue() {
        let banner = ConsentBanner::new(BannerConfig::default(), MemoryCookieJar::new(), InMemoryPage::new())
            .unwrap();
        let (mut session, rx) = PageSession::new(banner, MemoryStorage::new(), 8);
        let clicks = session.sender();
        session.dispatch(PageEvent::Ready).unwrap();
        let clicks = clicks.expect("session still owns its sender before run");
        clicks.send(PageEvent::Click(BannerAction::Accept)).await.unwrap();
        drop(clicks);

        let report = session.run(rx).await;
        assert_eq!(report.decision, Some(Decision::Accepted));
    }

    struct BrokenStorage;

    #[async_trait]
    impl Storage for BrokenStorage {
        async fn load_jar(&self) -> anyhow::Result<MemoryCookieJar> {
            Ok(MemoryCookieJar::new())
        }

        async fn save_jar(&self, _jar: &MemoryCookieJar) -> anyhow::Result<()> {
            anyhow::bail!("read-only profile")
        }
    }

    #[tokio::test]
    async fn storage_failure_is_reported_not_fatal() {
        let (mut session, rx) =
            PageSession::open(BannerConfig::default(), InMemoryPage::new(), BrokenStorage, 4)
                .await
                .unwrap();
        session.dispatch(PageEvent::Ready).unwrap();
        session.dispatch(PageEvent::Click(BannerAction::Accept)).unwrap();
        let report = session.run(rx).await;

        assert_eq!(report.decision, Some(Decision::Accepted));
        assert_eq!(report.storage_errors.len(), 1);
        assert!(report.storage_errors[0].contains("read-only profile"));
        assert!(!session.banner().is_shown());
    }
}
