use consent_banner::{BannerAction, BannerConfig, InMemoryPage, render_banner};
use consent_core::StoredConsent;
use consent_session::{PageEvent, PageSession};
use consent_storage::JsonFileStorage;
use consent_tracker::{Tracker, TrackerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dir = tempfile::tempdir()?;
    let profile = dir.path().to_string_lossy().into_owned();
    let config = BannerConfig::default().with_privacy_url("/legal/privacy");
    let tracker = Tracker::new(TrackerConfig::new("//stats.example.org/analytics/", "2"))?;

    // First visit: no cookie yet, the banner appears and the visitor refuses.
    let (mut session, receiver) = PageSession::open(
        config.clone(),
        InMemoryPage::new(),
        JsonFileStorage::new(&profile),
        16,
    )
    .await?;
    let banner = render_banner(&StoredConsent::Absent, session.banner().config());
    if let Some(nodes) = banner.insert {
        for node in nodes {
            println!("{}", node.to_html());
        }
    }
    session.dispatch(PageEvent::Ready)?;
    session.dispatch(PageEvent::Click(BannerAction::Refuse))?;
    let report = session.run(receiver).await;
    println!("first visit: {:?}", report);

    // Second visit: the stored refusal keeps the banner away and turns tracking cookies off.
    let (mut session, receiver) = PageSession::open(
        config.clone(),
        InMemoryPage::new(),
        JsonFileStorage::new(&profile),
        16,
    )
    .await?;
    session.dispatch(PageEvent::Ready)?;
    let report = session.run(receiver).await;
    println!("second visit: {:?}", report);
    println!("{}", tracker.snippet(session.banner().store()));
    Ok(())
}
