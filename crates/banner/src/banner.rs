use consent_core::{ConsentError, ConsentRecord, CookieStore, Decision, StoredConsent, cookie};
use tracing::{debug, info};

use crate::shared::dom::{BannerAction, Element, Node};
use crate::shared::page::Page;
use crate::shared::BannerConfig;

/// Nodes to insert at the top of the body, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerPlan {
    pub insert: Option<Vec<Node>>,
}

/// Builds the banner for `state` without touching any page.
pub fn render_banner(state: &StoredConsent, config: &BannerConfig) -> BannerPlan {
    if state.is_present() {
        return BannerPlan { insert: None };
    }

    let accept = Element::new("button")
        .attr("type", "button")
        .attr("class", "btn btn-xs btn-success")
        .text(&config.accept_label)
        .on_click(BannerAction::Accept);
    let refuse = Element::new("button")
        .attr("type", "button")
        .attr("class", "btn btn-xs btn-danger")
        .text(&config.refuse_label)
        .on_click(BannerAction::Refuse);

    let paragraph = Element::new("p")
        .text(&format!("{} ", config.message))
        .child(
            Element::new("a")
                .attr("href", &config.privacy_url)
                .attr("target", "_blank")
                .text(&config.link_text),
        )
        .text(".")
        .child(accept)
        .child(refuse);

    let container = Element::new("div")
        .attr("class", &config.container_class)
        .child(paragraph);

    BannerPlan {
        insert: Some(vec![container.into()]),
    }
}

/// Applies a plan to the page. Returns whether anything was inserted.
pub fn apply<P: Page>(plan: BannerPlan, page: &mut P) -> bool {
    match plan.insert {
        Some(nodes) => {
            page.prepend_to_body(nodes);
            true
        }
        None => false,
    }
}

pub struct ConsentBanner<C: CookieStore, P: Page> {
    config: BannerConfig,
    store: C,
    page: P,
}

impl<C: CookieStore, P: Page> ConsentBanner<C, P> {
    pub fn new(config: BannerConfig, store: C, page: P) -> Result<Self, ConsentError> {
        config.validate()?;
        Ok(Self { config, store, page })
    }

    pub fn config(&self) -> &BannerConfig {
        &self.config
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn into_parts(self) -> (C, P) {
        (self.store, self.page)
    }

    /// Runs once the page is ready: shows the banner unless a decision is stored.
    pub fn initialize(&mut self) -> bool {
        let state = self.stored_consent();
        if state.is_present() {
            debug!(?state, "consent already recorded, banner skipped");
            return false;
        }

        let shown = apply(render_banner(&state, &self.config), &mut self.page);
        if shown {
            info!(cookie = %self.config.cookie_name, "consent banner shown");
        }
        shown
    }

    pub fn on_accept(&mut self) {
        self.decide(Decision::Accepted);
    }

    pub fn on_deny(&mut self) {
        self.decide(Decision::Refused);
    }

    pub fn on_action(&mut self, action: BannerAction) {
        self.decide(action.decision());
    }

    fn decide(&mut self, decision: Decision) {
        self.write_record(decision, self.config.expiry_days);
        let removed = self.page.remove_by_class(&self.config.container_class);
        info!(?decision, removed, "consent recorded");
    }

    pub fn write_record(&mut self, decision: impl Into<Decision>, days: u32) {
        let record = ConsentRecord::new(decision.into(), days, self.store.now());
        self.store.set_cookie(&record.to_cookie(&self.config.cookie_name));
    }

    /// Decoded value of cookie `name`; `None` when absent.
    pub fn read_record(&self, name: &str) -> Option<String> {
        cookie::read_entry(&self.store.header(), name)
    }

    pub fn stored_consent(&self) -> StoredConsent {
        StoredConsent::from_value(self.read_record(&self.config.cookie_name))
    }

    /// Whether a banner is currently on the page.
    pub fn is_shown(&self) -> bool {
        self.page.count_by_class(&self.config.container_class) > 0
    }
}
