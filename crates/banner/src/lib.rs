pub mod banner;
pub mod shared;

pub use banner::{BannerPlan, ConsentBanner, apply, render_banner};
pub use shared::{BannerAction, BannerConfig, Element, InMemoryPage, Node, Page};
