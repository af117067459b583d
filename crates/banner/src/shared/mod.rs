pub mod config;
pub mod dom;
pub mod page;

pub use config::BannerConfig;
pub use dom::{BannerAction, Element, Node};
pub use page::{InMemoryPage, Page};
