//! Configuration module

mod site;

pub use site::CommentsConfig;
pub use site::PrismicConfig;
pub use site::SiteConfig;
