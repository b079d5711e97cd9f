#[cfg(feature = "browser")]
pub mod browser;
pub mod extractor;
pub mod http;
pub mod identity;

#[cfg(feature = "browser")]
pub use browser::ChromiumRenderer;
pub use extractor::SelectorExtractor;
pub use http::HttpRenderer;
pub use identity::IdentityPool;
