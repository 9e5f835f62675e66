mod chrome;
mod document;
pub(crate) mod guard;

pub use chrome::{BrowserConfig, ChromeSource};
pub use document::{DocumentPage, DocumentSource};
