mod catalog;
mod types;

pub use catalog::{BrowserCatalog, CatalogEntry, CatalogError};
pub use types::{ActivityKey, BrowserRule, BrowserState, WindowType, NEW_TAB_TITLE};
