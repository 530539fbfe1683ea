pub mod browser;
pub mod scripts;

pub use browser::{BrowserOptions, ChromePage, ChromeSession};
