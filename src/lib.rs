pub mod app;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod overlay;
pub mod pipeline;
pub mod pixels;
pub mod render;
pub mod settings;
pub mod tabs;
pub mod window;

pub use app::{TabbedApplication, TabbedApplicationBuilder, WindowRequest};
pub use error::{Result, TabStripError};
pub use settings::TabStripSettings;
pub use tabs::{Tab, TabCollection, TabContent, TabRef};
pub use window::TabbedWindow;
