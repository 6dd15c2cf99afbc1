pub mod caption;
pub mod layout;
pub mod renderer;
pub mod skin;
pub mod skins;

pub use caption::{fit_caption, BlockCaptionPainter, CaptionPainter};
pub use layout::{compute_tab_content_width, ContentLimits, LayoutRequest};
pub use renderer::{RenderPass, RendererState, TabRenderer};
pub use skin::{SizingBox, SkinImages, SkinMetrics, SkinProfile};
pub use skins::{ChromeSkin, ClassicSkin, SkinKind};
