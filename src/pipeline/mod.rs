pub mod dispatch;
pub mod drag;
pub mod hook;
pub mod interpreter;

pub use dispatch::{invoke, InlineDispatcher, UiDispatcher, UiQueue, UiRunner};
pub use drag::{DragCoordinator, DropArea, SurfaceThumbnailFactory, ThumbnailFactory, ThumbnailWindow};
pub use hook::{DefaultHookBackend, HookBackend, MockHookBackend, MockHookHandle, MouseMessage, RawMouseEvent};
pub use interpreter::{MousePipeline, PipelineContext};
