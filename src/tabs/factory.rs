use crate::tabs::content::TabContent;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type ContentHandler = Arc<dyn Fn() -> anyhow::Result<Arc<dyn TabContent>> + Send + Sync>;
type OneShotHandler = Box<dyn FnOnce() -> anyhow::Result<Arc<dyn TabContent>> + Send>;

/// Creates the content for new tabs.
///
/// Permanent handlers stay installed for the life of the application; the most
/// recently registered one answers. A one-shot override replaces them for
/// exactly the next call and then falls away, restoring the permanent set.
#[derive(Default)]
pub struct ContentFactory {
    permanent: Mutex<Vec<ContentHandler>>,
    one_shot: Mutex<Option<OneShotHandler>>,
}

impl ContentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn TabContent>> + Send + Sync + 'static,
    {
        let factory = Self::default();
        factory.add_handler(handler);
        factory
    }

    fn permanent(&self) -> MutexGuard<'_, Vec<ContentHandler>> {
        self.permanent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_handler<F>(&self, handler: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn TabContent>> + Send + Sync + 'static,
    {
        self.permanent().push(Arc::new(handler));
    }

    /// Installs a handler that is used for the next creation only.
    pub fn override_next<F>(&self, handler: F)
    where
        F: FnOnce() -> anyhow::Result<Arc<dyn TabContent>> + Send + 'static,
    {
        let mut slot = self.one_shot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Box::new(handler));
    }

    pub fn has_override(&self) -> bool {
        self.one_shot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn create(&self) -> anyhow::Result<Arc<dyn TabContent>> {
        let one_shot = self
            .one_shot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handler) = one_shot {
            tracing::debug!("creating tab content through one-shot override");
            return handler();
        }
        let handler = self.permanent().last().cloned();
        match handler {
            Some(handler) => handler(),
            None => Err(anyhow::anyhow!(
                crate::error::TabStripError::ContentCreation(
                    "no content handler registered".to_string()
                )
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ContentFactory;
    use crate::geometry::Rect;
    use crate::tabs::content::TabContent;
    use std::sync::Arc;

    struct Named(&'static str);

    impl TabContent for Named {
        fn title(&self) -> String {
            self.0.to_string()
        }

        fn set_bounds(&self, _bounds: Rect) {}
    }

    #[test]
    fn one_shot_override_is_used_exactly_once() {
        let factory = ContentFactory::with_handler(|| Ok(Arc::new(Named("default"))));
        factory.override_next(|| Ok(Arc::new(Named("special"))));
        assert!(factory.has_override());

        assert_eq!(factory.create().unwrap().title(), "special");
        assert!(!factory.has_override());
        assert_eq!(factory.create().unwrap().title(), "default");
        assert_eq!(factory.create().unwrap().title(), "default");
    }

    #[test]
    fn latest_permanent_handler_wins() {
        let factory = ContentFactory::new();
        factory.add_handler(|| Ok(Arc::new(Named("first"))));
        factory.add_handler(|| Ok(Arc::new(Named("second"))));
        assert_eq!(factory.create().unwrap().title(), "second");
    }

    #[test]
    fn empty_factory_reports_error() {
        let factory = ContentFactory::new();
        let err = factory.create().err().expect("expected error");
        assert!(err.to_string().contains("no content handler"));
    }
}
