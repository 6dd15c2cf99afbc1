pub mod collection;
pub mod content;
pub mod factory;
pub mod tab;

pub use collection::{ListChange, ObservableList};
pub use content::TabContent;
pub use factory::ContentFactory;
pub use tab::{Tab, TabId, TabRef};

pub type TabCollection = ObservableList<TabRef>;
