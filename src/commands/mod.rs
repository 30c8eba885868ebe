pub mod menu;
pub mod merge;

pub use menu::menu;
pub use merge::merge;
