pub mod app;
pub mod month_pane;
pub mod thumbnails;

pub use app::App;
pub use month_pane::{MonthPane, StatusBar, Theme};
pub use thumbnails::ThumbnailLoader;
