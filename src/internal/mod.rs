pub mod feed;
pub mod models;
pub mod navigation;
pub mod normalize;
pub mod ui;
