pub mod calendar;
pub mod config;
pub mod events;
pub mod gallery;
pub mod grid;
pub mod index;
pub mod provider;
pub mod state;
pub mod ui;
