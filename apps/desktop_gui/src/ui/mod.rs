//! UI layer for the desktop GUI: login screen, catalogue table and dialogs.

pub mod app;

pub use app::CatalogueApp;
