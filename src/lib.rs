pub mod app;
pub mod config;
pub mod event;
pub mod form;
pub mod history;
pub mod model;
pub mod session;
pub mod theme;
