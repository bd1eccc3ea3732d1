pub mod content;
pub mod events;
pub mod gallery;
pub mod models;
pub mod request;
pub mod runs;
pub mod state;
