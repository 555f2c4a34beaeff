//! Application layer: collaborator ports, loading, reveal and change tracking.

pub mod error;
pub mod loader;
pub mod note_page;
pub mod note_view;
pub mod notifier;
pub mod ports;
pub mod reveal;
pub mod route;
pub mod site_page;
