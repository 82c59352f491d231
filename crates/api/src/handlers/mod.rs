pub mod client;
pub mod event_view;
pub mod events;
