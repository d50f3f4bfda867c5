//! Root scope of the parley client: configuration, the app context handed
//! to views, conversation views, error boundaries, routing, cache reducers
//! and permission-gated controls.

pub mod boundary;
pub mod config;
pub mod context;
pub mod controls;
pub mod notice;
pub mod reducers;
pub mod routes;
pub mod view;

pub use config::Config;
pub use context::AppContext;
pub use view::ConversationView;
