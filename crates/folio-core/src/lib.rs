pub mod config;
pub mod contact_form;
pub mod context;
pub mod matcher;
pub mod rules;
pub mod session;
pub mod template;

pub use config::*;
pub use contact_form::*;
pub use context::*;
pub use matcher::*;
pub use rules::*;
pub use session::*;
pub use template::*;
