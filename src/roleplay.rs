//! Two-role conversation templates and the session that plays them out.

#[path = "roleplay/session.rs"]
mod session;

#[path = "roleplay/templates.rs"]
mod templates;

pub use session::RolePlay;
pub use templates::{RoleTemplate, TemplateCatalog};
