//! Typed view of what the primer form submits.
//!
//! # Request Shapes
//!
//! - [`DesignRequest`]: design primers for template regions with Primer3, then
//!   check their specificity against one or more databases.
//! - [`CheckRequest`]: check the specificity of user-supplied primer groups only.
//!
//! Both are built from a [`FormFields`] by [`JobRequest::from_form`], which does
//! all validation up front so the pipeline only ever sees well-formed values.

mod form;
mod input;
mod job;
mod settings;

pub use form::*;
pub use input::*;
pub use job::*;
pub use settings::*;
