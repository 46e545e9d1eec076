//! HTTP route handlers for the PDF reflow web application.
//!
//! HTML routes use Askama templates from the `templates` module; the
//! translation routes answer with the PDF itself.

mod pages;
mod translate;

pub use pages::{health, index, languages};
pub use translate::{translate_api, translate_form};
