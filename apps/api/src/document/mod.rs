// Document core: the delta model, the field store, and the two derivations between them.
// Everything here is pure and synchronous; scheduling lives in `editor`.

pub mod delta;
pub mod fields;
pub mod html;
pub mod sync;

pub use delta::{Attributes, Delta, NamedSize, Run, Size};
pub use fields::{ExtractedSnapshot, FieldStore};
pub use html::render_html;
pub use sync::fields_to_delta;
