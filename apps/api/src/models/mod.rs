pub mod annotation;
pub mod document;
