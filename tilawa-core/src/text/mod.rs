//! Reference text handling: normalization, word sequence, built-in passages.

pub mod normalize;
pub mod passage;
pub mod reference;

pub use normalize::normalize;
pub use reference::{ReferenceText, ReferenceWord};
