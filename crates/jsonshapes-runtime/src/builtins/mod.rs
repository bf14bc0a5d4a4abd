//! Built-in shape functions.
//!
//! Each module also holds the helpers for the structural literal it is the
//! natural home for: scalar literals in `scalar`, array literals (tuples) in
//! `list`, object literals (records) in `object`.

pub(crate) mod choice;
pub(crate) mod list;
pub(crate) mod object;
pub(crate) mod scalar;
pub(crate) mod text;

use crate::registry::Registry;

pub(crate) fn install(registry: &mut Registry) {
    registry.insert(scalar::StringShape);
    registry.insert(scalar::NonEmptyString);
    registry.insert(scalar::NumberShape);
    registry.insert(scalar::BooleanShape);
    registry.insert(scalar::NullShape);
    registry.insert(scalar::Anything);
    registry.insert(scalar::Constant);
    registry.insert(text::Regexp::default());
    registry.insert(text::Email);
    registry.insert(object::ObjectShape);
    registry.insert(object::Extend);
    registry.insert(object::Dictionary);
    registry.insert(list::ListShape);
    registry.insert(choice::OneOf);
    registry.insert(choice::OneOfNamed);
    registry.insert(choice::Optional);
    registry.insert(choice::Not);
    registry.insert(choice::AllOf);
}
