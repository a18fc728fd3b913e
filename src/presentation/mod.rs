//! Presentation layer: the push edge where consumed events reach users.

pub mod push;
