//! Structured output: target shapes and the decoder.
//!
//! A [`TargetShape`] describes what the caller expects back. Its format
//! instructions are appended to the user message, and [`decode`] maps the
//! provider's raw text onto the shape in a single attempt. A malformed
//! response is a [`GatewayError::SchemaDecode`](crate::GatewayError::SchemaDecode);
//! the model is never asked to try again.

pub mod decode;
pub mod presets;
pub mod shape;

pub use decode::{StructuredResult, decode};
pub use presets::{Plan, StructuredAnswer, TripPlan};
pub use shape::{FieldKind, FieldSpec, ObjectSchema, TargetShape};
