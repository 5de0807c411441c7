//! Text references to message fields, exchanged between views and plots.
//!
//! Format: `sender:class:message:field:scale`, or for array fields
//! `sender:class:message:field[i]:scale` / `field[lo-hi]` (inclusive).

pub mod field_index;

pub use field_index::{
    decode, decode_reference, encode, encode_range, AddressError, FieldIndex, FieldReference,
};
