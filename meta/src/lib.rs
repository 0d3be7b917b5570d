//! Decode and validate structs from form values, JSON bodies and maps.
//!
//! A destination type implements [`Meta`] to list its fields. A [`Decoder`]
//! built for it walks the input and the field list together, filling value
//! types such as [`Text`] or [`Int64`] and collecting an [`ErrorMap`] that
//! mirrors the shape of the input.

mod boolean;
mod codec;
pub mod constants;
mod decoder;
mod error;
mod float;
mod form;
mod int;
mod int_slice;
mod schema;
mod source;
mod tags;
mod text;
mod text_slice;
mod time;
mod valuer;

pub use boolean::{Bool, BoolOptions};
pub use codec::{JsonCodec, SerdeJson};
pub use decoder::{Decoder, DecoderBuilder, DecoderOptions};
pub use error::{ErrorCode, ErrorList, ErrorMap, ErrorTree, InvalidOption, SchemaError};
pub use float::{Float64, FloatOptions};
pub use form::{FormTree, FormValues};
pub use int::{Int, Int64, IntOptions, Integer, Uint64};
pub use int_slice::{Int64Slice, IntSlice, IntSliceOptions, Uint64Slice};
pub use schema::{Category, Field, FieldInfo, Meta, Schema, SchemaBuilder, name_mapping};
pub use source::{JsonInput, Source};
pub use tags::{InvalidTags, Tags};
pub use text::{Text, TextOptions};
pub use text_slice::{TextSlice, TextSliceOptions};
pub use time::{Time, TimeOptions};
pub use valuer::{BlankOptions, SliceOptions, Valuer};
