use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::codec::{JsonCodec, SerdeJson};
use crate::error::{ErrorCode, ErrorList, ErrorMap, ErrorTree, SchemaError};
use crate::form::{FormTree, FormValues};
use crate::schema::{
    Binding, BuildContext, FieldInfo, Meta, Retained, Schema, SchemaCell, SchemaLink,
};
use crate::source::{JsonInput, Source};
use crate::valuer::Valuer;

/// Settings shared by every field of a decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// When not empty, the formats of every `Time` field, replacing both the
    /// defaults and any `meta_format` tag.
    pub time_formats: Vec<String>,
}

/// Decoding hit structurally broken input; no field errors are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Malformed;

pub(crate) type Outcome = Result<Option<ErrorTree>, Malformed>;

/// Fills values of `T` from form values, JSON bodies and maps.
///
/// The schema of `T` is built once; cloning a decoder is cheap and clones
/// can be shared between threads.
pub struct Decoder<T> {
    root: Arc<SchemaCell<T>>,
    retained: Retained,
    codec: Arc<dyn JsonCodec>,
}

impl<T> Clone for Decoder<T> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
            retained: Arc::clone(&self.retained),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<T> fmt::Debug for Decoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("schema", &self.root.get())
            .field("schemas", &self.retained.len())
            .field("codec", &self.codec)
            .finish()
    }
}

impl<T: Meta> Decoder<T> {
    pub fn new() -> Result<Self, SchemaError> {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::new()
    }

    /// Decodes a JSON body and form values together. Values in the body take
    /// precedence.
    pub fn decode(&self, dest: &mut T, values: &FormValues, body: &[u8]) -> Result<(), ErrorMap> {
        let json = JsonInput::parse(self.codec.as_ref(), body);
        let tree = FormTree::new(values);
        self.decode_source(dest, &Source::merged(vec![json.source(), Source::form(&tree)]))
    }

    pub fn decode_json(&self, dest: &mut T, body: &[u8]) -> Result<(), ErrorMap> {
        let json = JsonInput::parse(self.codec.as_ref(), body);
        self.decode_source(dest, &json.source())
    }

    /// Decodes form values whose dotted keys address nested fields and
    /// slice elements, e.g. `address.city` or `tags.0`.
    pub fn decode_values(&self, dest: &mut T, values: &FormValues) -> Result<(), ErrorMap> {
        let tree = FormTree::new(values);
        self.decode_source(dest, &Source::form(&tree))
    }

    pub fn decode_map(&self, dest: &mut T, map: &Map<String, Value>) -> Result<(), ErrorMap> {
        self.decode_source(dest, &Source::map(map))
    }

    pub fn decode_source(&self, dest: &mut T, src: &Source<'_>) -> Result<(), ErrorMap> {
        let result = if src.is_malformed() {
            Err(Malformed)
        } else {
            decode_cell(&self.root, dest, src)
        };

        match result {
            Ok(errors) if errors.is_empty() => Ok(()),
            Ok(errors) => {
                debug!(
                    type_name = type_name::<T>(),
                    fields = errors.len(),
                    "decode failed validation"
                );
                Err(errors)
            }
            Err(Malformed) => {
                debug!(type_name = type_name::<T>(), "decode found malformed input");
                Err(ErrorMap::malformed())
            }
        }
    }

    /// Allocates a fresh destination and decodes into it.
    pub fn new_decoded(&self, values: &FormValues, body: &[u8]) -> Result<T, ErrorMap> {
        let mut dest = T::default();
        self.decode(&mut dest, values, body)?;
        Ok(dest)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.root
            .get()
            .into_iter()
            .flat_map(|schema| schema.fields().iter().map(|field| field.info()))
    }
}

/// Configures a [`Decoder`] before its schema is built.
#[derive(Debug, Clone, Default)]
pub struct DecoderBuilder {
    options: DecoderOptions,
    codec: Option<Arc<dyn JsonCodec>>,
}

impl DecoderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn time_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.time_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn codec(mut self, codec: impl JsonCodec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    pub fn build<T: Meta>(self) -> Result<Decoder<T>, SchemaError> {
        let mut context = BuildContext::new(self.options);
        let root = context.build::<T>()?;
        let retained = context.into_retained();
        debug!(
            type_name = type_name::<T>(),
            fields = root.get().map_or(0, |schema| schema.fields().len()),
            schemas = retained.len(),
            "schema built"
        );
        Ok(Decoder {
            root,
            retained,
            codec: self.codec.unwrap_or_else(|| Arc::new(SerdeJson)),
        })
    }
}

pub(crate) fn decode_cell<T>(cell: &SchemaCell<T>, dest: &mut T, src: &Source<'_>) -> Result<ErrorMap, Malformed> {
    if let Some(schema) = cell.get() {
        decode_struct(schema, dest, src)
    } else {
        error!(type_name = type_name::<T>(), "schema used before it was built");
        Err(Malformed)
    }
}

fn decode_struct<T>(schema: &Schema<T>, dest: &mut T, src: &Source<'_>) -> Result<ErrorMap, Malformed> {
    let mut errors = ErrorMap::new();

    for field in schema.fields() {
        let info = field.info();
        match field.binding() {
            Binding::Value(decode) => {
                let child = src.get(&info.name);
                if child.is_malformed() {
                    return Err(Malformed);
                }
                if let Some(error) = decode(dest, &child, info)? {
                    errors.insert(info.name.as_str(), error);
                }
            }
            Binding::CatchAll(assign) => assign(dest, src.value_map()),
        }
    }

    Ok(errors)
}

/// Raw value of a non-empty node.
fn raw_value<'a>(src: &Source<'a>) -> Result<Result<Cow<'a, Value>, ErrorTree>, Malformed> {
    match src.value() {
        Ok(value) => Ok(Ok(value)),
        Err(ErrorCode::Emalformed) => Err(Malformed),
        Err(code) => Ok(Err(code.into())),
    }
}

pub(crate) fn decode_scalar<V: Valuer>(
    slot: &mut V,
    src: &Source<'_>,
    info: &FieldInfo,
    options: &V::Options,
) -> Outcome {
    let value = if src.is_empty() {
        match &info.default {
            Some(default) => Cow::Owned(Value::String(default.clone())),
            None if info.required => return Ok(Some(ErrorCode::Erequired.into())),
            None => return Ok(None),
        }
    } else {
        match raw_value(src)? {
            Ok(value) => value,
            Err(error) => return Ok(Some(error)),
        }
    };

    match slot.json_value(src.path(), &value, options) {
        Err(error) if !info.discard_invalid => Ok(Some(error)),
        Ok(()) | Err(_) => Ok(None),
    }
}

fn decode_linked<S>(slot: &mut S, link: &SchemaLink<S>, src: &Source<'_>) -> Outcome {
    let errors = link.decode(slot, src)?;
    Ok((!errors.is_empty()).then(|| errors.into()))
}

pub(crate) fn decode_nested<S>(
    slot: &mut S,
    link: &SchemaLink<S>,
    src: &Source<'_>,
    info: &FieldInfo,
) -> Outcome {
    if src.is_empty() {
        return Ok(info.required.then_some(ErrorTree::Atom(ErrorCode::Erequired)));
    }
    decode_linked(slot, link, src)
}

pub(crate) fn decode_optional_nested<S: Default>(
    slot: &mut Option<S>,
    link: &SchemaLink<S>,
    src: &Source<'_>,
    info: &FieldInfo,
) -> Outcome {
    if src.is_empty() {
        return Ok(info.required.then_some(ErrorTree::Atom(ErrorCode::Erequired)));
    }
    decode_linked(slot.get_or_insert_with(S::default), link, src)
}

/// Walks `0, 1, 2, ...` under `src` until the first empty child, handing
/// each element to `decode`. Returns the decoded elements and the errors
/// aligned to their input positions.
fn probe<E, F>(src: &Source<'_>, mut decode: F) -> Result<(Vec<E>, ErrorList), Malformed>
where
    E: Default,
    F: FnMut(&mut E, &Source<'_>) -> Outcome,
{
    let mut values = Vec::new();
    let mut errors = ErrorList::new();

    for index in 0_usize.. {
        let item = src.get(&index.to_string());
        if item.is_malformed() {
            return Err(Malformed);
        }
        if item.is_empty() {
            break;
        }

        let mut element = E::default();
        match decode(&mut element, &item)? {
            None => {
                values.push(element);
                errors.push(None);
            }
            Some(error) => errors.push(Some(error)),
        }
    }

    Ok((values, errors))
}

/// Length bounds apply to the probed count. Nothing probed leaves the
/// destination untouched.
fn commit<E>(slot: &mut Vec<E>, values: Vec<E>, errors: ErrorList, info: &FieldInfo) -> Option<ErrorTree> {
    if let Err(code) = info.slice.check(errors.len()) {
        return Some(code.into());
    }
    if !errors.is_empty() {
        *slot = values;
    }
    (errors.live_count() > 0).then(|| errors.into())
}

pub(crate) fn decode_scalar_slice<V: Valuer>(
    slot: &mut Vec<V>,
    src: &Source<'_>,
    info: &FieldInfo,
    options: &V::Options,
) -> Outcome {
    let (values, errors) = probe(src, |element: &mut V, item| {
        let value = match raw_value(item)? {
            Ok(value) => value,
            Err(error) => return Ok(Some(error)),
        };
        Ok(element.json_value(item.path(), &value, options).err())
    })?;
    Ok(commit(slot, values, errors, info))
}

pub(crate) fn decode_struct_slice<S: Default>(
    slot: &mut Vec<S>,
    link: &SchemaLink<S>,
    src: &Source<'_>,
    info: &FieldInfo,
) -> Outcome {
    let (values, errors) = probe(src, |element: &mut S, item| decode_linked(element, link, item))?;
    Ok(commit(slot, values, errors, info))
}
