use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;

use crate::constants::{
    CATCH_ALL_NAME, SKIP_NAME, TAG_DEFAULT, TAG_DISCARD_INVALID, TAG_DOC, TAG_DOC_PATTERN,
    TAG_REQUIRED,
};
use crate::decoder::{self, DecoderOptions, Malformed, Outcome};
use crate::error::{ErrorMap, InvalidOption, SchemaError};
use crate::source::Source;
use crate::tags::{InvalidTags, Tags};
use crate::valuer::{SliceOptions, Valuer};

/// A destination type the decoder can fill.
///
/// `describe` lists the type's fields once, when a decoder is built. Each
/// field is registered with its identifier, its tag string and an accessor
/// to the slot it fills.
///
/// ```
/// use meta::{Decoder, FormValues, Int64, Meta, SchemaBuilder, SchemaError, Text};
///
/// #[derive(Debug, Default)]
/// struct Login {
///     user: Text,
///     attempts: Int64,
/// }
///
/// impl Meta for Login {
///     fn describe(schema: &mut SchemaBuilder<'_, Self>) -> Result<(), SchemaError> {
///         schema
///             .scalar("user", r#"meta_required:"true""#, |l| &mut l.user)?
///             .scalar("attempts", r#"meta_min:"0""#, |l| &mut l.attempts)?;
///         Ok(())
///     }
/// }
///
/// let decoder = Decoder::<Login>::new().unwrap();
/// let mut login = Login::default();
/// let form = FormValues::from_iter([("user", "ada"), ("attempts", "3")]);
/// assert!(decoder.decode_values(&mut login, &form).is_ok());
/// assert_eq!(login.user.get(), Some("ada"));
/// assert_eq!(login.attempts.get(), Some(3));
/// ```
pub trait Meta: Default + Send + Sync + 'static {
    fn describe(schema: &mut SchemaBuilder<'_, Self>) -> Result<(), SchemaError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Scalar,
    Struct,
    ScalarSlice,
    StructSlice,
    CatchAll,
}

impl Category {
    const fn is_slice(self) -> bool {
        matches!(self, Self::ScalarSlice | Self::StructSlice)
    }
}

/// What a field reads from the input and how it is constrained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub required: bool,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub discard_invalid: bool,
    #[serde(skip_serializing_if = "is_unbounded")]
    pub slice: SliceOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_pattern: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

const fn is_unbounded(slice: &SliceOptions) -> bool {
    !slice.is_bounded()
}

pub(crate) type DecodeFn<T> =
    Arc<dyn Fn(&mut T, &Source<'_>, &FieldInfo) -> Outcome + Send + Sync>;
pub(crate) type AssignFn<T> = Arc<dyn Fn(&mut T, Map<String, Value>) + Send + Sync>;

pub(crate) enum Binding<T> {
    /// Reads the child node named after the field.
    Value(DecodeFn<T>),
    /// Receives every child of the enclosing node.
    CatchAll(AssignFn<T>),
}

fn bind<T, F>(decode: F) -> DecodeFn<T>
where
    F: Fn(&mut T, &Source<'_>, &FieldInfo) -> Outcome + Send + Sync + 'static,
{
    Arc::new(decode)
}

fn assign<T, F>(assign: F) -> AssignFn<T>
where
    F: Fn(&mut T, Map<String, Value>) + Send + Sync + 'static,
{
    Arc::new(assign)
}

impl<E: 'static> Binding<E> {
    /// Re-targets a binding of an embedded type onto the type embedding it.
    fn rebase<T, A>(&self, access: &Arc<A>) -> Binding<T>
    where
        T: 'static,
        A: Fn(&mut T) -> &mut E + Send + Sync + 'static,
    {
        let access = Arc::clone(access);
        match self {
            Self::Value(decode) => {
                let decode = Arc::clone(decode);
                Binding::Value(bind(move |dest, src, info| decode(access(dest), src, info)))
            }
            Self::CatchAll(set) => {
                let set = Arc::clone(set);
                Binding::CatchAll(assign(move |dest, map| set(access(dest), map)))
            }
        }
    }
}

pub struct Field<T> {
    info: FieldInfo,
    binding: Binding<T>,
}

impl<T> Field<T> {
    #[must_use]
    pub const fn info(&self) -> &FieldInfo {
        &self.info
    }

    pub(crate) const fn binding(&self) -> &Binding<T> {
        &self.binding
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("info", &self.info).finish_non_exhaustive()
    }
}

/// The ordered field list of one destination type.
pub struct Schema<T> {
    type_name: &'static str,
    fields: Vec<Field<T>>,
}

impl<T> Schema<T> {
    #[must_use]
    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Empty while the type is still being described.
pub(crate) type SchemaCell<T> = OnceLock<Schema<T>>;

/// Reference from a field to the schema of its nested type. A type nested
/// inside itself, directly or through other types, points back weakly.
pub(crate) enum SchemaLink<S> {
    Owned(Arc<SchemaCell<S>>),
    Back(Weak<SchemaCell<S>>),
}

impl<S> SchemaLink<S> {
    pub(crate) fn decode(&self, dest: &mut S, src: &Source<'_>) -> Result<ErrorMap, Malformed> {
        match self {
            Self::Owned(cell) => decoder::decode_cell(cell, dest, src),
            Self::Back(weak) => match weak.upgrade() {
                Some(cell) => decoder::decode_cell(&cell, dest, src),
                None => {
                    error!(type_name = type_name::<S>(), "schema released before decode");
                    Err(Malformed)
                }
            },
        }
    }
}

/// Every schema of one build, held by the decoder so back links stay valid.
pub(crate) type Retained = Arc<[Arc<dyn Any + Send + Sync>]>;

/// Schemas built so far during one decoder build, keyed by type.
pub(crate) struct BuildContext {
    options: DecoderOptions,
    schemas: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl BuildContext {
    pub(crate) fn new(options: DecoderOptions) -> Self {
        Self {
            options,
            schemas: HashMap::new(),
        }
    }

    pub(crate) fn build<S: Meta>(&mut self) -> Result<Arc<SchemaCell<S>>, SchemaError> {
        let cell: Arc<SchemaCell<S>> = Arc::new(OnceLock::new());
        self.schemas.insert(TypeId::of::<S>(), Arc::clone(&cell) as _);

        let mut builder = SchemaBuilder {
            fields: Vec::new(),
            context: self,
        };
        S::describe(&mut builder)?;
        let fields = builder.fields;

        let _ = cell.set(Schema {
            type_name: type_name::<S>(),
            fields,
        });
        Ok(cell)
    }

    fn link<S: Meta>(&mut self) -> Result<SchemaLink<S>, SchemaError> {
        if let Some(cell) = self
            .schemas
            .get(&TypeId::of::<S>())
            .cloned()
            .and_then(|cell| cell.downcast::<SchemaCell<S>>().ok())
        {
            return Ok(if cell.get().is_some() {
                SchemaLink::Owned(cell)
            } else {
                SchemaLink::Back(Arc::downgrade(&cell))
            });
        }
        self.build::<S>().map(SchemaLink::Owned)
    }

    pub(crate) fn into_retained(self) -> Retained {
        self.schemas.into_values().collect()
    }
}

/// Collects the fields of `T` while its schema is being built.
pub struct SchemaBuilder<'c, T> {
    fields: Vec<Field<T>>,
    context: &'c mut BuildContext,
}

impl<T: Meta> SchemaBuilder<'_, T> {
    /// A single value parsed by `V`.
    pub fn scalar<V, A>(&mut self, ident: &str, tags: &str, access: A) -> Result<&mut Self, SchemaError>
    where
        V: Valuer,
        A: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let Some((info, tags)) = Self::prepare(ident, tags, Category::Scalar)? else {
            return Ok(self);
        };
        let options = self.valuer_options::<V>(ident, &tags)?;
        self.push(
            info,
            Binding::Value(bind(move |dest, src, info| {
                decoder::decode_scalar(access(dest), src, info, &options)
            })),
        )
    }

    /// A nested struct that is always allocated.
    pub fn nested<S, A>(&mut self, ident: &str, tags: &str, access: A) -> Result<&mut Self, SchemaError>
    where
        S: Meta,
        A: Fn(&mut T) -> &mut S + Send + Sync + 'static,
    {
        let Some((info, _)) = Self::prepare(ident, tags, Category::Struct)? else {
            return Ok(self);
        };
        let link = self.context.link::<S>()?;
        self.push(
            info,
            Binding::Value(bind(move |dest, src, info| {
                decoder::decode_nested(access(dest), &link, src, info)
            })),
        )
    }

    /// A nested struct allocated only when the input carries it.
    pub fn optional_nested<S, A>(
        &mut self,
        ident: &str,
        tags: &str,
        access: A,
    ) -> Result<&mut Self, SchemaError>
    where
        S: Meta,
        A: Fn(&mut T) -> &mut Option<S> + Send + Sync + 'static,
    {
        let Some((info, _)) = Self::prepare(ident, tags, Category::Struct)? else {
            return Ok(self);
        };
        let link = self.context.link::<S>()?;
        self.push(
            info,
            Binding::Value(bind(move |dest, src, info| {
                decoder::decode_optional_nested(access(dest), &link, src, info)
            })),
        )
    }

    /// A list of values, each parsed by `V` with the field's tags.
    pub fn scalar_slice<V, A>(
        &mut self,
        ident: &str,
        tags: &str,
        access: A,
    ) -> Result<&mut Self, SchemaError>
    where
        V: Valuer,
        A: Fn(&mut T) -> &mut Vec<V> + Send + Sync + 'static,
    {
        let Some((info, tags)) = Self::prepare(ident, tags, Category::ScalarSlice)? else {
            return Ok(self);
        };
        let options = self.valuer_options::<V>(ident, &tags)?;
        self.push(
            info,
            Binding::Value(bind(move |dest, src, info| {
                decoder::decode_scalar_slice(access(dest), src, info, &options)
            })),
        )
    }

    /// A list of nested structs. `S` may be `T` itself.
    pub fn struct_slice<S, A>(
        &mut self,
        ident: &str,
        tags: &str,
        access: A,
    ) -> Result<&mut Self, SchemaError>
    where
        S: Meta,
        A: Fn(&mut T) -> &mut Vec<S> + Send + Sync + 'static,
    {
        let Some((info, _)) = Self::prepare(ident, tags, Category::StructSlice)? else {
            return Ok(self);
        };
        let link = self.context.link::<S>()?;
        self.push(
            info,
            Binding::Value(bind(move |dest, src, info| {
                decoder::decode_struct_slice(access(dest), &link, src, info)
            })),
        )
    }

    /// Receives every key of the enclosing object, declared or not.
    pub fn catch_all<A>(&mut self, ident: &str, tags: &str, access: A) -> Result<&mut Self, SchemaError>
    where
        A: Fn(&mut T) -> &mut Map<String, Value> + Send + Sync + 'static,
    {
        let Some((info, _)) = Self::prepare(ident, tags, Category::CatchAll)? else {
            return Ok(self);
        };
        self.push(
            info,
            Binding::CatchAll(assign(move |dest, map| *access(dest) = map)),
        )
    }

    /// Flattens the fields of `E` into this type, as if declared here.
    pub fn embed<E, A>(&mut self, access: A) -> Result<&mut Self, SchemaError>
    where
        E: Meta,
        A: Fn(&mut T) -> &mut E + Send + Sync + 'static,
    {
        let recursive = SchemaError::RecursiveEmbed {
            type_name: type_name::<E>(),
        };
        let SchemaLink::Owned(cell) = self.context.link::<E>()? else {
            return Err(recursive);
        };
        let Some(schema) = cell.get() else {
            return Err(recursive);
        };

        let access = Arc::new(access);
        for field in &schema.fields {
            self.push(field.info.clone(), field.binding.rebase(&access))?;
        }
        Ok(self)
    }

    /// Parses the tag string and resolves the external name. `None` means
    /// the field is skipped.
    fn prepare(
        ident: &str,
        tags: &str,
        category: Category,
    ) -> Result<Option<(FieldInfo, Tags)>, SchemaError> {
        let tags = Tags::try_from(tags).map_err(|source| Self::tags_error(ident, source))?;

        let name = match tags.name() {
            Some(SKIP_NAME) => return Ok(None),
            Some(CATCH_ALL_NAME) if category != Category::CatchAll => {
                return Err(Self::tags_error(
                    ident,
                    InvalidTags(format!("`{CATCH_ALL_NAME}` is reserved for catch-all fields")),
                ));
            }
            Some(_) | None if category == Category::CatchAll => CATCH_ALL_NAME.to_string(),
            Some(name) => name.to_string(),
            None => name_mapping(ident),
        };

        let scalar = category == Category::Scalar;
        let slice = if category.is_slice() {
            SliceOptions::from_tags(&tags).map_err(|source| Self::option_error(ident, source))?
        } else {
            SliceOptions::default()
        };

        let info = FieldInfo {
            name,
            required: tags.is_true(TAG_REQUIRED),
            category,
            default: tags
                .get(TAG_DEFAULT)
                .filter(|_| scalar)
                .map(str::to_string),
            discard_invalid: scalar && tags.is_true(TAG_DISCARD_INVALID),
            slice,
            doc: tags.get(TAG_DOC).map(str::to_string),
            doc_pattern: tags.get(TAG_DOC_PATTERN).map(str::to_string),
        };
        Ok(Some((info, tags)))
    }

    fn valuer_options<V: Valuer>(&self, ident: &str, tags: &Tags) -> Result<V::Options, SchemaError> {
        V::parse_options(tags, &self.context.options).map_err(|source| Self::option_error(ident, source))
    }

    fn push(&mut self, info: FieldInfo, binding: Binding<T>) -> Result<&mut Self, SchemaError> {
        if info.category == Category::CatchAll
            && self
                .fields
                .iter()
                .any(|field| field.info.category == Category::CatchAll)
        {
            return Err(SchemaError::DuplicateCatchAll {
                type_name: type_name::<T>(),
            });
        }
        self.fields.push(Field { info, binding });
        Ok(self)
    }

    fn tags_error(ident: &str, source: InvalidTags) -> SchemaError {
        SchemaError::Tags {
            type_name: type_name::<T>(),
            field: ident.to_string(),
            source,
        }
    }

    fn option_error(ident: &str, source: InvalidOption) -> SchemaError {
        SchemaError::Option {
            type_name: type_name::<T>(),
            field: ident.to_string(),
            source,
        }
    }
}

/// Maps a field identifier to its default external name:
/// `WithCamelCase` and `with_camel_case` both become `with_camel_case`.
#[must_use]
pub fn name_mapping(ident: &str) -> String {
    let mut name = String::with_capacity(ident.len());
    let mut previous: Option<char> = None;
    let mut chars = ident.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_uppercase() {
            let next_is_lower = chars.peek().is_some_and(|next| next.is_lowercase());
            let boundary = previous.is_some_and(|prev| {
                prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            });
            if boundary {
                name.push('_');
            }
            name.extend(c.to_lowercase());
        } else {
            name.push(c);
        }
        previous = Some(c);
    }
    name
}
