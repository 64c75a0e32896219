//! Form field model and value codec.
//!
//! Converts between the semantic [`Field`] representation and the
//! `<field/>` wire element, including the scalar/list collapsing and the
//! boolean coercion applied when reading values back.

use std::fmt;

use minidom::Element;
use tracing::{debug, trace};

use crate::NS_DATA_FORMS;

/// XEP-0004 field types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Either/or choice between two options.
    Boolean,
    /// Static text, not a form input.
    Fixed,
    /// Not shown to the form-submitting entity (e.g. FORM_TYPE).
    Hidden,
    /// Multiple JIDs.
    JidMulti,
    /// A single JID.
    JidSingle,
    /// Multiple options from a given list.
    ListMulti,
    /// One option from a given list.
    ListSingle,
    /// Multiple lines of text.
    TextMulti,
    /// A single line of obscured text (e.g. a password).
    TextPrivate,
    /// A single line of text.
    TextSingle,
    /// A type this codec does not know about, kept verbatim.
    Other(String),
}

impl FieldType {
    /// Parse a field type from its wire name. Unknown names are preserved.
    pub fn parse(s: &str) -> Self {
        match s {
            "boolean" => FieldType::Boolean,
            "fixed" => FieldType::Fixed,
            "hidden" => FieldType::Hidden,
            "jid-multi" => FieldType::JidMulti,
            "jid-single" => FieldType::JidSingle,
            "list-multi" => FieldType::ListMulti,
            "list-single" => FieldType::ListSingle,
            "text-multi" => FieldType::TextMulti,
            "text-private" => FieldType::TextPrivate,
            "text-single" => FieldType::TextSingle,
            other => FieldType::Other(other.to_string()),
        }
    }

    /// Get the wire name for this type.
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Fixed => "fixed",
            FieldType::Hidden => "hidden",
            FieldType::JidMulti => "jid-multi",
            FieldType::JidSingle => "jid-single",
            FieldType::ListMulti => "list-multi",
            FieldType::ListSingle => "list-single",
            FieldType::TextMulti => "text-multi",
            FieldType::TextPrivate => "text-private",
            FieldType::TextSingle => "text-single",
            FieldType::Other(s) => s,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Literal text.
    Text(String),
    /// A value coerced to a boolean on decode.
    Bool(bool),
}

impl Value {
    /// The text written into a `<value/>` element.
    pub fn to_wire(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
        }
    }

    /// Borrow the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Bool(_) => None,
        }
    }

    /// Get the boolean if this value was coerced to one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Text(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// The value content of a field: one scalar or a list of two or more.
///
/// An empty field decodes to `Single(Text(""))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Exactly one value (or none, as the empty string).
    Single(Value),
    /// Several values in document order.
    List(Vec<Value>),
}

impl FieldValue {
    /// The empty value.
    pub fn empty() -> Self {
        FieldValue::Single(Value::Text(String::new()))
    }

    /// True for the empty string and the empty list.
    ///
    /// Empty values produce no `<value/>` children on encode.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Single(Value::Text(s)) => s.is_empty(),
            FieldValue::Single(Value::Bool(_)) => false,
            FieldValue::List(values) => values.is_empty(),
        }
    }

    /// Borrow the scalar text, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Single(v) => v.as_text(),
            FieldValue::List(_) => None,
        }
    }

    /// Get the scalar boolean, if the value was coerced to one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Single(v) => v.as_bool(),
            FieldValue::List(_) => None,
        }
    }

    /// View the content as a slice of values regardless of arity.
    pub fn values(&self) -> &[Value] {
        match self {
            FieldValue::Single(v) => std::slice::from_ref(v),
            FieldValue::List(values) => values,
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Single(s.into())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Single(s.into())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Single(b.into())
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Single(v)
    }
}

impl From<Vec<Value>> for FieldValue {
    fn from(values: Vec<Value>) -> Self {
        FieldValue::List(values)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::List(values.into_iter().map(Value::Text).collect())
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        FieldValue::List(values.into_iter().map(Value::from).collect())
    }
}

/// An `<option/>` of a list field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOption {
    /// Human-readable label.
    pub label: String,
    /// Value submitted when the option is chosen.
    pub value: String,
}

impl FieldOption {
    /// Create a new option.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Everything carried as children of a `<field/>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldContent {
    /// The field value(s).
    pub value: FieldValue,
    /// Label to value options, in document order.
    pub options: Vec<FieldOption>,
    /// Whether the field carries a `<required/>` marker.
    pub required: bool,
}

/// A data form field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    /// Unique identifier of the field within its form.
    pub var: Option<String>,
    /// Declared field type.
    pub field_type: Option<FieldType>,
    /// Human-readable label.
    pub label: Option<String>,
    /// Values, options and the required marker.
    pub content: FieldContent,
}

impl Field {
    /// Create a field with the given `var` and no other properties.
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: Some(var.into()),
            ..Default::default()
        }
    }

    /// Create a hidden field, as used for FORM_TYPE.
    pub fn hidden(var: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(var)
            .with_type(FieldType::Hidden)
            .with_value(value)
    }

    /// Set the declared type.
    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the value content.
    pub fn with_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.content.value = value.into();
        self
    }

    /// Add an option.
    pub fn with_option(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.content.options.push(FieldOption::new(label, value));
        self
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.content.required = true;
        self
    }

    /// Build a fresh `<field/>` element for this field.
    pub fn to_element(&self) -> Element {
        build_field_element(None, self)
    }

    /// Decode a `<field/>` element.
    pub fn from_element(elem: &Element) -> Self {
        decode_field(elem)
    }
}

/// Encode field content into `<value/>`, `<option/>` and `<required/>` children.
///
/// A scalar `text-multi` value is split at line breaks into one `<value/>`
/// per line. Empty values produce no `<value/>` element.
pub fn encode_content(field_type: Option<&FieldType>, content: &FieldContent) -> Vec<Element> {
    let mut children = Vec::new();

    if !content.value.is_empty() {
        let texts: Vec<String> = match &content.value {
            FieldValue::List(values) => values.iter().map(Value::to_wire).collect(),
            FieldValue::Single(Value::Text(s)) if field_type == Some(&FieldType::TextMulti) => {
                s.split('\n').map(str::to_string).collect()
            }
            FieldValue::Single(v) => vec![v.to_wire()],
        };

        for text in texts {
            children.push(value_element(text));
        }
    }

    for option in &content.options {
        children.push(
            Element::builder("option", NS_DATA_FORMS)
                .attr("label", option.label.as_str())
                .append(value_element(option.value.clone()))
                .build(),
        );
    }

    if content.required {
        children.push(Element::builder("required", NS_DATA_FORMS).build());
    }

    children
}

fn value_element(text: String) -> Element {
    Element::builder("value", NS_DATA_FORMS).append(text).build()
}

/// Coerce raw `<value/>` texts and collapse them into a [`FieldValue`].
///
/// - `boolean`: `"false"` and `"0"` (any case) become `false`, anything else `true`.
/// - undeclared type: exactly `"false"` / `"true"` become booleans, all else stays text.
/// - `text-multi`: values are joined with `\n` into a single string.
/// - otherwise zero values become `""`, one value its scalar, more stay a list.
pub fn decode_values(field_type: Option<&FieldType>, texts: Vec<String>) -> FieldValue {
    if field_type == Some(&FieldType::TextMulti) {
        return FieldValue::Single(Value::Text(texts.join("\n")));
    }

    let mut values: Vec<Value> = texts
        .into_iter()
        .map(|text| coerce(field_type, text))
        .collect();

    match values.len() {
        0 => FieldValue::empty(),
        1 => FieldValue::Single(values.remove(0)),
        _ => FieldValue::List(values),
    }
}

fn coerce(field_type: Option<&FieldType>, text: String) -> Value {
    match field_type {
        Some(FieldType::Boolean) => {
            let lowered = text.to_lowercase();
            Value::Bool(!matches!(lowered.as_str(), "false" | "0"))
        }
        None => match text.as_str() {
            "false" => Value::Bool(false),
            "true" => Value::Bool(true),
            _ => Value::Text(text),
        },
        Some(_) => Value::Text(text),
    }
}

/// Decode a `<field/>` element into a [`Field`].
///
/// Malformed options (no `<value/>` child) are skipped.
pub fn decode_field(elem: &Element) -> Field {
    let field_type = elem
        .attr("type")
        .filter(|t| !t.is_empty())
        .map(FieldType::parse);

    let mut options = Vec::new();
    for option in elem.children().filter(|c| c.name() == "option") {
        match option.children().find(|c| c.name() == "value") {
            Some(value) => options.push(FieldOption::new(
                option.attr("label").unwrap_or_default(),
                value.text(),
            )),
            None => debug!(var = ?elem.attr("var"), "Skipping option without a value"),
        }
    }

    let texts: Vec<String> = elem
        .children()
        .filter(|c| c.name() == "value")
        .map(Element::text)
        .collect();
    trace!(var = ?elem.attr("var"), count = texts.len(), "Decoding field values");

    let value = decode_values(field_type.as_ref(), texts);
    let required = elem.children().any(|c| c.name() == "required");

    Field {
        var: elem.attr("var").map(String::from),
        field_type,
        label: elem.attr("label").map(String::from),
        content: FieldContent {
            value,
            options,
            required,
        },
    }
}

/// Build a `<field/>` element for `field`.
///
/// When `existing` is given its attributes are carried over (its children
/// are not); the properties supplied by `field` then overwrite them.
pub(crate) fn build_field_element(existing: Option<&Element>, field: &Field) -> Element {
    let mut builder = Element::builder("field", NS_DATA_FORMS);

    if let Some(existing) = existing {
        for (name, value) in existing.attrs() {
            if name != "xmlns" {
                builder = builder.attr(name, value);
            }
        }
    }

    if let Some(ref var) = field.var {
        builder = builder.attr("var", var.as_str());
    }
    if let Some(ref field_type) = field.field_type {
        builder = builder.attr("type", field_type.as_str());
    }
    if let Some(ref label) = field.label {
        builder = builder.attr("label", label.as_str());
    }

    for child in encode_content(field.field_type.as_ref(), &field.content) {
        builder = builder.append(child);
    }

    builder.build()
}
