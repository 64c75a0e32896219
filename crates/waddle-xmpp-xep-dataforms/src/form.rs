//! The `<x xmlns='jabber:x:data'/>` form model.
//!
//! A [`DataForm`] owns its children in document order: title,
//! instructions, fields, the `reported` template and `item` rows. It is
//! built once from a wire element (or created empty) and mutated in place;
//! every setter returns the form so calls can be chained.

use std::fmt;

use minidom::Element;
use tracing::{debug, instrument};

use crate::error::DataFormError;
use crate::field::{build_field_element, decode_field, Field};
use crate::NS_DATA_FORMS;

/// Name of the hidden field carrying the form's namespace.
pub const FORM_TYPE_VAR: &str = "FORM_TYPE";

/// The form's `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormType {
    /// A form to be filled out.
    #[default]
    Form,
    /// A filled-out form being submitted.
    Submit,
    /// Cancellation of a form.
    Cancel,
    /// Data results (e.g. a search result set).
    Result,
}

impl FormType {
    /// Parse a form type from its wire name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "form" => Some(FormType::Form),
            "submit" => Some(FormType::Submit),
            "cancel" => Some(FormType::Cancel),
            "result" => Some(FormType::Result),
            _ => None,
        }
    }

    /// Get the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Form => "form",
            FormType::Submit => "submit",
            FormType::Cancel => "cancel",
            FormType::Result => "result",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A XEP-0004 data form.
#[derive(Debug, Clone, PartialEq)]
pub struct DataForm {
    kind: FormType,
    children: Vec<Element>,
}

impl DataForm {
    /// Create an empty form of the given type.
    pub fn new(kind: FormType) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Lift a form out of a wire `<x/>` element.
    ///
    /// A missing or unknown `type` attribute is read as `form`.
    pub fn from_element(elem: &Element) -> Result<Self, DataFormError> {
        if elem.name() != "x" || elem.ns() != NS_DATA_FORMS {
            return Err(DataFormError::NotADataForm {
                name: elem.name().to_string(),
                ns: elem.ns(),
            });
        }

        let kind = match elem.attr("type").and_then(FormType::from_str) {
            Some(kind) => kind,
            None => {
                debug!(form_type = ?elem.attr("type"), "Unrecognised form type, treating as form");
                FormType::Form
            }
        };

        Ok(Self {
            kind,
            children: elem.children().cloned().collect(),
        })
    }

    /// Serialize the form to its wire element.
    pub fn to_element(&self) -> Element {
        let mut builder = Element::builder("x", NS_DATA_FORMS).attr("type", self.kind.as_str());
        for child in &self.children {
            builder = builder.append(child.clone());
        }
        builder.build()
    }

    /// The form's `type` attribute.
    pub fn kind(&self) -> FormType {
        self.kind
    }

    /// Change the form's `type` attribute.
    pub fn set_kind(&mut self, kind: FormType) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Set the title, replacing any existing one. Empty text is ignored.
    pub fn set_title(&mut self, text: &str) -> &mut Self {
        self.set_text_child("title", text)
    }

    /// The form title, if present.
    pub fn title(&self) -> Option<String> {
        self.text_child("title")
    }

    /// Set the instructions, replacing any existing ones. Empty text is ignored.
    pub fn set_instructions(&mut self, text: &str) -> &mut Self {
        self.set_text_child("instructions", text)
    }

    /// The form instructions, if present.
    pub fn instructions(&self) -> Option<String> {
        self.text_child("instructions")
    }

    fn set_text_child(&mut self, name: &str, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }

        let elem = Element::builder(name, NS_DATA_FORMS)
            .append(text.to_string())
            .build();

        match self.children.iter().position(|c| c.name() == name) {
            Some(idx) => self.children[idx] = elem,
            None => self.children.push(elem),
        }
        self
    }

    fn text_child(&self, name: &str) -> Option<String> {
        self.children
            .iter()
            .filter(|c| c.name() == name)
            .last()
            .map(Element::text)
    }

    /// Add or update fields.
    ///
    /// A field whose `var` matches an existing field replaces that field's
    /// children while keeping attributes it does not set. The written field
    /// always ends up as the last child.
    #[instrument(skip_all, fields(count = fields.len()))]
    pub fn set_fields(&mut self, fields: &[Field]) -> &mut Self {
        for field in fields {
            let existing = field
                .var
                .as_deref()
                .and_then(|var| self.field_position(var))
                .map(|idx| self.children.remove(idx));

            if existing.is_some() {
                debug!(var = ?field.var, "Updating existing field");
            }

            let elem = build_field_element(existing.as_ref(), field);
            self.children.push(elem);
        }
        self
    }

    fn field_position(&self, var: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| c.name() == "field" && c.attr("var") == Some(var))
    }

    /// The raw `<field/>` element with the given `var`. First match wins.
    pub fn field_element(&self, var: &str) -> Option<&Element> {
        self.field_position(var).map(|idx| &self.children[idx])
    }

    /// The decoded field with the given `var`.
    pub fn field(&self, var: &str) -> Option<Field> {
        self.field_element(var).map(decode_field)
    }

    /// Set the hidden FORM_TYPE field.
    pub fn set_form_type(&mut self, value: &str) -> &mut Self {
        self.set_fields(&[Field::hidden(FORM_TYPE_VAR, value)])
    }

    /// The first value of the FORM_TYPE field, or `None` if it is missing.
    pub fn form_type(&self) -> Option<String> {
        self.field_element(FORM_TYPE_VAR)?
            .children()
            .find(|c| c.name() == "value")
            .map(Element::text)
    }

    /// Decode every direct `<field/>` child in document order.
    ///
    /// Title and instructions are not part of the result.
    pub fn fields(&self) -> Vec<Field> {
        self.children
            .iter()
            .filter(|c| c.name() == "field")
            .map(decode_field)
            .collect()
    }

    /// Replace the `reported` block with the given field templates.
    ///
    /// Any existing block is removed. A non-empty template is inserted as
    /// the form's first child.
    pub fn set_reported(&mut self, fields: &[Field]) -> &mut Self {
        self.children.retain(|c| c.name() != "reported");

        if !fields.is_empty() {
            self.children.insert(0, row_element("reported", fields));
        }
        self
    }

    /// The reported field templates, or an empty list.
    pub fn reported(&self) -> Vec<Field> {
        self.rows("reported").into_iter().next().unwrap_or_default()
    }

    /// Replace all `item` rows.
    pub fn set_items(&mut self, items: &[Vec<Field>]) -> &mut Self {
        self.children.retain(|c| c.name() != "item");

        for fields in items {
            self.children.push(row_element("item", fields));
        }
        self
    }

    /// The `item` rows as lists of fields.
    pub fn items(&self) -> Vec<Vec<Field>> {
        self.rows("item")
    }

    /// Decode every child named `tag` as a row of fields.
    pub fn rows(&self, tag: &str) -> Vec<Vec<Field>> {
        self.children
            .iter()
            .filter(|c| c.name() == tag)
            .map(|row| {
                row.children()
                    .filter(|c| c.name() == "field")
                    .map(decode_field)
                    .collect()
            })
            .collect()
    }
}

fn row_element(name: &str, fields: &[Field]) -> Element {
    let mut builder = Element::builder(name, NS_DATA_FORMS);
    for field in fields {
        builder = builder.append(build_field_element(None, field));
    }
    builder.build()
}

impl From<DataForm> for Element {
    fn from(form: DataForm) -> Self {
        form.to_element()
    }
}

impl From<&DataForm> for Element {
    fn from(form: &DataForm) -> Self {
        form.to_element()
    }
}

impl TryFrom<&Element> for DataForm {
    type Error = DataFormError;

    fn try_from(elem: &Element) -> Result<Self, Self::Error> {
        DataForm::from_element(elem)
    }
}

/// Decode the direct `<field/>` children of any element.
pub fn form_to_fields(elem: &Element) -> Vec<Field> {
    elem.children()
        .filter(|c| c.name() == "field")
        .map(decode_field)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldType, FieldValue};

    const NODE_CONFIG: &str = "http://jabber.org/protocol/pubsub#node_config";

    fn child_names(form: &DataForm) -> Vec<String> {
        form.to_element()
            .children()
            .map(|c| c.name().to_string())
            .collect()
    }

    #[test]
    fn test_new_form_serializes_type() {
        let form = DataForm::new(FormType::Submit);
        let elem = form.to_element();

        assert_eq!(elem.name(), "x");
        assert_eq!(elem.ns(), NS_DATA_FORMS);
        assert_eq!(elem.attr("type"), Some("submit"));
        assert_eq!(elem.children().count(), 0);
    }

    #[test]
    fn test_set_title_overwrites() {
        let mut form = DataForm::new(FormType::Form);
        form.set_title("First").set_title("Second");

        assert_eq!(form.title().as_deref(), Some("Second"));
        assert_eq!(child_names(&form), vec!["title"]);
    }

    #[test]
    fn test_set_instructions_overwrites() {
        let mut form = DataForm::new(FormType::Form);
        form.set_instructions("Fill it in").set_instructions("Fill it in again");

        assert_eq!(form.instructions().as_deref(), Some("Fill it in again"));
        assert_eq!(child_names(&form), vec!["instructions"]);
    }

    #[test]
    fn test_empty_title_is_ignored() {
        let mut form = DataForm::new(FormType::Form);
        form.set_title("");

        assert!(form.title().is_none());
    }

    #[test]
    fn test_set_fields_upserts_by_var() {
        let mut form = DataForm::new(FormType::Submit);
        form.set_fields(&[
            Field::new("pubsub#title").with_label("Title").with_value("first"),
            Field::new("pubsub#max_items").with_value("10"),
        ]);
        form.set_fields(&[Field::new("pubsub#title").with_value("second")]);

        let fields = form.fields();
        assert_eq!(fields.len(), 2);

        // The updated field moves to the end and keeps its label.
        assert_eq!(fields[1].var.as_deref(), Some("pubsub#title"));
        assert_eq!(fields[1].label.as_deref(), Some("Title"));
        assert_eq!(fields[1].content.value, "second".into());
    }

    #[test]
    fn test_fields_without_var_always_append() {
        let mut form = DataForm::new(FormType::Form);
        let fixed = Field {
            field_type: Some(FieldType::Fixed),
            content: crate::FieldContent {
                value: "Section".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        form.set_fields(&[fixed.clone()]).set_fields(&[fixed]);

        assert_eq!(form.fields().len(), 2);
    }

    #[test]
    fn test_form_type_round_trip() {
        let mut form = DataForm::new(FormType::Submit);
        form.set_form_type(NODE_CONFIG);

        assert_eq!(form.form_type().as_deref(), Some(NODE_CONFIG));
        let field = form.field(FORM_TYPE_VAR).expect("FORM_TYPE field");
        assert_eq!(field.field_type, Some(FieldType::Hidden));
    }

    #[test]
    fn test_form_type_missing() {
        let form = DataForm::new(FormType::Form);
        assert!(form.form_type().is_none());

        let mut without_value = DataForm::new(FormType::Form);
        without_value.set_fields(&[Field::new(FORM_TYPE_VAR).with_type(FieldType::Hidden)]);
        assert!(without_value.form_type().is_none());
    }

    #[test]
    fn test_get_field_first_match_wins() {
        let xml = r#"<x xmlns='jabber:x:data' type='result'>
            <field var='dup'><value>one</value></field>
            <field var='dup'><value>two</value></field>
        </x>"#;
        let elem: Element = xml.parse().expect("valid XML");
        let form = DataForm::from_element(&elem).expect("data form");

        let field = form.field("dup").expect("field");
        assert_eq!(field.content.value, "one".into());
    }

    #[test]
    fn test_from_element_rejects_other_elements() {
        let elem: Element = "<query xmlns='jabber:iq:register'/>"
            .parse()
            .expect("valid XML");

        assert!(matches!(
            DataForm::from_element(&elem),
            Err(DataFormError::NotADataForm { .. })
        ));
    }

    #[test]
    fn test_from_element_unknown_type_degrades_to_form() {
        let elem: Element = "<x xmlns='jabber:x:data' type='bogus'/>"
            .parse()
            .expect("valid XML");

        let form = DataForm::from_element(&elem).expect("data form");
        assert_eq!(form.kind(), FormType::Form);
    }

    #[test]
    fn test_unserialize_full_form() {
        let xml = r#"<x xmlns='jabber:x:data' type='form'>
            <title>Bot Creation</title>
            <instructions>Fill out this form</instructions>
            <field type='hidden' var='FORM_TYPE'><value>jabber:bot</value></field>
            <field type='boolean' var='public' label='Public bot?'><value>0</value><required/></field>
            <field type='list-multi' var='features' label='Features'>
                <option label='Contests'><value>contests</value></option>
                <option label='News'><value>news</value></option>
                <value>news</value>
                <value>contests</value>
            </field>
            <field type='text-multi' var='description'>
                <value>Line one</value>
                <value>Line two</value>
            </field>
        </x>"#;
        let elem: Element = xml.parse().expect("valid XML");
        let form = DataForm::from_element(&elem).expect("data form");

        assert_eq!(form.title().as_deref(), Some("Bot Creation"));
        assert_eq!(form.instructions().as_deref(), Some("Fill out this form"));
        assert_eq!(form.form_type().as_deref(), Some("jabber:bot"));

        let fields = form.fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[1].content.value.as_bool(), Some(false));
        assert!(fields[1].content.required);
        assert_eq!(
            fields[2].content.value,
            FieldValue::from(vec!["news", "contests"])
        );
        assert_eq!(fields[2].content.options.len(), 2);
        assert_eq!(fields[3].content.value, "Line one\nLine two".into());
        assert_eq!(form_to_fields(&elem), fields);
    }

    #[test]
    fn test_set_reported_is_first_child() {
        let mut form = DataForm::new(FormType::Result);
        form.set_title("Search results");
        form.set_reported(&[
            Field::new("name").with_type(FieldType::TextSingle).with_label("Name"),
            Field::new("jid").with_type(FieldType::JidSingle).with_label("JID"),
        ]);

        assert_eq!(child_names(&form), vec!["reported", "title"]);

        let reported = form.reported();
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[0].var.as_deref(), Some("name"));
        assert_eq!(reported[1].field_type, Some(FieldType::JidSingle));
    }

    #[test]
    fn test_set_reported_replaces_and_clears() {
        let mut form = DataForm::new(FormType::Result);
        form.set_reported(&[Field::new("a")]);
        form.set_reported(&[Field::new("b")]);

        assert_eq!(child_names(&form), vec!["reported"]);
        assert_eq!(form.reported()[0].var.as_deref(), Some("b"));

        form.set_reported(&[]);
        assert!(form.reported().is_empty());
        assert!(child_names(&form).is_empty());
    }

    #[test]
    fn test_set_items_replaces_rows() {
        let mut form = DataForm::new(FormType::Result);
        form.set_items(&[vec![Field::new("name").with_value("stale")]]);
        form.set_items(&[
            vec![
                Field::new("name").with_value("Alice"),
                Field::new("jid").with_value("alice@example.com"),
            ],
            vec![
                Field::new("name").with_value("Bob"),
                Field::new("jid").with_value("bob@example.com"),
            ],
        ]);

        let items = form.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0][0].content.value, "Alice".into());
        assert_eq!(items[1][1].content.value, "bob@example.com".into());
    }

    #[test]
    fn test_wire_round_trip_preserves_order() {
        let mut form = DataForm::new(FormType::Result);
        form.set_title("Results")
            .set_fields(&[Field::new("count").with_value("2")])
            .set_reported(&[Field::new("name")])
            .set_items(&[vec![Field::new("name").with_value("Alice")]]);

        let elem: Element = form.clone().into();
        let parsed = DataForm::from_element(&elem).expect("data form");

        assert_eq!(parsed.kind(), FormType::Result);
        assert_eq!(parsed.title().as_deref(), Some("Results"));
        assert_eq!(parsed.fields(), form.fields());
        assert_eq!(parsed.reported(), form.reported());
        assert_eq!(parsed.items(), form.items());
        assert_eq!(child_names(&parsed), vec!["reported", "title", "field", "item"]);
    }
}
