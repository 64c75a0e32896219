//! XEP-0004: Data Forms
//!
//! Structured key/value forms carried inside XMPP stanzas, used by PubSub
//! node configuration, subscription options and result sets.
//!
//! ## XML Format
//!
//! ```xml
//! <x xmlns='jabber:x:data' type='submit'>
//!   <title>Node configuration</title>
//!   <instructions>Configure the node</instructions>
//!   <field var='FORM_TYPE' type='hidden'>
//!     <value>http://jabber.org/protocol/pubsub#node_config</value>
//!   </field>
//!   <field var='pubsub#features' type='list-multi' label='Features'>
//!     <option label='News'><value>news</value></option>
//!     <value>news</value>
//!     <required/>
//!   </field>
//!   <reported>
//!     <field var='name' type='text-single'/>
//!   </reported>
//!   <item>
//!     <field var='name'><value>Alice</value></field>
//!   </item>
//! </x>
//! ```
//!
//! ## Example
//!
//! ```
//! use waddle_xmpp_xep_dataforms::{DataForm, Field, FieldType, FormType};
//!
//! let mut form = DataForm::new(FormType::Submit);
//! form.set_form_type("http://jabber.org/protocol/pubsub#node_config")
//!     .set_fields(&[Field::new("pubsub#max_items").with_value("10")]);
//!
//! let field = form.field("pubsub#max_items").unwrap();
//! assert_eq!(field.content.value.as_text(), Some("10"));
//! assert_eq!(FieldType::parse("boolean"), FieldType::Boolean);
//! ```

pub mod error;
pub mod field;
pub mod form;

pub use error::DataFormError;
pub use field::{
    decode_field, decode_values, encode_content, Field, FieldContent, FieldOption, FieldType,
    FieldValue, Value,
};
pub use form::{form_to_fields, DataForm, FormType, FORM_TYPE_VAR};

/// Data Forms namespace.
pub const NS_DATA_FORMS: &str = "jabber:x:data";
