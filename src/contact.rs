use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::search;

/// A single address book entry as exported by the assistant bot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub phones: Vec<String>,
    pub email: Option<String>,
    pub birthday: Option<String>,
    pub notes: Vec<String>,
    pub tags: Vec<String>,
}

/// The full contact set, loaded once and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    contacts: Vec<Contact>,
}

impl AddressBook {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Distinct normalized tags across the book, sorted.
    pub fn unique_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .contacts
            .iter()
            .flat_map(|c| c.tags.iter().map(|t| search::normalize_tag(t)))
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }
}

/// Build a contact from the value stored under its name.
///
/// Records are read leniently: a record that is not an object, or a field of
/// the wrong type, yields empty values instead of failing the document.
fn contact_from_value(name: String, record: Value) -> Contact {
    let mut fields = match record {
        Value::Object(fields) => fields,
        Value::Null => Map::new(),
        other => {
            debug!("contact `{}` has a non-object record ({}); using empty fields", name, other);
            Map::new()
        }
    };

    Contact {
        phones: string_list(&name, "phones", fields.remove("phones")),
        email: text_field(&name, "email", fields.remove("email")),
        birthday: text_field(&name, "birthday", fields.remove("birthday")),
        notes: string_list(&name, "notes", fields.remove("notes")),
        tags: string_list(&name, "tags", fields.remove("tags")),
        name,
    }
}

fn string_list(name: &str, field: &str, value: Option<Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                other => {
                    debug!("contact `{}`: dropping non-string {} entry {}", name, field, other);
                    None
                }
            })
            .collect(),
        Some(other) => {
            debug!("contact `{}`: {} is not a list ({}); treating it as empty", name, field, other);
            Vec::new()
        }
    }
}

fn text_field(name: &str, field: &str, value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => Some(text),
        None | Some(Value::Null) | Some(Value::String(_)) => None,
        Some(other) => {
            debug!("contact `{}`: {} is not a string ({}); treating it as empty", name, field, other);
            None
        }
    }
}

/// A decoded contacts document: a JSON object of name -> record, in document order.
///
/// A repeated name overwrites the earlier record in place, so the contact keeps
/// the position of its first occurrence.
#[derive(Debug, Default)]
pub struct ContactDocument {
    pub contacts: Vec<Contact>,
    pub duplicates: Vec<String>,
}

impl ContactDocument {
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    pub fn into_book(self) -> AddressBook {
        AddressBook::new(self.contacts)
    }
}

impl<'de> Deserialize<'de> for ContactDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = ContactDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object mapping contact names to records")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut contacts: Vec<Contact> = Vec::new();
                let mut positions: HashMap<String, usize> = HashMap::new();
                let mut duplicates = Vec::new();

                while let Some((name, record)) = map.next_entry::<String, Value>()? {
                    let contact = contact_from_value(name.clone(), record);
                    match positions.get(&name) {
                        Some(&index) => {
                            warn!("duplicate contact name `{}`; keeping the later record", name);
                            contacts[index] = contact;
                            duplicates.push(name);
                        }
                        None => {
                            positions.insert(name, contacts.len());
                            contacts.push(contact);
                        }
                    }
                }

                Ok(ContactDocument {
                    contacts,
                    duplicates,
                })
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_key_order_and_names() {
        let doc = ContactDocument::parse(
            r#"{
                "Zed": {"phones": ["+380501112233"]},
                "Ada Lovelace": {"email": "ada@example.com", "tags": ["math"]},
                "Bob Smith": {}
            }"#,
        )
        .unwrap();
        let names: Vec<&str> = doc.contacts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Ada Lovelace", "Bob Smith"]);
        assert!(doc.duplicates.is_empty());
    }

    #[test]
    fn test_missing_and_null_fields_default_to_empty() {
        let doc = ContactDocument::parse(
            r#"{
                "Bob": {"phones": null, "email": null, "birthday": null},
                "Eve": null
            }"#,
        )
        .unwrap();
        for contact in &doc.contacts {
            assert!(contact.phones.is_empty());
            assert!(contact.notes.is_empty());
            assert!(contact.tags.is_empty());
            assert_eq!(contact.email, None);
            assert_eq!(contact.birthday, None);
        }
    }

    #[test]
    fn test_full_record() {
        let doc = ContactDocument::parse(
            r#"{"Ada": {
                "phones": ["+380501112233", "+380671112233"],
                "email": "ada@example.com",
                "birthday": "10-12-1815",
                "notes": ["first", "second"],
                "tags": ["math", "poetry"]
            }}"#,
        )
        .unwrap();
        let ada = &doc.contacts[0];
        assert_eq!(ada.phones, vec!["+380501112233", "+380671112233"]);
        assert_eq!(ada.email.as_deref(), Some("ada@example.com"));
        assert_eq!(ada.birthday.as_deref(), Some("10-12-1815"));
        assert_eq!(ada.notes, vec!["first", "second"]);
        assert_eq!(ada.tags, vec!["math", "poetry"]);
    }

    #[test]
    fn test_duplicate_name_overwrites_in_place() {
        let doc = ContactDocument::parse(
            r#"{
                "Bob": {"email": "old@example.com"},
                "Ann": {},
                "Bob": {"email": "new@example.com"}
            }"#,
        )
        .unwrap();
        assert_eq!(doc.contacts.len(), 2);
        assert_eq!(doc.contacts[0].name, "Bob");
        assert_eq!(doc.contacts[0].email.as_deref(), Some("new@example.com"));
        assert_eq!(doc.duplicates, vec!["Bob".to_string()]);
    }

    #[test]
    fn test_non_object_documents_are_rejected() {
        assert!(ContactDocument::parse("[]").is_err());
        assert!(ContactDocument::parse("\"contacts\"").is_err());
        assert!(ContactDocument::parse("not json").is_err());
    }

    #[test]
    fn test_wrongly_typed_fields_default_to_empty() {
        let doc = ContactDocument::parse(
            r#"{
                "Ada": {"email": "a@x.com"},
                "Bob": {"phones": "0501234567", "email": 5, "tags": ["work", 3]},
                "Cy": "just a string",
                "Dee": {"birthday": ["1-2-90"], "notes": {"a": "b"}}
            }"#,
        )
        .unwrap();
        let names: Vec<&str> = doc.contacts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Bob", "Cy", "Dee"]);

        assert_eq!(doc.contacts[0].email.as_deref(), Some("a@x.com"));
        let bob = &doc.contacts[1];
        assert!(bob.phones.is_empty());
        assert_eq!(bob.email, None);
        assert_eq!(bob.tags, vec!["work"]);
        assert_eq!(doc.contacts[2], Contact { name: "Cy".into(), ..Default::default() });
        assert_eq!(doc.contacts[3].birthday, None);
        assert!(doc.contacts[3].notes.is_empty());
    }

    #[test]
    fn test_empty_object_is_a_valid_empty_book() {
        let book = ContactDocument::parse("{}").unwrap().into_book();
        assert!(book.is_empty());
    }

    #[test]
    fn test_unique_tags_sorted() {
        let book = AddressBook::new(vec![
            Contact {
                name: "A".into(),
                tags: vec!["work".into(), "family".into()],
                ..Default::default()
            },
            Contact {
                name: "B".into(),
                tags: vec![" Work".into(), "".into()],
                ..Default::default()
            },
        ]);
        assert_eq!(book.unique_tags(), vec!["family", "work"]);
    }
}
