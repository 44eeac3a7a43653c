use crate::contact::Contact;

/// Normalize a free-text query. Returns `None` when the query is blank, which
/// means "no filter".
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Whether `contact` matches an already-normalized query.
///
/// Name, email, tags and notes compare case-insensitively. Phones and the raw
/// birthday compare literally.
pub fn matches(contact: &Contact, needle: &str) -> bool {
    let folded = |value: &str| value.to_lowercase().contains(needle);

    folded(&contact.name)
        || contact.email.as_deref().is_some_and(|e| folded(e))
        || contact
            .birthday
            .as_deref()
            .is_some_and(|b| b.contains(needle))
        || contact.phones.iter().any(|p| p.contains(needle))
        || contact.tags.iter().any(|t| folded(t))
        || contact.notes.iter().any(|n| folded(n))
}

/// Indices into `contacts` of every entry matching `query`, in list order.
/// A blank query selects everything.
pub fn filter(contacts: &[Contact], query: &str) -> Vec<usize> {
    match normalize_query(query) {
        None => (0..contacts.len()).collect(),
        Some(needle) => contacts
            .iter()
            .enumerate()
            .filter(|(_, contact)| matches(contact, &needle))
            .map(|(index, _)| index)
            .collect(),
    }
}

/// Canonical form of a tag, as the bot stores them.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Indices of contacts carrying `tag` (trimmed, case-folded equality).
pub fn filter_by_tag(contacts: &[Contact], tag: &str) -> Vec<usize> {
    let wanted = normalize_tag(tag);
    contacts
        .iter()
        .enumerate()
        .filter(|(_, contact)| contact.tags.iter().any(|t| normalize_tag(t) == wanted))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Contact> {
        vec![
            Contact {
                name: "Ada Lovelace".into(),
                phones: vec!["+380501112233".into()],
                email: Some("Ada@Example.com".into()),
                birthday: Some("10-12-1815".into()),
                notes: vec!["Wrote the first Program".into()],
                tags: vec!["Math".into()],
            },
            Contact {
                name: "Bob Smith".into(),
                phones: vec!["+380679998877".into()],
                email: None,
                birthday: None,
                notes: Vec::new(),
                tags: vec!["work".into()],
            },
        ]
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  "), None);
        assert_eq!(normalize_query(""), None);
        assert_eq!(normalize_query(" AdA "), Some("ada".to_string()));
    }

    #[test]
    fn test_filter_by_name() {
        let contacts = sample();
        assert_eq!(filter(&contacts, "ada"), vec![0]);
        assert_eq!(filter(&contacts, "SMITH"), vec![1]);
    }

    #[test]
    fn test_filter_fields() {
        let contacts = sample();
        assert_eq!(filter(&contacts, "example.com"), vec![0]);
        assert_eq!(filter(&contacts, "99988"), vec![1]);
        assert_eq!(filter(&contacts, "1815"), vec![0]);
        assert_eq!(filter(&contacts, "math"), vec![0]);
        assert_eq!(filter(&contacts, "WORK"), vec![1]);
        assert_eq!(filter(&contacts, "program"), vec![0]);
        assert_eq!(filter(&contacts, "+380"), vec![0, 1]);
        assert!(filter(&contacts, "nobody").is_empty());
    }

    #[test]
    fn test_blank_query_restores_full_list_in_order() {
        let contacts = sample();
        assert_eq!(filter(&contacts, "bob"), vec![1]);
        assert_eq!(filter(&contacts, ""), vec![0, 1]);
        assert_eq!(filter(&contacts, "   "), vec![0, 1]);
    }

    #[test]
    fn test_filter_by_tag() {
        let contacts = sample();
        assert_eq!(filter_by_tag(&contacts, " MATH "), vec![0]);
        assert_eq!(filter_by_tag(&contacts, "wor"), Vec::<usize>::new());
    }
}
