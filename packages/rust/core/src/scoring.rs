//! Contact deduplication and confidence scoring.

use std::collections::HashSet;

use leadscout_shared::{ContactRecord, EmailConfidence};

/// Append `incoming` to `contacts`, skipping any whose dedup key is already
/// present. The first record seen for a key is the one kept.
pub fn merge_contacts(contacts: &mut Vec<ContactRecord>, incoming: Vec<ContactRecord>) {
    let mut seen: HashSet<String> = contacts.iter().map(ContactRecord::dedup_key).collect();
    for contact in incoming {
        if seen.insert(contact.dedup_key()) {
            contacts.push(contact);
        }
    }
}

/// Final pass: drop duplicates (first wins), promote contacts whose email was
/// seen on the organization's domain to VERIFIED, then sort most confident
/// first with ties broken by last name.
pub fn dedup_and_score(contacts: Vec<ContactRecord>, known_emails: &[String]) -> Vec<ContactRecord> {
    let known: HashSet<String> = known_emails.iter().map(|e| e.to_lowercase()).collect();
    let mut seen = HashSet::new();

    let mut scored: Vec<ContactRecord> = contacts
        .into_iter()
        .filter(|c| seen.insert(c.dedup_key()))
        .map(|mut c| {
            if c.has_email() && known.contains(&c.email.to_lowercase()) {
                c.email_confidence.upgrade(EmailConfidence::Verified);
            }
            c
        })
        .collect();

    scored.sort_by_cached_key(|c| (c.email_confidence.rank(), c.last_name.to_lowercase()));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn contact(first: &str, last: &str, email: &str, confidence: EmailConfidence) -> ContactRecord {
        ContactRecord {
            first_name: first.into(),
            last_name: last.into(),
            title: String::new(),
            email: email.into(),
            email_confidence: confidence,
            work_phone: String::new(),
            account: "Example Org".into(),
            org_name: "Example Org".into(),
            region: String::new(),
            source_url: String::new(),
            notes: String::new(),
            date_found: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        }
    }

    #[test]
    fn sorts_by_confidence_then_last_name() {
        let contacts = vec![
            contact("Ann", "Zimmer", "", EmailConfidence::Unknown),
            contact("Bo", "Young", "bo@x.org", EmailConfidence::Verified),
            contact("Cy", "Xu", "cy@x.org", EmailConfidence::Inferred),
            contact("Di", "adams", "", EmailConfidence::Unknown),
        ];
        let out = dedup_and_score(contacts, &[]);

        let order: Vec<(&str, EmailConfidence)> = out
            .iter()
            .map(|c| (c.last_name.as_str(), c.email_confidence))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Young", EmailConfidence::Verified),
                ("Xu", EmailConfidence::Inferred),
                ("adams", EmailConfidence::Unknown),
                ("Zimmer", EmailConfidence::Unknown),
            ]
        );
    }

    #[test]
    fn conflicting_duplicate_keeps_first() {
        let contacts = vec![
            contact("John", "Smith", "", EmailConfidence::Unknown),
            contact("john", "SMITH", "jsmith@example.org", EmailConfidence::Verified),
        ];
        let out = dedup_and_score(contacts, &[]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].email, "");
        assert_eq!(out[0].email_confidence, EmailConfidence::Unknown);
    }

    #[test]
    fn known_email_upgrades_to_verified() {
        let contacts = vec![
            contact("Jane", "Doe", "Jane.Doe@org.org", EmailConfidence::Inferred),
            contact("John", "Roe", "john.roe@org.org", EmailConfidence::Likely),
        ];
        let out = dedup_and_score(contacts, &["jane.doe@org.org".to_string()]);

        assert_eq!(out[0].last_name, "Doe");
        assert_eq!(out[0].email_confidence, EmailConfidence::Verified);
        assert_eq!(out[1].email_confidence, EmailConfidence::Likely);
    }

    #[test]
    fn merging_twice_keeps_one() {
        let first = contact("Jane", "Doe", "", EmailConfidence::Unknown);
        let second = contact("Jane", "Doe", "jane@org.org", EmailConfidence::Likely);

        let mut contacts = Vec::new();
        merge_contacts(&mut contacts, vec![first.clone()]);
        merge_contacts(&mut contacts, vec![second]);

        assert_eq!(contacts, vec![first]);
    }

    #[test]
    fn output_keys_are_unique() {
        let contacts = (0..20)
            .map(|i| contact("Pat", &format!("Lee{}", i % 7), "", EmailConfidence::Unknown))
            .collect();
        let out = dedup_and_score(contacts, &[]);

        let keys: HashSet<String> = out.iter().map(ContactRecord::dedup_key).collect();
        assert_eq!(keys.len(), out.len());
        assert_eq!(out.len(), 7);
    }
}
