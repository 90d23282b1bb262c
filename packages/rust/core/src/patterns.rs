//! Email-pattern inference.
//!
//! Addresses found on the organization's own domain reveal how it builds
//! mailbox names. The first classifiable address decides the template, which
//! is then applied to every contact that has a name but no email.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static RE_FIRST_DOT_LAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+\.[a-z]+$").unwrap());
static RE_F_LAST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]{3,}$").unwrap());
static RE_FIRST_LAST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]{4,}$").unwrap());
static RE_FIRST_UNDERSCORE_LAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+_[a-z]+$").unwrap());
static RE_F_DOT_LAST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]\.[a-z]+$").unwrap());

/// Locals at least this long are not read as `{f}{last}`.
const F_LAST_MAX_LEN: usize = 12;

// ---------------------------------------------------------------------------
// EmailTemplate
// ---------------------------------------------------------------------------

/// A mailbox naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailTemplate {
    /// `{first}.{last}`
    FirstDotLast,
    /// `{f}{last}`
    FLast,
    /// `{first}{last}`
    FirstLast,
    /// `{first}_{last}`
    FirstUnderscoreLast,
    /// `{f}.{last}`
    FDotLast,
}

impl EmailTemplate {
    /// Classify a local part. Shapes are checked in a fixed order and the
    /// first match wins.
    pub fn classify(local: &str) -> Option<Self> {
        if RE_FIRST_DOT_LAST.is_match(local) {
            Some(Self::FirstDotLast)
        } else if RE_F_LAST.is_match(local) && local.len() < F_LAST_MAX_LEN {
            Some(Self::FLast)
        } else if RE_FIRST_LAST.is_match(local) {
            Some(Self::FirstLast)
        } else if RE_FIRST_UNDERSCORE_LAST.is_match(local) {
            Some(Self::FirstUnderscoreLast)
        } else if RE_F_DOT_LAST.is_match(local) {
            Some(Self::FDotLast)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstDotLast => "{first}.{last}",
            Self::FLast => "{f}{last}",
            Self::FirstLast => "{first}{last}",
            Self::FirstUnderscoreLast => "{first}_{last}",
            Self::FDotLast => "{f}.{last}",
        }
    }

    /// Build an address for a person. Blank names or domain give `None`.
    pub fn apply(self, first_name: &str, last_name: &str, domain: &str) -> Option<String> {
        let first = first_name.trim().to_lowercase();
        let last = last_name.trim().to_lowercase();
        let domain = domain.trim().to_lowercase();
        if first.is_empty() || last.is_empty() || domain.is_empty() {
            return None;
        }
        let f = first.chars().next()?;

        let local = match self {
            Self::FirstDotLast => format!("{first}.{last}"),
            Self::FLast => format!("{f}{last}"),
            Self::FirstLast => format!("{first}{last}"),
            Self::FirstUnderscoreLast => format!("{first}_{last}"),
            Self::FDotLast => format!("{f}.{last}"),
        };
        Some(format!("{local}@{domain}"))
    }
}

impl fmt::Display for EmailTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Decides an organization's template from addresses known to be on its domain.
pub trait EmailPatternDetector: Send + Sync {
    fn detect(&self, known_emails: &[String], domain: &str) -> Option<EmailTemplate>;
}

/// Uses the first on-domain address whose local part classifies. No voting.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstMatchDetector;

impl EmailPatternDetector for FirstMatchDetector {
    fn detect(&self, known_emails: &[String], domain: &str) -> Option<EmailTemplate> {
        known_emails
            .iter()
            .filter(|email| is_on_domain(email, domain))
            .filter_map(|email| email.split_once('@'))
            .find_map(|(local, _)| EmailTemplate::classify(local))
    }
}

/// Every address in `texts` on `domain` or one of its sub-domains, lowercased
/// and de-duplicated in first-seen order.
pub fn collect_known_emails<'a>(
    texts: impl IntoIterator<Item = &'a str>,
    domain: &str,
) -> Vec<String> {
    let mut known: Vec<String> = Vec::new();
    for text in texts {
        for m in RE_EMAIL.find_iter(text) {
            let email = m.as_str().to_lowercase();
            if is_on_domain(&email, domain) && !known.contains(&email) {
                known.push(email);
            }
        }
    }
    known
}

fn is_on_domain(email: &str, domain: &str) -> bool {
    let Some((_, host)) = email.rsplit_once('@') else {
        return false;
    };
    let host = host.to_lowercase();
    let domain = domain.to_lowercase();
    !domain.is_empty() && (host == domain || host.ends_with(&format!(".{domain}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_follows_check_order() {
        assert_eq!(EmailTemplate::classify("jane.doe"), Some(EmailTemplate::FirstDotLast));
        assert_eq!(EmailTemplate::classify("jdoe"), Some(EmailTemplate::FLast));
        assert_eq!(EmailTemplate::classify("janedoesmith"), Some(EmailTemplate::FirstLast));
        assert_eq!(
            EmailTemplate::classify("jane_doe"),
            Some(EmailTemplate::FirstUnderscoreLast)
        );
        // `j.doe` also matches `{first}.{last}` which is checked earlier
        assert_eq!(EmailTemplate::classify("j.doe"), Some(EmailTemplate::FirstDotLast));
        assert_eq!(EmailTemplate::classify("jd"), None);
        assert_eq!(EmailTemplate::classify("info2"), None);
    }

    #[test]
    fn apply_lowercases_and_trims() {
        let email = EmailTemplate::FirstDotLast.apply(" John ", "Smith", "org.org");
        assert_eq!(email.as_deref(), Some("john.smith@org.org"));
        assert_eq!(
            EmailTemplate::FLast.apply("John", "Smith", "org.org").as_deref(),
            Some("jsmith@org.org")
        );
        assert_eq!(
            EmailTemplate::FDotLast.apply("John", "Smith", "org.org").as_deref(),
            Some("j.smith@org.org")
        );
    }

    #[test]
    fn apply_requires_every_part() {
        assert_eq!(EmailTemplate::FirstLast.apply("", "Smith", "org.org"), None);
        assert_eq!(EmailTemplate::FirstLast.apply("John", "  ", "org.org"), None);
        assert_eq!(EmailTemplate::FirstLast.apply("John", "Smith", ""), None);
    }

    #[test]
    fn detect_then_apply() {
        let known = vec!["jane.doe@org.org".to_string()];
        let template = FirstMatchDetector.detect(&known, "org.org").unwrap();
        assert_eq!(
            template.apply("John", "Smith", "org.org").as_deref(),
            Some("john.smith@org.org")
        );
    }

    #[test]
    fn detect_skips_unclassifiable_locals() {
        let known = vec![
            "info123@org.org".to_string(),
            "jsmith@org.org".to_string(),
            "jane.doe@org.org".to_string(),
        ];
        assert_eq!(
            FirstMatchDetector.detect(&known, "org.org"),
            Some(EmailTemplate::FLast)
        );
        assert_eq!(FirstMatchDetector.detect(&["x1@org.org".into()], "org.org"), None);
    }

    #[test]
    fn known_emails_stay_on_domain() {
        let texts = [
            "Contact Jane.Doe@Org.org or help@hs.org.org",
            "Vendor: sales@vendor.com, again jane.doe@org.org",
            "notorg.org user: fake@notorg.org",
        ];
        let known = collect_known_emails(texts, "org.org");
        assert_eq!(known, vec!["jane.doe@org.org", "help@hs.org.org"]);
    }
}
