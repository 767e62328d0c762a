use serde::{Deserialize, Serialize};

use super::row::{cell_string, Row};

pub const HEADER: [&str; 2] = ["domain", "created_at"];

/// Email domain whose owners may book `members_only` seminars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDomain {
    pub domain: String,
    pub created_at: String,
}

impl MemberDomain {
    pub fn from_row(row: &[String]) -> Self {
        MemberDomain {
            domain: normalize_domain(&cell_string(row, 0)).unwrap_or_default(),
            created_at: cell_string(row, 1),
        }
    }

    pub fn to_row(&self) -> Row {
        vec![self.domain.clone(), self.created_at.clone()]
    }
}

/// Lowercase, trim, strip a leading `@`; `None` unless it looks like `label.tld`.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let domain = raw.trim().trim_start_matches('@').trim_end_matches('.').to_lowercase();
    let valid = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.contains("..")
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    valid.then_some(domain)
}

/// Domain part of an email address, lowercased.
pub fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    normalize_domain(domain)
}

/// `sub.example.com` matches a registered `example.com`; the reverse does not,
/// and `badexample.com` never matches `example.com`.
pub fn domain_matches(email_domain: &str, registered: &str) -> bool {
    email_domain == registered
        || email_domain
            .strip_suffix(registered)
            .is_some_and(|head| head.ends_with('.'))
}

/// Whether an email belongs to any registered member domain.
pub fn is_member_email(email: &str, domains: &[MemberDomain]) -> bool {
    let Some(domain) = email_domain(email) else {
        return false;
    };
    domains
        .iter()
        .filter(|d| !d.domain.is_empty())
        .any(|d| domain_matches(&domain, &d.domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains(list: &[&str]) -> Vec<MemberDomain> {
        list.iter()
            .map(|d| MemberDomain {
                domain: d.to_string(),
                created_at: String::new(),
            })
            .collect()
    }

    #[test]
    fn subdomain_matches_registered_parent() {
        assert!(domain_matches("sub.example.com", "example.com"));
        assert!(domain_matches("example.com", "example.com"));
        assert!(!domain_matches("example.com", "sub.example.com"));
        assert!(!domain_matches("badexample.com", "example.com"));
        assert!(!domain_matches("example.org", "example.com"));
    }

    #[test]
    fn member_email_check_uses_email_domain() {
        let registered = domains(&["example.com"]);
        assert!(is_member_email("taro@sub.example.com", &registered));
        assert!(is_member_email("Taro@EXAMPLE.com", &registered));
        assert!(!is_member_email("taro@other.co.jp", &registered));
        assert!(!is_member_email("not-an-email", &registered));
        assert!(!is_member_email("taro@example.com", &[]));
    }

    #[test]
    fn normalization_rejects_garbage() {
        assert_eq!(normalize_domain(" @Example.COM "), Some("example.com".to_string()));
        assert_eq!(normalize_domain("localhost"), None);
        assert_eq!(normalize_domain(".example.com"), None);
        assert_eq!(normalize_domain("exa mple.com"), None);
        assert_eq!(normalize_domain("a..b"), None);
    }
}
