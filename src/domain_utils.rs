/// Minimal domain hierarchy utilities
pub struct DomainUtils;

impl DomainUtils {
    /// Extract domain from email address
    pub fn extract_domain(email: &str) -> Option<String> {
        let email = email.trim();
        // "Name <user@host>" style senders
        let email = match (email.rfind('<'), email.rfind('>')) {
            (Some(start), Some(end)) if start < end => &email[start + 1..end],
            _ => email,
        };
        email
            .rsplit_once('@')
            .map(|(_, domain)| domain.trim().trim_end_matches('.').to_lowercase())
            .filter(|domain| !domain.is_empty())
    }

    /// Last label of a domain, lowercased, without the dot
    pub fn extract_tld(domain: &str) -> Option<String> {
        let domain = domain.trim().trim_end_matches('.');
        match domain.rsplit_once('.') {
            Some((_, tld)) if !tld.is_empty() => Some(tld.to_lowercase()),
            _ => None,
        }
    }

    /// Extension after the last dot, lowercased, with a leading dot
    pub fn extract_extension(filename: &str) -> Option<String> {
        match filename.trim().rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => Some(format!(".{}", ext.to_lowercase())),
            _ => None,
        }
    }

    /// Check if domain matches any in list (with hierarchy support)
    pub fn matches_domain_list(domain: &str, domain_list: &[String]) -> bool {
        Self::find_in_domain_list(domain, domain_list).is_some()
    }

    /// Like `matches_domain_list`, returning the entry that matched
    pub fn find_in_domain_list<'a>(domain: &str, domain_list: &'a [String]) -> Option<&'a str> {
        let domain_lower = domain.to_lowercase();

        for pattern in domain_list {
            let pattern_lower = pattern.to_lowercase();

            // Exact match
            if domain_lower == pattern_lower {
                return Some(pattern);
            }

            // Subdomain match (domain ends with .pattern)
            if domain_lower.ends_with(&format!(".{}", pattern_lower)) {
                return Some(pattern);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            DomainUtils::extract_domain("user@Example.COM"),
            Some("example.com".to_string())
        );
        assert_eq!(
            DomainUtils::extract_domain("\"Sales\" <sales@shop.tk>"),
            Some("shop.tk".to_string())
        );
        assert_eq!(DomainUtils::extract_domain("invalid"), None);
        assert_eq!(DomainUtils::extract_domain("user@"), None);
    }

    #[test]
    fn test_extract_tld() {
        assert_eq!(DomainUtils::extract_tld("abc.def.TK"), Some("tk".to_string()));
        assert_eq!(DomainUtils::extract_tld("localhost"), None);
        assert_eq!(DomainUtils::extract_tld("example."), None);
    }

    #[test]
    fn test_extract_extension() {
        assert_eq!(
            DomainUtils::extract_extension("Invoice.PDF.EXE"),
            Some(".exe".to_string())
        );
        assert_eq!(DomainUtils::extract_extension("README"), None);
        assert_eq!(DomainUtils::extract_extension("trailing."), None);
    }

    #[test]
    fn test_matches_domain_list() {
        let domains = vec!["example.com".to_string(), "bit.ly".to_string()];

        assert!(DomainUtils::matches_domain_list("example.com", &domains));
        assert!(DomainUtils::matches_domain_list("a.bit.ly", &domains));
        assert!(!DomainUtils::matches_domain_list("notbit.ly", &domains));
        assert_eq!(
            DomainUtils::find_in_domain_list("mail.example.com", &domains),
            Some("example.com")
        );
    }
}
