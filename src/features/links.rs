use super::{FeatureExtractor, FeatureScore};
use crate::config::{RuleSet, Weights};
use crate::domain_utils::DomainUtils;
use crate::email::EmailMessage;
use lazy_static::lazy_static;
use regex::Regex;
use url::{Host, Url};

lazy_static! {
    // Runs until whitespace, markup quotes or CJK punctuation
    static ref URL_REGEX: Regex =
        Regex::new(r#"(?i)https?://[^\s<>"'，。、；：！？（）「」『』【】《》]+"#).unwrap();
}

pub struct LinkAnalyzer;

impl FeatureExtractor for LinkAnalyzer {
    fn extract(&self, rules: &RuleSet, email: &EmailMessage) -> FeatureScore {
        let mut urls = extract_urls(&email.subject);
        urls.extend(extract_urls(&email.content));
        check_urls(rules, &urls)
    }

    fn name(&self) -> &str {
        "links"
    }
}

/// All `http(s)://` URLs in `text`, in order of appearance.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']']))
        .filter(|url| url.len() > "http://".len())
        .map(str::to_string)
        .collect()
}

/// Lowercased host of an absolute URL, as written. Internationalized
/// names stay in Unicode rather than punycode so they compare against the
/// rule lists directly.
pub fn url_host(url: &str) -> Option<String> {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host()? {
            Host::Domain(_) => raw_host(url).or_else(|| parsed.host_str().map(str::to_lowercase)),
            Host::Ipv4(_) | Host::Ipv6(_) => parsed.host_str().map(str::to_lowercase),
        },
        // Fall back to slicing for URLs the parser rejects
        Err(_) => raw_host(url),
    }
}

fn raw_host(url: &str) -> Option<String> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split(['/', '\\', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    let host = host.trim_end_matches('.');
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Suspicious-domain and suspicious-TLD checks run independently per URL;
/// both may fire for the same link.
pub fn check_urls(rules: &RuleSet, urls: &[String]) -> FeatureScore {
    let mut score = FeatureScore::default();

    for url in urls {
        let Some(host) = url_host(url) else {
            continue;
        };

        if DomainUtils::matches_domain_list(&host, &rules.suspicious_domains) {
            score.add(
                Weights::points(rules.weights.url_suspicious),
                format!("url:{host}"),
            );
        }

        if let Some(tld) = DomainUtils::extract_tld(&host) {
            if rules.suspicious_tlds.contains(&tld) {
                score.add(
                    Weights::points(rules.weights.tld_suspicious),
                    format!("tld:.{tld}"),
                );
            }
        }
    }

    score
}
