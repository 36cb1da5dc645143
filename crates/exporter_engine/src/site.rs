use std::fmt;

use url::Url;

const SUBSTACK_SUFFIX: &str = ".substack.com";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SiteError {
    #[error("site address is empty")]
    Empty,
    #[error("invalid site address {input:?}: {reason}")]
    Invalid { input: String, reason: String },
    #[error("{host} is not a substack host; give the full https:// address for a custom domain")]
    NotSubstack { host: String },
}

/// Normalized publication address: `https://host` without path or trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAddress {
    url: Url,
    hostname: String,
    identity: String,
}

impl SiteAddress {
    /// Accepts `name`, `name.substack.com`, `https://name.substack.com/p/x`
    /// and `https://custom.domain`.
    pub fn parse(input: &str) -> Result<Self, SiteError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SiteError::Empty);
        }

        let explicit_scheme = has_http_scheme(input);
        let candidate = if explicit_scheme {
            input.to_string()
        } else if input.contains("://") {
            return Err(SiteError::Invalid {
                input: input.to_string(),
                reason: "only http and https addresses are supported".to_string(),
            });
        } else {
            let host = input.split(['/', '?', '#']).next().unwrap_or(input);
            if host.contains('.') {
                format!("https://{input}")
            } else {
                let rest = &input[host.len()..];
                format!("https://{host}{SUBSTACK_SUFFIX}{rest}")
            }
        };

        let parsed = Url::parse(&candidate).map_err(|err| SiteError::Invalid {
            input: input.to_string(),
            reason: err.to_string(),
        })?;
        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| SiteError::Invalid {
                input: input.to_string(),
                reason: "missing host".to_string(),
            })?
            .to_ascii_lowercase();

        match subdomain(&host) {
            Some(name) => Self::build(host.clone(), name.to_string()),
            None if explicit_scheme => Self::build(host.clone(), host),
            None => Err(SiteError::NotSubstack { host }),
        }
    }

    pub fn from_username(username: &str) -> Result<Self, SiteError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(SiteError::Empty);
        }
        if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(SiteError::Invalid {
                input: username.to_string(),
                reason: "usernames contain only letters, digits and '-'".to_string(),
            });
        }
        let name = username.to_ascii_lowercase();
        Self::build(format!("{name}{SUBSTACK_SUFFIX}"), name)
    }

    fn build(hostname: String, identity: String) -> Result<Self, SiteError> {
        let url = Url::parse(&format!("https://{hostname}")).map_err(|err| SiteError::Invalid {
            input: hostname.clone(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            url,
            hostname,
            identity,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Subdomain for substack hosts, the full host for custom domains.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_substack(&self) -> bool {
        subdomain(&self.hostname).is_some()
    }
}

impl fmt::Display for SiteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str().trim_end_matches('/'))
    }
}

fn has_http_scheme(input: &str) -> bool {
    let lower = input.get(..8).unwrap_or(input).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn subdomain(host: &str) -> Option<&str> {
    host.strip_suffix(SUBSTACK_SUFFIX)
        .and_then(|prefix| prefix.split('.').next())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_becomes_substack_host() {
        let site = SiteAddress::parse("writer").unwrap();
        assert_eq!(site.to_string(), "https://writer.substack.com");
        assert_eq!(site.hostname(), "writer.substack.com");
        assert_eq!(site.identity(), "writer");
        assert!(site.is_substack());
    }

    #[test]
    fn paths_queries_and_fragments_are_dropped() {
        let site = SiteAddress::parse("http://Writer.substack.com/p/hello?x=1#top").unwrap();
        assert_eq!(site.to_string(), "https://writer.substack.com");
        assert_eq!(site.identity(), "writer");

        let site = SiteAddress::parse("writer/p/hello").unwrap();
        assert_eq!(site.to_string(), "https://writer.substack.com");
    }

    #[test]
    fn custom_domain_needs_scheme() {
        let site = SiteAddress::parse("https://blog.example.com/archive").unwrap();
        assert_eq!(site.to_string(), "https://blog.example.com");
        assert_eq!(site.identity(), "blog.example.com");
        assert!(!site.is_substack());

        assert_eq!(
            SiteAddress::parse("blog.example.com").unwrap_err(),
            SiteError::NotSubstack {
                host: "blog.example.com".to_string()
            }
        );
    }

    #[test]
    fn empty_and_foreign_schemes_fail() {
        assert_eq!(SiteAddress::parse("   ").unwrap_err(), SiteError::Empty);
        assert!(matches!(
            SiteAddress::parse("ftp://writer.substack.com"),
            Err(SiteError::Invalid { .. })
        ));
    }

    #[test]
    fn from_username_builds_address() {
        let site = SiteAddress::from_username("Writer").unwrap();
        assert_eq!(site.url().as_str(), "https://writer.substack.com/");
        assert_eq!(site.identity(), "writer");
        assert!(SiteAddress::from_username("a b").is_err());
    }
}
