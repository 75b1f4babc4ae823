use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;
use url::Url;
use crate::error::PubwatchError;

/// Hosts every run needs: the literature catalog and the e-print archive.
pub const DEFAULT_ALLOWLIST: &[&str] = &[
    "inspirehep.net", // INSPIRE literature API
    "arxiv.org",      // e-print PDFs
];

/// An HTTP client that only allows requests to approved domains.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, PubwatchError> {
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| PubwatchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let allowlist = DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect();
        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_ascii_lowercase());
    }

    /// Appends the host of a configured base URL, so that overriding an
    /// endpoint in the config file does not require a second setting.
    pub fn allow_url_host(&mut self, url: &str) -> Result<(), PubwatchError> {
        let parsed = Url::parse(url)
            .map_err(|e| PubwatchError::Config(format!("invalid URL {url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| PubwatchError::Config(format!("URL has no host: {url}")))?;
        self.allow_domain(host);
        Ok(())
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Exposes the inner `reqwest::Client` builder for GET requests.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, PubwatchError> {
        if !self.is_allowed(url) {
            warn!(url = %url, "Blocked request to host outside the allowlist");
            return Err(PubwatchError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SandboxClient {
        SandboxClient::new("pubwatch-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_default_hosts_allowed() {
        let c = client();
        assert!(c.is_allowed("https://inspirehep.net/api/literature?q=a%20X"));
        assert!(c.is_allowed("https://arxiv.org/pdf/2401.00001"));
        // subdomain of an allowed domain
        assert!(c.is_allowed("https://export.arxiv.org/pdf/2401.00001"));
    }

    #[test]
    fn test_unknown_and_malformed_urls_blocked() {
        let c = client();
        assert!(!c.is_allowed("https://example.com/paper.pdf"));
        assert!(!c.is_allowed("https://notarxiv.org/pdf/1"));
        assert!(!c.is_allowed("not a url"));
        assert!(matches!(c.get("https://example.com/"), Err(PubwatchError::Security(_))));
    }

    #[test]
    fn test_allow_url_host() {
        let mut c = client();
        c.allow_url_host("http://127.0.0.1:8080/api/literature").unwrap();
        assert!(c.is_allowed("http://127.0.0.1:8080/api/literature?size=1"));
        assert!(c.allow_url_host("::nonsense").is_err());
    }
}
