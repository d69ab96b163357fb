use crate::error::ConfigError;

/// Query parameter carrying the counter when none is configured.
pub const DEFAULT_COUNTER_PARAM: &str = "cnt";

/// The fixed external URL every redirect points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    base: String,
    param: String,
}

impl RedirectTarget {
    /// Validates that the URL has an http(s) scheme and a host and is plain
    /// ASCII, and that the parameter name needs no escaping.
    pub fn new(base: impl Into<String>, param: impl Into<String>) -> Result<Self, ConfigError> {
        let base = base.into();
        let param = param.into();

        let Some((scheme, rest)) = base.split_once("://") else {
            return Err(ConfigError::InvalidTarget(format!(
                "URL must have a valid scheme and host: {base}"
            )));
        };
        let scheme = scheme.to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::InvalidTarget(format!(
                "URL scheme must be http or https: {scheme}"
            )));
        }
        if rest.is_empty() || rest.starts_with(['/', '?', '#']) {
            return Err(ConfigError::InvalidTarget(format!("URL has no host: {base}")));
        }
        // the location header only carries visible ASCII
        if !base.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(ConfigError::InvalidTarget(format!(
                "URL must be percent-encoded ASCII: {base}"
            )));
        }

        let valid_param = !param.is_empty()
            && param
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !valid_param {
            return Err(ConfigError::InvalidParam(param));
        }

        Ok(Self { base, param })
    }

    /// Target with the default `cnt` parameter.
    pub fn with_default_param(base: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(base, DEFAULT_COUNTER_PARAM)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// Returns the target URL with `count` appended as a query parameter.
    ///
    /// Existing query parameters are kept and a fragment stays last.
    pub fn url_for(&self, count: u64) -> String {
        let (url, fragment) = match self.base.split_once('#') {
            Some((url, fragment)) => (url, Some(fragment)),
            None => (self.base.as_str(), None),
        };

        let separator = match url.find('?') {
            None => "?",
            Some(_) if url.ends_with('?') || url.ends_with('&') => "",
            Some(_) => "&",
        };

        let mut location = format!("{url}{separator}{}={count}", self.param);
        if let Some(fragment) = fragment {
            location.push('#');
            location.push_str(fragment);
        }
        location
    }
}
