use std::collections::BTreeMap;

/// Cookies parsed from a `name=value; name2=value2` header string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    values: BTreeMap<String, String>,
}

impl CookieJar {
    /// Lenient parse: pairs without `=` or with an empty name are skipped.
    /// A value wrapped in double quotes is unquoted.
    pub fn parse(header: &str) -> Self {
        let values = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                Some((name.to_string(), value.to_string()))
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The bearer token stored under `cookie_name`, if non-empty.
    pub fn bearer_token(&self, cookie_name: &str) -> Option<&str> {
        self.get(cookie_name).filter(|token| !token.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
