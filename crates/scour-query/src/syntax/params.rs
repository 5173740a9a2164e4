//! Raw query-string decoding.
//!
//! Splits `a=1&b=2` into ordered, percent-decoded key/value pairs. Keys may
//! repeat (`filter=a:1&filter=b:2`).

/// Ordered HTTP query parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw query string (with or without a leading `?`)
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let pairs = raw
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (decode(key), decode(value)),
                None => (decode(pair), String::new()),
            })
            .collect();
        Self { pairs }
    }

    /// Build from already-decoded pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in order
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Form decoding: `+` is a space, invalid escapes are kept verbatim
fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    match urlencoding::decode(&s) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s,
    }
}

/// Percent-decode a single bracket-notation token
pub(crate) fn unescape(token: &str) -> String {
    match urlencoding::decode(token) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => token.to_string(),
    }
}
