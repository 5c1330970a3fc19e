use std::fmt;

/// A scalar FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl HeaderValue {
    /// Classifies a raw card value: integers, then reals (Fortran `D` exponents
    /// accepted), otherwise text.
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        let looks_numeric = trimmed
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'));
        if looks_numeric {
            if let Ok(v) = trimmed.parse::<i64>() {
                return HeaderValue::Integer(v);
            }
            if let Ok(v) = trimmed.replace(['D', 'd'], "E").parse::<f64>() {
                return HeaderValue::Number(v);
            }
        }
        HeaderValue::Text(raw.trim_end().to_string())
    }

    /// Numeric view of the value. Text that parses as a number is accepted,
    /// since some cameras write EXPTIME and AIRMASS as quoted strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Integer(v) => Some(*v as f64),
            HeaderValue::Number(v) => Some(*v),
            HeaderValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s.as_str()),
            HeaderValue::Integer(_) | HeaderValue::Number(_) => None,
        }
    }
}

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        HeaderValue::Number(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Integer(value)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Text(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Text(value)
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Integer(v) => write!(f, "{v}"),
            HeaderValue::Number(v) => f.write_str(&format_number(*v)),
            HeaderValue::Text(s) => f.write_str(s.trim_end()),
        }
    }
}

/// Formats a number the way the calibration store and catalog name values:
/// shortest round-trip digits, with a trailing `.0` for integral values
/// (`180.0`, `0.5`, `1.25`).
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Ordered keyword/value list from a primary HDU.
///
/// Keywords are stored upper-case and looked up case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<(String, HeaderValue)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    /// Value rendered as text, whatever its type.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }

    /// Replaces an existing keyword in place or appends a new one.
    pub fn set(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let value = value.into();
        match self
            .cards
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some((_, v)) => *v = value,
            None => self.cards.push((key.to_ascii_uppercase(), value)),
        }
    }

    /// First keyword from `keys` that holds a numeric value.
    pub fn first_number<'k>(&self, keys: &'k [String]) -> Option<(&'k str, f64)> {
        self.first_numeric(keys)
            .and_then(|(key, value)| value.as_f64().map(|v| (key, v)))
    }

    /// Like [`Header::first_number`], but returns the value as stored so its
    /// spelling (`180` or `180.0`) is kept.
    pub fn first_numeric<'k>(&self, keys: &'k [String]) -> Option<(&'k str, &HeaderValue)> {
        keys.iter().find_map(|key| {
            self.get(key)
                .filter(|value| value.as_f64().is_some())
                .map(|value| (key.as_str(), value))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<HeaderValue>> FromIterator<(K, V)> for Header {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut header = Header::new();
        for (key, value) in iter {
            header.set(key.as_ref(), value);
        }
        header
    }
}
