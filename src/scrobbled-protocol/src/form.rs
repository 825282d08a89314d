//! Accumulates a URL or POST body with AudioScrobbler's escape discipline
//! (spec.md §4.6). Grounded byte-for-byte in `Form.cxx`/`Form.hxx`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside the URI "unreserved" set (`A-Za-z0-9-_.~`) gets
/// percent-encoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    None,
    Question,
    Ampersand,
}

/// Builds a URL or POST body one key/value pair at a time.
#[derive(Debug, Clone)]
pub struct FormDataBuilder {
    s: String,
    separator: Separator,
}

impl FormDataBuilder {
    pub fn new() -> Self {
        Self {
            s: String::new(),
            separator: Separator::None,
        }
    }

    /// Start from an existing base string (e.g. a URL). If it already
    /// contains `?`, the first appended key uses `&`; otherwise `?`.
    pub fn with_base(base: impl Into<String>) -> Self {
        let s = base.into();
        let separator = if s.is_empty() {
            Separator::None
        } else if s.contains('?') {
            Separator::Ampersand
        } else {
            Separator::Question
        };
        Self { s, separator }
    }

    pub fn append(&mut self, key: &str, value: &str) -> &mut Self {
        self.append_separator();
        self.s.push_str(key);
        self.s.push('=');
        self.append_escaped(value);
        self
    }

    pub fn append_indexed(&mut self, key: &str, index: usize, value: &str) -> &mut Self {
        self.append_separator();
        self.s.push_str(key);
        self.s.push('[');
        self.s.push_str(&index.to_string());
        self.s.push(']');
        self.s.push('=');
        self.append_escaped(value);
        self
    }

    pub fn into_string(self) -> String {
        self.s
    }

    pub fn as_str(&self) -> &str {
        &self.s
    }

    fn append_separator(&mut self) {
        match self.separator {
            Separator::None => {}
            Separator::Question => self.s.push('?'),
            Separator::Ampersand => self.s.push('&'),
        }
        self.separator = Separator::Ampersand;
    }

    fn append_escaped(&mut self, value: &str) {
        for piece in utf8_percent_encode(value, UNRESERVED) {
            self.s.push_str(piece);
        }
    }
}

impl Default for FormDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_key_uses_question_mark_on_bare_base() {
        let mut f = FormDataBuilder::with_base("http://example.com/");
        f.append("hs", "true");
        assert_eq!(f.into_string(), "http://example.com/?hs=true");
    }

    #[test]
    fn first_key_uses_ampersand_when_base_already_has_query() {
        let mut f = FormDataBuilder::with_base("http://example.com/?a=1");
        f.append("hs", "true");
        assert_eq!(f.into_string(), "http://example.com/?a=1&hs=true");
    }

    #[test]
    fn subsequent_keys_always_use_ampersand() {
        let mut f = FormDataBuilder::new();
        f.append("a", "1").append("b", "2");
        assert_eq!(f.into_string(), "a=1&b=2");
    }

    #[test]
    fn values_are_percent_encoded_keys_are_not() {
        let mut f = FormDataBuilder::new();
        f.append("t", "Foo & Bar/Baz");
        assert_eq!(f.into_string(), "t=Foo%20%26%20Bar%2FBaz");
    }

    #[test]
    fn indexed_keys_embed_unsigned_index_verbatim() {
        let mut f = FormDataBuilder::new();
        f.append_indexed("a", 0, "X").append_indexed("a", 1, "Y");
        assert_eq!(f.into_string(), "a[0]=X&a[1]=Y");
    }
}
