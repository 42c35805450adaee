#![forbid(unsafe_code)]

//! Character references for the places the serializer and the
//! canonicalizers write character data.

use std::borrow::Cow;

/// Where an escaped string ends up.
///
/// Each position has its own replacement set, the one canonical XML
/// prescribes; the plain serializer uses the same sets so its output is
/// already close to canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Text node content.
    Text,
    /// A double-quoted attribute value (namespace declarations included).
    Attribute,
    /// Processing instruction data.
    Instruction,
}

impl Escape {
    fn reference(self, ch: char) -> Option<&'static str> {
        match (self, ch) {
            (_, '\r') => Some("&#xD;"),
            (Self::Text | Self::Attribute, '&') => Some("&amp;"),
            (Self::Text | Self::Attribute, '<') => Some("&lt;"),
            (Self::Text, '>') => Some("&gt;"),
            (Self::Attribute, '"') => Some("&quot;"),
            (Self::Attribute, '\t') => Some("&#x9;"),
            (Self::Attribute, '\n') => Some("&#xA;"),
            _ => None,
        }
    }

    /// Escape `s`, borrowing it unchanged when nothing needs a reference.
    pub fn apply(self, s: &str) -> Cow<'_, str> {
        let Some(first) = s.find(|c| self.reference(c).is_some()) else {
            return Cow::Borrowed(s);
        };
        let mut out = String::with_capacity(s.len() + 16);
        out.push_str(&s[..first]);
        for ch in s[first..].chars() {
            match self.reference(ch) {
                Some(reference) => out.push_str(reference),
                None => out.push(ch),
            }
        }
        Cow::Owned(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text() {
        assert!(matches!(Escape::Text.apply("hello \"world\""), Cow::Borrowed(_)));
        assert_eq!(Escape::Text.apply("a&b<c>d"), "a&amp;b&lt;c&gt;d");
        assert_eq!(Escape::Text.apply("line\r\nend\t"), "line&#xD;\nend\t");
    }

    #[test]
    fn test_attribute() {
        assert_eq!(Escape::Attribute.apply("a&b\"c>d"), "a&amp;b&quot;c>d");
        assert_eq!(Escape::Attribute.apply("a\tb\nc\rd"), "a&#x9;b&#xA;c&#xD;d");
        assert_eq!(Escape::Attribute.apply("urn:example:orders"), "urn:example:orders");
    }

    #[test]
    fn test_instruction_only_escapes_carriage_return() {
        assert_eq!(Escape::Instruction.apply("a<b & \"c\"\r"), "a<b & \"c\"&#xD;");
    }

    #[test]
    fn test_multibyte_prefix_kept() {
        assert_eq!(Escape::Text.apply("Grüße & ü"), "Grüße &amp; ü");
    }
}
