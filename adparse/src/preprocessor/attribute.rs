//! Parsing of document attribute entry lines (`:name: value`, `:name!:`).

/// A parsed attribute entry line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttributeLine {
    Set { name: String, value: Option<String> },
    Unset { name: String },
}

peg::parser! {
    grammar attribute_parser() for str {
        pub(crate) rule entry() -> AttributeLine
            = ":" "!" name:name() ":" { AttributeLine::Unset { name } }
            / ":" name:name() "!" ":" { AttributeLine::Unset { name } }
            / ":" name:name() ":" whitespace()? value:value()? {
                AttributeLine::Set { name, value: value.filter(|v| !v.is_empty()) }
            }

        rule name() -> String
            = n:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_']+) { n.to_string() }

        rule value() -> String
            = v:$([^ '\n']*) { v.to_string() }

        rule whitespace() = quiet!{[' ' | '\t']+}
    }
}

/// Parse an attribute entry line, or `None` if the line is not one.
pub(crate) fn parse_line(line: &str) -> Option<AttributeLine> {
    attribute_parser::entry(line).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_with_value() {
        assert_eq!(
            parse_line(":name: value here"),
            Some(AttributeLine::Set {
                name: "name".to_string(),
                value: Some("value here".to_string()),
            })
        );
    }

    #[test]
    fn test_set_without_value() {
        assert_eq!(
            parse_line(":toc:"),
            Some(AttributeLine::Set {
                name: "toc".to_string(),
                value: None,
            })
        );
    }

    #[test]
    fn test_unset_both_forms() {
        let expected = Some(AttributeLine::Unset {
            name: "foo".to_string(),
        });
        assert_eq!(parse_line(":!foo:"), expected);
        assert_eq!(parse_line(":foo!:"), expected);
    }

    #[test]
    fn test_not_an_entry() {
        assert_eq!(parse_line("plain text"), None);
        assert_eq!(parse_line("::"), None);
    }
}
