use std::str::FromStr;

/// Safe mode level active while parsing a document.
///
/// Follows <https://docs.asciidoctor.org/asciidoctor/latest/safe-modes/>: the
/// level gates whether filesystem-sensitive attributes set in the document
/// (rather than through the API) are honored.
#[derive(Debug, Clone, Default, PartialOrd, PartialEq, Eq, Copy)]
pub enum SafeMode {
    /// All restrictions disabled.
    #[default]
    Unsafe = 0,

    /// File access restricted to the document's directory tree.
    Safe,

    /// The document may no longer override conversion-affecting attributes
    /// such as `backend` or `doctype`, and cannot see `docdir`.
    Server,

    /// The document may not read the filesystem at all; `docdir` and
    /// `docfile` are withheld entirely.
    Secure,
}

impl SafeMode {
    /// Whether a document-level attribute entry for `name` is honored at this
    /// safe-mode level.
    ///
    /// This is the single place the safe-mode precedence table lives; the
    /// attribute store consults it instead of re-deriving the rules per
    /// attribute.
    #[must_use]
    pub fn permits_document_override(self, name: &str) -> bool {
        match name {
            "backend" | "doctype" | "source-highlighter" | "docinfo" => self < SafeMode::Server,
            "docdir" | "docfile" | "user-home" | "max-include-depth" | "allow-uri-read" => {
                self < SafeMode::Safe
            }
            _ => true,
        }
    }
}

impl FromStr for SafeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unsafe" => Ok(Self::Unsafe),
            "safe" => Ok(Self::Safe),
            "server" => Ok(Self::Server),
            "secure" => Ok(Self::Secure),
            _ => Err(format!(
                "invalid safe mode: '{s}', expected: unsafe, safe, server, secure"
            )),
        }
    }
}
