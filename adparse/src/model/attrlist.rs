//! Node types for the bracketed `[...]` attribute-list syntax.

use serde::Serialize;

/// How a named attribute value was quoted in the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteKind {
    #[default]
    None,
    Single,
    Double,
}

/// A role contributed by shorthand syntax (`.role`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShorthandRole(pub String);

/// An option contributed by shorthand syntax (`%option`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShorthandOption(pub String);

/// A positional attribute, e.g. the two values in `[quote, author, source]`.
///
/// `offset` is 1-based and counts positional slots only; an elided slot
/// (leading or doubled comma) still consumes an offset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PositionalAttribute {
    pub offset: usize,
    /// The name this position implies for the block at hand, when known
    /// (e.g. position 2 of a listing block implies `language`).
    pub implied_name: Option<String>,
    pub value: String,
}

/// A named attribute, e.g. `width=500` or `title="A title"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamedAttribute {
    pub name: String,
    pub value: String,
    pub quote_kind: QuoteKind,
}

/// Style/id/roles/options packed into the first positional slot,
/// e.g. `[source#main.wide%collapsible,ruby]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShorthandAttribute {
    pub style: Option<String>,
    pub id: Option<String>,
    pub roles: Vec<ShorthandRole>,
    pub options: Vec<ShorthandOption>,
}

impl ShorthandAttribute {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.style.is_none() && self.id.is_none() && self.roles.is_empty() && self.options.is_empty()
    }
}

/// A block title contributed by a `.Title` line above the block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TitleAttribute {
    pub value: String,
}

/// A block anchor contributed by a `[[id]]` or `[[id,label]]` line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnchorAttribute {
    pub id: String,
    pub label: Option<String>,
}

/// One entry of an [`AttributeList`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Positional(PositionalAttribute),
    Named(NamedAttribute),
    Shorthand(ShorthandAttribute),
    Title(TitleAttribute),
    Anchor(AnchorAttribute),
}

/// Ordered sequence of attribute nodes attached to a block or inline macro.
///
/// Accessors implement the merge rules: last-wins for `id` and for named
/// attributes (including `role=` as a named attribute), while shorthand roles
/// and options accumulate additively across entries, which is what lets
/// multiple attribute lines above one block stack up.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AttributeList(Vec<Attribute>);

impl AttributeList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.0.push(attribute);
    }

    /// Append all entries of `other`, preserving order. Used to fuse multiple
    /// attribute lines preceding the same block.
    pub fn extend_from(&mut self, other: AttributeList) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    /// The block style: an explicit shorthand style wins, otherwise the bare
    /// first positional value.
    #[must_use]
    pub fn style(&self) -> Option<&str> {
        let mut style = None;
        for attribute in &self.0 {
            if let Attribute::Shorthand(shorthand) = attribute {
                if let Some(s) = &shorthand.style {
                    style = Some(s.as_str());
                }
            }
        }
        style
    }

    /// The element id. Last-wins across shorthand `#id` and named `id=`.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        let mut id = None;
        for attribute in &self.0 {
            match attribute {
                Attribute::Shorthand(shorthand) => {
                    if let Some(i) = &shorthand.id {
                        id = Some(i.as_str());
                    }
                }
                Attribute::Named(named) if named.name == "id" => {
                    id = Some(named.value.as_str());
                }
                Attribute::Anchor(anchor) => {
                    id = Some(anchor.id.as_str());
                }
                Attribute::Positional(_) | Attribute::Named(_) | Attribute::Title(_) => {}
            }
        }
        id
    }

    /// All roles: shorthand roles accumulate; a named `role=` contributes its
    /// space-separated values with last-wins replacement of earlier named
    /// `role=` entries.
    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        let mut shorthand_roles = Vec::new();
        let mut named_role: Option<&str> = None;
        for attribute in &self.0 {
            match attribute {
                Attribute::Shorthand(shorthand) => {
                    shorthand_roles.extend(shorthand.roles.iter().map(|r| r.0.as_str()));
                }
                Attribute::Named(named) if named.name == "role" => {
                    named_role = Some(named.value.as_str());
                }
                Attribute::Positional(_)
                | Attribute::Named(_)
                | Attribute::Title(_)
                | Attribute::Anchor(_) => {}
            }
        }
        if let Some(value) = named_role {
            shorthand_roles.extend(value.split_whitespace());
        }
        shorthand_roles
    }

    /// All options, additive across shorthand and `opts=`/`options=` entries.
    #[must_use]
    pub fn options(&self) -> Vec<&str> {
        let mut options = Vec::new();
        for attribute in &self.0 {
            match attribute {
                Attribute::Shorthand(shorthand) => {
                    options.extend(shorthand.options.iter().map(|o| o.0.as_str()));
                }
                Attribute::Named(named) if named.name == "opts" || named.name == "options" => {
                    options.extend(named.value.split(',').map(str::trim));
                }
                Attribute::Positional(_)
                | Attribute::Named(_)
                | Attribute::Title(_)
                | Attribute::Anchor(_) => {}
            }
        }
        options
    }

    #[must_use]
    pub fn has_option(&self, name: &str) -> bool {
        self.options().iter().any(|o| *o == name)
    }

    /// A named attribute's value, last-wins. An unquoted literal `None` value
    /// means the attribute is treated as absent.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&str> {
        let mut value = None;
        for attribute in &self.0 {
            if let Attribute::Named(named) = attribute {
                if named.name == name {
                    if named.value == "None" && named.quote_kind == QuoteKind::None {
                        value = None;
                    } else {
                        value = Some(named.value.as_str());
                    }
                }
            }
        }
        value
    }

    /// The positional attribute at 1-based `offset`, if present and non-empty.
    #[must_use]
    pub fn positional(&self, offset: usize) -> Option<&str> {
        self.0.iter().find_map(|attribute| match attribute {
            Attribute::Positional(positional)
                if positional.offset == offset && !positional.value.is_empty() =>
            {
                Some(positional.value.as_str())
            }
            Attribute::Positional(_)
            | Attribute::Named(_)
            | Attribute::Shorthand(_)
            | Attribute::Title(_)
            | Attribute::Anchor(_) => None,
        })
    }

    /// The block title, if one was attached (`.Title` line). Last-wins.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        let mut title = None;
        for attribute in &self.0 {
            if let Attribute::Title(t) = attribute {
                title = Some(t.value.as_str());
            }
        }
        title
    }
}

impl FromIterator<Attribute> for AttributeList {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AttributeList {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
