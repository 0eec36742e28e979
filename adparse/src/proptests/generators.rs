//! Input generators for the property tests.
#![allow(clippy::expect_used)]

use proptest::prelude::*;

/// Any string at all, including control characters and embedded newlines.
pub fn any_document_string() -> impl Strategy<Value = String> {
    prop::string::string_regex(".*").expect("failed to create any-string strategy")
}

/// Chunks of plausible markup glued together in random order. More likely to
/// reach deep parser paths than fully random text.
pub fn structured_document() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("= Title\n\n".to_string()),
            Just("== Section\n\n".to_string()),
            Just(":name: value\n".to_string()),
            Just(":name!:\n".to_string()),
            Just("* list item\n".to_string()),
            Just(". ordered item\n".to_string()),
            Just("term:: definition\n".to_string()),
            Just("----\ncode block\n----\n".to_string()),
            Just("|===\n|a |b\n|===\n".to_string()),
            Just("[quote, Someone]\n____\nwords\n____\n".to_string()),
            Just("ifdef::name[]\ninside\nendif::[]\n".to_string()),
            Just("NOTE: remember\n\n".to_string()),
            Just("{counter:seq} and {name} and \\{escaped}\n".to_string()),
            Just("See <<ref>> and image:pic.png[] here.\n".to_string()),
            Just("`inline` *bold* _italic_ #mark# ^s^ ~s~ +pass+\n".to_string()),
            prop::string::string_regex(r"[a-zA-Z0-9 .,!?\n]{0,40}")
                .expect("failed to create text chunk strategy"),
        ],
        0..16,
    )
    .prop_map(|chunks| chunks.concat())
}

/// A valid attribute name. Short enough never to collide with the locked
/// built-ins.
pub fn attribute_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,12}")
        .expect("failed to create attribute name strategy")
}

/// Printable attribute value text.
pub fn attribute_value() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{0,40}").expect("failed to create attribute value strategy")
}

/// A line that can sit inside a verbatim block without ever looking like a
/// closing fence: no fence characters, no trailing whitespace.
pub fn verbatim_line() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-zA-Z0-9 ?!,;:()<>{}]{0,40}")
        .expect("failed to create verbatim line strategy")
        .prop_map(|line| line.trim_end().to_string())
}
