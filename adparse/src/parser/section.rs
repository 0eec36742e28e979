//! Folds the flat assembly output into a section tree: every element after
//! a heading becomes part of that section's body until a heading of the same
//! or a shallower level appears.

use crate::model::Element;

pub(crate) fn build_tree(flat: Vec<Element>) -> Vec<Element> {
    let mut root = Vec::new();
    let mut open: Vec<Element> = Vec::new();

    for element in flat {
        match element {
            Element::Section { level, .. } => {
                close_to(&mut root, &mut open, level);
                open.push(element);
            }
            other => attach(&mut root, &mut open, other),
        }
    }
    close_to(&mut root, &mut open, 0);
    root
}

/// Pop open sections whose level is at or below the incoming heading's,
/// attaching each to its parent.
fn close_to(root: &mut Vec<Element>, open: &mut Vec<Element>, level: u8) {
    while let Some(Element::Section { level: depth, .. }) = open.last() {
        if *depth < level {
            break;
        }
        if let Some(done) = open.pop() {
            attach(root, open, done);
        }
    }
}

fn attach(root: &mut Vec<Element>, open: &mut [Element], element: Element) {
    if let Some(Element::Section { body, .. }) = open.last_mut() {
        body.push(element);
    } else {
        root.push(element);
    }
}
