//! Line-oriented preprocessing, run before any block structure exists.
//!
//! The gate walks the source line by line and decides which lines the block
//! assembler ever gets to see: conditional directives admit or drop ranges,
//! attribute entry lines are fused across continuations and tracked so later
//! conditionals see up-to-date state, and `include::` directives are spliced
//! in through the configured [`IncludeProcessor`].
//!
//! Comment blocks (`////`) and verbatim fences shield their content: a
//! directive inside them is plain text.

// Byte offsets in this module come from `find`/`char_indices` over the
// string being sliced, so direct slicing stays on char boundaries.
#![allow(clippy::indexing_slicing)]

pub(crate) mod attribute;
pub(crate) mod conditional;

use crate::{
    attributes::AttributeStore,
    attrlist,
    error::Error,
    model::Delimiter,
    options::Options,
};

use self::attribute::AttributeLine;
use self::conditional::Conditional;

const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

#[derive(Debug)]
struct OpenConditional {
    conditional: Conditional,
    admitted: bool,
}

#[derive(Debug)]
pub(crate) struct Preprocessor<'a> {
    options: &'a Options,
    // Scratch attribute state, tracked incrementally so conditionals observe
    // entries in document order. The block assembler re-applies entries to
    // the real store during assembly.
    store: AttributeStore,
    output: Vec<String>,
    stack: Vec<OpenConditional>,
    in_comment: bool,
    verbatim: Option<Delimiter>,
    line_number: usize,
}

impl<'a> Preprocessor<'a> {
    /// Run the gate over `source`, seeded with the attribute state the
    /// document starts from. Returns the admitted lines.
    pub(crate) fn process(
        source: &str,
        options: &'a Options,
        seed: &AttributeStore,
    ) -> Result<Vec<String>, Error> {
        let mut gate = Preprocessor {
            options,
            store: seed.child(),
            output: Vec::new(),
            stack: Vec::new(),
            in_comment: false,
            verbatim: None,
            line_number: 0,
        };
        let lines: Vec<String> = source
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect();
        gate.run(lines, 0)?;
        if !gate.stack.is_empty() {
            tracing::warn!(
                open = gate.stack.len(),
                "conditional directive not closed by end of document"
            );
        }
        Ok(gate.output)
    }

    fn admitted(&self) -> bool {
        self.stack.iter().all(|open| open.admitted)
    }

    fn run(&mut self, mut lines: Vec<String>, depth: usize) -> Result<(), Error> {
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i].clone();
            i += 1;
            self.line_number += 1;

            // Inside a comment block or verbatim fence only the closing
            // fence is significant.
            if self.in_comment {
                if let Some(fence) = Delimiter::detect(&line) {
                    if fence.kind == crate::model::DelimiterKind::Comment {
                        self.in_comment = false;
                    }
                }
                self.push(line);
                continue;
            }
            if let Some(open) = self.verbatim {
                if let Some(fence) = Delimiter::detect(&line) {
                    if open.closed_by(fence.kind, fence.length) {
                        self.verbatim = None;
                    }
                }
                self.push(line);
                continue;
            }

            if line.starts_with("ifdef::")
                || line.starts_with("ifndef::")
                || line.starts_with("ifeval::")
            {
                self.open_conditional(&line, &mut lines, i)?;
                continue;
            }
            if line.starts_with("endif::") {
                self.close_conditional(&line)?;
                continue;
            }

            if !self.admitted() {
                continue;
            }

            // An escaped directive is admitted literally, minus the
            // backslash.
            if let Some(rest) = line.strip_prefix('\\') {
                if rest.starts_with("ifdef::")
                    || rest.starts_with("ifndef::")
                    || rest.starts_with("ifeval::")
                    || rest.starts_with("endif::")
                    || rest.starts_with("include::")
                {
                    self.push(rest.to_string());
                    continue;
                }
            }

            if let Some(fence) = Delimiter::detect(&line) {
                if fence.kind == crate::model::DelimiterKind::Comment {
                    self.in_comment = true;
                } else if fence.shields_content() {
                    self.verbatim = Some(fence);
                }
                self.push(line);
                continue;
            }

            if line.starts_with(':') {
                let fused = Self::fuse_continuations(line, &mut lines, &mut i);
                if let Some(entry) = attribute::parse_line(&fused) {
                    self.track_entry(&entry);
                }
                self.push(fused);
                continue;
            }

            if line.starts_with("include::") {
                if self.splice_include(&line, depth)? {
                    continue;
                }
            }

            self.push(line);
        }
        Ok(())
    }

    fn push(&mut self, line: String) {
        if self.admitted() {
            self.output.push(line);
        }
    }

    /// Fold attribute entry continuation lines into one logical line. A
    /// trailing `\` joins with a space; a trailing `+ \` keeps a hard line
    /// break in the value.
    fn fuse_continuations(first: String, lines: &mut Vec<String>, i: &mut usize) -> String {
        let mut fused = first;
        while fused.ends_with('\\') && *i < lines.len() {
            let next = lines[*i].trim().to_string();
            *i += 1;
            fused.truncate(fused.len() - 1);
            let hard = fused.trim_end().ends_with('+');
            let mut trimmed = fused.trim_end().to_string();
            if hard {
                trimmed.truncate(trimmed.len() - 1);
                let trimmed_end = trimmed.trim_end().len();
                trimmed.truncate(trimmed_end);
                trimmed.push('\n');
            } else {
                trimmed.push(' ');
            }
            trimmed.push_str(&next);
            fused = trimmed;
        }
        fused
    }

    fn track_entry(&mut self, entry: &AttributeLine) {
        match entry {
            AttributeLine::Set { name, value } => {
                let result = match value {
                    Some(value) => self.store.set_from_document(name, value.clone()),
                    None => self.store.set_from_document(name, true),
                };
                if result.is_err() {
                    tracing::debug!(name, "locked attribute entry ignored");
                }
            }
            AttributeLine::Unset { name } => {
                if self.store.unset(name).is_err() {
                    tracing::debug!(name, "locked attribute reset ignored");
                }
            }
        }
    }

    fn open_conditional(
        &mut self,
        line: &str,
        lines: &mut Vec<String>,
        next: usize,
    ) -> Result<(), Error> {
        let parsed = conditional::parse_line(line, self.line_number)?;
        let parent_admitted = self.admitted();

        if parsed.is_inline() {
            // Single-line form: admit the bracket content, no range opens.
            if parent_admitted {
                let mut content = None;
                if parsed.is_true(&self.store, &mut content, self.line_number)? {
                    if let Some(content) = content {
                        lines.insert(next, content);
                    }
                }
            }
            return Ok(());
        }

        let admitted = if parent_admitted {
            let mut unused = None;
            parsed.is_true(&self.store, &mut unused, self.line_number)?
        } else {
            false
        };
        self.stack.push(OpenConditional {
            conditional: parsed,
            admitted,
        });
        Ok(())
    }

    fn close_conditional(&mut self, line: &str) -> Result<(), Error> {
        let endif = conditional::parse_endif(line, self.line_number)?;
        match self.stack.pop() {
            Some(open) => {
                if !endif.closes(&open.conditional) {
                    tracing::warn!(
                        line = self.line_number,
                        "endif name does not match the open conditional"
                    );
                }
            }
            None => {
                tracing::warn!(line = self.line_number, "endif without an open conditional");
            }
        }
        Ok(())
    }

    /// Resolve an `include::` directive through the configured processor.
    /// Returns `false` when the directive should stay in the output as
    /// literal text for the assembler to represent.
    fn splice_include(&mut self, line: &str, depth: usize) -> Result<bool, Error> {
        let Some(processor) = self.options.include_processor.as_ref() else {
            return Ok(false);
        };
        let Some(rest) = line.strip_prefix("include::") else {
            return Ok(false);
        };
        let Some(open) = rest.find('[') else {
            return Ok(false);
        };
        if !rest.ends_with(']') {
            return Ok(false);
        }
        let path = &rest[..open];
        let Ok(attributes) = attrlist::parse_macro(&rest[open + 1..rest.len() - 1]) else {
            return Ok(false);
        };

        let max_depth = self
            .store
            .get("max-include-depth")
            .and_then(|value| value.as_text().parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_INCLUDE_DEPTH);
        if depth >= max_depth {
            tracing::warn!(path, depth, "maximum include depth reached, skipping");
            return Ok(true);
        }

        match processor.resolve(path, &attributes) {
            Some(included) => {
                let included: Vec<String> = included
                    .iter()
                    .map(|line| line.trim_end().to_string())
                    .collect();
                self.run(included, depth + 1)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
