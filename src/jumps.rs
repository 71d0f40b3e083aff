use thiserror::Error;

use crate::program::{CLOSE, OPEN};

/// A bracket whose partner is missing, reported at its own byte position.
///
/// Resolution does not stop at the first imbalance; every unmatched bracket
/// in the source gets its own report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnbalancedBracket {
    /// A `]` with no `[` to its left at the same nesting depth.
    #[error("couldn't find matching '[' for ']' at byte {0}")]
    MissingOpen(usize),
    /// A `[` that is never closed.
    #[error("couldn't find matching ']' for '[' at byte {0}")]
    MissingClose(usize),
}

impl UnbalancedBracket {
    pub fn position(&self) -> usize {
        match *self {
            UnbalancedBracket::MissingOpen(pos) => pos,
            UnbalancedBracket::MissingClose(pos) => pos,
        }
    }
}

/// Bidirectional map from each bracket's position to its partner's position.
///
/// Built once per run so that every loop branch during execution is an O(1)
/// redirect instead of a rescan. Positions holding an unmatched bracket (or
/// no bracket at all) have no partner.
#[derive(Debug, Clone)]
pub struct JumpMap {
    partners: Vec<Option<usize>>,
}

impl JumpMap {
    /// Scan `source` left to right and pair up brackets.
    ///
    /// Returns the map together with every imbalance found: unmatched closes
    /// in scan order, then unmatched opens innermost (last pushed) first. The
    /// map is returned even when errors are present, so callers can run the
    /// matched loops best-effort.
    pub fn resolve(source: &[u8]) -> (JumpMap, Vec<UnbalancedBracket>) {
        let mut partners = vec![None; source.len()];
        let mut pending: Vec<usize> = Vec::new();
        let mut errors = Vec::new();

        for (pos, &byte) in source.iter().enumerate() {
            match byte {
                OPEN => pending.push(pos),
                CLOSE => {
                    if let Some(open) = pending.pop() {
                        partners[open] = Some(pos);
                        partners[pos] = Some(open);
                    } else {
                        errors.push(UnbalancedBracket::MissingOpen(pos));
                    }
                }
                _ => {}
            }
        }

        while let Some(open) = pending.pop() {
            errors.push(UnbalancedBracket::MissingClose(open));
        }

        (JumpMap { partners }, errors)
    }

    /// The matching bracket's position, if `pos` holds a matched bracket.
    pub fn partner(&self, pos: usize) -> Option<usize> {
        self.partners.get(pos).copied().flatten()
    }
}

/// Echo the source with a caret under the offending byte.
///
/// Matches the original diagnostic layout: the caret column assumes the
/// source fits on one line, which is all the interactive mode ever shows.
pub fn render_diagnostic(source: &[u8], error: &UnbalancedBracket) -> String {
    let mut out = String::from_utf8_lossy(source).into_owned();
    out.push('\n');
    for _ in 0..error.position() {
        out.push(' ');
    }
    match error {
        UnbalancedBracket::MissingOpen(_) => out.push_str("^ missing '['"),
        UnbalancedBracket::MissingClose(_) => out.push_str("^ missing ']'"),
    }
    out
}
