//! Deterministic application of an operation batch to a document.
//!
//! Operations are applied from the end of the document towards the start,
//! so an applied splice never shifts the offsets of one still waiting.
//! Operations that share a `start` form a group: chunked insertions go first
//! in ascending `chunkIndex`, and each member of a group lands after the text
//! inserted by the members before it. The sort key is total, so the result
//! does not depend on the order operations arrived in.

use std::cmp::Ordering;

use crate::buffer::TextBuffer;
use crate::hash;
use crate::operation::EditOperation;

/// Authoritative conflict check consulted once the optimistic hash check
/// has passed.
///
/// A refusal is handled exactly like a hash mismatch: the operation is
/// skipped and reported, and the rest of the batch still applies.
pub trait ConflictVerifier {
    /// Returns `Err(reason)` to veto `op` against the slice it would replace.
    fn verify(&self, op: &EditOperation, current: &str) -> Result<(), String>;
}

/// Verifier that never vetoes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ConflictVerifier for AcceptAll {
    fn verify(&self, _op: &EditOperation, _current: &str) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The slice no longer hashes to the operation's `preHash`.
    HashMismatch { expected: String, actual: String },
    /// The verifier refused the operation.
    Verifier(String),
}

/// An operation skipped because the document moved under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Position of the operation in the input slice.
    pub index: usize,
    pub reason: ConflictReason,
}

/// Outcome of resolving a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resulting document text.
    pub text: String,
    /// Input positions of applied operations, in application order.
    pub applied: Vec<usize>,
    pub conflicts: Vec<Conflict>,
    /// False when `text` equals the input document.
    pub changed: bool,
}

impl Resolution {
    pub fn is_noop(&self) -> bool {
        !self.changed
    }
}

/// Chunked operations sort ahead of plain ones, by chunk index.
fn chunk_rank(op: &EditOperation) -> (u8, u32) {
    match op.chunk_order() {
        Some(index) => (0, index),
        None => (1, 0),
    }
}

fn application_cmp(a: &EditOperation, b: &EditOperation) -> Ordering {
    b.start
        .cmp(&a.start)
        .then_with(|| chunk_rank(a).cmp(&chunk_rank(b)))
        .then_with(|| (!a.is_point()).cmp(&!b.is_point()))
        .then_with(|| b.end.cmp(&a.end))
        .then_with(|| a.op_type.cmp(&b.op_type))
        .then_with(|| a.text.cmp(&b.text))
        .then_with(|| a.pre_hash.cmp(&b.pre_hash))
}

/// Input positions of `ops` in the order they will be applied.
pub fn application_order(ops: &[EditOperation]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ops.len()).collect();
    order.sort_by(|&a, &b| application_cmp(&ops[a], &ops[b]));
    order
}

/// Resolves operation batches against document text.
pub struct BatchResolver<'a> {
    verifier: &'a dyn ConflictVerifier,
}

impl Default for BatchResolver<'static> {
    fn default() -> Self {
        Self {
            verifier: &AcceptAll,
        }
    }
}

impl<'a> BatchResolver<'a> {
    pub fn new(verifier: &'a dyn ConflictVerifier) -> Self {
        Self { verifier }
    }

    /// Applies `ops` to `text`, skipping any operation whose target slice
    /// fails the conflict checks.
    pub fn resolve(&self, text: &str, ops: &[EditOperation]) -> Resolution {
        let mut buffer = TextBuffer::from(text);
        let mut applied = Vec::with_capacity(ops.len());
        let mut conflicts = Vec::new();

        // Chars inserted so far by the current same-start group.
        let mut group: Option<(usize, usize)> = None;

        for index in application_order(ops) {
            let op = &ops[index];
            let shift = match group {
                Some((start, shift)) if start == op.start => shift,
                _ => 0,
            };
            let (start, end) = buffer.clamp_range(
                op.start.saturating_add(shift),
                op.end.saturating_add(shift),
            );
            let current = buffer.slice(start, end);

            if let Some(expected) = op.pre_hash.as_deref() {
                if start != end && !hash::matches(expected, &current) {
                    let actual = hash::content_hash(&current);
                    tracing::debug!(
                        "Skipping {} at {start}..{end}: expected hash {expected}, found {actual}",
                        op.op_type
                    );
                    conflicts.push(Conflict {
                        index,
                        reason: ConflictReason::HashMismatch {
                            expected: expected.to_string(),
                            actual,
                        },
                    });
                    continue;
                }
            }

            if let Err(reason) = self.verifier.verify(op, &current) {
                tracing::debug!("Skipping {} at {start}..{end}: {reason}", op.op_type);
                conflicts.push(Conflict {
                    index,
                    reason: ConflictReason::Verifier(reason),
                });
                continue;
            }

            let payload = op.payload();
            buffer.splice(start, end, payload);
            applied.push(index);
            group = Some((op.start, shift + payload.chars().count()));
        }

        let result = buffer.to_string();
        let changed = result != text;
        tracing::debug!(
            "Resolved batch: {} applied, {} conflicts, changed={changed}",
            applied.len(),
            conflicts.len()
        );
        Resolution {
            text: result,
            applied,
            conflicts,
            changed,
        }
    }
}

/// Resolves `ops` against `text` with no authoritative verifier.
pub fn resolve(text: &str, ops: &[EditOperation]) -> Resolution {
    BatchResolver::default().resolve(text, ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::content_hash;

    #[test]
    fn test_replace_range() {
        let res = resolve("Hello world", &[EditOperation::replace(6, 11, "Codex")]);
        assert_eq!(res.text, "Hello Codex");
        assert_eq!(res.applied, vec![0]);
        assert!(res.changed);
    }

    #[test]
    fn test_delete_range() {
        let res = resolve("Hello World", &[EditOperation::delete(0, 5)]);
        assert_eq!(res.text, " World");
    }

    #[test]
    fn test_chunks_land_in_chunk_order() {
        let ops = [
            EditOperation::insert_after(3, "X").as_chunk(0),
            EditOperation::insert_after(3, "Y").as_chunk(1),
        ];
        assert_eq!(resolve("ABCDEF", &ops).text, "ABCXYDEF");

        let reversed = [ops[1].clone(), ops[0].clone()];
        assert_eq!(resolve("ABCDEF", &reversed).text, "ABCXYDEF");
    }

    #[test]
    fn test_many_chunks_concatenate() {
        let mut ops: Vec<EditOperation> = (0..5)
            .map(|i| EditOperation::insert_after(2, i.to_string()).as_chunk(i))
            .collect();
        ops.reverse();
        assert_eq!(resolve("ab|cd", &ops).text, "ab01234|cd");
    }

    #[test]
    fn test_hash_mismatch_skips_only_that_operation() {
        let ops = [
            EditOperation::replace(0, 3, "baz").with_pre_hash(content_hash("xyz")),
            EditOperation::replace(4, 7, "qux").with_pre_hash(content_hash("bar")),
        ];
        let res = resolve("foo bar", &ops);
        assert_eq!(res.text, "foo qux");
        assert_eq!(res.applied, vec![1]);
        assert_eq!(res.conflicts.len(), 1);
        assert_eq!(res.conflicts[0].index, 0);
        assert!(matches!(
            res.conflicts[0].reason,
            ConflictReason::HashMismatch { .. }
        ));
    }

    #[test]
    fn test_conflict_alone_is_noop() {
        let op = EditOperation::replace(0, 3, "baz").with_pre_hash(content_hash("xyz"));
        let res = resolve("foo bar", &[op]);
        assert_eq!(res.text, "foo bar");
        assert!(res.is_noop());
        assert_eq!(res.conflicts.len(), 1);
    }

    #[test]
    fn test_pre_hash_ignored_for_point_operations() {
        let op = EditOperation::insert_after(3, "!").with_pre_hash("00000000");
        let res = resolve("foo", &[op]);
        assert_eq!(res.text, "foo!");
        assert!(res.conflicts.is_empty());
    }

    #[test]
    fn test_out_of_range_offsets_are_clamped() {
        let res = resolve("abc", &[EditOperation::replace(10, 20, "!")]);
        assert_eq!(res.text, "abc!");

        let res = resolve("abcdef", &[EditOperation::delete(2, 100)]);
        assert_eq!(res.text, "ab");
    }

    #[test]
    fn test_identical_result_is_noop() {
        let res = resolve("same", &[EditOperation::replace(0, 4, "same")]);
        assert!(res.is_noop());
        assert_eq!(res.applied, vec![0]);
    }

    #[test]
    fn test_order_independent() {
        let ops = vec![
            EditOperation::replace(0, 1, "A"),
            EditOperation::insert_after(3, "-"),
            EditOperation::delete(5, 6),
            EditOperation::replace(3, 4, "D"),
            EditOperation::insert_after(3, "+").as_chunk(0),
        ];
        let expected = resolve("abcdefg", &ops).text;

        let mut rotated = ops.clone();
        for _ in 0..ops.len() {
            rotated.rotate_left(1);
            assert_eq!(resolve("abcdefg", &rotated).text, expected);
        }
        let mut reversed = ops;
        reversed.reverse();
        assert_eq!(resolve("abcdefg", &reversed).text, expected);
    }

    #[test]
    fn test_application_order_is_descending_start() {
        let ops = [
            EditOperation::insert_after(1, "a"),
            EditOperation::insert_after(9, "b"),
            EditOperation::insert_after(5, "c"),
        ];
        assert_eq!(application_order(&ops), vec![1, 2, 0]);
    }

    struct Refuse(&'static str);

    impl ConflictVerifier for Refuse {
        fn verify(&self, op: &EditOperation, _current: &str) -> Result<(), String> {
            if op.text == self.0 {
                Err("stale on server".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_verifier_veto_skips_operation() {
        let verifier = Refuse("bad");
        let ops = [
            EditOperation::replace(0, 1, "bad"),
            EditOperation::replace(2, 3, "ok"),
        ];
        let res = BatchResolver::new(&verifier).resolve("a b", &ops);
        assert_eq!(res.text, "a ok");
        assert_eq!(
            res.conflicts,
            vec![Conflict {
                index: 0,
                reason: ConflictReason::Verifier("stale on server".to_string()),
            }]
        );
    }
}
