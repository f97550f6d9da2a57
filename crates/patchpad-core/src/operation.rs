//! Edit operation model and inbound wire shapes.
//!
//! [`EditOperation`] is the validated form every other component works with.
//! Inbound proposals arrive as loosely typed JSON and pass through
//! [`RawOperation`] first, so a single malformed element can be refused
//! without discarding its siblings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OperationError;

/// Kind of text mutation an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OpType {
    ReplaceRange,
    DeleteRange,
    InsertAfter,
    InsertAfterHeading,
}

impl OpType {
    /// Parses the wire name of an operation type.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ReplaceRange" => Some(Self::ReplaceRange),
            "DeleteRange" => Some(Self::DeleteRange),
            "InsertAfter" => Some(Self::InsertAfter),
            "InsertAfterHeading" => Some(Self::InsertAfterHeading),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReplaceRange => "ReplaceRange",
            Self::DeleteRange => "DeleteRange",
            Self::InsertAfter => "InsertAfter",
            Self::InsertAfterHeading => "InsertAfterHeading",
        }
    }

    /// Whether this type inserts at a point rather than targeting a range.
    pub fn is_insertion(self) -> bool {
        matches!(self, Self::InsertAfter | Self::InsertAfterHeading)
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single proposed text mutation.
///
/// Offsets are char indices, `end` exclusive. They are validated for shape
/// (`start <= end`) but not against any document; the resolver clamps them
/// at application time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOperation {
    pub op_type: OpType,
    pub start: usize,
    pub end: usize,
    /// Replacement or insertion payload. Ignored for `DeleteRange`.
    #[serde(default)]
    pub text: String,
    /// Hash of `[start, end)` as the author last saw it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
    #[serde(default)]
    pub is_text_chunk: bool,
}

impl EditOperation {
    fn new(op_type: OpType, start: usize, end: usize, text: String) -> Self {
        Self {
            op_type,
            start,
            end,
            text,
            pre_hash: None,
            chunk_index: None,
            is_text_chunk: false,
        }
    }

    /// Replaces `[start, end)` with `text`.
    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self::new(OpType::ReplaceRange, start, end, text.into())
    }

    /// Removes `[start, end)`.
    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(OpType::DeleteRange, start, end, String::new())
    }

    /// Inserts `text` at `pos`.
    pub fn insert_after(pos: usize, text: impl Into<String>) -> Self {
        Self::new(OpType::InsertAfter, pos, pos, text.into())
    }

    /// Inserts `text` at `pos`, where `pos` is the end of a heading line.
    pub fn insert_after_heading(pos: usize, text: impl Into<String>) -> Self {
        Self::new(OpType::InsertAfterHeading, pos, pos, text.into())
    }

    pub fn with_pre_hash(mut self, hash: impl Into<String>) -> Self {
        self.pre_hash = Some(hash.into());
        self
    }

    /// Marks this operation as fragment `index` of a chunked insertion.
    pub fn as_chunk(mut self, index: u32) -> Self {
        self.chunk_index = Some(index);
        self.is_text_chunk = true;
        self
    }

    /// The text spliced in when this operation applies.
    pub fn payload(&self) -> &str {
        match self.op_type {
            OpType::DeleteRange => "",
            _ => &self.text,
        }
    }

    /// Chunk position, only when the operation is flagged as a text chunk.
    pub fn chunk_order(&self) -> Option<u32> {
        if self.is_text_chunk {
            self.chunk_index
        } else {
            None
        }
    }

    /// Shape check shared by every intake path.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvertedRange`] when `start > end`.
    pub fn validate(&self) -> Result<(), OperationError> {
        if self.start > self.end {
            return Err(OperationError::InvertedRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Whether the operation targets an empty range.
    pub fn is_point(&self) -> bool {
        self.start == self.end
    }

    /// The operation's range clamped into a document of `len` chars.
    pub fn clamped_range(&self, len: usize) -> (usize, usize) {
        let start = self.start.min(len);
        (start, self.end.clamp(start, len))
    }
}

/// Loosely typed inbound operation, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperation {
    pub op_type: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub text: Option<String>,
    pub pre_hash: Option<String>,
    pub chunk_index: Option<u32>,
    pub is_text_chunk: Option<bool>,
}

fn offset(field: &'static str, value: Option<i64>) -> Result<Option<usize>, OperationError> {
    match value {
        None => Ok(None),
        Some(v) => usize::try_from(v)
            .map(Some)
            .map_err(|_| OperationError::NegativeOffset { field, value: v }),
    }
}

impl TryFrom<RawOperation> for EditOperation {
    type Error = OperationError;

    fn try_from(raw: RawOperation) -> Result<Self, Self::Error> {
        let name = raw.op_type.ok_or(OperationError::MissingField("opType"))?;
        let op_type = OpType::parse(&name).ok_or(OperationError::UnknownType(name))?;

        let start = offset("start", raw.start)?.ok_or(OperationError::MissingField("start"))?;
        let end = match offset("end", raw.end)? {
            Some(end) => end,
            None if op_type.is_insertion() => start,
            None => return Err(OperationError::MissingField("end")),
        };
        let text = match (op_type, raw.text) {
            (OpType::DeleteRange, _) => String::new(),
            (_, Some(text)) => text,
            (_, None) => return Err(OperationError::MissingField("text")),
        };

        let op = Self {
            op_type,
            start,
            end,
            text,
            pre_hash: raw.pre_hash,
            chunk_index: raw.chunk_index,
            is_text_chunk: raw.is_text_chunk.unwrap_or(false),
        };
        op.validate()?;
        Ok(op)
    }
}

/// An operation refused during intake, by its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOperation {
    pub index: usize,
    pub error: OperationError,
}

/// Inbound proposal message: `{ "operations": [...] }`.
///
/// Elements stay as raw JSON until [`ProposalBatch::decode`] so that each
/// one is validated on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalBatch {
    #[serde(default)]
    pub operations: Vec<serde_json::Value>,
}

impl ProposalBatch {
    /// Parses a proposal message.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builds a message from already-typed operations.
    pub fn from_operations(ops: &[EditOperation]) -> Result<Self, serde_json::Error> {
        let operations = ops
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { operations })
    }

    /// Validates every element, splitting them into usable operations and
    /// rejections. Order of the accepted operations follows the message.
    pub fn decode(&self) -> (Vec<EditOperation>, Vec<RejectedOperation>) {
        let mut ops = Vec::with_capacity(self.operations.len());
        let mut rejected = Vec::new();

        for (index, value) in self.operations.iter().enumerate() {
            let parsed = serde_json::from_value::<RawOperation>(value.clone())
                .map_err(|e| OperationError::Malformed(e.to_string()))
                .and_then(EditOperation::try_from);
            match parsed {
                Ok(op) => ops.push(op),
                Err(error) => {
                    tracing::warn!("Rejected operation #{index}: {error}");
                    rejected.push(RejectedOperation { index, error });
                }
            }
        }
        (ops, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> Result<EditOperation, OperationError> {
        let raw: RawOperation = serde_json::from_value(value).expect("raw shape");
        EditOperation::try_from(raw)
    }

    #[test]
    fn test_constructors() {
        let op = EditOperation::replace(6, 11, "Codex");
        assert_eq!(op.op_type, OpType::ReplaceRange);
        assert_eq!((op.start, op.end), (6, 11));

        let op = EditOperation::insert_after(3, "X").as_chunk(2);
        assert!(op.is_point());
        assert_eq!(op.chunk_order(), Some(2));

        let op = EditOperation::delete(0, 5);
        assert_eq!(op.payload(), "");
    }

    #[test]
    fn test_inverted_constructor_fails_validation() {
        let op = EditOperation::replace(5, 2, "x");
        assert_eq!((op.start, op.end), (5, 2));
        assert_eq!(
            op.validate(),
            Err(OperationError::InvertedRange { start: 5, end: 2 })
        );
        assert_eq!(EditOperation::delete(2, 5).validate(), Ok(()));
    }

    #[test]
    fn test_chunk_index_ignored_without_flag() {
        let mut op = EditOperation::insert_after(0, "a");
        op.chunk_index = Some(4);
        assert_eq!(op.chunk_order(), None);
    }

    #[test]
    fn test_clamped_range() {
        let op = EditOperation::replace(4, 50, "x");
        assert_eq!(op.clamped_range(10), (4, 10));
        assert_eq!(op.clamped_range(2), (2, 2));
    }

    #[test]
    fn test_op_type_parse_round_trip() {
        for ty in [
            OpType::ReplaceRange,
            OpType::DeleteRange,
            OpType::InsertAfter,
            OpType::InsertAfterHeading,
        ] {
            assert_eq!(OpType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(OpType::parse("Rewrite"), None);
    }

    #[test]
    fn test_valid_raw_operation() {
        let op = raw(json!({
            "opType": "ReplaceRange", "start": 0, "end": 3, "text": "baz", "preHash": "abc"
        }))
        .expect("valid");
        assert_eq!(op.text, "baz");
        assert_eq!(op.pre_hash.as_deref(), Some("abc"));
        assert!(!op.is_text_chunk);
    }

    #[test]
    fn test_insertion_end_defaults_to_start() {
        let op = raw(json!({"opType": "InsertAfter", "start": 3, "text": "X",
                            "chunkIndex": 1, "isTextChunk": true}))
        .expect("valid");
        assert_eq!((op.start, op.end), (3, 3));
        assert_eq!(op.chunk_order(), Some(1));
    }

    #[test]
    fn test_delete_ignores_text() {
        let op = raw(json!({"opType": "DeleteRange", "start": 0, "end": 5, "text": "zzz"}))
            .expect("valid");
        assert!(op.text.is_empty());
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert_eq!(
            raw(json!({"start": 0, "end": 1, "text": ""})),
            Err(OperationError::MissingField("opType"))
        );
        assert_eq!(
            raw(json!({"opType": "ReplaceRange", "end": 1, "text": ""})),
            Err(OperationError::MissingField("start"))
        );
        assert_eq!(
            raw(json!({"opType": "ReplaceRange", "start": 0, "text": ""})),
            Err(OperationError::MissingField("end"))
        );
        assert_eq!(
            raw(json!({"opType": "ReplaceRange", "start": 0, "end": 1})),
            Err(OperationError::MissingField("text"))
        );
    }

    #[test]
    fn test_bad_shapes_rejected() {
        assert_eq!(
            raw(json!({"opType": "Frobnicate", "start": 0, "end": 0, "text": ""})),
            Err(OperationError::UnknownType("Frobnicate".to_string()))
        );
        assert_eq!(
            raw(json!({"opType": "DeleteRange", "start": -1, "end": 2})),
            Err(OperationError::NegativeOffset {
                field: "start",
                value: -1
            })
        );
        assert_eq!(
            raw(json!({"opType": "DeleteRange", "start": 5, "end": 2})),
            Err(OperationError::InvertedRange { start: 5, end: 2 })
        );
    }

    #[test]
    fn test_decode_keeps_good_operations() {
        let batch = ProposalBatch::from_json(
            r#"{"operations": [
                {"opType": "InsertAfter", "start": 0, "text": "a"},
                {"opType": "ReplaceRange", "start": "zero", "end": 1, "text": "b"},
                "not an object",
                {"opType": "DeleteRange", "start": 1, "end": 2}
            ]}"#,
        )
        .expect("message parses");

        let (ops, rejected) = batch.decode();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].op_type, OpType::DeleteRange);
        let indices: Vec<usize> = rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(matches!(rejected[0].error, OperationError::Malformed(_)));
    }

    #[test]
    fn test_from_operations_decodes_back() {
        let ops = vec![
            EditOperation::replace(0, 3, "baz").with_pre_hash("deadbeef"),
            EditOperation::insert_after(3, "Y").as_chunk(1),
        ];
        let batch = ProposalBatch::from_operations(&ops).expect("serialize");
        assert_eq!(batch.operations[0]["opType"], "ReplaceRange");
        assert_eq!(batch.operations[1]["isTextChunk"], true);

        let (decoded, rejected) = batch.decode();
        assert!(rejected.is_empty());
        assert_eq!(decoded, ops);
    }
}
