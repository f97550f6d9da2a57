// Re-exports from patchpad-mod-history.
pub use patchpad_mod_history::{HistoryConfig, UndoBuffer, UndoSnapshot};
