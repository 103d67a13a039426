//! Structural diff engine
//!
//! Computes and replays deltas between two JSON values. The same engine serves
//! both source representations: raw text is diffed as an array of lines, parsed
//! sources are diffed as trees.
//!
//! - Objects: per-key changes plus removed keys
//! - Arrays: an edit script (`keep`, `remove`, `insert`, `patch`) computed from
//!   the longest common subsequence, with changed composite elements patched in
//!   place rather than replaced
//! - Anything else: whole-value replacement
//!
//! Deltas serialize to plain JSON so resolved variants stay JSON-serializable.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// LCS tables above this many cells fall back to replacing the changed run.
const MAX_LCS_CELLS: usize = 4_000_000;

/// A replayable structural diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Delta {
    /// Both sides are equal
    Unchanged,
    /// Replace the whole value
    Replace {
        /// New value
        value: Value,
    },
    /// Edit an object key by key
    Object {
        /// Added or changed keys
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        changes: IndexMap<String, Delta>,
        /// Keys to drop
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        removed: Vec<String>,
    },
    /// Edit an array with an edit script
    Array {
        /// Edits applied left to right against the base array
        edits: Vec<ArrayEdit>,
    },
}

impl Delta {
    /// Returns true when replaying this delta is the identity.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        match self {
            Self::Unchanged => true,
            Self::Replace { .. } => false,
            Self::Object { changes, removed } => changes.is_empty() && removed.is_empty(),
            Self::Array { edits } => edits.iter().all(|edit| matches!(edit, ArrayEdit::Keep { .. })),
        }
    }
}

/// One step of an array edit script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ArrayEdit {
    /// Copy `count` base elements
    Keep {
        /// Number of elements
        count: usize,
    },
    /// Skip `count` base elements
    Remove {
        /// Number of elements
        count: usize,
    },
    /// Emit new elements
    Insert {
        /// Elements to emit
        values: Vec<Value>,
    },
    /// Emit the next base element with a nested delta applied
    Patch {
        /// Delta for that element
        delta: Box<Delta>,
    },
}

/// Replaying a delta against a base it was not computed from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    /// Delta expects a different kind of value
    #[error("expected {expected} at {path}")]
    ShapeMismatch {
        /// Expected JSON kind
        expected: &'static str,
        /// Location in the base value
        path: String,
    },
    /// Edit script and base array lengths disagree
    #[error("edit script does not match array length at {path}")]
    LengthMismatch {
        /// Location in the base value
        path: String,
    },
    /// Object change targets a key the base does not have
    #[error("missing key '{key}' at {path}")]
    MissingKey {
        /// Missing key
        key: String,
        /// Location in the base value
        path: String,
    },
}

/// Compute the delta that turns `old` into `new`.
#[must_use]
pub fn diff(old: &Value, new: &Value) -> Delta {
    if old == new {
        return Delta::Unchanged;
    }
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let removed =
                old_map.keys().filter(|key| !new_map.contains_key(*key)).cloned().collect();
            let mut changes = IndexMap::new();
            for (key, new_value) in new_map {
                match old_map.get(key) {
                    Some(old_value) if old_value == new_value => {}
                    Some(old_value) => {
                        changes.insert(key.clone(), diff(old_value, new_value));
                    }
                    None => {
                        changes.insert(
                            key.clone(),
                            Delta::Replace {
                                value: new_value.clone(),
                            },
                        );
                    }
                }
            }
            Delta::Object { changes, removed }
        }
        (Value::Array(old_items), Value::Array(new_items)) => Delta::Array {
            edits: diff_arrays(old_items, new_items),
        },
        _ => Delta::Replace {
            value: new.clone(),
        },
    }
}

/// Replay `delta` against `base`, producing the value it was computed from.
///
/// # Errors
///
/// Returns a [`DeltaError`] when `base` does not have the shape the delta
/// expects.
pub fn patch(base: &Value, delta: &Delta) -> Result<Value, DeltaError> {
    patch_at(base, delta, "$")
}

fn patch_at(base: &Value, delta: &Delta, path: &str) -> Result<Value, DeltaError> {
    match delta {
        Delta::Unchanged => Ok(base.clone()),
        Delta::Replace { value } => Ok(value.clone()),
        Delta::Object { changes, removed } => {
            let Value::Object(map) = base else {
                return Err(DeltaError::ShapeMismatch {
                    expected: "object",
                    path: path.to_string(),
                });
            };
            let mut map = map.clone();
            for key in removed {
                map.remove(key);
            }
            for (key, change) in changes {
                let child_path = format!("{path}.{key}");
                let value = match (map.get(key), change) {
                    (Some(current), _) => patch_at(current, change, &child_path)?,
                    (None, Delta::Replace { value }) => value.clone(),
                    (None, _) => {
                        return Err(DeltaError::MissingKey {
                            key: key.clone(),
                            path: path.to_string(),
                        });
                    }
                };
                map.insert(key.clone(), value);
            }
            Ok(Value::Object(map))
        }
        Delta::Array { edits } => {
            let Value::Array(items) = base else {
                return Err(DeltaError::ShapeMismatch {
                    expected: "array",
                    path: path.to_string(),
                });
            };
            let length_mismatch = || DeltaError::LengthMismatch {
                path: path.to_string(),
            };
            let mut output = Vec::with_capacity(items.len());
            let mut cursor = 0;
            for edit in edits {
                match edit {
                    ArrayEdit::Keep { count } => {
                        let end = cursor + count;
                        output.extend_from_slice(items.get(cursor..end).ok_or_else(length_mismatch)?);
                        cursor = end;
                    }
                    ArrayEdit::Remove { count } => {
                        cursor += count;
                        if cursor > items.len() {
                            return Err(length_mismatch());
                        }
                    }
                    ArrayEdit::Insert { values } => output.extend(values.iter().cloned()),
                    ArrayEdit::Patch { delta } => {
                        let item = items.get(cursor).ok_or_else(length_mismatch)?;
                        output.push(patch_at(item, delta, &format!("{path}[{cursor}]"))?);
                        cursor += 1;
                    }
                }
            }
            if cursor != items.len() {
                return Err(length_mismatch());
            }
            Ok(Value::Array(output))
        }
    }
}

/// Split text into the line array used for text deltas.
#[must_use]
pub fn lines_to_value(text: &str) -> Value {
    Value::Array(text.split('\n').map(|line| Value::String(line.to_string())).collect())
}

/// Join a line array back into text. Returns `None` unless every element is a string.
#[must_use]
pub fn value_to_lines(value: &Value) -> Option<String> {
    let items = value.as_array()?;
    let lines = items.iter().map(Value::as_str).collect::<Option<Vec<_>>>()?;
    Some(lines.join("\n"))
}

#[derive(Clone, Copy)]
enum Step {
    Keep,
    Remove(usize),
    Insert(usize),
}

fn diff_arrays(old: &[Value], new: &[Value]) -> Vec<ArrayEdit> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut edits = Vec::new();
    push_edit(&mut edits, ArrayEdit::Keep { count: prefix });
    for edit in diff_middle(old_mid, new_mid) {
        push_edit(&mut edits, edit);
    }
    push_edit(&mut edits, ArrayEdit::Keep { count: suffix });
    edits
}

fn diff_middle(old: &[Value], new: &[Value]) -> Vec<ArrayEdit> {
    let steps = if old.len().saturating_mul(new.len()) > MAX_LCS_CELLS {
        (0..old.len()).map(Step::Remove).chain((0..new.len()).map(Step::Insert)).collect()
    } else {
        lcs_steps(old, new)
    };

    let mut edits = Vec::new();
    let mut removes = Vec::new();
    let mut inserts = Vec::new();
    for step in steps {
        match step {
            Step::Keep => {
                flush_run(&mut edits, old, new, &mut removes, &mut inserts);
                push_edit(&mut edits, ArrayEdit::Keep { count: 1 });
            }
            Step::Remove(index) => removes.push(index),
            Step::Insert(index) => inserts.push(index),
        }
    }
    flush_run(&mut edits, old, new, &mut removes, &mut inserts);
    edits
}

/// Forward walk of an LCS table built from the end of both slices.
fn lcs_steps(old: &[Value], new: &[Value]) -> Vec<Step> {
    let width = new.len() + 1;
    let mut table = vec![0u32; (old.len() + 1) * width];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            table[i * width + j] = if old[i] == new[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut steps = Vec::with_capacity(old.len() + new.len());
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            steps.push(Step::Keep);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            steps.push(Step::Remove(i));
            i += 1;
        } else {
            steps.push(Step::Insert(j));
            j += 1;
        }
    }
    steps.extend((i..old.len()).map(Step::Remove));
    steps.extend((j..new.len()).map(Step::Insert));
    steps
}

/// Emit one run of removals and insertions between two kept elements.
///
/// Removed and inserted composites are paired up in order and patched in place;
/// runs without composite pairs stay a plain remove + insert.
fn flush_run(
    edits: &mut Vec<ArrayEdit>,
    old: &[Value],
    new: &[Value],
    removes: &mut Vec<usize>,
    inserts: &mut Vec<usize>,
) {
    let paired = removes.len().min(inserts.len());
    let has_composite_pair = removes
        .iter()
        .zip(inserts.iter())
        .any(|(&r, &i)| is_same_composite(&old[r], &new[i]));

    if has_composite_pair {
        for (&r, &i) in removes.iter().zip(inserts.iter()) {
            if is_same_composite(&old[r], &new[i]) {
                push_edit(
                    edits,
                    ArrayEdit::Patch {
                        delta: Box::new(diff(&old[r], &new[i])),
                    },
                );
            } else {
                push_edit(edits, ArrayEdit::Remove { count: 1 });
                push_edit(
                    edits,
                    ArrayEdit::Insert {
                        values: vec![new[i].clone()],
                    },
                );
            }
        }
        push_edit(
            edits,
            ArrayEdit::Remove {
                count: removes.len() - paired,
            },
        );
        push_edit(
            edits,
            ArrayEdit::Insert {
                values: inserts[paired..].iter().map(|&i| new[i].clone()).collect(),
            },
        );
    } else {
        push_edit(
            edits,
            ArrayEdit::Remove {
                count: removes.len(),
            },
        );
        push_edit(
            edits,
            ArrayEdit::Insert {
                values: inserts.iter().map(|&i| new[i].clone()).collect(),
            },
        );
    }

    removes.clear();
    inserts.clear();
}

fn is_same_composite(a: &Value, b: &Value) -> bool {
    matches!((a, b), (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)))
}

/// Append an edit, merging it into the previous one when both are the same kind.
fn push_edit(edits: &mut Vec<ArrayEdit>, edit: ArrayEdit) {
    match &edit {
        ArrayEdit::Keep { count: 0 } | ArrayEdit::Remove { count: 0 } => return,
        ArrayEdit::Insert { values } if values.is_empty() => return,
        _ => {}
    }

    if let Some(last) = edits.last_mut() {
        match (last, &edit) {
            (ArrayEdit::Keep { count }, ArrayEdit::Keep { count: more })
            | (ArrayEdit::Remove { count }, ArrayEdit::Remove { count: more }) => {
                *count += more;
                return;
            }
            (ArrayEdit::Insert { values }, ArrayEdit::Insert { values: more }) => {
                values.extend_from_slice(more);
                return;
            }
            _ => {}
        }
    }
    edits.push(edit);
}
