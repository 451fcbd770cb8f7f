//! Variant patches: a language variant stored as JSON-pointer operations on the base page.
//!
//! `apply(base, &diff(base, variant)) == variant` for any two JSON values.
//! Array shrinkage is emitted as removes from the highest index down, so
//! every pointer is valid at the moment its operation runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::render::node::{Declaration, PrimarySection, RenderNode, VariantOverride, VariantTrait};
use crate::semantic::SymbolContent;

/// One patch operation, addressed by an RFC 6901 pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Insert a value at an object key or array index.
    Add {
        /// Where to insert.
        path: String,
        /// Inserted value.
        value: Value,
    },
    /// Delete the value at a pointer.
    Remove {
        /// What to delete.
        path: String,
    },
    /// Overwrite the value at a pointer.
    Replace {
        /// What to overwrite.
        path: String,
        /// New value.
        value: Value,
    },
}

/// Operations that turn `base` into `variant`, in application order.
pub fn diff(base: &Value, variant: &Value) -> Vec<PatchOperation> {
    let mut operations = Vec::new();
    diff_into("", base, variant, &mut operations);
    return operations;
}

/// Append the operations for one subtree.
fn diff_into(path: &str, base: &Value, variant: &Value, operations: &mut Vec<PatchOperation>) {
    if base == variant {
        return;
    }
    match (base, variant) {
        (Value::Object(base), Value::Object(variant)) => diff_objects(path, base, variant, operations),
        (Value::Array(base), Value::Array(variant)) => diff_arrays(path, base, variant, operations),
        _ => operations.push(PatchOperation::Replace {
            path: path.to_string(),
            value: variant.clone(),
        }),
    }
}

/// Key-wise object diff: removed keys, changed keys, then added keys.
fn diff_objects(
    path: &str,
    base: &Map<String, Value>,
    variant: &Map<String, Value>,
    operations: &mut Vec<PatchOperation>,
) {
    for key in base.keys().filter(|k| return !variant.contains_key(*k)) {
        operations.push(PatchOperation::Remove { path: child_pointer(path, key) });
    }
    for (key, base_value) in base {
        if let Some(variant_value) = variant.get(key) {
            diff_into(&child_pointer(path, key), base_value, variant_value, operations);
        }
    }
    for (key, value) in variant.iter().filter(|(k, _)| return !base.contains_key(*k)) {
        operations.push(PatchOperation::Add {
            path: child_pointer(path, key),
            value: value.clone(),
        });
    }
}

/// Index-wise array diff over the common prefix, then appends or tail removes.
fn diff_arrays(path: &str, base: &[Value], variant: &[Value], operations: &mut Vec<PatchOperation>) {
    for (index, (base_item, variant_item)) in base.iter().zip(variant).enumerate() {
        diff_into(&child_pointer(path, &index.to_string()), base_item, variant_item, operations);
    }
    for (index, value) in variant.iter().enumerate().skip(base.len()) {
        operations.push(PatchOperation::Add {
            path: child_pointer(path, &index.to_string()),
            value: value.clone(),
        });
    }
    for index in (variant.len()..base.len()).rev() {
        operations.push(PatchOperation::Remove { path: child_pointer(path, &index.to_string()) });
    }
}

/// `path` extended by one escaped token.
fn child_pointer(path: &str, token: &str) -> String {
    return format!("{path}/{}", token.replace('~', "~0").replace('/', "~1"));
}

/// Apply operations to a copy of `base`.
///
/// # Errors
///
/// Returns `Error::PatchFailed` if a pointer names nothing, or an index is out of range.
pub fn apply(base: &Value, patch: &[PatchOperation]) -> Result<Value, Error> {
    let mut document = base.clone();
    for operation in patch {
        apply_one(&mut document, operation)?;
    }
    return Ok(document);
}

/// Apply a single operation in place.
///
/// # Errors
///
/// Returns `Error::PatchFailed` if the operation cannot be applied.
fn apply_one(document: &mut Value, operation: &PatchOperation) -> Result<(), Error> {
    match operation {
        PatchOperation::Replace { path, value } => {
            let Some(target) = document.pointer_mut(path) else {
                return Err(patch_failed(path, "nothing to replace"));
            };
            *target = value.clone();
        },
        PatchOperation::Remove { path } => {
            let (parent, token) = split_pointer(path)?;
            match parent_of(document, path, parent)? {
                Value::Object(map) => {
                    if map.remove(&token).is_none() {
                        return Err(patch_failed(path, "no such key"));
                    }
                },
                Value::Array(items) => {
                    let index = array_index(path, &token, items.len())?;
                    if index == items.len() {
                        return Err(patch_failed(path, "index out of range"));
                    }
                    items.remove(index);
                },
                _ => return Err(patch_failed(path, "parent is not a container")),
            }
        },
        PatchOperation::Add { path, value } => {
            let (parent, token) = split_pointer(path)?;
            match parent_of(document, path, parent)? {
                Value::Object(map) => {
                    map.insert(token, value.clone());
                },
                Value::Array(items) if token == "-" => items.push(value.clone()),
                Value::Array(items) => {
                    let index = array_index(path, &token, items.len())?;
                    items.insert(index, value.clone());
                },
                _ => return Err(patch_failed(path, "parent is not a container")),
            }
        },
    }
    return Ok(());
}

/// The container a pointer's last token addresses.
///
/// # Errors
///
/// Returns `Error::PatchFailed` if the parent pointer names nothing.
fn parent_of<'v>(document: &'v mut Value, path: &str, parent: &str) -> Result<&'v mut Value, Error> {
    return document
        .pointer_mut(parent)
        .ok_or_else(|| return patch_failed(path, "parent does not exist"));
}

/// Split a pointer into its parent pointer and unescaped last token.
///
/// # Errors
///
/// Returns `Error::PatchFailed` for the root pointer, which has no parent.
fn split_pointer(path: &str) -> Result<(&str, String), Error> {
    let Some((parent, token)) = path.rsplit_once('/') else {
        return Err(patch_failed(path, "pointer has no parent"));
    };
    return Ok((parent, token.replace("~1", "/").replace("~0", "~")));
}

/// Parse an array index no greater than `max`.
///
/// # Errors
///
/// Returns `Error::PatchFailed` if the token is not an index in range.
fn array_index(path: &str, token: &str, max: usize) -> Result<usize, Error> {
    return match token.parse::<usize>() {
        Ok(index) if index <= max => Ok(index),
        Ok(_) => Err(patch_failed(path, "index out of range")),
        Err(_) => Err(patch_failed(path, "not an array index")),
    };
}

/// Build a patch error.
fn patch_failed(pointer: &str, reason: &str) -> Error {
    return Error::PatchFailed {
        pointer: pointer.to_string(),
        reason: reason.to_string(),
    };
}

/// Patch turning one render node into another.
///
/// # Errors
///
/// Returns `Error::Json` if either node fails to serialize.
pub fn diff_nodes(base: &RenderNode, variant: &RenderNode) -> Result<Vec<PatchOperation>, Error> {
    return Ok(diff(&serde_json::to_value(base)?, &serde_json::to_value(variant)?));
}

/// Apply a patch to a render node.
///
/// # Errors
///
/// Returns `Error::PatchFailed` if the patch does not apply, or `Error::Json`
/// if the result is not a render node.
pub fn apply_to_node(base: &RenderNode, patch: &[PatchOperation]) -> Result<RenderNode, Error> {
    let patched = apply(&serde_json::to_value(base)?, patch)?;
    return Ok(serde_json::from_value(patched)?);
}

/// One override per language variant of a symbol.
///
/// Each variant page is the base page with the variant's title, declaration
/// and interface language; only the difference is kept.
///
/// # Errors
///
/// Returns `Error::Json` if a node fails to serialize.
pub fn language_overrides(base: &RenderNode, symbol: &SymbolContent) -> Result<Vec<VariantOverride>, Error> {
    let mut overrides = Vec::new();
    for variant in &symbol.variants {
        let mut page = base.clone();
        page.identifier.interface_language = variant.interface_language.clone();
        page.metadata.title = variant.title.clone();
        for section in &mut page.primary_content_sections {
            if let PrimarySection::Declarations { declarations } = section {
                *declarations = vec![Declaration {
                    languages: vec![variant.interface_language.clone()],
                    text: variant.declaration.clone(),
                }];
            }
        }
        overrides.push(VariantOverride {
            patch: diff_nodes(base, &page)?,
            traits: vec![VariantTrait { interface_language: variant.interface_language.clone() }],
        });
    }
    return Ok(overrides);
}
