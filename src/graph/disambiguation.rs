//! Overload disambiguation: canonical path components for siblings that share a name.

use std::collections::HashMap;

use crate::hasher::disambiguation_hash;

/// What distinguishes one symbol from same-named siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Disambiguation {
    /// Short stable hash of the precise identifier.
    pub hash: String,
    /// Kind identifier without language prefix, e.g. `method`.
    pub kind: String,
}

impl Disambiguation {
    /// Disambiguation data for a symbol.
    pub fn for_symbol(precise: &str, kind: &str) -> Self {
        return Self {
            hash: disambiguation_hash(precise),
            kind: kind.to_string(),
        };
    }

    /// Whether a link suffix selects this symbol.
    ///
    /// Accepts the hash, the kind, a language-prefixed kind (`swift.method`),
    /// and either kind form followed by `-hash`.
    pub fn matches(&self, suffix: &str) -> bool {
        if suffix == self.hash || self.matches_kind(suffix) {
            return true;
        }
        return match suffix.rsplit_once('-') {
            Some((kind, hash)) => hash == self.hash && self.matches_kind(kind),
            None => false,
        };
    }

    /// Whether `text` names this kind, with or without a language prefix.
    fn matches_kind(&self, text: &str) -> bool {
        if text == self.kind {
            return true;
        }
        return text
            .split_once('.')
            .is_some_and(|(_, kind)| return kind == self.kind);
    }
}

/// Canonical path components for a group of siblings sharing `name`.
///
/// A lone symbol keeps its plain name. In a group, a member whose kind is
/// unique in the group is suffixed with the kind, otherwise with its hash.
/// The result is in the same order as `members`.
pub fn canonical_components(name: &str, members: &[&Disambiguation]) -> Vec<String> {
    if members.len() <= 1 {
        return members.iter().map(|_| return name.to_string()).collect();
    }

    let mut kind_counts: HashMap<&str, usize> = HashMap::new();
    for member in members {
        let count = kind_counts.entry(member.kind.as_str()).or_insert(0);
        *count = count.saturating_add(1);
    }

    return members
        .iter()
        .map(|member| {
            let unique_kind = kind_counts.get(member.kind.as_str()).copied() == Some(1);
            let suffix = if unique_kind { &member.kind } else { &member.hash };
            return format!("{name}-{suffix}");
        })
        .collect();
}
