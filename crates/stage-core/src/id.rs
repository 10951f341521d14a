use lasso::{Spur, ThreadedRodeo};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for node ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned identifier for nodes in the scene graph.
/// Internally a 4-byte `Spur` index, so copies and comparisons are cheap.
///
/// The id doubles as the node's display name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a NodeId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// The id for `s` if it was ever interned. Never interns.
    pub fn lookup(s: &str) -> Option<Self> {
        INTERNER.get(s).map(NodeId)
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}

// ─── Identity registry ───────────────────────────────────────────────────

/// Document-wide id → node index.
///
/// Every live node holds exactly one entry. Collisions are never errors:
/// `allocate` keeps suffixing (`Cube`, `Cube_1`, `Cube_2`, ...) until it
/// finds a free id. The search only depends on the current id set.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    index: HashMap<NodeId, NodeIndex>,
    /// Numeric suffixes in use per stem (`Cube_3` → `"Cube"`: {3}).
    suffixes: HashMap<String, BTreeSet<u64>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is `id` currently taken?
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeIndex)> + '_ {
        self.index.iter().map(|(id, idx)| (*id, *idx))
    }

    /// Pick a free id for `base_name` without claiming it.
    ///
    /// Returns `base_name` itself when free. Otherwise strips any trailing
    /// `_<digits>` and tries `stem_1`, `stem_2`, ... upward.
    pub fn allocate(&self, base_name: &str) -> NodeId {
        let taken = NodeId::lookup(base_name).is_some_and(|id| self.contains(id));
        if !taken {
            return NodeId::intern(base_name);
        }
        let stem = strip_numeric_suffix(base_name);
        let n = self.suffixes.get(stem).map_or(1, first_free);
        NodeId::intern(&format!("{stem}_{n}"))
    }

    /// Allocate a free id from `base_name` and bind it to `idx`.
    pub fn claim(&mut self, base_name: &str, idx: NodeIndex) -> NodeId {
        let id = self.allocate(base_name);
        self.index.insert(id, idx);
        if let Some((stem, n)) = numeric_suffix(id.as_str()) {
            self.suffixes.entry(stem.to_string()).or_default().insert(n);
        }
        id
    }

    /// Drop the binding for `id`. Returns the index it pointed at.
    pub fn release(&mut self, id: NodeId) -> Option<NodeIndex> {
        let idx = self.index.remove(&id)?;
        if let Some((stem, n)) = numeric_suffix(id.as_str())
            && let Some(taken) = self.suffixes.get_mut(stem)
        {
            taken.remove(&n);
            if taken.is_empty() {
                self.suffixes.remove(stem);
            }
        }
        Some(idx)
    }

    /// Move `idx` from `old` to a free id derived from `new_name`.
    ///
    /// Renaming a node to its own current name is a no-op. Returns the id
    /// actually applied, which callers must reflect back into any UI state.
    pub fn rename(&mut self, old: NodeId, new_name: &str) -> Option<NodeId> {
        let idx = self.get(old)?;
        if old.as_str() == new_name {
            return Some(old);
        }
        self.release(old);
        let id = self.claim(new_name, idx);
        if id.as_str() != new_name {
            log::debug!("rename {old}: `{new_name}` taken, applied `{id}`");
        }
        Some(id)
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.suffixes.clear();
    }
}

/// Smallest suffix ≥ 1 not in `taken`.
fn first_free(taken: &BTreeSet<u64>) -> u64 {
    let len = taken.len() as u64;
    if taken.last() == Some(&len) {
        return len + 1;
    }
    let mut expected = 1;
    for n in taken {
        if *n != expected {
            break;
        }
        expected += 1;
    }
    expected
}

/// `Cube_12` → `("Cube", 12)`, only for the exact spelling `allocate`
/// produces (no leading zeros, no `_0`).
fn numeric_suffix(name: &str) -> Option<(&str, u64)> {
    let (stem, digits) = name.rsplit_once('_')?;
    let canonical = !digits.is_empty() && !digits.starts_with('0') && digits.bytes().all(|b| b.is_ascii_digit());
    if stem.is_empty() || !canonical {
        return None;
    }
    Some((stem, digits.parse().ok()?))
}

/// `Cube_12` → `Cube`. Names without a numeric suffix are returned as-is.
fn strip_numeric_suffix(name: &str) -> &str {
    match name.rsplit_once('_') {
        Some((stem, digits))
            if !stem.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            stem
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("Cube");
        let b = NodeId::intern("Cube");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Cube");
    }

    #[test]
    fn allocate_returns_base_when_free() {
        let reg = IdentityRegistry::new();
        assert_eq!(reg.allocate("Sphere").as_str(), "Sphere");
    }

    #[test]
    fn allocate_suffixes_on_collision() {
        let mut reg = IdentityRegistry::new();
        reg.claim("Cube", NodeIndex::new(0));
        assert_eq!(reg.claim("Cube", NodeIndex::new(1)).as_str(), "Cube_1");
        assert_eq!(reg.claim("Cube", NodeIndex::new(2)).as_str(), "Cube_2");
        // A suffixed base continues from the stem.
        assert_eq!(reg.claim("Cube_1", NodeIndex::new(3)).as_str(), "Cube_3");
    }

    #[test]
    fn allocate_is_deterministic() {
        let mut a = IdentityRegistry::new();
        let mut b = IdentityRegistry::new();
        for i in 0..4 {
            a.claim("Light", NodeIndex::new(i));
            b.claim("Light", NodeIndex::new(i));
        }
        let mut ids_a: Vec<_> = a.iter().map(|(id, _)| id.as_str().to_string()).collect();
        let mut ids_b: Vec<_> = b.iter().map(|(id, _)| id.as_str().to_string()).collect();
        ids_a.sort();
        ids_b.sort();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn rename_to_taken_name_suffixes() {
        let mut reg = IdentityRegistry::new();
        let cube = reg.claim("Cube", NodeIndex::new(0));
        let sphere = reg.claim("Sphere", NodeIndex::new(1));
        let applied = reg.rename(sphere, "Cube").unwrap();
        assert_eq!(applied.as_str(), "Cube_1");
        assert_eq!(reg.get(cube), Some(NodeIndex::new(0)));
        assert_eq!(reg.get(applied), Some(NodeIndex::new(1)));
        assert!(!reg.contains(sphere));
    }

    #[test]
    fn rename_to_self_keeps_id() {
        let mut reg = IdentityRegistry::new();
        let cube = reg.claim("Cube", NodeIndex::new(0));
        assert_eq!(reg.rename(cube, "Cube"), Some(cube));
    }

    #[test]
    fn strip_suffix_only_strips_digits() {
        assert_eq!(strip_numeric_suffix("Cube_12"), "Cube");
        assert_eq!(strip_numeric_suffix("my_cube"), "my_cube");
        assert_eq!(strip_numeric_suffix("_3"), "_3");
    }

    #[test]
    fn released_suffix_is_reused_first() {
        let mut reg = IdentityRegistry::new();
        for i in 0..200 {
            reg.claim("Tile", NodeIndex::new(i));
        }
        assert!(reg.contains(NodeId::intern("Tile_199")));
        reg.release(NodeId::intern("Tile_5"));
        reg.release(NodeId::intern("Tile_9"));
        assert_eq!(reg.claim("Tile", NodeIndex::new(500)).as_str(), "Tile_5");
        assert_eq!(reg.claim("Tile_40", NodeIndex::new(501)).as_str(), "Tile_9");
        assert_eq!(reg.claim("Tile", NodeIndex::new(502)).as_str(), "Tile_200");
    }

    #[test]
    fn padded_suffix_does_not_shadow_canonical_one() {
        let mut reg = IdentityRegistry::new();
        assert_eq!(reg.claim("Bolt_01", NodeIndex::new(0)).as_str(), "Bolt_01");
        assert_eq!(reg.claim("Bolt", NodeIndex::new(1)).as_str(), "Bolt");
        assert_eq!(reg.claim("Bolt", NodeIndex::new(2)).as_str(), "Bolt_1");
    }

    #[test]
    fn rename_frees_the_old_suffix() {
        let mut reg = IdentityRegistry::new();
        reg.claim("Lamp", NodeIndex::new(0));
        let second = reg.claim("Lamp", NodeIndex::new(1));
        assert_eq!(second.as_str(), "Lamp_1");
        reg.rename(second, "Sun");
        assert_eq!(reg.allocate("Lamp").as_str(), "Lamp_1");
    }

    #[test]
    fn lookup_never_interns() {
        assert_eq!(NodeId::lookup("never-seen-anywhere-9f3c"), None);
        assert_eq!(NodeId::lookup("never-seen-anywhere-9f3c"), None);
        let id = NodeId::intern("seen-once-9f3c");
        assert_eq!(NodeId::lookup("seen-once-9f3c"), Some(id));
    }
}
