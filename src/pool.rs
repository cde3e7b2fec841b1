//! Canonical pool: a discriminating trie over ordered key sequences.
//!
//! `lookup` returns the same node for identity-equal sequences regardless of
//! call order or repetition, and a fresh empty node the first time a sequence
//! is seen. Branches keyed by references carry guards recording the value they
//! were keyed by; under weak retention, `lookup` amortizedly sweeps branches
//! whose guard has died, so the trie stays proportional to the live working
//! set and a reused address never resurrects a stale subtree.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::signature::KeySignature;
use crate::tag::{TagInner, TypeTag};
use crate::value::Value;

/// Trie key for scalar discriminators, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ScalarKey {
    /// Null discriminator.
    Null,
    /// Boolean discriminator.
    Bool(bool),
    /// Number discriminator as normalized IEEE-754 bits.
    Number(u64),
    /// String discriminator, keyed by content.
    Str(Rc<str>),
}

impl ScalarKey {
    /// Number key with the two zeroes collapsed and a single NaN pattern, so
    /// `0.0`/`-0.0` and all NaN payloads land on one branch.
    pub(crate) fn number(number: f64) -> Self {
        let bits = if number.is_nan() {
            f64::NAN.to_bits()
        } else if number == 0.0 {
            0
        } else {
            number.to_bits()
        };
        ScalarKey::Number(bits)
    }
}

/// One step of a discriminator sequence.
pub(crate) enum Discriminator {
    /// Primitive child, keyed by value.
    Scalar(ScalarKey),
    /// Canonical composite or opaque child, keyed by reference identity.
    Ref(Rc<Value>),
    /// Type tag, keyed by tag identity.
    Tag(TypeTag),
}

impl Discriminator {
    /// Discriminator for an already-canonicalized child value. Identity
    /// comparison is safe for composites precisely because they are
    /// canonical.
    pub(crate) fn of(value: &Rc<Value>) -> Self {
        match &**value {
            Value::Null => Discriminator::Scalar(ScalarKey::Null),
            Value::Bool(flag) => Discriminator::Scalar(ScalarKey::Bool(*flag)),
            Value::Number(number) => Discriminator::Scalar(ScalarKey::number(*number)),
            Value::String(text) => Discriminator::Scalar(ScalarKey::Str(text.clone())),
            Value::Array(_) | Value::Object(_) | Value::Opaque(_) => {
                Discriminator::Ref(value.clone())
            }
        }
    }
}

/// Lazily filled slot holding at most one representative.
#[derive(Debug, Default)]
pub(crate) enum Slot {
    /// No representative installed yet.
    #[default]
    Empty,
    /// Weakly held; collectible once externally unreferenced.
    Weak(Weak<Value>),
    /// Strongly held for the engine's lifetime.
    Strong(Rc<Value>),
}

impl Slot {
    pub(crate) fn get(&self) -> Option<Rc<Value>> {
        match self {
            Slot::Empty => None,
            Slot::Weak(weak) => weak.upgrade(),
            Slot::Strong(value) => Some(value.clone()),
        }
    }

    pub(crate) fn fill(&mut self, value: &Rc<Value>, weak: bool) {
        *self = if weak {
            Slot::Weak(Rc::downgrade(value))
        } else {
            Slot::Strong(value.clone())
        };
    }

    /// Empties the slot if its weak representative has died, releasing the
    /// allocation the dead `Weak` was keeping pinned.
    fn sweep(&mut self) {
        if let Slot::Weak(weak) = self {
            if weak.strong_count() == 0 {
                *self = Slot::Empty;
            }
        }
    }
}

/// Guard keeping a reference-keyed branch honest: the branch is valid only
/// while the allocation its address names is the one recorded here.
enum EdgeGuard {
    WeakValue(Weak<Value>),
    WeakTag(Weak<TagInner>),
    StrongValue(Rc<Value>),
    StrongTag(TypeTag),
}

impl EdgeGuard {
    fn for_value(value: &Rc<Value>, weak: bool) -> Self {
        if weak {
            EdgeGuard::WeakValue(Rc::downgrade(value))
        } else {
            EdgeGuard::StrongValue(value.clone())
        }
    }

    fn for_tag(tag: &TypeTag, weak: bool) -> Self {
        if weak {
            EdgeGuard::WeakTag(tag.downgrade())
        } else {
            EdgeGuard::StrongTag(tag.clone())
        }
    }

    fn is_live(&self) -> bool {
        match self {
            EdgeGuard::WeakValue(weak) => weak.strong_count() > 0,
            EdgeGuard::WeakTag(weak) => weak.strong_count() > 0,
            EdgeGuard::StrongValue(_) | EdgeGuard::StrongTag(_) => true,
        }
    }
}

struct RefEdge {
    guard: EdgeGuard,
    node: TrieNode,
}

/// Trie node reached by an ordered discriminator sequence.
///
/// Holds its data lazily: branches and slots appear on first use. Array and
/// object representatives occupy separate slots, so an array's element
/// sequence and an object's key path can share a node without interference.
#[derive(Default)]
pub(crate) struct TrieNode {
    scalar_edges: HashMap<ScalarKey, TrieNode>,
    ref_edges: HashMap<usize, RefEdge>,
    /// Representative for the array whose element sequence reaches this node.
    pub(crate) array_rep: Slot,
    /// Representative for the object whose discriminators reach this node.
    pub(crate) object_rep: Slot,
    /// Key-signature record for the unsorted key sequence reaching this node.
    pub(crate) signature: Option<Rc<KeySignature>>,
}

impl TrieNode {
    fn descend_scalar(&mut self, key: &ScalarKey, created: &mut usize) -> &mut TrieNode {
        match self.scalar_edges.entry(key.clone()) {
            MapEntry::Occupied(occupied) => occupied.into_mut(),
            MapEntry::Vacant(vacant) => {
                *created += 1;
                vacant.insert(TrieNode::default())
            }
        }
    }

    fn descend_ref(
        &mut self,
        addr: usize,
        guard: impl FnOnce() -> EdgeGuard,
        created: &mut usize,
    ) -> &mut TrieNode {
        match self.ref_edges.entry(addr) {
            MapEntry::Occupied(mut occupied) => {
                if !occupied.get().guard.is_live() {
                    // The keyed allocation died and `addr` now names a
                    // different value; drop the stale branch.
                    *created += 1;
                    occupied.insert(RefEdge {
                        guard: guard(),
                        node: TrieNode::default(),
                    });
                }
                &mut occupied.into_mut().node
            }
            MapEntry::Vacant(vacant) => {
                *created += 1;
                &mut vacant
                    .insert(RefEdge {
                        guard: guard(),
                        node: TrieNode::default(),
                    })
                    .node
            }
        }
    }

    /// Drops dead reference branches, empties dead weak slots, and prunes
    /// scalar subtrees left with nothing to hold.
    fn sweep(&mut self) {
        self.array_rep.sweep();
        self.object_rep.sweep();
        self.ref_edges.retain(|_, edge| {
            if !edge.guard.is_live() {
                return false;
            }
            edge.node.sweep();
            true
        });
        self.scalar_edges.retain(|_, node| {
            node.sweep();
            !node.is_vacant()
        });
    }

    fn is_vacant(&self) -> bool {
        self.scalar_edges.is_empty()
            && self.ref_edges.is_empty()
            && matches!(self.array_rep, Slot::Empty)
            && matches!(self.object_rep, Slot::Empty)
            && self.signature.is_none()
    }

    fn count_nodes(&self) -> usize {
        1 + self
            .scalar_edges
            .values()
            .map(TrieNode::count_nodes)
            .sum::<usize>()
            + self
                .ref_edges
                .values()
                .map(|edge| edge.node.count_nodes())
                .sum::<usize>()
    }
}

/// Node-creation slack tolerated before the first sweep.
const SWEEP_FLOOR: usize = 8;

/// Discriminating trie shared by the admission algorithm and the
/// key-signature cache.
pub(crate) struct CanonicalPool {
    root: TrieNode,
    weak: bool,
    /// Nodes created since the last sweep.
    grown: usize,
    /// Creation count that triggers the next sweep.
    sweep_at: usize,
}

impl CanonicalPool {
    pub(crate) fn new(weak: bool) -> Self {
        Self {
            root: TrieNode::default(),
            weak,
            grown: 0,
            sweep_at: SWEEP_FLOOR,
        }
    }

    /// Walks (and lazily extends) the trie along `keys`.
    ///
    /// The empty sequence names the root, which is where the empty array's
    /// representative lives. Under weak retention, a lookup after the trie
    /// has doubled since the last sweep first drops every dead branch, so
    /// growth is bounded by the live working set.
    pub(crate) fn lookup(&mut self, keys: &[Discriminator]) -> &mut TrieNode {
        if self.weak && self.grown >= self.sweep_at {
            self.sweep();
        }
        let weak = self.weak;
        let mut created = 0;
        let mut node = &mut self.root;
        for key in keys {
            node = match key {
                Discriminator::Scalar(scalar) => node.descend_scalar(scalar, &mut created),
                Discriminator::Ref(value) => node.descend_ref(
                    Rc::as_ptr(value) as usize,
                    || EdgeGuard::for_value(value, weak),
                    &mut created,
                ),
                Discriminator::Tag(tag) => {
                    node.descend_ref(tag.addr(), || EdgeGuard::for_tag(tag, weak), &mut created)
                }
            };
        }
        self.grown += created;
        node
    }

    fn sweep(&mut self) {
        self.root.sweep();
        self.grown = 0;
        self.sweep_at = self.root.count_nodes().max(SWEEP_FLOOR);
    }

    /// Number of trie nodes allocated, including the root.
    pub(crate) fn node_count(&self) -> usize {
        self.root.count_nodes()
    }
}
