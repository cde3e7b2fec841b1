use std::rc::Rc;

use serde::Serialize;

use crate::pool::{CanonicalPool, Discriminator, ScalarKey};
use crate::registry::IdentityRegistry;
use crate::signature::{KeySignature, SignatureCache};
use crate::value::{ObjectValue, Value};

/// Reports whether the engine can release representatives that become
/// unreferenced outside the pool.
///
/// Always true on this runtime (`std::rc::Weak` is native). An engine built
/// with [`Retention::Strong`] behaves as if this were false: it retains every
/// admitted substructure for its lifetime, and operators must bound its
/// lifetime or input diversity accordingly.
pub const fn weak_collections_available() -> bool {
    true
}

/// How the pool and registry hold canonical representatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Weak references: a representative with no remaining external
    /// references becomes collectible, along with the trie branches keyed by
    /// it.
    #[default]
    Weak,
    /// Strong references: everything admitted is pinned for the engine's
    /// lifetime.
    Strong,
}

/// Argument to [`Canonicalizer::admit`]: a value to canonicalize, or one
/// marked pre-canonical by [`pass`].
pub enum Input {
    /// Canonicalize this value.
    Value(Rc<Value>),
    /// Return this value verbatim, without recursing into it.
    Pass(Rc<Value>),
}

impl From<Rc<Value>> for Input {
    fn from(value: Rc<Value>) -> Self {
        Input::Value(value)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Value(Rc::new(value))
    }
}

/// Marks `value` as already canonical. [`Canonicalizer::admit`] unwraps it
/// verbatim, even if its contents would otherwise canonicalize differently.
pub fn pass(value: Rc<Value>) -> Input {
    Input::Pass(value)
}

/// Point-in-time counters for an engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalizerStats {
    /// Registry entries whose representative is still alive.
    pub live_representatives: usize,
    /// Trie nodes allocated in the canonical pool, including the root.
    pub pool_nodes: usize,
    /// Distinct key signatures interned.
    pub key_signatures: usize,
}

/// Canonicalization engine: maps deeply-equal trees to one shared
/// representative.
///
/// `admit` recursively canonicalizes children first, derives a discriminator
/// sequence from the canonical children (plus the type tag and key signature
/// for objects), and resolves it in the canonical pool: the first admission
/// of a shape installs its candidate, every later one returns the installed
/// representative. Representatives are shared `Rc<Value>`s and must be
/// treated as read-only.
///
/// The engine is single-threaded (`Rc`-based, deliberately `!Send`); guard
/// each top-level `admit` externally if calls originate from several
/// execution contexts. Cyclic input is unsupported and recurses without
/// bound.
pub struct Canonicalizer {
    registry: IdentityRegistry,
    pool: CanonicalPool,
    signatures: SignatureCache,
    retention: Retention,
}

impl Canonicalizer {
    /// Creates an engine with the default (weak) retention policy.
    pub fn new() -> Self {
        Self::with_retention(Retention::default())
    }

    /// Creates an engine with an explicit retention policy.
    pub fn with_retention(retention: Retention) -> Self {
        let weak = retention == Retention::Weak;
        Self {
            registry: IdentityRegistry::new(weak),
            pool: CanonicalPool::new(weak),
            signatures: SignatureCache::default(),
            retention,
        }
    }

    /// The engine's retention policy.
    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// Canonicalizes `input` and returns its shared representative.
    ///
    /// Scalars, opaque values, already-canonical values and [`pass`]-wrapped
    /// values return identity-unchanged. For any two deeply-equal composite
    /// inputs with the same type tags throughout, the returned `Rc`s are
    /// pointer-identical.
    pub fn admit(&mut self, input: impl Into<Input>) -> Rc<Value> {
        match input.into() {
            Input::Pass(value) => value,
            Input::Value(value) => self.canonical_of(&value),
        }
    }

    /// Point-in-time counters for this engine.
    pub fn stats(&self) -> CanonicalizerStats {
        CanonicalizerStats {
            live_representatives: self.registry.live_len(),
            pool_nodes: self.pool.node_count(),
            key_signatures: self.signatures.len(),
        }
    }

    fn canonical_of(&mut self, value: &Rc<Value>) -> Rc<Value> {
        match &**value {
            Value::Array(elements) => {
                if self.registry.has(value) {
                    value.clone()
                } else {
                    self.admit_array(elements)
                }
            }
            Value::Object(object) => {
                if self.registry.has(value) {
                    value.clone()
                } else {
                    self.admit_object(object)
                }
            }
            // Scalars and opaque values are already canonical.
            _ => value.clone(),
        }
    }

    fn admit_array(&mut self, elements: &[Rc<Value>]) -> Rc<Value> {
        let canonical: Vec<Rc<Value>> = elements
            .iter()
            .map(|element| self.canonical_of(element))
            .collect();
        let sequence: Vec<Discriminator> = canonical.iter().map(Discriminator::of).collect();

        let weak = self.retention == Retention::Weak;
        let node = self.pool.lookup(&sequence);
        if let Some(existing) = node.array_rep.get() {
            // Elements are canonical, so a hit must agree element for element.
            debug_assert!(matches!(&*existing, Value::Array(items)
                if items.len() == canonical.len()
                    && items.iter().zip(&canonical).all(|(a, b)| Rc::ptr_eq(a, b))));
            return existing;
        }

        let representative = Rc::new(Value::Array(canonical));
        node.array_rep.fill(&representative, weak);
        self.registry.add(&representative);
        representative
    }

    fn admit_object(&mut self, object: &ObjectValue) -> Rc<Value> {
        let tag = object.tag().clone();
        let own_keys: Vec<Rc<str>> = object.keys().cloned().collect();
        let signature = self.signature_for(&own_keys);

        let mut canonical = ObjectValue::new(tag.clone());
        let mut sequence = Vec::with_capacity(signature.sorted_keys().len() + 2);
        sequence.push(Discriminator::Tag(tag));
        sequence.push(Discriminator::Scalar(ScalarKey::Str(
            signature.serialized().clone(),
        )));
        for key in signature.sorted_keys() {
            let child = object
                .get(key)
                .expect("signature keys come from this object")
                .clone();
            let child = self.canonical_of(&child);
            sequence.push(Discriminator::of(&child));
            canonical.insert(key.clone(), child);
        }

        let weak = self.retention == Retention::Weak;
        let node = self.pool.lookup(&sequence);
        if let Some(existing) = node.object_rep.get() {
            debug_assert!(matches!(&*existing, Value::Object(installed)
                if installed.tag().same(canonical.tag())
                    && installed.entries().len() == canonical.entries().len()
                    && installed
                        .entries()
                        .iter()
                        .zip(canonical.entries())
                        .all(|((ka, va), (kb, vb))| ka == kb && Rc::ptr_eq(va, vb))));
            return existing;
        }

        let representative = Rc::new(Value::Object(canonical));
        node.object_rep.fill(&representative, weak);
        self.registry.add(&representative);
        representative
    }

    /// Shared key-signature record for an unsorted own-key list.
    ///
    /// Resolves through the pool on the unsorted sequence first (repeat
    /// shapes skip the sort entirely), then through the cache keyed on the
    /// serialized sorted form, so differing insertion orders converge.
    fn signature_for(&mut self, keys: &[Rc<str>]) -> Rc<KeySignature> {
        let unsorted: Vec<Discriminator> = keys
            .iter()
            .map(|key| Discriminator::Scalar(ScalarKey::Str(key.clone())))
            .collect();
        let node = self.pool.lookup(&unsorted);
        if let Some(signature) = &node.signature {
            return signature.clone();
        }
        let signature = self.signatures.get_or_insert(keys);
        node.signature = Some(signature.clone());
        signature
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new()
    }
}
