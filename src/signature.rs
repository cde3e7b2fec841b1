//! Key signatures: shared sorted-key records for object shapes.

use std::collections::HashMap;
use std::rc::Rc;

/// Shared record describing an object's own-key set.
///
/// Objects with the same key set converge on one record regardless of the
/// order their keys were inserted in.
#[derive(Debug)]
pub struct KeySignature {
    sorted_keys: Vec<Rc<str>>,
    serialized: Rc<str>,
}

impl KeySignature {
    /// Keys in lexicographic order.
    pub fn sorted_keys(&self) -> &[Rc<str>] {
        &self.sorted_keys
    }

    /// JSON rendering of the sorted key list; equal key sets share one form.
    pub fn serialized(&self) -> &Rc<str> {
        &self.serialized
    }
}

/// Interner for [`KeySignature`] records keyed by the serialized sorted form.
///
/// This is the second dedup stage; the first is the canonical pool keyed on
/// the unsorted key sequence, which lets repeat shapes skip the sort.
#[derive(Default)]
pub(crate) struct SignatureCache {
    by_serialized: HashMap<Rc<str>, Rc<KeySignature>>,
}

impl SignatureCache {
    /// Returns the shared record for `keys`, sorting and serializing on miss.
    pub(crate) fn get_or_insert(&mut self, keys: &[Rc<str>]) -> Rc<KeySignature> {
        let mut sorted: Vec<Rc<str>> = keys.to_vec();
        sorted.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
        let serialized = serialize_keys(&sorted);
        if let Some(signature) = self.by_serialized.get(serialized.as_str()) {
            return signature.clone();
        }
        let serialized: Rc<str> = Rc::from(serialized);
        let signature = Rc::new(KeySignature {
            sorted_keys: sorted,
            serialized: serialized.clone(),
        });
        self.by_serialized.insert(serialized, signature.clone());
        signature
    }

    pub(crate) fn len(&self) -> usize {
        self.by_serialized.len()
    }
}

/// Serializes a sorted key list as a JSON array of strings.
fn serialize_keys(keys: &[Rc<str>]) -> String {
    let borrowed: Vec<&str> = keys.iter().map(|key| key.as_ref()).collect();
    serde_json::to_string(&borrowed).expect("string lists always serialize")
}
