//! Ancestor chain of identity fingerprints.

use crate::value::Fingerprint;

/// One frame of the current traversal path.
///
/// Each frame borrows its parent, so the chain lives on the call stack
/// and unwinds with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecCycleGuard<'a> {
    fingerprint: Option<Fingerprint>,
    parent: Option<&'a SpecCycleGuard<'a>>,
}

impl SpecCycleGuard<'_> {
    /// Empty chain above the traversal root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Frame for the node identified by `fingerprint`, below `self`.
    pub fn child<'b>(&'b self, fingerprint: Option<Fingerprint>) -> SpecCycleGuard<'b> {
        SpecCycleGuard {
            fingerprint,
            parent: Some(self),
        }
    }

    /// `true` iff `fingerprint` belongs to an ancestor of this frame.
    /// The frame's own fingerprint is not tested.
    pub fn contains(&self, fingerprint: Fingerprint) -> bool {
        let mut cursor = self.parent;
        while let Some(frame) = cursor {
            if frame.fingerprint == Some(fingerprint) {
                return true;
            }
            cursor = frame.parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_fingerprint_is_not_an_ancestor() {
        let root = SpecCycleGuard::root();
        let frame = root.child(Some(1));
        assert!(!frame.contains(1));
        assert!(frame.child(None).contains(1));
    }

    #[test]
    fn ancestors_are_found_at_any_depth() {
        let root = SpecCycleGuard::root();
        let a = root.child(Some(10));
        let b = a.child(None);
        let c = b.child(Some(30));

        assert!(c.contains(10));
        assert!(!c.contains(30));
        assert!(!c.contains(20));
    }

    #[test]
    fn siblings_do_not_see_each_other() {
        let root = SpecCycleGuard::root();
        let parent = root.child(Some(1));
        let left = parent.child(Some(2));
        let right = parent.child(Some(3));

        assert!(!right.child(Some(2)).contains(2));
        assert!(left.child(Some(1)).contains(1));
    }
}
