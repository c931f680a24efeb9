//! Null tracking for column slots.

/// Tracks which slots of a column are null.
///
/// The representation upgrades lazily: columns that never see a null stay in
/// `Trivial`, all-null prefixes stay in `Nulls`, and only mixed content pays
/// for a byte map. In the byte map, a non-zero byte marks a null slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// All `len` slots are non-null.
    Trivial(usize),
    /// All `len` slots are null.
    Nulls(usize),
    /// One byte per slot; non-zero marks a null.
    Bytes(Vec<u8>),
}

impl Presence {
    pub fn new() -> Presence {
        Presence::Trivial(0)
    }

    pub fn len(&self) -> usize {
        match self {
            Presence::Trivial(len) | Presence::Nulls(len) => *len,
            Presence::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_nulls(&self) -> usize {
        match self {
            Presence::Trivial(_) => 0,
            Presence::Nulls(len) => *len,
            Presence::Bytes(bytes) => bytes.iter().filter(|&&b| b != 0).count(),
        }
    }

    pub fn count_non_nulls(&self) -> usize {
        self.len() - self.count_nulls()
    }

    pub fn is_null(&self, index: usize) -> bool {
        match self {
            Presence::Trivial(len) => {
                assert!(index < *len);
                false
            }
            Presence::Nulls(len) => {
                assert!(index < *len);
                true
            }
            Presence::Bytes(bytes) => bytes[index] != 0,
        }
    }

    pub fn is_valid(&self, index: usize) -> bool {
        !self.is_null(index)
    }

    pub fn push_non_null(&mut self) {
        self.extend_with_non_nulls(1);
    }

    pub fn push_null(&mut self) {
        self.extend_with_nulls(1);
    }

    pub fn extend_with_non_nulls(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        match self {
            Presence::Trivial(len) => *len += count,
            Presence::Nulls(0) => *self = Presence::Trivial(count),
            _ => {
                let bytes = self.make_bytes();
                bytes.resize(bytes.len() + count, 0);
            }
        }
    }

    pub fn extend_with_nulls(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        match self {
            Presence::Nulls(len) => *len += count,
            Presence::Trivial(0) => *self = Presence::Nulls(count),
            _ => {
                let bytes = self.make_bytes();
                bytes.resize(bytes.len() + count, 1);
            }
        }
    }

    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len() {
            return;
        }
        match self {
            Presence::Trivial(len) | Presence::Nulls(len) => *len = new_len,
            Presence::Bytes(bytes) => bytes.truncate(new_len),
        }
    }

    /// Forces the byte-map representation and returns it.
    fn make_bytes(&mut self) -> &mut Vec<u8> {
        match self {
            Presence::Trivial(len) => *self = Presence::Bytes(vec![0; *len]),
            Presence::Nulls(len) => *self = Presence::Bytes(vec![1; *len]),
            Presence::Bytes(_) => {}
        }
        match self {
            Presence::Bytes(bytes) => bytes,
            _ => unreachable!(),
        }
    }
}

impl Default for Presence {
    fn default() -> Presence {
        Presence::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivial_stays_trivial() {
        let mut presence = Presence::new();
        presence.extend_with_non_nulls(10);
        presence.push_non_null();
        assert!(matches!(presence, Presence::Trivial(11)));
        assert_eq!(presence.count_nulls(), 0);
        assert!(presence.is_valid(7));
    }

    #[test]
    fn test_all_null_prefix() {
        let mut presence = Presence::new();
        presence.extend_with_nulls(4);
        assert!(matches!(presence, Presence::Nulls(4)));
        assert!(presence.is_null(3));
        assert_eq!(presence.count_non_nulls(), 0);
    }

    #[test]
    fn test_upgrade_to_bytes() {
        let mut presence = Presence::new();
        presence.extend_with_non_nulls(2);
        presence.push_null();
        presence.extend_with_non_nulls(1);
        assert_eq!(presence.len(), 4);
        assert_eq!(presence.count_nulls(), 1);
        assert!(!presence.is_null(0));
        assert!(presence.is_null(2));
        assert!(!presence.is_null(3));
    }

    #[test]
    fn test_nulls_then_non_null() {
        let mut presence = Presence::new();
        presence.extend_with_nulls(3);
        presence.push_non_null();
        assert_eq!(presence.count_nulls(), 3);
        assert!(presence.is_valid(3));
    }

    #[test]
    fn test_empty_transitions() {
        let mut presence = Presence::new();
        presence.extend_with_nulls(2);
        presence.truncate(0);
        presence.extend_with_non_nulls(2);
        assert!(matches!(presence, Presence::Trivial(2)));

        let mut presence = Presence::Nulls(0);
        presence.extend_with_non_nulls(1);
        assert!(matches!(presence, Presence::Trivial(1)));
    }

    #[test]
    fn test_truncate() {
        let mut presence = Presence::new();
        presence.push_non_null();
        presence.push_null();
        presence.push_non_null();
        presence.truncate(2);
        assert_eq!(presence.len(), 2);
        assert_eq!(presence.count_nulls(), 1);
        presence.truncate(5);
        assert_eq!(presence.len(), 2);
    }

    #[test]
    fn test_zero_extends_do_not_upgrade() {
        let mut presence = Presence::new();
        presence.extend_with_non_nulls(3);
        presence.extend_with_nulls(0);
        assert!(matches!(presence, Presence::Trivial(3)));
    }
}
