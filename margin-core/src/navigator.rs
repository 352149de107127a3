//! Circular next/previous traversal over all threads.
//!
//! The order is by canonical file string, then by line. Sorting is stable, so
//! threads that compare equal keep store order.

use crate::store::ThreadStore;
use crate::types::ThreadId;

/// Ordered snapshot of thread identities. Cheap to rebuild; take a fresh one
/// after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    order: Vec<ThreadId>,
}

impl Navigator {
    pub fn snapshot(store: &ThreadStore) -> Self {
        let mut threads: Vec<_> = store.threads().iter().collect();
        threads.sort_by(|a, b| {
            a.address
                .file
                .as_str()
                .cmp(b.address.file.as_str())
                .then(a.address.line.cmp(&b.address.line))
        });
        Self { order: threads.into_iter().map(|t| t.id).collect() }
    }

    pub fn order(&self) -> &[ThreadId] {
        &self.order
    }

    /// The thread after `current`, wrapping to the first.
    ///
    /// An unknown `current` (e.g. just deleted) counts as "before the first".
    pub fn next(&self, current: ThreadId) -> Option<ThreadId> {
        let n = self.order.len();
        if n == 0 {
            return None;
        }
        let target = match self.position(current) {
            Some(i) => (i + 1) % n,
            None => 0,
        };
        Some(self.order[target])
    }

    /// The thread before `current`, wrapping to the last.
    ///
    /// An unknown `current` counts as "after the last".
    pub fn previous(&self, current: ThreadId) -> Option<ThreadId> {
        let n = self.order.len();
        if n == 0 {
            return None;
        }
        let target = match self.position(current) {
            Some(i) => (i + n - 1) % n,
            None => n - 1,
        };
        Some(self.order[target])
    }

    fn position(&self, id: ThreadId) -> Option<usize> {
        self.order.iter().position(|t| *t == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, CommentBody, FileUri};

    fn add(store: &mut ThreadStore, file: &str, line: u32) -> ThreadId {
        let uri = FileUri::parse(&format!("file:///work/{file}")).unwrap();
        store
            .create_thread(Address::new(uri, line), CommentBody::PlainText("c".into()), "u")
            .unwrap()
    }

    #[test]
    fn orders_by_file_then_line_and_wraps() {
        let mut store = ThreadStore::new();
        let b1 = add(&mut store, "b.ts", 1);
        let a5 = add(&mut store, "a.ts", 5);
        let a1 = add(&mut store, "a.ts", 1);

        let nav = Navigator::snapshot(&store);
        assert_eq!(nav.order(), [a1, a5, b1]);
        assert_eq!(nav.next(b1), Some(a1));
        assert_eq!(nav.next(a1), Some(a5));
        assert_eq!(nav.previous(a1), Some(b1));
    }

    #[test]
    fn line_order_is_numeric() {
        let mut store = ThreadStore::new();
        let ten = add(&mut store, "a.ts", 10);
        let two = add(&mut store, "a.ts", 2);
        assert_eq!(Navigator::snapshot(&store).order(), [two, ten]);
    }

    #[test]
    fn previous_undoes_next() {
        let mut store = ThreadStore::new();
        let ids = [
            add(&mut store, "c.rs", 3),
            add(&mut store, "a.rs", 7),
            add(&mut store, "a.rs", 0),
            add(&mut store, "b.rs", 12),
        ];
        let nav = Navigator::snapshot(&store);
        for id in ids {
            assert_eq!(nav.previous(nav.next(id).unwrap()), Some(id));
            assert_eq!(nav.next(nav.previous(id).unwrap()), Some(id));
        }
    }

    #[test]
    fn single_thread_wraps_to_itself() {
        let mut store = ThreadStore::new();
        let only = add(&mut store, "a.ts", 0);
        let nav = Navigator::snapshot(&store);
        assert_eq!(nav.next(only), Some(only));
        assert_eq!(nav.previous(only), Some(only));
    }

    #[test]
    fn empty_store_has_no_target() {
        let nav = Navigator::snapshot(&ThreadStore::new());
        assert_eq!(nav.next(ThreadId(1)), None);
        assert_eq!(nav.previous(ThreadId(1)), None);
    }

    #[test]
    fn unknown_current_starts_from_the_ends() {
        let mut store = ThreadStore::new();
        let a = add(&mut store, "a.ts", 0);
        let b = add(&mut store, "b.ts", 0);
        let gone = add(&mut store, "c.ts", 0);
        let address = store.thread(gone).unwrap().address.clone();
        store.remove_thread(&address).unwrap();

        let nav = Navigator::snapshot(&store);
        assert_eq!(nav.next(gone), Some(a));
        assert_eq!(nav.previous(gone), Some(b));
    }

    #[test]
    fn snapshot_is_stable() {
        let mut store = ThreadStore::new();
        add(&mut store, "b.ts", 4);
        add(&mut store, "a.ts", 4);
        add(&mut store, "a.ts", 1);
        assert_eq!(Navigator::snapshot(&store), Navigator::snapshot(&store));
    }
}
