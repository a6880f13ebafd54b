//! Minimal view tree
//!
//! Only models parent/child relationships and visibility, which is all the
//! core needs to reparent the player between the host view and the
//! fullscreen surface. Layout and drawing belong to the host toolkit.

use compact_str::CompactString;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use uuid::Uuid;

/// A node of the view tree. Parents own their children; children point back weakly.
pub struct View {
    id: Uuid,
    name: CompactString,
    superview: Mutex<Weak<View>>,
    subviews: Mutex<Vec<Arc<View>>>,
    hidden: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl View {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: CompactString::new(name),
            superview: Mutex::new(Weak::new()),
            subviews: Mutex::new(Vec::new()),
            hidden: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superview(&self) -> Option<Arc<View>> {
        lock(&self.superview).upgrade()
    }

    pub fn subviews(&self) -> Vec<Arc<View>> {
        lock(&self.subviews).clone()
    }

    /// Whether `child` is a direct subview of this view
    pub fn contains(&self, child: &View) -> bool {
        lock(&self.subviews).iter().any(|view| view.id == child.id)
    }

    /// Append `child` on top of the existing subviews, detaching it from its previous parent first.
    pub fn add_subview(self: &Arc<Self>, child: &Arc<View>) {
        if child.id == self.id {
            return;
        }
        child.remove_from_superview();
        lock(&self.subviews).push(child.clone());
        *lock(&child.superview) = Arc::downgrade(self);
    }

    /// Detach this view from its parent, if it has one
    pub fn remove_from_superview(&self) {
        let parent = std::mem::take(&mut *lock(&self.superview));
        if let Some(parent) = parent.upgrade() {
            lock(&parent.subviews).retain(|view| view.id != self.id);
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::Relaxed)
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::Relaxed);
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("hidden", &self.is_hidden())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reparenting_moves_the_child() {
        let first = View::new("first");
        let second = View::new("second");
        let child = View::new("child");

        first.add_subview(&child);
        assert!(first.contains(&child));
        assert_eq!(child.superview().map(|v| v.id()), Some(first.id()));

        second.add_subview(&child);
        assert!(!first.contains(&child));
        assert!(second.contains(&child));
        assert_eq!(child.superview().map(|v| v.id()), Some(second.id()));

        child.remove_from_superview();
        assert!(second.subviews().is_empty());
        assert!(child.superview().is_none());
    }

    #[test]
    fn test_view_cannot_contain_itself() {
        let view = View::new("self");
        view.add_subview(&view);
        assert!(view.subviews().is_empty());
    }
}
