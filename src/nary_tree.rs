//! A generic parent/child tree with construction/insert/remove
//! notifications to its value type.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Actions a tree node notifies its value about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The node (and its value) was just constructed.
    Constructed,
    /// The node was just inserted under a parent.
    Inserted,
    /// The node is about to be removed from its parent.
    Removing,
}

/// Value-type hook for tree notifications.
///
/// This is the safe-Rust realization of the "if the value type declares
/// `notify`, call it" detection idiom: rather than runtime reflection,
/// any value type that cares implements this trait; the default no-op
/// implementations mean non-participating value types need not opt in at
/// all, but still pay nothing for the trait bound on `Node<V>`.
///
/// `path` is the sequence of nodes from the notifying node up to the
/// point where propagation stops, in child-to-ancestor order. Each hook
/// returns whether the node should continue propagating the notification
/// to its own parent.
pub trait Notify: Sized {
    /// Called once, immediately after node construction.
    fn on_construct(&mut self, _node: &Node<Self>) {}
    /// Called after this node is inserted under a parent; `path` starts
    /// with this node.
    fn on_insert(&mut self, _path: &[Node<Self>]) -> bool {
        false
    }
    /// Called just before this node is removed from its parent; `path`
    /// starts with this node.
    fn on_remove(&mut self, _path: &[Node<Self>]) -> bool {
        false
    }
}

#[derive(Debug)]
struct NodeInner<V> {
    value: V,
    parent: Option<Weak<RefCell<NodeInner<V>>>>,
    children: Vec<Node<V>>,
}

/// A tree node holding a value of type `V`, at most one parent, and an
/// ordered list of owned children.
#[derive(Debug)]
pub struct Node<V>(Rc<RefCell<NodeInner<V>>>);

impl<V> Clone for Node<V> {
    fn clone(&self) -> Self {
        Node(self.0.clone())
    }
}

impl<V> PartialEq for Node<V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A non-owning reference to a `Node`, for value types that need to
/// refer back to their own owning node without creating a reference
/// cycle (see `Node::downgrade`).
pub struct WeakNode<V>(Weak<RefCell<NodeInner<V>>>);

impl<V> Clone for WeakNode<V> {
    fn clone(&self) -> Self {
        WeakNode(self.0.clone())
    }
}

impl<V> WeakNode<V> {
    /// Attempts to upgrade to a strong `Node` reference; `None` if the
    /// node has since been dropped.
    pub fn upgrade(&self) -> Option<Node<V>> {
        self.0.upgrade().map(Node)
    }
}

impl<V> Node<V> {
    /// A non-owning reference to this node.
    pub fn downgrade(&self) -> WeakNode<V> {
        WeakNode(Rc::downgrade(&self.0))
    }
}

impl<V: Notify> Node<V> {
    /// Constructs a new, parentless node wrapping `value`, immediately
    /// notifying it of construction.
    pub fn new(value: V) -> Self {
        let node = Node(Rc::new(RefCell::new(NodeInner {
            value,
            parent: None,
            children: Vec::new(),
        })));
        node.0.borrow_mut().value.on_construct(&node);
        node
    }

    /// Runs `f` with a reference to this node's value.
    pub fn with_value<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.0.borrow().value)
    }

    /// Runs `f` with a mutable reference to this node's value.
    pub fn with_value_mut<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        f(&mut self.0.borrow_mut().value)
    }

    /// This node's parent, if any.
    pub fn parent(&self) -> Option<Node<V>> {
        self.0.borrow().parent.as_ref().and_then(|w| w.upgrade()).map(Node)
    }

    /// This node's children, in order.
    pub fn children(&self) -> Vec<Node<V>> {
        self.0.borrow().children.clone()
    }

    /// Number of direct children.
    pub fn num_children(&self) -> usize {
        self.0.borrow().children.len()
    }

    /// This node's depth: 0 for the root, otherwise parent depth + 1.
    pub fn depth(&self) -> usize {
        match self.parent() {
            Some(p) => p.depth() + 1,
            None => 0,
        }
    }

    /// Inserts `child` as this node's new last child. If `child` already
    /// had a parent, it is first removed from it. Notifies the child's
    /// value of insertion, propagating up the (new) ancestry while hooks
    /// return `true`.
    pub fn insert(&self, child: Node<V>) {
        if let Some(old_parent) = child.parent() {
            old_parent.remove(&child);
        }
        child.0.borrow_mut().parent = Some(Rc::downgrade(&self.0));
        self.0.borrow_mut().children.push(child.clone());
        Self::propagate_insert(child);
    }

    fn propagate_insert(start: Node<V>) {
        let mut path = vec![start.clone()];
        let mut cur = start;
        loop {
            let cont = cur.with_value_mut(|v| v.on_insert(&path));
            if !cont {
                break;
            }
            match cur.parent() {
                Some(p) => {
                    path.push(p.clone());
                    cur = p;
                }
                None => break,
            }
        }
    }

    /// Removes `child` from this node's children, if present; clears the
    /// child's parent pointer and returns it (owned). Notifies the
    /// child's value before detaching, propagating up while hooks return
    /// `true`.
    pub fn remove(&self, child: &Node<V>) -> Option<Node<V>> {
        let idx = self.0.borrow().children.iter().position(|c| c == child)?;
        Self::propagate_remove(child.clone());
        let removed = self.0.borrow_mut().children.remove(idx);
        removed.0.borrow_mut().parent = None;
        Some(removed)
    }

    fn propagate_remove(start: Node<V>) {
        let mut path = vec![start.clone()];
        let mut cur = start;
        loop {
            let cont = cur.with_value_mut(|v| v.on_remove(&path));
            if !cont {
                break;
            }
            match cur.parent() {
                Some(p) => {
                    path.push(p.clone());
                    cur = p;
                }
                None => break,
            }
        }
    }

    /// Finds the first descendant (pre-order, including self) for which
    /// `pred` returns true.
    pub fn find(&self, pred: &impl Fn(&Node<V>) -> bool) -> Option<Node<V>> {
        self.depth_first(0).into_iter().find(pred)
    }

    /// This node's index within its parent's child list, if it has a
    /// parent.
    pub fn sibling_index(&self) -> Option<usize> {
        let parent = self.parent()?;
        parent.0.borrow().children.iter().position(|c| c == self)
    }

    /// The sequence of child-list indices from this node up to (but not
    /// including) the root, in leaf-to-root order.
    pub fn sibling_path(&self) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = self.clone();
        while let Some(idx) = cur.sibling_index() {
            path.push(idx);
            cur = cur.parent().expect("sibling_index implies a parent");
        }
        path
    }

    /// Depth-first (pre-order) traversal starting at this node.
    /// `max_depth` of 0 means unlimited; 1 means only this node; 2 means
    /// this node and its direct children; etc.
    pub fn depth_first(&self, max_depth: usize) -> Vec<Node<V>> {
        let mut out = Vec::new();
        self.depth_first_into(max_depth, 1, &mut out);
        out
    }

    fn depth_first_into(&self, max_depth: usize, level: usize, out: &mut Vec<Node<V>>) {
        out.push(self.clone());
        if max_depth != 0 && level >= max_depth {
            return;
        }
        for child in self.children() {
            child.depth_first_into(max_depth, level + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct Counter {
        constructs: usize,
        inserts: usize,
        removes: usize,
    }

    impl Notify for Counter {
        fn on_construct(&mut self, _node: &Node<Self>) {
            self.constructs += 1;
        }
        fn on_insert(&mut self, _path: &[Node<Self>]) -> bool {
            self.inserts += 1;
            true
        }
        fn on_remove(&mut self, _path: &[Node<Self>]) -> bool {
            self.removes += 1;
            true
        }
    }

    #[test]
    fn construction_notifies_once() {
        let n = Node::new(Counter::default());
        assert_eq!(n.with_value(|c| c.constructs), 1);
    }

    #[test]
    fn insert_and_remove_update_parentage() {
        let root = Node::new(Counter::default());
        let child = Node::new(Counter::default());
        root.insert(child.clone());
        assert_eq!(child.parent(), Some(root.clone()));
        assert_eq!(root.num_children(), 1);
        assert_eq!(child.with_value(|c| c.inserts), 1);

        let removed = root.remove(&child).unwrap();
        assert_eq!(removed.parent(), None);
        assert_eq!(root.num_children(), 0);
        assert_eq!(child.with_value(|c| c.removes), 1);
    }

    #[test]
    fn reinsert_detaches_from_prior_parent() {
        let a = Node::new(Counter::default());
        let b = Node::new(Counter::default());
        let child = Node::new(Counter::default());
        a.insert(child.clone());
        b.insert(child.clone());
        assert_eq!(a.num_children(), 0);
        assert_eq!(b.num_children(), 1);
        assert_eq!(child.parent(), Some(b));
    }

    #[test]
    fn depth_first_preorder_with_cap() {
        let root = Node::new(Counter::default());
        let c1 = Node::new(Counter::default());
        let c2 = Node::new(Counter::default());
        let gc = Node::new(Counter::default());
        root.insert(c1.clone());
        root.insert(c2);
        c1.insert(gc);

        assert_eq!(root.depth_first(0).len(), 4);
        assert_eq!(root.depth_first(1).len(), 1);
        assert_eq!(root.depth_first(2).len(), 3);
    }

    #[test]
    fn sibling_path_leaf_to_root() {
        let root = Node::new(Counter::default());
        let c0 = Node::new(Counter::default());
        let c1 = Node::new(Counter::default());
        root.insert(c0);
        root.insert(c1.clone());
        let gc = Node::new(Counter::default());
        c1.insert(gc.clone());
        assert_eq!(gc.sibling_path(), vec![0, 1]);
    }
}
