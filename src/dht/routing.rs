use crate::config::{M, SUCCESSOR_LIST_LEN};
use crate::NodeRef;

/// Finger table, successor list and predecessor of a node. Always guarded by a
/// single lock and never held across a remote call.
#[derive(Debug, Clone)]
pub struct Routing {
    pub finger: Vec<NodeRef>,
    pub successors: Vec<NodeRef>,
    pub predecessor: Option<NodeRef>,
    /// Next finger to refresh.
    pub next_finger: usize,
}

impl Routing {
    pub fn new(me: &NodeRef) -> Self {
        Routing {
            finger: vec![me.clone(); M],
            successors: Vec::new(),
            predecessor: None,
            next_finger: 0,
        }
    }

    /// Singleton ring: every pointer refers to `me`.
    pub fn reset_to(&mut self, me: &NodeRef) {
        self.finger = vec![me.clone(); M];
        self.successors = vec![me.clone()];
        self.predecessor = Some(me.clone());
        self.next_finger = 0;
    }

    pub fn successor(&self) -> Option<&NodeRef> {
        self.successors.first()
    }

    /// Installs `node` as the head, pushing the current list one slot down.
    /// Returns false when `node` already is the head.
    pub fn push_successor(&mut self, node: NodeRef) -> bool {
        if self.successor().map_or(false, |head| head.same_node(&node)) {
            return false;
        }
        self.successors.insert(0, node);
        self.successors.truncate(SUCCESSOR_LIST_LEN);
        true
    }

    /// Drops every entry before the first occurrence of `node`.
    /// Returns false when `node` is no longer in the list.
    pub fn promote_successor(&mut self, node: &NodeRef) -> bool {
        match self.successors.iter().position(|s| s.same_node(node)) {
            Some(i) => {
                self.successors.drain(..i);
                true
            }
            None => false,
        }
    }

    /// Keeps the head and replaces the rest of the list with `tail`.
    pub fn set_successor_tail(&mut self, tail: Vec<NodeRef>) {
        self.successors.truncate(1);
        self.successors.extend(tail);
        self.successors.truncate(SUCCESSOR_LIST_LEN);
    }

    /// The entries the predecessor should follow its own head with.
    pub fn successor_tail(&self) -> Vec<NodeRef> {
        self.successors
            .iter()
            .take(SUCCESSOR_LIST_LEN - 1)
            .cloned()
            .collect()
    }

    /// Replaces finger `i` with `replacement` if it still points at `stale`.
    pub fn replace_finger(&mut self, i: usize, stale: &NodeRef, replacement: &NodeRef) {
        if let Some(finger) = self.finger.get_mut(i) {
            if finger.same_node(stale) {
                *finger = replacement.clone();
            }
        }
    }

    /// Clears the predecessor if it still is `stale`.
    pub fn drop_predecessor(&mut self, stale: &NodeRef) {
        if self
            .predecessor
            .as_ref()
            .map_or(false, |pred| pred.same_node(stale))
        {
            self.predecessor = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(port: u16) -> NodeRef {
        NodeRef::new(format!("127.0.0.1:{}", port))
    }

    fn addrs(nodes: &[NodeRef]) -> Vec<&str> {
        nodes.iter().map(|n| n.addr.as_str()).collect()
    }

    #[test]
    fn test_new_points_fingers_at_self() {
        let me = node(1);
        let routing = Routing::new(&me);
        assert_eq!(routing.finger.len(), M);
        assert!(routing.finger.iter().all(|f| f.same_node(&me)));
        assert!(routing.successor().is_none());
        assert!(routing.predecessor.is_none());
    }

    #[test]
    fn test_push_successor_shifts_and_truncates() {
        let mut routing = Routing::new(&node(0));
        assert!(routing.push_successor(node(1)));
        assert!(!routing.push_successor(node(1)));
        assert!(routing.push_successor(node(2)));
        assert_eq!(addrs(&routing.successors), ["127.0.0.1:2", "127.0.0.1:1"]);

        for port in 10..40 {
            routing.push_successor(node(port));
        }
        assert_eq!(routing.successors.len(), SUCCESSOR_LIST_LEN);
        assert_eq!(routing.successors[0], node(39));
    }

    #[test]
    fn test_promote_successor_left_shifts() {
        let mut routing = Routing::new(&node(0));
        routing.successors = vec![node(1), node(2), node(3)];

        assert!(routing.promote_successor(&node(3)));
        assert_eq!(addrs(&routing.successors), ["127.0.0.1:3"]);
        assert!(!routing.promote_successor(&node(1)));
    }

    #[test]
    fn test_successor_tail_round_trip() {
        let mut pred = Routing::new(&node(0));
        let mut succ = Routing::new(&node(1));
        pred.successors = vec![node(1)];
        succ.successors = (2..30).map(node).collect();

        pred.set_successor_tail(succ.successor_tail());

        assert_eq!(pred.successors.len(), SUCCESSOR_LIST_LEN);
        assert_eq!(pred.successors[0], node(1));
        assert_eq!(pred.successors[1], node(2));
        assert_eq!(pred.successors[19], node(20));
    }

    #[test]
    fn test_replace_finger_only_if_unchanged() {
        let me = node(0);
        let mut routing = Routing::new(&me);
        routing.finger[5] = node(5);

        routing.replace_finger(5, &node(6), &me);
        assert_eq!(routing.finger[5], node(5));
        routing.replace_finger(5, &node(5), &me);
        assert_eq!(routing.finger[5], me);
    }

    #[test]
    fn test_drop_predecessor_only_if_unchanged() {
        let mut routing = Routing::new(&node(0));
        routing.predecessor = Some(node(2));

        routing.drop_predecessor(&node(3));
        assert_eq!(routing.predecessor, Some(node(2)));
        routing.drop_predecessor(&node(2));
        assert_eq!(routing.predecessor, None);
    }
}
