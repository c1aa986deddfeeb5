/*
 * Scene Module
 *
 * Bookkeeping for the presentation scene graph. Every live body and
 * satellite owns one node; the renderer only draws entities whose node is
 * attached. Rebuilding the population detaches every old node before new
 * ones are attached, so the node count always mirrors the live population.
 */

use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Body,
    Satellite,
}

#[derive(Default)]
pub struct Scene {
    next_id: u64,
    nodes: BTreeMap<NodeId, NodeKind>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, kind);
        id
    }

    // Returns false if the node was not attached
    pub fn detach(&mut self, id: NodeId) -> bool {
        self.nodes.remove(&id).is_some()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|&&k| k == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_and_detach() {
        let mut scene = Scene::new();
        let body = scene.attach(NodeKind::Body);
        let sat = scene.attach(NodeKind::Satellite);
        assert_ne!(body, sat);
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.count(NodeKind::Satellite), 1);

        assert!(scene.detach(sat));
        assert!(!scene.detach(sat));
        assert!(!scene.contains(sat));
        assert!(scene.contains(body));
    }

    #[test]
    fn ids_are_never_reused() {
        let mut scene = Scene::new();
        let first = scene.attach(NodeKind::Body);
        scene.detach(first);
        let second = scene.attach(NodeKind::Body);
        assert_ne!(first, second);
    }
}
