//! Graph topology (C5): node/connection storage, cycle-safe mutation, and
//! the stable topological sort consumed by the processor.

use super::node::{Connection, GraphNode, NodeId, NodeKind, PortKind};
use crate::error::GraphError;
use std::collections::VecDeque;

/// The mutable processing graph: nodes, connections, and (after
/// [`Graph::prepare`]) a topological render order and per-node incoming
/// adjacency index.
///
/// Mutated only by the session's control-plane code, never touched mid-block
/// by the audio thread (§3 ownership rule).
pub struct Graph {
    nodes: Vec<GraphNode>,
    connections: Vec<Connection>,
    max_frames: usize,
    render_order: Vec<NodeId>,
    incoming_audio: Vec<Vec<NodeId>>,
    note_source_index: Vec<NodeId>,
    synth_index: Vec<NodeId>,
    fx_index: Vec<NodeId>,
    gain_index: Vec<NodeId>,
    mixer_index: Vec<NodeId>,
    master_index: Option<NodeId>,
    prepared: bool,
}

impl Graph {
    /// Create an empty graph. `max_frames` bounds the per-node output
    /// buffers, allocated once per node as it's added and never resized.
    pub fn new(max_frames: usize) -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            max_frames,
            render_order: Vec::new(),
            incoming_audio: Vec::new(),
            note_source_index: Vec::new(),
            synth_index: Vec::new(),
            fx_index: Vec::new(),
            gain_index: Vec::new(),
            mixer_index: Vec::new(),
            master_index: None,
            prepared: false,
        }
    }

    /// Add a node, returning its stable [`NodeId`]. Invalidates any prior
    /// `prepare()` result — call `prepare()` again before processing.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GraphNode::new(id, kind, self.max_frames));
        self.prepared = false;
        id
    }

    /// Declare a connection. Rejects connections that would introduce a
    /// cycle (§9: "cyclic graphs are rejected at build time... a programmer
    /// error").
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: PortKind,
    ) -> Result<(), GraphError> {
        self.validate_node(from)?;
        self.validate_node(to)?;
        if from == to || self.can_reach(to, from) {
            return Err(GraphError::WouldCreateCycle { from, to });
        }
        self.connections.push(Connection {
            from,
            from_port: 0,
            to,
            to_port: 0,
            kind,
        });
        self.prepared = false;
        Ok(())
    }

    fn validate_node(&self, id: NodeId) -> Result<(), GraphError> {
        if (id.0 as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    /// Depth-first search: can `from` reach `to` following existing edges?
    fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut visited = vec![false; self.nodes.len()];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            let idx = node.0 as usize;
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            for conn in &self.connections {
                if conn.from == node {
                    stack.push(conn.to);
                }
            }
        }
        false
    }

    /// Soft-remove a node: subsequent blocks skip it; it is physically
    /// removed only at the next call to [`Graph::compact`] (§4.11).
    pub fn mark_removed(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0 as usize) {
            node.removed = true;
        }
    }

    /// Physically drop soft-removed nodes and their connections. Must only
    /// be called while the audio thread is guaranteed idle for this graph
    /// (§5: "a coordinated rebuild that requires suspend_processing to be
    /// observed true for at least one block first").
    pub fn compact(&mut self) {
        self.nodes.retain(|n| !n.removed);
        for (new_idx, node) in self.nodes.iter_mut().enumerate() {
            node_set_id(node, NodeId(new_idx as u32));
        }
        self.prepared = false;
    }

    /// Build `render_order` (stable Kahn topological sort, FIFO among
    /// zero-indegree nodes), per-kind index vectors, and the
    /// `incoming_audio` adjacency index. Returns
    /// [`GraphError::CycleAtPrepare`] if the graph isn't a DAG — this should
    /// be unreachable given `connect()`'s cycle rejection, but is checked
    /// defensively since `prepare()` is the authoritative point the spec
    /// names for fatal initialisation errors (§7).
    pub fn prepare(&mut self) -> Result<(), GraphError> {
        let n = self.nodes.len();
        let mut indegree = vec![0usize; n];
        let mut adjacency: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for conn in &self.connections {
            adjacency[conn.from.0 as usize].push(conn.to);
            indegree[conn.to.0 as usize] += 1;
        }

        let mut queue: VecDeque<NodeId> = (0..n)
            .filter(|&i| indegree[i] == 0)
            .map(|i| NodeId(i as u32))
            .collect();
        let mut order = Vec::with_capacity(n);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &next in &adjacency[node.0 as usize] {
                let idx = next.0 as usize;
                indegree[idx] -= 1;
                if indegree[idx] == 0 {
                    queue.push_back(next);
                }
            }
        }
        if order.len() != n {
            return Err(GraphError::CycleAtPrepare(n));
        }

        let mut incoming_audio = vec![Vec::new(); n];
        for conn in &self.connections {
            if conn.kind == PortKind::Audio {
                incoming_audio[conn.to.0 as usize].push(conn.from);
            }
        }

        self.note_source_index.clear();
        self.synth_index.clear();
        self.fx_index.clear();
        self.gain_index.clear();
        self.mixer_index.clear();
        self.master_index = None;
        for node in &self.nodes {
            match node.kind() {
                NodeKind::NoteSource { .. } => self.note_source_index.push(node.id()),
                NodeKind::Synth { .. } => self.synth_index.push(node.id()),
                NodeKind::Fx { .. } => self.fx_index.push(node.id()),
                NodeKind::Gain { .. } => self.gain_index.push(node.id()),
                NodeKind::Mixer => self.mixer_index.push(node.id()),
                NodeKind::Master => self.master_index = Some(node.id()),
            }
        }

        self.render_order = order;
        self.incoming_audio = incoming_audio;
        self.prepared = true;
        Ok(())
    }

    /// `true` once `prepare()` has run since the last mutation.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Nodes in topological render order.
    pub fn render_order(&self) -> &[NodeId] {
        &self.render_order
    }

    /// Source nodes connected via an audio edge into `node`.
    pub fn incoming_audio(&self, node: NodeId) -> &[NodeId] {
        &self.incoming_audio[node.0 as usize]
    }

    /// Note-source node ids, in insertion order.
    pub fn note_sources(&self) -> &[NodeId] {
        &self.note_source_index
    }

    /// Synth node ids, in insertion order.
    pub fn synths(&self) -> &[NodeId] {
        &self.synth_index
    }

    /// FX node ids, in insertion order (the order a track's FX chain runs
    /// in, for nodes belonging to the same track).
    pub fn fx_nodes(&self) -> &[NodeId] {
        &self.fx_index
    }

    /// Gain node ids, in insertion order.
    pub fn gains(&self) -> &[NodeId] {
        &self.gain_index
    }

    /// Mixer node ids, in insertion order.
    pub fn mixers(&self) -> &[NodeId] {
        &self.mixer_index
    }

    /// The single master node, if added.
    pub fn master(&self) -> Option<NodeId> {
        self.master_index
    }

    /// Events connected into `node` from a note-source (there is at most
    /// one per consumer in this host's topology).
    pub fn connected_note_source(&self, node: NodeId) -> Option<NodeId> {
        self.connections.iter().find_map(|c| {
            (c.to == node && c.kind == PortKind::Events && self.node(c.from).is_some_and(|n| {
                matches!(n.kind(), NodeKind::NoteSource { .. })
            }))
            .then_some(c.from)
        })
    }

    /// Shared reference to a node by id.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Exclusive reference to a node by id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Total node count, including soft-removed ones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Max frames this graph's buffers were sized for.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }
}

fn node_set_id(node: &mut GraphNode, id: NodeId) {
    node.set_id(id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_topological_order_is_fifo_among_roots() {
        let mut g = Graph::new(128);
        let a = g.add_node(NodeKind::Gain { track: 0 });
        let b = g.add_node(NodeKind::Gain { track: 1 });
        let mixer = g.add_node(NodeKind::Mixer);
        g.connect(a, mixer, PortKind::Audio).unwrap();
        g.connect(b, mixer, PortKind::Audio).unwrap();
        g.prepare().unwrap();
        let order = g.render_order();
        assert_eq!(order[0], a);
        assert_eq!(order[1], b);
        assert_eq!(order[2], mixer);
    }

    #[test]
    fn cycle_is_rejected_at_connect_time() {
        let mut g = Graph::new(128);
        let a = g.add_node(NodeKind::Gain { track: 0 });
        let b = g.add_node(NodeKind::Gain { track: 1 });
        g.connect(a, b, PortKind::Audio).unwrap();
        assert!(g.connect(b, a, PortKind::Audio).is_err());
    }

    #[test]
    fn incoming_audio_tracks_audio_edges_only() {
        let mut g = Graph::new(128);
        let src = g.add_node(NodeKind::NoteSource { track: 0 });
        let synth = g.add_node(NodeKind::Synth { track: 0 });
        let gain = g.add_node(NodeKind::Gain { track: 0 });
        g.connect(src, synth, PortKind::Events).unwrap();
        g.connect(synth, gain, PortKind::Audio).unwrap();
        g.prepare().unwrap();
        assert_eq!(g.incoming_audio(gain), &[synth]);
        assert!(g.incoming_audio(synth).is_empty());
        assert_eq!(g.connected_note_source(synth), Some(src));
    }
}
