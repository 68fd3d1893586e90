//! The audio context: node arena, routing, lifecycle, and renderer.
//!
//! A [`Context`] owns every node and connection, tracks the rendering clock,
//! and realizes scheduled automation sample-accurately. Connections come in
//! two flavors: **audio** edges feed a node's signal input (summed), and
//! **parameter** edges feed a node parameter at audio rate on top of its
//! automation value — this is how FM reaches a carrier's frequency and how
//! ring/tremolo modulators reach a gain amount.
//!
//! The context starts [`ContextState::Suspended`]; rendering produces
//! silence and the clock does not advance until [`resume`](Context::resume).
//! Teardown-path operations (`stop`, `disconnect`, `remove_node`) are
//! deliberately tolerant of dead ids so a rebuild can never fail halfway.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::node::{ConstantSourceNode, GainNode, NodeId, NodeKind, ParamKey};
use crate::osc::{OscillatorNode, Waveform};
use crate::param::AudioParam;

/// Frames rendered per inner block.
///
/// Parameter modulation is gathered per block, so this bounds automation
/// latency relative to modulation inputs; 128 frames mirrors interactive
/// latency hosts.
pub const RENDER_QUANTUM: usize = 128;

/// Lifecycle state of a [`Context`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not yet running; renders silence.
    #[default]
    Suspended,
    /// Rendering and advancing the clock.
    Running,
    /// Permanently shut down.
    Closed,
}

/// Errors from graph operations.
#[derive(Debug, PartialEq, Eq)]
pub enum GraphError {
    /// The specified node was not found in the context.
    NodeNotFound(NodeId),
    /// The node exists but has no parameter with the given key.
    ParamNotFound(NodeId, ParamKey),
    /// An identical connection already exists.
    DuplicateEdge(NodeId, NodeId),
    /// The node kind cannot be started (gain stages have no source clock).
    NotStartable(NodeId),
    /// The context has been closed.
    ContextClosed,
}

impl core::fmt::Display for GraphError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "node {} not found", id.index()),
            Self::ParamNotFound(id, key) => {
                write!(f, "node {} has no {key:?} parameter", id.index())
            }
            Self::DuplicateEdge(a, b) => {
                write!(f, "connection {} -> {} already exists", a.index(), b.index())
            }
            Self::NotStartable(id) => write!(f, "node {} cannot be started", id.index()),
            Self::ContextClosed => write!(f, "context is closed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GraphError {}

/// Where a connection delivers its signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EdgeTarget {
    /// Into a node's summed audio input.
    Node(NodeId),
    /// Onto a node parameter, summed with its automation value.
    Param(NodeId, ParamKey),
    /// Into the context's output mix.
    Destination,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Edge {
    from: NodeId,
    to: EdgeTarget,
}

struct NodeSlot {
    kind: NodeKind,
    /// Output of the last rendered block.
    output: [f32; RENDER_QUANTUM],
}

/// Node population counts, used to verify teardown completeness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeCensus {
    /// Live oscillator nodes.
    pub oscillators: usize,
    /// Live gain nodes.
    pub gains: usize,
    /// Live constant-source nodes.
    pub constants: usize,
}

impl NodeCensus {
    /// Total live nodes.
    pub fn total(&self) -> usize {
        self.oscillators + self.gains + self.constants
    }
}

/// An audio graph with a sample clock and scheduled automation.
pub struct Context {
    sample_rate: f32,
    frames_rendered: u64,
    state: ContextState,
    /// Slot per ever-created node; `None` once removed. Ids index this
    /// directly and are never reused.
    nodes: Vec<Option<NodeSlot>>,
    edges: Vec<Edge>,
    /// Cached render order; rebuilt when the topology changes.
    order: Vec<NodeId>,
    order_dirty: bool,
}

impl Context {
    /// Create a suspended context at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames_rendered: 0,
            state: ContextState::Suspended,
            nodes: Vec::new(),
            edges: Vec::new(),
            order: Vec::new(),
            order_dirty: false,
        }
    }

    /// The context's sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Seconds of audio rendered so far.
    #[inline]
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / f64::from(self.sample_rate)
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Transition to [`ContextState::Running`]. Idempotent while running.
    pub fn resume(&mut self) -> Result<(), GraphError> {
        match self.state {
            ContextState::Closed => Err(GraphError::ContextClosed),
            _ => {
                #[cfg(feature = "tracing")]
                tracing::debug!(sample_rate = self.sample_rate, "context running");
                self.state = ContextState::Running;
                Ok(())
            }
        }
    }

    /// Permanently shut the context down. Rendering goes silent.
    pub fn close(&mut self) {
        self.state = ContextState::Closed;
    }

    // --- Node construction ---

    /// Create an oscillator with the given waveform and initial frequency.
    pub fn create_oscillator(
        &mut self,
        waveform: Waveform,
        frequency_hz: f32,
    ) -> Result<NodeId, GraphError> {
        self.insert(NodeKind::Oscillator(OscillatorNode::new(
            waveform,
            frequency_hz,
        )))
    }

    /// Create a gain stage with the given initial multiplier.
    pub fn create_gain(&mut self, gain: f32) -> Result<NodeId, GraphError> {
        self.insert(NodeKind::Gain(GainNode::new(gain)))
    }

    /// Create a constant source emitting `offset` once started.
    pub fn create_constant_source(&mut self, offset: f32) -> Result<NodeId, GraphError> {
        self.insert(NodeKind::Constant(ConstantSourceNode::new(offset)))
    }

    fn insert(&mut self, kind: NodeKind) -> Result<NodeId, GraphError> {
        if self.state == ContextState::Closed {
            return Err(GraphError::ContextClosed);
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(NodeSlot {
            kind,
            output: [0.0; RENDER_QUANTUM],
        }));
        self.order_dirty = true;
        Ok(id)
    }

    // --- Routing ---

    /// Route `from`'s output into `to`'s summed audio input.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.check_node(from)?;
        self.check_node(to)?;
        self.add_edge(Edge {
            from,
            to: EdgeTarget::Node(to),
        })
    }

    /// Route `from`'s output onto `target`'s parameter `key`.
    pub fn connect_param(
        &mut self,
        from: NodeId,
        target: NodeId,
        key: ParamKey,
    ) -> Result<(), GraphError> {
        self.check_node(from)?;
        self.check_param(target, key)?;
        self.add_edge(Edge {
            from,
            to: EdgeTarget::Param(target, key),
        })
    }

    /// Route `from`'s output into the context's output mix.
    pub fn connect_to_destination(&mut self, from: NodeId) -> Result<(), GraphError> {
        self.check_node(from)?;
        self.add_edge(Edge {
            from,
            to: EdgeTarget::Destination,
        })
    }

    fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if self.edges.contains(&edge) {
            let to = match edge.to {
                EdgeTarget::Node(n) | EdgeTarget::Param(n, _) => n,
                EdgeTarget::Destination => edge.from,
            };
            return Err(GraphError::DuplicateEdge(edge.from, to));
        }
        self.edges.push(edge);
        self.order_dirty = true;
        Ok(())
    }

    /// Remove every outgoing connection of `node`. No-op for dead ids.
    pub fn disconnect(&mut self, node: NodeId) {
        let before = self.edges.len();
        self.edges.retain(|e| e.from != node);
        if self.edges.len() != before {
            self.order_dirty = true;
        }
    }

    /// Remove `node` and every connection touching it. No-op for dead ids.
    pub fn remove_node(&mut self, node: NodeId) {
        if let Some(slot) = self.nodes.get_mut(node.0 as usize) {
            *slot = None;
        }
        self.edges.retain(|e| {
            e.from != node
                && match e.to {
                    EdgeTarget::Node(n) | EdgeTarget::Param(n, _) => n != node,
                    EdgeTarget::Destination => true,
                }
        });
        self.order_dirty = true;
    }

    // --- Source lifecycle ---

    /// Start a source node. Idempotent; gain stages are not startable.
    pub fn start(&mut self, node: NodeId) -> Result<(), GraphError> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::Oscillator(osc) => {
                osc.start();
                Ok(())
            }
            NodeKind::Constant(source) => {
                source.start();
                Ok(())
            }
            NodeKind::Gain(_) => Err(GraphError::NotStartable(node)),
        }
    }

    /// Stop a source node. Tolerant: dead ids and gain stages are no-ops.
    pub fn stop(&mut self, node: NodeId) {
        if let Some(Some(slot)) = self.nodes.get_mut(node.0 as usize) {
            match &mut slot.kind {
                NodeKind::Oscillator(osc) => osc.stop(),
                NodeKind::Constant(source) => source.stop(),
                NodeKind::Gain(_) => {}
            }
        }
    }

    // --- Parameter automation ---

    /// Borrow a parameter for inspection.
    pub fn param(&self, node: NodeId, key: ParamKey) -> Result<&AudioParam, GraphError> {
        self.nodes
            .get(node.0 as usize)
            .and_then(|s| s.as_ref())
            .ok_or(GraphError::NodeNotFound(node))?
            .kind
            .param(key)
            .ok_or(GraphError::ParamNotFound(node, key))
    }

    /// Mutably borrow a parameter for scheduling.
    pub fn param_mut(&mut self, node: NodeId, key: ParamKey) -> Result<&mut AudioParam, GraphError> {
        self.slot_mut(node)?
            .kind
            .param_mut(key)
            .ok_or(GraphError::ParamNotFound(node, key))
    }

    /// Schedule a value jump. See [`AudioParam::set_value_at`].
    pub fn set_value_at(
        &mut self,
        node: NodeId,
        key: ParamKey,
        value: f32,
        time: f64,
    ) -> Result<(), GraphError> {
        self.param_mut(node, key)?.set_value_at(value, time);
        Ok(())
    }

    /// Schedule a linear ramp. See [`AudioParam::linear_ramp_to_value_at`].
    pub fn linear_ramp_to_value_at(
        &mut self,
        node: NodeId,
        key: ParamKey,
        value: f32,
        time: f64,
    ) -> Result<(), GraphError> {
        self.param_mut(node, key)?.linear_ramp_to_value_at(value, time);
        Ok(())
    }

    /// Schedule an exponential approach. See [`AudioParam::set_target_at`].
    pub fn set_target_at(
        &mut self,
        node: NodeId,
        key: ParamKey,
        target: f32,
        time: f64,
        time_constant: f64,
    ) -> Result<(), GraphError> {
        self.param_mut(node, key)?
            .set_target_at(target, time, time_constant);
        Ok(())
    }

    /// Drop automation scheduled at or after `time`.
    pub fn cancel_scheduled_values(
        &mut self,
        node: NodeId,
        key: ParamKey,
        time: f64,
    ) -> Result<(), GraphError> {
        self.param_mut(node, key)?.cancel_scheduled_values(time);
        Ok(())
    }

    // --- Introspection ---

    /// Count live nodes by kind.
    pub fn census(&self) -> NodeCensus {
        let mut census = NodeCensus::default();
        for slot in self.nodes.iter().flatten() {
            match slot.kind {
                NodeKind::Oscillator(_) => census.oscillators += 1,
                NodeKind::Gain(_) => census.gains += 1,
                NodeKind::Constant(_) => census.constants += 1,
            }
        }
        census
    }

    // --- Rendering ---

    /// Render mono output into `out`.
    ///
    /// While not running, fills silence and leaves the clock untouched.
    pub fn render(&mut self, out: &mut [f32]) {
        if self.state != ContextState::Running {
            out.fill(0.0);
            return;
        }
        for block in out.chunks_mut(RENDER_QUANTUM) {
            self.render_block(block);
        }
    }

    fn render_block(&mut self, out: &mut [f32]) {
        let frames = out.len();
        let dt = 1.0 / f64::from(self.sample_rate);
        let t0 = self.frames_rendered as f64 * dt;

        if self.order_dirty {
            self.recompute_order();
        }
        let order = core::mem::take(&mut self.order);

        for &id in &order {
            // Gather this node's audio input and per-parameter modulation
            // from already-rendered upstream nodes.
            let mut audio_in = [0.0_f32; RENDER_QUANTUM];
            let mut freq_mod = [0.0_f32; RENDER_QUANTUM];
            let mut gain_mod = [0.0_f32; RENDER_QUANTUM];
            let mut offset_mod = [0.0_f32; RENDER_QUANTUM];

            for edge in &self.edges {
                let sink = match edge.to {
                    EdgeTarget::Node(n) if n == id => &mut audio_in,
                    EdgeTarget::Param(n, ParamKey::Frequency) if n == id => &mut freq_mod,
                    EdgeTarget::Param(n, ParamKey::Gain) if n == id => &mut gain_mod,
                    EdgeTarget::Param(n, ParamKey::Offset) if n == id => &mut offset_mod,
                    _ => continue,
                };
                if let Some(Some(source)) = self.nodes.get(edge.from.0 as usize) {
                    for (acc, &x) in sink.iter_mut().zip(source.output.iter()).take(frames) {
                        *acc += x;
                    }
                }
            }

            let Some(Some(slot)) = self.nodes.get_mut(id.0 as usize) else {
                continue;
            };
            match &mut slot.kind {
                NodeKind::Oscillator(osc) => {
                    for i in 0..frames {
                        slot.output[i] = osc.render_sample(t0 + i as f64 * dt, dt, freq_mod[i]);
                    }
                }
                NodeKind::Gain(gain) => {
                    for i in 0..frames {
                        let amount = gain.gain.evaluate(t0 + i as f64 * dt) + gain_mod[i];
                        slot.output[i] = audio_in[i] * amount;
                    }
                }
                NodeKind::Constant(source) => {
                    if source.is_running() {
                        for i in 0..frames {
                            slot.output[i] =
                                source.offset.evaluate(t0 + i as f64 * dt) + offset_mod[i];
                        }
                    } else {
                        slot.output[..frames].fill(0.0);
                    }
                }
            }
        }
        self.order = order;

        // Mix destination-connected nodes into the caller's buffer.
        out.fill(0.0);
        for edge in &self.edges {
            if edge.to != EdgeTarget::Destination {
                continue;
            }
            if let Some(Some(source)) = self.nodes.get(edge.from.0 as usize) {
                for (acc, &x) in out.iter_mut().zip(source.output.iter()) {
                    *acc += x;
                }
            }
        }

        self.frames_rendered += frames as u64;
    }

    /// Rebuild the render order: sources before their sinks, parameter
    /// connections counting as dependencies.
    fn recompute_order(&mut self) {
        let live: Vec<NodeId> = (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|id| matches!(self.nodes.get(id.0 as usize), Some(Some(_))))
            .collect();

        let mut indegree = vec![0_usize; self.nodes.len()];
        for edge in &self.edges {
            let owner = match edge.to {
                EdgeTarget::Node(n) | EdgeTarget::Param(n, _) => n,
                EdgeTarget::Destination => continue,
            };
            if matches!(self.nodes.get(edge.from.0 as usize), Some(Some(_))) {
                indegree[owner.0 as usize] += 1;
            }
        }

        let mut order = Vec::with_capacity(live.len());
        let mut ready: Vec<NodeId> = live
            .iter()
            .copied()
            .filter(|id| indegree[id.0 as usize] == 0)
            .collect();

        while let Some(id) = ready.pop() {
            order.push(id);
            for edge in &self.edges {
                if edge.from != id {
                    continue;
                }
                let owner = match edge.to {
                    EdgeTarget::Node(n) | EdgeTarget::Param(n, _) => n,
                    EdgeTarget::Destination => continue,
                };
                let deg = &mut indegree[owner.0 as usize];
                *deg -= 1;
                if *deg == 0 {
                    ready.push(owner);
                }
            }
        }

        // A cycle cannot happen with the topologies this crate builds;
        // if one sneaks in, render the stragglers in id order with
        // one-block-stale inputs rather than dropping them.
        if order.len() < live.len() {
            for id in live {
                if !order.contains(&id) {
                    order.push(id);
                }
            }
        }

        self.order = order;
        self.order_dirty = false;
    }

    fn check_node(&self, node: NodeId) -> Result<(), GraphError> {
        match self.nodes.get(node.0 as usize) {
            Some(Some(_)) => Ok(()),
            _ => Err(GraphError::NodeNotFound(node)),
        }
    }

    fn check_param(&self, node: NodeId, key: ParamKey) -> Result<(), GraphError> {
        self.param(node, key).map(|_| ())
    }

    fn slot_mut(&mut self, node: NodeId) -> Result<&mut NodeSlot, GraphError> {
        self.nodes
            .get_mut(node.0 as usize)
            .and_then(|s| s.as_mut())
            .ok_or(GraphError::NodeNotFound(node))
    }
}
