//! Fixed-capacity slot arena holding the live nodes.

use glam::Vec2;
use pulse_field_core::{
    AnimFrame, GridCell, ModulatorHandle, NodeKind, Quadrant, SpriteHandle, Tick, VoiceHandle,
};

/// External resources owned by a live node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NodeHandles {
    pub(crate) voice: VoiceHandle,
    pub(crate) frequency_modulator: ModulatorHandle,
    pub(crate) amplitude_modulator: ModulatorHandle,
    pub(crate) sprite: SpriteHandle,
}

/// State of a live node.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) position: Vec2,
    /// Cell recorded at spawn; movement never updates it.
    pub(crate) cell: GridCell,
    pub(crate) quadrant: Quadrant,
    pub(crate) death_time: Tick,
    pub(crate) next_pulse: Tick,
    pub(crate) pulse_period_scale: f32,
    pub(crate) note_length: f32,
    pub(crate) octave: u8,
    pub(crate) frame: AnimFrame,
    pub(crate) handles: NodeHandles,
}

#[derive(Clone, Debug)]
enum Slot {
    Dead,
    Live(Node),
}

/// Slot arena with a most-recently-freed hint.
#[derive(Debug)]
pub(crate) struct NodePool {
    slots: Vec<Slot>,
    last_freed: Option<usize>,
    live_count: usize,
}

impl NodePool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::Dead; capacity],
            last_freed: None,
            live_count: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live_count
    }

    pub(crate) fn is_live(&self, index: usize) -> bool {
        matches!(self.slots[index], Slot::Live(_))
    }

    /// First live slot in slot order.
    pub(crate) fn first_live(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Slot::Live(_)))
    }

    /// Picks the slot for the next spawn, consuming the freed-slot hint.
    pub(crate) fn allocate(&mut self) -> Option<usize> {
        if let Some(index) = self.last_freed.take() {
            if !self.is_live(index) {
                return Some(index);
            }
        }
        self.slots
            .iter()
            .position(|slot| matches!(slot, Slot::Dead))
    }

    /// Stores a node in a dead slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already live.
    pub(crate) fn occupy(&mut self, index: usize, node: Node) {
        assert!(!self.is_live(index), "slot {index} is already live");
        self.slots[index] = Slot::Live(node);
        self.live_count += 1;
    }

    /// Marks a live slot dead and hands back its node.
    ///
    /// # Panics
    ///
    /// Panics if the slot is dead.
    pub(crate) fn release(&mut self, index: usize) -> Node {
        match std::mem::replace(&mut self.slots[index], Slot::Dead) {
            Slot::Live(node) => {
                self.last_freed = Some(index);
                self.live_count -= 1;
                node
            }
            Slot::Dead => panic!("attempted to free dead slot {index}"),
        }
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Node> {
        match self.slots.get(index) {
            Some(Slot::Live(node)) => Some(node),
            _ => None,
        }
    }

    /// Live node stored in the slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is dead or out of range.
    pub(crate) fn node_mut(&mut self, index: usize) -> &mut Node {
        match &mut self.slots[index] {
            Slot::Live(node) => node,
            Slot::Dead => panic!("slot {index} holds no live node"),
        }
    }

    /// Iterates over live nodes in slot order together with their slot index.
    pub(crate) fn iter_live(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Live(node) => Some((index, node)),
                Slot::Dead => None,
            })
    }

    pub(crate) fn last_freed(&self) -> Option<usize> {
        self.last_freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: NodeKind) -> Node {
        Node {
            kind,
            position: Vec2::new(10.0, 10.0),
            cell: GridCell::new(0, 0),
            quadrant: Quadrant::NorthWest,
            death_time: Tick::new(100),
            next_pulse: Tick::ZERO,
            pulse_period_scale: 1.0,
            note_length: 0.5,
            octave: 3,
            frame: AnimFrame::FIRST,
            handles: NodeHandles {
                voice: VoiceHandle::new(0),
                frequency_modulator: ModulatorHandle::new(0),
                amplitude_modulator: ModulatorHandle::new(1),
                sprite: SpriteHandle::new(0),
            },
        }
    }

    #[test]
    fn allocation_prefers_first_dead_slot() {
        let mut pool = NodePool::new(4);
        assert_eq!(pool.allocate(), Some(0));
        pool.occupy(0, node(NodeKind::Strong));
        pool.occupy(1, node(NodeKind::Weak));
        assert_eq!(pool.allocate(), Some(2));
        assert_eq!(pool.first_live(), Some(0));
        assert_eq!(pool.live_count(), 2);
    }

    #[test]
    fn freed_slot_is_reused_once() {
        let mut pool = NodePool::new(4);
        for index in 0..3 {
            pool.occupy(index, node(NodeKind::Strong));
        }
        let released = pool.release(1);
        assert_eq!(released.kind, NodeKind::Strong);
        assert_eq!(pool.last_freed(), Some(1));
        assert_eq!(pool.allocate(), Some(1));
        assert_eq!(pool.last_freed(), None);
        assert_eq!(pool.allocate(), Some(1));
    }

    #[test]
    fn full_pool_has_no_slot() {
        let mut pool = NodePool::new(2);
        pool.occupy(0, node(NodeKind::Strong));
        pool.occupy(1, node(NodeKind::Weak));
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.iter_live().count(), 2);
    }

    #[test]
    #[should_panic(expected = "attempted to free dead slot 2")]
    fn releasing_dead_slot_panics() {
        let mut pool = NodePool::new(4);
        let _ = pool.release(2);
    }

    #[test]
    #[should_panic]
    fn out_of_range_slot_panics() {
        let mut pool = NodePool::new(4);
        let _ = pool.node_mut(9);
    }
}
