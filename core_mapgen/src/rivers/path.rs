use std::fmt;

use crate::{cell::RiverFlow, grid::HexDirection};

/// How a river bends while crossing one cell, seen from the direction it
/// arrives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnGeometry {
    Straight,
    GentleCw,
    GentleCcw,
    SharpCw,
    SharpCcw,
}

impl TurnGeometry {
    /// Order in which a river's last cell looks for water or an existing
    /// river to end on.
    pub const ENDPOINT_PRIORITY: [TurnGeometry; 5] = [
        TurnGeometry::SharpCcw,
        TurnGeometry::SharpCw,
        TurnGeometry::GentleCcw,
        TurnGeometry::GentleCw,
        TurnGeometry::Straight,
    ];

    /// `None` when both directions are the same edge.
    pub fn classify(to_previous: HexDirection, to_next: HexDirection) -> Option<Self> {
        match to_previous.steps_to(to_next) {
            1 => Some(TurnGeometry::SharpCcw),
            2 => Some(TurnGeometry::GentleCcw),
            3 => Some(TurnGeometry::Straight),
            4 => Some(TurnGeometry::GentleCw),
            5 => Some(TurnGeometry::SharpCw),
            _ => None,
        }
    }

    /// Clockwise steps from the direction to the previous cell to the
    /// direction to the next one.
    pub fn steps(self) -> i32 {
        match self {
            TurnGeometry::SharpCcw => 1,
            TurnGeometry::GentleCcw => 2,
            TurnGeometry::Straight => 3,
            TurnGeometry::GentleCw => 4,
            TurnGeometry::SharpCw => 5,
        }
    }

    pub fn next_direction(self, to_previous: HexDirection) -> HexDirection {
        to_previous.rotated(self.steps())
    }

    pub fn is_sharp(self) -> bool {
        matches!(self, TurnGeometry::SharpCw | TurnGeometry::SharpCcw)
    }
}

/// Vertex of a cell outline. Corner `k` closes edge `k` clockwise, sitting
/// between edge `k` and edge `k + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Corner(pub HexDirection);

impl Corner {
    /// The two edges meeting at this corner.
    pub fn edges(self) -> [HexDirection; 2] {
        [self.0, self.0.next()]
    }

    pub fn is_on(self, edge: HexDirection) -> bool {
        self.0 == edge || self.0 == edge.previous()
    }

    /// Corner reached after walking `edge` in `flow`.
    pub fn after(edge: HexDirection, flow: RiverFlow) -> Self {
        match flow {
            RiverFlow::Clockwise => Corner(edge),
            RiverFlow::Counterclockwise => Corner(edge.previous()),
        }
    }

    /// Corner a walk along `edge` in `flow` starts from.
    pub fn before(edge: HexDirection, flow: RiverFlow) -> Self {
        Self::after(edge, flow.opposite())
    }

    /// The same vertex named from the neighbor across `edge`. `edge` must be
    /// one of the two edges meeting here.
    pub fn across(self, edge: HexDirection) -> Self {
        if self.0 == edge {
            Corner(edge.rotated(2))
        } else {
            Corner(edge.rotated(3))
        }
    }

    /// Flow a walk must take to leave this corner without crossing back over
    /// `entry_edge`.
    pub fn departing_flow(self, entry_edge: HexDirection) -> RiverFlow {
        if self.0 == entry_edge {
            RiverFlow::Clockwise
        } else {
            RiverFlow::Counterclockwise
        }
    }

    fn step(self, flow: RiverFlow) -> (HexDirection, Corner) {
        let edge = match flow {
            RiverFlow::Clockwise => self.0.next(),
            RiverFlow::Counterclockwise => self.0,
        };
        (edge, Corner::after(edge, flow))
    }
}

/// Edges laid on one cell: a walk around its outline from `entry`, every
/// edge travelled in `flow`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiverPath {
    pub entry: Corner,
    pub flow: RiverFlow,
    pub edges: Vec<HexDirection>,
}

impl RiverPath {
    /// Candidate paths across a cell entered from `to_previous` and left
    /// toward `to_next`, shortest first. The entry corner is fixed by `flow`:
    /// clockwise walks start at the clockwise end of the entry edge.
    ///
    /// The short path stops at the first corner of the exit edge; the long
    /// one also runs along the exit edge.
    pub fn through(
        to_previous: HexDirection,
        to_next: HexDirection,
        flow: RiverFlow,
    ) -> Vec<RiverPath> {
        if to_previous == to_next {
            return Vec::new();
        }
        let entry = match flow {
            RiverFlow::Clockwise => Corner(to_previous),
            RiverFlow::Counterclockwise => Corner(to_previous.previous()),
        };
        let mut edges = Vec::new();
        let mut corner = entry;
        while !corner.is_on(to_next) && edges.len() < 6 {
            let (edge, reached) = corner.step(flow);
            edges.push(edge);
            corner = reached;
        }
        let short = RiverPath {
            entry,
            flow,
            edges: edges.clone(),
        };
        edges.push(to_next);
        let long = RiverPath { entry, flow, edges };
        vec![short, long]
    }

    /// Single edge on a river's first cell, ending on a corner of the edge
    /// toward `to_next`.
    pub fn source(to_next: HexDirection, flow: RiverFlow) -> Self {
        let edge = match flow {
            RiverFlow::Clockwise => to_next.previous(),
            RiverFlow::Counterclockwise => to_next.next(),
        };
        Self {
            entry: Corner::before(edge, flow),
            flow,
            edges: vec![edge],
        }
    }

    /// Corner the walk ends on.
    pub fn exit(&self) -> Corner {
        self.edges
            .last()
            .map(|edge| Corner::after(*edge, self.flow))
            .unwrap_or(self.entry)
    }

    /// Corners visited in order, starting with the entry.
    pub fn corners(&self) -> impl Iterator<Item = Corner> + '_ {
        std::iter::once(self.entry).chain(
            self.edges
                .iter()
                .map(move |edge| Corner::after(*edge, self.flow)),
        )
    }

    /// Each edge starts where the previous one ended.
    pub fn is_connected(&self) -> bool {
        let mut corner = self.entry;
        for edge in &self.edges {
            if Corner::before(*edge, self.flow) != corner {
                return false;
            }
            corner = Corner::after(*edge, self.flow);
        }
        true
    }
}

impl fmt::Display for RiverPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, edge) in self.edges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{edge:?}")?;
        }
        write!(f, "]")
    }
}
