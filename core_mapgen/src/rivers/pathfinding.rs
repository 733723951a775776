use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use crate::grid::{CellId, MapGrid};

/// Step cost into `cell`: `None` for water, 2 beside water, 1 inland, so
/// routes keep off the coast until their last step.
pub(crate) fn step_cost<G: MapGrid + ?Sized>(grid: &G, cell: CellId) -> Option<u32> {
    if grid.is_water(cell) {
        None
    } else if grid.has_water_neighbor(cell) {
        Some(2)
    } else {
        Some(1)
    }
}

/// Cheapest land route from `start` to `goal` through `allowed` cells,
/// both ends included.
pub(crate) fn shortest_land_path<G: MapGrid + ?Sized>(
    grid: &G,
    start: CellId,
    goal: CellId,
    allowed: &HashSet<CellId>,
) -> Option<Vec<CellId>> {
    if !allowed.contains(&start) || !allowed.contains(&goal) || grid.is_water(start) {
        return None;
    }
    let mut best: HashMap<CellId, u32> = HashMap::from([(start, 0)]);
    let mut came_from: HashMap<CellId, CellId> = HashMap::new();
    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry { cost: 0, cell: start });

    while let Some(HeapEntry { cost, cell }) = heap.pop() {
        if cell == goal {
            break;
        }
        if best.get(&cell).is_some_and(|known| cost > *known) {
            continue;
        }
        for neighbor in grid.neighbors(cell) {
            if !allowed.contains(&neighbor) {
                continue;
            }
            let Some(step) = step_cost(grid, neighbor) else {
                continue;
            };
            let next = cost + step;
            if best.get(&neighbor).map_or(true, |known| next < *known) {
                best.insert(neighbor, next);
                came_from.insert(neighbor, cell);
                heap.push(HeapEntry {
                    cost: next,
                    cell: neighbor,
                });
            }
        }
    }

    if !best.contains_key(&goal) {
        return None;
    }
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = *came_from.get(&current)?;
        path.push(current);
    }
    path.reverse();
    Some(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    cost: u32,
    cell: CellId,
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cell::{CellSnapshot, Shape, Terrain},
        grid::{HexMap, HexTopology},
    };

    #[test]
    fn path_avoids_water_and_is_adjacent() {
        let mut map = HexMap::new(6, 3, CellSnapshot::new(Terrain::Plains, Shape::Hills));
        // Wall of water across the middle row, leaving one gap.
        for x in 0..5 {
            let cell = map.cell_at_offset(x, 1).unwrap();
            map.set_cell(cell, CellSnapshot::ocean());
        }
        let start = map.cell_at_offset(0, 0).unwrap();
        let goal = map.cell_at_offset(0, 2).unwrap();
        let allowed: HashSet<CellId> = map.all_cells().into_iter().collect();

        let path = shortest_land_path(&map, start, goal, &allowed).expect("gap is reachable");
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        for pair in path.windows(2) {
            assert_eq!(map.distance(pair[0], pair[1]), 1);
        }
        assert!(path.iter().all(|c| !map.snapshots()[c.index()].is_water()));
        assert!(path.contains(&map.cell_at_offset(5, 1).unwrap()));
    }

    #[test]
    fn unreachable_goal_yields_none() {
        let mut map = HexMap::new(5, 3, CellSnapshot::new(Terrain::Plains, Shape::Hills));
        for x in 0..5 {
            let cell = map.cell_at_offset(x, 1).unwrap();
            map.set_cell(cell, CellSnapshot::ocean());
        }
        let allowed: HashSet<CellId> = map.all_cells().into_iter().collect();
        let start = map.cell_at_offset(0, 0).unwrap();
        let goal = map.cell_at_offset(4, 2).unwrap();
        assert!(shortest_land_path(&map, start, goal, &allowed).is_none());
    }

    #[test]
    fn coastal_cells_cost_more() {
        let mut map = HexMap::new(3, 1, CellSnapshot::new(Terrain::Plains, Shape::Hills));
        map.set_cell(CellId(2), CellSnapshot::ocean());
        assert_eq!(step_cost(&map, CellId(0)), Some(1));
        assert_eq!(step_cost(&map, CellId(1)), Some(2));
        assert_eq!(step_cost(&map, CellId(2)), None);
    }
}
