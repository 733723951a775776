//! Initial strategic, bonus and luxury resource placement.
//!
//! Uses the same selection as the resource balance strategies so that the
//! first pass and later balancing agree on where nodes may go.

use std::ops::AddAssign;

use tracing::{debug, warn};

use crate::{
    balance::{strategies::ResourcePlacement, BalanceContext},
    region::{Region, RegionData},
    resources::ResourceKind,
    templates::HomelandTemplate,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionReport {
    pub strategic: u32,
    pub bonus: u32,
    pub luxury: u32,
    /// Nodes requested but not placed for lack of a valid cell.
    pub shortfall: u32,
}

impl AddAssign for DistributionReport {
    fn add_assign(&mut self, other: Self) {
        self.strategic += other.strategic;
        self.bonus += other.bonus;
        self.luxury += other.luxury;
        self.shortfall += other.shortfall;
    }
}

fn place_many(
    ctx: &mut BalanceContext<'_>,
    region: &Region,
    data: &RegionData<'_>,
    kind: ResourceKind,
    count: u32,
) -> (u32, u32) {
    let placement = ResourcePlacement::for_kind(kind);
    let mut placed = 0;
    for _ in 0..count {
        if !placement.place_one(ctx, region, data).is_applied() {
            break;
        }
        placed += 1;
    }
    if placed < count {
        warn!(
            target: "core_mapgen::resources",
            region = region.id(),
            kind = ?kind,
            placed,
            requested = count,
            "resources.placement_shortfall"
        );
    }
    (placed, count - placed)
}

/// Strategic and bonus nodes for one region, counts from its topology
/// template.
pub fn distribute_region_resources(
    ctx: &mut BalanceContext<'_>,
    region: &Region,
    data: &RegionData<'_>,
) -> DistributionReport {
    let mut report = DistributionReport::default();
    let (strategic, missing) = place_many(
        ctx,
        region,
        data,
        ResourceKind::Strategic,
        data.topology.strategic_per_region,
    );
    report.strategic = strategic;
    report.shortfall += missing;
    let (bonus, missing) = place_many(
        ctx,
        region,
        data,
        ResourceKind::Bonus,
        data.topology.bonus_per_region,
    );
    report.bonus = bonus;
    report.shortfall += missing;
    debug!(
        target: "core_mapgen::resources",
        region = region.id(),
        strategic = report.strategic,
        bonus = report.bonus,
        "resources.region_distributed"
    );
    report
}

/// Luxury nodes for a homeland, spread over its regions in shuffled order.
pub fn distribute_homeland_luxuries(
    ctx: &mut BalanceContext<'_>,
    homeland: &HomelandTemplate,
    members: &[(&Region, &RegionData<'_>)],
) -> DistributionReport {
    let mut report = DistributionReport::default();
    let placement = ResourcePlacement::luxury();
    let mut order: Vec<usize> = (0..members.len()).collect();
    for _ in 0..homeland.luxury_per_homeland {
        ctx.rng.shuffle(&mut order);
        let placed = order.iter().any(|&slot| {
            let (region, data) = members[slot];
            placement.place_one(ctx, region, data).is_applied()
        });
        if placed {
            report.luxury += 1;
        } else {
            report.shortfall += 1;
        }
    }
    if report.shortfall > 0 {
        warn!(
            target: "core_mapgen::resources",
            placed = report.luxury,
            requested = homeland.luxury_per_homeland,
            "resources.luxury_shortfall"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        balance::strategies::fixture::{Harness, Templates},
        cell::{CellSnapshot, Shape, Terrain},
        grid::{CellId, HexMap, ResourceNodes},
    };

    #[test]
    fn region_counts_follow_topology_template() {
        let map = HexMap::new(6, 6, CellSnapshot::new(Terrain::Plains, Shape::Hills));
        let mut harness = Harness::new(map);
        let region = harness.whole_region();
        let mut templates = Templates::default();
        templates.topology.strategic_per_region = 2;
        templates.topology.bonus_per_region = 3;
        let data = templates.data();

        let report = harness.run(|ctx| distribute_region_resources(ctx, &region, &data));
        assert_eq!(report.strategic, 2);
        assert_eq!(report.bonus, 3);
        assert_eq!(report.shortfall, 0);
        let nodes = region
            .cells()
            .filter(|c| harness.map.resource_node(*c).is_some())
            .count();
        assert_eq!(nodes, 5);
    }

    #[test]
    fn luxuries_fall_short_on_barren_land() {
        let map = HexMap::ocean(4, 4);
        let mut harness = Harness::new(map);
        let region = harness.whole_region();
        let mut templates = Templates::default();
        templates.homeland.luxury_per_homeland = 2;
        for definition in harness.catalog.of_kind(ResourceKind::Luxury) {
            templates
                .homeland
                .luxury_weights
                .insert(definition.name.clone(), 0.0);
        }
        let data = templates.data();

        let report = harness.run(|ctx| {
            distribute_homeland_luxuries(ctx, &templates.homeland, &[(&region, &data)])
        });
        assert_eq!(report.luxury, 0);
        assert_eq!(report.shortfall, 2);
        assert!((0..16).all(|i| harness.map.resource_node(CellId(i)).is_none()));
    }
}
