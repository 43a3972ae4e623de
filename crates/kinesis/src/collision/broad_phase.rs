use super::Aabb;
use crate::ecs::Entity;
use ahash::AHashMap;
use kinesis_utils::{Pool, PoolHandle};

/// Coarse spatial index producing candidate pairs for exact collision tests.
pub trait BroadPhase {
    fn insert(&mut self, entity: Entity, bounds: Aabb);

    /// Moves an entity's bounds, inserting it if it isn't tracked yet.
    fn update(&mut self, entity: Entity, bounds: Aabb);

    /// Returns `false` if the entity wasn't tracked.
    fn remove(&mut self, entity: Entity) -> bool;

    /// Every pair of tracked entities whose bounds overlap. Each pair is reported once, with the
    /// lower entity first, and the list is sorted.
    fn query_pairs(&mut self) -> Vec<(Entity, Entity)>;

    fn contains(&self, entity: Entity) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Proxy {
    entity: Entity,
    bounds: Aabb,
}

/// Sort and sweep along the X axis. Proxies are kept sorted between queries, so mostly static
/// scenes re-sort cheaply.
#[derive(Default)]
pub struct SweepAndPrune {
    proxies: Pool<Proxy>,
    lookup: AHashMap<Entity, PoolHandle>,
    order: Vec<PoolHandle>,
}

impl SweepAndPrune {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BroadPhase for SweepAndPrune {
    fn insert(&mut self, entity: Entity, bounds: Aabb) {
        self.update(entity, bounds);
    }

    fn update(&mut self, entity: Entity, bounds: Aabb) {
        if let Some(&handle) = self.lookup.get(&entity) {
            self.proxies.get_mut(handle).bounds = bounds;
        } else {
            let handle = self.proxies.allocate(Proxy { entity, bounds });
            self.lookup.insert(entity, handle);
            self.order.push(handle);
        }
    }

    fn remove(&mut self, entity: Entity) -> bool {
        let Some(handle) = self.lookup.remove(&entity) else {
            return false;
        };
        self.proxies.deallocate(handle);
        self.order.retain(|&h| h != handle);
        true
    }

    fn query_pairs(&mut self) -> Vec<(Entity, Entity)> {
        let proxies = &self.proxies;
        self.order.sort_by(|&a, &b| {
            proxies
                .get(a)
                .bounds
                .min
                .x
                .total_cmp(&proxies.get(b).bounds.min.x)
        });

        let mut pairs = vec![];
        for (i, &handle) in self.order.iter().enumerate() {
            let proxy = proxies.get(handle);
            for &other in &self.order[i + 1..] {
                let other = proxies.get(other);
                if other.bounds.min.x > proxy.bounds.max.x {
                    break;
                }
                if proxy.bounds.overlaps(&other.bounds) {
                    pairs.push(if proxy.entity < other.entity {
                        (proxy.entity, other.entity)
                    } else {
                        (other.entity, proxy.entity)
                    });
                }
            }
        }

        pairs.sort_unstable();
        pairs
    }

    fn contains(&self, entity: Entity) -> bool {
        self.lookup.contains_key(&entity)
    }

    fn len(&self) -> usize {
        self.lookup.len()
    }
}
