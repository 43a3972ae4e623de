use super::{collide, BroadPhase, Collider, ContactEvent, SweepAndPrune};
use crate::{
    ecs::{components::Transform, Entity, Requirements},
    message_id,
    scene::{System, SystemContext},
};
use ahash::AHashSet;

/// Detects contacts between entities with a [`Collider`] and a [`Transform`], and runs their
/// response callbacks.
///
/// For every confirmed contact, a [`ContactEvent`] is posted under [`message_id::CONTACT`], then
/// the first entity's callback runs, then the second one's. Entities scheduled for destruction
/// don't collide anymore, and a pair is dropped as soon as one of its entities stops being live
/// or loses its collider.
pub struct CollisionSystem {
    broad_phase: Box<dyn BroadPhase>,
    tracked: AHashSet<Entity>,
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionSystem {
    pub fn new() -> Self {
        Self::with_broad_phase(SweepAndPrune::new())
    }

    pub fn with_broad_phase(broad_phase: impl BroadPhase + 'static) -> Self {
        Self {
            broad_phase: Box::new(broad_phase),
            tracked: AHashSet::new(),
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Syncs the broad phase with the current colliders.
    fn refresh(&mut self, ctx: &SystemContext) -> crate::Result {
        let entities: AHashSet<Entity> = ctx.entities().into_iter().collect();

        for gone in self.tracked.difference(&entities) {
            self.broad_phase.remove(*gone);
        }

        for &entity in &entities {
            let collider = ctx.get_component::<Collider>(entity)?;
            let transform = ctx.get_component::<Transform>(entity)?;
            self.broad_phase
                .update(entity, collider.world_shape(transform).bounds());
        }

        self.tracked = entities;
        Ok(())
    }

    fn can_collide(ctx: &SystemContext, entity: Entity) -> bool {
        ctx.universe.validate_entity(entity)
            && !ctx.universe.is_queued_for_destroy(entity)
            && ctx.has_component::<Collider>(entity)
            && ctx.has_component::<Transform>(entity)
    }
}

impl System for CollisionSystem {
    fn label(&self) -> &'static str {
        "Collision System"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().with::<Collider>().with::<Transform>()
    }

    fn process(&mut self, ctx: &mut SystemContext) -> crate::Result {
        self.refresh(ctx)?;

        for (a, b) in self.broad_phase.query_pairs() {
            if !Self::can_collide(ctx, a) || !Self::can_collide(ctx, b) {
                continue;
            }

            let collider_a = ctx.get_component::<Collider>(a)?;
            let collider_b = ctx.get_component::<Collider>(b)?;
            if !collider_a.dynamic && !collider_b.dynamic {
                continue;
            }

            // Earlier callbacks may have moved things around, so test the current positions
            let shape_a = collider_a.world_shape(ctx.get_component::<Transform>(a)?);
            let shape_b = collider_b.world_shape(ctx.get_component::<Transform>(b)?);
            let Some(manifold) = collide(&shape_a, &shape_b) else {
                continue;
            };

            let callback_a = collider_a.callback();
            let callback_b = collider_b.callback();

            ctx.post_message(message_id::CONTACT, ContactEvent { a, b });

            if let Some(callback) = callback_a {
                callback(ctx, a, b, &manifold)?;
            }
            if let Some(callback) = callback_b {
                if Self::can_collide(ctx, a) && Self::can_collide(ctx, b) {
                    callback(ctx, b, a, &manifold.flipped())?;
                }
            }
        }

        Ok(())
    }
}
