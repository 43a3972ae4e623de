use super::{BodySnapshot, BodyState, PhysicsEvent, RigidBody};
use crate::{
    ecs::{components::Transform, Entity, Requirements},
    message_id,
    scene::{config::PhysicsConfig, System, SystemContext},
};
use log::*;

/// Starts pending rigid bodies, steps the scene's physics world and writes the results back into
/// entity transforms.
///
/// Every entity with a [`RigidBody`] must also have a [`Transform`], otherwise the frame fails
/// with a missing component error.
pub struct PhysicsSystem {
    fixed_timestep: Option<f32>,
    max_substeps: u32,
    accumulator: f32,
}

impl Default for PhysicsSystem {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

impl PhysicsSystem {
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            fixed_timestep: config.fixed_timestep,
            max_substeps: config.max_substeps.max(1),
            accumulator: 0.0,
        }
    }

    /// Splits the frame time into solver steps, returning the step count and length.
    fn plan_steps(&mut self, dt: f32) -> (u32, f32) {
        let Some(step) = self.fixed_timestep else {
            return if dt > 0.0 { (1, dt) } else { (0, 0.0) };
        };

        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= step && steps < self.max_substeps {
            self.accumulator -= step;
            steps += 1;
        }

        // Falling behind, drop the backlog instead of spiraling
        if steps == self.max_substeps && self.accumulator >= step {
            debug!(
                "Physics fell behind, dropping {:.3}s of simulation",
                self.accumulator
            );
            self.accumulator %= step;
        }

        (steps, step)
    }
}

impl System for PhysicsSystem {
    fn label(&self) -> &'static str {
        "Physics System"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().with::<RigidBody>()
    }

    fn frame_start(&mut self, ctx: &mut SystemContext) -> crate::Result {
        for entity in ctx.entities() {
            if ctx.get_component::<RigidBody>(entity)?.state() != BodyState::Pending {
                continue;
            }

            let transform = *ctx.get_component::<Transform>(entity)?;
            ctx.get_component_mut::<RigidBody>(entity)?
                .start(transform.position, transform.rotation)?;
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut SystemContext) -> crate::Result {
        let (steps, step) = self.plan_steps(ctx.dt);
        if steps == 0 {
            return Ok(());
        }

        let physics = ctx.physics()?;
        {
            let mut world = physics.world_mut()?;
            for _ in 0..steps {
                world.step(step);
            }
        }

        let mut snapshots: Vec<(Entity, BodySnapshot)> = vec![];
        {
            let world = physics.world()?;
            for entity in ctx.entities() {
                let body = ctx.get_component::<RigidBody>(entity)?;
                if let Some(snapshot) = body.handle().and_then(|handle| world.body_state(handle)) {
                    snapshots.push((entity, snapshot));
                }
            }
        }

        for (entity, snapshot) in snapshots {
            let transform = ctx.get_component_mut::<Transform>(entity)?;
            transform.position = snapshot.position;
            transform.rotation = snapshot.rotation;
        }

        ctx.post_message(message_id::PHYSICS_STEPPED, PhysicsEvent::Stepped { steps });
        Ok(())
    }
}
