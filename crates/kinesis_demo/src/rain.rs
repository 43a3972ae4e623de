//! Balls raining down onto a floor, simulated by the rigid-body solver. Only a limited amount of
//! drops is kept around, the oldest ones get destroyed to make room for new ones.

use crate::{report_timings, FRAME_TIME};
use glam::Vec2;
use kinesis::{
    ecs::{components::Transform, Component, Entity},
    message_id,
    physics::{
        rapier::RapierWorld, BodyType, CollisionShape, PhysicsEvent, PhysicsSystem, RigidBody,
    },
    Message, Scene, SceneConfig, System, SystemContext,
};
use kinesis_utils::{AnyResult, AnyhowResultExt};
use log::*;
use std::collections::VecDeque;

pub const DROP_RADIUS: f32 = 0.25;
pub const DROP_HEIGHT: f32 = 10.0;
pub const FLOOR_HALF_EXTENTS: Vec2 = Vec2::new(20.0, 0.5);

/// Marks entities spawned by the [`RainSystem`].
#[derive(Debug)]
pub struct Raindrop {
    pub index: u32,
}

impl Component for Raindrop {}

pub struct RainSystem {
    /// Frames between two drops.
    pub interval: u32,
    pub max_drops: usize,
    pub steps: u32,
    frame: u32,
    spawned: u32,
    drops: VecDeque<Entity>,
}

impl RainSystem {
    pub fn new(interval: u32, max_drops: usize) -> Self {
        Self {
            interval: interval.max(1),
            max_drops,
            steps: 0,
            frame: 0,
            spawned: 0,
            drops: VecDeque::new(),
        }
    }

    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Spreads drops over the floor without any randomness.
    fn drop_position(index: u32) -> Vec2 {
        let fraction = (index as f32 * 0.618_034).fract();
        Vec2::new((fraction - 0.5) * 16.0, DROP_HEIGHT)
    }

    fn spawn_drop(&mut self, ctx: &mut SystemContext) -> kinesis::Result {
        let index = self.spawned;
        let mut body = RigidBody::new(ctx.physics()?, BodyType::Dynamic);
        body.add_collision_shape(&CollisionShape::circle(DROP_RADIUS).with_friction(0.5))?;

        let entity = ctx.create_entity();
        ctx.add_component(entity, Transform::from_position(Self::drop_position(index)))?;
        ctx.add_component(entity, body)?;
        ctx.add_component(entity, Raindrop { index })?;

        self.spawned += 1;
        self.drops.push_back(entity);
        trace!("Drop #{index} spawned as {entity}");

        while self.drops.len() > self.max_drops {
            if let Some(oldest) = self.drops.pop_front() {
                ctx.destroy_entity(oldest)?;
            }
        }
        Ok(())
    }
}

impl System for RainSystem {
    fn label(&self) -> &'static str {
        "Rain System"
    }

    fn handle_message(&mut self, message: &Message, _ctx: &mut SystemContext) -> kinesis::Result {
        if let Some(PhysicsEvent::Stepped { steps }) =
            message.data_if::<PhysicsEvent>(message_id::PHYSICS_STEPPED)
        {
            self.steps += steps;
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut SystemContext) -> kinesis::Result {
        if self.frame % self.interval == 0 {
            self.spawn_drop(ctx)?;
        }
        self.frame += 1;
        Ok(())
    }
}

/// Enables physics on the scene and builds the floor.
pub fn setup(scene: &mut Scene, interval: u32, max_drops: usize) -> AnyResult<Entity> {
    let physics = scene.config().physics.clone();
    let handle = scene.enable_physics(RapierWorld::from_config(&physics));

    scene.add_system(PhysicsSystem::new(&physics));
    scene.add_system(RainSystem::new(interval, max_drops));

    let mut body = RigidBody::new(handle, BodyType::Static);
    body.add_collision_shape(&CollisionShape::rectangle(FLOOR_HALF_EXTENTS))?;

    let floor = scene.create_entity();
    scene.add_component(floor, Transform::default())?;
    scene.add_component(floor, body)?;
    Ok(floor)
}

pub fn run(config: SceneConfig, frames: u32) -> AnyResult {
    let mut scene = Scene::with_config(config);
    setup(&mut scene, 10, 48)?;

    info!("Running rain for {frames} frames");
    for frame in 0..frames {
        scene
            .update(FRAME_TIME)
            .otherwise(format!("frame {frame} failed"))?;
    }

    let rain = scene
        .get_system::<RainSystem>()
        .otherwise("the rain system is gone")?;
    let resting = scene
        .universe()
        .get_components::<Raindrop>()
        .filter_map(|(entity, _)| scene.get_component::<Transform>(entity).ok())
        .filter(|transform| transform.position.y < FLOOR_HALF_EXTENTS.y + DROP_RADIUS * 1.5)
        .count();
    info!(
        "Drops spawned: {}, solver steps: {}, drops touching the floor: {resting}",
        rain.spawned(),
        rain.steps
    );
    report_timings(&scene);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_land_on_the_floor() {
        let mut scene = Scene::new();
        setup(&mut scene, 1000, 8).unwrap();

        for _ in 0..200 {
            scene.update(FRAME_TIME).unwrap();
        }

        let (first, _) = scene
            .universe()
            .get_components::<Raindrop>()
            .next()
            .expect("a drop should've been spawned");
        let y = scene.get_component::<Transform>(first).unwrap().position.y;
        assert!(
            (y - (FLOOR_HALF_EXTENTS.y + DROP_RADIUS)).abs() < 0.1,
            "drop rests at {y}"
        );

        // Stepped once per frame, and the last frame's message is still queued
        assert_eq!(scene.get_system::<RainSystem>().unwrap().steps, 199);
    }

    #[test]
    fn oldest_drops_are_removed() {
        let mut scene = Scene::new();
        setup(&mut scene, 1, 3).unwrap();

        for _ in 0..10 {
            scene.update(FRAME_TIME).unwrap();
        }

        let rain = scene.get_system::<RainSystem>().unwrap();
        assert_eq!(rain.spawned(), 10);
        assert_eq!(scene.universe().get_components::<Raindrop>().count(), 3);

        // The floor, plus every drop except the one spawned this frame, which is still pending
        let physics = scene.physics().unwrap();
        assert_eq!(physics.world().unwrap().body_count(), 3);
    }
}
