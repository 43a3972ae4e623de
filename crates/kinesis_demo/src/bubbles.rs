//! A shooter fires bubbles across a closed room. Fresh bubbles fly fast for a moment, then slow
//! down and float up, bouncing off the walls and each other until their lifetime runs out and
//! they pop.

use crate::{report_timings, FRAME_TIME};
use glam::Vec2;
use kinesis::{
    collision::{Collider, CollisionSystem, Manifold},
    ecs::{
        components::{CommandTarget, Transform},
        Component, Entity, Requirements,
    },
    message_id,
    scene::Key,
    Command, InputEvent, Message, MessageId, Scene, SceneConfig, System, SystemContext,
};
use kinesis_utils::{vector::reflect, AnyResult, AnyhowResultExt};
use log::*;

pub const ROOM_SIZE: Vec2 = Vec2::new(1920.0, 1080.0);
pub const BUBBLE_RADIUS: f32 = 24.0;
pub const SHOT_SPEED: f32 = 600.0;
pub const FLOAT_SPEED: f32 = 60.0;
const SHOOTER_STEP: f32 = 8.0;
const WALL_THICKNESS: f32 = 40.0;

pub const SHOOTER: u64 = 1 << 0;

pub const BUBBLE_EVENTS: MessageId = MessageId(message_id::USER.0 + 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleEvent {
    Spawned(Entity),
    Popped(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleState {
    /// Just fired, flying straight ahead.
    Spawning,
    Normal,
}

#[derive(Debug, Clone, Copy)]
pub struct Bubble {
    pub state: BubbleState,
    /// Seconds left until the bubble pops, counted in the normal state.
    pub lifetime: f32,
    /// Seconds left in the spawning state.
    pub spawntime: f32,
    pub velocity: Vec2,
}

impl Component for Bubble {}

impl Bubble {
    pub fn new(velocity: Vec2) -> Self {
        Self {
            state: BubbleState::Spawning,
            lifetime: 4.0,
            spawntime: 0.2,
            velocity,
        }
    }

    fn settle(&mut self) {
        self.state = BubbleState::Normal;
        self.spawntime = 0.0;
        self.velocity = Vec2::new(0.0, -FLOAT_SPEED);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Shooter {
    /// Either -1 or 1.
    pub facing: f32,
}

impl Component for Shooter {}

#[derive(Debug, Default)]
pub struct BubbleSystem;

impl BubbleSystem {
    fn kill_bubble(ctx: &mut SystemContext, entity: Entity) -> kinesis::Result {
        trace!("{entity} popped");
        ctx.destroy_entity(entity)?;
        ctx.post_message(BUBBLE_EVENTS, BubbleEvent::Popped(entity));
        Ok(())
    }
}

impl System for BubbleSystem {
    fn label(&self) -> &'static str {
        "Bubble System"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().with::<Bubble>().with::<Transform>()
    }

    fn process(&mut self, ctx: &mut SystemContext) -> kinesis::Result {
        let dt = ctx.dt;
        for entity in ctx.entities() {
            let bubble = ctx.get_component_mut::<Bubble>(entity)?;
            let expired = match bubble.state {
                BubbleState::Spawning => {
                    bubble.spawntime -= dt;
                    if bubble.spawntime <= 0.0 {
                        bubble.settle();
                    }
                    false
                }
                BubbleState::Normal => {
                    bubble.lifetime -= dt;
                    bubble.lifetime <= 0.0
                }
            };
            let velocity = bubble.velocity;

            if expired {
                Self::kill_bubble(ctx, entity)?;
                continue;
            }
            ctx.get_component_mut::<Transform>(entity)?
                .translate(velocity * dt);
        }
        Ok(())
    }
}

/// Turns key presses into commands for the shooter and keeps score.
#[derive(Debug, Default)]
pub struct BubbleDirector {
    pub spawned: u32,
    pub popped: u32,
}

impl System for BubbleDirector {
    fn label(&self) -> &'static str {
        "Bubble Director"
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut SystemContext) -> kinesis::Result {
        match *event {
            InputEvent::KeyPressed(Key::Space) => ctx.send_command(shoot()),
            InputEvent::KeyPressed(Key::Left) => ctx.send_command(step_shooter(-1.0)),
            InputEvent::KeyPressed(Key::Right) => ctx.send_command(step_shooter(1.0)),
            _ => {}
        }
        Ok(())
    }

    fn handle_message(&mut self, message: &Message, _ctx: &mut SystemContext) -> kinesis::Result {
        match message.data_if::<BubbleEvent>(BUBBLE_EVENTS) {
            Some(BubbleEvent::Spawned(_)) => self.spawned += 1,
            Some(BubbleEvent::Popped(_)) => self.popped += 1,
            None => {}
        }
        Ok(())
    }

    fn process(&mut self, _ctx: &mut SystemContext) -> kinesis::Result {
        Ok(())
    }
}

/// Fires a bubble in the direction the shooter is facing.
pub fn shoot() -> Command {
    Command::new(SHOOTER, |ctx, shooter, _dt| {
        let facing = ctx.get_component::<Shooter>(shooter)?.facing;
        let position = ctx.get_component::<Transform>(shooter)?.position;

        let bubble = ctx.create_entity();
        ctx.add_component(bubble, Transform::from_position(position))?;
        ctx.add_component(bubble, Bubble::new(Vec2::new(facing * SHOT_SPEED, 0.0)))?;
        ctx.add_component(
            bubble,
            Collider::circle(BUBBLE_RADIUS)
                .dynamic(true)
                .on_collision(bubble_collision),
        )?;

        ctx.post_message(BUBBLE_EVENTS, BubbleEvent::Spawned(bubble));
        Ok(())
    })
}

/// Turns the shooter around and moves it a step.
pub fn step_shooter(direction: f32) -> Command {
    Command::new(SHOOTER, move |ctx, shooter, _dt| {
        ctx.get_component_mut::<Shooter>(shooter)?.facing = direction.signum();

        let transform = ctx.get_component_mut::<Transform>(shooter)?;
        transform.position.x = (transform.position.x + direction * SHOOTER_STEP)
            .clamp(BUBBLE_RADIUS, ROOM_SIZE.x - BUBBLE_RADIUS);
        Ok(())
    })
}

fn bubble_collision(
    ctx: &mut SystemContext<'_>,
    entity: Entity,
    other: Entity,
    manifold: &Manifold,
) -> kinesis::Result {
    // Bubbles share the push between each other, walls don't move
    let share = if ctx.has_component::<Bubble>(other) {
        0.5
    } else {
        1.0
    };
    ctx.get_component_mut::<Transform>(entity)?
        .translate(manifold.normal * manifold.penetration * share);

    let bubble = ctx.get_component_mut::<Bubble>(entity)?;
    match bubble.state {
        BubbleState::Spawning => bubble.settle(),
        BubbleState::Normal => {
            if bubble.velocity.dot(manifold.normal) < 0.0 {
                bubble.velocity = reflect(bubble.velocity, manifold.normal);
            }
        }
    }
    Ok(())
}

/// Builds the room and the shooter. Returns the shooter.
pub fn setup(scene: &mut Scene) -> AnyResult<Entity> {
    scene.add_system(BubbleSystem);
    scene.add_system(CollisionSystem::new());
    scene.add_system(BubbleDirector::default());

    let half_thickness = WALL_THICKNESS / 2.0;
    let walls = [
        (
            Vec2::new(-half_thickness, ROOM_SIZE.y / 2.0),
            Vec2::new(half_thickness, ROOM_SIZE.y),
        ),
        (
            Vec2::new(ROOM_SIZE.x + half_thickness, ROOM_SIZE.y / 2.0),
            Vec2::new(half_thickness, ROOM_SIZE.y),
        ),
        (
            Vec2::new(ROOM_SIZE.x / 2.0, -half_thickness),
            Vec2::new(ROOM_SIZE.x, half_thickness),
        ),
        (
            Vec2::new(ROOM_SIZE.x / 2.0, ROOM_SIZE.y + half_thickness),
            Vec2::new(ROOM_SIZE.x, half_thickness),
        ),
    ];
    for (center, half_extents) in walls {
        let wall = scene.create_entity();
        scene.add_component(wall, Transform::from_position(center))?;
        scene.add_component(wall, Collider::aabb(half_extents))?;
    }

    let shooter = scene.create_entity();
    scene.add_component(
        shooter,
        Transform::from_position(Vec2::new(ROOM_SIZE.x / 2.0, ROOM_SIZE.y - 180.0)),
    )?;
    scene.add_component(shooter, Shooter { facing: 1.0 })?;
    scene.add_component(shooter, CommandTarget::new(SHOOTER))?;

    Ok(shooter)
}

pub fn run(config: SceneConfig, frames: u32) -> AnyResult {
    let mut scene = Scene::with_config(config);
    setup(&mut scene)?;

    info!("Running bubbles for {frames} frames");
    for frame in 0..frames {
        // Walk back and forth across the room, shooting every third of a second
        let key = if (frame / 240) % 2 == 0 {
            Key::Left
        } else {
            Key::Right
        };
        scene
            .forward_event(&InputEvent::KeyPressed(key))
            .otherwise(format!("input handling failed in frame {frame}"))?;
        if frame % 20 == 0 {
            scene
                .forward_event(&InputEvent::KeyPressed(Key::Space))
                .otherwise(format!("input handling failed in frame {frame}"))?;
        }

        scene
            .update(FRAME_TIME)
            .otherwise(format!("frame {frame} failed"))?;
    }

    let director = scene
        .get_system::<BubbleDirector>()
        .otherwise("the bubble director is gone")?;
    info!(
        "Bubbles spawned: {}, popped: {}, still floating: {}",
        director.spawned,
        director.popped,
        scene.universe().get_components::<Bubble>().count()
    );
    report_timings(&scene);
    Ok(())
}
