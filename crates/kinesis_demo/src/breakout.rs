//! Paddle and ball. The paddle is moved and fires the ball through commands sent from input
//! events, a lost ball is reported over the bus and respawned by a command, and bounces happen in
//! the ball's collision callback.

use crate::{report_timings, FRAME_TIME};
use glam::Vec2;
use kinesis::{
    collision::{Collider, CollisionSystem, Manifold},
    ecs::{
        components::{CommandTarget, Transform},
        Component, Entity, Requirements,
    },
    message_id,
    scene::MouseButton,
    Command, InputEvent, Message, MessageId, Scene, SceneConfig, System, SystemContext,
};
use kinesis_utils::{
    vector::{normalise, reflect},
    AnyResult, AnyhowResultExt,
};
use log::*;

pub const SCENE_SIZE: Vec2 = Vec2::new(1920.0, 1080.0);
pub const PADDLE_HALF_EXTENTS: Vec2 = Vec2::new(100.0, 12.0);
pub const BALL_RADIUS: f32 = 10.0;
pub const BALL_SPEED: f32 = 700.0;
const WALL_THICKNESS: f32 = 40.0;

/// How fast the scripted player moves the mouse, in units per second.
const AUTOPILOT_SPEED: f32 = 900.0;
/// Frames the scripted player waits before firing a ball.
const AUTOPILOT_LAUNCH_DELAY: u32 = 45;

pub mod targets {
    pub const PADDLE: u64 = 1 << 0;
    pub const BALL: u64 = 1 << 1;
}

pub const BALL_EVENTS: MessageId = MessageId(message_id::USER.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallEvent {
    Launched(Entity),
    Despawned(Entity),
}

#[derive(Debug, Default)]
pub struct Paddle {
    /// Ball waiting to be fired.
    pub ball: Option<Entity>,
}

impl Component for Paddle {}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ball {
    pub velocity: Vec2,
    /// Inactive balls sit on the paddle.
    pub active: bool,
}

impl Component for Ball {}

fn paddle_y() -> f32 {
    SCENE_SIZE.y - 40.0
}

/// Moves active balls and gets rid of the ones that fell off the bottom of the screen.
pub struct BallSystem;

impl System for BallSystem {
    fn label(&self) -> &'static str {
        "Ball System"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().with::<Ball>().with::<Transform>()
    }

    fn process(&mut self, ctx: &mut SystemContext) -> kinesis::Result {
        let dt = ctx.dt;
        for entity in ctx.entities() {
            let ball = *ctx.get_component::<Ball>(entity)?;
            if !ball.active {
                continue;
            }

            let transform = ctx.get_component_mut::<Transform>(entity)?;
            transform.translate(ball.velocity * dt);

            if transform.position.y - BALL_RADIUS > SCENE_SIZE.y {
                ctx.destroy_entity(entity)?;
                ctx.post_message(BALL_EVENTS, BallEvent::Despawned(entity));
            }
        }
        Ok(())
    }
}

/// Turns player input into commands and keeps a ball in play.
#[derive(Debug, Default)]
pub struct BreakoutDirector {
    pub launched: u32,
    pub lost: u32,
    pub contacts: u32,
}

impl System for BreakoutDirector {
    fn label(&self) -> &'static str {
        "Breakout Director"
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut SystemContext) -> kinesis::Result {
        match *event {
            InputEvent::MouseMoved(position) => ctx.send_command(move_paddle(position.x)),
            InputEvent::MouseButtonReleased(MouseButton::Left) => ctx.send_command(launch_ball()),
            _ => {}
        }
        Ok(())
    }

    fn handle_message(&mut self, message: &Message, ctx: &mut SystemContext) -> kinesis::Result {
        if message.id() == message_id::CONTACT {
            self.contacts += 1;
            return Ok(());
        }

        match message.data_if::<BallEvent>(BALL_EVENTS) {
            Some(BallEvent::Launched(ball)) => {
                trace!("{ball} launched");
                self.launched += 1;
            }
            Some(BallEvent::Despawned(ball)) => {
                debug!("{ball} lost, spawning a new one");
                self.lost += 1;
                ctx.send_command(spawn_ball());
            }
            None => {}
        }
        Ok(())
    }

    fn process(&mut self, _ctx: &mut SystemContext) -> kinesis::Result {
        Ok(())
    }
}

/// Places a new ball on top of the paddle.
pub fn spawn_ball() -> Command {
    Command::new(targets::PADDLE, |ctx, paddle, _dt| {
        let position = ctx.get_component::<Transform>(paddle)?.position;

        let ball = ctx.create_entity();
        ctx.add_component(
            ball,
            Transform::from_position(Vec2::new(
                position.x,
                position.y - PADDLE_HALF_EXTENTS.y - BALL_RADIUS - 1.0,
            )),
        )?;
        ctx.add_component(ball, Ball::default())?;
        ctx.add_component(ball, CommandTarget::new(targets::BALL))?;
        ctx.add_component(
            ball,
            Collider::circle(BALL_RADIUS)
                .dynamic(true)
                .on_collision(bounce_ball),
        )?;

        ctx.get_component_mut::<Paddle>(paddle)?.ball = Some(ball);
        Ok(())
    })
}

/// Moves the paddle horizontally, dragging along the ball it holds.
pub fn move_paddle(x: f32) -> Command {
    Command::new(targets::PADDLE, move |ctx, paddle, _dt| {
        let x = x.clamp(
            PADDLE_HALF_EXTENTS.x,
            SCENE_SIZE.x - PADDLE_HALF_EXTENTS.x,
        );
        ctx.get_component_mut::<Transform>(paddle)?.position.x = x;

        if let Some(ball) = ctx.get_component::<Paddle>(paddle)?.ball {
            if ctx.universe.validate_entity(ball) {
                ctx.get_component_mut::<Transform>(ball)?.position.x = x;
            }
        }
        Ok(())
    })
}

/// Fires the ball held by the paddle, if there's one.
pub fn launch_ball() -> Command {
    Command::new(targets::PADDLE, |ctx, paddle, _dt| {
        let Some(ball) = ctx.get_component_mut::<Paddle>(paddle)?.ball.take() else {
            return Ok(());
        };
        if !ctx.universe.validate_entity(ball) {
            return Ok(());
        }

        let state = ctx.get_component_mut::<Ball>(ball)?;
        state.active = true;
        state.velocity = normalise(Vec2::new(0.5, -1.0)) * BALL_SPEED;

        ctx.post_message(BALL_EVENTS, BallEvent::Launched(ball));
        Ok(())
    })
}

/// Off the paddle, the ball flies away from the paddle's center. Off anything else it's
/// reflected.
fn bounce_ball(
    ctx: &mut SystemContext<'_>,
    ball: Entity,
    other: Entity,
    manifold: &Manifold,
) -> kinesis::Result {
    if !ctx.get_component::<Ball>(ball)?.active {
        return Ok(());
    }

    let other_position = ctx.get_component::<Transform>(other)?.position;
    let hit_paddle = ctx.has_component::<Paddle>(other);

    let transform = ctx.get_component_mut::<Transform>(ball)?;
    transform.translate(manifold.normal * manifold.penetration);
    let position = transform.position;

    let state = ctx.get_component_mut::<Ball>(ball)?;
    if hit_paddle {
        state.velocity = normalise(position - other_position) * BALL_SPEED;
    } else if state.velocity.dot(manifold.normal) < 0.0 {
        state.velocity = reflect(state.velocity, manifold.normal);
    }
    Ok(())
}

/// Creates the walls and the paddle, and queues up the first ball. Returns the paddle.
pub fn setup(scene: &mut Scene) -> AnyResult<Entity> {
    scene.add_system(BallSystem);
    scene.add_system(CollisionSystem::new());
    scene.add_system(BreakoutDirector::default());

    let walls = [
        (
            Vec2::new(-WALL_THICKNESS / 2.0, SCENE_SIZE.y / 2.0),
            Vec2::new(WALL_THICKNESS / 2.0, SCENE_SIZE.y),
        ),
        (
            Vec2::new(SCENE_SIZE.x + WALL_THICKNESS / 2.0, SCENE_SIZE.y / 2.0),
            Vec2::new(WALL_THICKNESS / 2.0, SCENE_SIZE.y),
        ),
        (
            Vec2::new(SCENE_SIZE.x / 2.0, -WALL_THICKNESS / 2.0),
            Vec2::new(SCENE_SIZE.x, WALL_THICKNESS / 2.0),
        ),
    ];
    for (center, half_extents) in walls {
        let wall = scene.create_entity();
        scene.add_component(wall, Transform::from_position(center))?;
        scene.add_component(wall, Collider::aabb(half_extents))?;
    }

    let paddle = scene.create_entity();
    scene.add_component(
        paddle,
        Transform::from_position(Vec2::new(SCENE_SIZE.x / 2.0, paddle_y())),
    )?;
    scene.add_component(paddle, Paddle::default())?;
    scene.add_component(paddle, CommandTarget::new(targets::PADDLE))?;
    scene.add_component(paddle, Collider::aabb(PADDLE_HALF_EXTENTS))?;

    scene.send_command(spawn_ball());
    Ok(paddle)
}

/// Scripted player: chases the active ball with the mouse and fires held balls after a short
/// wait.
struct Autopilot {
    mouse_x: f32,
    held_frames: u32,
}

impl Autopilot {
    fn new() -> Self {
        Self {
            mouse_x: SCENE_SIZE.x / 2.0,
            held_frames: 0,
        }
    }

    fn drive(&mut self, scene: &mut Scene, paddle: Entity) -> kinesis::Result {
        let target = scene
            .universe()
            .get_components::<Ball>()
            .find(|(_, ball)| ball.active)
            .map(|(entity, _)| entity);

        if let Some(ball) = target {
            let ball_x = scene.get_component::<Transform>(ball)?.position.x;
            let step = AUTOPILOT_SPEED * FRAME_TIME;
            self.mouse_x += (ball_x - self.mouse_x).clamp(-step, step);
        }
        scene.forward_event(&InputEvent::MouseMoved(Vec2::new(self.mouse_x, paddle_y())))?;

        if scene.get_component::<Paddle>(paddle)?.ball.is_some() {
            self.held_frames += 1;
            if self.held_frames >= AUTOPILOT_LAUNCH_DELAY {
                self.held_frames = 0;
                scene.forward_event(&InputEvent::MouseButtonReleased(MouseButton::Left))?;
            }
        }
        Ok(())
    }
}

pub fn run(config: SceneConfig, frames: u32) -> AnyResult {
    let mut scene = Scene::with_config(config);
    let paddle = setup(&mut scene)?;
    let mut autopilot = Autopilot::new();

    info!("Running breakout for {frames} frames");
    for frame in 0..frames {
        autopilot
            .drive(&mut scene, paddle)
            .otherwise(format!("input handling failed in frame {frame}"))?;
        scene
            .update(FRAME_TIME)
            .otherwise(format!("frame {frame} failed"))?;
    }

    let director = scene
        .get_system::<BreakoutDirector>()
        .otherwise("the breakout director is gone")?;
    info!(
        "Balls launched: {}, lost: {}, contacts: {}",
        director.launched, director.lost, director.contacts
    );
    report_timings(&scene);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_scene() -> (Scene, Entity) {
        let mut scene = Scene::new();
        let paddle = setup(&mut scene).unwrap();
        scene.update(FRAME_TIME).unwrap();
        (scene, paddle)
    }

    fn held_ball(scene: &Scene, paddle: Entity) -> Entity {
        scene
            .get_component::<Paddle>(paddle)
            .unwrap()
            .ball
            .expect("the paddle should hold a ball")
    }

    #[test]
    fn paddle_follows_the_mouse() {
        let (mut scene, paddle) = new_scene();
        let ball = held_ball(&scene, paddle);

        scene
            .forward_event(&InputEvent::MouseMoved(Vec2::new(-500.0, 0.0)))
            .unwrap();
        scene.update(FRAME_TIME).unwrap();

        let paddle_x = scene.get_component::<Transform>(paddle).unwrap().position.x;
        assert_eq!(paddle_x, PADDLE_HALF_EXTENTS.x);
        assert_eq!(
            scene.get_component::<Transform>(ball).unwrap().position.x,
            paddle_x
        );

        scene
            .forward_event(&InputEvent::MouseMoved(Vec2::new(1000.0, 0.0)))
            .unwrap();
        scene.update(FRAME_TIME).unwrap();
        assert_eq!(
            scene.get_component::<Transform>(paddle).unwrap().position.x,
            1000.0
        );
    }

    #[test]
    fn ball_bounces_off_the_ceiling() {
        let (mut scene, _) = new_scene();

        let ball = scene.create_entity();
        scene
            .add_component(ball, Transform::from_position(Vec2::new(960.0, 20.0)))
            .unwrap();
        scene
            .add_component(
                ball,
                Ball {
                    velocity: Vec2::new(0.0, -BALL_SPEED),
                    active: true,
                },
            )
            .unwrap();
        scene
            .add_component(
                ball,
                Collider::circle(BALL_RADIUS)
                    .dynamic(true)
                    .on_collision(bounce_ball),
            )
            .unwrap();

        scene.update(FRAME_TIME).unwrap();

        let state = scene.get_component::<Ball>(ball).unwrap();
        assert_eq!(state.velocity, Vec2::new(0.0, BALL_SPEED));
        let y = scene.get_component::<Transform>(ball).unwrap().position.y;
        assert!((y - BALL_RADIUS).abs() < 1e-3);

        scene.update(FRAME_TIME).unwrap();
        assert_eq!(
            scene.get_system::<BreakoutDirector>().unwrap().contacts,
            1
        );
    }

    #[test]
    fn lost_ball_is_respawned() {
        let (mut scene, paddle) = new_scene();
        let first = held_ball(&scene, paddle);

        scene
            .forward_event(&InputEvent::MouseButtonReleased(MouseButton::Left))
            .unwrap();
        scene.update(FRAME_TIME).unwrap();
        assert!(scene.get_component::<Ball>(first).unwrap().active);
        assert!(scene.get_component::<Paddle>(paddle).unwrap().ball.is_none());

        scene
            .get_component_mut::<Transform>(first)
            .unwrap()
            .position
            .y = SCENE_SIZE.y + 100.0;

        // Falls off, then the loss is reported and handled a frame later
        scene.update(FRAME_TIME).unwrap();
        assert!(!scene.universe().validate_entity(first));
        scene.update(FRAME_TIME).unwrap();

        let second = held_ball(&scene, paddle);
        assert_ne!(first, second);

        let director = scene.get_system::<BreakoutDirector>().unwrap();
        assert_eq!(director.launched, 1);
        assert_eq!(director.lost, 1);
    }
}
