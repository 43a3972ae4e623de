//! A swarm of glowing bugs trailing the mouse cursor. Bugs circle around the swarm's center,
//! flickering as they go, and never stray further than [`MAX_SPREAD`] from it.

use crate::{report_timings, FRAME_TIME};
use glam::Vec2;
use kinesis::{
    ecs::{
        components::{CommandTarget, Transform},
        Component, Entity, Requirements,
    },
    Command, InputEvent, Scene, SceneConfig, System, SystemContext,
};
use kinesis_utils::{
    vector::{normalise, reflect},
    AnyResult, AnyhowResultExt,
};
use log::*;

pub const BUG_COUNT: usize = 20;
pub const MAX_SPREAD: f32 = 64.0;
pub const SWARM_SPEED: f32 = 240.0;
const BUG_SPEED: f32 = 160.0;
const PULL: f32 = 6.0;
const SWIRL: f32 = 4.0;
const FLICKER: f32 = 3.0;

pub const SWARM: u64 = 1 << 0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bug {
    pub brightness: f32,
    pub velocity: Vec2,
    /// Relative to the swarm's center.
    pub position: Vec2,
}

impl Bug {
    fn update(&mut self, dt: f32, phase: f32) {
        let to_center = -self.position;
        self.velocity += (to_center * PULL + to_center.perp() * SWIRL) * dt;
        self.velocity = self.velocity.clamp_length_max(BUG_SPEED);
        self.position += self.velocity * dt;

        if self.position.length() > MAX_SPREAD {
            self.position = self.position.clamp_length_max(MAX_SPREAD);
            if self.velocity.dot(self.position) > 0.0 {
                self.velocity = reflect(self.velocity, -normalise(self.position));
            }
        }

        self.brightness = 0.5 + 0.5 * phase.sin();
    }
}

#[derive(Debug, Clone)]
pub struct Swarm {
    pub bugs: [Bug; BUG_COUNT],
    /// Where the swarm is heading.
    pub goal: Vec2,
}

impl Component for Swarm {}

impl Swarm {
    /// Spreads the bugs over a sunflower pattern around `goal`.
    pub fn new(goal: Vec2) -> Self {
        let golden_angle = std::f32::consts::PI * (3.0 - 5f32.sqrt());
        let bugs = std::array::from_fn(|i| {
            let distance = MAX_SPREAD * 0.5 * ((i + 1) as f32 / BUG_COUNT as f32).sqrt();
            let angle = i as f32 * golden_angle;
            Bug {
                brightness: 1.0,
                velocity: Vec2::ZERO,
                position: Vec2::new(angle.cos(), angle.sin()) * distance,
            }
        });
        Self { bugs, goal }
    }
}

#[derive(Debug, Default)]
pub struct SwarmSystem {
    time: f32,
}

impl System for SwarmSystem {
    fn label(&self) -> &'static str {
        "Swarm System"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().with::<Swarm>().with::<Transform>()
    }

    fn process(&mut self, ctx: &mut SystemContext) -> kinesis::Result {
        let dt = ctx.dt;
        self.time += dt;

        for entity in ctx.entities() {
            let swarm = ctx.get_component_mut::<Swarm>(entity)?;
            for (i, bug) in swarm.bugs.iter_mut().enumerate() {
                bug.update(dt, self.time * FLICKER + i as f32);
            }
            let goal = swarm.goal;

            let transform = ctx.get_component_mut::<Transform>(entity)?;
            let offset = goal - transform.position;
            transform.translate(offset.clamp_length_max(SWARM_SPEED * dt));
        }
        Ok(())
    }
}

/// Points the swarm at the mouse cursor.
#[derive(Debug, Default)]
pub struct SwarmDirector;

impl System for SwarmDirector {
    fn label(&self) -> &'static str {
        "Swarm Director"
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut SystemContext) -> kinesis::Result {
        if let InputEvent::MouseMoved(position) = *event {
            ctx.send_command(move_swarm(position));
        }
        Ok(())
    }

    fn process(&mut self, _ctx: &mut SystemContext) -> kinesis::Result {
        Ok(())
    }
}

pub fn move_swarm(goal: Vec2) -> Command {
    Command::new(SWARM, move |ctx, swarm, _dt| {
        ctx.get_component_mut::<Swarm>(swarm)?.goal = goal;
        Ok(())
    })
}

/// Spawns a swarm at `position`.
pub fn setup(scene: &mut Scene, position: Vec2) -> AnyResult<Entity> {
    scene.add_system(SwarmSystem::default());
    scene.add_system(SwarmDirector);

    let swarm = scene.create_entity();
    scene.add_component(swarm, Transform::from_position(position))?;
    scene.add_component(swarm, Swarm::new(position))?;
    scene.add_component(swarm, CommandTarget::new(SWARM))?;
    Ok(swarm)
}

pub fn run(config: SceneConfig, frames: u32) -> AnyResult {
    let center = Vec2::new(960.0, 540.0);
    let mut scene = Scene::with_config(config);
    let swarm = setup(&mut scene, center)?;

    info!("Running swarm for {frames} frames");
    for frame in 0..frames {
        // The cursor circles around the middle of the screen, one lap every 4 seconds
        let angle = frame as f32 * FRAME_TIME * std::f32::consts::FRAC_PI_2;
        let cursor = center + Vec2::new(angle.cos(), angle.sin()) * 300.0;
        scene
            .forward_event(&InputEvent::MouseMoved(cursor))
            .otherwise(format!("input handling failed in frame {frame}"))?;

        scene
            .update(FRAME_TIME)
            .otherwise(format!("frame {frame} failed"))?;
    }

    let position = scene
        .get_component::<Transform>(swarm)
        .otherwise("the swarm lost its transform")?
        .position;
    let bugs = &scene
        .get_component::<Swarm>(swarm)
        .otherwise("the swarm is gone")?
        .bugs;
    let brightness = bugs.iter().map(|bug| bug.brightness).sum::<f32>() / BUG_COUNT as f32;
    let spread = bugs
        .iter()
        .map(|bug| bug.position.length())
        .fold(0.0, f32::max);
    info!(
        "Swarm ended up at {position}, spread over {spread:.1} units, average brightness \
         {brightness:.2}"
    );
    report_timings(&scene);
    Ok(())
}
