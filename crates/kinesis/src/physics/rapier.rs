//! [`PhysicsWorld`] implementation backed by [`rapier2d`].

use super::{
    BodyDef, BodyHandle, BodyProperty, BodySnapshot, BodyType, CollisionShape, FixtureHandle,
    PhysicsError, PhysicsWorld, ShapeKind,
};
use glam::Vec2;
use kinesis_utils::{Pool, PoolHandle};
use log::*;
use rapier2d::prelude::*;
use smallvec::SmallVec;

struct BodyEntry {
    handle: RigidBodyHandle,
    fixtures: SmallVec<[PoolHandle; 2]>,
}

/// Rapier works in meters, scenes work in whatever units they please. Everything crossing the
/// boundary is divided by `pixels_per_meter` on the way in and multiplied on the way out.
pub struct RapierWorld {
    gravity: Vector<Real>,
    pixels_per_meter: f32,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    body_entries: Pool<BodyEntry>,
    fixture_entries: Pool<ColliderHandle>,
}

impl RapierWorld {
    /// Creates an empty world. `gravity` is in scene units per second squared.
    ///
    /// ## Panics
    /// Panics if `pixels_per_meter` isn't a positive number.
    pub fn new(gravity: Vec2, pixels_per_meter: f32) -> Self {
        assert!(
            pixels_per_meter.is_finite() && pixels_per_meter > 0.0,
            "invalid pixels per meter value {pixels_per_meter}"
        );

        let mut world = Self {
            gravity: vector![0.0, 0.0],
            pixels_per_meter,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            body_entries: Pool::new(),
            fixture_entries: Pool::new(),
        };
        world.set_gravity(gravity);
        world
    }

    pub fn from_config(config: &crate::scene::config::PhysicsConfig) -> Self {
        Self::new(config.gravity, config.pixels_per_meter)
    }

    pub fn pixels_per_meter(&self) -> f32 {
        self.pixels_per_meter
    }

    pub fn fixture_count(&self) -> usize {
        self.fixture_entries.len()
    }

    fn to_solver(&self, v: Vec2) -> Vector<Real> {
        vector![v.x / self.pixels_per_meter, v.y / self.pixels_per_meter]
    }

    fn to_solver_point(&self, v: Vec2) -> Point<Real> {
        point![v.x / self.pixels_per_meter, v.y / self.pixels_per_meter]
    }

    fn from_solver(&self, v: &Vector<Real>) -> Vec2 {
        Vec2::new(v.x, v.y) * self.pixels_per_meter
    }

    fn scale(&self, length: f32) -> f32 {
        length / self.pixels_per_meter
    }

    fn solver_body(&mut self, body: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        let entry = self
            .body_entries
            .try_get(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?;
        self.bodies
            .get_mut(entry.handle)
            .ok_or(PhysicsError::UnknownBody(body))
    }

    fn build_collider(&self, shape: &CollisionShape) -> Result<ColliderBuilder, PhysicsError> {
        shape.validate()?;

        let builder = match &shape.kind {
            ShapeKind::Circle { radius, offset } => {
                ColliderBuilder::ball(self.scale(*radius)).translation(self.to_solver(*offset))
            }
            ShapeKind::Box {
                half_extents,
                offset,
                rotation,
            } => ColliderBuilder::cuboid(self.scale(half_extents.x), self.scale(half_extents.y))
                .translation(self.to_solver(*offset))
                .rotation(*rotation),
            ShapeKind::Polygon { points } => {
                let points: Vec<Point<Real>> =
                    points.iter().map(|p| self.to_solver_point(*p)).collect();
                // Collinear points still produce a hull, just without any area
                ColliderBuilder::convex_hull(&points)
                    .filter(|builder| {
                        builder
                            .shape
                            .as_convex_polygon()
                            .map_or(false, |hull| hull.points().len() >= 3)
                    })
                    .ok_or(PhysicsError::InvalidShape("degenerate convex hull"))?
            }
            ShapeKind::Edge { a, b } => {
                ColliderBuilder::segment(self.to_solver_point(*a), self.to_solver_point(*b))
            }
        };

        let material = &shape.material;
        Ok(builder
            .density(material.density)
            .friction(material.friction)
            .restitution(material.restitution)
            .sensor(material.sensor))
    }
}

impl PhysicsWorld for RapierWorld {
    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let builder = match def.body_type {
            BodyType::Static => RigidBodyBuilder::fixed(),
            BodyType::Dynamic => RigidBodyBuilder::dynamic(),
            BodyType::Kinematic => RigidBodyBuilder::kinematic_velocity_based(),
        };

        let mut builder = builder
            .translation(self.to_solver(def.position))
            .rotation(def.rotation)
            .linvel(self.to_solver(def.linear_velocity))
            .angvel(def.angular_velocity)
            .linear_damping(def.linear_damping)
            .angular_damping(def.angular_damping)
            .can_sleep(def.allow_sleep)
            .sleeping(!def.awake)
            .ccd_enabled(def.bullet)
            .gravity_scale(def.gravity_scale)
            .enabled(def.active);
        if def.fixed_rotation {
            builder = builder.lock_rotations();
        }

        let handle = self.bodies.insert(builder.build());
        BodyHandle(self.body_entries.allocate(BodyEntry {
            handle,
            fixtures: SmallVec::new(),
        }))
    }

    fn destroy_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError> {
        let entry = self
            .body_entries
            .deallocate(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?;

        for fixture in entry.fixtures {
            self.fixture_entries.deallocate(fixture);
        }

        // Removing the body takes its colliders along with it
        if self
            .bodies
            .remove(
                entry.handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_none()
        {
            warn!("Rapier body {:?} vanished before removal", entry.handle);
        }

        Ok(())
    }

    fn create_fixture(
        &mut self,
        body: BodyHandle,
        shape: &CollisionShape,
    ) -> Result<FixtureHandle, PhysicsError> {
        let rapier_body = self
            .body_entries
            .try_get(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?
            .handle;
        let collider = self.build_collider(shape)?.build();

        let collider =
            self.colliders
                .insert_with_parent(collider, rapier_body, &mut self.bodies);
        let fixture = self.fixture_entries.allocate(collider);
        self.body_entries.get_mut(body.0).fixtures.push(fixture);

        Ok(FixtureHandle(fixture))
    }

    fn set_body_property(
        &mut self,
        body: BodyHandle,
        property: BodyProperty,
    ) -> Result<(), PhysicsError> {
        let ppm = self.pixels_per_meter;
        let rapier_body = self.solver_body(body)?;

        match property {
            BodyProperty::LinearVelocity(v) => {
                rapier_body.set_linvel(vector![v.x / ppm, v.y / ppm], true)
            }
            BodyProperty::AngularVelocity(w) => rapier_body.set_angvel(w, true),
            BodyProperty::LinearDamping(d) => rapier_body.set_linear_damping(d),
            BodyProperty::AngularDamping(d) => rapier_body.set_angular_damping(d),
            BodyProperty::AllowSleep(allow) => {
                *rapier_body.activation_mut() = if allow {
                    RigidBodyActivation::active()
                } else {
                    RigidBodyActivation::cannot_sleep()
                };
            }
            BodyProperty::Awake(true) => rapier_body.wake_up(true),
            BodyProperty::Awake(false) => rapier_body.sleep(),
            BodyProperty::FixedRotation(fixed) => rapier_body.lock_rotations(fixed, true),
            BodyProperty::Bullet(bullet) => rapier_body.enable_ccd(bullet),
            BodyProperty::Active(active) => rapier_body.set_enabled(active),
            BodyProperty::GravityScale(scale) => rapier_body.set_gravity_scale(scale, true),
            BodyProperty::Placement { position, rotation } => rapier_body.set_position(
                Isometry::new(vector![position.x / ppm, position.y / ppm], rotation),
                true,
            ),
        }

        Ok(())
    }

    fn body_state(&self, body: BodyHandle) -> Option<BodySnapshot> {
        let entry = self.body_entries.try_get(body.0)?;
        let rapier_body = self.bodies.get(entry.handle)?;

        Some(BodySnapshot {
            position: self.from_solver(rapier_body.translation()),
            rotation: rapier_body.rotation().angle(),
            linear_velocity: self.from_solver(rapier_body.linvel()),
            angular_velocity: rapier_body.angvel(),
            awake: !rapier_body.is_sleeping(),
        })
    }

    fn body_count(&self) -> usize {
        self.body_entries.len()
    }

    fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = self.to_solver(gravity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falling_body_accelerates() {
        let mut world = RapierWorld::new(Vec2::new(0.0, -10.0), 1.0);
        let body = world.create_body(&BodyDef {
            position: Vec2::new(0.0, 100.0),
            ..BodyDef::new(BodyType::Dynamic)
        });
        world
            .create_fixture(body, &CollisionShape::circle(1.0))
            .unwrap();

        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }

        let state = world.body_state(body).unwrap();
        assert!(state.position.y < 100.0 - 4.0);
        assert!(state.linear_velocity.y < -9.0);
    }

    #[test]
    fn scale_is_applied_both_ways() {
        let mut world = RapierWorld::new(Vec2::ZERO, 32.0);
        let body = world.create_body(&BodyDef {
            position: Vec2::new(64.0, -32.0),
            linear_velocity: Vec2::new(32.0, 0.0),
            ..BodyDef::new(BodyType::Kinematic)
        });

        let state = world.body_state(body).unwrap();
        assert!((state.position - Vec2::new(64.0, -32.0)).length() < 1e-4);

        world.step(0.5);
        let state = world.body_state(body).unwrap();
        assert!((state.position - Vec2::new(80.0, -32.0)).length() < 1e-3);
    }

    #[test]
    fn destroying_removes_fixtures() {
        let mut world = RapierWorld::new(Vec2::ZERO, 1.0);
        let body = world.create_body(&BodyDef::new(BodyType::Dynamic));
        world
            .create_fixture(body, &CollisionShape::circle(1.0))
            .unwrap();
        world
            .create_fixture(body, &CollisionShape::rectangle(Vec2::ONE))
            .unwrap();
        assert_eq!(world.fixture_count(), 2);

        world.destroy_body(body).unwrap();
        assert_eq!(world.fixture_count(), 0);
        assert_eq!(world.body_count(), 0);
        assert!(world.body_state(body).is_none());
        assert_eq!(
            world.destroy_body(body),
            Err(PhysicsError::UnknownBody(body))
        );
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        let mut world = RapierWorld::new(Vec2::ZERO, 1.0);
        let body = world.create_body(&BodyDef::new(BodyType::Dynamic));

        let line = CollisionShape::polygon(vec![
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
        ]);
        assert!(line.validate().is_ok());
        assert!(matches!(
            world.create_fixture(body, &line),
            Err(PhysicsError::InvalidShape(_))
        ));
        assert_eq!(world.fixture_count(), 0);

        let triangle =
            CollisionShape::polygon(vec![Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)]);
        assert!(world.create_fixture(body, &triangle).is_ok());
    }
}
