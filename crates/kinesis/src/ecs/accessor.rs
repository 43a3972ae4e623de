use super::{Component, EcsError, Entity, Universe};

/// Wrapper for reading components from a single entity inside a universe.
/// The handle is validated once on creation, so repeated reads skip the generation check.
pub struct EntityAccessor<'uni> {
    pub(super) universe: &'uni Universe,
    pub(super) entity: Entity,
}

impl<'uni> EntityAccessor<'uni> {
    pub fn universe(&self) -> &'uni Universe {
        self.universe
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn get_component<T: Component>(&self) -> Result<&'uni T, EcsError> {
        self.universe
            .store::<T>()
            .and_then(|store| store.get(self.entity.index))
            .ok_or_else(|| EcsError::missing::<T>(self.entity))
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.universe
            .store::<T>()
            .map(|store| store.get(self.entity.index).is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::ecs::{components::Transform, EcsError, Universe};
    use glam::Vec2;

    #[test]
    fn accessor_reads_components() {
        let mut universe = Universe::new();
        let entity = universe.create_entity();
        universe
            .add_component(entity, Transform::from_position(Vec2::new(1.0, 2.0)))
            .unwrap();

        let accessor = universe.access_entity(entity).unwrap();
        assert_eq!(accessor.entity(), entity);
        assert!(accessor.has_component::<Transform>());
        assert_eq!(
            accessor.get_component::<Transform>().unwrap().position,
            Vec2::new(1.0, 2.0)
        );

        universe.delete_entity(entity).unwrap();
        assert!(matches!(
            universe.access_entity(entity),
            Err(EcsError::StaleEntity(_))
        ));
    }
}
