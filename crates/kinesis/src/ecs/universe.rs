use super::{accessor::EntityAccessor, Component, EcsError, Entity, Requirements};
use ahash::AHashMap;
use kinesis_utils::AsAny;
use log::*;
use std::{any::TypeId, num::NonZeroU32};

/// Amount of [`Universe`] slots to grow by whenever the containers run out of space.
pub const ECS_GROW_AMOUNT: u32 = 50;

/// Entity table and component storage of a scene.
pub struct Universe {
    top_generation: NonZeroU32,
    free_indices: Vec<u32>,
    generations: Vec<Option<NonZeroU32>>,
    stores: AHashMap<TypeId, Box<dyn ComponentStore>>,
    pending_destroy: Vec<Entity>,
    live_count: usize,
    grow_amount: u32,
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

impl Universe {
    /// Creates a blank, empty universe.
    pub fn new() -> Self {
        Self::with_growth(ECS_GROW_AMOUNT)
    }

    /// Creates a blank universe which grows its entity table by `grow_amount` slots at a time.
    pub fn with_growth(grow_amount: u32) -> Self {
        Self {
            top_generation: NonZeroU32::MIN,
            free_indices: vec![],
            generations: vec![],
            stores: AHashMap::new(),
            pending_destroy: vec![],
            live_count: 0,
            grow_amount: grow_amount.max(1),
        }
    }

    /// Allocates a new, empty entity slot.
    ///
    /// ## Panics
    /// Panics on index or generation overflow.
    pub fn create_entity(&mut self) -> Entity {
        if self.free_indices.is_empty() {
            self.alloc_blank_indices(self.grow_amount);
        }

        let index = self
            .free_indices
            .pop()
            .expect("entity table grew without free slots");
        let generation = self.top_generation;
        self.top_generation = generation
            .checked_add(1)
            .expect("ECS generation overflow??");

        self.generations[index as usize] = Some(generation);
        self.live_count += 1;

        Entity { index, generation }
    }

    /// Checks whether provided [`Entity`] constitutes a valid handle.
    #[inline]
    pub fn validate_entity(&self, entity: Entity) -> bool {
        if let Some(&generation) = self.generations.get(entity.index as usize) {
            Some(entity.generation) == generation
        } else {
            false
        }
    }

    /// Like [`Universe::validate_entity`], but produces a usage error for stale handles.
    #[inline]
    pub fn check_entity(&self, entity: Entity) -> Result<(), EcsError> {
        if self.validate_entity(entity) {
            Ok(())
        } else {
            Err(EcsError::StaleEntity(entity))
        }
    }

    /// Destroys an entity right away, dropping all of its components.
    ///
    /// Don't call this while something is iterating over the universe, use
    /// [`Universe::queue_destroy`] instead.
    pub fn delete_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.check_entity(entity)?;

        self.generations[entity.index as usize] = None;
        for store in self.stores.values_mut() {
            store.clear(entity.index);
        }

        self.free_indices.push(entity.index);
        self.live_count -= 1;

        trace!("Destroyed {entity}");
        Ok(())
    }

    /// Schedules an entity for destruction at the next safe point (see [`Universe::flush_destroyed`]).
    /// The handle stays valid until then.
    pub fn queue_destroy(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.check_entity(entity)?;
        if !self.pending_destroy.contains(&entity) {
            self.pending_destroy.push(entity);
        }
        Ok(())
    }

    /// Checks whether the entity is scheduled for destruction.
    pub fn is_queued_for_destroy(&self, entity: Entity) -> bool {
        self.pending_destroy.contains(&entity)
    }

    /// Destroys all entities queued with [`Universe::queue_destroy`], returning how many died.
    pub fn flush_destroyed(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_destroy);
        pending
            .into_iter()
            .filter(|&entity| self.delete_entity(entity).is_ok())
            .count()
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.live_count
    }

    /// Attaches a component to an entity and returns a reference to its stored copy.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<&mut T, EcsError> {
        self.check_entity(entity)?;

        let store = self
            .stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentVec::<T>::new()) as Box<dyn ComponentStore>);
        let store = downcast_store_mut::<T>(&mut **store);

        if store.is_set(entity.index) {
            return Err(EcsError::duplicate::<T>(entity));
        }

        Ok(store.set(entity.index, component))
    }

    /// Detaches a component from an entity, handing it back to the caller.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        self.check_entity(entity)?;
        self.store_mut::<T>()
            .and_then(|store| store.take(entity.index))
            .ok_or_else(|| EcsError::missing::<T>(entity))
    }

    /// Checks whether an entity holds a component. Stale handles hold nothing.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.validate_entity(entity)
            && self
                .store::<T>()
                .map(|store| store.is_set(entity.index))
                .unwrap_or(false)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.check_entity(entity)?;
        self.store::<T>()
            .and_then(|store| store.get(entity.index))
            .ok_or_else(|| EcsError::missing::<T>(entity))
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.check_entity(entity)?;
        self.store_mut::<T>()
            .and_then(|store| store.get_mut(entity.index))
            .ok_or_else(|| EcsError::missing::<T>(entity))
    }

    /// Iterates over all components of a given type, in entity slot order.
    pub fn get_components<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> {
        let generations = &self.generations;
        self.store::<T>()
            .into_iter()
            .flat_map(|store| store.backend.iter().enumerate())
            .filter_map(move |(index, component)| {
                let generation = (*generations.get(index)?)?;
                Some((
                    Entity {
                        index: index as u32,
                        generation,
                    },
                    component.as_ref()?,
                ))
            })
    }

    /// Like [`Universe::get_components`], but hands out mutable references.
    pub fn get_components_mut<T: Component>(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        let generations = &self.generations;
        self.stores
            .get_mut(&TypeId::of::<T>())
            .map(|store| downcast_store_mut::<T>(&mut **store))
            .into_iter()
            .flat_map(|store| store.backend.iter_mut().enumerate())
            .filter_map(move |(index, component)| {
                let generation = (*generations.get(index)?)?;
                Some((
                    Entity {
                        index: index as u32,
                        generation,
                    },
                    component.as_mut()?,
                ))
            })
    }

    /// Returns every live entity holding all of the required component types, in slot order.
    /// Empty requirements match every live entity.
    pub fn query(&self, requirements: &Requirements) -> Vec<Entity> {
        let stores: Option<Vec<&dyn ComponentStore>> = requirements
            .types()
            .iter()
            .map(|type_id| self.stores.get(type_id).map(|store| &**store))
            .collect();

        // A required type that was never stored means nothing can match
        let Some(stores) = stores else {
            return vec![];
        };

        self.iter_entities()
            .filter(|entity| stores.iter().all(|store| store.is_set(entity.index)))
            .collect()
    }

    /// Iterates through all currently live entity handles, in slot order.
    pub fn iter_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.generations
            .iter()
            .enumerate()
            .filter_map(|(index, generation)| {
                Some(Entity {
                    index: index as u32,
                    generation: (*generation)?,
                })
            })
    }

    pub fn access_entity(&self, entity: Entity) -> Result<EntityAccessor<'_>, EcsError> {
        self.check_entity(entity)?;
        Ok(EntityAccessor {
            universe: self,
            entity,
        })
    }

    pub(super) fn store<T: Component>(&self) -> Option<&ComponentVec<T>> {
        self.stores.get(&TypeId::of::<T>()).map(|store| {
            (**store)
                .as_any()
                .downcast_ref()
                .expect("corrupted component store mapping")
        })
    }

    fn store_mut<T: Component>(&mut self) -> Option<&mut ComponentVec<T>> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .map(|store| downcast_store_mut::<T>(&mut **store))
    }

    /// Allocates new blank indices in the free index list.
    fn alloc_blank_indices(&mut self, amount: u32) {
        let top_index = self.generations.len() as u32;
        let new_top_index = top_index.checked_add(amount).expect("ECS index overflow??");
        self.generations.resize(new_top_index as usize, None);
        self.free_indices.extend((top_index..new_top_index).rev());
    }
}

impl Drop for Universe {
    fn drop(&mut self) {
        trace!("Dropping universe with {} live entities", self.live_count);
    }
}

fn downcast_store_mut<T: Component>(store: &mut dyn ComponentStore) -> &mut ComponentVec<T> {
    store
        .as_any_mut()
        .downcast_mut()
        .expect("corrupted component store mapping")
}

/// Type-erased view of a single component type's storage.
pub(crate) trait ComponentStore: AsAny {
    /// Drops the component at the given slot, if there is one.
    fn clear(&mut self, index: u32);

    fn is_set(&self, index: u32) -> bool;
}

/// Vector implementation for storing optional components. Backed by a `Vec<Option<T>>`.
/// Its internal functions make it work more like an "infinitely sized" vector.
pub(crate) struct ComponentVec<T: Component> {
    backend: Vec<Option<T>>,
}

impl<T: Component> ComponentVec<T> {
    pub fn new() -> Self {
        Self { backend: vec![] }
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.backend.get(index as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.backend.get_mut(index as usize).and_then(Option::as_mut)
    }

    /// Sets a specified component, growing the underlying vector if necessary.
    pub fn set(&mut self, index: u32, value: T) -> &mut T {
        let index = index as usize;
        if index >= self.backend.len() {
            self.backend.resize_with(index + 1, || None);
        }
        self.backend[index].insert(value)
    }

    pub fn take(&mut self, index: u32) -> Option<T> {
        self.backend.get_mut(index as usize).and_then(Option::take)
    }
}

impl<T: Component> ComponentStore for ComponentVec<T> {
    fn clear(&mut self, index: u32) {
        // The value is dropped here, which is where things like rigid bodies let go of their
        // solver-side resources.
        drop(self.take(index));
    }

    fn is_set(&self, index: u32) -> bool {
        self.get(index).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[derive(Debug, PartialEq)]
    struct Speed(f32);
    impl Component for Speed {}

    #[test]
    fn fresh_entity_is_empty() {
        let mut universe = Universe::new();
        let entity = universe.create_entity();

        assert!(universe.validate_entity(entity));
        assert!(!universe.has_component::<Health>(entity));
        assert!(!universe.has_component::<Speed>(entity));

        universe.add_component(entity, Health(10)).unwrap();
        assert!(universe.has_component::<Health>(entity));
        assert!(!universe.has_component::<Speed>(entity));
    }

    #[test]
    fn add_returns_stored_component() {
        let mut universe = Universe::new();
        let entity = universe.create_entity();

        universe.add_component(entity, Health(10)).unwrap().0 += 5;
        assert_eq!(universe.get_component::<Health>(entity), Ok(&Health(15)));
    }

    #[test]
    fn duplicate_component_is_rejected() {
        let mut universe = Universe::new();
        let entity = universe.create_entity();

        universe.add_component(entity, Health(1)).unwrap();
        let result = universe.add_component(entity, Health(2)).map(|_| ());
        assert!(matches!(
            result,
            Err(EcsError::DuplicateComponent { entity: e, .. }) if e == entity
        ));

        // The original value survives
        assert_eq!(universe.get_component::<Health>(entity), Ok(&Health(1)));
    }

    #[test]
    fn missing_component_is_an_error() {
        let mut universe = Universe::new();
        let entity = universe.create_entity();
        universe.add_component(entity, Health(1)).unwrap();

        assert!(matches!(
            universe.get_component::<Speed>(entity),
            Err(EcsError::MissingComponent { .. })
        ));
        assert!(universe.get_component_mut::<Speed>(entity).is_err());
        assert!(universe.remove_component::<Speed>(entity).is_err());
    }

    #[test]
    fn stale_handle_is_detected_after_slot_reuse() {
        let mut universe = Universe::new();
        let old = universe.create_entity();
        universe.add_component(old, Health(3)).unwrap();
        universe.delete_entity(old).unwrap();

        let new = universe.create_entity();
        assert_eq!(new.index, old.index);
        assert_ne!(new.generation, old.generation);
        universe.add_component(new, Health(4)).unwrap();

        assert_eq!(
            universe.get_component::<Health>(old),
            Err(EcsError::StaleEntity(old))
        );
        assert!(!universe.has_component::<Health>(old));
        assert_eq!(universe.get_component::<Health>(new), Ok(&Health(4)));
        assert_eq!(universe.delete_entity(old), Err(EcsError::StaleEntity(old)));
    }

    #[test]
    fn deleting_drops_components() {
        use std::{cell::Cell, rc::Rc};

        struct Tracked(Rc<Cell<u32>>);
        impl Component for Tracked {}
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let mut universe = Universe::new();
        let entity = universe.create_entity();
        universe.add_component(entity, Tracked(drops.clone())).unwrap();

        universe.delete_entity(entity).unwrap();
        assert_eq!(drops.get(), 1);
        assert_eq!(universe.entity_count(), 0);
    }

    #[test]
    fn queued_destruction_waits_for_flush() {
        let mut universe = Universe::new();
        let a = universe.create_entity();
        let b = universe.create_entity();

        universe.queue_destroy(a).unwrap();
        universe.queue_destroy(a).unwrap();
        assert!(universe.validate_entity(a));
        assert!(universe.is_queued_for_destroy(a));

        assert_eq!(universe.flush_destroyed(), 1);
        assert!(!universe.validate_entity(a));
        assert!(universe.validate_entity(b));
        assert_eq!(universe.flush_destroyed(), 0);
    }

    #[test]
    fn query_matches_all_requirements() {
        let mut universe = Universe::with_growth(2);
        let both = universe.create_entity();
        let health_only = universe.create_entity();
        let none = universe.create_entity();

        universe.add_component(both, Health(1)).unwrap();
        universe.add_component(both, Speed(1.0)).unwrap();
        universe.add_component(health_only, Health(2)).unwrap();

        let requirements = Requirements::new().with::<Health>().with::<Speed>();
        assert_eq!(universe.query(&requirements), vec![both]);

        let requirements = Requirements::new().with::<Health>();
        assert_eq!(universe.query(&requirements), vec![both, health_only]);

        assert_eq!(
            universe.query(&Requirements::new()),
            vec![both, health_only, none]
        );
    }

    #[test]
    fn component_iteration() {
        let mut universe = Universe::new();
        let a = universe.create_entity();
        let b = universe.create_entity();
        universe.add_component(a, Health(1)).unwrap();
        universe.add_component(b, Health(2)).unwrap();

        for (_, health) in universe.get_components_mut::<Health>() {
            health.0 *= 10;
        }

        let collected: Vec<_> = universe
            .get_components::<Health>()
            .map(|(entity, health)| (entity, health.0))
            .collect();
        assert_eq!(collected, vec![(a, 10), (b, 20)]);
        assert_eq!(universe.get_components::<Speed>().count(), 0);
    }

    #[test]
    fn remove_component_hands_value_back() {
        let mut universe = Universe::new();
        let entity = universe.create_entity();
        universe.add_component(entity, Speed(2.5)).unwrap();

        assert_eq!(universe.remove_component::<Speed>(entity), Ok(Speed(2.5)));
        assert!(!universe.has_component::<Speed>(entity));
        universe.add_component(entity, Speed(1.0)).unwrap();
    }
}
