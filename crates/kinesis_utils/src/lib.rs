//! Various utilities shared by the Kinesis crates

use std::any::Any;

pub mod vector;

mod pool;
pub use pool::*;

mod result_ext;
pub use result_ext::AnyhowResultExt;

pub type AnyResult<T = (), E = anyhow::Error> = anyhow::Result<T, E>;

/// Shorthand for `Ok(())`, cause it looks ugly
pub const fn ok<E>() -> Result<(), E> {
    Ok(())
}

/// Upcasting helper for trait objects that need to be downcast back to their concrete type.
///
/// It's blanket implemented for every `'static` type, so trait definitions only have to add it as
/// a supertrait.
///
/// ## Example
/// ```
/// use kinesis_utils::AsAny;
///
/// trait Named: AsAny {}
/// struct Alice;
/// impl Named for Alice {}
///
/// let boxed: Box<dyn Named> = Box::new(Alice);
/// assert!(boxed.as_ref().as_any().downcast_ref::<Alice>().is_some());
/// ```
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
