use std::sync::Arc;

/// A source of unique identifiers in string form.
///
/// This is the contract shared by every ID scheme in the toolkit: no
/// parameters, no error outcome, and a fresh unique string on each call.
/// Callers that only need "some unique ID" should depend on this trait so the
/// underlying scheme can be swapped.
///
/// The trait is object safe:
///
/// ```
/// use std::sync::Arc;
/// use toolkit_id::{IdGenerator, SnowflakeGenerator, DEFAULT_EPOCH_MILLIS};
///
/// let generator: Arc<dyn IdGenerator> =
///     Arc::new(SnowflakeGenerator::new(0, 1, DEFAULT_EPOCH_MILLIS as i64).unwrap());
/// let id = generator.generate_id();
/// assert!(id.bytes().all(|b| b.is_ascii_digit()));
/// ```
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier.
    fn generate_id(&self) -> String;
}

impl<G: IdGenerator + ?Sized> IdGenerator for &G {
    fn generate_id(&self) -> String {
        (**self).generate_id()
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for Arc<G> {
    fn generate_id(&self) -> String {
        (**self).generate_id()
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for Box<G> {
    fn generate_id(&self) -> String {
        (**self).generate_id()
    }
}
