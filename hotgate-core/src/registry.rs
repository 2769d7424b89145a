//! # Schema Registry
//!
//! The [`SchemaRegistry`] owns the active [`Snapshot`] and is the only state shared between
//! concurrent requests.
//!
//! ## Concurrency
//!
//! * **Reads** ([`SchemaRegistry::lookup`], [`SchemaRegistry::snapshot`]) go through an
//!   [`ArcSwap`] and never block, not even while a reload is in progress.
//! * **Reloads** build the new snapshot completely off to the side, then publish it with a
//!   single atomic pointer store. Reloads are serialized by a writer lock so generations
//!   are assigned in publish order.
//!
//! Readers observe either the previous snapshot or the new one in full. A request that
//! grabbed a snapshot keeps it alive until it completes, after which the old snapshot is
//! dropped.
use crate::{
    dispatch::RoutingError,
    schema::{MethodDescriptor, SchemaError, Snapshot},
};
use arc_swap::ArcSwap;
use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{info, warn};

/// The IDL document compiled into the gateway, used when no other document is configured.
pub const BUNDLED_IDL: &str = include_str!("../idl/bundled.thrift");

/// Holds the active schema snapshot and swaps it on reload.
#[derive(Debug)]
pub struct SchemaRegistry {
    active: ArcSwap<Snapshot>,
    writer: Mutex<()>,
}

impl SchemaRegistry {
    /// Builds a registry whose first snapshot comes from `source`.
    ///
    /// # Errors
    ///
    /// Returns the [`SchemaError`] of the initial document.
    pub fn new(source: &str) -> Result<Self, SchemaError> {
        let snapshot = Self::load(source)?.with_generation(1);
        Ok(Self {
            active: ArcSwap::from_pointee(snapshot),
            writer: Mutex::new(()),
        })
    }

    /// Builds a registry from [`BUNDLED_IDL`].
    pub fn bundled() -> Result<Self, SchemaError> {
        Self::new(BUNDLED_IDL)
    }

    /// Parses and validates a document without publishing it.
    pub fn load(source: &str) -> Result<Snapshot, SchemaError> {
        Snapshot::load(source)
    }

    /// Replaces the active snapshot with one built from `source`.
    ///
    /// On success the new snapshot is published and its generation returned. On failure
    /// the active snapshot is left untouched and keeps serving requests.
    ///
    /// # Errors
    ///
    /// Returns the parse or validation error of the rejected document.
    pub fn reload(&self, source: &str) -> Result<u64, SchemaError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let generation = self.active.load().generation() + 1;
        match Self::load(source) {
            Ok(snapshot) => {
                let snapshot = snapshot.with_generation(generation);
                let services = snapshot.services().count();
                self.active.store(Arc::new(snapshot));
                info!(generation, services, "published new IDL snapshot");
                Ok(generation)
            }
            Err(err) => {
                warn!(error = %err, "rejected IDL document, keeping the active snapshot");
                Err(err)
            }
        }
    }

    /// Reads the document at `path` and reloads from it.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Io`] when the file cannot be read, otherwise as [`Self::reload`].
    pub async fn reload_from_path(&self, path: impl AsRef<Path>) -> Result<u64, SchemaError> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path).await.map_err(|source| {
            let err = SchemaError::Io {
                path: path.display().to_string(),
                source,
            };
            warn!(error = %err, "could not read IDL document");
            err
        })?;

        self.reload(&source)
    }

    /// Resolves a method against the active snapshot.
    pub fn lookup(&self, service: &str, method: &str) -> Result<MethodDescriptor, RoutingError> {
        self.active.load().lookup(service, method).cloned()
    }

    /// Returns the active snapshot.
    ///
    /// Callers that need several lookups to agree with each other should take one snapshot
    /// and query it, rather than calling [`Self::lookup`] repeatedly.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.active.load_full()
    }

    /// Names of the services in the active snapshot.
    pub fn services(&self) -> Vec<String> {
        self.active
            .load()
            .services()
            .map(|s| s.name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const V2: &str = r#"
        struct Request {
            1: string user
            2: string message
        }
        service ServiceA {
            void methodA(1: Request req)
        }
        service ServiceD {
            void methodZ(1: string note)
        }
    "#;

    #[test]
    fn bundled_document_is_valid() {
        let registry = SchemaRegistry::bundled().unwrap();
        assert_eq!(registry.services(), ["ServiceA", "ServiceB"]);
        assert_eq!(registry.snapshot().generation(), 1);
    }

    #[test]
    fn lookup_keeps_declaration_order() {
        let registry = SchemaRegistry::bundled().unwrap();
        let method = registry.lookup("ServiceA", "methodA").unwrap();
        let names: Vec<_> = method.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["userId", "message"]);
    }

    #[test]
    fn reload_publishes_new_snapshot() {
        let registry = SchemaRegistry::bundled().unwrap();

        assert_eq!(registry.reload(V2).unwrap(), 2);
        assert_eq!(registry.services(), ["ServiceA", "ServiceD"]);
        assert!(registry.lookup("ServiceD", "methodZ").is_ok());
        assert!(matches!(
            registry.lookup("ServiceB", "methodA"),
            Err(RoutingError::UnknownService(_))
        ));
    }

    #[test]
    fn failed_reload_keeps_active_snapshot() {
        let registry = SchemaRegistry::bundled().unwrap();
        let before = registry.snapshot();

        let err = registry.reload("service ServiceA { void methodA(").unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));

        let after = registry.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(registry.lookup("ServiceA", "methodA").is_ok());
    }

    #[test]
    fn held_snapshot_outlives_reload() {
        let registry = SchemaRegistry::bundled().unwrap();
        let held = registry.snapshot();

        registry.reload(V2).unwrap();

        assert_eq!(held.generation(), 1);
        assert!(held.lookup("ServiceB", "methodA").is_ok());
        assert_eq!(registry.snapshot().generation(), 2);
    }

    #[tokio::test]
    async fn reload_from_missing_path_is_an_io_error() {
        let registry = SchemaRegistry::bundled().unwrap();
        let err = registry
            .reload_from_path("/definitely/not/here.thrift")
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
        assert_eq!(registry.snapshot().generation(), 1);
    }

    #[test]
    fn concurrent_reloads_get_distinct_generations() {
        let registry = Arc::new(SchemaRegistry::bundled().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.reload(V2).unwrap())
            })
            .collect();

        let mut generations: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        generations.sort_unstable();
        assert_eq!(generations, (2..=9).collect::<Vec<_>>());
        assert_eq!(registry.snapshot().generation(), 9);
    }
}
