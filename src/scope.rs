//! Fixture scopes and per-scope value caches

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::fixture::{FixtureDef, FixtureValue};

/// Lifetime over which a fixture's cached value is reused.
///
/// Variants are ordered from narrowest to broadest, so `Ord` compares
/// lifetime breadth: `Scope::Function < Scope::Session`. A fixture may only
/// depend on fixtures of equal or broader scope.
///
/// # Examples
///
/// ```
/// use rigging::Scope;
///
/// assert!(Scope::Function < Scope::Class);
/// assert!(Scope::Module < Scope::Session);
/// assert_eq!(Scope::Session.to_string(), "session");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
	Function,
	Class,
	Module,
	Package,
	Session,
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Scope::Function => "function",
			Scope::Class => "class",
			Scope::Module => "module",
			Scope::Package => "package",
			Scope::Session => "session",
		};
		f.write_str(name)
	}
}

/// Identity of a fixture definition within a cache.
///
/// Two definitions with the same name (an overriding fixture and the one it
/// shadows) must cache independently, so values are keyed by the definition's
/// allocation rather than its name. Each entry also holds the `Arc` it was
/// keyed under: the address stays unique for as long as the entry exists,
/// even when the registry that produced the definition is dropped and
/// rebuilt.
type DefId = usize;

fn def_id(def: &Arc<FixtureDef>) -> DefId {
	Arc::as_ptr(def) as DefId
}

/// Cache of instantiated fixture values for one scope instance.
///
/// Within a single scope instance a fixture is instantiated at most once;
/// repeated references return the cached `Arc`. This is also why mutating a
/// broad-scoped value is visible to every later user of that scope instance.
///
/// Finalizers registered during instantiation run in reverse instantiation
/// order when the cache is finalized, and run at most once.
pub struct ScopeCache {
	scope: Scope,
	cache: RwLock<HashMap<DefId, (Arc<FixtureDef>, FixtureValue)>>,
	finalizers: Mutex<Vec<(String, Box<dyn FnOnce() + Send>)>>,
}

impl ScopeCache {
	/// Creates an empty cache for the given scope.
	///
	/// # Examples
	///
	/// ```
	/// use rigging::{Scope, ScopeCache};
	///
	/// let cache = ScopeCache::new(Scope::Session);
	/// assert_eq!(cache.scope(), Scope::Session);
	/// ```
	pub fn new(scope: Scope) -> Self {
		Self {
			scope,
			cache: RwLock::new(HashMap::new()),
			finalizers: Mutex::new(Vec::new()),
		}
	}

	/// The scope this cache holds values for.
	pub fn scope(&self) -> Scope {
		self.scope
	}

	/// Retrieves the cached value for a definition, if it was instantiated
	/// in this scope instance.
	pub fn get(&self, def: &Arc<FixtureDef>) -> Option<FixtureValue> {
		let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
		cache.get(&def_id(def)).map(|(_, value)| value.clone())
	}

	/// Typed variant of [`get`](Self::get): downcasts the cached value.
	///
	/// Returns `None` on a cache miss or when the cached value does not hold
	/// a `T`.
	pub fn get_as<T: Any + Send + Sync>(&self, def: &Arc<FixtureDef>) -> Option<Arc<T>> {
		self.get(def).and_then(|value| value.downcast::<T>().ok())
	}

	/// Stores the instantiated value for a definition.
	///
	/// The definition itself is retained alongside the value, pinning the
	/// allocation the cache key points at for the entry's lifetime.
	pub fn set(&self, def: &Arc<FixtureDef>, value: FixtureValue) {
		let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
		cache.insert(def_id(def), (Arc::clone(def), value));
	}

	/// Number of values cached in this scope instance.
	pub fn len(&self) -> usize {
		let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
		cache.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Registers a teardown action for a fixture instantiated in this scope.
	pub(crate) fn add_finalizer(&self, fixture: &str, f: Box<dyn FnOnce() + Send>) {
		let mut finalizers = self
			.finalizers
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		finalizers.push((fixture.to_string(), f));
	}

	/// Runs pending finalizers in reverse instantiation order.
	///
	/// Cached values are kept; only teardown actions are consumed. Calling
	/// `finalize` again is a no-op until new finalizers are registered.
	pub fn finalize(&self) {
		let drained: Vec<_> = {
			let mut finalizers = self
				.finalizers
				.lock()
				.unwrap_or_else(PoisonError::into_inner);
			finalizers.drain(..).collect()
		};
		for (fixture, f) in drained.into_iter().rev() {
			tracing::debug!(scope = %self.scope, %fixture, "running fixture finalizer");
			f();
		}
	}
}
