//! Fixture dependency resolution
//!
//! Resolution walks a fixture's dependency names innermost-layer-first,
//! instantiates dependencies before dependents, caches every value in the
//! cache matching the fixture's declared scope, and tracks the in-flight
//! resolution path for deterministic cycle detection.
//!
//! Cycle tracking keeps an `O(1)` membership set next to the ordered path
//! (the path is only consulted to render the `a -> b -> a` error), and a
//! depth counter backstops pathological chains. Detection is deterministic:
//! every resolution step checks, at every depth.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::context::FixtureContext;
use crate::error::{FixtureError, FixtureResult};
use crate::fixture::{FixtureArgs, FixtureValue};
use crate::registry::{FixtureRegistry, cycle_error};
use crate::scope::Scope;

/// Maximum resolution depth (prevents pathological cases).
pub const MAX_RESOLUTION_DEPTH: usize = 100;

/// In-flight state for one top-level `resolve` call.
#[derive(Default)]
struct ResolutionState {
	/// Nodes currently being resolved, for O(1) cycle checks. Keyed by
	/// (layer, name): the same name legitimately recurs across layers
	/// during override composition, which is not a cycle.
	resolving: HashSet<(usize, String)>,
	/// Resolution path by name, for rendering cycle errors.
	path: Vec<String>,
	depth: usize,
}

impl FixtureContext {
	/// Resolves a fixture by name against the given registry.
	///
	/// Cached values are returned without re-running the factory; newly
	/// instantiated values are stored in the cache matching the fixture's
	/// scope before being returned.
	pub fn resolve(
		&self,
		registry: &FixtureRegistry,
		name: &str,
	) -> FixtureResult<FixtureValue> {
		let mut state = ResolutionState::default();
		self.resolve_inner(registry, name, None, "test function", None, &mut state)
	}

	/// Resolves a fixture and downcasts it to the type its factory produced.
	///
	/// # Examples
	///
	/// ```
	/// use rigging::{FixtureContext, FixtureDef, FixtureLayer, FixtureRegistry, Scope, ScopeCache};
	/// use std::sync::Arc;
	///
	/// # fn main() -> rigging::FixtureResult<()> {
	/// let mut module = FixtureLayer::new("test_module");
	/// module.register(FixtureDef::value("answer", Scope::Function, 41_i32));
	/// module.register(FixtureDef::new("answer_plus_one", Scope::Function, &["answer"], |args| {
	/// 	Ok(*args.get::<i32>("answer")? + 1)
	/// }));
	/// let registry = FixtureRegistry::from_layers([module]);
	/// registry.validate()?;
	///
	/// let session = Arc::new(ScopeCache::new(Scope::Session));
	/// let ctx = FixtureContext::builder(session).build();
	/// assert_eq!(*ctx.resolve_as::<i32>(&registry, "answer_plus_one")?, 42);
	/// # Ok(())
	/// # }
	/// ```
	pub fn resolve_as<T: std::any::Any + Send + Sync>(
		&self,
		registry: &FixtureRegistry,
		name: &str,
	) -> FixtureResult<Arc<T>> {
		self.resolve(registry, name)?
			.downcast::<T>()
			.map_err(|_| FixtureError::TypeMismatch {
				name: name.to_string(),
				expected: std::any::type_name::<T>(),
			})
	}

	fn resolve_inner(
		&self,
		registry: &FixtureRegistry,
		name: &str,
		below: Option<usize>,
		requested_by: &str,
		requester_scope: Option<Scope>,
		state: &mut ResolutionState,
	) -> FixtureResult<FixtureValue> {
		let found = match below {
			Some(layer_idx) => registry.lookup_below(name, layer_idx),
			None => registry.lookup(name),
		};
		let Some((layer_idx, def)) = found else {
			// A name that is already on the path and cannot be found one
			// layer out is a self-reference with nothing left to escape to.
			if state.path.iter().any(|n| n == name) {
				return Err(cycle_error(&state.path, name));
			}
			return Err(FixtureError::FixtureNotFound {
				name: name.to_string(),
				requested_by: requested_by.to_string(),
			});
		};

		// Scope ordering: a dependency must live at least as long as its
		// dependent. Checked before the cache so a misconfigured graph
		// fails even when the value happens to be cached already.
		if let Some(requester) = requester_scope {
			if def.scope() < requester {
				return Err(FixtureError::ScopeMismatch {
					fixture: requested_by.to_string(),
					scope: requester,
					dependency: name.to_string(),
					dependency_scope: def.scope(),
				});
			}
		}

		let cache = self.cache_for(def.scope());
		if let Some(value) = cache.get(def) {
			tracing::debug!(fixture = %name, scope = %def.scope(), "fixture cache hit");
			return Ok(value);
		}

		let node = (layer_idx, name.to_string());
		if state.resolving.contains(&node) {
			return Err(cycle_error(&state.path, name));
		}

		state.depth += 1;
		if state.depth > MAX_RESOLUTION_DEPTH {
			let depth = state.depth;
			state.depth -= 1;
			return Err(FixtureError::MaxDepthExceeded(depth));
		}
		state.resolving.insert(node.clone());
		state.path.push(name.to_string());

		let mut deps: FixtureResult<HashMap<String, FixtureValue>> = Ok(HashMap::new());
		for dep in def.dependencies() {
			// Requesting the fixture's own name reaches the definition it
			// shadows, never itself.
			let dep_below = if dep == def.name() {
				Some(layer_idx)
			} else {
				None
			};
			match self.resolve_inner(registry, dep, dep_below, def.name(), Some(def.scope()), state)
			{
				Ok(value) => {
					if let Ok(values) = deps.as_mut() {
						values.insert(dep.clone(), value);
					}
				}
				Err(err) => {
					deps = Err(err);
					break;
				}
			}
		}

		state.path.pop();
		state.resolving.remove(&node);
		state.depth -= 1;

		let args = FixtureArgs::new(def.name(), deps?);
		let value = def.instantiate(&args);
		// Finalizers registered before a factory error still run at teardown,
		// so a partially built fixture releases what it already acquired.
		for finalizer in args.take_finalizers() {
			cache.add_finalizer(def.name(), finalizer);
		}
		let value = value?;
		cache.set(def, value.clone());
		tracing::debug!(fixture = %name, scope = %def.scope(), "fixture instantiated and cached");
		Ok(value)
	}
}
