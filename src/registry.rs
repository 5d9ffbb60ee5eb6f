//! Layered fixture registries
//!
//! A registry models the definition sources visible to one test, ordered
//! from outermost (root shared-setup file) to innermost (test class). Name
//! lookup walks innermost-first, so a closer definition shadows same-named
//! ones further out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{FixtureError, FixtureResult};
use crate::fixture::FixtureDef;

/// One source of fixture definitions (a shared-setup file, a test module,
/// a test class).
///
/// Registering a name twice in the same layer replaces the earlier
/// definition. Replacement is total: the replaced definition is not
/// reachable through override composition, unlike a definition shadowed
/// from an outer layer.
pub struct FixtureLayer {
	name: String,
	index: HashMap<String, usize>,
	defs: Vec<Arc<FixtureDef>>,
}

impl FixtureLayer {
	/// Creates an empty layer. The name only appears in diagnostics.
	///
	/// # Examples
	///
	/// ```
	/// use rigging::{FixtureDef, FixtureLayer, Scope};
	///
	/// let mut layer = FixtureLayer::new("tests/conftest");
	/// layer.register(FixtureDef::value("global_fixture", Scope::Function, "foobar"));
	/// assert!(layer.get("global_fixture").is_some());
	/// ```
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			index: HashMap::new(),
			defs: Vec::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Adds a definition, replacing any earlier same-named one in this layer.
	pub fn register(&mut self, def: FixtureDef) -> &mut Self {
		let def = Arc::new(def);
		match self.index.get(def.name()) {
			Some(&pos) => {
				tracing::debug!(
					layer = %self.name,
					fixture = %def.name(),
					"replacing same-layer fixture definition"
				);
				self.defs[pos] = def;
			}
			None => {
				self.index.insert(def.name().to_string(), self.defs.len());
				self.defs.push(def);
			}
		}
		self
	}

	pub fn get(&self, name: &str) -> Option<&Arc<FixtureDef>> {
		self.index.get(name).map(|&pos| &self.defs[pos])
	}

	/// Definitions in registration order.
	pub fn definitions(&self) -> impl Iterator<Item = &Arc<FixtureDef>> {
		self.defs.iter()
	}
}

/// Ordered stack of definition layers, outermost first.
pub struct FixtureRegistry {
	layers: Vec<FixtureLayer>,
}

impl FixtureRegistry {
	pub fn new() -> Self {
		Self { layers: Vec::new() }
	}

	/// Builds a registry from layers given outermost-first.
	pub fn from_layers(layers: impl IntoIterator<Item = FixtureLayer>) -> Self {
		Self {
			layers: layers.into_iter().collect(),
		}
	}

	/// Appends a layer inside all existing ones.
	pub fn push_layer(&mut self, layer: FixtureLayer) -> &mut Self {
		self.layers.push(layer);
		self
	}

	pub fn layers(&self) -> &[FixtureLayer] {
		&self.layers
	}

	/// Finds the innermost definition of `name`, with the index of the layer
	/// that holds it.
	pub fn lookup(&self, name: &str) -> Option<(usize, &Arc<FixtureDef>)> {
		self.layers
			.iter()
			.enumerate()
			.rev()
			.find_map(|(idx, layer)| layer.get(name).map(|def| (idx, def)))
	}

	/// Finds the innermost definition of `name` strictly outside `layer_idx`.
	///
	/// This is the escape hatch of override composition: while resolving a
	/// definition found at `layer_idx`, a dependency on the fixture's own
	/// name must reach the definition it shadows, not itself.
	pub fn lookup_below(&self, name: &str, layer_idx: usize) -> Option<(usize, &Arc<FixtureDef>)> {
		self.layers[..layer_idx]
			.iter()
			.enumerate()
			.rev()
			.find_map(|(idx, layer)| layer.get(name).map(|def| (idx, def)))
	}

	/// Statically checks every registered definition before any test runs.
	///
	/// Walks the full dependency graph and reports the first unknown
	/// dependency name, scope-ordering violation, or dependency cycle. A
	/// registry that passes `validate` cannot fail resolution for
	/// configuration reasons, only through factory errors.
	pub fn validate(&self) -> FixtureResult<()> {
		let mut done = HashSet::new();
		for (idx, layer) in self.layers.iter().enumerate() {
			for def in layer.definitions() {
				let mut walk = GraphWalk::default();
				self.check_def(idx, def, &mut walk, &mut done)?;
			}
		}
		Ok(())
	}

	fn check_def(
		&self,
		layer_idx: usize,
		def: &Arc<FixtureDef>,
		walk: &mut GraphWalk,
		done: &mut HashSet<(usize, String)>,
	) -> FixtureResult<()> {
		let node = (layer_idx, def.name().to_string());
		if done.contains(&node) {
			return Ok(());
		}
		walk.visiting.insert(node.clone());
		walk.path.push(def.name().to_string());

		for dep in def.dependencies() {
			// A dependency on the fixture's own name escapes to outer layers.
			let found = if dep == def.name() {
				self.lookup_below(dep, layer_idx)
			} else {
				self.lookup(dep)
			};
			let Some((dep_idx, dep_def)) = found else {
				if walk.path.iter().any(|n| n == dep) {
					return Err(cycle_error(&walk.path, dep));
				}
				return Err(FixtureError::FixtureNotFound {
					name: dep.clone(),
					requested_by: def.name().to_string(),
				});
			};
			if dep_def.scope() < def.scope() {
				return Err(FixtureError::ScopeMismatch {
					fixture: def.name().to_string(),
					scope: def.scope(),
					dependency: dep.clone(),
					dependency_scope: dep_def.scope(),
				});
			}
			if walk.visiting.contains(&(dep_idx, dep.clone())) {
				return Err(cycle_error(&walk.path, dep));
			}
			self.check_def(dep_idx, dep_def, walk, done)?;
		}

		walk.path.pop();
		walk.visiting.remove(&node);
		done.insert(node);
		Ok(())
	}
}

impl Default for FixtureRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Default)]
struct GraphWalk {
	visiting: HashSet<(usize, String)>,
	path: Vec<String>,
}

/// Renders a cycle as `a -> b -> c -> a`, starting from the first time the
/// offending name entered the resolution path.
pub(crate) fn cycle_error(path: &[String], name: &str) -> FixtureError {
	let rendered = match path.iter().position(|n| n == name) {
		Some(start) => {
			let mut names: Vec<&str> = path[start..].iter().map(String::as_str).collect();
			names.push(name);
			names.join(" -> ")
		}
		None => format!("unknown cycle involving {name}"),
	};
	FixtureError::CircularDependency {
		name: name.to_string(),
		path: rendered,
	}
}
