//! Fixture definitions and factory arguments

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{FixtureError, FixtureResult};
use crate::scope::Scope;

/// An instantiated fixture value, shared between every consumer within the
/// fixture's scope instance.
pub type FixtureValue = Arc<dyn Any + Send + Sync>;

type Factory = Box<dyn Fn(&FixtureArgs) -> FixtureResult<FixtureValue> + Send + Sync>;
type Finalizer = Box<dyn FnOnce() + Send>;

/// A named, scoped value provider.
///
/// A definition declares the names of the fixtures it depends on; the
/// resolver looks those up, instantiates them first, and hands their values
/// to the factory through [`FixtureArgs`].
///
/// # Examples
///
/// ```
/// use rigging::{FixtureDef, Scope};
///
/// let values = FixtureDef::value("values", Scope::Function, vec![2, 1, 3]);
/// let sorted = FixtureDef::new("sorted_values", Scope::Function, &["values"], |args| {
/// 	let mut v = args.get::<Vec<i32>>("values")?.as_ref().clone();
/// 	v.sort();
/// 	Ok(v)
/// });
///
/// assert_eq!(values.scope(), Scope::Function);
/// assert_eq!(sorted.dependencies(), ["values"]);
/// ```
pub struct FixtureDef {
	name: String,
	scope: Scope,
	dependencies: Vec<String>,
	factory: Factory,
}

impl FixtureDef {
	/// Creates a fixture from a factory closure.
	///
	/// The factory receives the resolved values of `dependencies` and may
	/// register teardown via [`FixtureArgs::add_finalizer`]. A fixture that
	/// exists only for its side effect can return `()`.
	pub fn new<T, F>(name: impl Into<String>, scope: Scope, dependencies: &[&str], factory: F) -> Self
	where
		T: Any + Send + Sync,
		F: Fn(&FixtureArgs) -> FixtureResult<T> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			scope,
			dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
			factory: Box::new(move |args| factory(args).map(|v| Arc::new(v) as FixtureValue)),
		}
	}

	/// Creates a dependency-free fixture that yields a clone of `value`.
	///
	/// The clone happens once per scope instance; consumers within that
	/// instance share the cached value.
	pub fn value<T>(name: impl Into<String>, scope: Scope, value: T) -> Self
	where
		T: Any + Send + Sync + Clone,
	{
		Self::new(name, scope, &[], move |_| Ok(value.clone()))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn scope(&self) -> Scope {
		self.scope
	}

	/// Names of the fixtures this definition depends on, in declaration order.
	pub fn dependencies(&self) -> &[String] {
		&self.dependencies
	}

	/// Runs the factory against resolved dependency values.
	pub(crate) fn instantiate(&self, args: &FixtureArgs) -> FixtureResult<FixtureValue> {
		tracing::debug!(fixture = %self.name, scope = %self.scope, "instantiating fixture");
		(self.factory)(args)
	}
}

impl std::fmt::Debug for FixtureDef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FixtureDef")
			.field("name", &self.name)
			.field("scope", &self.scope)
			.field("dependencies", &self.dependencies)
			.finish_non_exhaustive()
	}
}

/// Resolved dependency values handed to a fixture factory.
pub struct FixtureArgs {
	fixture: String,
	values: HashMap<String, FixtureValue>,
	finalizers: Mutex<Vec<Finalizer>>,
}

impl FixtureArgs {
	pub(crate) fn new(fixture: &str, values: HashMap<String, FixtureValue>) -> Self {
		Self {
			fixture: fixture.to_string(),
			values,
			finalizers: Mutex::new(Vec::new()),
		}
	}

	/// Retrieves a resolved dependency value by name.
	///
	/// The name must appear in the definition's dependency list, and `T`
	/// must be the concrete type the dependency's factory produced.
	pub fn get<T: Any + Send + Sync>(&self, name: &str) -> FixtureResult<Arc<T>> {
		let value = self
			.values
			.get(name)
			.ok_or_else(|| FixtureError::FixtureNotFound {
				name: name.to_string(),
				requested_by: self.fixture.clone(),
			})?;
		value
			.clone()
			.downcast::<T>()
			.map_err(|_| FixtureError::TypeMismatch {
				name: name.to_string(),
				expected: std::any::type_name::<T>(),
			})
	}

	/// Registers a teardown action for the value being built.
	///
	/// Finalizers run when the scope instance that cached the value is
	/// finalized, in reverse instantiation order.
	pub fn add_finalizer(&self, f: impl FnOnce() + Send + 'static) {
		let mut finalizers = self
			.finalizers
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		finalizers.push(Box::new(f));
	}

	pub(crate) fn take_finalizers(&self) -> Vec<Finalizer> {
		let mut finalizers = self
			.finalizers
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		finalizers.drain(..).collect()
	}
}
