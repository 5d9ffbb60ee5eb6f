//! Cached value reuse and its consequences
//!
//! Within a scope instance a fixture is instantiated at most once. For a
//! session-scoped fixture holding interior mutability, that means one test's
//! mutation is visible to every later test. The leak is by definition of
//! the scope, and a good argument for keeping broad-scoped fixtures
//! immutable.

use rigging::{
	FixtureContext, FixtureDef, FixtureError, FixtureLayer, FixtureRegistry, Scope, ScopeCache,
};
use rstest::rstest;
use std::sync::{Arc, Mutex};

fn ids_registry() -> FixtureRegistry {
	let mut module = FixtureLayer::new("test_section4");
	// The factory builds a fresh list per instantiation; the session cache
	// is what makes every test share one instance.
	module.register(FixtureDef::new("ids", Scope::Session, &[], |_| {
		Ok(Arc::new(Mutex::new(vec![3, 1, 4])))
	}));
	FixtureRegistry::from_layers([module])
}

#[rstest]
fn mutation_of_session_fixture_leaks_into_later_tests() {
	// Arrange
	let registry = ids_registry();
	let session = Arc::new(ScopeCache::new(Scope::Session));

	// Act: first test sorts the shared list in place
	{
		let ctx = FixtureContext::builder(Arc::clone(&session)).build();
		let ids = ctx
			.resolve_as::<Arc<Mutex<Vec<i32>>>>(&registry, "ids")
			.unwrap();
		ids.lock().unwrap().sort();
		assert_eq!(*ids.lock().unwrap(), vec![1, 3, 4]);
		ctx.finish();
	}

	// Act: second test receives the already-sorted list, not [3, 1, 4]
	{
		let ctx = FixtureContext::builder(Arc::clone(&session)).build();
		let ids = ctx
			.resolve_as::<Arc<Mutex<Vec<i32>>>>(&registry, "ids")
			.unwrap();
		ids.lock().unwrap().pop();

		// Assert: popping from the original list would give [3, 1]
		assert_eq!(*ids.lock().unwrap(), vec![1, 3]);
		assert_ne!(*ids.lock().unwrap(), vec![3, 1]);
		ctx.finish();
	}
}

#[rstest]
fn fresh_session_cache_restores_the_original_value() {
	// Arrange
	let registry = ids_registry();

	// Act: mutate the value under one session
	let session1 = Arc::new(ScopeCache::new(Scope::Session));
	let ctx1 = FixtureContext::builder(session1).build();
	let ids = ctx1
		.resolve_as::<Arc<Mutex<Vec<i32>>>>(&registry, "ids")
		.unwrap();
	ids.lock().unwrap().clear();

	// Act: a new session cache models a new test session
	let session2 = Arc::new(ScopeCache::new(Scope::Session));
	let ctx2 = FixtureContext::builder(session2).build();
	let ids = ctx2
		.resolve_as::<Arc<Mutex<Vec<i32>>>>(&registry, "ids")
		.unwrap();

	// Assert: re-instantiated from scratch
	assert_eq!(*ids.lock().unwrap(), vec![3, 1, 4]);
}

#[rstest]
fn rebuilt_registry_never_sees_another_definitions_value() {
	// Arrange: one long-lived session cache, a registry rebuilt per test
	let session = Arc::new(ScopeCache::new(Scope::Session));

	// Act: each iteration drops the previous registry before building the
	// next one, so freed definition allocations are up for reuse
	for i in 0..32_i32 {
		let name = format!("fixture_{i}");
		let mut module = FixtureLayer::new("test_section4");
		module.register(FixtureDef::value(name.clone(), Scope::Session, i));
		let registry = FixtureRegistry::from_layers([module]);
		let ctx = FixtureContext::builder(Arc::clone(&session)).build();

		// Assert: every definition yields its own value, never a stale one
		// cached for a dropped same-address definition
		assert_eq!(*ctx.resolve_as::<i32>(&registry, &name).unwrap(), i);
	}
}

fn contradicting_registry() -> FixtureRegistry {
	// A session-scoped fixture depending on a function-scoped one: the
	// dependency would die before its dependent.
	let mut module = FixtureLayer::new("test_section4");
	module.register(FixtureDef::value("foo", Scope::Function, ()));
	module.register(FixtureDef::new(
		"foo_session",
		Scope::Session,
		&["foo"],
		|args| args.get::<()>("foo").map(|_| ()),
	));
	FixtureRegistry::from_layers([module])
}

#[rstest]
fn scope_contradiction_is_a_collection_time_error() {
	// Arrange
	let registry = contradicting_registry();

	// Act
	let err = registry.validate().unwrap_err();

	// Assert
	match err {
		FixtureError::ScopeMismatch {
			fixture,
			scope,
			dependency,
			dependency_scope,
		} => {
			assert_eq!(fixture, "foo_session");
			assert_eq!(scope, Scope::Session);
			assert_eq!(dependency, "foo");
			assert_eq!(dependency_scope, Scope::Function);
		}
		other => panic!("expected ScopeMismatch, got {other:?}"),
	}
}

#[rstest]
fn scope_contradiction_also_fails_lazy_resolution() {
	// Arrange: registry used without a validate() pass
	let registry = contradicting_registry();
	let session = Arc::new(ScopeCache::new(Scope::Session));
	let ctx = FixtureContext::builder(session).build();

	// Act
	let err = ctx.resolve(&registry, "foo_session").unwrap_err();

	// Assert
	assert!(matches!(err, FixtureError::ScopeMismatch { .. }));

	// The valid direction still resolves: function scope may use session scope
	ctx.resolve(&registry, "foo").unwrap();
}

#[rstest]
fn equal_scopes_may_depend_on_each_other() {
	// Arrange
	let mut module = FixtureLayer::new("test_section4");
	module.register(FixtureDef::value("base", Scope::Module, 1_i32));
	module.register(FixtureDef::new(
		"derived",
		Scope::Module,
		&["base"],
		|args| args.get::<i32>("base").map(|v| *v + 1),
	));
	let registry = FixtureRegistry::from_layers([module]);
	registry.validate().unwrap();
	let session = Arc::new(ScopeCache::new(Scope::Session));
	let ctx = FixtureContext::builder(session).build();

	// Act & Assert
	assert_eq!(*ctx.resolve_as::<i32>(&registry, "derived").unwrap(), 2);
}
