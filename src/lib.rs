//! # Rigging
//!
//! pytest-inspired named test-fixture dependency injection.
//!
//! Fixtures are named value providers. A test (or another fixture) consumes
//! one by declaring its name; the resolver finds the nearest enclosing
//! definition, instantiates its dependencies first, and caches the value for
//! the fixture's declared scope.
//!
//! ## Features
//!
//! - **Name-based**: dependencies are resolved by name, nearest enclosing
//!   definition layer first, so inner layers shadow outer ones
//! - **Scoped**: function, class, module, package, and session lifetimes
//! - **Cached**: within one scope instance a fixture is instantiated at most
//!   once; repeated references share the value
//! - **Composable**: an overriding fixture may request the fixture it
//!   shadows under the same name, wrapping it without recursion
//! - **Checked**: unknown names, scope-ordering violations, and dependency
//!   cycles are configuration errors reported before any test runs
//! - **Teardown**: finalizers registered during instantiation run in
//!   reverse order when the scope instance ends
//!
//! ## Example
//!
//! ```
//! use rigging::{FixtureContext, FixtureDef, FixtureLayer, FixtureRegistry, Scope, ScopeCache};
//! use std::sync::Arc;
//!
//! # fn main() -> rigging::FixtureResult<()> {
//! // Definition layers, outermost first: a shared-setup file and a module.
//! let mut conftest = FixtureLayer::new("conftest");
//! conftest.register(FixtureDef::value("chain", Scope::Function, vec![1, 2]));
//!
//! let mut module = FixtureLayer::new("test_module");
//! // Overrides `chain` and wraps the definition it shadows.
//! module.register(FixtureDef::new("chain", Scope::Function, &["chain"], |args| {
//! 	let mut outer = args.get::<Vec<i32>>("chain")?.as_ref().clone();
//! 	outer.extend([3, 4]);
//! 	Ok(outer)
//! }));
//!
//! let registry = FixtureRegistry::from_layers([conftest, module]);
//! registry.validate()?;
//!
//! let session = Arc::new(ScopeCache::new(Scope::Session));
//! let ctx = FixtureContext::builder(session).build();
//! assert_eq!(*ctx.resolve_as::<Vec<i32>>(&registry, "chain")?, vec![1, 2, 3, 4]);
//! ctx.finish();
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod fixture;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use context::{FixtureContext, FixtureContextBuilder};
pub use error::{FixtureError, FixtureResult};
pub use fixture::{FixtureArgs, FixtureDef, FixtureValue};
pub use registry::{FixtureLayer, FixtureRegistry};
pub use resolver::MAX_RESOLUTION_DEPTH;
pub use scope::{Scope, ScopeCache};
