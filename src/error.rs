//! Fixture resolution errors
//!
//! Every variant is a configuration-class error: resolution aborts before
//! the requesting test body runs, and nothing is retried.

use crate::scope::Scope;

pub type FixtureResult<T> = Result<T, FixtureError>;

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
	/// No enclosing definition layer provides the requested name.
	#[error("fixture '{name}' not found (requested by '{requested_by}')")]
	FixtureNotFound { name: String, requested_by: String },

	/// A fixture depends on a fixture with a narrower lifetime.
	#[error(
		"scope mismatch: '{fixture}' ({scope} scope) cannot depend on '{dependency}' ({dependency_scope} scope)\nA fixture may only depend on fixtures of equal or broader scope."
	)]
	ScopeMismatch {
		fixture: String,
		scope: Scope,
		dependency: String,
		dependency_scope: Scope,
	},

	/// Direct or transitive self-dependency among fixture definitions.
	#[error(
		"circular fixture dependency detected: {name}\n  Path: {path}\nThis forms a cycle that cannot be resolved."
	)]
	CircularDependency {
		name: String,
		/// Rendered cycle, format: `a -> b -> c -> a`.
		path: String,
	},

	/// Resolution recursed past [`MAX_RESOLUTION_DEPTH`](crate::resolver::MAX_RESOLUTION_DEPTH).
	#[error(
		"maximum fixture resolution depth exceeded: {0}\nThis likely indicates an extremely deep or circular dependency chain."
	)]
	MaxDepthExceeded(usize),

	/// A resolved value did not hold the type the consumer asked for.
	#[error("fixture '{name}' does not hold a value of type {expected}")]
	TypeMismatch { name: String, expected: &'static str },

	/// The fixture's factory itself reported a failure.
	#[error("fixture '{name}' factory failed: {message}")]
	FactoryFailed { name: String, message: String },
}
