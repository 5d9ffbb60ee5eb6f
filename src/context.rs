//! Per-test resolution contexts

use std::sync::Arc;

use crate::scope::{Scope, ScopeCache};

/// Resolution context for a single test.
///
/// A context owns a fresh function-scope cache and borrows the broader
/// caches it shares with other tests: the session cache always, and
/// package / module / class caches when the caller passes them in. Caches
/// that are not passed in are created fresh, private to this context.
///
/// Built with the builder pattern from a required session cache:
///
/// ```
/// use rigging::{FixtureContext, Scope, ScopeCache};
/// use std::sync::Arc;
///
/// let session = Arc::new(ScopeCache::new(Scope::Session));
/// let module = Arc::new(ScopeCache::new(Scope::Module));
///
/// let ctx = FixtureContext::builder(Arc::clone(&session))
/// 	.with_module(Arc::clone(&module))
/// 	.build();
/// ctx.finish();
/// ```
pub struct FixtureContext {
	function: ScopeCache,
	class: Arc<ScopeCache>,
	module: Arc<ScopeCache>,
	package: Arc<ScopeCache>,
	session: Arc<ScopeCache>,
}

impl FixtureContext {
	/// Starts building a context sharing the given session cache.
	pub fn builder(session: Arc<ScopeCache>) -> FixtureContextBuilder {
		FixtureContextBuilder {
			session,
			package: None,
			module: None,
			class: None,
		}
	}

	/// The cache a fixture of the given scope is stored in and served from.
	pub fn cache_for(&self, scope: Scope) -> &ScopeCache {
		match scope {
			Scope::Function => &self.function,
			Scope::Class => &self.class,
			Scope::Module => &self.module,
			Scope::Package => &self.package,
			Scope::Session => &self.session,
		}
	}

	/// Ends the test this context was built for: runs function-scope
	/// teardown in reverse instantiation order.
	///
	/// Broader caches are finalized by whoever owns them, when the class,
	/// module, package, or session they model ends.
	pub fn finish(&self) {
		self.function.finalize();
	}
}

pub struct FixtureContextBuilder {
	session: Arc<ScopeCache>,
	package: Option<Arc<ScopeCache>>,
	module: Option<Arc<ScopeCache>>,
	class: Option<Arc<ScopeCache>>,
}

impl FixtureContextBuilder {
	/// Shares a package-scope cache with other tests in the package.
	pub fn with_package(mut self, cache: Arc<ScopeCache>) -> Self {
		debug_assert_eq!(cache.scope(), Scope::Package);
		self.package = Some(cache);
		self
	}

	/// Shares a module-scope cache with other tests in the module.
	pub fn with_module(mut self, cache: Arc<ScopeCache>) -> Self {
		debug_assert_eq!(cache.scope(), Scope::Module);
		self.module = Some(cache);
		self
	}

	/// Shares a class-scope cache with other tests in the class.
	pub fn with_class(mut self, cache: Arc<ScopeCache>) -> Self {
		debug_assert_eq!(cache.scope(), Scope::Class);
		self.class = Some(cache);
		self
	}

	pub fn build(self) -> FixtureContext {
		debug_assert_eq!(self.session.scope(), Scope::Session);
		FixtureContext {
			function: ScopeCache::new(Scope::Function),
			class: self
				.class
				.unwrap_or_else(|| Arc::new(ScopeCache::new(Scope::Class))),
			module: self
				.module
				.unwrap_or_else(|| Arc::new(ScopeCache::new(Scope::Module))),
			package: self
				.package
				.unwrap_or_else(|| Arc::new(ScopeCache::new(Scope::Package))),
			session: self.session,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn cache_for_routes_each_scope() {
		let session = Arc::new(ScopeCache::new(Scope::Session));
		let ctx = FixtureContext::builder(session).build();

		for scope in [
			Scope::Function,
			Scope::Class,
			Scope::Module,
			Scope::Package,
			Scope::Session,
		] {
			assert_eq!(ctx.cache_for(scope).scope(), scope);
		}
	}

	#[rstest]
	fn contexts_share_the_session_cache() {
		let session = Arc::new(ScopeCache::new(Scope::Session));
		let ctx1 = FixtureContext::builder(Arc::clone(&session)).build();
		let ctx2 = FixtureContext::builder(Arc::clone(&session)).build();

		assert!(std::ptr::eq(
			ctx1.cache_for(Scope::Session),
			ctx2.cache_for(Scope::Session)
		));
		// Function caches are always private
		assert!(!std::ptr::eq(
			ctx1.cache_for(Scope::Function),
			ctx2.cache_for(Scope::Function)
		));
	}
}
