use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::resolver::ArgumentResolver;

/// Shared, append-only set of argument resolvers.
///
/// Registration order is preserved and adding the same resolver instance twice keeps one entry. Reads take a
/// snapshot, so one invocation sees a consistent set even while other threads register.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: RwLock<Vec<Arc<dyn ArgumentResolver>>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add resolvers, skipping instances that are already registered.
    pub fn add<I>(&self, resolvers: I)
    where
        I: IntoIterator<Item = Arc<dyn ArgumentResolver>>,
    {
        let mut registered = self.resolvers.write();
        for resolver in resolvers {
            if registered.iter().any(|existing| same_instance(existing, &resolver)) {
                tracing::trace!(resolver = resolver.name(), "resolver already registered");
                continue;
            }
            tracing::debug!(resolver = resolver.name(), "registered argument resolver");
            registered.push(resolver);
        }
    }

    /// Register one resolver and return the shared handle, which can be passed to [`ResolverRegistry::add`] again.
    pub fn register<R: ArgumentResolver + 'static>(&self, resolver: R) -> Arc<dyn ArgumentResolver> {
        let resolver: Arc<dyn ArgumentResolver> = Arc::new(resolver);
        self.add([Arc::clone(&resolver)]);
        resolver
    }

    /// Snapshot of every registered resolver, in registration order.
    pub fn all(&self) -> Vec<Arc<dyn ArgumentResolver>> {
        self.resolvers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.resolvers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.read().is_empty()
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolvers = self.resolvers.read();
        f.debug_list().entries(resolvers.iter().map(|r| r.name())).finish()
    }
}

// Compare data addresses only; vtable pointers for one type may differ across codegen units.
fn same_instance(a: &Arc<dyn ArgumentResolver>, b: &Arc<dyn ArgumentResolver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
