//! Scoped switch into the identity allowed to write translated files.

use std::io;

/// A reversible change of the process's effective identity.
///
/// `enter` runs right before the target file is created and `revert` right
/// after it is written, whether or not the write succeeded.
pub trait SecurityContext: Send + Sync {
    fn enter(&self) -> io::Result<()>;
    fn revert(&self);
}

/// Write with the caller's own identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentContext;

impl SecurityContext for CurrentContext {
    fn enter(&self) -> io::Result<()> {
        Ok(())
    }

    fn revert(&self) {}
}

/// Holds a [`SecurityContext`] entered until dropped.
pub struct ContextScope<'a> {
    context: &'a dyn SecurityContext,
}

impl<'a> ContextScope<'a> {
    pub fn enter(context: &'a dyn SecurityContext) -> io::Result<Self> {
        context.enter()?;
        Ok(Self { context })
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.context.revert();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        entered: AtomicUsize,
        reverted: AtomicUsize,
        refuse: AtomicBool,
    }

    impl SecurityContext for Counting {
        fn enter(&self) -> io::Result<()> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            self.entered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn revert(&self) {
            self.reverted.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_scope_reverts_on_drop() {
        let ctx = Counting::default();
        {
            let _scope = ContextScope::enter(&ctx).unwrap();
            assert_eq!(ctx.entered.load(Ordering::SeqCst), 1);
            assert_eq!(ctx.reverted.load(Ordering::SeqCst), 0);
        }
        assert_eq!(ctx.reverted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_enter_does_not_revert() {
        let ctx = Counting::default();
        ctx.refuse.store(true, Ordering::SeqCst);
        assert!(ContextScope::enter(&ctx).is_err());
        assert_eq!(ctx.reverted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_current_context_is_noop() {
        let _scope = ContextScope::enter(&CurrentContext).unwrap();
    }
}
