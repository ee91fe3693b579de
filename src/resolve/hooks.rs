use crate::access::Operation;
use crate::context::StrataContext;
use crate::db::Item;
use crate::error::Result;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by a hook closure.
pub type HookFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

pub type ResolveInputHook =
    Arc<dyn Fn(StrataContext, HookArgs) -> HookFuture<Item> + Send + Sync>;
pub type ValidateInputHook =
    Arc<dyn Fn(StrataContext, HookArgs) -> HookFuture<()> + Send + Sync>;
pub type OperationHook = Arc<dyn Fn(StrataContext, HookArgs) -> HookFuture<()> + Send + Sync>;

/// What a hook gets to see. Owned clones: hooks may not mutate pipeline
/// state, only return transformed input (resolve_input) or fail.
#[derive(Debug, Clone)]
pub struct HookArgs {
    pub operation: Operation,
    pub list_key: String,
    /// The existing item, for update/delete and after_operation.
    pub item: Option<Item>,
    /// The resolved input, for create/update.
    pub input: Option<Item>,
}

/// The ordered hook stages of a list. Stages run in declaration order:
/// resolve_input, validate_input, before_operation, persistence,
/// after_operation. A failing stage aborts the later stages for that item
/// only.
#[derive(Clone, Default)]
pub struct ListHooks {
    pub resolve_input: Option<ResolveInputHook>,
    pub validate_input: Option<ValidateInputHook>,
    pub before_operation: Option<OperationHook>,
    pub after_operation: Option<OperationHook>,
}

impl ListHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// May transform the resolved input before validation runs. Hooks that
    /// need to write use a sudo context derived from the one they receive.
    pub fn on_resolve_input<F>(mut self, f: F) -> Self
    where
        F: Fn(StrataContext, HookArgs) -> HookFuture<Item> + Send + Sync + 'static,
    {
        self.resolve_input = Some(Arc::new(f));
        self
    }

    /// May reject the input after transformation; aborts the operation for
    /// the current item.
    pub fn on_validate_input<F>(mut self, f: F) -> Self
    where
        F: Fn(StrataContext, HookArgs) -> HookFuture<()> + Send + Sync + 'static,
    {
        self.validate_input = Some(Arc::new(f));
        self
    }

    pub fn on_before_operation<F>(mut self, f: F) -> Self
    where
        F: Fn(StrataContext, HookArgs) -> HookFuture<()> + Send + Sync + 'static,
    {
        self.before_operation = Some(Arc::new(f));
        self
    }

    /// Runs after persistence with the persisted item.
    pub fn on_after_operation<F>(mut self, f: F) -> Self
    where
        F: Fn(StrataContext, HookArgs) -> HookFuture<()> + Send + Sync + 'static,
    {
        self.after_operation = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ListHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListHooks")
            .field("resolve_input", &self.resolve_input.is_some())
            .field("validate_input", &self.validate_input.is_some())
            .field("before_operation", &self.before_operation.is_some())
            .field("after_operation", &self.after_operation.is_some())
            .finish()
    }
}
