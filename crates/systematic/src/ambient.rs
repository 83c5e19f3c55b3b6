use std::future::Future;
use std::sync::Arc;

use crate::engine::Engine;

tokio::task_local! {
    static CURRENT_ENGINE: Arc<Engine>;
}

/// Run `fut` with `engine` installed as the ambient "current runtime"
/// (§9 Global runtime state).
///
/// Every controlled primitive needs a handle back to the engine it is
/// running under without threading an explicit parameter through every
/// user call site. Since exactly one operation is logically executing at
/// a time, a `tokio::task_local!` scoped onto each operation's own task
/// plays the role the original implementation gives to thread-local
/// storage: every operation re-enters the same `Arc<Engine>` clone when
/// its task is spawned, and `current()` is then available anywhere
/// inside that operation's call stack.
pub async fn scope<F: Future>(engine: Arc<Engine>, fut: F) -> F::Output {
    CURRENT_ENGINE.scope(engine, fut).await
}

/// Fetch the ambient engine handle, panicking if called outside a
/// scoped operation.
pub fn current() -> Arc<Engine> {
    CURRENT_ENGINE.with(|engine| engine.clone())
}

/// Fetch the ambient engine handle if one is installed.
pub fn try_current() -> Option<Arc<Engine>> {
    CURRENT_ENGINE.try_with(|engine| engine.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use systematic_core::Config;

    #[tokio::test]
    async fn current_is_only_available_inside_scope() {
        assert!(try_current().is_none());

        let engine = Engine::new(Config::default(), 1);
        scope(engine.clone(), async {
            let fetched = current();
            assert!(Arc::ptr_eq(&fetched, &engine));
        })
        .await;

        assert!(try_current().is_none());
    }
}
