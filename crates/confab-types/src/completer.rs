//! Completer trait for the model collaborator.

use crate::{ModelError, Turn};
use std::future::Future;
use std::pin::Pin;

/// A boxed future resolving to the completion text.
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;

/// The external completion collaborator.
///
/// Transport, model selection and authentication are the
/// implementation's concern; the core hands over an ordered context
/// window and gets text back. Dyn-compatible so the reply cycle works
/// with `Arc<dyn Completer>`.
pub trait Completer: Send + Sync {
    /// Produce a reply for the given context, oldest turn first.
    fn complete<'a>(&'a self, context: &'a [Turn]) -> CompletionFuture<'a>;

    /// Collaborator name for logging (e.g. "openai").
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn completer_is_dyn_compatible() {
        // Compile-time check: Completer can be used as a trait object.
        fn _accept(_c: &dyn Completer) {}
    }

    #[test]
    fn arc_completer_is_send_sync() {
        // Compile-time assert: Arc<dyn Completer> is Send + Sync.
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<Arc<dyn Completer>>();
    }

    struct Echo;

    impl Completer for Echo {
        fn complete<'a>(&'a self, context: &'a [Turn]) -> CompletionFuture<'a> {
            Box::pin(async move {
                context
                    .last()
                    .map(|t| t.content.clone())
                    .ok_or(ModelError::Upstream {
                        message: "empty context".into(),
                    })
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn boxed_future_resolves() {
        use crate::Role;
        let echo = Echo;
        let context = vec![Turn::new(Role::User, "ping", 1)];
        let reply = echo.complete(&context).await.unwrap();
        assert_eq!(reply, "ping");
    }

    #[tokio::test]
    async fn empty_context_is_an_upstream_error() {
        let echo = Echo;
        let result = echo.complete(&[]).await;
        assert!(matches!(result, Err(ModelError::Upstream { .. })));
    }
}
