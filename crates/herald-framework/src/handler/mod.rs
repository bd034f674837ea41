//! Command handler surface.
//!
//! - [`Argument`] / [`FromArgument`]: type-erased bound values and their
//!   conversion back into handler parameters.
//! - [`CommandEvent`]: the first parameter of every handler.
//! - [`Handler`] / [`HandlerResponse`]: blanket-implemented for async
//!   functions, Axum style.
//! - [`HandlerService`]: the tower service commands store.

mod argument;
mod event;
mod service;
mod traits;

pub use argument::{Arg, Argument, FromArgument};
pub use event::CommandEvent;
pub use service::{BoxedHandlerService, HandlerService, Invocation, into_service};
pub use traits::{Handler, HandlerResponse};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, CommandDefinition, ParameterDefinition};
    use crate::testing::context_as;
    use crate::{TypeAdapterRegistry, ValidatorRegistry};
    use herald_core::ReplyPayload;
    use tower::ServiceExt;

    async fn add(_event: CommandEvent, a: i64, b: Option<i64>) -> String {
        (a + b.unwrap_or(0)).to_string()
    }

    async fn fails(_event: CommandEvent) -> Result<(), std::io::Error> {
        Err(std::io::Error::other("disk on fire"))
    }

    fn catalog() -> crate::catalog::CommandCatalog {
        CatalogBuilder::new()
            .command(
                CommandDefinition::builder("add")
                    .param(ParameterDefinition::of::<i64>("a"))
                    .param(ParameterDefinition::of::<i64>("b").optional())
                    .handler(add),
            )
            .command(CommandDefinition::builder("fails").handler(fails))
            .build(&TypeAdapterRegistry::new(), &ValidatorRegistry::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_string_response_replies() {
        let catalog = catalog();
        let command = catalog.find("add").unwrap();
        let (ctx, reply) = context_as(crate::testing::MODERATOR, "add 2");
        let event = CommandEvent::new(&ctx, command.clone());

        let invocation = Invocation::new(vec![
            Argument::new(event),
            Argument::new(2_i64),
            Argument::absent(),
        ]);
        command
            .handler()
            .unwrap()
            .clone()
            .oneshot(invocation)
            .await
            .unwrap();

        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("2"));
    }

    #[test]
    fn test_error_response_propagates() {
        let catalog = catalog();
        let command = catalog.find("fails").unwrap();
        let (ctx, reply) = context_as(crate::testing::MODERATOR, "fails");
        let event = CommandEvent::new(&ctx, command.clone());

        let err = tokio_test::block_on(
            command
                .handler()
                .unwrap()
                .clone()
                .oneshot(Invocation::new(vec![Argument::new(event)])),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "disk on fire");
        assert!(reply.sent().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_argument_type_is_an_error() {
        let catalog = catalog();
        let command = catalog.find("add").unwrap();
        let (ctx, _reply) = context_as(crate::testing::MODERATOR, "add x");
        let event = CommandEvent::new(&ctx, command.clone());

        let result = command
            .handler()
            .unwrap()
            .clone()
            .oneshot(Invocation::new(vec![
                Argument::new(event),
                Argument::new("x".to_string()),
            ]))
            .await;

        assert!(result.is_err());
    }
}
