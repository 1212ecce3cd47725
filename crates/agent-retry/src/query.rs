use crate::error::Result;
use crate::message::Message;
use crate::options::AgentOptions;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Lazy stream of agent messages for one query.
pub type MessageStream<'a> = Pin<Box<dyn Stream<Item = Result<Message>> + Send + 'a>>;

/// The external "agent query" operation.
///
/// Implementations must be lazy: nothing runs until the stream is polled,
/// and every failure, including failing to start, arrives as a stream item.
/// Dropping the stream abandons the query.
pub trait AgentQuery: Send + Sync {
    /// Start a query for `prompt` under `options`.
    fn query<'a>(&'a self, prompt: &'a str, options: &'a AgentOptions) -> MessageStream<'a>;
}

impl<Q: AgentQuery + ?Sized> AgentQuery for Arc<Q> {
    fn query<'a>(&'a self, prompt: &'a str, options: &'a AgentOptions) -> MessageStream<'a> {
        (**self).query(prompt, options)
    }
}
