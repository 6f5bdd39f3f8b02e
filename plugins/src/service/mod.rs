mod http;
mod mock;
mod openai;

pub use http::{ChatClient, ChatHttpError, ChatHttpErrorKind, ChatMessage};
pub use mock::{MockCritiqueService, MockGenerationService};
pub use openai::{OpenAiCritiqueService, OpenAiGenerationService};
