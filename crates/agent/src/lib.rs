//! The conversation-driven command loop.
//!
//! One user turn runs as a fixed-point iteration:
//!
//! 1. **Append** the user's message to the conversation
//! 2. **Call the model** with the whole conversation (streamed or whole)
//! 3. **Record** the completion verbatim as an assistant message
//! 4. **Scan** it for `<command>…</command>` spans; if there are none, stop
//! 5. **Dispatch** each command in order, appending its result (or error)
//! 6. Loop back to step 2
//!
//! The loop also stops when the model-call cap is reached.

pub mod grammar;
pub mod loop_runner;
pub mod prompt;
pub mod session;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use grammar::{Command, extract_commands, parse_command, strip_commands};
pub use loop_runner::{CommandLoop, OUTCOME_KEY, TurnOutcome, describe_tool_error};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, system_prompt};
pub use session::{Input, Session, SessionCommand, parse_input};
pub use stream_event::{AgentStreamEvent, EventSink};
