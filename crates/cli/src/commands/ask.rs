//! `repoloop ask` — Run a single turn and exit.

use anyhow::bail;
use repoloop_agent::EventSink;
use repoloop_core::message::Conversation;

use super::render::{self, Renderer, TurnEnd};
use super::runtime;

pub async fn run(message: &str, no_stream: bool, local: bool) -> anyhow::Result<()> {
    let message = message.trim();
    if message.is_empty() {
        bail!("Message is empty");
    }

    let rt = runtime::build(local).await?;
    let stream = rt.config.agent.stream && !no_stream;
    let mut conversation = Conversation::new(rt.system_prompt.clone());

    let (sink, mut events) = EventSink::channel();
    let mut renderer = Renderer::new(std::io::stdout());
    let turn = rt
        .agent
        .process(&mut conversation, Some(message), stream, &sink);

    match render::drive(turn, &mut events, &mut renderer).await? {
        TurnEnd::Finished(result) => {
            result?;
            Ok(())
        }
        TurnEnd::Cancelled => bail!("Cancelled"),
    }
}
