//! `repoloop chat` — Interactive session.

use std::io::Write;

use repoloop_agent::{
    CommandLoop, EventSink, Input, Session, SessionCommand, describe_tool_error, parse_input,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::info;
use super::render::{self, Renderer, TurnEnd};
use super::runtime;

pub async fn run(no_stream: bool, local: bool) -> anyhow::Result<()> {
    let rt = runtime::build(local).await?;
    let stream = rt.config.agent.stream && !no_stream;
    let mut session = Session::new(rt.system_prompt.clone(), stream);

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        repoloop — Interactive Mode           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", rt.config.default_provider);
    println!("  Model:     {}", rt.config.default_model);
    println!("  Tools:     {}", rt.agent.tools().name());
    println!("  Streaming: {}", on_off(stream));
    println!();
    for cmd in SessionCommand::ALL {
        println!("  {:<10} {}", cmd.token(), cmd.help());
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Session(SessionCommand::Quit) => break,
            Input::Session(SessionCommand::History) => {
                for (label, content) in session.history() {
                    println!("  [{label}]");
                    for line in content.lines() {
                        println!("    {line}");
                    }
                }
            }
            Input::Session(SessionCommand::Clear) => {
                session.clear();
                println!("  Chat history cleared.");
            }
            Input::Session(SessionCommand::Stream) => {
                let on = session.toggle_stream();
                println!("  Streaming {}.", on_off(on));
            }
            Input::Session(SessionCommand::Info) => {
                if let Err(e) = info::print_catalog(rt.agent.tools().as_ref()).await {
                    eprintln!("  [Error] {e}");
                }
            }
            Input::Tool(Err(e)) => eprintln!("  [Error] {e}"),
            Input::Tool(Ok(command)) => run_command(&rt.agent, &command).await,
            Input::Chat(message) => {
                if let Err(e) = run_turn(&rt.agent, &mut session, &message).await {
                    eprintln!("  [Error] {e}");
                }
            }
        }
        println!();
    }

    println!("  Goodbye!");
    Ok(())
}

/// A command typed by the user runs outside the conversation.
async fn run_command(agent: &CommandLoop, command: &repoloop_agent::Command) {
    match agent.dispatch(command).await {
        Ok(output) => println!("{}", render::preview(&output)),
        Err(e) => eprintln!("  [Error] {}", describe_tool_error(&e)),
    }
}

async fn run_turn(agent: &CommandLoop, session: &mut Session, message: &str) -> anyhow::Result<()> {
    let (sink, mut events) = EventSink::channel();
    let mut renderer = Renderer::new(std::io::stdout());

    let turn = session.turn(agent, message, &sink);
    match render::drive(turn, &mut events, &mut renderer).await? {
        TurnEnd::Finished(Ok(outcome)) => {
            tracing::debug!(
                iterations = outcome.iterations,
                commands = outcome.commands_dispatched,
                rejected = outcome.rejected.len(),
                "Turn finished"
            );
            Ok(())
        }
        TurnEnd::Finished(Err(e)) => Err(e.into()),
        TurnEnd::Cancelled => {
            eprintln!("  [Cancelled]");
            Ok(())
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}
