//! Command grammar — how model output asks for a tool.
//!
//! A command is the text between `<command>` and `</command>`. Matching is
//! non-greedy and may span lines; a completion may carry any number of
//! commands. Inside the markers the first whitespace-separated token picks
//! the operation and everything after it is the single, literal argument.

use repoloop_core::error::GrammarError;
use repoloop_core::tool::{Operation, ToolArgs};

pub const OPEN_MARKER: &str = "<command>";
pub const CLOSE_MARKER: &str = "</command>";

/// Byte ranges of every complete `<command>…</command>` span, in order.
/// `outer` covers the markers, `inner` the text between them.
fn spans(text: &str) -> Vec<(std::ops::Range<usize>, std::ops::Range<usize>)> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(open) = text[pos..].find(OPEN_MARKER) {
        let start = pos + open;
        let inner_start = start + OPEN_MARKER.len();
        let Some(close) = text[inner_start..].find(CLOSE_MARKER) else {
            break;
        };
        let inner_end = inner_start + close;
        let end = inner_end + CLOSE_MARKER.len();
        out.push((start..end, inner_start..inner_end));
        pos = end;
    }
    out
}

/// Every command line embedded in `text`, trimmed, left to right.
/// An unterminated opening marker is not a command.
pub fn extract_commands(text: &str) -> Vec<&str> {
    spans(text)
        .into_iter()
        .map(|(_, inner)| text[inner].trim())
        .collect()
}

/// `text` with every command span (markers and contents) removed.
///
/// Removal repeats until no complete span is left, so splicing can never
/// assemble a fresh command out of the surrounding fragments.
pub fn strip_commands(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let found = spans(&current);
        if found.is_empty() {
            return current;
        }
        let mut out = String::with_capacity(current.len());
        let mut last = 0;
        for (outer, _) in found {
            out.push_str(&current[last..outer.start]);
            last = outer.end;
        }
        out.push_str(&current[last..]);
        current = out;
    }
}

/// A command the grammar accepted, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub operation: Operation,
    /// Empty for `/lr`
    pub argument: String,
}

impl Command {
    /// The surface token for an operation.
    pub fn token(operation: Operation) -> &'static str {
        match operation {
            Operation::ListRepos => "/lr",
            Operation::GetFileStructure => "/fs",
            Operation::ReadFile => "/ac",
            Operation::SearchRepos => "/search",
            Operation::GetReadme => "/readme",
            Operation::CloneRepo => "/clone",
        }
    }

    pub fn args(&self) -> ToolArgs {
        self.operation.args(&self.argument)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.argument.is_empty() {
            f.write_str(Command::token(self.operation))
        } else {
            write!(f, "{} {}", Command::token(self.operation), self.argument)
        }
    }
}

/// Map a leading token to its operation, case-insensitively.
pub fn operation_for_token(token: &str) -> Option<Operation> {
    Operation::ALL
        .into_iter()
        .find(|op| Command::token(*op).eq_ignore_ascii_case(token))
}

/// Parse one trimmed command line.
pub fn parse_command(line: &str) -> Result<Command, GrammarError> {
    let line = line.trim();
    let (token, argument) = match line.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (line, ""),
    };

    let Some(operation) = operation_for_token(token) else {
        return Err(GrammarError::InvalidCommand(line.to_string()));
    };

    let missing = match operation {
        Operation::ListRepos => {
            if !argument.is_empty() {
                return Err(GrammarError::UnexpectedArgument(token.to_lowercase()));
            }
            None
        }
        Operation::GetFileStructure | Operation::ReadFile => Some(GrammarError::NoPath),
        Operation::SearchRepos => Some(GrammarError::NoQuery),
        Operation::GetReadme => Some(GrammarError::NoRepositoryName),
        Operation::CloneRepo => {
            if !argument.is_empty() && !argument.ends_with(".git") {
                return Err(GrammarError::InvalidRepositoryUrl);
            }
            Some(GrammarError::NoRepositoryUrl)
        }
    };

    if let Some(error) = missing
        && argument.is_empty()
    {
        return Err(error);
    }

    Ok(Command {
        operation,
        argument: argument.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_order_across_lines() {
        let text = "Let me look.\n<command>/lr</command> then\n<command>\n  /fs demo/\n</command>";
        assert_eq!(extract_commands(text), vec!["/lr", "/fs demo/"]);
    }

    #[test]
    fn matching_is_non_greedy() {
        let text = "<command>/ac a.py</command> and <command>/ac b.py</command>";
        assert_eq!(extract_commands(text), vec!["/ac a.py", "/ac b.py"]);
    }

    #[test]
    fn unterminated_marker_is_ignored() {
        assert!(extract_commands("<command>/lr").is_empty());
        assert_eq!(
            extract_commands("<command>/lr</command><command>/fs x"),
            vec!["/lr"]
        );
    }

    #[test]
    fn no_markers_no_commands() {
        assert!(extract_commands("Just an answer.").is_empty());
    }

    #[test]
    fn strip_removes_markup() {
        let text = "Checking <command>/lr</command>now.";
        assert_eq!(strip_commands(text), "Checking now.");
    }

    #[test]
    fn strip_is_idempotent() {
        let samples = [
            "a<command>/lr</command>b<command>/fs x</command>c",
            "<command><command>/lr</command></command>",
            "plain text",
            "<command>/lr",
            "<comm<command>x</command>and>/lr</command>",
        ];
        for sample in samples {
            let once = strip_commands(sample);
            assert!(extract_commands(&once).is_empty(), "{sample:?} -> {once:?}");
            assert_eq!(strip_commands(&once), once);
        }
    }

    #[test]
    fn parses_each_token() {
        assert_eq!(
            parse_command("/lr").unwrap(),
            Command { operation: Operation::ListRepos, argument: String::new() }
        );
        assert_eq!(parse_command("/fs demo/src").unwrap().operation, Operation::GetFileStructure);
        assert_eq!(parse_command("/ac demo/foo.py").unwrap().operation, Operation::ReadFile);
        assert_eq!(parse_command("/search rust mcp client").unwrap().argument, "rust mcp client");
        assert_eq!(parse_command("/readme tokio-rs/tokio").unwrap().operation, Operation::GetReadme);
        assert_eq!(
            parse_command("/clone https://github.com/a/b.git").unwrap().operation,
            Operation::CloneRepo
        );
    }

    #[test]
    fn tokens_are_case_insensitive() {
        assert_eq!(parse_command("/LR").unwrap().operation, Operation::ListRepos);
        assert_eq!(parse_command("/Fs demo").unwrap().argument, "demo");
    }

    #[test]
    fn missing_arguments_are_rejected() {
        assert_eq!(parse_command("/fs"), Err(GrammarError::NoPath));
        assert_eq!(parse_command("/ac   "), Err(GrammarError::NoPath));
        assert_eq!(parse_command("/search"), Err(GrammarError::NoQuery));
        assert_eq!(parse_command("/readme"), Err(GrammarError::NoRepositoryName));
        assert_eq!(parse_command("/clone"), Err(GrammarError::NoRepositoryUrl));
    }

    #[test]
    fn clone_requires_git_suffix() {
        assert_eq!(
            parse_command("/clone https://github.com/a/b"),
            Err(GrammarError::InvalidRepositoryUrl)
        );
    }

    #[test]
    fn list_repos_takes_no_argument() {
        assert_eq!(
            parse_command("/lr demo"),
            Err(GrammarError::UnexpectedArgument("/lr".into()))
        );
    }

    #[test]
    fn unknown_tokens_are_invalid() {
        assert_eq!(
            parse_command("/rm -rf repos"),
            Err(GrammarError::InvalidCommand("/rm -rf repos".into()))
        );
        assert_eq!(parse_command(""), Err(GrammarError::InvalidCommand(String::new())));
    }

    #[test]
    fn wildcards_pass_through_literally() {
        let cmd = parse_command("/ac demo/*.py").unwrap();
        assert_eq!(cmd.args()["file_path"], "demo/*.py");
    }

    #[test]
    fn display_round_trips_the_surface_form() {
        assert_eq!(parse_command("/FS  demo ").unwrap().to_string(), "/fs demo");
        assert_eq!(parse_command("/lr").unwrap().to_string(), "/lr");
    }
}
