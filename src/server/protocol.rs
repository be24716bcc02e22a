//! Line-oriented text protocol spoken with clients.

use std::num::IntErrorKind;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::graph::{Algorithm, Weight};

pub const NO_GRAPH: &str = "Graph not created. Use 'create' first.";

/// Largest graph a client may create. Every report walks the tree once per
/// vertex, so the cost of a command grows with the square of this.
pub const MAX_VERTICES: usize = 1_000;

pub static HELP_MENU: Lazy<String> = Lazy::new(|| {
    let algorithms = Algorithm::ALL
        .iter()
        .map(Algorithm::name)
        .collect::<Vec<_>>()
        .join(", ");
    [
        "Available commands:".to_string(),
        "  create <n>         Create a graph with n vertices".to_string(),
        "  add <u> <v> <w>    Add an edge u-v with weight w, replacing any existing one".to_string(),
        "  remove <u> <v>     Remove the edge u-v".to_string(),
        format!("  algo <name>        Choose the MST algorithm ({algorithms})"),
        "  help               Show this menu".to_string(),
        "  shutdown           Close the connection".to_string(),
    ]
    .join("\n")
        + "\n"
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(usize),
    Add { u: usize, v: usize, weight: Weight },
    Remove { u: usize, v: usize },
    Algo(String),
    Help,
    Shutdown,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid input. Syntax: {0}")]
    Syntax(&'static str),

    #[error("Unknown command. Use 'help' for a list of commands.")]
    UnknownCommand,

    #[error("Error: Number of vertices must be greater than or equal to 0.")]
    NegativeVertexCount,

    #[error("Error: Number of vertices must be at most {0}.")]
    TooManyVertices(usize),

    #[error("Error: Number out of range.")]
    OutOfRange,
}

impl Command {
    /// Parse one client line. `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>, ProtocolError> {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Ok(None);
        };
        let args = words.collect::<Vec<_>>();

        let command = match keyword {
            "create" => match args.as_slice() {
                &[n] => Command::Create(parse_vertex_count(n)?),
                _ => return Err(ProtocolError::Syntax("create <n>")),
            },
            "add" => {
                const SYNTAX: &str = "add <u> <v> <w>";
                let &[u, v, w] = args.as_slice() else {
                    return Err(ProtocolError::Syntax(SYNTAX));
                };
                Command::Add {
                    u: parse_arg(u, SYNTAX)?,
                    v: parse_arg(v, SYNTAX)?,
                    weight: parse_arg(w, SYNTAX)?,
                }
            }
            "remove" => {
                let [u, v] = parse_args::<usize, 2>(&args, "remove <u> <v>")?;
                Command::Remove { u, v }
            }
            "algo" => match args.as_slice() {
                &[name] => Command::Algo(name.to_string()),
                _ => return Err(ProtocolError::Syntax("algo <name>")),
            },
            "help" => Command::Help,
            "shutdown" => Command::Shutdown,
            _ => return Err(ProtocolError::UnknownCommand),
        };
        Ok(Some(command))
    }
}

fn parse_arg<T: std::str::FromStr>(arg: &str, syntax: &'static str) -> Result<T, ProtocolError> {
    arg.parse().map_err(|_| ProtocolError::Syntax(syntax))
}

fn parse_vertex_count(arg: &str) -> Result<usize, ProtocolError> {
    let n = arg.parse::<i64>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ProtocolError::OutOfRange,
        _ => ProtocolError::Syntax("create <n>"),
    })?;
    let n = usize::try_from(n).map_err(|_| ProtocolError::NegativeVertexCount)?;
    if n > MAX_VERTICES {
        return Err(ProtocolError::TooManyVertices(MAX_VERTICES));
    }
    Ok(n)
}

fn parse_args<T: std::str::FromStr + Copy + Default, const N: usize>(
    args: &[&str],
    syntax: &'static str,
) -> Result<[T; N], ProtocolError> {
    if args.len() != N {
        return Err(ProtocolError::Syntax(syntax));
    }
    let mut parsed = [T::default(); N];
    for (slot, arg) in parsed.iter_mut().zip(args) {
        *slot = parse_arg(arg, syntax)?;
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("create 5"), Ok(Some(Command::Create(5))));
        assert_eq!(
            Command::parse("  add 0 1 -3 "),
            Ok(Some(Command::Add { u: 0, v: 1, weight: -3 }))
        );
        assert_eq!(
            Command::parse("remove 1 0"),
            Ok(Some(Command::Remove { u: 1, v: 0 }))
        );
        assert_eq!(
            Command::parse("algo tarjan"),
            Ok(Some(Command::Algo("tarjan".into())))
        );
        assert_eq!(Command::parse("help"), Ok(Some(Command::Help)));
        assert_eq!(Command::parse("shutdown"), Ok(Some(Command::Shutdown)));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            Command::parse("create five"),
            Err(ProtocolError::Syntax("create <n>"))
        );
        assert_eq!(
            Command::parse("add 0 1"),
            Err(ProtocolError::Syntax("add <u> <v> <w>"))
        );
        assert_eq!(
            Command::parse("remove a b"),
            Err(ProtocolError::Syntax("remove <u> <v>"))
        );
        assert_eq!(
            Command::parse("algo").unwrap_err().to_string(),
            "Invalid input. Syntax: algo <name>"
        );
        assert_eq!(
            Command::parse("frobnicate 1").unwrap_err().to_string(),
            "Unknown command. Use 'help' for a list of commands."
        );
    }

    #[test]
    fn test_vertex_count_limits() {
        assert_eq!(Command::parse("create 0"), Ok(Some(Command::Create(0))));
        assert_eq!(
            Command::parse("create 1000"),
            Ok(Some(Command::Create(MAX_VERTICES)))
        );
        assert_eq!(
            Command::parse("create -1").unwrap_err().to_string(),
            "Error: Number of vertices must be greater than or equal to 0."
        );
        assert_eq!(
            Command::parse("create 4000000000").unwrap_err().to_string(),
            "Error: Number of vertices must be at most 1000."
        );
        assert_eq!(
            Command::parse("create 18446744073709551615"),
            Err(ProtocolError::OutOfRange)
        );
        assert_eq!(
            Command::parse("create").unwrap_err().to_string(),
            "Invalid input. Syntax: create <n>"
        );
    }

    #[test]
    fn test_help_lists_algorithms() {
        assert!(HELP_MENU.starts_with("Available commands:\n"));
        assert!(HELP_MENU.contains("prim, kruskal, boruvka, tarjan, integer_mst"));
        assert!(HELP_MENU.ends_with("Close the connection\n"));
    }
}
