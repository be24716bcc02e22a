//! One client conversation: command handling and report generation.

use std::io::{BufRead, Write};
use std::sync::Arc;

use crossbeam::channel::unbounded;

use crate::error::Result;
use crate::graph::analysis::Section;
use crate::graph::{Algorithm, Graph, MstAnalysis};
use crate::server::config::Mode;
use crate::server::protocol::{Command, HELP_MENU, NO_GRAPH};
use crate::work::{Pipeline, Task};

/// Text to send back, and whether the connection should close afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub close: bool,
}

impl Reply {
    fn line(text: impl std::fmt::Display) -> Self {
        Self {
            text: format!("{text}\n"),
            close: false,
        }
    }
}

/// Build the analysis report on a four-stage pipeline, one stage per section.
///
/// Every stage renders its section from the same snapshot and reports it with
/// its index. The request value relayed through the chain trails the section
/// tasks on each stage's queue, so once it comes out of the last stage every
/// section has been rendered.
pub fn pipeline_report(analysis: Arc<MstAnalysis>) -> Result<String> {
    let (tx, rx) = unbounded();
    let mut pipeline = Pipeline::new();
    for (index, section) in Section::ALL.into_iter().enumerate() {
        let analysis = Arc::clone(&analysis);
        let tx = tx.clone();
        pipeline.add_task(Task::new(move || {
            tx.send((index, analysis.render(section)))?;
            Ok(format!("{section:?}"))
        }))?;
    }
    drop(tx);

    pipeline.start()?;
    pipeline.execute("report")?.wait()?;
    pipeline.stop();

    let mut sections = rx.try_iter().collect::<Vec<_>>();
    if sections.len() != Section::ALL.len() {
        return Err(anyhow::anyhow!(
            "{} of {} report sections rendered",
            sections.len(),
            Section::ALL.len()
        )
        .into());
    }
    sections.sort_unstable_by_key(|&(index, _)| index);
    Ok(sections.into_iter().map(|(_, text)| text).collect())
}

#[derive(Debug)]
pub struct Session {
    graph: Option<Graph>,
    algorithm: Algorithm,
    mode: Mode,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            graph: None,
            algorithm: Algorithm::default(),
            mode,
        }
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Apply one client line. Graph commands are followed by the analysis
    /// report whenever a graph exists afterwards.
    pub fn handle(&mut self, line: &str) -> Reply {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Reply::default(),
            Err(err) => return Reply::line(err),
        };
        tracing::debug!(?command, "Handling command");

        let mut reply = match command {
            Command::Help => return Reply::line(HELP_MENU.trim_end()),
            Command::Shutdown => {
                return Reply {
                    text: "Closing connection.\n".to_string(),
                    close: true,
                }
            }
            Command::Create(n) => {
                self.graph = Some(Graph::new(n));
                Reply::line(format_args!("Graph created with {n} vertices."))
            }
            Command::Algo(_) if self.graph.is_none() => {
                return Reply::line(format_args!("Error: {NO_GRAPH}"));
            }
            Command::Algo(name) => match name.parse::<Algorithm>() {
                Ok(algorithm) => {
                    self.algorithm = algorithm;
                    Reply::line(format_args!("Algorithm set to {algorithm}."))
                }
                Err(err) => Reply::line(format_args!("Error: {err}.")),
            },
            Command::Add { u, v, weight } => match self.graph.as_mut() {
                None => return Reply::line(NO_GRAPH),
                Some(graph) => match graph.add_edge(u, v, weight) {
                    Ok(()) => Reply::line(format_args!("Edge {u}-{v} added with weight {weight}.")),
                    Err(err) => Reply::line(format_args!("Error: {err}.")),
                },
            },
            Command::Remove { u, v } => match self.graph.as_mut() {
                None => return Reply::line(NO_GRAPH),
                Some(graph) => match graph.remove_edge(u, v) {
                    Ok(true) => Reply::line(format_args!("Edge {u}-{v} removed.")),
                    Ok(false) => Reply::line(format_args!("No edge between {u} and {v}.")),
                    Err(err) => Reply::line(format_args!("Error: {err}.")),
                },
            },
        };

        if let Some(report) = self.report() {
            match report {
                Ok(report) => reply.text.push_str(&report),
                Err(err) => {
                    tracing::error!("Report failed: {err}");
                    reply.text.push_str(&format!("Error: {err}.\n"));
                }
            }
        }
        reply
    }

    fn report(&self) -> Option<Result<String>> {
        let graph = self.graph.as_ref()?;
        let analysis = MstAnalysis::new(graph.clone(), self.algorithm);
        Some(match self.mode {
            Mode::LeaderFollowers => Ok(analysis.report()),
            Mode::Pipeline => pipeline_report(Arc::new(analysis)),
        })
    }
}

/// Run a session until the client disconnects or asks to close.
pub fn serve(reader: impl BufRead, mut writer: impl Write, mode: Mode) -> Result<()> {
    let mut session = Session::new(mode);
    writer.write_all(HELP_MENU.as_bytes())?;
    writer.flush()?;

    for line in reader.lines() {
        let line = line?;
        let reply = session.handle(&line);
        if !reply.text.is_empty() {
            writer.write_all(reply.text.as_bytes())?;
            writer.flush()?;
        }
        if reply.close {
            break;
        }
    }
    Ok(())
}
