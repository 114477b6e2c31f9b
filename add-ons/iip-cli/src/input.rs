//! Line editing for the REPL.
//!
//! rustyline blocks on the terminal, so the editor lives on its own thread and hands lines to
//! the async chat loop over channels. One prompt is requested at a time.

use crate::repl::command_candidates;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc;

/// Completion and inline hints for the REPL commands.
struct CommandHelper;

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = command_candidates(&line[..pos])
            .into_iter()
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.is_empty() {
            return None;
        }
        command_candidates(line)
            .into_iter()
            .find(|cmd| cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

/// One read from the terminal.
#[derive(Debug)]
pub(crate) enum Input {
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    /// Ctrl-D, closed stdin, or a terminal error.
    Eof,
}

struct PromptRequest {
    prompt: String,
    record_history: bool,
}

/// Handle to the editor thread.
pub(crate) struct LineReader {
    prompts: std_mpsc::Sender<PromptRequest>,
    lines: mpsc::Receiver<Input>,
}

impl LineReader {
    /// Starts the editor thread. Fails when the terminal cannot be set up.
    pub(crate) fn spawn() -> Result<Self, String> {
        let (prompt_tx, prompt_rx) = std_mpsc::channel::<PromptRequest>();
        let (line_tx, line_rx) = mpsc::channel::<Input>(1);
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<(), String>>(1);

        std::thread::Builder::new()
            .name("iip-cli-readline".to_string())
            .spawn(move || {
                let mut editor = match Editor::<CommandHelper, DefaultHistory>::new() {
                    Ok(editor) => editor,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                editor.set_helper(Some(CommandHelper));
                let _ = ready_tx.send(Ok(()));

                // ends when the LineReader is dropped
                while let Ok(request) = prompt_rx.recv() {
                    let input = match editor.readline(&request.prompt) {
                        Ok(line) => {
                            if request.record_history && !line.trim().is_empty() {
                                let _ = editor.add_history_entry(line.as_str());
                            }
                            Input::Line(line)
                        }
                        Err(ReadlineError::Interrupted) => Input::Interrupted,
                        Err(ReadlineError::Eof) => Input::Eof,
                        Err(e) => {
                            tracing::warn!(target: "iip::cli", error = %e, "Terminal read failed");
                            Input::Eof
                        }
                    };
                    if line_tx.blocking_send(input).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| format!("cannot start line editor: {}", e))?;

        ready_rx
            .recv()
            .map_err(|_| "line editor exited during setup".to_string())??;
        Ok(Self {
            prompts: prompt_tx,
            lines: line_rx,
        })
    }

    /// Shows `prompt` and waits for a line. Lines typed with `record_history` off (phone and
    /// name entries) stay out of the editor history.
    pub(crate) async fn read(&mut self, prompt: &str, record_history: bool) -> Input {
        let request = PromptRequest {
            prompt: prompt.to_string(),
            record_history,
        };
        if self.prompts.send(request).is_err() {
            return Input::Eof;
        }
        self.lines.recv().await.unwrap_or(Input::Eof)
    }
}
