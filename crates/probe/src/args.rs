use std::path::PathBuf;

use snafu::{OptionExt, ensure};

use crate::error::{
    MissingArgumentValueSnafu, MissingCommandSnafu, ProbeResult, UnknownArgumentSnafu,
    UnknownCommandSnafu, UnsupportedFlagSnafu,
};

pub const DEFAULT_STORE_PATH: &str = "chatlet-probe.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Posts one conversation turn.
    Turn { text: String, voice: bool },
    /// Switches the subject and sends a context notification.
    Context { subject: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Turn { .. } => "turn",
            Self::Context { .. } => "context",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeArgs {
    pub command: Command,
    pub config: Option<PathBuf>,
    pub store: PathBuf,
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> ProbeResult<ProbeArgs> {
    let mut pending = args.into_iter();
    let mut config = None;
    let mut store = None;
    let mut voice = false;
    let mut positional = Vec::new();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--config" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-config-value",
                    arg: "--config",
                })?;
                config = Some(PathBuf::from(value));
            }
            "--store" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-store-value",
                    arg: "--store",
                })?;
                store = Some(PathBuf::from(value));
            }
            "--voice" => voice = true,
            raw if raw.starts_with("--") => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
            _ => positional.push(argument),
        }
    }

    let mut positional = positional.into_iter();
    let name = positional.next().context(MissingCommandSnafu {
        stage: "parse-args-command",
    })?;
    // Remaining words are the turn text, so quoting is optional.
    let rest = positional.collect::<Vec<_>>().join(" ");

    let command = match name.as_str() {
        "turn" => {
            ensure!(
                !rest.is_empty(),
                MissingArgumentValueSnafu {
                    stage: "parse-args-turn-text",
                    arg: "turn",
                }
            );
            Command::Turn { text: rest, voice }
        }
        "context" => {
            ensure!(
                !voice,
                UnsupportedFlagSnafu {
                    stage: "parse-args-context-voice",
                    command: "context",
                    raw: "--voice",
                }
            );
            ensure!(
                !rest.is_empty(),
                MissingArgumentValueSnafu {
                    stage: "parse-args-context-subject",
                    arg: "context",
                }
            );
            Command::Context { subject: rest }
        }
        _ => {
            return UnknownCommandSnafu {
                stage: "parse-args-command",
                raw: name,
            }
            .fail();
        }
    };

    Ok(ProbeArgs {
        command,
        config,
        store: store.unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
    })
}
