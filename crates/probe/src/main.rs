//! Terminal probe for the widget's conversation and context endpoints.
//!
//! ```text
//! chatlet-probe [--config widget.json] [--store ids.json] turn <text> [--voice]
//! chatlet-probe [--config widget.json] [--store ids.json] context <urlId>
//! ```

mod args;
mod error;
mod host;

use std::env;
use std::rc::Rc;

use snafu::ResultExt;
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

use chatlet_core::{
    ContextModel, ContextNotice, Dispatcher, IdentityStore, InputMethod, Messages, OutboundTurn,
    ReplyKind, TurnReply, WidgetSettings,
};
use chatlet_storage::{FallbackStore, JsonFileStore, MemoryStore, SharedStore, SubjectId};

use crate::args::{Command, ProbeArgs, parse_args};
use crate::error::{HttpClientSnafu, InvalidSubjectSnafu, ProbeResult, SettingsSnafu};
use crate::host::{ReqwestClient, TokioSpawner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let local = LocalSet::new();
    let outcome = local.run_until(run()).await;
    // Background context notifications finish before exit.
    local.await;

    if let Err(error) = outcome {
        println!("probe_ok=false");
        eprintln!("probe_error={error}");
        std::process::exit(1);
    }
    println!("probe_ok=true");
}

async fn run() -> ProbeResult<()> {
    let args = parse_args(env::args().skip(1))?;
    println!("command={}", args.command.name());

    let settings = WidgetSettings::load(args.config.as_deref()).context(SettingsSnafu {
        stage: "probe-load-settings",
    })?;

    let store = open_store(&args);
    let keys = settings.storage_keys();
    let session_id = IdentityStore::new(Rc::clone(&store), keys.session).get_or_create_session_id();
    println!("session_id={session_id}");

    let client = reqwest::Client::builder()
        .user_agent(concat!("chatlet-probe/", env!("CARGO_PKG_VERSION")))
        .build()
        .context(HttpClientSnafu {
            stage: "probe-build-http-client",
        })?;
    let dispatcher = Dispatcher::new(
        &settings,
        Rc::new(ReqwestClient::new(client)),
        None,
        Rc::new(TokioSpawner),
    );
    let mut context = ContextModel::resolve_initial(None, store, keys.subject);

    match args.command {
        Command::Turn { text, voice } => {
            let method = if voice {
                InputMethod::Spoken
            } else {
                InputMethod::Typed
            };
            let turn = OutboundTurn {
                chat_input: text,
                action: method.action(),
                session_id,
                subject: context.subject().cloned(),
            };
            println!(
                "subject={}",
                turn.subject.as_ref().map(SubjectId::as_str).unwrap_or("")
            );

            let reply = dispatcher.send_turn(&turn).await;
            print_reply(&reply, &settings);
        }
        Command::Context { subject } => {
            let parsed = SubjectId::parse(&subject).context(InvalidSubjectSnafu {
                stage: "probe-parse-subject",
                raw: subject.clone(),
            })?;
            context.set_subject(Some(parsed));

            match context.take_pending_notification() {
                Some(subject) => {
                    let delivery = dispatcher.notify_context_changed(&ContextNotice {
                        subject,
                        session_id,
                        full_url: None,
                    });
                    println!("context_delivery={delivery:?}");
                }
                None => println!("context_delivery=Unchanged"),
            }
        }
    }

    Ok(())
}

/// File store when it opens, memory otherwise; both behind the degrade wrapper.
fn open_store(args: &ProbeArgs) -> SharedStore {
    match JsonFileStore::open(&args.store) {
        Ok(file) => Rc::new(FallbackStore::new(file)),
        Err(error) => {
            tracing::warn!(
                path = %args.store.display(),
                error = %error,
                "identity file unusable, using memory"
            );
            Rc::new(MemoryStore::new())
        }
    }
}

fn print_reply(reply: &TurnReply, settings: &WidgetSettings) {
    let messages = Messages::for_locale(settings.locale);
    match reply {
        TurnReply::Text(text) => match ReplyKind::classify(text, &settings.form_sentinel) {
            ReplyKind::Text(text) => {
                println!("reply_kind=text");
                println!("reply={text}");
            }
            ReplyKind::LeadForm { text } => {
                println!("reply_kind=lead_form");
                println!("reply={text}");
            }
        },
        other => {
            println!("reply_kind=failure");
            println!("reply={}", other.display_text(messages));
        }
    }
}
