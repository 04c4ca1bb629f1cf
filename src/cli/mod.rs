// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train` — bootstraps a tokenizer and trains on a corpus
//   2. `reply` — loads a checkpoint and answers one message
//   3. `chat`  — the same, in a loop over stdin
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};

use commands::{Commands, ModelArgs, ReplyArgs, TrainArgs};
use crate::application::reply_use_case::AppContext;
use crate::domain::traits::Responder;

#[derive(Parser, Debug)]
#[command(
    name = "subword-chat",
    version = "0.1.0",
    about = "Train a next-token model on source files, then chat with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Reply(args) => run_reply(args),
            Commands::Chat(args)  => run_chat(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on files in: {}", args.corpus_dir);

    let report = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete: {} documents, vocab {}, {} train / {} validation windows.",
        report.documents, report.vocab_size, report.train_count, report.val_count
    );
    if let Some(last) = report.epochs.last() {
        println!("Final epoch {}: train_loss={:.4}", last.epoch, last.train_loss);
    }
    Ok(())
}

fn run_reply(args: ReplyArgs) -> Result<()> {
    let ctx = AppContext::load(args.model.into())?;

    if args.show_ids {
        let out = ctx.generate(&args.message)?;
        println!("ids:  {:?} ({:?})", out.tokens, out.stop);
        println!("text: {}", ctx.decode(&out.tokens)?);
    } else {
        println!("{}", ctx.generate_reply(&args.message)?);
    }
    Ok(())
}

fn run_chat(args: ModelArgs) -> Result<()> {
    let ctx = AppContext::load(args.into())?;
    println!("Type a message. :reload picks up new files, :quit exits.");

    let stdin  = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim_end_matches(['\r', '\n']);

        match message {
            ":quit" => break,
            ":reload" => match ctx.reload() {
                Ok(())   => println!("Reloaded."),
                Err(err) => println!("{err:#}"),
            },
            _ => match ctx.generate_reply(message) {
                Ok(reply) => println!("{reply}"),
                // Bad input ends this turn, not the session
                Err(err)  => println!("error: {err:#}"),
            },
        }
    }
    Ok(())
}
