// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to the use cases.
//
//   1. `train`     — trains the model on a parallel corpus
//   2. `translate` — loads the latest checkpoint and translates
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs, TranslateArgs};

use crate::domain::traits::Translator;

#[derive(Parser, Debug)]
#[command(
    name = "attention-nmt",
    version = "0.1.0",
    about = "Train a bidirectional-LSTM + Bahdanau-attention translation model, then translate."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Translate(args) => run_translate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}' → '{}'", args.src_file, args.trg_file);
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Checkpoint saved.");
    Ok(())
}

fn run_translate(args: TranslateArgs) -> Result<()> {
    use crate::application::translate_use_case::TranslateUseCase;

    let use_case = TranslateUseCase::new(&args.checkpoint_dir, args.max_dec_len)?;
    let output = use_case.translate(&args.sentence)?;
    println!("{}", output);
    Ok(())
}
