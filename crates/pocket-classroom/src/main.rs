//! `pocketc` - CLI for pocket-classroom
//!
//! Presentation layer over the capsule and progress services.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;

use pocket_classroom::cli::{
    parse_answers, Cli, Command, ConfigCommand, DeleteCommand, ExportCommand, MarkCommand,
    OutputFormat, QuizCommand,
};
use pocket_classroom::storage::{self, Keys, MemoryStore, RecordStore, SqliteStore};
use pocket_classroom::study::{flashcard_summary, grade_quiz, search_notes, time_ago};
use pocket_classroom::{
    capsule, init_logging, transfer, Capsule, CapsuleService, Config, ProgressService,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    if let Command::Config(cmd) = cli.command {
        return handle_config(&config, cmd);
    }

    let store: Box<dyn RecordStore> = if cli.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(SqliteStore::open(config.database_path())?)
    };
    let keys = Keys::new(config.storage.key_prefix.clone());
    let app = App {
        config: &config,
        store: store.as_ref(),
        capsules: CapsuleService::new(store.as_ref(), keys.clone()),
        progress: ProgressService::new(store.as_ref(), keys.clone()),
        keys,
    };

    app.run(cli.command)
}

/// Services wired to one store for the lifetime of a command.
#[derive(Debug)]
struct App<'a> {
    config: &'a Config,
    store: &'a dyn RecordStore,
    capsules: CapsuleService<'a>,
    progress: ProgressService<'a>,
    keys: Keys,
}

impl App<'_> {
    fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::List(cmd) => self.handle_list(cmd.format),
            Command::Show(cmd) => self.handle_show(&cmd.id, cmd.format),
            Command::Save(cmd) => {
                let text = std::fs::read_to_string(&cmd.file)
                    .with_context(|| format!("reading {}", cmd.file.display()))?;
                let capsule: Capsule = serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", cmd.file.display()))?;
                let id = self.capsules.save(capsule)?;
                println!("Saved capsule {id}");
                Ok(())
            }
            Command::Delete(cmd) => self.handle_delete(&cmd),
            Command::Export(cmd) => self.handle_export(&cmd),
            Command::Import(cmd) => {
                let text = std::fs::read_to_string(&cmd.file)
                    .with_context(|| format!("reading {}", cmd.file.display()))?;
                let id = self.capsules.import(&text)?;
                println!("Imported capsule {id}");
                Ok(())
            }
            Command::Progress(cmd) => self.handle_progress(&cmd.id, cmd.format),
            Command::Mark(cmd) => self.handle_mark(&cmd),
            Command::Score(cmd) => {
                self.capsules.require(&cmd.id)?;
                let outcome = self.progress.record_best_score(&cmd.id, cmd.score)?;
                print_score(outcome);
                Ok(())
            }
            Command::Quiz(cmd) => self.handle_quiz(&cmd),
            Command::Search(cmd) => self.handle_search(&cmd.id, &cmd.query),
            Command::Stats(cmd) => self.handle_stats(cmd.json),
            Command::Config(cmd) => handle_config(self.config, cmd),
        }
    }

    fn handle_list(&self, format: OutputFormat) -> anyhow::Result<()> {
        let mut entries = self.capsules.list_index()?;
        capsule::sort_newest_first(&mut entries);

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Plain => {
                for e in &entries {
                    println!("{}\t{}", e.id, e.title);
                }
            }
            OutputFormat::Table => {
                if entries.is_empty() {
                    println!("No capsules yet. Create one with `pocketc save <file>`.");
                    return Ok(());
                }
                let now = Utc::now();
                println!(
                    "{:<32}  {:<30}  {:<16}  {:<12}  {:<5}  {:<7}  UPDATED",
                    "ID", "TITLE", "SUBJECT", "LEVEL", "BEST", "KNOWN"
                );
                for e in &entries {
                    let progress = self.progress.load_progress(&e.id);
                    let best = progress
                        .best_score
                        .map_or_else(|| "-".to_string(), |b| format!("{b}%"));
                    let known = match self.capsules.load(&e.id) {
                        Ok(Some(capsule)) => {
                            let summary = flashcard_summary(&capsule, &progress);
                            format!("{}/{}", summary.known, summary.total)
                        }
                        _ => "-".to_string(),
                    };
                    println!(
                        "{:<32}  {:<30}  {:<16}  {:<12}  {:<5}  {:<7}  {}",
                        e.id,
                        truncate(&e.title, 30),
                        truncate(&e.subject, 16),
                        e.level.map(|l| l.to_string()).unwrap_or_default(),
                        best,
                        known,
                        time_ago(e.last_updated, now)
                    );
                }
            }
        }
        Ok(())
    }

    fn handle_show(&self, id: &str, format: OutputFormat) -> anyhow::Result<()> {
        let capsule = self.capsules.require(id)?;
        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&capsule)?);
            return Ok(());
        }

        println!("{}", capsule.title);
        println!("{}", "=".repeat(capsule.title.chars().count()));
        if !capsule.subject.is_empty() {
            println!("Subject:     {}", capsule.subject);
        }
        if let Some(level) = capsule.level {
            println!("Level:       {level}");
        }
        if let Some(updated) = capsule.last_updated {
            println!("Updated:     {}", time_ago(updated, Utc::now()));
        }
        let progress = self.progress.load_progress(id);
        if let Some(best) = progress.best_score {
            println!("Best score:  {best}%");
        }
        if !capsule.description.is_empty() {
            println!();
            println!("{}", capsule.description);
        }

        if !capsule.resources.is_empty() {
            println!();
            println!("[Resources]");
            for r in &capsule.resources {
                println!("  {} <{}>", r.label, r.url);
            }
        }
        if !capsule.notes.is_empty() {
            println!();
            println!("[Notes]");
            for (i, note) in capsule.notes.iter().enumerate() {
                println!("  {i}. {note}");
            }
        }
        if !capsule.flashcards.is_empty() {
            println!();
            println!("[Flashcards]");
            for (i, card) in capsule.flashcards.iter().enumerate() {
                let mark = match progress.status(i) {
                    Some(true) => "known",
                    Some(false) => "unknown",
                    None => "-",
                };
                println!("  {i}. {} / {} ({mark})", card.front, card.back);
            }
        }
        if !capsule.quiz.is_empty() {
            println!();
            println!("[Quiz]");
            for (i, q) in capsule.quiz.iter().enumerate() {
                println!("  {i}. {}", q.question);
                for (j, option) in q.options.iter().enumerate() {
                    println!("     {j}) {option}");
                }
            }
        }
        Ok(())
    }

    fn handle_delete(&self, cmd: &DeleteCommand) -> anyhow::Result<()> {
        let capsule = self.capsules.require(&cmd.id)?;
        if !cmd.yes && !confirm(&format!("Delete capsule \"{}\"?", capsule.title))? {
            println!("Aborted.");
            return Ok(());
        }
        self.capsules.delete(&cmd.id)?;
        println!("Deleted capsule {}", cmd.id);
        Ok(())
    }

    fn handle_export(&self, cmd: &ExportCommand) -> anyhow::Result<()> {
        let capsule = self.capsules.require(&cmd.id)?;
        let Some(json) = self.capsules.export(&cmd.id)? else {
            bail!("capsule {} disappeared during export", cmd.id);
        };

        if cmd.stdout {
            println!("{json}");
            return Ok(());
        }

        let path = cmd.output.clone().unwrap_or_else(|| {
            self.config
                .export_dir()
                .join(transfer::export_file_name(&capsule.title))
        });
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("Exported \"{}\" to {}", capsule.title, path.display());
        Ok(())
    }

    fn handle_progress(&self, id: &str, format: OutputFormat) -> anyhow::Result<()> {
        let capsule = self.capsules.require(id)?;
        let progress = self.progress.load_progress(id);

        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&progress)?);
            return Ok(());
        }

        let summary = flashcard_summary(&capsule, &progress);
        println!("{}", capsule.title);
        println!(
            "  Flashcards:  {}/{} known, {} unknown, {} unseen",
            summary.known, summary.total, summary.unknown, summary.unseen
        );
        match progress.best_score {
            Some(best) => println!("  Best score:  {best}%"),
            None => println!("  Best score:  -"),
        }
        if let Some(studied) = progress.last_studied {
            println!("  Studied:     {}", time_ago(studied, Utc::now()));
        }
        Ok(())
    }

    fn handle_mark(&self, cmd: &MarkCommand) -> anyhow::Result<()> {
        self.progress
            .record_flashcard_status(&cmd.id, cmd.index, cmd.known)?;
        println!(
            "Card {} marked {}",
            cmd.index,
            if cmd.known { "known" } else { "unknown" }
        );
        Ok(())
    }

    fn handle_quiz(&self, cmd: &QuizCommand) -> anyhow::Result<()> {
        let capsule = self.capsules.require(&cmd.id)?;
        if capsule.quiz.is_empty() {
            bail!("capsule {} has no quiz questions", cmd.id);
        }
        let answers = parse_answers(&cmd.answers).map_err(anyhow::Error::msg)?;
        let result = grade_quiz(&capsule.quiz, &answers);

        for (i, (question, feedback)) in capsule.quiz.iter().zip(&result.feedback).enumerate() {
            let option = |index: usize| question.options.get(index).map_or("?", String::as_str);
            println!("  {i}. {}", question.question);
            match feedback.chosen {
                _ if feedback.is_correct => {
                    println!("     Correct: {}", option(feedback.correct_index));
                }
                Some(chosen) => {
                    println!("     Incorrect: you chose {}", option(chosen));
                    println!("     Answer: {}", option(feedback.correct_index));
                }
                None => {
                    println!("     Skipped. Answer: {}", option(feedback.correct_index));
                }
            }
            if let Some(explanation) = &question.explanation {
                println!("     {explanation}");
            }
        }
        println!();
        println!(
            "You answered {} out of {} questions correctly ({}%).",
            result.correct, result.total, result.score
        );
        let outcome = self.progress.record_best_score(&cmd.id, result.score)?;
        print_score(outcome);
        Ok(())
    }

    fn handle_search(&self, id: &str, query: &str) -> anyhow::Result<()> {
        let capsule = self.capsules.require(id)?;
        let matches = search_notes(&capsule, query);
        if matches.is_empty() {
            println!("No notes match \"{query}\".");
            return Ok(());
        }
        let width = self.config.study.search_snippet_chars;
        for m in matches {
            println!("  {}. {}", m.index, truncate(&m.text, width));
        }
        Ok(())
    }

    fn handle_stats(&self, json: bool) -> anyhow::Result<()> {
        let stats = storage::stats(self.store, &self.keys)?;
        let index_len = self.capsules.list_index()?.len();
        if json {
            let value = serde_json::json!({
                "database_path": self.config.database_path(),
                "key_prefix": self.keys.prefix(),
                "capsules": stats.capsules,
                "index_entries": index_len,
                "progress_records": stats.progress_records,
                "size_bytes": stats.size_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("pocketc stats");
            println!("-------------");
            println!("Database:          {}", self.config.database_path().display());
            println!("Key prefix:        {}", self.keys.prefix());
            println!("Capsules:          {}", stats.capsules);
            println!("Index entries:     {index_len}");
            println!("Progress records:  {}", stats.progress_records);
            println!("Size (bytes):      {}", stats.size_bytes);
        }
        Ok(())
    }
}

fn print_score(outcome: pocket_classroom::ScoreOutcome) {
    if outcome.new_best {
        println!("New record! Best score: {}%", outcome.best);
    } else {
        println!("Score {}%. Best score: {}%", outcome.score, outcome.best);
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Key prefix:         {}", config.storage.key_prefix);
                println!();
                println!("[Study]");
                println!(
                    "  Search snippet:     {} chars",
                    config.study.search_snippet_chars
                );
                println!();
                println!("[Export]");
                println!("  Directory:          {}", config.export_dir().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
