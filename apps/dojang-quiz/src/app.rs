//! Line-oriented study and test runner.

use crate::config::StudyConfig;
use crate::store::ProfileStore;
use anyhow::{Context, Result};
use chrono::Utc;
use dojang_engine::{
    Catalog, Engine, Learner, ProgressBook, Results, Session, SessionCard, SessionConfig,
    SessionMode, SessionSnapshot, TestKind,
};
use rand::Rng;
use std::io::{BufRead, Write};
use std::time::Instant;

/// How an interactive run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Every card was passed.
    Finished,
    /// The learner quit; the session should be saved for later.
    Suspended,
}

pub struct App {
    engine: Engine,
    catalog: Catalog,
    store: ProfileStore,
    study: StudyConfig,
}

impl App {
    pub fn new(engine: Engine, catalog: Catalog, store: ProfileStore, study: StudyConfig) -> Self {
        Self {
            engine,
            catalog,
            store,
            study,
        }
    }

    fn learner<'a>(&'a self, progress: &'a ProgressBook) -> Learner<'a> {
        Learner {
            rank: &self.study.rank,
            mode: self.study.learning_mode,
            progress,
        }
    }

    /// Load the profile's progress, creating records for new catalog items.
    fn progress(&self) -> Result<ProgressBook> {
        let mut book = self.store.load_progress().context("Failed to load progress")?;
        let created = book.migrate(&self.catalog);
        if created > 0 {
            tracing::info!(created, "added progress records for new items");
            self.store.save_progress(&book)?;
        }
        Ok(book)
    }

    pub fn study<G: Rng + ?Sized>(
        &self,
        category: Option<&str>,
        rng: &mut G,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<Results>> {
        let book = self.progress()?;
        let learner = self.learner(&book);
        let count = self.study.question_count;
        let session = match category {
            Some(category) => {
                let items = self.engine.select_items(
                    &self.catalog,
                    &learner,
                    count,
                    Some(category),
                    rng,
                )?;
                let cards = items.into_iter().cloned().map(SessionCard::flashcard).collect();
                let config = SessionConfig::new(SessionMode::Study, learner.mode, learner.rank)
                    .with_category(category);
                Session::new(config, cards)
            }
            None => self.engine.build_study(&self.catalog, &learner, count, Utc::now(), rng)?,
        };
        self.start_and_run(session, book, input, output)
    }

    pub fn test<G: Rng + ?Sized>(
        &self,
        kind: TestKind,
        rng: &mut G,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<Results>> {
        let book = self.progress()?;
        let learner = self.learner(&book);
        let session = self
            .engine
            .build_test(&self.catalog, &learner, kind, self.study.question_count, rng)?;
        self.start_and_run(session, book, input, output)
    }

    /// Continue the saved session, if any.
    pub fn resume(
        &self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<Results>> {
        let Some(snapshot) = self.store.load_session()? else {
            writeln!(output, "No saved session.")?;
            return Ok(None);
        };
        writeln!(output, "Resuming {}", describe_snapshot(&snapshot))?;
        let session = Session::restore(snapshot).context("Saved session is corrupt")?;
        tracing::info!(
            session = %session.id(),
            index = session.current_index(),
            "resuming session"
        );
        let book = self.progress()?;
        self.run(session, book, input, output)
    }

    pub fn stats(&self, output: &mut impl Write) -> Result<()> {
        let book = self.progress()?;
        let scheduler = self.engine.scheduler();
        let dist = book.box_distribution(scheduler, &self.catalog);
        let summary = book.summary(&self.catalog);
        let due = book.due_items(scheduler, &self.catalog, Utc::now()).len();

        writeln!(
            output,
            "Profile: {} ({}, {})",
            self.study.profile,
            self.study.rank,
            self.study.learning_mode.name()
        )?;
        writeln!(output, "Items: {} ({} due now)", dist.total(), due)?;
        for (box_number, count) in &dist.boxes {
            writeln!(output, "  Box {}: {}", box_number, count)?;
        }
        if dist.untracked > 0 {
            writeln!(output, "  Untracked: {}", dist.untracked)?;
        }
        writeln!(
            output,
            "Learning {} / Familiar {} / Mastered {} / Never seen {}",
            summary.learning, summary.familiar, summary.mastered, summary.never_seen
        )?;

        let history = self.store.load_history()?;
        if let Some(last) = history.last() {
            writeln!(output, "Sessions: {} (last {:.0}%)", history.len(), last.accuracy_percent())?;
        }
        writeln!(output, "Trend: {}", self.engine.aggregator().analyze_trend(&history).name())?;
        Ok(())
    }

    fn start_and_run(
        &self,
        mut session: Session,
        book: ProgressBook,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<Results>> {
        if session.is_empty() {
            writeln!(output, "Nothing to review for {}.", self.study.rank)?;
            return Ok(None);
        }
        if self.store.load_session()?.is_some() {
            tracing::warn!("discarding previously saved session");
        }
        session.start(Utc::now())?;
        self.run(session, book, input, output)
    }

    fn run(
        &self,
        mut session: Session,
        mut book: ProgressBook,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<Results>> {
        let exit = match session.mode() {
            SessionMode::Test => run_test(&mut session, input, output)?,
            SessionMode::Study => run_study(&mut session, input, output)?,
        };

        if exit == Exit::Suspended {
            self.store.save_session(&session.save_state())?;
            writeln!(output, "\nSession saved. Run `dojang-quiz resume` to continue.")?;
            return Ok(None);
        }

        let results = self.engine.finish_session(&mut session, &mut book, Utc::now())?;
        self.store.save_progress(&book)?;
        self.store.append_history(&results)?;
        self.store.clear_session()?;
        tracing::info!(
            session = %results.session_id,
            accuracy = results.accuracy,
            "session finished"
        );
        print_results(output, &results)?;
        Ok(Some(results))
    }
}

/// Read one trimmed line; `None` on end of input.
fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn prompt(output: &mut impl Write, text: &str) -> Result<()> {
    write!(output, "{}", text)?;
    output.flush()?;
    Ok(())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

pub fn run_test(
    session: &mut Session,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Exit> {
    let total = session.len();
    while !session.is_at_end() {
        let index = session.current_index();
        let question = session
            .current_card()
            .and_then(|card| card.question.clone())
            .context("Test card has no question")?;

        writeln!(output, "\n[{}/{}] {}", index + 1, total, question.prompt)?;
        for (i, option) in question.options.iter().enumerate() {
            writeln!(output, "  {}. {}", i + 1, option)?;
        }

        let started = Instant::now();
        let selected = loop {
            prompt(output, "Answer (1-4, q to save and quit): ")?;
            let Some(line) = read_line(input)? else {
                return Ok(Exit::Suspended);
            };
            if line.eq_ignore_ascii_case("q") {
                return Ok(Exit::Suspended);
            }
            match line.parse::<usize>() {
                Ok(n) if (1..=question.options.len()).contains(&n) => break n - 1,
                _ => writeln!(output, "Enter a number from 1 to {}.", question.options.len())?,
            }
        };

        let correct = session.record_answer(selected, elapsed_ms(started))?.is_correct;
        if correct {
            writeln!(output, "Correct!")?;
        } else {
            writeln!(output, "Incorrect. The answer was: {}", question.correct_answer())?;
        }
        session.advance()?;
    }
    Ok(Exit::Finished)
}

pub fn run_study(
    session: &mut Session,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Exit> {
    let total = session.len();
    while !session.is_at_end() {
        let index = session.current_index();
        let item = session
            .current_card()
            .map(|card| card.item.clone())
            .context("No current card")?;

        writeln!(output, "\n[{}/{}] {}", index + 1, total, item.front_text)?;
        if !item.pronunciation.is_empty() {
            writeln!(output, "  ({})", item.pronunciation)?;
        }
        let started = Instant::now();
        prompt(output, "Enter to flip, s to skip, b to go back, q to save and quit: ")?;
        let Some(command) = read_line(input)? else {
            return Ok(Exit::Suspended);
        };

        match command.to_lowercase().as_str() {
            "q" => return Ok(Exit::Suspended),
            "s" => {
                session.skip()?;
                continue;
            }
            "b" => {
                session.previous()?;
                continue;
            }
            _ => {}
        }

        session.flip()?;
        writeln!(output, "  = {}", item.back_text)?;
        if !item.definition.is_empty() {
            writeln!(output, "  {}", item.definition)?;
        }

        let knew = loop {
            prompt(output, "Did you know it? (y/n): ")?;
            let Some(line) = read_line(input)? else {
                return Ok(Exit::Suspended);
            };
            match line.to_lowercase().as_str() {
                "y" | "yes" => break true,
                "n" | "no" => break false,
                "q" => return Ok(Exit::Suspended),
                _ => {}
            }
        };
        session.record_recall(knew, elapsed_ms(started))?;
        session.advance()?;
    }
    Ok(Exit::Finished)
}

pub fn print_results(output: &mut impl Write, results: &Results) -> Result<()> {
    writeln!(output, "\n=== Results ===")?;
    writeln!(
        output,
        "{} of {} correct ({:.0}%)",
        results.correct_count,
        results.total_items,
        results.accuracy_percent()
    )?;
    if let Some(ms) = results.average_response_time_ms {
        writeln!(output, "Average response: {:.1}s", ms / 1000.0)?;
    }

    if !results.category_breakdown.is_empty() {
        writeln!(output, "\nBy category:")?;
        for b in &results.category_breakdown {
            writeln!(
                output,
                "  {:<16} {}/{} ({:.0}%)",
                b.name,
                b.correct,
                b.total,
                b.accuracy * 100.0
            )?;
        }
    }
    if !results.weak_areas.is_empty() {
        writeln!(output, "\nWeak areas:")?;
        for area in &results.weak_areas {
            writeln!(output, "  - {}", area)?;
        }
    }
    if !results.recommendations.is_empty() {
        writeln!(output, "\nRecommendations:")?;
        for rec in &results.recommendations {
            writeln!(output, "  - {}", rec)?;
        }
    }
    Ok(())
}

/// One-line description of a saved session.
pub fn describe_snapshot(snapshot: &SessionSnapshot) -> String {
    format!(
        "{} session at card {} of {}",
        snapshot.config.mode.name(),
        (snapshot.current_index + 1).min(snapshot.cards.len()),
        snapshot.cards.len()
    )
}
