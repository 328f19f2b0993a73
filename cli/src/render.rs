use std::io::{self, Write};

use hunter2_live_core::{NoticeLevel, PageView, PuzzleSession, StoreKind};

use crate::live::LiveEvent;

/// Prints live events for a terminal, either as readable lines or as one
/// JSON page view per change.
#[derive(Debug)]
pub struct Printer<W> {
    out: W,
    json: bool,
    printed_guesses: usize,
}

impl Printer<io::Stdout> {
    pub fn stdout(json: bool) -> Self {
        Self::new(io::stdout(), json)
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self {
            out,
            json,
            printed_guesses: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn observe(&mut self, session: &PuzzleSession, event: &LiveEvent) -> io::Result<()> {
        if self.json {
            return self.json_line(session, event);
        }
        match event {
            LiveEvent::Connected { opened } => {
                writeln!(self.out, "* connected (#{opened})")?;
                self.guesses(session)?;
            }
            LiveEvent::Disconnected { retry_in_ms } => {
                writeln!(self.out, "* disconnected, retrying in {retry_in_ms}ms")?;
            }
            LiveEvent::Submitting(answer) => writeln!(self.out, "> {answer}")?,
            LiveEvent::Rejected(rejected) => writeln!(self.out, "! {rejected}")?,
            LiveEvent::CooldownOver => writeln!(self.out, "* ready for another answer")?,
            LiveEvent::Update(update) => {
                for store in &update.changed {
                    match store {
                        StoreKind::Guesses => self.guesses(session)?,
                        StoreKind::Unlocks => self.unlocks(session)?,
                        StoreKind::Hints => self.hints(session)?,
                        StoreKind::Announcements => self.announcements(session)?,
                    }
                }
                for notice in &update.notices {
                    let marker = match notice.level {
                        NoticeLevel::Info => "*",
                        NoticeLevel::Warning | NoticeLevel::Error => "!",
                    };
                    writeln!(self.out, "{marker} {}", notice.message)?;
                }
                if let Some(wait_ms) = update.cooldown_ms {
                    writeln!(self.out, "* cooldown {:.1}s", wait_ms as f64 / 1000.0)?;
                }
                if let Some(solved) = &update.solved {
                    match &solved.url {
                        Some(url) => writeln!(self.out, "** {} ({url})", solved.message())?,
                        None => writeln!(self.out, "** {}", solved.message())?,
                    }
                }
            }
        }
        self.out.flush()
    }

    fn json_line(&mut self, session: &PuzzleSession, event: &LiveEvent) -> io::Result<()> {
        if matches!(event, LiveEvent::Update(update) if update.changed.is_empty()) {
            return Ok(());
        }
        let view = PageView::build(session)
            .to_json()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        writeln!(self.out, "{view}")?;
        self.out.flush()
    }

    /// Guesses are append-only, so only the tail since the last print is new.
    fn guesses(&mut self, session: &PuzzleSession) -> io::Result<()> {
        let guesses = session.stores().guesses();
        for guess in guesses.iter().skip(self.printed_guesses) {
            let mark = if guess.correct { "correct" } else { "" };
            writeln!(self.out, "  {:<20} {} {mark}", guess.author, guess.text)?;
        }
        self.printed_guesses = guesses.len();
        Ok(())
    }

    fn unlocks(&mut self, session: &PuzzleSession) -> io::Result<()> {
        writeln!(self.out, "-- unlocks")?;
        for unlock in session.stores().unlocks().sorted() {
            let text = unlock.text().unwrap_or("(pending)");
            writeln!(self.out, "  {text}  [{}]", unlock.guesses().join(", "))?;
            for hint in unlock.hints() {
                writeln!(self.out, "    {}: {}", hint.time, hint.text)?;
            }
        }
        Ok(())
    }

    fn hints(&mut self, session: &PuzzleSession) -> io::Result<()> {
        writeln!(self.out, "-- hints")?;
        for hint in session.stores().hints().sorted() {
            writeln!(self.out, "  {}: {}", hint.time, hint.text)?;
        }
        Ok(())
    }

    fn announcements(&mut self, session: &PuzzleSession) -> io::Result<()> {
        writeln!(self.out, "-- announcements")?;
        for announcement in session.stores().announcements().iter() {
            writeln!(self.out, "  [{}] {}", announcement.title, announcement.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunter2_live_core::SyncConfig;

    #[test]
    fn guess_log_prints_each_guess_once() {
        let mut session = PuzzleSession::new(SyncConfig::default(), 0);
        let mut printer = Printer::new(Vec::new(), false);
        let frame = r#"{"type":"new_guess","content":{"guess_uid":"g1","by":"ann","guess":"OTTER","correct":false}}"#;

        for _ in 0..2 {
            let update = session.on_message(frame, 10);
            printer
                .observe(&session, &LiveEvent::Update(update))
                .expect("write to vec");
        }

        let out = String::from_utf8(printer.into_inner()).expect("utf8");
        assert_eq!(out.matches("OTTER").count(), 1);
    }
}
