//! Interactive quiz driver over a [`Prompt`].

use anyhow::{Context, Result};
use tokio::io::AsyncBufRead;

use qbank_core::model::{OptionLetter, Question};
use services::{
    AnswerFeedback, QuestionBank, QuizLoopService, QuizOutcome, QuizSession, QuizStatus,
    SessionContext,
};

use crate::prompt::Prompt;

const HELP: &str = "\
Commands:
  <letter>     answer with that option
  n, next      next question (after answering)
  p, prev      previous question
  m, mark      toggle the review mark
  j <n>        jump to question n
  h, home      save progress and leave the quiz
  q, quit      end the quiz and show results
  ?, help      this list
A single letter is an answer whenever the question offers that option.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizCommand {
    Answer(OptionLetter),
    Next,
    Previous,
    ToggleMark,
    /// 0-based target.
    Jump(usize),
    Home,
    Quit,
    Help,
}

/// Parse one input line for a question with `option_count` options.
pub fn parse_command(line: &str, option_count: usize) -> Option<QuizCommand> {
    let line = line.trim();
    if let Ok(letter) = line.parse::<OptionLetter>() {
        if letter.index() < option_count {
            return Some(QuizCommand::Answer(letter));
        }
    }

    let lower = line.to_ascii_lowercase();
    let mut words = lower.split_whitespace();
    let command = match (words.next()?, words.next()) {
        ("n" | "next", None) => QuizCommand::Next,
        ("p" | "prev" | "previous", None) => QuizCommand::Previous,
        ("m" | "mark", None) => QuizCommand::ToggleMark,
        ("h" | "home", None) => QuizCommand::Home,
        ("q" | "quit" | "end", None) => QuizCommand::Quit,
        ("?" | "help", None) => QuizCommand::Help,
        ("j" | "jump", Some(n)) => {
            let n: usize = n.parse().ok()?;
            QuizCommand::Jump(n.checked_sub(1)?)
        }
        _ => return None,
    };
    words.next().is_none().then_some(command)
}

enum Step {
    Continue,
    Finish,
    Leave,
}

/// Drive `session` until the user leaves or finishes and declines a retry.
///
/// # Errors
///
/// Returns an error if input fails or a checkpoint cannot be written.
pub async fn run<R: AsyncBufRead + Unpin>(
    quiz: &QuizLoopService,
    bank: &QuestionBank,
    ctx: &mut SessionContext,
    mut session: QuizSession,
    prompt: &mut Prompt<R>,
) -> Result<()> {
    println!("{HELP}\n");
    loop {
        let step = match session.current_question().cloned() {
            Some(question) => {
                render_question(&session, &question);
                match prompt.ask("> ").await? {
                    None => Step::Leave,
                    Some(line) => handle(quiz, ctx, &mut session, &question, &line),
                }
            }
            None => Step::Finish,
        };

        match step {
            Step::Continue => {}
            Step::Leave => {
                quiz.leave(&session, ctx)
                    .await
                    .context("could not save progress when leaving the quiz")?;
                println!("Progress saved.");
                return Ok(());
            }
            Step::Finish => {
                finish(quiz, bank, ctx, &mut session).await?;
                let again = prompt
                    .ask("Enter r to retry the same questions, anything else to return: ")
                    .await?;
                if !again.is_some_and(|a| a.eq_ignore_ascii_case("r")) {
                    return Ok(());
                }
                session.restart(quiz.clock().now());
            }
        }
    }
}

fn handle(
    quiz: &QuizLoopService,
    ctx: &mut SessionContext,
    session: &mut QuizSession,
    question: &Question,
    line: &str,
) -> Step {
    let Some(command) = parse_command(line, question.options().len()) else {
        println!("Unrecognised input {line:?}. Type ? for help.");
        return Step::Continue;
    };

    let moved = match command {
        QuizCommand::Answer(letter) => {
            match quiz.answer(session, ctx, letter) {
                Ok(feedback) => render_feedback(question, &feedback),
                Err(err) => println!("{err}"),
            }
            return Step::Continue;
        }
        QuizCommand::ToggleMark => {
            match session.toggle_mark() {
                Ok(true) => println!("Marked for review."),
                Ok(false) => println!("Mark removed."),
                Err(err) => println!("{err}"),
            }
            return Step::Continue;
        }
        QuizCommand::Help => {
            println!("{HELP}");
            return Step::Continue;
        }
        QuizCommand::Home => return Step::Leave,
        QuizCommand::Quit => return Step::Finish,
        QuizCommand::Next => session.advance(),
        QuizCommand::Previous => session.retreat(),
        QuizCommand::Jump(target) => session.jump_to(target),
    };

    match moved {
        Ok(QuizStatus::Finished) => Step::Finish,
        Ok(QuizStatus::Active { .. }) => Step::Continue,
        Err(err) => {
            println!("{err}");
            Step::Continue
        }
    }
}

async fn finish(
    quiz: &QuizLoopService,
    bank: &QuestionBank,
    ctx: &mut SessionContext,
    session: &mut QuizSession,
) -> Result<()> {
    match quiz.end_quiz(session, ctx).await {
        Ok(outcome) => {
            render_outcome(bank, &outcome);
            Ok(())
        }
        Err(err) => {
            if let Ok(outcome) = session.outcome(&quiz.clock()) {
                render_outcome(bank, &outcome);
            }
            Err(err).context("quiz finished but progress was not saved")
        }
    }
}

fn render_question(session: &QuizSession, question: &Question) {
    let mark = if session.is_marked(question.id()) {
        " [marked]"
    } else {
        ""
    };
    println!(
        "\nQuestion {} of {} ({:.0}% through, score {}){mark}",
        session.position() + 1,
        session.len(),
        session.progress_fraction() * 100.0,
        session.score(),
    );
    println!("{} / {} / {}", question.system(), question.subject(), question.topic());
    if let Some(difficulty) = question.difficulty() {
        println!("Difficulty: {difficulty}");
    }
    println!("\n{}\n", question.text());
    for (letter, text) in question.lettered_options() {
        let chosen = if session.selected_option() == Some(letter) {
            ">"
        } else {
            " "
        };
        println!("{chosen} {letter}. {text}");
    }
}

fn render_feedback(question: &Question, feedback: &AnswerFeedback) {
    if feedback.is_correct {
        println!("Correct!");
    } else {
        println!("Incorrect. The correct answer is {}.", feedback.correct_answer);
    }
    if !feedback.scored {
        println!("(already answered in this quiz; not scored again)");
    }
    if let Some(explanation) = question.explanation() {
        println!("\nExplanation: {explanation}");
    }
    if let Some(objective) = question.educational_objective() {
        println!("Educational objective: {objective}");
    }
}

fn render_outcome(bank: &QuestionBank, outcome: &QuizOutcome) {
    let secs = outcome.elapsed.num_seconds();
    println!("\n=== Quiz complete ===");
    println!(
        "Score: {}/{} ({:.1}%)  Time: {}:{:02}",
        outcome.score,
        outcome.total,
        outcome.percentage,
        secs / 60,
        secs % 60
    );
    println!("{}", outcome.band.message());
    if !outcome.marked.is_empty() {
        println!("\nMarked for review:");
        for line in marked_review_lines(bank, outcome) {
            println!("  {line}");
        }
    }
}

/// One line per marked question: 1-based position, id, question text.
fn marked_review_lines(bank: &QuestionBank, outcome: &QuizOutcome) -> Vec<String> {
    outcome
        .marked
        .iter()
        .map(|marked| {
            let text = bank.get(&marked.id).map_or("", Question::text);
            format!("{}. [{}] {}", marked.position + 1, marked.id, text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbank_core::model::{QuestionDraft, QuestionId};
    use qbank_core::time::{fixed_clock, fixed_now};

    fn letter(s: &str) -> OptionLetter {
        s.parse().unwrap()
    }

    fn question(id: &str, text: &str) -> Question {
        QuestionDraft {
            id: QuestionId::new(id),
            question: text.into(),
            options: vec!["a".into(), "b".into()],
            answer: "A".into(),
            ..QuestionDraft::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn letters_within_the_options_are_answers() {
        assert_eq!(parse_command("b", 4), Some(QuizCommand::Answer(letter("B"))));
        assert_eq!(parse_command(" D ", 4), Some(QuizCommand::Answer(letter("D"))));
    }

    #[test]
    fn letters_beyond_the_options_are_commands() {
        assert_eq!(parse_command("n", 4), Some(QuizCommand::Next));
        assert_eq!(parse_command("M", 5), Some(QuizCommand::ToggleMark));
        assert_eq!(parse_command("n", 14), Some(QuizCommand::Answer(letter("N"))));
        assert_eq!(parse_command("next", 14), Some(QuizCommand::Next));
    }

    #[test]
    fn jump_targets_are_one_based() {
        assert_eq!(parse_command("j 3", 4), Some(QuizCommand::Jump(2)));
        assert_eq!(parse_command("jump 1", 4), Some(QuizCommand::Jump(0)));
        assert_eq!(parse_command("j 0", 4), None);
        assert_eq!(parse_command("j x", 4), None);
        assert_eq!(parse_command("j", 4), None);
    }

    #[test]
    fn unknown_or_trailing_input_is_rejected() {
        assert_eq!(parse_command("", 4), None);
        assert_eq!(parse_command("z", 4), None);
        assert_eq!(parse_command("next please", 4), None);
        assert_eq!(parse_command("q", 4), Some(QuizCommand::Quit));
        assert_eq!(parse_command("h", 4), Some(QuizCommand::Home));
    }

    #[test]
    fn marked_questions_are_listed_with_their_bank_text() {
        let questions = vec![question("q1", "First?"), question("q2", "Second?")];
        let bank = QuestionBank::from_questions(questions.clone()).unwrap();
        let mut session = QuizSession::new(questions, fixed_now());
        session.jump_to(1).unwrap();
        session.toggle_mark().unwrap();
        session.end();

        let outcome = session.outcome(&fixed_clock()).unwrap();
        assert_eq!(marked_review_lines(&bank, &outcome), vec!["2. [q2] Second?"]);
    }
}
