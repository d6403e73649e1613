//! Quiz gating: scan progression is presented as paused while a question
//! is outstanding, and an incorrect answer keeps the same question open for
//! another attempt instead of discarding it.

use tracing::{debug, warn};

use crate::error::QuizError;
use crate::models::{Question, QuestionHistoryEntry};

/// Fallback per-question maximum, used only for history entries whose
/// result event did not carry the true maximum.
pub const ASSUMED_POINTS_PER_QUESTION: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    /// Nothing outstanding; the scan runs freely.
    Idle,
    /// A question is open and accepting a selection.
    Unanswered,
    /// An answer went out; waiting for the server's verdict.
    AwaitingResult,
}

#[derive(Debug)]
pub struct QuizGate {
    state: QuizState,
    question: Option<Question>,
    selected: Option<usize>,
    last_result_was_correct: Option<bool>,
    history: Vec<QuestionHistoryEntry>,
}

impl Default for QuizGate {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizGate {
    pub fn new() -> Self {
        Self {
            state: QuizState::Idle,
            question: None,
            selected: None,
            last_result_was_correct: None,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn last_result_was_correct(&self) -> Option<bool> {
        self.last_result_was_correct
    }

    pub fn history(&self) -> &[QuestionHistoryEntry] {
        &self.history
    }

    /// While this is true the session is presented as paused, independent
    /// of the server's own pause signal.
    pub fn is_gating(&self) -> bool {
        self.question.is_some()
    }

    /// A question arrived from the server. A second question while one is
    /// outstanding violates the protocol; the duplicate is ignored because
    /// the UI has no recovery action for it.
    pub fn on_question(&mut self, question: Question) {
        if self.question.is_some() {
            warn!(
                prompt = %question.prompt,
                "question received while another is outstanding, ignoring"
            );
            return;
        }
        debug!(prompt = %question.prompt, options = question.options.len(), "question asked");
        self.question = Some(question);
        self.selected = None;
        self.last_result_was_correct = None;
        self.state = QuizState::Unanswered;
    }

    /// Pick (or change) an option. Valid whenever a question is open and no
    /// answer is in flight, including after an incorrect attempt.
    pub fn select_option(&mut self, index: usize) -> Result<(), QuizError> {
        let question = self.question.as_ref().ok_or(QuizError::NoQuestion)?;
        if self.state == QuizState::AwaitingResult {
            return Err(QuizError::AwaitingResult);
        }
        if index >= question.options.len() {
            return Err(QuizError::OptionOutOfRange {
                index,
                count: question.options.len(),
            });
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Lock in the current selection for submission. Returns the option
    /// index to send; correctness is decided by the server, never here.
    pub fn submit(&mut self) -> Result<usize, QuizError> {
        if self.question.is_none() {
            return Err(QuizError::NoQuestion);
        }
        if self.state == QuizState::AwaitingResult {
            return Err(QuizError::AwaitingResult);
        }
        let selected = self.selected.ok_or(QuizError::NoSelection)?;
        self.state = QuizState::AwaitingResult;
        Ok(selected)
    }

    /// Server verdict for the submitted answer.
    ///
    /// Correct: record exactly one history entry and clear the outstanding
    /// question. Incorrect: record nothing and reopen the same question;
    /// the current selection is kept so changing it needs no reset.
    pub fn on_result(
        &mut self,
        correct: bool,
        correct_option_index: Option<usize>,
        points_earned: u32,
        points_possible: Option<u32>,
    ) {
        if self.state != QuizState::AwaitingResult {
            warn!(correct, "question result received with no answer in flight, ignoring");
            return;
        }
        self.last_result_was_correct = Some(correct);

        if !correct {
            debug!("incorrect answer, question stays open for retry");
            self.state = QuizState::Unanswered;
            return;
        }

        let Some(question) = self.question.take() else {
            return;
        };
        let submitted = self.selected.take().unwrap_or_default();
        self.history.push(QuestionHistoryEntry {
            prompt: question.prompt,
            options: question.options,
            correct_option_index: correct_option_index.unwrap_or(submitted),
            submitted_option_index: submitted,
            was_correct: true,
            points_earned,
            points_possible: points_possible.or(Some(question.points_value).filter(|p| *p > 0)),
        });
        self.state = QuizState::Idle;
    }

    pub fn points_earned(&self) -> u32 {
        self.history.iter().map(|h| h.points_earned).sum()
    }

    /// Maximum points that were attainable so far. Uses the retained
    /// per-question maximum where available and the assumed average as a
    /// fallback for entries without one.
    pub fn points_possible(&self) -> u32 {
        self.history
            .iter()
            .map(|h| h.points_possible.unwrap_or(ASSUMED_POINTS_PER_QUESTION))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(prompt: &str) -> Question {
        Question {
            phase_id: Some("testing".to_string()),
            prompt: prompt.to_string(),
            options: vec![
                "option a".to_string(),
                "option b".to_string(),
                "option c".to_string(),
                "option d".to_string(),
            ],
            points_value: 20,
        }
    }

    #[test]
    fn question_opens_the_gate_and_clears_selection() {
        let mut gate = QuizGate::new();
        assert!(!gate.is_gating());

        gate.on_question(question("what does UNION do?"));
        assert!(gate.is_gating());
        assert_eq!(gate.state(), QuizState::Unanswered);
        assert_eq!(gate.selected(), None);
    }

    #[test]
    fn duplicate_question_is_ignored() {
        let mut gate = QuizGate::new();
        gate.on_question(question("first"));
        gate.on_question(question("second"));
        assert_eq!(gate.question().unwrap().prompt, "first");
    }

    #[test]
    fn submit_requires_a_selection() {
        let mut gate = QuizGate::new();
        gate.on_question(question("q"));
        assert_eq!(gate.submit(), Err(QuizError::NoSelection));

        assert_eq!(
            gate.select_option(9),
            Err(QuizError::OptionOutOfRange { index: 9, count: 4 })
        );
        gate.select_option(2).unwrap();
        assert_eq!(gate.submit(), Ok(2));
        assert_eq!(gate.state(), QuizState::AwaitingResult);
        // No double submission while the verdict is pending.
        assert_eq!(gate.select_option(1), Err(QuizError::AwaitingResult));
        assert_eq!(gate.submit(), Err(QuizError::AwaitingResult));
    }

    #[test]
    fn incorrect_answer_keeps_the_question_and_records_nothing() {
        let mut gate = QuizGate::new();
        gate.on_question(question("q"));
        gate.select_option(2).unwrap();
        gate.submit().unwrap();

        gate.on_result(false, None, 0, None);
        assert!(gate.history().is_empty());
        assert!(gate.is_gating());
        assert_eq!(gate.state(), QuizState::Unanswered);
        assert_eq!(gate.last_result_was_correct(), Some(false));
        // Previous selection survives; changing it needs no reset.
        assert_eq!(gate.selected(), Some(2));
        gate.select_option(0).unwrap();
        assert_eq!(gate.submit(), Ok(0));
    }

    #[test]
    fn correct_answer_appends_exactly_one_history_entry() {
        let mut gate = QuizGate::new();
        gate.on_question(question("q"));
        gate.select_option(2).unwrap();
        gate.submit().unwrap();
        gate.on_result(false, None, 0, None);

        gate.select_option(0).unwrap();
        gate.submit().unwrap();
        gate.on_result(true, Some(0), 20, None);

        assert_eq!(gate.history().len(), 1);
        let entry = &gate.history()[0];
        assert!(entry.was_correct);
        assert_eq!(entry.points_earned, 20);
        assert_eq!(entry.submitted_option_index, 0);
        assert!(!gate.is_gating());
        assert_eq!(gate.state(), QuizState::Idle);
    }

    #[test]
    fn spurious_result_with_no_answer_in_flight_is_ignored() {
        let mut gate = QuizGate::new();
        gate.on_result(true, Some(0), 20, None);
        assert!(gate.history().is_empty());

        gate.on_question(question("q"));
        gate.on_result(true, Some(0), 20, None);
        assert!(gate.history().is_empty());
        assert!(gate.is_gating());
    }

    #[test]
    fn score_prefers_true_maxima_over_the_assumed_average() {
        let mut gate = QuizGate::new();

        gate.on_question(question("a"));
        gate.select_option(0).unwrap();
        gate.submit().unwrap();
        gate.on_result(true, Some(0), 30, Some(50));

        let mut plain = question("b");
        plain.points_value = 0;
        gate.on_question(plain);
        gate.select_option(1).unwrap();
        gate.submit().unwrap();
        gate.on_result(true, Some(1), 10, None);

        assert_eq!(gate.points_earned(), 40);
        // 50 retained + 20 assumed fallback
        assert_eq!(gate.points_possible(), 70);
    }
}
