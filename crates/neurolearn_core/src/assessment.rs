use crate::RequestId;

pub const EMPTY_ANSWER_ERROR: &str = "Please enter an answer before submitting";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssessmentStage {
    #[default]
    Welcome,
    Question,
    Answer,
    Feedback,
}

/// One generate / answer / feedback cycle.
///
/// Forward edges: welcome -> question -> answer -> feedback -> welcome (reset).
/// Retry edges: answer -> question, feedback -> answer. A failed request sets
/// `error` and leaves the stage where it was.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssessmentSession {
    stage: AssessmentStage,
    question: String,
    answer: String,
    feedback: String,
    error: Option<String>,
    pending: Option<RequestId>,
}

impl AssessmentSession {
    pub fn stage(&self) -> AssessmentStage {
        self.stage
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn begin_generate(&mut self, request_id: RequestId) -> bool {
        if self.stage != AssessmentStage::Welcome || self.pending.is_some() {
            return false;
        }
        self.pending = Some(request_id);
        self.error = None;
        true
    }

    pub(crate) fn apply_generated(
        &mut self,
        request_id: RequestId,
        result: Result<String, String>,
    ) -> bool {
        if self.pending != Some(request_id) {
            return false;
        }
        self.pending = None;
        match result {
            Ok(question) => {
                self.question = question;
                self.stage = AssessmentStage::Question;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }

    pub(crate) fn begin_answer(&mut self) -> bool {
        self.transition(AssessmentStage::Question, AssessmentStage::Answer)
    }

    pub(crate) fn set_answer(&mut self, answer: String) -> bool {
        if self.stage != AssessmentStage::Answer {
            return false;
        }
        self.answer = answer;
        true
    }

    /// Returns the question/answer pair to grade, or records why it cannot be sent.
    pub(crate) fn begin_submit(&mut self, request_id: RequestId) -> Option<(String, String)> {
        if self.stage != AssessmentStage::Answer || self.pending.is_some() {
            return None;
        }
        if self.answer.trim().is_empty() {
            self.error = Some(EMPTY_ANSWER_ERROR.to_string());
            return None;
        }
        self.pending = Some(request_id);
        self.error = None;
        Some((self.question.clone(), self.answer.clone()))
    }

    pub(crate) fn apply_feedback(
        &mut self,
        request_id: RequestId,
        result: Result<String, String>,
    ) -> bool {
        if self.pending != Some(request_id) {
            return false;
        }
        self.pending = None;
        match result {
            Ok(feedback) => {
                self.feedback = feedback;
                self.stage = AssessmentStage::Feedback;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }

    pub(crate) fn back_to_question(&mut self) -> bool {
        self.transition(AssessmentStage::Answer, AssessmentStage::Question)
    }

    pub(crate) fn retry(&mut self) -> bool {
        self.transition(AssessmentStage::Feedback, AssessmentStage::Answer)
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    fn transition(&mut self, from: AssessmentStage, to: AssessmentStage) -> bool {
        if self.stage != from || self.pending.is_some() {
            return false;
        }
        self.stage = to;
        true
    }
}
