use std::sync::Once;

use neurolearn_core::{update, AppState, AssessmentStage, Effect, Msg, EMPTY_ANSWER_ERROR};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(neurolearn_logging::initialize_for_tests);
}

fn generated(state: AppState) -> AppState {
    let (state, effects) = update(state, Msg::AssessmentGenerate);
    let [Effect::GenerateAssessment { request_id }] = effects.as_slice() else {
        panic!("unexpected effects: {effects:?}");
    };
    let (state, _) = update(
        state,
        Msg::AssessmentGenerated {
            request_id: *request_id,
            result: Ok("Define velocity.".to_string()),
        },
    );
    state
}

fn answering(state: AppState, answer: &str) -> AppState {
    let (state, _) = update(generated(state), Msg::AssessmentBeginAnswer);
    let (state, _) = update(state, Msg::AssessmentAnswerChanged(answer.to_string()));
    state
}

#[test]
fn full_cycle_follows_forward_edges() {
    init_logging();
    let state = answering(AppState::new(), "Speed with direction.");
    assert_eq!(state.assessment().stage(), AssessmentStage::Answer);

    let (state, effects) = update(state, Msg::AssessmentSubmit);
    let request_id = match effects.as_slice() {
        [Effect::SubmitAssessment {
            request_id,
            question,
            answer,
        }] => {
            assert_eq!(question, "Define velocity.");
            assert_eq!(answer, "Speed with direction.");
            *request_id
        }
        other => panic!("unexpected effects: {other:?}"),
    };
    assert!(state.view().assessment.loading);

    let (state, _) = update(
        state,
        Msg::AssessmentFeedbackReceived {
            request_id,
            result: Ok("Correct.".to_string()),
        },
    );
    let view = state.view().assessment;
    assert_eq!(view.stage, AssessmentStage::Feedback);
    assert_eq!(view.feedback, "Correct.");

    let (state, _) = update(state, Msg::AssessmentReset);
    assert_eq!(state.view().assessment, Default::default());
}

#[test]
fn empty_answer_is_rejected_in_place() {
    init_logging();
    let state = answering(AppState::new(), "   ");

    let (state, effects) = update(state, Msg::AssessmentSubmit);

    assert!(effects.is_empty());
    let view = state.view().assessment;
    assert_eq!(view.stage, AssessmentStage::Answer);
    assert_eq!(view.error.as_deref(), Some(EMPTY_ANSWER_ERROR));
    assert!(!view.loading);
}

#[test]
fn retry_edges_step_back_one_stage() {
    init_logging();
    let state = answering(AppState::new(), "guess");
    let (state, _) = update(state, Msg::AssessmentBackToQuestion);
    assert_eq!(state.assessment().stage(), AssessmentStage::Question);

    let (state, _) = update(state, Msg::AssessmentBeginAnswer);
    let (state, effects) = update(state, Msg::AssessmentSubmit);
    let Some(Effect::SubmitAssessment { request_id, .. }) = effects.first() else {
        panic!("no submit effect");
    };
    let (state, _) = update(
        state,
        Msg::AssessmentFeedbackReceived {
            request_id: *request_id,
            result: Ok("Close.".to_string()),
        },
    );
    let (state, _) = update(state, Msg::AssessmentRetry);
    assert_eq!(state.assessment().stage(), AssessmentStage::Answer);
    assert_eq!(state.assessment().answer(), "guess");
}

#[test]
fn edges_outside_the_machine_are_ignored() {
    init_logging();
    let state = AppState::new();
    let (state, _) = update(state, Msg::AssessmentBeginAnswer);
    let (state, _) = update(state, Msg::AssessmentRetry);
    let (state, _) = update(state, Msg::AssessmentBackToQuestion);
    let (state, effects) = update(state, Msg::AssessmentSubmit);
    assert!(effects.is_empty());
    assert_eq!(state.assessment().stage(), AssessmentStage::Welcome);

    let state = generated(state);
    let (state, effects) = update(state, Msg::AssessmentGenerate);
    assert!(effects.is_empty());
    assert_eq!(state.assessment().stage(), AssessmentStage::Question);
}

#[test]
fn failures_keep_the_stage_and_show_an_error() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::AssessmentGenerate);
    let [Effect::GenerateAssessment { request_id }] = effects.as_slice() else {
        panic!("unexpected effects: {effects:?}");
    };
    let (state, _) = update(
        state,
        Msg::AssessmentGenerated {
            request_id: *request_id,
            result: Err("Failed to generate assessment".to_string()),
        },
    );

    let view = state.view().assessment;
    assert_eq!(view.stage, AssessmentStage::Welcome);
    assert_eq!(view.error.as_deref(), Some("Failed to generate assessment"));

    let state = answering(state, "answer");
    let (state, effects) = update(state, Msg::AssessmentSubmit);
    let Some(Effect::SubmitAssessment { request_id, .. }) = effects.first() else {
        panic!("no submit effect");
    };
    let (state, _) = update(
        state,
        Msg::AssessmentFeedbackReceived {
            request_id: *request_id,
            result: Err("Failed to submit assessment".to_string()),
        },
    );
    assert_eq!(state.assessment().stage(), AssessmentStage::Answer);
    assert_eq!(
        state.assessment().error(),
        Some("Failed to submit assessment")
    );
}

#[test]
fn stale_generation_is_ignored() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::AssessmentGenerate);
    let (state, _) = update(
        state,
        Msg::AssessmentGenerated {
            request_id: 999,
            result: Ok("Stale question".to_string()),
        },
    );
    assert_eq!(state.assessment().stage(), AssessmentStage::Welcome);
    assert!(state.assessment().is_loading());
}
