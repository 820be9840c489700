use serde::Serialize;

use crate::db::models::{AttemptSnapshot, StepAttachment};
use crate::db::types::AttemptState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Proctoring {
    pub(crate) is_proctored: bool,
    pub(crate) upload_exam: Option<String>,
}

impl Proctoring {
    fn unproctored() -> Self {
        Self { is_proctored: false, upload_exam: None }
    }
}

/// An attempt is proctored when one of its hybrid questions points at a
/// companion upload exam. The first such question in slot order wins.
pub(crate) fn classify(attempt: &AttemptSnapshot) -> Proctoring {
    attempt
        .hybrid_slots()
        .find_map(|slot| slot.upload_exam())
        .map(|exam_id| Proctoring { is_proctored: true, upload_exam: Some(exam_id.to_string()) })
        .unwrap_or_else(Proctoring::unproctored)
}

/// Any hybrid slot whose latest response carries attachments.
pub(crate) fn has_uploaded_file(attempt: &AttemptSnapshot) -> bool {
    attempt.hybrid_slots().any(|slot| slot.has_attachments())
}

/// Any slot answered at all. Proctored attempts never count as answered here
/// because their answers live on the upload exam.
pub(crate) fn has_answers(attempt: &AttemptSnapshot) -> bool {
    !classify(attempt).is_proctored && attempt.slots.iter().any(|slot| slot.is_answered())
}

/// Attachments for `question_id` in the student's upload-exam attempt, or
/// `None` when that attempt does not contain the question.
pub(crate) fn upload_files_for_question<'a>(
    upload_attempt: &'a AttemptSnapshot,
    question_id: &str,
) -> Option<&'a [StepAttachment]> {
    upload_attempt
        .slots
        .iter()
        .find(|slot| slot.question_id == question_id)
        .map(|slot| slot.attachments.as_slice())
}

/// Which exam the second device should be sent to, if the upload link is to be
/// shown at all.
///
/// `upload_attempt_state` is the state of the user's latest attempt on the
/// upload exam (proctored attempts only).
pub(crate) fn upload_target(
    attempt: &AttemptSnapshot,
    proctoring: &Proctoring,
    upload_attempt_state: Option<AttemptState>,
) -> Option<String> {
    if attempt.hybrid_slots().next().is_none() {
        return None;
    }

    let finished = attempt.attempt.state == AttemptState::Finished;

    match &proctoring.upload_exam {
        Some(upload_exam) => {
            let upload_open =
                matches!(upload_attempt_state, None | Some(AttemptState::InProgress));
            (finished && upload_open).then(|| upload_exam.clone())
        }
        None => {
            let first_pass = attempt.attempt.attempt_number == 1;
            (first_pass && finished && !has_uploaded_file(attempt))
                .then(|| attempt.attempt.exam_id.clone())
        }
    }
}
