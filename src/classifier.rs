//! Submission response classification
//!
//! Maps the engine result of a `submit` call onto the closed [`ErrorKind`]
//! taxonomy. Named tokens the submitter treats specially are matched first;
//! everything else falls into a numeric band.

use crate::error::{ErrorKind, SubmitError};
use crate::network::{SubmitResult, SUCCESS_RESULT};
use std::ops::RangeInclusive;

/// `tel`: rejected by local node policy or fee settings
pub const LOCAL_BAND: RangeInclusive<i32> = -399..=-300;

/// `tem`: structurally invalid
pub const MALFORMED_BAND: RangeInclusive<i32> = -299..=-200;

/// `tef`: failed without claiming a fee
pub const FAIL_BAND: RangeInclusive<i32> = -199..=-100;

/// `ter`: transient, retriable once the account state changes
pub const RETRY_BAND: RangeInclusive<i32> = -99..=-1;

/// `tec`: applied with fee and sequence consumed, but failed
pub const CLAIM_FEE_BAND: RangeInclusive<i32> = 100..=159;

/// Outcome of a single submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The node accepted the transaction
    Success,

    /// The node rejected or deferred the transaction
    Failed(SubmitError),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success)
    }

    /// Kind of the failure, `None` on success
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SubmissionOutcome::Success => None,
            SubmissionOutcome::Failed(e) => Some(e.kind),
        }
    }
}

/// Classify a submission result
///
/// Total and pure: every input yields exactly one outcome and the same input
/// always yields the same outcome.
pub fn classify(result: &SubmitResult) -> SubmissionOutcome {
    let kind = match result.engine_result.as_str() {
        SUCCESS_RESULT => return SubmissionOutcome::Success,
        "tefALREADY" => ErrorKind::ApplyingTransaction,
        "tefPAST_SEQ" => ErrorKind::PastSequence,
        "terPRE_SEQ" => ErrorKind::PreSequence,
        "tecUNFUNDED_PAYMENT" => ErrorKind::Unfunded,
        "tefDST_TAG_NEEDED" => ErrorKind::DestinationTagNeeded,
        _ => result
            .engine_result_code
            .map(kind_for_code)
            .unwrap_or(ErrorKind::UnknownSubmit),
    };

    let message = result
        .engine_result_message
        .clone()
        .unwrap_or_else(|| result.engine_result.clone());

    let mut error = SubmitError::new(kind).with_message(message);
    error.code = result.engine_result_code;
    SubmissionOutcome::Failed(error)
}

/// Band lookup for a numeric engine result code
pub fn kind_for_code(code: i32) -> ErrorKind {
    if LOCAL_BAND.contains(&code) {
        ErrorKind::LocalTransaction
    } else if MALFORMED_BAND.contains(&code) {
        ErrorKind::MalformedTransaction
    } else if FAIL_BAND.contains(&code) {
        ErrorKind::FailTransaction
    } else if CLAIM_FEE_BAND.contains(&code) {
        ErrorKind::ClaimFeeSubmission
    } else if RETRY_BAND.contains(&code) {
        ErrorKind::RetryTransaction
    } else {
        ErrorKind::UnknownSubmit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(token: &str, code: i32) -> Option<ErrorKind> {
        classify(&SubmitResult::new(token, code)).kind()
    }

    #[test]
    fn test_success() {
        let outcome = classify(&SubmitResult::new("tesSUCCESS", 0));
        assert!(outcome.is_success());
        assert_eq!(outcome.kind(), None);
    }

    #[test]
    fn test_named_tokens_win_over_bands() {
        assert_eq!(kind_of("tefALREADY", -198), Some(ErrorKind::ApplyingTransaction));
        assert_eq!(kind_of("tefPAST_SEQ", -190), Some(ErrorKind::PastSequence));
        assert_eq!(kind_of("terPRE_SEQ", -92), Some(ErrorKind::PreSequence));
        assert_eq!(kind_of("tecUNFUNDED_PAYMENT", 104), Some(ErrorKind::Unfunded));
        assert_eq!(
            kind_of("tefDST_TAG_NEEDED", -193),
            Some(ErrorKind::DestinationTagNeeded)
        );
    }

    #[test]
    fn test_band_edges() {
        for (code, expected) in [
            (-400, ErrorKind::UnknownSubmit),
            (-399, ErrorKind::LocalTransaction),
            (-300, ErrorKind::LocalTransaction),
            (-299, ErrorKind::MalformedTransaction),
            (-200, ErrorKind::MalformedTransaction),
            (-199, ErrorKind::FailTransaction),
            (-100, ErrorKind::FailTransaction),
            (-99, ErrorKind::RetryTransaction),
            (-1, ErrorKind::RetryTransaction),
            (0, ErrorKind::UnknownSubmit),
            (99, ErrorKind::UnknownSubmit),
            (100, ErrorKind::ClaimFeeSubmission),
            (159, ErrorKind::ClaimFeeSubmission),
            (160, ErrorKind::UnknownSubmit),
        ] {
            assert_eq!(kind_of("xxxUNNAMED", code), Some(expected), "code {}", code);
        }
    }

    #[test]
    fn test_malformed_and_fail_bands_are_disjoint() {
        // Malformed keeps its band
        assert_eq!(kind_of("temBAD_FEE", -299), Some(ErrorKind::MalformedTransaction));
        assert_eq!(kind_of("temBAD_AMOUNT", -298), Some(ErrorKind::MalformedTransaction));

        // tef codes reach FailTransaction instead of falling through to UnknownSubmit
        assert_eq!(kind_of("tefBAD_AUTH", -196), Some(ErrorKind::FailTransaction));
        assert_eq!(kind_of("tefMAX_LEDGER", -186), Some(ErrorKind::FailTransaction));
        assert_ne!(kind_of("tefFAILURE", -199), Some(ErrorKind::UnknownSubmit));
    }

    #[test]
    fn test_fail_band_no_longer_shadowed_by_malformed() {
        // Guarding FailTransaction with the malformed bounds made it unreachable
        // and sent tef codes to UnknownSubmit. Malformed keeps its own band;
        // tef codes land in FailTransaction.
        assert!(MALFORMED_BAND.clone().all(|code| !FAIL_BAND.contains(&code)));
        assert!(FAIL_BAND.clone().all(|code| !MALFORMED_BAND.contains(&code)));

        for code in MALFORMED_BAND {
            assert_eq!(kind_for_code(code), ErrorKind::MalformedTransaction);
        }
        for code in FAIL_BAND {
            assert_eq!(kind_for_code(code), ErrorKind::FailTransaction);
        }
        assert_ne!(kind_for_code(-150), ErrorKind::UnknownSubmit);
        assert_eq!(kind_for_code(-150), ErrorKind::FailTransaction);
    }

    #[test]
    fn test_message_and_code_payload() {
        let result = SubmitResult::new("telINSUF_FEE_P", -394)
            .with_message("Fee insufficient.");
        match classify(&result) {
            SubmissionOutcome::Failed(e) => {
                assert_eq!(e.kind, ErrorKind::LocalTransaction);
                assert_eq!(e.message.as_deref(), Some("Fee insufficient."));
                assert_eq!(e.code, Some(-394));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        // Falls back to the token when the node sends no message
        match classify(&SubmitResult::new("tecNO_DST", 124)) {
            SubmissionOutcome::Failed(e) => {
                assert_eq!(e.kind, ErrorKind::ClaimFeeSubmission);
                assert_eq!(e.message.as_deref(), Some("tecNO_DST"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_missing_code_is_unknown() {
        let result = SubmitResult {
            engine_result: "tooNEW".to_string(),
            engine_result_code: None,
            engine_result_message: None,
        };
        assert_eq!(classify(&result).kind(), Some(ErrorKind::UnknownSubmit));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let result = SubmitResult::new("tefPAST_SEQ", -190).with_message("passed");
        assert_eq!(classify(&result), classify(&result));

        let result = SubmitResult::new("temREDUNDANT", -253);
        assert_eq!(classify(&result), classify(&result));
    }
}
