//! Check a classifier's declared class ordering against the label space.
//!
//! The classifier emits probabilities by class index. Those indices only mean
//! FAKE and REAL if the model was trained with the same ordering as
//! [`Label::ALL`], so every classifier artifact declares its `classes` and
//! loading refuses anything that does not line up exactly.

use veracity_core::Label;

use crate::DetectError;

/// Verify that `classes[i]` names `Label::ALL[i]` for every index.
///
/// Accepts label names in any case and the numeric ids `"0"`/`"1"`.
pub fn check_class_order(classes: &[String]) -> Result<(), DetectError> {
    let mismatch = || DetectError::LabelOrder {
        expected: Label::ALL.to_vec(),
        found: classes.to_vec(),
    };

    if classes.len() != Label::COUNT {
        return Err(mismatch());
    }

    for (expected, declared) in Label::ALL.iter().zip(classes) {
        match declared.parse::<Label>() {
            Ok(label) if label == *expected => {}
            _ => return Err(mismatch()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn accepts_matching_order() {
        assert!(check_class_order(&classes(&["FAKE", "REAL"])).is_ok());
        assert!(check_class_order(&classes(&["fake", "Real"])).is_ok());
        assert!(check_class_order(&classes(&["0", "1"])).is_ok());
    }

    #[test]
    fn rejects_swapped_order() {
        let err = check_class_order(&classes(&["REAL", "FAKE"])).unwrap_err();
        assert!(matches!(err, DetectError::LabelOrder { .. }));

        let err = check_class_order(&classes(&["1", "0"])).unwrap_err();
        assert!(matches!(err, DetectError::LabelOrder { .. }));
    }

    #[test]
    fn rejects_wrong_arity_and_unknown_names() {
        assert!(check_class_order(&classes(&["FAKE"])).is_err());
        assert!(check_class_order(&classes(&["FAKE", "REAL", "SATIRE"])).is_err());
        assert!(check_class_order(&classes(&["FAKE", "TRUE"])).is_err());
    }
}
