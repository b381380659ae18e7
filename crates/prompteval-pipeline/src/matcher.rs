//! Pass/fail policies applied to judge output.
//!
//! None of these fail: text that cannot be read as the policy expects is
//! simply a non-match.

use std::sync::LazyLock;

use prompteval_core::{BooleanMatch, CsvMatch, EvaluationMethod, ExactMatch, RangeMatch};
use regex::Regex;

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("number pattern is valid")
});

pub fn meets_expectation(text: &str, method: Option<&EvaluationMethod>) -> bool {
    match method {
        Some(EvaluationMethod::ExactMatch(m)) => match_exact(text, m),
        Some(EvaluationMethod::Range(m)) => match_range(text, m),
        Some(EvaluationMethod::CsvMatch(m)) => match_csv(text, m),
        Some(EvaluationMethod::BooleanMatch(m)) => match_boolean(text, m),
        None => false,
    }
}

/// Text equality against the stringified value. `value_type` is not used.
pub fn match_exact(text: &str, expected: &ExactMatch) -> bool {
    text == expected.value.to_string()
}

pub fn match_range(text: &str, range: &RangeMatch) -> bool {
    parse_leading_number(text).is_some_and(|n| n >= range.min && n <= range.max)
}

pub fn match_csv(text: &str, expected: &CsvMatch) -> bool {
    let normalize = |value: &str| {
        let value = value.trim();
        if expected.case_sensitive {
            value.to_string()
        } else {
            value.to_lowercase()
        }
    };

    let provided: Vec<String> = text.split(',').map(normalize).collect();

    expected
        .expected_values
        .iter()
        .all(|value| provided.contains(&normalize(value)))
}

pub fn match_boolean(text: &str, expected: &BooleanMatch) -> bool {
    text.to_lowercase() == expected.expected_value.to_lowercase()
}

/// Reads the numeric prefix of `text`, so `"0.7 - mostly correct"` yields 0.7.
fn parse_leading_number(text: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(text.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompteval_core::{ExactValue, ValueType};

    fn range(min: f64, max: f64) -> RangeMatch {
        RangeMatch { min, max }
    }

    fn csv(values: &[&str], case_sensitive: bool) -> CsvMatch {
        CsvMatch {
            expected_values: values.iter().map(|v| v.to_string()).collect(),
            case_sensitive,
        }
    }

    fn boolean(expected: &str) -> BooleanMatch {
        BooleanMatch {
            expected_value: expected.to_string(),
        }
    }

    #[test]
    fn test_range_bounds_inclusive() {
        assert!(match_range("0.5", &range(0.0, 1.0)));
        assert!(match_range("0", &range(0.0, 1.0)));
        assert!(match_range("1", &range(0.0, 1.0)));
        assert!(!match_range("1.1", &range(0.0, 1.0)));
        assert!(!match_range("-0.1", &range(0.0, 1.0)));
    }

    #[test]
    fn test_range_unparsable_is_no_match() {
        assert!(!match_range("not-a-number", &range(0.0, 1.0)));
        assert!(!match_range("", &range(0.0, 1.0)));
        assert!(!match_range("Score: 0.5", &range(0.0, 1.0)));
    }

    #[test]
    fn test_range_reads_numeric_prefix() {
        assert!(match_range(" 0.7 - mostly correct", &range(0.0, 1.0)));
        assert!(match_range("5e-1", &range(0.0, 1.0)));
    }

    #[test]
    fn test_range_prefix_stops_at_non_ascii_digit() {
        assert!(match_range("1\u{663}", &range(0.0, 1.0)));
        assert!(!match_range("\u{663}", &range(0.0, 10.0)));
    }

    #[test]
    fn test_csv_case_sensitivity() {
        assert!(match_csv("Apple, banana", &csv(&["apple", "banana"], false)));
        assert!(!match_csv("Apple, banana", &csv(&["apple", "banana"], true)));
    }

    #[test]
    fn test_csv_is_containment_not_position() {
        assert!(match_csv("cherry, banana ,apple", &csv(&["apple", "banana"], true)));
        assert!(match_csv("apple", &csv(&["apple", "apple"], true)));
        assert!(!match_csv("apple, cherry", &csv(&["apple", "banana"], true)));
    }

    #[test]
    fn test_boolean_is_case_insensitive_literal() {
        assert!(match_boolean("TRUE", &boolean("true")));
        assert!(!match_boolean("yes", &boolean("true")));
        assert!(match_boolean("Maybe", &boolean("maybe")));
        assert!(!match_boolean("true ", &boolean("true")));
    }

    #[test]
    fn test_exact_match_compares_text_only() {
        let number = ExactMatch {
            value: ExactValue::Number(5.0),
            value_type: ValueType::Number,
        };
        assert!(match_exact("5", &number));
        assert!(!match_exact("5.0", &number));
        assert!(!match_exact(" 5", &number));

        let flag = ExactMatch {
            value: ExactValue::Boolean(true),
            value_type: ValueType::Boolean,
        };
        assert!(match_exact("true", &flag));
        assert!(!match_exact("True", &flag));

        let declared_number = ExactMatch {
            value: ExactValue::Text("5".into()),
            value_type: ValueType::Number,
        };
        assert!(!match_exact("5.0", &declared_number));
    }

    #[test]
    fn test_no_method_never_meets_expectation() {
        assert!(!meets_expectation("anything", None));
    }

    #[test]
    fn test_dispatches_to_configured_policy() {
        let method = EvaluationMethod::Range(range(0.0, 10.0));
        assert!(meets_expectation("7", Some(&method)));
        assert!(!meets_expectation("11", Some(&method)));

        let method = EvaluationMethod::BooleanMatch(boolean("false"));
        assert!(meets_expectation("False", Some(&method)));
    }
}
