//! Date/time rules across both parser families.

use anyhow::Result;
use constraints_core::{
    ConstraintValidator, DateTimeRule, DateTimeRuleBuilder, ParserType, ResolverStyle, Value,
};
use constraints_validator::DateTimeValidator;

struct Case {
    patterns: &'static [&'static str],
    text: &'static str,
    valid: bool,
}

const fn case(patterns: &'static [&'static str], text: &'static str, valid: bool) -> Case {
    Case {
        patterns,
        text,
        valid,
    }
}

fn rule(patterns: &[&str], parser_type: ParserType) -> DateTimeRuleBuilder {
    patterns.iter().fold(
        DateTimeRuleBuilder::new().parser_type(parser_type),
        |builder, pattern| builder.pattern(*pattern),
    )
}

fn run_table(build: impl Fn(&[&str]) -> DateTimeRule, cases: &[Case]) -> Result<()> {
    for case in cases {
        let validator = DateTimeValidator::initialize(build(case.patterns))?;
        let valid = validator.validate(&Value::from(case.text))?.is_empty();
        assert_eq!(
            valid, case.valid,
            "patterns {:?} on {:?}",
            case.patterns, case.text
        );
    }
    Ok(())
}

#[test]
fn test_legacy_non_lenient() -> Result<()> {
    run_table(
        |patterns| rule(patterns, ParserType::Legacy).build(),
        &[
            case(&["yyyy-MM-dd"], "2018-01-01", true),
            case(&["yyyy-MM-dd"], "2018-02-29", false),
            case(&["yyyy-MM-dd"], "2020-02-29", true),
            case(&["yyyy-MM-dd"], "2018-13-01", false),
            case(&["yyyy-MM-dd"], "2018-1-1 trailing", true),
            case(&["yyyyMMdd"], "20180131", true),
            case(&["yyyyMMdd"], "20180231", false),
            case(&["dd.MM.yyyy", "yyyy-MM-dd"], "2018-03-01", true),
            case(&["dd.MM.yyyy", "yyyy-MM-dd"], "01.03.2018", true),
            case(&["dd.MM.yyyy", "yyyy-MM-dd"], "2018/03/01", false),
            case(&["EEE d MMM yyyy"], "Tue 1 Jan 2018", false),
            case(&["h:mm a"], "11:30 PM", true),
        ],
    )
}

#[test]
fn test_legacy_lenient() -> Result<()> {
    run_table(
        |patterns| rule(patterns, ParserType::Legacy).lenient(true).build(),
        &[
            case(&["yyyy-MM-dd"], "2018-02-29", true),
            case(&["yyyy-MM-dd"], "2018-13-45", true),
            case(&["EEE d MMM yyyy"], "Tue 1 Jan 2018", true),
            case(&["yyyy-MM-dd"], "not a date", false),
        ],
    )
}

#[test]
fn test_structured_resolver_styles() -> Result<()> {
    let styled = |style: ResolverStyle| {
        move |patterns: &[&str]| {
            rule(patterns, ParserType::Structured)
                .resolver_style(style)
                .build()
        }
    };

    run_table(
        styled(ResolverStyle::Strict),
        &[
            case(&["yyyy-MM-dd"], "2018-02-29", true),
            case(&["uuuu-MM-dd"], "2018-02-29", false),
            case(&["uuuu-MM-dd"], "2020-02-29", true),
            case(&["yyyy-MM-dd"], "2018-13-01", false),
            case(&["uuuu-MM-dd"], "2018-1-1", false),
            case(&["uuuu-MM-dd"], "2018-01-01 trailing", false),
            case(&["HH:mm"], "24:00", false),
        ],
    )?;

    run_table(
        styled(ResolverStyle::Smart),
        &[
            case(&["uuuu-MM-dd"], "2018-02-29", true),
            case(&["uuuu-MM-dd"], "2018-02-32", false),
            case(&["HH:mm"], "24:00", true),
        ],
    )?;

    run_table(
        styled(ResolverStyle::Lenient),
        &[
            case(&["uuuu-MM-dd"], "2018-02-32", true),
            case(&["EEE, d MMM uuuu"], "Tue, 1 Jan 2018", false),
        ],
    )
}

#[test]
fn test_declaration_errors() {
    for parser_type in [ParserType::Legacy, ParserType::Structured] {
        let err = DateTimeValidator::initialize(rule(&[], parser_type).build()).unwrap_err();
        assert!(err.is_declaration());

        let err = DateTimeValidator::initialize(rule(&["bogus"], parser_type).build())
            .unwrap_err();
        assert!(err.is_declaration());
        assert!(err.to_string().contains("`bogus`"));
    }
}

#[test]
fn test_null_and_empty_need_no_pattern_match() -> Result<()> {
    let validator = DateTimeValidator::initialize(rule(&["yyyy"], ParserType::Structured).build())?;
    assert!(validator.validate(&Value::Null)?.is_empty());
    assert!(validator.validate(&Value::from(""))?.is_empty());
    Ok(())
}

#[test]
fn test_validator_is_shareable_across_threads() -> Result<()> {
    let validator = std::sync::Arc::new(DateTimeValidator::initialize(
        rule(&["uuuu-MM-dd"], ParserType::Structured)
            .resolver_style(ResolverStyle::Strict)
            .build(),
    )?);

    let handles: Vec<_> = ["2018-01-01", "2018-02-30", "2019-12-31", "2019-13-31"]
        .into_iter()
        .map(|text| {
            let validator = validator.clone();
            std::thread::spawn(move || {
                validator
                    .validate(&Value::from(text))
                    .map(|violations| violations.is_empty())
            })
        })
        .collect();

    let results = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread panicked"))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    assert_eq!(results, vec![true, false, true, false]);
    Ok(())
}
