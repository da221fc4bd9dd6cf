//! The `format` keyword: an annotation by default on 2019-09 and later, an
//! assertion on drafts 6/7 or when format validation is switched on.
use std::{
    net::{Ipv4Addr, Ipv6Addr},
    str::FromStr,
    sync::Arc,
};

use email_address::EmailAddress;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use referencing::{Uri, UriRef};
use serde_json::{Map, Value};
use uuid_simd::{parse_hyphenated, Out};

use crate::{
    compiler, ecma,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{BuiltinKeyword, CompilationResult},
};

/// A custom format check registered through
/// [`crate::EvaluationOptions::with_format`].
pub(crate) trait Format: Send + Sync {
    fn check(&self, value: &str) -> bool;
}

impl<F> Format for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn check(&self, value: &str) -> bool {
        self(value)
    }
}

enum FormatCheck {
    Builtin(fn(&str) -> bool),
    Custom(Arc<dyn Format>),
    /// Unknown format: annotation only.
    None,
}

pub(crate) struct FormatConstraint {
    format: String,
    check: FormatCheck,
    assert: bool,
}

impl Evaluate for FormatConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if self.assert {
            if let Value::String(value) = instance {
                let valid = match &self.check {
                    FormatCheck::Builtin(check) => check(value),
                    FormatCheck::Custom(check) => check.check(value),
                    FormatCheck::None => true,
                };
                if !valid {
                    node.fail(
                        BuiltinKeyword::Format.into(),
                        format!("{instance} is not a \"{}\"", self.format),
                    );
                    return Ok(());
                }
            }
        }
        node.annotate(
            BuiltinKeyword::Format.into(),
            Value::String(self.format.clone()),
        );
        Ok(())
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let Some(format) = value.as_str() else {
        return Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"string\""),
        )));
    };
    let assert = ctx.validates_formats_by_default();
    let check = if let Some(custom) = ctx.config().format(format) {
        FormatCheck::Custom(Arc::clone(custom))
    } else if let Some(builtin) = builtin_check(format) {
        FormatCheck::Builtin(builtin)
    } else if assert && !ctx.config().ignores_unknown_formats() {
        return Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("Unknown format: \"{format}\""),
        )));
    } else {
        FormatCheck::None
    };
    Some(Ok(Box::new(FormatConstraint {
        format: format.to_string(),
        check,
        assert,
    })))
}

fn builtin_check(format: &str) -> Option<fn(&str) -> bool> {
    Some(match format {
        "date" => is_valid_date,
        "date-time" => is_valid_datetime,
        "time" => is_valid_time,
        "duration" => is_valid_duration,
        "email" => is_valid_email,
        "hostname" => is_valid_hostname,
        "ipv4" => is_valid_ipv4,
        "ipv6" => is_valid_ipv6,
        "uri" => is_valid_uri,
        "uri-reference" => is_valid_uri_reference,
        "uri-template" => is_valid_uri_template,
        "uuid" => is_valid_uuid,
        "json-pointer" => is_valid_json_pointer,
        "relative-json-pointer" => is_valid_relative_json_pointer,
        "regex" => is_valid_regex,
        _ => return None,
    })
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// RFC 3339 full-date, checked without a date library: the format is fixed
/// width and the only subtlety is the day range per month.
fn is_valid_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let digits = [
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[5], bytes[6], bytes[8], bytes[9],
    ];
    if !digits.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let year = u16::from(digits[0] - b'0') * 1000
        + u16::from(digits[1] - b'0') * 100
        + u16::from(digits[2] - b'0') * 10
        + u16::from(digits[3] - b'0');
    let month = (digits[4] - b'0') * 10 + (digits[5] - b'0');
    let day = (digits[6] - b'0') * 10 + (digits[7] - b'0');
    let max_day = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => return false,
    };
    (1..=max_day).contains(&day)
}

fn is_valid_datetime(value: &str) -> bool {
    time::OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339).is_ok()
}

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[01][0-9]|2[0-3]):[0-5][0-9]:(?:[0-5][0-9]|60)(?:\.[0-9]+)?(?:[Zz]|[+-](?:[01][0-9]|2[0-3]):[0-5][0-9])$")
        .expect("Is a valid regex")
});

fn is_valid_time(value: &str) -> bool {
    TIME_RE.is_match(value).unwrap_or(false)
}

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?!$)(?:\d+W|(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?=\d)(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?)$")
        .expect("Is a valid regex")
});

fn is_valid_duration(value: &str) -> bool {
    DURATION_RE.is_match(value).unwrap_or(false)
}

fn is_valid_email(value: &str) -> bool {
    EmailAddress::from_str(value).is_ok()
}

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("Is a valid regex")
});

fn is_valid_hostname(value: &str) -> bool {
    value.len() <= 253 && HOSTNAME_RE.is_match(value).unwrap_or(false)
}

fn is_valid_ipv4(value: &str) -> bool {
    // `Ipv4Addr` accepts leading zeros, RFC 2673 does not
    if value
        .split('.')
        .any(|octet| octet.len() > 1 && octet.starts_with('0'))
    {
        return false;
    }
    value.parse::<Ipv4Addr>().is_ok()
}

fn is_valid_ipv6(value: &str) -> bool {
    value.parse::<Ipv6Addr>().is_ok()
}

fn is_valid_uri(value: &str) -> bool {
    Uri::parse(value).is_ok()
}

fn is_valid_uri_reference(value: &str) -> bool {
    UriRef::parse(value).is_ok()
}

static URI_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:(?:[^\x00-\x20"'<>%\\^`{|}]|%[0-9a-f]{2})|\{[+#./;?&=,!@|]?(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?(?:,(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?)*})*$"#,
    )
    .expect("Is a valid regex")
});

fn is_valid_uri_template(value: &str) -> bool {
    URI_TEMPLATE_RE.is_match(value).unwrap_or(false)
}

fn is_valid_uuid(value: &str) -> bool {
    let mut out = [0_u8; 16];
    parse_hyphenated(value.as_bytes(), Out::from_mut(&mut out)).is_ok()
}

static JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:/(?:[^/~]|~[01])*)*$").expect("Is a valid regex"));

fn is_valid_json_pointer(value: &str) -> bool {
    JSON_POINTER_RE.is_match(value).unwrap_or(false)
}

static RELATIVE_JSON_POINTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^/~]|~[01])*)*)$").expect("Is a valid regex")
});

fn is_valid_relative_json_pointer(value: &str) -> bool {
    RELATIVE_JSON_POINTER_RE.is_match(value).unwrap_or(false)
}

fn is_valid_regex(value: &str) -> bool {
    ecma::to_rust_regex(value)
        .map(|converted| Regex::new(&converted).is_ok())
        .unwrap_or(false)
}
