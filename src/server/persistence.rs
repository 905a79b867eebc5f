use crate::{
    api::{MatcherBuilder, MethodPattern, ResponseSpec, ResponseSpecBuilder, UrlPattern},
    common::data::Error,
    server::response::check_body_sources,
};
use regex::Regex;
use serde::Deserialize;
use serde_yaml::{Deserializer, Value as YamlValue};
use std::collections::BTreeMap;

const BODY_KEYS: [&str; 3] = ["content", "text", "json"];
const HTTP_KEYS: [&str; 3] = ["status_code", "reason", "headers"];

/// One matcher as written in a definitions document. Every key that is not a matcher
/// setting is treated as an inline response keyword.
#[derive(Deserialize, Debug)]
struct StaticMatcherDefinition {
    method: Option<String>,
    url: Option<String>,
    url_regex: Option<String>,
    #[serde(default)]
    complete_qs: bool,
    #[serde(default)]
    request_headers: BTreeMap<String, String>,
    responses: Option<Vec<BTreeMap<String, YamlValue>>>,
    #[serde(flatten)]
    inline: BTreeMap<String, YamlValue>,
}

/// Reads one [MatcherBuilder] from every YAML document in `content`. Since YAML is a
/// superset of JSON, JSON documents are accepted as well.
pub(crate) fn deserialize_definitions(content: &str) -> Result<Vec<MatcherBuilder>, Error> {
    let mut builders = Vec::new();

    for document in Deserializer::from_str(content) {
        let value =
            YamlValue::deserialize(document).map_err(|err| Error::Definition(err.to_string()))?;

        if value.is_null() {
            continue;
        }

        let definition: StaticMatcherDefinition =
            serde_yaml::from_value(value).map_err(|err| Error::Definition(err.to_string()))?;

        builders.push(to_matcher_builder(definition)?);
    }

    Ok(builders)
}

fn to_matcher_builder(definition: StaticMatcherDefinition) -> Result<MatcherBuilder, Error> {
    let method = match definition.method {
        Some(method) => MethodPattern::Exact(method),
        None => MethodPattern::Any,
    };

    let url = match (definition.url, definition.url_regex) {
        (Some(_), Some(_)) => {
            return Err(Error::Definition(
                "url and url_regex cannot be used together".to_string(),
            ))
        }
        (Some(url), None) => UrlPattern::Exact(url),
        (None, Some(regex)) => UrlPattern::Regex(
            Regex::new(&regex).map_err(|err| Error::Definition(err.to_string()))?,
        ),
        (None, None) => UrlPattern::Any,
    };

    let inline = without_nulls(definition.inline);
    let responses = definition.responses.unwrap_or_default();

    if !responses.is_empty() && !inline.is_empty() {
        return Err(Error::ResponseListAndInline);
    }

    let responses = if responses.is_empty() {
        vec![to_response_spec(inline)?]
    } else {
        responses
            .into_iter()
            .map(|kwargs| to_response_spec(without_nulls(kwargs)))
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut builder = MatcherBuilder::new(method, url)
        .complete_qs(definition.complete_qs)
        .responses(responses);

    for (name, value) in definition.request_headers {
        builder = builder.request_header(name, value);
    }

    Ok(builder)
}

/// A keyword given as `null` counts as not given.
fn without_nulls(mut kwargs: BTreeMap<String, YamlValue>) -> BTreeMap<String, YamlValue> {
    kwargs.retain(|_, value| !value.is_null());
    kwargs
}

fn to_response_spec(kwargs: BTreeMap<String, YamlValue>) -> Result<ResponseSpecBuilder, Error> {
    let bodies: Vec<&str> = BODY_KEYS
        .iter()
        .copied()
        .filter(|key| kwargs.contains_key(*key))
        .collect();
    check_body_sources(&bodies)?;

    let unexpected: Vec<&str> = kwargs
        .keys()
        .map(String::as_str)
        .filter(|key| !BODY_KEYS.contains(key) && !HTTP_KEYS.contains(key))
        .collect();
    if !unexpected.is_empty() {
        return Err(Error::UnexpectedArguments(unexpected.join(", ")));
    }

    let mut builder = ResponseSpec::builder();

    for (key, value) in kwargs {
        builder = match key.as_str() {
            "status_code" => builder.status_code(to_status_code(value)?),
            "reason" => builder.reason(to_string("reason", value)?),
            "headers" => {
                let headers: BTreeMap<String, String> = serde_yaml::from_value(value)
                    .map_err(|err| Error::Definition(format!("headers: {}", err)))?;
                headers
                    .into_iter()
                    .fold(builder, |builder, (name, value)| builder.header(name, value))
            }
            "content" => builder.content(to_content(value)?),
            "text" => match value {
                YamlValue::String(text) => builder.text(text),
                _ => return Err(Error::InvalidBodyType("Text should be string data".into())),
            },
            "json" => builder.json(serde_json::to_value(value)?),
            _ => builder,
        };
    }

    Ok(builder)
}

fn to_status_code(value: YamlValue) -> Result<u16, Error> {
    value
        .as_u64()
        .and_then(|status| u16::try_from(status).ok())
        .ok_or_else(|| Error::Definition(format!("invalid status_code: {:?}", value)))
}

fn to_string(key: &str, value: YamlValue) -> Result<String, Error> {
    match value {
        YamlValue::String(value) => Ok(value),
        other => Err(Error::Definition(format!("{} must be a string: {:?}", key, other))),
    }
}

/// Content is binary data, written as a list of byte values.
fn to_content(value: YamlValue) -> Result<Vec<u8>, Error> {
    let invalid = || Error::InvalidBodyType("Content should be binary data".to_string());

    match value {
        YamlValue::Sequence(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|byte| u8::try_from(byte).ok())
                    .ok_or_else(invalid)
            })
            .collect(),
        _ => Err(invalid()),
    }
}
