//! The closed catalogue of side-effectful actions the function-caller LLM
//! may invoke against a [`MirroredCustomer`].
//!
//! Each handler mutates the customer in place and returns a small JSON
//! summary of what changed. Validation here is the same declaration used to
//! build the tool schema advertised to the LLM Gateway, so the two can never
//! drift apart.

use crate::error::FunctionError;
use chrono::Utc;
use lumen_domain::model::{BusinessInsight, DemoCreationStatus, MirroredCustomer};
use lumen_domain::tool::ArgMap;
use serde_json::{json, Value};

const PROFILE_FIELDS: &[&str] = &[
    "user_name",
    "job_title",
    "company_name",
    "company_description",
    "company_size",
    "company_sector",
];

const METRIC_NAMES: &[&str] = &[
    "monthly_website_visitors",
    "monthly_inbound_calls",
    "monthly_form_submissions",
];

const INSIGHT_CATEGORIES: &[&str] = &["CHALLENGE", "GOAL", "MOTIVATION", "STRENGTH"];

fn arg_str(args: &ArgMap, function: &str, key: &str) -> Result<String, FunctionError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| FunctionError::InvalidArguments {
            function: function.into(),
            message: format!("missing or non-string argument '{key}'"),
        })
}

fn require_one_of(
    function: &str,
    key: &str,
    value: &str,
    allowed: &[&str],
) -> Result<(), FunctionError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(FunctionError::InvalidArguments {
            function: function.into(),
            message: format!("'{key}' must be one of {allowed:?}, got '{value}'"),
        })
    }
}

/// `update_profile_field(field, new_value)` — sets a top-level attribute.
pub fn update_profile_field(
    args: &ArgMap,
    customer: &mut MirroredCustomer,
) -> Result<Value, FunctionError> {
    let field = arg_str(args, "update_profile_field", "field")?;
    let new_value = arg_str(args, "update_profile_field", "new_value")?;
    require_one_of("update_profile_field", "field", &field, PROFILE_FIELDS)?;

    let slot = match field.as_str() {
        "user_name" => &mut customer.user_name,
        "job_title" => &mut customer.job_title,
        "company_name" => &mut customer.company_name,
        "company_description" => &mut customer.company_description,
        "company_size" => &mut customer.company_size,
        "company_sector" => &mut customer.company_sector,
        _ => unreachable!("validated by require_one_of"),
    };
    *slot = Some(new_value.clone());
    customer.touch(Utc::now());

    Ok(json!({"field": field, "new_value": new_value}))
}

/// `log_metric(metric_name, value_string)` — writes a raw metric string.
pub fn log_metric(args: &ArgMap, customer: &mut MirroredCustomer) -> Result<Value, FunctionError> {
    let metric_name = arg_str(args, "log_metric", "metric_name")?;
    let value_string = arg_str(args, "log_metric", "value_string")?;
    require_one_of("log_metric", "metric_name", &metric_name, METRIC_NAMES)?;

    customer
        .business_insights
        .metrics
        .insert(metric_name.clone(), value_string.clone());
    customer.touch(Utc::now());

    Ok(json!({"metric_name": metric_name, "value_string": value_string}))
}

/// `record_business_insight(category, insight_details)` — appends an entry.
pub fn record_business_insight(
    args: &ArgMap,
    customer: &mut MirroredCustomer,
) -> Result<Value, FunctionError> {
    let category = arg_str(args, "record_business_insight", "category")?;
    let insight_details = arg_str(args, "record_business_insight", "insight_details")?;
    require_one_of(
        "record_business_insight",
        "category",
        &category,
        INSIGHT_CATEGORIES,
    )?;

    let timestamp = Utc::now();
    customer.business_insights.insights.push(BusinessInsight {
        category: category.clone(),
        details: insight_details.clone(),
        timestamp,
    });
    customer.touch(timestamp);

    Ok(json!({
        "category": category,
        "details": insight_details,
        "timestamp": timestamp,
    }))
}

/// `log_marketing_channels(channels)` — unions into the deduplicated list.
pub fn log_marketing_channels(
    args: &ArgMap,
    customer: &mut MirroredCustomer,
) -> Result<Value, FunctionError> {
    let channels = args
        .get("channels")
        .map(|v| v.to_display_string())
        .ok_or_else(|| FunctionError::InvalidArguments {
            function: "log_marketing_channels".into(),
            message: "missing argument 'channels'".into(),
        })?;

    let incoming: Vec<String> = match args.get("channels") {
        Some(lumen_domain::tool::ArgValue::List(items)) => {
            items.iter().map(|v| v.to_display_string()).collect()
        }
        Some(lumen_domain::tool::ArgValue::Str(_)) => {
            channels.split(',').map(|s| s.trim().to_string()).collect()
        }
        _ => Vec::new(),
    };

    for channel in &incoming {
        if !customer
            .business_insights
            .marketing_channels
            .iter()
            .any(|c| c.eq_ignore_ascii_case(channel))
        {
            customer
                .business_insights
                .marketing_channels
                .push(channel.clone());
        }
    }
    customer.touch(Utc::now());

    Ok(json!({"channels": customer.business_insights.marketing_channels}))
}

/// `initiate_demo_creation()` — idempotent; re-calling is a no-op success.
pub fn initiate_demo_creation(
    _args: &ArgMap,
    customer: &mut MirroredCustomer,
) -> Result<Value, FunctionError> {
    if customer.business_insights.demo_creation_initiated.is_none() {
        let timestamp = Utc::now();
        customer.business_insights.demo_creation_initiated = Some(DemoCreationStatus {
            status: "initiated".into(),
            timestamp,
        });
        customer.touch(timestamp);
    }
    Ok(json!(customer.business_insights.demo_creation_initiated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_domain::tool::ArgValue;
    use std::collections::HashMap;

    fn args(pairs: &[(&str, ArgValue)]) -> ArgMap {
        pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect::<HashMap<_, _>>()
    }

    #[test]
    fn update_profile_field_sets_value() {
        let mut customer = MirroredCustomer::new_at(Utc::now());
        let args = args(&[
            ("field", ArgValue::Str("job_title".into())),
            ("new_value", ArgValue::Str("Director of Marketing".into())),
        ]);
        update_profile_field(&args, &mut customer).unwrap();
        assert_eq!(customer.job_title.as_deref(), Some("Director of Marketing"));
    }

    #[test]
    fn update_profile_field_rejects_unknown_field() {
        let mut customer = MirroredCustomer::new_at(Utc::now());
        let args = args(&[
            ("field", ArgValue::Str("favorite_color".into())),
            ("new_value", ArgValue::Str("blue".into())),
        ]);
        assert!(update_profile_field(&args, &mut customer).is_err());
    }

    #[test]
    fn log_metric_writes_raw_string() {
        let mut customer = MirroredCustomer::new_at(Utc::now());
        let args = args(&[
            ("metric_name", ArgValue::Str("monthly_website_visitors".into())),
            ("value_string", ArgValue::Str("~5,000-7,000".into())),
        ]);
        log_metric(&args, &mut customer).unwrap();
        assert_eq!(
            customer.business_insights.metrics.get("monthly_website_visitors"),
            Some(&"~5,000-7,000".to_string())
        );
    }

    #[test]
    fn record_business_insight_appends() {
        let mut customer = MirroredCustomer::new_at(Utc::now());
        let args = args(&[
            ("category", ArgValue::Str("CHALLENGE".into())),
            ("insight_details", ArgValue::Str("too many manual steps".into())),
        ]);
        record_business_insight(&args, &mut customer).unwrap();
        assert_eq!(customer.business_insights.insights.len(), 1);
        assert_eq!(customer.business_insights.insights[0].category, "CHALLENGE");
    }

    #[test]
    fn log_marketing_channels_dedups_case_insensitively() {
        let mut customer = MirroredCustomer::new_at(Utc::now());
        let args = args(&[(
            "channels",
            ArgValue::List(vec![
                ArgValue::Str("Facebook".into()),
                ArgValue::Str("facebook".into()),
                ArgValue::Str("Google Ads".into()),
            ]),
        )]);
        log_marketing_channels(&args, &mut customer).unwrap();
        assert_eq!(customer.business_insights.marketing_channels.len(), 2);
    }

    #[test]
    fn initiate_demo_creation_is_idempotent() {
        let mut customer = MirroredCustomer::new_at(Utc::now());
        let args = ArgMap::new();
        initiate_demo_creation(&args, &mut customer).unwrap();
        let first = customer.business_insights.demo_creation_initiated.clone();
        initiate_demo_creation(&args, &mut customer).unwrap();
        let second = customer.business_insights.demo_creation_initiated.clone();
        assert_eq!(first.unwrap().timestamp, second.unwrap().timestamp);
    }
}
