//! The ransomware.live operation set
//!
//! Each tool pairs an argument schema with a route function mapping validated
//! arguments to one upstream GET. Victim listings also get a post-processing
//! step applying `country`/`limit` on the client side.

use log::warn;
use serde_json::{Value, json};

use crate::error::Result;
use crate::upstream::{UpstreamError, UpstreamRequest};

use super::args::ToolArgs;
use super::definition::{ParamSpec, ToolDefinition, TtlClass};
use super::records;

const MAX_LIMIT: i64 = 1_000;

fn limit_param() -> ParamSpec {
    ParamSpec::integer("limit", "Maximum number of records to return").range(1, MAX_LIMIT)
}

fn country_param(description: &str) -> ParamSpec {
    ParamSpec::string("country", description).upper()
}

fn group_param() -> ParamSpec {
    ParamSpec::string("group", "Ransomware group name (e.g. 'lockbit3')")
        .lower()
        .required()
}

fn year_param() -> ParamSpec {
    ParamSpec::integer("year", "Year, e.g. 2024").range(2000, 2100)
}

fn month_param() -> ParamSpec {
    ParamSpec::integer("month", "Month, 1-12").range(1, 12)
}

/// All tools, in registration order
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get-recent-activity",
            "Latest ransomware activity feed (most recent victim posts across all groups)",
            recent_activity,
        )
        .with_ttl_class(TtlClass::Volatile),
        ToolDefinition::new(
            "get-csirt-info-by-country",
            "CSIRT/CERT contacts for a country",
            csirt,
        )
        .with_param(country_param("ISO 3166-1 alpha-2 country code (e.g. 'FR')").required())
        .with_ttl_class(TtlClass::Static),
        ToolDefinition::new("list-active-groups", "All tracked ransomware groups", groups)
            .with_ttl_class(TtlClass::Static),
        ToolDefinition::new(
            "get-group-detail",
            "Profile of one ransomware group: locations, tools, TTPs, activity",
            group_detail,
        )
        .with_param(ParamSpec::string("name", "Group name (e.g. 'lockbit3')").lower().required())
        .with_ttl_class(TtlClass::Static),
        ToolDefinition::new(
            "list-iocs-by-type",
            "Indicators of compromise, optionally restricted to one type",
            iocs_by_type,
        )
        .with_param(ParamSpec::string("type", "IOC type (e.g. 'ip', 'domain', 'hash'); omit for all").lower()),
        ToolDefinition::new(
            "list-iocs-by-group",
            "Indicators of compromise attributed to one group",
            iocs_by_group,
        )
        .with_param(ParamSpec::string("name", "Group name").lower().required())
        .with_param(ParamSpec::string("type", "IOC type filter; omit for all").lower()),
        ToolDefinition::new("list-sectors", "Industry sectors known to the database", sectors)
            .with_ttl_class(TtlClass::Static),
        ToolDefinition::new("list-negotiations", "Groups with leaked negotiation chats", negotiations),
        ToolDefinition::new(
            "list-negotiations-by-group",
            "Negotiation chats for one group",
            negotiations_by_group,
        )
        .with_param(group_param()),
        ToolDefinition::new("get-negotiation-by-id", "Full transcript of one negotiation chat", negotiation)
            .with_param(group_param())
            .with_param(ParamSpec::string("chat_id", "Chat identifier").required())
            .with_ttl_class(TtlClass::Static),
        ToolDefinition::new(
            "list-press-releases",
            "Press coverage of ransomware attacks for a month and country",
            press_releases,
        )
        .with_param(year_param().required())
        .with_param(month_param().required())
        .with_param(country_param("ISO country code").required()),
        ToolDefinition::new("list-recent-press", "Latest press coverage for a country", recent_press)
            .with_param(country_param("ISO country code").required())
            .with_ttl_class(TtlClass::Volatile),
        ToolDefinition::new(
            "list-recent-victims",
            "Most recent victims, optionally for one country",
            recent_victims,
        )
        .with_param(
            ParamSpec::string("order", "Sort by discovery or attack date")
                .lower()
                .one_of(&["discovered", "attacked"])
                .with_default(json!("discovered")),
        )
        .with_param(country_param("Only victims in this country"))
        .with_param(limit_param())
        .with_post(filter_recent_victims)
        .with_ttl_class(TtlClass::Volatile),
        ToolDefinition::new(
            "search-victims",
            "Search victims by any combination of group, sector and country",
            search_victims,
        )
        .with_param(ParamSpec::string("group", "Group name").lower())
        .with_param(ParamSpec::string("sector", "Industry sector").lower())
        .with_param(country_param("ISO country code"))
        .with_param(limit_param())
        .with_post(limit_victims),
        ToolDefinition::new("search-victims-by-country", "Victims in one country", search_victims)
            .with_param(country_param("ISO country code").required())
            .with_param(limit_param())
            .with_post(limit_victims),
        ToolDefinition::new("search-victims-by-sector", "Victims in one industry sector", search_victims)
            .with_param(ParamSpec::string("sector", "Industry sector").lower().required())
            .with_param(country_param("ISO country code"))
            .with_param(limit_param())
            .with_post(limit_victims),
        ToolDefinition::new(
            "search-victims-by-date-range",
            "Victims published in a given year, optionally narrowed to a month",
            victims_by_date,
        )
        .with_param(year_param().required())
        .with_param(month_param())
        .with_param(ParamSpec::string("group", "Group name").lower())
        .with_param(ParamSpec::string("sector", "Industry sector").lower())
        .with_param(country_param("ISO country code"))
        .with_param(limit_param())
        .with_post(limit_victims),
        ToolDefinition::new("list-all-victims", "Every victim in the database", all_victims)
            .with_param(limit_param())
            .with_post(limit_victims),
        ToolDefinition::new("get-victim", "One victim record", victim)
            .with_param(ParamSpec::string("victim_id", "Victim identifier").required()),
        ToolDefinition::new(
            "list-ransom-note-groups",
            "Groups with collected ransom notes",
            ransom_note_groups,
        )
        .with_ttl_class(TtlClass::Static),
        ToolDefinition::new("list-ransom-notes", "Ransom notes collected for one group", ransom_notes)
            .with_param(group_param())
            .with_ttl_class(TtlClass::Static),
        ToolDefinition::new("get-ransom-note", "Content of one ransom note", ransom_note)
            .with_param(group_param())
            .with_param(ParamSpec::string("note_name", "Note file name").required())
            .with_ttl_class(TtlClass::Static),
        ToolDefinition::new("get-stats", "Database statistics", stats).with_ttl_class(TtlClass::Volatile),
        ToolDefinition::new(
            "validate-api-connectivity",
            "Check that the API key is accepted",
            validate,
        )
        .with_ttl_class(TtlClass::Uncached),
        ToolDefinition::new("list-yara-rules", "Groups with published YARA rules", yara_rules)
            .with_ttl_class(TtlClass::Static),
        ToolDefinition::new("get-yara-rules", "YARA rules for one group", yara_rules_for_group)
            .with_param(group_param())
            .with_ttl_class(TtlClass::Static),
    ]
}

fn recent_activity(_args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["8k"]))
}

fn csirt(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["csirt", args.require_str("country")?]))
}

fn groups(_args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["groups"]))
}

fn group_detail(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["groups", args.require_str("name")?]))
}

fn iocs_by_type(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(match args.str("type") {
        Some(ioc_type) => UpstreamRequest::get(["iocs", ioc_type]),
        None => UpstreamRequest::get(["iocs"]),
    })
}

fn iocs_by_group(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["iocs", args.require_str("name")?]).with_optional_query("type", args.str("type")))
}

fn sectors(_args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["listsectors"]))
}

fn negotiations(_args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["negotiations"]))
}

fn negotiations_by_group(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["negotiations", args.require_str("group")?]))
}

fn negotiation(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get([
        "negotiations",
        args.require_str("group")?,
        args.require_str("chat_id")?,
    ]))
}

fn press_releases(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["press", "all"])
        .with_query("year", args.require_int("year")?.to_string())
        .with_query("month", format!("{:02}", args.require_int("month")?))
        .with_query("country", args.require_str("country")?))
}

fn recent_press(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["press", "recent"]).with_query("country", args.require_str("country")?))
}

fn recent_victims(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["victims", "recent"]).with_optional_query("order", args.str("order")))
}

fn search_victims(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["victims", "search"])
        .with_optional_query("group", args.str("group"))
        .with_optional_query("sector", args.str("sector"))
        .with_optional_query("country", args.str("country")))
}

fn victims_by_date(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["victims", ""])
        .with_query("year", args.require_int("year")?.to_string())
        .with_optional_query("month", args.int("month").map(|m| format!("{:02}", m)))
        .with_optional_query("group", args.str("group"))
        .with_optional_query("sector", args.str("sector"))
        .with_optional_query("country", args.str("country")))
}

fn all_victims(_args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["victims", "search"]))
}

fn victim(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["victim", args.require_str("victim_id")?]))
}

fn ransom_note_groups(_args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["ransomnotes"]))
}

fn ransom_notes(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["ransomnotes", args.require_str("group")?]))
}

fn ransom_note(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get([
        "ransomnotes",
        args.require_str("group")?,
        args.require_str("note_name")?,
    ]))
}

fn stats(_args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["stats"]))
}

fn validate(_args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["validate"]))
}

fn yara_rules(_args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["yara"]))
}

fn yara_rules_for_group(args: &ToolArgs) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest::get(["yara", args.require_str("group")?]))
}

/// The recent feed has no country filter upstream, so apply it here, then the limit
///
/// A payload without a recognizable record list cannot be filtered, and passing
/// it through would return other countries' victims, so that is an error.
fn filter_recent_victims(mut payload: Value, args: &ToolArgs) -> Result<Value> {
    if let Some(country) = args.str("country") {
        if !records::filter_by_field(&mut payload, "country", country) {
            return Err(UpstreamError::InvalidResponse(format!(
                "no victim list found to filter by country {}",
                country
            ))
            .into());
        }
    }
    limit_victims(payload, args)
}

fn limit_victims(mut payload: Value, args: &ToolArgs) -> Result<Value> {
    if let Some(limit) = args.int("limit") {
        if !records::limit_records(&mut payload, limit.max(0) as usize) {
            warn!("no victim list found in payload, limit {} not applied", limit);
        }
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McpError;
    use serde_json::Map;

    fn tool(name: &str) -> ToolDefinition {
        definitions().into_iter().find(|t| t.name == name).unwrap()
    }

    fn route(name: &str, raw: Value) -> UpstreamRequest {
        let def = tool(name);
        let args = ToolArgs::validate(&def, raw.as_object().unwrap()).unwrap();
        (def.route)(&args).unwrap()
    }

    #[test]
    fn test_names_are_unique() {
        let defs = definitions();
        let mut names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), defs.len());
    }

    #[test]
    fn test_every_tool_routes_with_required_args() {
        for def in definitions() {
            let mut raw = Map::new();
            for param in def.params.iter().filter(|p| p.required) {
                let value = match (param.name.as_str(), param.param_type) {
                    ("year", _) => json!(2024),
                    ("month", _) => json!(9),
                    (_, crate::tools::ParamType::Integer) => json!(1),
                    _ => json!("x"),
                };
                raw.insert(param.name.clone(), value);
            }
            let args = ToolArgs::validate(&def, &raw).unwrap();
            assert!((def.route)(&args).is_ok(), "{} failed to route", def.name);
        }
    }

    #[test]
    fn test_group_detail_lowercases_name() {
        let request = route("get-group-detail", json!({"name": "LockBit"}));
        assert_eq!(request.path(), "/groups/lockbit");
    }

    #[test]
    fn test_csirt_uppercases_country() {
        let request = route("get-csirt-info-by-country", json!({"country": "fr"}));
        assert_eq!(request.path(), "/csirt/FR");
    }

    #[test]
    fn test_iocs_by_type_optional_segment() {
        assert_eq!(route("list-iocs-by-type", json!({})).path(), "/iocs");
        assert_eq!(route("list-iocs-by-type", json!({"type": ""})).path(), "/iocs");
        assert_eq!(route("list-iocs-by-type", json!({"type": "IP"})).path(), "/iocs/ip");
    }

    #[test]
    fn test_iocs_by_group_query() {
        let request = route("list-iocs-by-group", json!({"name": "akira", "type": "hash"}));
        assert_eq!(request.to_string(), "GET /iocs/akira?type=hash");

        let request = route("list-iocs-by-group", json!({"name": "akira"}));
        assert!(request.query.is_empty());
    }

    #[test]
    fn test_press_releases_pads_month() {
        let request = route("list-press-releases", json!({"year": 2024, "month": "9", "country": "us"}));
        assert_eq!(request.to_string(), "GET /press/all?year=2024&month=09&country=US");
    }

    #[test]
    fn test_recent_victims_default_order() {
        let request = route("list-recent-victims", json!({"country": "FR", "limit": 10}));
        assert_eq!(request.to_string(), "GET /victims/recent?order=discovered");
    }

    #[test]
    fn test_date_range_route() {
        let request = route("search-victims-by-date-range", json!({"year": 2023, "month": 11, "sector": "Healthcare"}));
        assert_eq!(request.to_string(), "GET /victims/?year=2023&month=11&sector=healthcare");
    }

    #[test]
    fn test_search_victims_only_present_filters() {
        let request = route("search-victims", json!({"group": "Akira", "country": ""}));
        assert_eq!(request.to_string(), "GET /victims/search?group=akira");
    }

    #[test]
    fn test_negotiation_keeps_chat_id_case() {
        let request = route("get-negotiation-by-id", json!({"group": "Akira", "chat_id": "Chat 1"}));
        assert_eq!(request.segments, vec!["negotiations", "akira", "Chat 1"]);
    }

    #[test]
    fn test_filter_recent_victims() {
        let def = tool("list-recent-victims");
        let args = ToolArgs::validate(&def, json!({"country": "fr", "limit": 2}).as_object().unwrap()).unwrap();
        let payload = json!([
            {"victim": "a", "country": "FR"},
            {"victim": "b", "country": "DE"},
            {"victim": "c", "country": "FR"},
            {"victim": "d", "country": "FR"}
        ]);

        let shaped = (def.post.unwrap())(payload, &args).unwrap();
        assert_eq!(shaped, json!([{"victim": "a", "country": "FR"}, {"victim": "c", "country": "FR"}]));
    }

    #[test]
    fn test_country_filter_without_record_list_fails() {
        let def = tool("list-recent-victims");
        let args = ToolArgs::validate(&def, json!({"country": "FR"}).as_object().unwrap()).unwrap();
        let payload = json!({"de": [{"country": "DE"}], "fr": [{"country": "FR"}]});

        let err = (def.post.unwrap())(payload, &args).unwrap_err();
        assert!(matches!(err, McpError::Upstream(UpstreamError::InvalidResponse(_))));
        assert!(err.to_string().contains("FR"));
    }

    #[test]
    fn test_limit_without_record_list_passes_through() {
        let def = tool("list-recent-victims");
        let args = ToolArgs::validate(&def, json!({"limit": 1}).as_object().unwrap()).unwrap();
        let payload = json!({"de": [1, 2], "fr": [3, 4]});

        assert_eq!((def.post.unwrap())(payload.clone(), &args).unwrap(), payload);
    }

    #[test]
    fn test_limit_victims_without_limit_is_identity() {
        let payload = json!({"data": [1, 2, 3]});
        assert_eq!(limit_victims(payload.clone(), &ToolArgs::default()).unwrap(), payload);
    }

    #[test]
    fn test_ttl_classes() {
        assert_eq!(tool("list-recent-victims").ttl_class, TtlClass::Volatile);
        assert_eq!(tool("get-group-detail").ttl_class, TtlClass::Static);
        assert_eq!(tool("search-victims").ttl_class, TtlClass::Standard);
        assert_eq!(tool("validate-api-connectivity").ttl_class, TtlClass::Uncached);
    }
}
