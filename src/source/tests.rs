use super::*;
use crate::error::Error;
use crate::pagination::{
    calendar, PageResponse, PageToken, PaginationState, CURSOR_PARAM, PAGE_SIZE_PARAM,
};
use chrono::{DateTime, NaiveDate, Utc};
use pretty_assertions::assert_eq;
use reqwest::header::HeaderMap;
use serde_json::{json, Value};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

fn ctx(start: &str) -> RequestContext {
    RequestContext::new(ts(start), 100)
}

fn empty_page() -> Value {
    json!({"data": {"dailyWorkspaceMTUUsage": [], "pagination": {"current": "MA=="}}})
}

fn cursor_page(next: &str) -> Value {
    json!({"data": {"dailyWorkspaceMTUUsage": [], "pagination": {"next": next}}})
}

/// Drive a strategy the way the engine does, without HTTP, and collect the
/// `period` anchors it sends.
fn drive(
    strategy: &dyn SourceStrategy,
    ctx: &RequestContext,
    today: NaiveDate,
    mut respond: impl FnMut(usize) -> Value,
) -> Vec<(Option<DateTime<Utc>>, Option<String>)> {
    let headers = HeaderMap::new();
    let mut state = PaginationState::new();
    let mut sent = Vec::new();

    while !state.done {
        let request = strategy.build_params(ctx, &state, today);
        state.record_request(request.period);
        sent.push((request.period, request.params.get(CURSOR_PARAM).cloned()));

        let body = respond(state.pages);
        let next = strategy.next_token(&PageResponse::new(&body, &headers), &state, today);
        state.advance(next);
        assert!(state.pages < 100, "pagination did not terminate");
    }
    sent
}

// ============================================================================
// Generic Source
// ============================================================================

#[test]
fn test_generic_first_page_params() {
    let source = GenericSource::new();
    let req = source.build_params(
        &ctx("2023-01-01T00:00:00Z"),
        &PaginationState::new(),
        date(2023, 3, 10),
    );

    assert_eq!(req.params.get(PAGE_SIZE_PARAM), Some(&"100".to_string()));
    assert_eq!(
        req.params.get("period"),
        Some(&"2023-01-01T00:00:00Z".to_string())
    );
    assert!(!req.params.contains_key(CURSOR_PARAM));
}

#[test]
fn test_generic_uses_checkpoint_over_start_date() {
    let source = GenericSource::new();
    let ctx = ctx("2023-01-01T00:00:00Z").with_checkpoint(Some(ts("2023-02-14T00:00:00Z")));
    let req = source.build_params(&ctx, &PaginationState::new(), date(2023, 3, 10));

    assert_eq!(
        req.params.get("period"),
        Some(&"2023-02-14T00:00:00Z".to_string())
    );
}

#[test]
fn test_generic_follows_cursor_until_exhausted() {
    let source = GenericSource::new();
    let sent = drive(
        &source,
        &ctx("2023-01-01T00:00:00Z"),
        date(2023, 3, 10),
        |page| match page {
            1 => cursor_page("c1"),
            2 => cursor_page("c2"),
            _ => empty_page(),
        },
    );

    let cursors: Vec<_> = sent.into_iter().map(|(_, c)| c).collect();
    assert_eq!(
        cursors,
        vec![None, Some("c1".to_string()), Some("c2".to_string())]
    );
}

#[test]
fn test_generic_never_synthesizes_months() {
    let source = GenericSource::new();
    let mut state = PaginationState::new();
    state.record_request(Some(ts("2023-01-01T00:00:00Z")));

    let body = empty_page();
    let headers = HeaderMap::new();
    let next = source.next_token(
        &PageResponse::new(&body, &headers),
        &state,
        date(2023, 3, 10),
    );
    assert_eq!(next, None);
}

// ============================================================================
// Volume Window Source
// ============================================================================

#[test]
fn test_volume_window_params() {
    let source = VolumeWindowSource::new(Some(2));
    let req = source.build_params(
        &ctx("2023-01-01T00:00:00Z"),
        &PaginationState::new(),
        date(2023, 3, 10),
    );

    assert_eq!(req.params.get("startTime"), Some(&"2023-01-01".to_string()));
    assert_eq!(req.params.get("endTime"), Some(&"2023-03-09".to_string()));
    assert_eq!(req.params.get("granularity"), Some(&"DAY".to_string()));
    assert_eq!(req.params.get(PAGE_SIZE_PARAM), Some(&"100".to_string()));
    assert!(!req.params.contains_key("period"));
}

#[test]
fn test_volume_window_lookback_floor() {
    let source = VolumeWindowSource::new(Some(2));
    let req = source.build_params(
        &ctx("2019-06-01T00:00:00Z"),
        &PaginationState::new(),
        date(2025, 6, 15),
    );

    assert_eq!(req.params.get("startTime"), Some(&"2023-06-15".to_string()));
    assert_eq!(req.period, Some(ts("2023-06-15T00:00:00Z")));
}

#[test]
fn test_volume_window_without_lookback() {
    let source = VolumeWindowSource::new(None);
    let req = source.build_params(
        &ctx("2019-06-01T00:00:00Z"),
        &PaginationState::new(),
        date(2025, 6, 15),
    );

    assert_eq!(req.params.get("startTime"), Some(&"2019-06-01".to_string()));
}

#[test]
fn test_volume_window_carries_cursor() {
    let source = VolumeWindowSource::new(Some(2));
    let mut state = PaginationState::new();
    state.record_request(Some(ts("2023-01-01T00:00:00Z")));
    state.advance(Some(PageToken::Opaque("v2".to_string())));

    let req = source.build_params(&ctx("2023-01-01T00:00:00Z"), &state, date(2023, 3, 10));
    assert_eq!(req.params.get(CURSOR_PARAM), Some(&"v2".to_string()));
    assert_eq!(req.params.get("startTime"), Some(&"2023-01-01".to_string()));
}

// ============================================================================
// Monthly Window Source
// ============================================================================

#[test]
fn test_monthly_synthesizes_next_month() {
    let source = MonthlyWindowSource::new(None);
    let mut state = PaginationState::new();
    state.record_request(Some(ts("2023-01-01T00:00:00Z")));

    let body = empty_page();
    let headers = HeaderMap::new();
    let next = source.next_token(
        &PageResponse::new(&body, &headers),
        &state,
        date(2023, 3, 10),
    );

    assert_eq!(next, Some(PageToken::Month(date(2023, 2, 1))));
}

#[test]
fn test_monthly_clamps_day_of_month() {
    let source = MonthlyWindowSource::new(None);
    let mut state = PaginationState::new();
    state.record_request(Some(ts("2023-01-31T00:00:00Z")));

    let body = empty_page();
    let headers = HeaderMap::new();
    let next = source.next_token(
        &PageResponse::new(&body, &headers),
        &state,
        date(2023, 3, 10),
    );

    assert_eq!(next, Some(PageToken::Month(date(2023, 2, 28))));
}

#[test]
fn test_monthly_body_cursor_used_verbatim() {
    let source = MonthlyWindowSource::new(None);
    let mut state = PaginationState::new();
    state.record_request(Some(ts("2021-01-01T00:00:00Z")));

    let body = cursor_page("opaque==");
    let headers = HeaderMap::new();
    let next = source.next_token(
        &PageResponse::new(&body, &headers),
        &state,
        date(2023, 3, 10),
    );

    assert_eq!(next, Some(PageToken::Opaque("opaque==".to_string())));
}

#[test]
fn test_monthly_month_token_sets_period_without_cursor() {
    let source = MonthlyWindowSource::new(None);
    let mut state = PaginationState::new();
    state.record_request(Some(ts("2023-01-31T00:00:00Z")));
    state.advance(Some(PageToken::Month(date(2023, 2, 28))));

    let req = source.build_params(&ctx("2023-01-31T00:00:00Z"), &state, date(2023, 3, 10));
    assert_eq!(
        req.params.get("period"),
        Some(&"2023-02-28T00:00:00Z".to_string())
    );
    assert!(!req.params.contains_key(CURSOR_PARAM));
}

#[test]
fn test_monthly_opaque_token_stays_in_current_window() {
    let source = MonthlyWindowSource::new(None);
    let mut state = PaginationState::new();
    state.record_request(Some(ts("2023-02-01T00:00:00Z")));
    state.advance(Some(PageToken::Opaque("next==".to_string())));

    let req = source.build_params(&ctx("2023-01-01T00:00:00Z"), &state, date(2023, 3, 10));
    assert_eq!(
        req.params.get("period"),
        Some(&"2023-02-01T00:00:00Z".to_string())
    );
    assert_eq!(req.params.get(CURSOR_PARAM), Some(&"next==".to_string()));
}

#[test]
fn test_monthly_start_in_current_month_is_one_request() {
    let source = MonthlyWindowSource::new(None);
    let sent = drive(
        &source,
        &ctx("2023-03-02T00:00:00Z"),
        date(2023, 3, 10),
        |_| empty_page(),
    );

    assert_eq!(sent.len(), 1);
}

#[test]
fn test_monthly_walks_through_current_month() {
    let source = MonthlyWindowSource::new(None);
    let sent = drive(
        &source,
        &ctx("2023-01-01T00:00:00Z"),
        date(2023, 3, 10),
        |_| empty_page(),
    );

    let periods: Vec<_> = sent.into_iter().filter_map(|(p, _)| p).collect();
    assert_eq!(
        periods,
        vec![
            ts("2023-01-01T00:00:00Z"),
            ts("2023-02-01T00:00:00Z"),
            ts("2023-03-01T00:00:00Z"),
        ]
    );
}

#[test]
fn test_monthly_proposes_current_month_but_never_later() {
    let source = MonthlyWindowSource::new(None);
    let headers = HeaderMap::new();
    let body = empty_page();
    let page = PageResponse::new(&body, &headers);
    let today = date(2023, 3, 10);

    let mut state = PaginationState::new();
    state.record_request(Some(ts("2023-02-01T00:00:00Z")));
    assert_eq!(
        source.next_token(&page, &state, today),
        Some(PageToken::Month(date(2023, 3, 1)))
    );

    state.record_request(Some(ts("2023-03-01T00:00:00Z")));
    assert_eq!(source.next_token(&page, &state, today), None);

    // A window already past today (clock skew) is not extended either
    state.record_request(Some(ts("2023-04-01T00:00:00Z")));
    assert_eq!(source.next_token(&page, &state, today), None);
}

#[test]
fn test_monthly_cursor_after_month_step_is_not_reanchored() {
    let source = MonthlyWindowSource::new(None);
    let sent = drive(
        &source,
        &ctx("2023-01-01T00:00:00Z"),
        date(2023, 2, 20),
        |page| match page {
            2 => cursor_page("MTAw"),
            _ => empty_page(),
        },
    );

    assert_eq!(
        sent,
        vec![
            (Some(ts("2023-01-01T00:00:00Z")), None),
            (Some(ts("2023-02-01T00:00:00Z")), None),
            (Some(ts("2023-02-01T00:00:00Z")), Some("MTAw".to_string())),
        ]
    );
}

#[test]
fn test_monthly_periods_are_monotonic_with_mixed_tokens() {
    let source = MonthlyWindowSource::new(None);
    let today = date(2023, 6, 20);
    let sent = drive(&source, &ctx("2022-11-30T00:00:00Z"), today, |page| {
        // Every other page carries a cursor within the month
        if page % 2 == 1 {
            cursor_page(&format!("c{page}"))
        } else {
            empty_page()
        }
    });

    let periods: Vec<_> = sent.iter().filter_map(|(p, _)| *p).collect();
    assert!(periods.windows(2).all(|w| w[0] <= w[1]), "{periods:?}");

    // Never past the current month
    let current = calendar::month_start(today);
    assert!(periods
        .iter()
        .all(|p| calendar::month_start(p.date_naive()) <= current));
    assert_eq!(
        calendar::month_start(periods[periods.len() - 1].date_naive()),
        current
    );
}

#[test]
fn test_monthly_lookback_floor_is_configurable() {
    let today = date(2025, 6, 15);
    let state = PaginationState::new();

    let unbounded = MonthlyWindowSource::new(None);
    let req = unbounded.build_params(&ctx("2019-01-01T00:00:00Z"), &state, today);
    assert_eq!(
        req.params.get("period"),
        Some(&"2019-01-01T00:00:00Z".to_string())
    );

    let bounded = MonthlyWindowSource::new(Some(2));
    let req = bounded.build_params(&ctx("2019-01-01T00:00:00Z"), &state, today);
    assert_eq!(
        req.params.get("period"),
        Some(&"2023-06-15T00:00:00Z".to_string())
    );
}

#[test]
fn test_monthly_coerces_count_fields() {
    let source = MonthlyWindowSource::new(None);
    let record = json!({
        "anonymous": "5",
        "anonymousIdentified": "0",
        "identified": "12",
        "neverIdentified": "7",
        "timestamp": "2023-01-01T00:00:00Z"
    });

    let out = source.post_process("workspace_mtu_usage_daily", record).unwrap();
    assert_eq!(out["anonymous"], json!(5));
    assert_eq!(out["identified"], json!(12));

    // Running again is a no-op
    let again = source
        .post_process("workspace_mtu_usage_daily", out.clone())
        .unwrap();
    assert_eq!(again, out);
}

#[test]
fn test_monthly_rejects_non_integer_counts() {
    let source = MonthlyWindowSource::new(None);
    let err = source
        .post_process("source_mtu_usage_daily", json!({"anonymous": "lots"}))
        .unwrap_err();

    assert!(matches!(err, Error::Coercion { ref field, .. } if field == "anonymous"));
}

#[test]
fn test_generic_post_process_is_identity() {
    let source = GenericSource::new();
    let record = json!({"apiCalls": "3"});
    assert_eq!(source.post_process("s", record.clone()).unwrap(), record);
}

// ============================================================================
// Strategy Kind
// ============================================================================

#[test]
fn test_strategy_kind_build() {
    let policy = LookbackPolicy::default();
    assert_eq!(StrategyKind::Generic.build(policy).kind(), StrategyKind::Generic);
    assert_eq!(
        StrategyKind::VolumeWindow.build(policy).kind(),
        StrategyKind::VolumeWindow
    );
    assert_eq!(
        StrategyKind::MonthlyWindow.build(policy).kind(),
        StrategyKind::MonthlyWindow
    );
    assert_eq!(StrategyKind::MonthlyWindow.to_string(), "monthly_window");
}

#[test]
fn test_lookback_policy_defaults() {
    let policy: LookbackPolicy = serde_json::from_str("{}").unwrap();
    assert_eq!(policy.volume_years, Some(2));
    assert_eq!(policy.monthly_years, None);

    let policy: LookbackPolicy = serde_json::from_str(r#"{"monthly_years": 2}"#).unwrap();
    assert_eq!(policy.monthly_years, Some(2));
}
