use anyhow::Result;
use cadence_core::period::{
    format_date, next_period, parse_date, parse_period, period_for_date, previous_period,
    source_periods,
};
use cadence_core::Fidelity;
use time::OffsetDateTime;

/// The period containing today (UTC).
pub fn current_period(fidelity: Fidelity) -> String {
    period_for_date(OffsetDateTime::now_utc().date(), fidelity)
}

/// Execute `cadence period <fidelity> [period|--date]`
pub fn execute(fidelity: Fidelity, period: Option<&str>, date: Option<&str>, json: bool) -> Result<()> {
    let period = match (period, date) {
        (Some(p), _) => p.to_string(),
        (None, Some(d)) => period_for_date(parse_date(d)?, fidelity),
        (None, None) => current_period(fidelity),
    };
    let info = describe(fidelity, &period)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", render(&info));
    }
    Ok(())
}

fn describe(fidelity: Fidelity, period: &str) -> Result<serde_json::Value> {
    let range = parse_period(fidelity, period)?;
    Ok(serde_json::json!({
        "fidelity": fidelity,
        "period": period,
        "level": fidelity.rank(),
        "start": format_date(range.start),
        "end": format_date(range.end),
        "days": range.days(),
        "previous": previous_period(fidelity, period)?,
        "next": next_period(fidelity, period)?,
        "source_fidelity": fidelity.source(),
        "source_periods": source_periods(fidelity, period)?,
    }))
}

fn render(info: &serde_json::Value) -> String {
    let text = |key: &str| info[key].as_str().unwrap_or_default().to_string();
    let mut out = String::new();
    out.push_str(&format!(
        "{} ({}, level {})\n",
        text("period"),
        text("fidelity"),
        info["level"]
    ));
    out.push_str(&format!(
        "  range:    {} to {} ({} days)\n",
        text("start"),
        text("end"),
        info["days"]
    ));
    out.push_str(&format!("  previous: {}\n", text("previous")));
    out.push_str(&format!("  next:     {}\n", text("next")));
    if let Some(sources) = info["source_periods"].as_array().filter(|s| !s.is_empty()) {
        let list: Vec<&str> = sources.iter().filter_map(|s| s.as_str()).collect();
        out.push_str(&format!(
            "  sources:  {} {}\n",
            text("source_fidelity"),
            list.join(", ")
        ));
    }
    out
}
