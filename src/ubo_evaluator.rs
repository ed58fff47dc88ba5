//! C5 — UBO evaluator: a post-pass over the linear trace that
//! reconstructs per-person aggregates and applies the qualifying
//! criteria from spec §4.5.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::share_parser::{extract_effective_marker, parse_share};
use crate::types::{
    PathContribution, PersonAggregate, PersonOverride, QualitativeFlags, SumReport, TraceLine, UboRecord,
    VotingBlock, SUM_TOLERANCE,
};

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*) \(IČO (\d{8})\)$").expect("valid regex"))
}

fn company_owner_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(IČO \d{8}\)$").expect("valid regex"))
}

enum LineKind {
    Header,
    LabelGroup,
    CompanyOwner,
    PersonOwner,
    Skip,
}

fn classify(line: &TraceLine) -> LineKind {
    if line.label.is_empty() {
        if line.text == "max depth exceeded" || line.text.starts_with("chyba: ") {
            return LineKind::Skip;
        }
        if header_re().is_match(&line.text) {
            return LineKind::Header;
        }
        return LineKind::Skip;
    }
    if line.text == format!("{}:", line.label) {
        return LineKind::LabelGroup;
    }
    if company_owner_re().is_match(&line.text) {
        LineKind::CompanyOwner
    } else {
        LineKind::PersonOwner
    }
}

fn owner_name(text: &str) -> String {
    text.split(" — ").next().unwrap_or(text).to_string()
}

/// Derives the pending multiplier a company-owner line hands to the
/// header it introduces.
fn company_pending_multiplier(line: &TraceLine, parent_mult: f64) -> Option<f64> {
    if let Some(pct) = line.effective_pct {
        return Some(pct / 100.0);
    }
    if let Some(local) = parse_share(&line.text) {
        return Some(parent_mult * local);
    }
    extract_effective_marker(&line.text)
}

/// Derives `(local, eff, source)` for a person-owner line's contribution.
fn person_contribution(line: &TraceLine, parent_mult: f64) -> (Option<f64>, f64, &'static str) {
    if let Some(pct) = line.effective_pct {
        let eff = pct / 100.0;
        let local = if parent_mult != 0.0 { Some(eff / parent_mult) } else { None };
        return (local, eff, "effective_pct");
    }
    if let Some(local) = parse_share(&line.text) {
        return (Some(local), parent_mult * local, "text:share_parser");
    }
    if let Some(ev) = extract_effective_marker(&line.text) {
        return (None, ev, "text:efektivne_marker");
    }
    (None, 0.0, "unknown")
}

/// Scans the trace and reconstructs per-person capital/voting aggregates.
fn aggregate_from_trace(trace: &[TraceLine]) -> HashMap<String, PersonAggregate> {
    let mut stack: Vec<(u32, f64)> = Vec::new();
    let mut pending: Option<f64> = None;
    let mut aggregates: HashMap<String, PersonAggregate> = HashMap::new();

    for line in trace {
        match classify(line) {
            LineKind::Header => {
                while matches!(stack.last(), Some((hd, _)) if *hd >= line.depth) {
                    stack.pop();
                }
                let m = pending.take().unwrap_or_else(|| stack.last().map(|(_, m)| *m).unwrap_or(1.0));
                stack.push((line.depth, m));
            }
            LineKind::LabelGroup => {}
            LineKind::CompanyOwner => {
                let expected_header_depth = line.depth.saturating_sub(2);
                while matches!(stack.last(), Some((hd, _)) if *hd > expected_header_depth) {
                    stack.pop();
                }
                let parent_mult = stack.last().map(|(_, m)| *m).unwrap_or(1.0);
                pending = company_pending_multiplier(line, parent_mult);
            }
            LineKind::PersonOwner => {
                let expected_header_depth = line.depth.saturating_sub(2);
                while matches!(stack.last(), Some((hd, _)) if *hd > expected_header_depth) {
                    stack.pop();
                }
                let parent_mult = stack.last().map(|(_, m)| *m).unwrap_or(1.0);
                let (local, eff, source) = person_contribution(line, parent_mult);

                let name = owner_name(&line.text);
                let entry = aggregates.entry(name.clone()).or_insert_with(|| PersonAggregate {
                    name: name.clone(),
                    ownership: 0.0,
                    voting: 0.0,
                    paths: Vec::new(),
                });
                entry.ownership += eff;
                entry.voting += eff;
                entry.paths.push(PathContribution {
                    parent_depth: expected_header_depth,
                    parent_mult,
                    local,
                    eff,
                    source: source.to_string(),
                    text: line.text.clone(),
                });
                pending = None;
            }
            LineKind::Skip => {
                pending = None;
            }
        }
    }

    for agg in aggregates.values_mut() {
        agg.ownership = agg.ownership.clamp(0.0, 1.0);
        agg.voting = agg.voting.clamp(0.0, 1.0);
    }
    aggregates
}

/// Evaluates the trace against the UBO criteria in spec §4.5.6.
pub fn evaluate(
    trace: &[TraceLine],
    threshold: f64,
    person_overrides: &HashMap<String, PersonOverride>,
    manual_persons: &[crate::types::ManualPerson],
    voting_blocks: &[VotingBlock],
    flags_by_person: &HashMap<String, QualitativeFlags>,
) -> crate::types::EvaluateOutput {
    let mut aggregates = aggregate_from_trace(trace);

    for (name, ov) in person_overrides {
        let entry = aggregates.entry(name.clone()).or_insert_with(|| PersonAggregate {
            name: name.clone(),
            ownership: 0.0,
            voting: 0.0,
            paths: Vec::new(),
        });
        if let Some(cap) = ov.capital_pct {
            entry.ownership = (cap / 100.0).clamp(0.0, 1.0);
        }
        if let Some(vote) = ov.voting_pct {
            entry.voting = (vote / 100.0).clamp(0.0, 1.0);
        }
    }

    for mp in manual_persons {
        aggregates.insert(
            mp.name.clone(),
            PersonAggregate {
                name: mp.name.clone(),
                ownership: (mp.capital_pct / 100.0).clamp(0.0, 1.0),
                voting: (mp.voting_pct / 100.0).clamp(0.0, 1.0),
                paths: Vec::new(),
            },
        );
    }

    let manual_flags: HashMap<&str, QualitativeFlags> =
        manual_persons.iter().map(|mp| (mp.name.as_str(), mp.flags)).collect();

    let flags_for = |name: &str| -> QualitativeFlags {
        flags_by_person
            .get(name)
            .copied()
            .or_else(|| manual_flags.get(name).copied())
            .unwrap_or_default()
    };

    let mut promoted_by_block: HashMap<String, Vec<String>> = HashMap::new();
    for block in voting_blocks {
        let sum_vote: f64 = block
            .members
            .iter()
            .filter_map(|m| aggregates.get(m))
            .map(|a| a.voting)
            .sum();
        if sum_vote > threshold {
            for member in &block.members {
                promoted_by_block.entry(member.clone()).or_default().push(block.name.clone());
            }
        }
    }

    let mut ubos = Vec::new();
    for (name, agg) in &aggregates {
        let flags = flags_for(name);
        let mut reasons = Vec::new();

        if agg.ownership > threshold {
            reasons.push(format!(
                "podíl na kapitálu {:.2}% > {:.2}%",
                agg.ownership * 100.0,
                threshold * 100.0
            ));
        }
        if agg.voting > threshold {
            reasons.push(format!(
                "podíl na hlasovacích právech {:.2}% > {:.2}%",
                agg.voting * 100.0,
                threshold * 100.0
            ));
        }
        if flags.veto {
            reasons.push("veto právo".to_string());
        }
        if flags.org_majority {
            reasons.push("právo jmenovat většinu orgánu".to_string());
        }
        if flags.substitute_ubo {
            reasons.push("zákonný náhradník (§ 5 ZESM)".to_string());
        }
        if let Some(blocks) = promoted_by_block.get(name) {
            for block_name in blocks {
                reasons.push(format!("účast v voting blocku {block_name}"));
            }
        }

        if !reasons.is_empty() {
            ubos.push(UboRecord {
                name: name.clone(),
                ownership: agg.ownership,
                voting: agg.voting,
                flags: flags.into(),
                reasons,
            });
        }
    }
    ubos.sort_by(|a, b| a.name.cmp(&b.name));

    let sum_cap: f64 = aggregates.values().map(|a| a.ownership).sum();
    let sum_vote: f64 = aggregates.values().map(|a| a.voting).sum();
    let sum_report = SumReport {
        sum_cap,
        sum_vote,
        cap_within_tolerance: (sum_cap - 1.0).abs() <= SUM_TOLERANCE,
        vote_within_tolerance: (sum_vote - 1.0).abs() <= SUM_TOLERANCE,
        cap_delta: sum_cap - 1.0,
        vote_delta: sum_vote - 1.0,
    };

    let mut aggregates_out: Vec<PersonAggregate> = aggregates.into_values().collect();
    aggregates_out.sort_by(|a, b| a.name.cmp(&b.name));

    crate::types::EvaluateOutput {
        ubos,
        aggregates: aggregates_out,
        sum_report,
    }
}
