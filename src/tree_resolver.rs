//! C4 — tree resolver: the recursive walker that produces the
//! depth-tagged ownership trace (spec §4.4). Does not detect cycles by
//! design (spec §4.3/§9) — `max_depth` is the only descent guard.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::owner_extractor::extract_owners;
use crate::registry::client::{FetchOutcome, RegistryPort};
use crate::share_parser::{extract_effective_marker, parse_share};
use crate::types::{
    normalize_ico, ManualOverrides, OwnerKind, OwnerRecord, ResolveOutput, ResolveWarning, TraceLine, WarningKind,
};

struct Ctx<'a> {
    client: &'a dyn RegistryPort,
    manual_overrides: &'a ManualOverrides,
    max_depth: u32,
    force_refresh: bool,
}

/// Resolves the ownership tree rooted at `root_id`, returning the linear
/// pre-order trace and the ordered list of warnings.
pub async fn resolve(
    client: &dyn RegistryPort,
    root_id: &str,
    max_depth: u32,
    manual_overrides: &ManualOverrides,
    force_refresh: bool,
) -> ResolveOutput {
    let ctx = Ctx {
        client,
        manual_overrides,
        max_depth,
        force_refresh,
    };
    let mut trace = Vec::new();
    let mut warnings = Vec::new();
    resolve_node(&ctx, normalize_ico(root_id), 0, 1.0, &mut trace, &mut warnings).await;
    ResolveOutput { trace, warnings }
}

fn resolve_node<'a>(
    ctx: &'a Ctx<'a>,
    id: String,
    depth: u32,
    parent_multiplier: f64,
    trace: &'a mut Vec<TraceLine>,
    warnings: &'a mut Vec<ResolveWarning>,
) -> Pin<Box<dyn Future<Output = ()> + 'a>> {
    Box::pin(async move {
        if depth > ctx.max_depth {
            trace.push(TraceLine {
                depth,
                label: String::new(),
                text: "max depth exceeded".to_string(),
                effective_pct: None,
            });
            return;
        }

        let ico = normalize_ico(&id);
        let payload = match ctx.client.get_by_id(&ico, ctx.force_refresh).await {
            Ok(FetchOutcome::Payload(p)) => p,
            Ok(FetchOutcome::NotFound(message)) => {
                trace.push(TraceLine {
                    depth,
                    label: String::new(),
                    text: format!("chyba: {message}"),
                    effective_pct: None,
                });
                warnings.push(ResolveWarning {
                    kind: WarningKind::Error,
                    ico,
                    name: String::new(),
                    text: message,
                });
                return;
            }
            Err(e) => {
                let text = e.to_string();
                trace.push(TraceLine {
                    depth,
                    label: String::new(),
                    text: format!("chyba: {text}"),
                    effective_pct: None,
                });
                warnings.push(ResolveWarning {
                    kind: WarningKind::Error,
                    ico,
                    name: String::new(),
                    text,
                });
                return;
            }
        };

        let (name, resolved_ico, mut owners) = extract_owners(&payload);
        let node_ico = resolved_ico.unwrap_or_else(|| ico.clone());

        trace.push(TraceLine {
            depth,
            label: String::new(),
            text: format!("{name} (IČO {node_ico})"),
            effective_pct: if depth == 0 { Some(100.0) } else { None },
        });

        if let Some(manuals) = ctx.manual_overrides.get(&node_ico) {
            for (owner_id, fraction) in manuals {
                let owner_ico = normalize_ico(owner_id);
                let resolved_name = match ctx.client.get_by_id(&owner_ico, false).await {
                    Ok(FetchOutcome::Payload(p)) => {
                        let (n, _, _) = extract_owners(&p);
                        if n.is_empty() {
                            format!("Společnost (IČO {owner_ico})")
                        } else {
                            n
                        }
                    }
                    _ => format!("Společnost (IČO {owner_ico})"),
                };
                owners.push(OwnerRecord {
                    kind: OwnerKind::Company,
                    name: resolved_name,
                    ico: Some(owner_ico),
                    share_pct: Some(fraction * 100.0),
                    share_raw: None,
                    label: "manually added".to_string(),
                });
            }
        }

        if owners.is_empty() {
            warnings.push(ResolveWarning {
                kind: WarningKind::Unresolved,
                ico: node_ico,
                name,
                text: "no owners resolved".to_string(),
            });
            return;
        }

        if depth + 2 > ctx.max_depth {
            return;
        }

        let mut label_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<&OwnerRecord>> = HashMap::new();
        for o in &owners {
            groups.entry(o.label.clone()).or_insert_with(|| {
                label_order.push(o.label.clone());
                Vec::new()
            });
            groups.get_mut(&o.label).unwrap().push(o);
        }

        for label in label_order {
            trace.push(TraceLine {
                depth: depth + 1,
                label: label.clone(),
                text: format!("{label}:"),
                effective_pct: None,
            });

            for owner in groups.get(&label).unwrap().clone() {
                let s = local_share(owner);
                let e = owner.share_raw.as_deref().and_then(extract_effective_marker);

                match owner.kind {
                    OwnerKind::Company if owner.ico.is_some() => {
                        let eff_pct = match s {
                            Some(sv) => Some(parent_multiplier * sv * 100.0),
                            None => e.map(|ev| ev * 100.0),
                        };
                        let share_display = match s {
                            Some(sv) => format!("{:.2}%", sv * 100.0),
                            None => owner.share_raw.clone().unwrap_or_default(),
                        };
                        let child_ico = owner.ico.clone().unwrap();
                        trace.push(TraceLine {
                            depth: depth + 2,
                            label: label.clone(),
                            text: format!("{} — {} (IČO {})", owner.name, share_display, child_ico),
                            effective_pct: eff_pct,
                        });

                        let next_multiplier = match s {
                            Some(sv) => parent_multiplier * sv,
                            None => e.unwrap_or(parent_multiplier),
                        };
                        resolve_node(ctx, child_ico, depth + 3, next_multiplier, trace, warnings).await;
                    }
                    _ => {
                        if let Some(sv) = s {
                            let eff_pct = parent_multiplier * sv * 100.0;
                            trace.push(TraceLine {
                                depth: depth + 2,
                                label: label.clone(),
                                text: format!(
                                    "{} — {:.2}% (efektivně {:.2}%)",
                                    owner.name,
                                    sv * 100.0,
                                    eff_pct
                                ),
                                effective_pct: Some(eff_pct),
                            });
                        } else if let Some(ev) = e {
                            let eff_pct = ev * 100.0;
                            let base = owner
                                .share_pct
                                .map(|p| format!("{p:.2}%"))
                                .unwrap_or_else(|| owner.share_raw.clone().unwrap_or_default());
                            trace.push(TraceLine {
                                depth: depth + 2,
                                label: label.clone(),
                                text: format!("{} — {} (efektivně {:.2}%)", owner.name, base, eff_pct),
                                effective_pct: Some(eff_pct),
                            });
                        } else {
                            trace.push(TraceLine {
                                depth: depth + 2,
                                label: label.clone(),
                                text: format!("{} — {}", owner.name, owner.share_raw.clone().unwrap_or_default()),
                                effective_pct: None,
                            });
                        }
                    }
                }
            }
        }
    })
}

/// Local share in `[0,1]`, in precedence order: `share_pct`, then
/// `share_raw` via C1, else unknown.
fn local_share(owner: &OwnerRecord) -> Option<f64> {
    owner
        .share_pct
        .map(|p| p / 100.0)
        .or_else(|| owner.share_raw.as_deref().and_then(parse_share))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::payload::RegistryPayload;
    use async_trait::async_trait;
    use crate::error::UboResult;
    use std::collections::HashMap as Map;

    struct FakeRegistry {
        payloads: Map<String, String>,
    }

    #[async_trait]
    impl RegistryPort for FakeRegistry {
        async fn get_by_id(&self, id: &str, _force_refresh: bool) -> UboResult<FetchOutcome> {
            let ico = normalize_ico(id);
            match self.payloads.get(&ico) {
                Some(json) => {
                    let payload: RegistryPayload = serde_json::from_str(json).unwrap();
                    Ok(FetchOutcome::Payload(payload))
                }
                None => Ok(FetchOutcome::NotFound("HTTP 404".to_string())),
            }
        }
    }

    fn company(name: &str, ico_id: &str, owners_json: &str) -> (String, String) {
        (
            normalize_ico(ico_id),
            format!(
                r#"{{"icoId": "{ico_id}", "zaznamy": [{{"primarniZaznam": true, "obchodniJmeno": [{{"hodnota": "{name}"}}], {owners_json}}}]}}"#
            ),
        )
    }

    #[tokio::test]
    async fn direct_person_fifty_percent_end_to_end() {
        let (ico, json) = company(
            "Root",
            "00000001",
            r#""spolecnici": [{"nazevOrganu": "Společníci", "spolecnik": [{"osoba": {"fyzickaOsoba": {"jmeno": "", "prijmeni": "Novák"}}, "podil": [{"velikostPodilu": {"typObnos": "PROCENTA", "hodnota": "50"}}]}]}]"#,
        );
        let registry = FakeRegistry {
            payloads: Map::from([(ico.clone(), json)]),
        };
        let overrides = ManualOverrides::new();
        let out = resolve(&registry, &ico, 25, &overrides, false).await;

        assert_eq!(out.trace[0].text, "Root (IČO 00000001)");
        assert_eq!(out.trace[1].text, "Společníci:");
        assert_eq!(out.trace[2].text, "Novák — 50.00% (efektivně 50.00%)");
        assert_eq!(out.trace[2].effective_pct, Some(50.0));
    }

    #[tokio::test]
    async fn two_level_chain_multiplies_effective_share() {
        let (ico_a, json_a) = company(
            "A",
            "00000001",
            r#""spolecnici": [{"spolecnik": [{"osoba": {"pravnickaOsoba": {"ico": "00000002", "obchodniJmeno": "B"}}, "podil": [{"velikostPodilu": {"typObnos": "PROCENTA", "hodnota": "100"}}]}]}]"#,
        );
        let (ico_b, json_b) = company(
            "B",
            "00000002",
            r#""spolecnici": [{"spolecnik": [{"osoba": {"fyzickaOsoba": {"jmeno": "", "prijmeni": "Svoboda"}}, "podil": [{"velikostPodilu": {"typObnos": "PROCENTA", "hodnota": "40"}}]}]}]"#,
        );
        let registry = FakeRegistry {
            payloads: Map::from([(ico_a.clone(), json_a), (ico_b, json_b)]),
        };
        let overrides = ManualOverrides::new();
        let out = resolve(&registry, &ico_a, 25, &overrides, false).await;

        let svoboda = out.trace.iter().find(|l| l.text.contains("Svoboda")).unwrap();
        assert_eq!(svoboda.effective_pct, Some(40.0));
    }

    #[tokio::test]
    async fn max_depth_zero_emits_single_header_only() {
        let (ico, json) = company(
            "Root",
            "00000001",
            r#""spolecnici": [{"spolecnik": [{"osoba": {"fyzickaOsoba": {"jmeno": "", "prijmeni": "Novák"}}, "podil": [{"velikostPodilu": {"typObnos": "PROCENTA", "hodnota": "50"}}]}]}]"#,
        );
        let registry = FakeRegistry {
            payloads: Map::from([(ico.clone(), json)]),
        };
        let overrides = ManualOverrides::new();
        let out = resolve(&registry, &ico, 0, &overrides, false).await;
        assert_eq!(out.trace.len(), 1);
        assert_eq!(out.trace[0].text, "Root (IČO 00000001)");
    }

    #[tokio::test]
    async fn unresolvable_root_emits_error_warning() {
        let registry = FakeRegistry { payloads: Map::new() };
        let overrides = ManualOverrides::new();
        let out = resolve(&registry, "00000009", 25, &overrides, false).await;
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::Error);
    }
}
