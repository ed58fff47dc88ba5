//! C3 — owner extractor: selects the primary record, resolves the
//! history-aware display name, and produces the deduplicated list of
//! currently-active owners with parsed shares (spec §4.3).

use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use crate::registry::payload::{MemberEntry, MemberGroup, OsobaEntry, RegistryPayload, RegistryRecord, ValueField};
use crate::share_parser::parse_share;
use crate::types::{normalize_ico, OwnerKind, OwnerRecord};

const LABEL_MEMBERS: &str = "Společníci";
const LABEL_SHAREHOLDERS: &str = "Akcionáři";

fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn is_sole_shareholder_header(header: &str) -> bool {
    fold(header).contains("jediny akcionar")
}

/// Picks the record flagged primary, else the first.
fn select_primary_record(payload: &RegistryPayload) -> Option<&RegistryRecord> {
    payload
        .zaznamy
        .iter()
        .find(|r| r.primarni_zaznam)
        .or_else(|| payload.zaznamy.first())
}

/// Resolves the display name: newest entry without `datumVymazu`, else
/// the newest entry overall. `obchodniJmeno` carries no registration
/// date in the payload we consume, so "newest" falls back to list order
/// (registry history lists are append-ordered, oldest first).
fn resolve_name(record: &RegistryRecord) -> String {
    record
        .obchodni_jmeno
        .iter()
        .rev()
        .find(|n| n.datum_vymazu.is_none())
        .or_else(|| record.obchodni_jmeno.iter().last())
        .map(|n| n.hodnota.clone())
        .unwrap_or_default()
}

fn value_field_part(label: &str, field: Option<&ValueField>) -> Option<String> {
    let field = field?;
    match (field.typ(), field.value()) {
        (Some(typ), Some(val)) => Some(format!("{label}:{val} {typ}")),
        (None, Some(val)) => Some(format!("{label}:{val}")),
        _ => None,
    }
}

/// Builds the compound share text from `vklad`, `velikost` (→
/// `obchodni_podil`), `splaceni` (→ `splaceno`), and `druh`, across all
/// active `podil` entries of a member.
fn compound_share_text(member: &MemberEntry) -> String {
    let mut parts = Vec::new();
    for podil in member.podil.iter().filter(|p| p.is_active()) {
        if let Some(p) = value_field_part("vklad", podil.vklad.as_ref()) {
            parts.push(p);
        }
        if let Some(p) = value_field_part("obchodni_podil", podil.velikost_podilu.as_ref()) {
            parts.push(p);
        }
        if let Some(p) = value_field_part("splaceno", podil.splaceni.as_ref()) {
            parts.push(p);
        }
        if let Some(p) = value_field_part("druh", podil.druh.as_ref()) {
            parts.push(p);
        }
    }
    parts.join("; ")
}

/// Resolves the natural/legal person embedded in a member entry. Returns
/// `None` when there is no identifiable person and no company info.
fn resolve_owner_identity(osoba: &OsobaEntry) -> Option<(OwnerKind, String, Option<String>)> {
    if let Some(fo) = &osoba.fyzicka_osoba {
        let name = [fo.jmeno.as_deref(), fo.prijmeni.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
        if !name.is_empty() {
            return Some((OwnerKind::Person, name, None));
        }
    }
    if let Some(po) = &osoba.pravnicka_osoba {
        if let Some(ico) = &po.ico {
            let ico = normalize_ico(ico);
            let name = po
                .obchodni_jmeno
                .clone()
                .unwrap_or_else(|| format!("Společnost (IČO {ico})"));
            return Some((OwnerKind::Company, name, Some(ico)));
        }
    }
    None
}

struct BuiltOwner {
    record: OwnerRecord,
    datum_zapisu: Option<String>,
}

fn process_group(
    group: &MemberGroup,
    label: &str,
    is_shareholder_section: bool,
    ordered_keys: &mut Vec<(OwnerKind, String, String)>,
    built: &mut HashMap<(OwnerKind, String, String), BuiltOwner>,
) {
    if !group.is_active() {
        return;
    }

    let sole_shareholder = is_shareholder_section
        && group
            .hlavicka
            .as_deref()
            .or(group.nazev_organu.as_deref())
            .map(is_sole_shareholder_header)
            .unwrap_or(false);

    for member in group.members() {
        if !member.is_active() {
            continue;
        }
        let Some(osoba) = &member.osoba else { continue };
        let Some((kind, name, ico)) = resolve_owner_identity(osoba) else {
            continue;
        };

        let share_raw = compound_share_text(member);
        let mut share_pct = parse_share(&share_raw).map(|f| f * 100.0);
        let mut share_raw_opt = if share_raw.is_empty() { None } else { Some(share_raw) };

        if sole_shareholder && share_pct.is_none() {
            share_pct = Some(100.0);
            share_raw_opt = Some("100%".to_string());
        }

        let record = OwnerRecord {
            kind,
            name,
            ico,
            share_pct,
            share_raw: share_raw_opt,
            label: label.to_string(),
        };
        let key = record.identity_key();

        match built.get(&key) {
            Some(existing) if existing.datum_zapisu.as_deref() >= member.datum_zapisu.as_deref() => {
                // existing is already the newest; keep it in place.
            }
            _ => {
                if !built.contains_key(&key) {
                    ordered_keys.push(key.clone());
                }
                built.insert(
                    key,
                    BuiltOwner {
                        record,
                        datum_zapisu: member.datum_zapisu.clone(),
                    },
                );
            }
        }
    }
}

/// Extracts `(display_name, registry_id, owners)` from a payload.
pub fn extract_owners(payload: &RegistryPayload) -> (String, Option<String>, Vec<OwnerRecord>) {
    let ico = payload.ico_id.as_deref().map(normalize_ico);

    let Some(record) = select_primary_record(payload) else {
        return (String::new(), ico, Vec::new());
    };

    let name = resolve_name(record);

    let mut ordered_keys = Vec::new();
    let mut built = HashMap::new();

    for group in &record.spolecnici {
        process_group(group, LABEL_MEMBERS, false, &mut ordered_keys, &mut built);
    }
    for group in &record.akcionari {
        process_group(group, LABEL_SHAREHOLDERS, true, &mut ordered_keys, &mut built);
    }

    let owners = ordered_keys
        .into_iter()
        .filter_map(|k| built.remove(&k).map(|b| b.record))
        .collect();

    (name, ico, owners)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_from(json: &str) -> RegistryPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn direct_person_fifty_percent() {
        let payload = payload_from(
            r#"{
                "icoId": "00000001",
                "zaznamy": [{
                    "primarniZaznam": true,
                    "obchodniJmeno": [{"hodnota": "Root"}],
                    "spolecnici": [{
                        "nazevOrganu": "Společníci",
                        "spolecnik": [{
                            "osoba": {"fyzickaOsoba": {"jmeno": "Jan", "prijmeni": "Novák"}},
                            "podil": [{"velikostPodilu": {"typObnos": "PROCENTA", "hodnota": "50"}}]
                        }]
                    }]
                }]
            }"#,
        );
        let (name, ico, owners) = extract_owners(&payload);
        assert_eq!(name, "Root");
        assert_eq!(ico.as_deref(), Some("00000001"));
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].name, "Jan Novák");
        assert_eq!(owners[0].kind, OwnerKind::Person);
        assert_eq!(owners[0].share_pct, Some(50.0));
    }

    #[test]
    fn only_deleted_entries_yield_empty_list() {
        let payload = payload_from(
            r#"{
                "icoId": "00000001",
                "zaznamy": [{
                    "primarniZaznam": true,
                    "obchodniJmeno": [{"hodnota": "Root"}],
                    "spolecnici": [{
                        "datumVymazu": "2020-01-01",
                        "spolecnik": [{
                            "osoba": {"fyzickaOsoba": {"jmeno": "Jan", "prijmeni": "Novák"}},
                            "podil": [{"velikostPodilu": {"typObnos": "PROCENTA", "hodnota": "50"}}]
                        }]
                    }]
                }]
            }"#,
        );
        let (_, _, owners) = extract_owners(&payload);
        assert!(owners.is_empty());
    }

    #[test]
    fn sole_shareholder_without_share_gets_100_percent() {
        let payload = payload_from(
            r#"{
                "icoId": "00000001",
                "zaznamy": [{
                    "primarniZaznam": true,
                    "obchodniJmeno": [{"hodnota": "Root"}],
                    "akcionari": [{
                        "hlavicka": "Jediný akcionář",
                        "clenoveOrganu": [{
                            "osoba": {"fyzickaOsoba": {"jmeno": "Petr", "prijmeni": "Horák"}},
                            "podil": []
                        }]
                    }]
                }]
            }"#,
        );
        let (_, _, owners) = extract_owners(&payload);
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].share_pct, Some(100.0));
    }

    #[test]
    fn keeps_newest_duplicate_by_registration_date() {
        let payload = payload_from(
            r#"{
                "icoId": "00000001",
                "zaznamy": [{
                    "primarniZaznam": true,
                    "obchodniJmeno": [{"hodnota": "Root"}],
                    "spolecnici": [{
                        "spolecnik": [
                            {
                                "datumZapisu": "2019-01-01",
                                "osoba": {"fyzickaOsoba": {"jmeno": "Jan", "prijmeni": "Novák"}},
                                "podil": [{"velikostPodilu": {"typObnos": "PROCENTA", "hodnota": "30"}}]
                            },
                            {
                                "datumZapisu": "2022-01-01",
                                "osoba": {"fyzickaOsoba": {"jmeno": "Jan", "prijmeni": "Novák"}},
                                "podil": [{"velikostPodilu": {"typObnos": "PROCENTA", "hodnota": "50"}}]
                            }
                        ]
                    }]
                }]
            }"#,
        );
        let (_, _, owners) = extract_owners(&payload);
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].share_pct, Some(50.0));
    }
}
