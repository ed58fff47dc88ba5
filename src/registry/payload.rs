//! Wire shapes for the ARES VR registry payload (spec §6), the subset
//! the extractor (C3) consumes.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryPayload {
    #[serde(rename = "icoId", default)]
    pub ico_id: Option<String>,
    #[serde(default)]
    pub zaznamy: Vec<RegistryRecord>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegistryRecord {
    #[serde(rename = "primarniZaznam", default)]
    pub primarni_zaznam: bool,
    #[serde(rename = "obchodniJmeno", default)]
    pub obchodni_jmeno: Vec<NameEntry>,
    #[serde(rename = "spolecnici", default)]
    pub spolecnici: Vec<MemberGroup>,
    #[serde(rename = "akcionari", default)]
    pub akcionari: Vec<MemberGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameEntry {
    pub hodnota: String,
    #[serde(rename = "datumVymazu", default)]
    pub datum_vymazu: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MemberGroup {
    #[serde(rename = "datumVymazu", default)]
    pub datum_vymazu: Option<String>,
    #[serde(rename = "nazevOrganu", default)]
    pub nazev_organu: Option<String>,
    /// Section header text, e.g. "Jediný akcionář" (a.s. sole-shareholder marker).
    #[serde(rename = "hlavicka", default)]
    pub hlavicka: Option<String>,
    #[serde(rename = "spolecnik", default)]
    pub spolecnik: Vec<MemberEntry>,
    #[serde(rename = "clenoveOrganu", default)]
    pub clenove_organu: Vec<MemberEntry>,
}

impl MemberGroup {
    /// s.r.o. groups use `spolecnik`, a.s. sections use `clenoveOrganu`.
    pub fn members(&self) -> impl Iterator<Item = &MemberEntry> {
        self.spolecnik.iter().chain(self.clenove_organu.iter())
    }

    pub fn is_active(&self) -> bool {
        self.datum_vymazu.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MemberEntry {
    #[serde(rename = "datumVymazu", default)]
    pub datum_vymazu: Option<String>,
    #[serde(rename = "datumZapisu", default)]
    pub datum_zapisu: Option<String>,
    pub osoba: Option<OsobaEntry>,
    #[serde(default)]
    pub podil: Vec<PodilEntry>,
}

impl MemberEntry {
    pub fn is_active(&self) -> bool {
        self.datum_vymazu.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsobaEntry {
    #[serde(rename = "fyzickaOsoba", default)]
    pub fyzicka_osoba: Option<FyzickaOsoba>,
    #[serde(rename = "pravnickaOsoba", default)]
    pub pravnicka_osoba: Option<PravnickaOsoba>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FyzickaOsoba {
    pub jmeno: Option<String>,
    pub prijmeni: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PravnickaOsoba {
    pub ico: Option<String>,
    #[serde(rename = "obchodniJmeno", default)]
    pub obchodni_jmeno: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PodilEntry {
    #[serde(rename = "datumVymazu", default)]
    pub datum_vymazu: Option<String>,
    #[serde(rename = "velikostPodilu", default)]
    pub velikost_podilu: Option<ValueField>,
    #[serde(default)]
    pub vklad: Option<ValueField>,
    #[serde(default)]
    pub splaceni: Option<ValueField>,
    #[serde(default)]
    pub druh: Option<ValueField>,
}

impl PodilEntry {
    pub fn is_active(&self) -> bool {
        self.datum_vymazu.is_none()
    }
}

/// A `{typObnos, hodnota}`-shaped field, or a bare string value for `druh`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValueField {
    Typed {
        #[serde(rename = "typObnos", default)]
        typ_obnos: Option<String>,
        hodnota: Option<String>,
    },
    Bare(String),
}

impl ValueField {
    pub fn typ(&self) -> Option<&str> {
        match self {
            ValueField::Typed { typ_obnos, .. } => typ_obnos.as_deref(),
            ValueField::Bare(_) => None,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            ValueField::Typed { hodnota, .. } => hodnota.as_deref(),
            ValueField::Bare(s) => Some(s.as_str()),
        }
    }
}
