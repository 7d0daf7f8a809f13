//! Peruvian regions and their representative altitudes.
//!
//! The intake form selects a region rather than asking for meters; each region
//! carries the altitude used for the hemoglobin correction. Names parse
//! leniently (case, accents and the parenthetical qualifier are ignored) and
//! anything unrecognised maps to [`Region::Unspecified`], which defers to the
//! policy's default altitude.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Department (plus Callao) of residence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Region {
    Lima,
    Callao,
    Piura,
    Lambayeque,
    LaLibertad,
    Ica,
    Tumbes,
    Ancash,
    Huanuco,
    Junin,
    Cusco,
    Ayacucho,
    Apurimac,
    Cajamarca,
    Arequipa,
    Moquegua,
    Tacna,
    Puno,
    Huancavelica,
    Pasco,
    Loreto,
    Amazonas,
    SanMartin,
    Ucayali,
    MadreDeDios,
    Unspecified,
}

impl Region {
    /// Every region, in intake-form order.
    pub const ALL: [Region; 26] = [
        Self::Lima,
        Self::Callao,
        Self::Piura,
        Self::Lambayeque,
        Self::LaLibertad,
        Self::Ica,
        Self::Tumbes,
        Self::Ancash,
        Self::Huanuco,
        Self::Junin,
        Self::Cusco,
        Self::Ayacucho,
        Self::Apurimac,
        Self::Cajamarca,
        Self::Arequipa,
        Self::Moquegua,
        Self::Tacna,
        Self::Puno,
        Self::Huancavelica,
        Self::Pasco,
        Self::Loreto,
        Self::Amazonas,
        Self::SanMartin,
        Self::Ucayali,
        Self::MadreDeDios,
        Self::Unspecified,
    ];

    /// Representative altitude in meters above sea level.
    ///
    /// `None` for [`Region::Unspecified`]; callers fall back to the configured
    /// default altitude.
    #[must_use]
    pub fn altitude_m(self) -> Option<f64> {
        let meters = match self {
            Self::Lima => 160.0,
            Self::Callao => 50.0,
            Self::Piura => 80.0,
            Self::Lambayeque => 100.0,
            Self::LaLibertad => 150.0,
            Self::Ica => 400.0,
            Self::Tumbes => 50.0,
            Self::Ancash => 150.0,
            Self::Huanuco => 1900.0,
            Self::Junin => 3200.0,
            Self::Cusco => 3400.0,
            Self::Ayacucho => 2700.0,
            Self::Apurimac => 2300.0,
            Self::Cajamarca => 2600.0,
            Self::Arequipa => 2300.0,
            Self::Moquegua => 1400.0,
            Self::Tacna => 560.0,
            Self::Puno => 3800.0,
            Self::Huancavelica => 3600.0,
            Self::Pasco => 4300.0,
            Self::Loreto => 100.0,
            Self::Amazonas => 400.0,
            Self::SanMartin => 300.0,
            Self::Ucayali => 150.0,
            Self::MadreDeDios => 200.0,
            Self::Unspecified => return None,
        };
        Some(meters)
    }

    /// Label shown on forms and stored with each case.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Lima => "LIMA (Metropolitana y Provincia)",
            Self::Callao => "CALLAO (Provincia Constitucional)",
            Self::Piura => "PIURA",
            Self::Lambayeque => "LAMBAYEQUE",
            Self::LaLibertad => "LA LIBERTAD",
            Self::Ica => "ICA",
            Self::Tumbes => "TUMBES",
            Self::Ancash => "ÁNCASH (Costa)",
            Self::Huanuco => "HUÁNUCO",
            Self::Junin => "JUNÍN (Andes)",
            Self::Cusco => "CUSCO (Andes)",
            Self::Ayacucho => "AYACUCHO",
            Self::Apurimac => "APURÍMAC",
            Self::Cajamarca => "CAJAMARCA",
            Self::Arequipa => "AREQUIPA",
            Self::Moquegua => "MOQUEGUA",
            Self::Tacna => "TACNA",
            Self::Puno => "PUNO (Sierra Alta)",
            Self::Huancavelica => "HUANCAVELICA (Sierra Alta)",
            Self::Pasco => "PASCO",
            Self::Loreto => "LORETO",
            Self::Amazonas => "AMAZONAS",
            Self::SanMartin => "SAN MARTÍN",
            Self::Ucayali => "UCAYALI",
            Self::MadreDeDios => "MADRE DE DIOS",
            Self::Unspecified => "OTRO / NO ESPECIFICADO",
        }
    }

    /// Parse a region name, ignoring case, accents and any parenthetical.
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        let key = normalize(name);
        Self::ALL
            .into_iter()
            .find(|region| normalize(region.label()) == key)
            .unwrap_or(Self::Unspecified)
    }
}

fn normalize(name: &str) -> String {
    let base = name.split('(').next().unwrap_or_default();
    let folded: String = base
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'A',
            'é' | 'É' => 'E',
            'í' | 'Í' => 'I',
            'ó' | 'Ó' => 'O',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'U',
            'ñ' | 'Ñ' => 'N',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl From<String> for Region {
    fn from(name: String) -> Self {
        Self::parse_lenient(&name)
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.label().to_string()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
