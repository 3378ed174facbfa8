use crate::error::{Error, ErrorKind};
use derive_more::Display;
use std::str::FromStr;

/// Style sheet staged for models without a specific one.
pub const GENERIC_STYLESHEET: &str = "kobo_extra.css";

/// Kobo hardware families that get their own style sheet.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceModel {
    #[display("Aura H2O")]
    AuraH2O,
    #[display("Aura HD")]
    AuraHD,
    #[display("Aura")]
    Aura,
    #[display("Glo")]
    Glo,
    #[display("Glo HD")]
    GloHD,
    #[display("Mini")]
    Mini,
    #[display("Touch")]
    Touch,
    #[default]
    #[display("Generic")]
    Generic,
}

impl DeviceModel {
    /// File name of the model's style sheet in the configuration directory.
    pub fn stylesheet(&self) -> &'static str {
        match self {
            Self::AuraH2O => "kobo_extra_AURAH2O.css",
            Self::AuraHD => "kobo_extra_AURAHD.css",
            Self::Aura => "kobo_extra_AURA.css",
            Self::Glo => "kobo_extra_GLO.css",
            Self::GloHD => "kobo_extra_GLOHD.css",
            Self::Mini => "kobo_extra_MINI.css",
            Self::Touch => "kobo_extra_TOUCH.css",
            Self::Generic => GENERIC_STYLESHEET,
        }
    }

    /// Map a USB product id onto a model. Unknown ids are [`Generic`](Self::Generic).
    pub fn from_product_id(id: u16) -> Self {
        match id {
            0x4163 => Self::Touch,
            0x4173 => Self::Glo,
            0x4183 => Self::Mini,
            0x4193 => Self::AuraHD,
            0x4203 | 0x4226 => Self::Aura,
            0x4213 | 0x4227 => Self::AuraH2O,
            0x4223 => Self::GloHD,
            _ => Self::Generic,
        }
    }
}

impl FromStr for DeviceModel {
    type Err = Error;

    /// Accepts display names and their compact forms, case-insensitively
    /// (`"Aura H2O"`, `"aurah2o"`, `"aura_h2o"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>().to_ascii_lowercase();
        Ok(match compact.as_str() {
            "aurah2o" => Self::AuraH2O,
            "aurahd" => Self::AuraHD,
            "aura" => Self::Aura,
            "glo" => Self::Glo,
            "glohd" => Self::GloHD,
            "mini" => Self::Mini,
            "touch" => Self::Touch,
            "generic" => Self::Generic,
            _ => exn::bail!(ErrorKind::UnknownModel(s.to_string())),
        })
    }
}
