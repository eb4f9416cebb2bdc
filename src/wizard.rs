//! Guided "help us find it" car request.
//!
//! Each step adds one field to a [`RequestDraft`] and forwards the whole draft
//! to the next step through the navigation parameter bag:
//!
//! `Budget -> BodyType -> FuelType -> Equipment -> Brand -> Submitted`
//!
//! Users who already know what they want take the one-step
//! [`SpecificCarRequest`] path instead.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    api::ApiClient,
    auth::Credentials,
    error::{ClientError, ClientResult},
    models::SubmissionReceipt,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString, EnumIter,
)]
pub enum Budget {
    #[serde(rename = "under_1m")]
    #[strum(serialize = "under_1m")]
    UnderOneMillion,
    #[serde(rename = "1m_to_3m")]
    #[strum(serialize = "1m_to_3m")]
    OneToThreeMillion,
    #[serde(rename = "3m_to_5m")]
    #[strum(serialize = "3m_to_5m")]
    ThreeToFiveMillion,
    #[serde(rename = "over_5m")]
    #[strum(serialize = "over_5m")]
    OverFiveMillion,
}

impl Budget {
    pub fn label(self) -> &'static str {
        match self {
            Budget::UnderOneMillion => "Under 1,000,000 ETB",
            Budget::OneToThreeMillion => "1M - 3M ETB",
            Budget::ThreeToFiveMillion => "3M - 5M ETB",
            Budget::OverFiveMillion => "Over 5,000,000 ETB",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString, EnumIter,
)]
pub enum BodyType {
    #[serde(rename = "SUV")]
    #[strum(serialize = "SUV")]
    Suv,
    Sedan,
    Hatchback,
    Pickup,
}

impl BodyType {
    pub fn label(self) -> &'static str {
        match self {
            BodyType::Suv => "SUV",
            BodyType::Sedan => "Sedan",
            BodyType::Hatchback => "Hatchback",
            BodyType::Pickup => "Pickup Truck",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString, EnumIter,
)]
pub enum FuelType {
    Gasoline,
    Diesel,
    Electric,
    Hybrid,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Equipment {
    Sunroof,
    LeatherSeats,
    AppleCarplay,
    Awd,
}

impl Equipment {
    pub fn label(self) -> &'static str {
        match self {
            Equipment::Sunroof => "Sunroof",
            Equipment::LeatherSeats => "Leather Seats",
            Equipment::AppleCarplay => "Apple CarPlay / Android Auto",
            Equipment::Awd => "All-Wheel Drive",
        }
    }
}

/// Answers collected so far. Absent fields are submitted as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<BodyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<FuelType>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub equipment: BTreeSet<Equipment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

/// The single field a step contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftField {
    Budget(Budget),
    BodyType(Option<BodyType>),
    FuelType(Option<FuelType>),
    Equipment(BTreeSet<Equipment>),
    Brand(Option<String>),
}

impl RequestDraft {
    // Replaces only `field`; everything else passes through untouched
    pub fn merge(&self, field: DraftField) -> RequestDraft {
        let mut next = self.clone();
        match field {
            DraftField::Budget(budget) => next.budget = Some(budget),
            DraftField::BodyType(body_type) => next.body_type = body_type,
            DraftField::FuelType(fuel_type) => next.fuel_type = fuel_type,
            DraftField::Equipment(equipment) => next.equipment = equipment,
            DraftField::Brand(brand) => next.brand = normalize_text(brand),
        }
        next
    }

    /// Selects `tag` if absent, deselects it if present. Returns whether it
    /// is selected afterwards.
    pub fn toggle_equipment(&mut self, tag: Equipment) -> bool {
        if self.equipment.remove(&tag) {
            false
        } else {
            self.equipment.insert(tag);
            true
        }
    }

    pub fn to_params(&self) -> NavParams {
        let mut params = NavParams::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                params.insert(key.to_string(), ParamValue::One(value));
            }
        };
        put(PARAM_BUDGET, self.budget.map(|b| b.to_string()));
        put(PARAM_BODY_TYPE, self.body_type.map(|b| b.to_string()));
        put(PARAM_FUEL_TYPE, self.fuel_type.map(|f| f.to_string()));
        put(PARAM_BRAND, self.brand.clone());
        if !self.equipment.is_empty() {
            let tags = self.equipment.iter().map(ToString::to_string).collect();
            params.insert(PARAM_EQUIPMENT.to_string(), ParamValue::Many(tags));
        }
        params
    }

    pub fn from_params(params: &NavParams) -> Result<Self, WizardError> {
        let mut equipment = BTreeSet::new();
        if let Some(value) = params.get(PARAM_EQUIPMENT) {
            // A one-element array may come back from the router as a plain string
            let tags: Vec<&str> = match value {
                ParamValue::One(tag) => vec![tag.as_str()],
                ParamValue::Many(tags) => tags.iter().map(String::as_str).collect(),
            };
            for tag in tags {
                equipment.insert(parse_param(PARAM_EQUIPMENT, tag)?);
            }
        }

        Ok(RequestDraft {
            budget: single(params, PARAM_BUDGET)?.map(|v| parse_param(PARAM_BUDGET, v)).transpose()?,
            body_type: single(params, PARAM_BODY_TYPE)?
                .map(|v| parse_param(PARAM_BODY_TYPE, v))
                .transpose()?,
            fuel_type: single(params, PARAM_FUEL_TYPE)?
                .map(|v| parse_param(PARAM_FUEL_TYPE, v))
                .transpose()?,
            equipment,
            brand: normalize_text(single(params, PARAM_BRAND)?.map(str::to_string)),
        })
    }
}

fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

// --- Navigation parameter bag ---

const PARAM_BUDGET: &str = "budget";
const PARAM_BODY_TYPE: &str = "bodyType";
const PARAM_FUEL_TYPE: &str = "fuelType";
const PARAM_EQUIPMENT: &str = "equipment";
const PARAM_BRAND: &str = "brand";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

/// Key/value bag pushed along with a screen, as a router would carry it.
pub type NavParams = BTreeMap<String, ParamValue>;

fn single<'a>(params: &'a NavParams, key: &str) -> Result<Option<&'a str>, WizardError> {
    match params.get(key) {
        None => Ok(None),
        Some(ParamValue::One(value)) => Ok(Some(value.as_str())),
        Some(ParamValue::Many(values)) if values.len() == 1 => Ok(Some(values[0].as_str())),
        Some(ParamValue::Many(values)) => Err(WizardError::InvalidParam {
            key: key.to_string(),
            value: values.join(","),
        }),
    }
}

fn parse_param<T: FromStr>(key: &str, value: &str) -> Result<T, WizardError> {
    value.parse().map_err(|_| WizardError::InvalidParam {
        key: key.to_string(),
        value: value.to_string(),
    })
}

// --- Steps ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum WizardStep {
    Budget,
    BodyType,
    FuelType,
    Equipment,
    Brand,
    Submitted,
}

impl WizardStep {
    pub fn next(self) -> WizardStep {
        match self {
            WizardStep::Budget => WizardStep::BodyType,
            WizardStep::BodyType => WizardStep::FuelType,
            WizardStep::FuelType => WizardStep::Equipment,
            WizardStep::Equipment => WizardStep::Brand,
            WizardStep::Brand | WizardStep::Submitted => WizardStep::Submitted,
        }
    }

    pub fn previous(self) -> Option<WizardStep> {
        match self {
            WizardStep::Budget | WizardStep::Submitted => None,
            WizardStep::BodyType => Some(WizardStep::Budget),
            WizardStep::FuelType => Some(WizardStep::BodyType),
            WizardStep::Equipment => Some(WizardStep::FuelType),
            WizardStep::Brand => Some(WizardStep::Equipment),
        }
    }

    // 1-based position among the five question steps
    pub fn position(self) -> Option<u8> {
        match self {
            WizardStep::Budget => Some(1),
            WizardStep::BodyType => Some(2),
            WizardStep::FuelType => Some(3),
            WizardStep::Equipment => Some(4),
            WizardStep::Brand => Some(5),
            WizardStep::Submitted => None,
        }
    }

    pub fn title(self) -> String {
        match self.position() {
            Some(n) => format!("Help Us Find It ({}/5)", n),
            None => "Request Submitted!".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("'{action}' is not available at the {step} step")]
    WrongStep { step: WizardStep, action: &'static str },

    #[error("{0} cannot be skipped")]
    Required(&'static str),

    #[error("invalid value '{value}' for navigation parameter '{key}'")]
    InvalidParam { key: String, value: String },

    #[error(transparent)]
    Submission(#[from] ClientError),
}

#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    draft: RequestDraft,
}

impl Default for Wizard {
    fn default() -> Self {
        Wizard::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Wizard { step: WizardStep::Budget, draft: RequestDraft::default() }
    }

    // Rebuilds the wizard when a screen is entered with a parameter bag
    pub fn resume(step: WizardStep, params: &NavParams) -> Result<Self, WizardError> {
        Ok(Wizard { step, draft: RequestDraft::from_params(params)? })
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &RequestDraft {
        &self.draft
    }

    // What the current screen forwards to the next one
    pub fn params(&self) -> NavParams {
        self.draft.to_params()
    }

    fn ensure_step(&self, step: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WizardError::WrongStep { step: self.step, action })
        }
    }

    fn advance(&mut self, field: DraftField) -> WizardStep {
        self.draft = self.draft.merge(field);
        self.step = self.step.next();
        tracing::debug!(step = %self.step, draft = ?self.draft, "Wizard advanced");
        self.step
    }

    pub fn choose_budget(&mut self, budget: Budget) -> Result<WizardStep, WizardError> {
        self.ensure_step(WizardStep::Budget, "choose budget")?;
        Ok(self.advance(DraftField::Budget(budget)))
    }

    pub fn choose_body_type(&mut self, body_type: BodyType) -> Result<WizardStep, WizardError> {
        self.ensure_step(WizardStep::BodyType, "choose body type")?;
        Ok(self.advance(DraftField::BodyType(Some(body_type))))
    }

    pub fn choose_fuel_type(&mut self, fuel_type: FuelType) -> Result<WizardStep, WizardError> {
        self.ensure_step(WizardStep::FuelType, "choose fuel type")?;
        Ok(self.advance(DraftField::FuelType(Some(fuel_type))))
    }

    pub fn toggle_equipment(&mut self, tag: Equipment) -> Result<bool, WizardError> {
        self.ensure_step(WizardStep::Equipment, "toggle equipment")?;
        Ok(self.draft.toggle_equipment(tag))
    }

    pub fn finish_equipment(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_step(WizardStep::Equipment, "continue")?;
        let selected = self.draft.equipment.clone();
        Ok(self.advance(DraftField::Equipment(selected)))
    }

    pub fn set_brand(&mut self, brand: &str) -> Result<(), WizardError> {
        self.ensure_step(WizardStep::Brand, "set brand")?;
        self.draft = self.draft.merge(DraftField::Brand(Some(brand.to_string())));
        Ok(())
    }

    /// Moves on leaving the current step's field absent. Budget is the entry
    /// point and cannot be skipped; skipping the brand keeps the wizard on the
    /// final step.
    pub fn skip(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::Budget => Err(WizardError::Required("budget")),
            WizardStep::BodyType => Ok(self.advance(DraftField::BodyType(None))),
            WizardStep::FuelType => Ok(self.advance(DraftField::FuelType(None))),
            WizardStep::Equipment => Ok(self.advance(DraftField::Equipment(BTreeSet::new()))),
            WizardStep::Brand => {
                self.draft = self.draft.merge(DraftField::Brand(None));
                Ok(WizardStep::Brand)
            }
            WizardStep::Submitted => Err(WizardError::WrongStep { step: self.step, action: "skip" }),
        }
    }

    // The draft is kept; answering again replaces the field on re-forward
    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        let previous = self
            .step
            .previous()
            .ok_or(WizardError::WrongStep { step: self.step, action: "go back" })?;
        self.step = previous;
        Ok(previous)
    }

    /// Sends the accumulated draft. On success the draft is discarded and the
    /// wizard is `Submitted`; on failure it stays on the brand step with the
    /// draft intact so the user can try again.
    pub async fn submit(
        &mut self,
        client: &ApiClient,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> Result<SubmissionReceipt, WizardError> {
        self.ensure_step(WizardStep::Brand, "submit")?;
        if self.draft.budget.is_none() {
            return Err(ClientError::invalid("budget", "Please choose a budget.").into());
        }

        match client.submit_car_request(&self.draft, creds, cancel).await {
            Ok(receipt) => {
                self.draft = RequestDraft::default();
                self.step = WizardStep::Submitted;
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Car request submission failed, keeping draft for retry");
                Err(e.into())
            }
        }
    }
}

/// One-step request for a known make and model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecificCarRequest {
    pub make: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl SpecificCarRequest {
    pub fn new(make: &str, model: Option<&str>) -> ClientResult<Self> {
        let make = make.trim();
        if make.is_empty() {
            return Err(ClientError::invalid("make", "Please enter a make."));
        }
        Ok(SpecificCarRequest {
            make: make.to_string(),
            model: normalize_text(model.map(str::to_string)),
        })
    }

    pub async fn submit(
        &self,
        client: &ApiClient,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<SubmissionReceipt> {
        client.submit_specific_request(self, creds, cancel).await
    }
}
