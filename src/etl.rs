//! ETL scenario trigger: the fixed event batch fired for a first sync.

use serde::{Deserialize, Serialize};

use crate::api::AccountId;

/// Named synchronization events understood by the ETL orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EtlEvent {
    WarehouseDict,
    CategoryDict,
    TariffDict,
    ProductDict,
    SalesFact,
    InventoryFact,
    FactFinance,
}

/// Events sent together when a workspace runs its first synchronization.
pub const FIRST_SYNC_EVENTS: [EtlEvent; 7] = [
    EtlEvent::WarehouseDict,
    EtlEvent::CategoryDict,
    EtlEvent::TariffDict,
    EtlEvent::ProductDict,
    EtlEvent::SalesFact,
    EtlEvent::InventoryFact,
    EtlEvent::FactFinance,
];

/// Lookback for reference dictionaries.
const DICTIONARY_LOOKBACK_DAYS: u32 = 30;
/// Lookback for fact and event streams.
const FACT_LOOKBACK_DAYS: u32 = 7;

impl EtlEvent {
    pub fn is_dictionary(&self) -> bool {
        matches!(
            self,
            Self::WarehouseDict | Self::CategoryDict | Self::TariffDict
        )
    }

    pub fn lookback_days(&self) -> u32 {
        if self.is_dictionary() {
            DICTIONARY_LOOKBACK_DAYS
        } else {
            FACT_LOOKBACK_DAYS
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateMode {
    LastDays,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioEvent {
    pub event: EtlEvent,
    pub date_mode: DateMode,
    pub last_days: u32,
}

impl From<EtlEvent> for ScenarioEvent {
    fn from(event: EtlEvent) -> Self {
        Self {
            event,
            date_mode: DateMode::LastDays,
            last_days: event.lookback_days(),
        }
    }
}

/// Body of `POST /api/etl/scenario/run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRunRequest {
    pub account_id: AccountId,
    pub events: Vec<ScenarioEvent>,
}

impl ScenarioRunRequest {
    /// The fixed first-sync batch for a workspace.
    pub fn first_sync(account_id: AccountId) -> Self {
        Self {
            account_id,
            events: FIRST_SYNC_EVENTS.into_iter().map(ScenarioEvent::from).collect(),
        }
    }
}

/// Whether the orchestrator accepted a scenario run (200 OK or 202 Accepted).
pub fn is_accepted(status: u16) -> bool {
    matches!(status, 200 | 202)
}
